// Online/offline detection. Checked once when an operation starts.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Ask `connectivity` on the blocking pool, since a probe may wait for its
/// whole timeout. A panicking probe counts as offline.
pub async fn check(connectivity: &Arc<dyn Connectivity>) -> bool {
    let connectivity = Arc::clone(connectivity);
    match tokio::task::spawn_blocking(move || connectivity.is_online()).await {
        Ok(online) => online,
        Err(error) => {
            warn!(%error, "connectivity check did not finish");
            false
        }
    }
}

/// Online when a TCP connection to `address` opens within `timeout`.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    pub address: String,
    pub timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self { address: address.into(), timeout }
    }
}

impl Connectivity for TcpProbe {
    fn is_online(&self) -> bool {
        let addrs = match self.address.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(error) => {
                debug!(address = %self.address, %error, "connectivity probe could not resolve");
                return false;
            }
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.timeout).is_ok() {
                return true;
            }
        }
        debug!(address = %self.address, "connectivity probe failed");
        false
    }
}

/// Fixed answer, for tests and `--offline`.
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub bool);

impl Connectivity for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.0
    }
}
