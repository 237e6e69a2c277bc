// Git layer: subprocess seam, read-only queries, the sync state machine and
// the operations built on it.

pub mod inspect;
pub mod orchestrator;
pub mod repo;
pub mod runner;
pub mod sync;
