// Progress/log channel between a running git operation and its observer.
//
// A bounded channel of capacity one: the operation waits for the observer to
// take each event, so nothing queues up behind a slow consumer and events are
// observed in emission order.

use tidgit_common::protocol::message::{ErrorKind, LogLevel, LogMessage, Signal, WireError};
use tidgit_common::protocol::step::SyncStep;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::SyncError;

const CHANNEL_CAPACITY: usize = 1;

pub fn progress_channel() -> (ProgressEmitter, ProgressStream) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (ProgressEmitter { tx, steps: Vec::new() }, ProgressStream { rx, finished: false })
}

/// Producer half. Consumed by [`ProgressEmitter::finish`], so at most one
/// terminal signal can ever be sent.
#[derive(Debug)]
pub struct ProgressEmitter {
    tx: mpsc::Sender<Signal>,
    steps: Vec<SyncStep>,
}

impl ProgressEmitter {
    pub async fn emit(&mut self, message: LogMessage) {
        if let Some(step) = message.step {
            self.steps.push(step);
        }
        trace!(level = ?message.level, message = %message.message, "progress");
        if self.tx.send(Signal::Next(message)).await.is_err() {
            debug!("progress observer went away, event dropped");
        }
    }

    pub async fn step(&mut self, step: SyncStep) {
        self.emit(LogMessage::for_step(LogLevel::Info, step)).await;
    }

    /// Announce a failure step, attaching the error that caused it.
    pub async fn fail_step(&mut self, level: LogLevel, step: SyncStep, error: &SyncError) {
        self.emit(LogMessage::for_step(level, step).with_error(error.to_wire())).await;
    }

    pub async fn info(&mut self, text: impl Into<String>) {
        self.emit(LogMessage::text(LogLevel::Info, text)).await;
    }

    pub async fn warn(&mut self, text: impl Into<String>) {
        self.emit(LogMessage::text(LogLevel::Warn, text)).await;
    }

    /// Steps emitted so far, in order.
    pub fn steps(&self) -> &[SyncStep] {
        &self.steps
    }

    /// Whether any emitted step moved content (commit, upload, pull, rebase).
    pub fn has_changes(&self) -> bool {
        self.steps.iter().any(|step| step.moves_content())
    }

    pub async fn finish(self, result: Result<(), WireError>) {
        let signal = match result {
            Ok(()) => Signal::Complete,
            Err(error) => Signal::Error(error),
        };
        if self.tx.send(signal).await.is_err() {
            debug!("progress observer went away before the terminal signal");
        }
    }
}

/// Consumer half. Yields `Next` events, exactly one terminal signal, then `None`.
#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::Receiver<Signal>,
    finished: bool,
}

impl ProgressStream {
    pub async fn next(&mut self) -> Option<Signal> {
        if self.finished {
            return None;
        }
        match self.rx.recv().await {
            Some(signal) => {
                self.finished = signal.is_terminal();
                Some(signal)
            }
            None => {
                self.finished = true;
                Some(Signal::Error(WireError::new(
                    ErrorKind::Internal,
                    "git worker stopped before the operation finished",
                )))
            }
        }
    }

    /// Drain the stream into a report.
    pub async fn collect(mut self) -> ProgressReport {
        let mut messages = Vec::new();
        let mut result = Ok(());
        while let Some(signal) = self.next().await {
            match signal {
                Signal::Next(message) => messages.push(message),
                Signal::Error(error) => result = Err(error),
                Signal::Complete => {}
            }
        }
        ProgressReport { messages, result }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub messages: Vec<LogMessage>,
    pub result: Result<(), WireError>,
}

impl ProgressReport {
    pub fn steps(&self) -> Vec<SyncStep> {
        self.messages.iter().filter_map(|message| message.step).collect()
    }

    pub fn has_changes(&self) -> bool {
        self.messages.iter().filter_map(|message| message.step).any(SyncStep::moves_content)
    }
}
