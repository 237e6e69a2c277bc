// tidgit-sync: git synchronization core for wiki folders.
//
// The git layer (`git::*`) does the work; `worker` runs it off the caller's
// thread and `service` supervises it for a host application.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod git;
pub mod progress;
pub mod service;
pub mod worker;
