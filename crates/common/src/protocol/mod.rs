// Wire shapes exchanged between the git worker and its supervisor.

pub mod message;
pub mod step;
