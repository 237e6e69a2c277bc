// tidgit-common: shared types for the tidgit workspace

pub mod protocol;
pub mod types;
