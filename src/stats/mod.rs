// Derived statistics.
// Pure computations over fetched GitHub resources.

pub mod commits;
pub mod repos;

pub use commits::CommitStats;
pub use repos::{LanguageShare, RepoStats, language_breakdown};
