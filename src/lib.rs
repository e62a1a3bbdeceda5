// ghdash library.
// Cached GitHub API aggregation behind a personal dashboard.

pub mod auth;
pub mod batch;
pub mod cache;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod github;
pub mod session;
pub mod stats;

pub use config::DashboardConfig;
pub use dashboard::{Dashboard, DashboardData, FollowAnalysis};
pub use error::{GhdashError, Result};
pub use session::Session;
