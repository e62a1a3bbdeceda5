// GitHub API module.
// Provides the client, the API seam, pagination, and response types.

pub mod api;
pub mod client;
pub mod endpoints;
pub mod pagination;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use api::GitHubApi;
pub use client::GitHubClient;
pub use pagination::{PaginatedFetcher, fetch_all_pages};
pub use types::*;
