// Remote API seam.
// Everything above the HTTP client talks to GitHub through this trait.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{
    Event, Gist, MergeUpstreamResult, RateLimitStatus, Repository, SimpleUser, User,
};

/// Operations the dashboard needs from GitHub.
///
/// Listing methods take `owner: None` for the authenticated user and
/// `Some(login)` for anyone else, and return a single page.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn current_user(&self) -> Result<User>;

    async fn user(&self, login: &str) -> Result<User>;

    async fn repos_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>>;

    async fn starred_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>>;

    async fn followers_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SimpleUser>>;

    async fn following_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SimpleUser>>;

    async fn gists_page(&self, owner: Option<&str>, page: u32, per_page: u32) -> Result<Vec<Gist>>;

    /// Public events have no authenticated-user variant; a login is required.
    async fn events_page(&self, login: &str, page: u32, per_page: u32) -> Result<Vec<Event>>;

    async fn star(&self, owner: &str, repo: &str) -> Result<()>;

    async fn unstar(&self, owner: &str, repo: &str) -> Result<()>;

    async fn is_starred(&self, owner: &str, repo: &str) -> Result<bool>;

    async fn follow(&self, login: &str) -> Result<()>;

    async fn unfollow(&self, login: &str) -> Result<()>;

    async fn is_following(&self, login: &str) -> Result<bool>;

    async fn fork(&self, owner: &str, repo: &str) -> Result<Repository>;

    async fn merge_upstream(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<MergeUpstreamResult>;

    async fn rate_limit_status(&self) -> Result<RateLimitStatus>;
}
