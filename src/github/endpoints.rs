// GitHub API endpoint functions.
// Provides typed methods for fetching data from the GitHub REST API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::Result;

use super::api::GitHubApi;
use super::client::GitHubClient;
use super::types::{
    Event, Gist, MergeUpstreamResult, RateLimitStatus, Repository, SimpleUser, User,
};

/// Listing path for the authenticated user or a named one.
fn list_path(owner: Option<&str>, resource: &str) -> String {
    match owner {
        Some(login) => format!("/users/{}/{}", login, resource),
        None => format!("/user/{}", resource),
    }
}

impl GitHubClient {
    async fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        page: u32,
        per_page: u32,
        extra: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let page = page.to_string();
        let per_page = per_page.to_string();
        let mut params = vec![("page", page.as_str()), ("per_page", per_page.as_str())];
        params.extend_from_slice(extra);

        let response = self.get_with_params(endpoint, &params).await?;
        let items: Vec<T> = response.json().await?;
        Ok(items)
    }

    /// GET that answers 204 when present and 404 when absent.
    async fn exists(&self, endpoint: &str) -> Result<bool> {
        match self.get(endpoint).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn current_user(&self) -> Result<User> {
        let response = self.get("/user").await?;
        let user: User = response.json().await?;
        Ok(user)
    }

    async fn user(&self, login: &str) -> Result<User> {
        let response = self.get(&format!("/users/{}", login)).await?;
        let user: User = response.json().await?;
        Ok(user)
    }

    async fn repos_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>> {
        let extra = [("sort", "updated"), ("direction", "desc")];
        self.get_page(&list_path(owner, "repos"), page, per_page, &extra).await
    }

    async fn starred_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>> {
        self.get_page(&list_path(owner, "starred"), page, per_page, &[]).await
    }

    async fn followers_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SimpleUser>> {
        self.get_page(&list_path(owner, "followers"), page, per_page, &[]).await
    }

    async fn following_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SimpleUser>> {
        self.get_page(&list_path(owner, "following"), page, per_page, &[]).await
    }

    async fn gists_page(&self, owner: Option<&str>, page: u32, per_page: u32) -> Result<Vec<Gist>> {
        let endpoint = match owner {
            Some(login) => format!("/users/{}/gists", login),
            None => "/gists".to_string(),
        };
        self.get_page(&endpoint, page, per_page, &[]).await
    }

    async fn events_page(&self, login: &str, page: u32, per_page: u32) -> Result<Vec<Event>> {
        self.get_page(&format!("/users/{}/events", login), page, per_page, &[]).await
    }

    async fn star(&self, owner: &str, repo: &str) -> Result<()> {
        self.put_empty(&format!("/user/starred/{}/{}", owner, repo)).await?;
        Ok(())
    }

    async fn unstar(&self, owner: &str, repo: &str) -> Result<()> {
        self.delete(&format!("/user/starred/{}/{}", owner, repo)).await?;
        Ok(())
    }

    async fn is_starred(&self, owner: &str, repo: &str) -> Result<bool> {
        self.exists(&format!("/user/starred/{}/{}", owner, repo)).await
    }

    async fn follow(&self, login: &str) -> Result<()> {
        self.put_empty(&format!("/user/following/{}", login)).await?;
        Ok(())
    }

    async fn unfollow(&self, login: &str) -> Result<()> {
        self.delete(&format!("/user/following/{}", login)).await?;
        Ok(())
    }

    async fn is_following(&self, login: &str) -> Result<bool> {
        self.exists(&format!("/user/following/{}", login)).await
    }

    async fn fork(&self, owner: &str, repo: &str) -> Result<Repository> {
        let response = self
            .post_json(
                &format!("/repos/{}/{}/forks", owner, repo),
                &serde_json::json!({}),
            )
            .await?;
        let fork: Repository = response.json().await?;
        Ok(fork)
    }

    async fn merge_upstream(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<MergeUpstreamResult> {
        let response = self
            .post_json(
                &format!("/repos/{}/{}/merge-upstream", owner, repo),
                &serde_json::json!({ "branch": branch }),
            )
            .await?;
        let result: MergeUpstreamResult = response.json().await?;
        Ok(result)
    }

    async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        let response = self.get("/rate_limit").await?;
        let status: RateLimitStatus = response.json().await?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_path() {
        assert_eq!(list_path(None, "starred"), "/user/starred");
        assert_eq!(list_path(Some("octocat"), "followers"), "/users/octocat/followers");
    }
}
