// GitHub API response types.
// Defines structs for deserializing GitHub REST API responses.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account type discriminator (user or organization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AccountType {
    #[default]
    User,
    Organization,
    Bot,
    #[serde(other)]
    Unknown,
}

/// Account as embedded in other resources and in follower listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleUser {
    pub id: u64,
    pub login: String,
    #[serde(rename = "type", default)]
    pub account_type: AccountType,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

/// Full user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub public_gists: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    pub created_at: Option<DateTime<Utc>>,
}

/// GitHub repository. Starred listings use the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: SimpleUser,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    pub html_url: Option<String>,
    pub default_branch: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// A file inside a gist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GistFile {
    pub filename: Option<String>,
    pub language: Option<String>,
    pub raw_url: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// GitHub gist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gist {
    pub id: String,
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub public: bool,
    pub owner: Option<SimpleUser>,
    #[serde(default)]
    pub files: HashMap<String, GistFile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public event type. Only pushes feed commit statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    PushEvent,
    CreateEvent,
    DeleteEvent,
    ForkEvent,
    WatchEvent,
    IssuesEvent,
    IssueCommentEvent,
    PullRequestEvent,
    PullRequestReviewEvent,
    ReleaseEvent,
    PublicEvent,
    MemberEvent,
    GollumEvent,
    #[serde(other)]
    Other,
}

/// Repository reference inside an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRepo {
    pub id: u64,
    pub name: String,
}

/// Commit summary in a push payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushCommit {
    pub sha: String,
    pub message: Option<String>,
}

/// Event payload fields used by the analyzer. Everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub size: Option<u32>,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

/// Public activity event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub repo: Option<EventRepo>,
    #[serde(default)]
    pub payload: EventPayload,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_push(&self) -> bool {
        self.kind == EventKind::PushEvent
    }

    /// Commits carried by a push. A push always counts as at least one.
    pub fn commit_count(&self) -> u32 {
        let count = self
            .payload
            .size
            .unwrap_or(self.payload.commits.len() as u32);
        count.max(1)
    }
}

/// Result of syncing a fork with its upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeUpstreamResult {
    pub message: Option<String>,
    pub merge_type: Option<String>,
    pub base_branch: Option<String>,
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
    #[serde(default)]
    pub used: u64,
}

/// `/rate_limit` response.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitStatus {
    pub resources: RateLimitResources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimit,
    pub search: Option<RateLimit>,
    pub graphql: Option<RateLimit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_event_commit_count() {
        let event: Event = serde_json::from_str(
            r#"{
                "id": "1",
                "type": "PushEvent",
                "repo": { "id": 9, "name": "octocat/hello" },
                "payload": { "size": 3, "commits": [] },
                "created_at": "2024-01-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert!(event.is_push());
        assert_eq!(event.commit_count(), 3);
    }

    #[test]
    fn test_unknown_event_and_payload() {
        let event: Event = serde_json::from_str(
            r#"{
                "id": "2",
                "type": "SponsorshipEvent",
                "payload": { "action": "created" },
                "created_at": "2024-01-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::Other);
        assert_eq!(event.commit_count(), 1);
    }

    #[test]
    fn test_commit_count_falls_back_to_commit_list() {
        let event: Event = serde_json::from_str(
            r#"{
                "id": "3",
                "type": "PushEvent",
                "payload": { "commits": [{ "sha": "a" }, { "sha": "b" }] },
                "created_at": "2024-01-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(event.commit_count(), 2);
    }

    #[test]
    fn test_empty_push_counts_once() {
        let event: Event = serde_json::from_str(
            r#"{
                "id": "4",
                "type": "PushEvent",
                "payload": { "size": 0, "commits": [] },
                "created_at": "2024-01-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(event.commit_count(), 1);
    }
}
