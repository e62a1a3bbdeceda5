// Scripted in-memory GitHub used by tests.
// Serves canned listings page by page and records every call.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{GhdashError, Result};

use super::api::GitHubApi;
use super::types::{
    AccountType, Event, EventKind, EventPayload, Gist, MergeUpstreamResult, RateLimit,
    RateLimitResources, RateLimitStatus, Repository, SimpleUser, User,
};

type Listing<T> = HashMap<Option<String>, Vec<T>>;

#[derive(Default)]
struct FakeState {
    repos: Listing<Repository>,
    starred: Listing<Repository>,
    followers: Listing<SimpleUser>,
    following: Listing<SimpleUser>,
    gists: Listing<Gist>,
    events: HashMap<String, Vec<Event>>,
    /// Call keys (e.g. "gists:alice", "star:o/r") that fail.
    failures: HashSet<String>,
    starred_by_me: HashSet<String>,
    followed_by_me: HashSet<String>,
    calls: Vec<(String, String)>,
}

pub struct FakeGitHub {
    login: String,
    state: Mutex<FakeState>,
}

impl FakeGitHub {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            state: Mutex::new(FakeState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key(owner: Option<&str>) -> Option<String> {
        owner.map(str::to_string)
    }

    pub fn set_repos(&self, owner: Option<&str>, repos: Vec<Repository>) {
        self.state().repos.insert(Self::key(owner), repos);
    }

    pub fn set_starred(&self, owner: Option<&str>, repos: Vec<Repository>) {
        self.state().starred.insert(Self::key(owner), repos);
    }

    pub fn set_followers(&self, owner: Option<&str>, users: Vec<SimpleUser>) {
        self.state().followers.insert(Self::key(owner), users);
    }

    pub fn set_following(&self, owner: Option<&str>, users: Vec<SimpleUser>) {
        self.state().following.insert(Self::key(owner), users);
    }

    pub fn set_gists(&self, owner: Option<&str>, gists: Vec<Gist>) {
        self.state().gists.insert(Self::key(owner), gists);
    }

    pub fn set_events(&self, login: &str, events: Vec<Event>) {
        self.state().events.insert(login.to_string(), events);
    }

    /// Make calls matching `key` fail, e.g. `"gists:alice"` or `"follow:bob"`.
    pub fn fail_on(&self, key: &str) {
        self.state().failures.insert(key.to_string());
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|(m, _)| m == method).count()
    }

    pub fn call_args(&self, method: &str) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, arg)| arg.clone())
            .collect()
    }

    pub fn starred_by_me(&self) -> HashSet<String> {
        self.state().starred_by_me.clone()
    }

    pub fn followed_by_me(&self) -> HashSet<String> {
        self.state().followed_by_me.clone()
    }

    fn record(&self, method: &str, arg: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push((method.to_string(), arg.to_string()));

        let short = method.trim_end_matches("_page");
        if state.failures.contains(&format!("{short}:{arg}")) {
            return Err(GhdashError::Other(format!("scripted failure for {short}:{arg}")));
        }
        Ok(())
    }

    fn page_of<T: Clone>(items: Option<&Vec<T>>, page: u32, per_page: u32) -> Vec<T> {
        let Some(items) = items else {
            return Vec::new();
        };
        let start = ((page - 1) * per_page) as usize;
        items
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn current_user(&self) -> Result<User> {
        self.record("current_user", "")?;
        Ok(user(&self.login))
    }

    async fn user(&self, login: &str) -> Result<User> {
        self.record("user", login)?;
        Ok(user(login))
    }

    async fn repos_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>> {
        self.record("repos_page", owner.unwrap_or("me"))?;
        Ok(Self::page_of(self.state().repos.get(&Self::key(owner)), page, per_page))
    }

    async fn starred_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>> {
        self.record("starred_page", owner.unwrap_or("me"))?;
        Ok(Self::page_of(self.state().starred.get(&Self::key(owner)), page, per_page))
    }

    async fn followers_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SimpleUser>> {
        self.record("followers_page", owner.unwrap_or("me"))?;
        Ok(Self::page_of(self.state().followers.get(&Self::key(owner)), page, per_page))
    }

    async fn following_page(
        &self,
        owner: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SimpleUser>> {
        self.record("following_page", owner.unwrap_or("me"))?;
        Ok(Self::page_of(self.state().following.get(&Self::key(owner)), page, per_page))
    }

    async fn gists_page(&self, owner: Option<&str>, page: u32, per_page: u32) -> Result<Vec<Gist>> {
        self.record("gists_page", owner.unwrap_or("me"))?;
        Ok(Self::page_of(self.state().gists.get(&Self::key(owner)), page, per_page))
    }

    async fn events_page(&self, login: &str, page: u32, per_page: u32) -> Result<Vec<Event>> {
        self.record("events_page", login)?;
        Ok(Self::page_of(self.state().events.get(login), page, per_page))
    }

    async fn star(&self, owner: &str, repo: &str) -> Result<()> {
        let full_name = format!("{owner}/{repo}");
        self.record("star", &full_name)?;
        self.state().starred_by_me.insert(full_name);
        Ok(())
    }

    async fn unstar(&self, owner: &str, repo: &str) -> Result<()> {
        let full_name = format!("{owner}/{repo}");
        self.record("unstar", &full_name)?;
        self.state().starred_by_me.remove(&full_name);
        Ok(())
    }

    async fn is_starred(&self, owner: &str, repo: &str) -> Result<bool> {
        let full_name = format!("{owner}/{repo}");
        self.record("is_starred", &full_name)?;
        Ok(self.state().starred_by_me.contains(&full_name))
    }

    async fn follow(&self, login: &str) -> Result<()> {
        self.record("follow", login)?;
        self.state().followed_by_me.insert(login.to_string());
        Ok(())
    }

    async fn unfollow(&self, login: &str) -> Result<()> {
        self.record("unfollow", login)?;
        self.state().followed_by_me.remove(login);
        Ok(())
    }

    async fn is_following(&self, login: &str) -> Result<bool> {
        self.record("is_following", login)?;
        Ok(self.state().followed_by_me.contains(login))
    }

    async fn fork(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.record("fork", &format!("{owner}/{repo}"))?;
        Ok(repository(&format!("{}/{repo}", self.login), Utc::now()))
    }

    async fn merge_upstream(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<MergeUpstreamResult> {
        self.record("merge_upstream", &format!("{owner}/{repo}@{branch}"))?;
        Ok(MergeUpstreamResult {
            message: Some("Successfully fetched and fast-forwarded".to_string()),
            merge_type: Some("fast-forward".to_string()),
            base_branch: Some(branch.to_string()),
        })
    }

    async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        self.record("rate_limit_status", "")?;
        Ok(RateLimitStatus {
            resources: RateLimitResources {
                core: RateLimit {
                    limit: 5000,
                    remaining: 4999,
                    reset: 0,
                    used: 1,
                },
                search: None,
                graphql: None,
            },
        })
    }
}

pub fn simple_user(login: &str) -> SimpleUser {
    SimpleUser {
        id: login.bytes().map(u64::from).sum(),
        login: login.to_string(),
        account_type: AccountType::User,
        avatar_url: None,
        html_url: Some(format!("https://github.com/{login}")),
    }
}

pub fn user(login: &str) -> User {
    User {
        id: login.bytes().map(u64::from).sum(),
        login: login.to_string(),
        name: None,
        bio: None,
        avatar_url: None,
        html_url: Some(format!("https://github.com/{login}")),
        public_repos: 0,
        public_gists: 0,
        followers: 0,
        following: 0,
        created_at: None,
    }
}

pub fn repository(full_name: &str, updated_at: DateTime<Utc>) -> Repository {
    let (owner, name) = full_name.split_once('/').unwrap_or(("someone", full_name));
    Repository {
        id: full_name.bytes().map(u64::from).sum(),
        name: name.to_string(),
        full_name: full_name.to_string(),
        owner: simple_user(owner),
        private: false,
        fork: false,
        description: None,
        language: None,
        stargazers_count: 0,
        forks_count: 0,
        html_url: Some(format!("https://github.com/{full_name}")),
        default_branch: Some("main".to_string()),
        updated_at,
        pushed_at: None,
    }
}

pub fn gist(id: &str, owner: &str, updated_at: DateTime<Utc>) -> Gist {
    Gist {
        id: id.to_string(),
        description: Some(format!("gist {id}")),
        html_url: format!("https://gist.github.com/{owner}/{id}"),
        public: true,
        owner: Some(simple_user(owner)),
        files: HashMap::new(),
        created_at: updated_at,
        updated_at,
    }
}

pub fn push_event(created_at: DateTime<Utc>, commits: u32) -> Event {
    Event {
        id: created_at.timestamp_millis().to_string(),
        kind: EventKind::PushEvent,
        repo: None,
        payload: EventPayload {
            size: Some(commits),
            commits: Vec::new(),
        },
        created_at,
    }
}
