// Cache key construction.
// Maps (resource kind, owner) pairs to storage keys and default TTLs.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::DashboardConfig;

/// Resource category held by a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKind {
    User,
    Repos,
    Stars,
    Stats,
    Followers,
    Following,
    CommitStats,
    Gists,
}

impl CacheKind {
    pub const ALL: [CacheKind; 8] = [
        CacheKind::User,
        CacheKind::Repos,
        CacheKind::Stars,
        CacheKind::Stats,
        CacheKind::Followers,
        CacheKind::Following,
        CacheKind::CommitStats,
        CacheKind::Gists,
    ];

    /// Name used inside storage keys.
    pub fn storage_name(&self) -> &'static str {
        match self {
            CacheKind::User => "user",
            CacheKind::Repos => "repos",
            CacheKind::Stars => "stars",
            CacheKind::Stats => "stats",
            CacheKind::Followers => "followers",
            CacheKind::Following => "following",
            CacheKind::CommitStats => "commit-stats",
            CacheKind::Gists => "gists",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_name())
    }
}

/// Account a cached resource belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// The user the session is authenticated as.
    Authenticated,
    /// Any other account, by login.
    User(String),
}

impl Owner {
    /// Logins are case-insensitive on GitHub, so they are normalized here.
    pub fn user(login: &str) -> Self {
        Owner::User(login.to_ascii_lowercase())
    }

    pub fn login(&self) -> Option<&str> {
        match self {
            Owner::Authenticated => None,
            Owner::User(login) => Some(login),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Owner::Authenticated)
    }

    /// Key segment. Logins cannot contain `@`, so the two forms never collide.
    pub fn key_segment(&self) -> String {
        match self {
            Owner::Authenticated => "authenticated".to_string(),
            Owner::User(login) => format!("@{login}"),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Authenticated => f.write_str("authenticated user"),
            Owner::User(login) => f.write_str(login),
        }
    }
}

/// Storage key for a (kind, owner) pair, without the namespace prefix.
pub fn cache_key(kind: CacheKind, owner: &Owner) -> String {
    format!("{}_{}", kind.storage_name(), owner.key_segment())
}

/// Default TTL lookup per kind and owner.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    authenticated: Duration,
    other_user: Duration,
    per_kind: HashMap<CacheKind, Duration>,
}

impl TtlPolicy {
    pub fn new(authenticated: Duration, other_user: Duration) -> Self {
        Self {
            authenticated,
            other_user,
            per_kind: HashMap::new(),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.default_ttl, config.other_user_ttl)
            .with_kind(CacheKind::CommitStats, config.commit_stats_ttl)
    }

    /// Pin a TTL for one kind regardless of owner.
    pub fn with_kind(mut self, kind: CacheKind, ttl: Duration) -> Self {
        self.per_kind.insert(kind, ttl);
        self
    }

    pub fn ttl_for(&self, kind: CacheKind, owner: &Owner) -> Duration {
        if let Some(ttl) = self.per_kind.get(&kind) {
            return *ttl;
        }
        match owner {
            Owner::Authenticated => self.authenticated,
            Owner::User(_) => self.other_user,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&DashboardConfig::default())
    }
}
