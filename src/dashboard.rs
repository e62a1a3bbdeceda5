// Dashboard aggregation.
// Composes individually cached resources into follow, star, gist, and commit views.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batch::{BatchRunner, CopyProgress};
use crate::cache::{CacheKind, CacheManager, FetchOptions, Owner};
use crate::clock::Clock;
use crate::config::DashboardConfig;
use crate::error::{GhdashError, Result};
use crate::github::{
    Event, GitHubApi, Gist, MergeUpstreamResult, PaginatedFetcher, RateLimitStatus, Repository,
    SimpleUser, User,
};
use crate::stats::{CommitStats, RepoStats};

/// Follower/following overlap for one account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowAnalysis {
    pub followers: usize,
    pub following: usize,
    pub mutual_follows: usize,
    /// Percentage of followed accounts that follow back. 0 when following nobody.
    pub followback_rate: f64,
    /// Followers the account does not follow back.
    pub followers_not_following_back: Vec<String>,
    /// Followed accounts that do not follow the account.
    pub following_not_followed_back: Vec<String>,
}

impl FollowAnalysis {
    /// Logins compare case-insensitively; output keeps input order.
    pub fn compute(followers: &[SimpleUser], following: &[SimpleUser]) -> Self {
        let follower_set: HashSet<String> = followers
            .iter()
            .map(|u| u.login.to_ascii_lowercase())
            .collect();
        let following_set: HashSet<String> = following
            .iter()
            .map(|u| u.login.to_ascii_lowercase())
            .collect();

        let mutual_follows = follower_set.intersection(&following_set).count();
        let followback_rate = if following_set.is_empty() {
            0.0
        } else {
            mutual_follows as f64 * 100.0 / following_set.len() as f64
        };

        let followers_not_following_back = followers
            .iter()
            .filter(|u| !following_set.contains(&u.login.to_ascii_lowercase()))
            .map(|u| u.login.clone())
            .collect();
        let following_not_followed_back = following
            .iter()
            .filter(|u| !follower_set.contains(&u.login.to_ascii_lowercase()))
            .map(|u| u.login.clone())
            .collect();

        Self {
            followers: follower_set.len(),
            following: following_set.len(),
            mutual_follows,
            followback_rate,
            followers_not_following_back,
            following_not_followed_back,
        }
    }
}

/// Starred repositories by the repository's own `updated_at`, newest first.
pub fn recently_updated(starred: &[Repository], limit: usize) -> Vec<Repository> {
    let mut repos = starred.to_vec();
    repos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    repos.truncate(limit);
    repos
}

/// Everything the dashboard page shows. Built per request, never cached whole.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub user: User,
    pub follow: FollowAnalysis,
    pub total_starred: usize,
    pub recent_starred: Vec<Repository>,
    pub network_gists: Vec<Gist>,
    pub commit_stats: CommitStats,
}

/// Aggregates cached GitHub resources for the session user or anyone else.
pub struct Dashboard {
    api: Arc<dyn GitHubApi>,
    cache: CacheManager,
    config: Arc<DashboardConfig>,
    clock: Arc<dyn Clock>,
}

impl Dashboard {
    pub fn new(
        api: Arc<dyn GitHubApi>,
        cache: CacheManager,
        config: Arc<DashboardConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api,
            cache,
            config,
            clock,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    fn fetcher(&self) -> PaginatedFetcher<'_> {
        PaginatedFetcher::new(self.api.as_ref(), &self.config)
    }

    pub async fn user(&self, owner: &Owner, options: FetchOptions) -> Result<User> {
        self.cache
            .get_or_fetch(
                CacheKind::User,
                owner,
                || async move {
                    match owner.login() {
                        Some(login) => self.api.user(login).await,
                        None => self.api.current_user().await,
                    }
                },
                options,
            )
            .await
    }

    /// Login for `owner`, resolving the session user through the cache.
    pub async fn login_of(&self, owner: &Owner) -> Result<String> {
        match owner.login() {
            Some(login) => Ok(login.to_string()),
            None => Ok(self.user(owner, FetchOptions::default()).await?.login),
        }
    }

    pub async fn repos(&self, owner: &Owner, options: FetchOptions) -> Result<Vec<Repository>> {
        self.cache
            .get_or_fetch(
                CacheKind::Repos,
                owner,
                || async move { self.fetcher().repos(owner.login()).await },
                options,
            )
            .await
    }

    pub async fn starred(&self, owner: &Owner, options: FetchOptions) -> Result<Vec<Repository>> {
        self.cache
            .get_or_fetch(
                CacheKind::Stars,
                owner,
                || async move { self.fetcher().starred(owner.login()).await },
                options,
            )
            .await
    }

    pub async fn followers(&self, owner: &Owner, options: FetchOptions) -> Result<Vec<SimpleUser>> {
        self.cache
            .get_or_fetch(
                CacheKind::Followers,
                owner,
                || async move { self.fetcher().followers(owner.login()).await },
                options,
            )
            .await
    }

    pub async fn following(&self, owner: &Owner, options: FetchOptions) -> Result<Vec<SimpleUser>> {
        self.cache
            .get_or_fetch(
                CacheKind::Following,
                owner,
                || async move { self.fetcher().following(owner.login()).await },
                options,
            )
            .await
    }

    /// Star/fork totals and language breakdown over the owner's repositories.
    pub async fn repo_stats(&self, owner: &Owner, options: FetchOptions) -> Result<RepoStats> {
        self.cache
            .get_or_fetch(
                CacheKind::Stats,
                owner,
                || async move {
                    let repos = self
                        .repos(owner, FetchOptions::refresh(options.force_refresh))
                        .await?;
                    Ok(RepoStats::from_repos(&repos))
                },
                options,
            )
            .await
    }

    /// Commit statistics from the public event window, cached on their own TTL.
    pub async fn commit_stats(&self, owner: &Owner, options: FetchOptions) -> Result<CommitStats> {
        self.cache
            .get_or_fetch(
                CacheKind::CommitStats,
                owner,
                || async move {
                    let login = self.login_of(owner).await?;
                    let events: Vec<Event> = self.fetcher().events(&login).await?;
                    debug!("Analyzing {} events for {login}", events.len());
                    Ok(CommitStats::from_events_local(&events, self.clock.now()))
                },
                options,
            )
            .await
    }

    async fn recent_gists(&self, login: &str, options: FetchOptions) -> Result<Vec<Gist>> {
        let per_user = self.config.gists_per_user.max(1) as u32;
        self.cache
            .get_or_fetch(
                CacheKind::Gists,
                &Owner::user(login),
                || self.api.gists_page(Some(login), 1, per_user),
                options,
            )
            .await
    }

    /// Recent gists from a bounded sample of followed accounts. A failed
    /// account contributes nothing.
    pub async fn network_gists(
        &self,
        following: &[SimpleUser],
        options: FetchOptions,
    ) -> Vec<Gist> {
        let sampled = following.iter().take(self.config.gist_sample_users);
        let fetches = sampled.map(|user| async move {
            match self.recent_gists(&user.login, options).await {
                Ok(mut gists) => {
                    gists.truncate(self.config.gists_per_user);
                    gists
                }
                Err(e) => {
                    warn!("Skipping gists from {}: {e}", user.login);
                    Vec::new()
                }
            }
        });

        let mut gists: Vec<Gist> = join_all(fetches).await.into_iter().flatten().collect();
        gists.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        gists.truncate(self.config.network_gist_limit);
        gists
    }

    pub async fn follow_analysis(
        &self,
        owner: &Owner,
        options: FetchOptions,
    ) -> Result<FollowAnalysis> {
        let (followers, following) = futures::try_join!(
            self.followers(owner, options),
            self.following(owner, options)
        )?;
        Ok(FollowAnalysis::compute(&followers, &following))
    }

    /// Load the full dashboard, fetching independent resources concurrently.
    pub async fn load(&self, owner: &Owner, force_refresh: bool) -> Result<DashboardData> {
        let options = FetchOptions::refresh(force_refresh);

        let (user, followers, following, starred, commit_stats) = futures::try_join!(
            self.user(owner, options),
            self.followers(owner, options),
            self.following(owner, options),
            self.starred(owner, options),
            self.commit_stats(owner, options)
        )?;

        let network_gists = self.network_gists(&following, options).await;

        Ok(DashboardData {
            user,
            follow: FollowAnalysis::compute(&followers, &following),
            total_starred: starred.len(),
            recent_starred: recently_updated(&starred, self.config.recent_starred_limit),
            network_gists,
            commit_stats,
        })
    }

    pub async fn star(&self, owner: &str, repo: &str) -> Result<()> {
        self.api.star(owner, repo).await?;
        self.cache.invalidate_all(&Owner::Authenticated);
        Ok(())
    }

    pub async fn unstar(&self, owner: &str, repo: &str) -> Result<()> {
        self.api.unstar(owner, repo).await?;
        self.cache.invalidate_all(&Owner::Authenticated);
        Ok(())
    }

    pub async fn is_starred(&self, owner: &str, repo: &str) -> Result<bool> {
        self.api.is_starred(owner, repo).await
    }

    pub async fn follow(&self, login: &str) -> Result<()> {
        self.api.follow(login).await?;
        self.cache.invalidate_all(&Owner::Authenticated);
        self.cache.invalidate(CacheKind::Followers, &Owner::user(login));
        Ok(())
    }

    pub async fn unfollow(&self, login: &str) -> Result<()> {
        self.api.unfollow(login).await?;
        self.cache.invalidate_all(&Owner::Authenticated);
        self.cache.invalidate(CacheKind::Followers, &Owner::user(login));
        Ok(())
    }

    pub async fn is_following(&self, login: &str) -> Result<bool> {
        self.api.is_following(login).await
    }

    pub async fn fork(&self, owner: &str, repo: &str) -> Result<Repository> {
        let fork = self.api.fork(owner, repo).await?;
        self.cache.invalidate(CacheKind::Repos, &Owner::Authenticated);
        self.cache.invalidate(CacheKind::Stats, &Owner::Authenticated);
        Ok(fork)
    }

    /// Bring a fork's branch up to date with its upstream.
    pub async fn sync_fork(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<MergeUpstreamResult> {
        let result = self.api.merge_upstream(owner, repo, branch).await?;
        self.cache.invalidate(CacheKind::Repos, &Owner::Authenticated);
        Ok(result)
    }

    pub async fn rate_limit(&self) -> Result<RateLimitStatus> {
        self.api.rate_limit_status().await
    }

    /// Star everything `from` has starred that the session user has not.
    pub async fn copy_stars(
        &self,
        from: &str,
        runner: &BatchRunner,
        cancel: &CancellationToken,
    ) -> Result<CopyProgress> {
        let theirs = self
            .starred(&Owner::user(from), FetchOptions::default())
            .await?;
        let mine: HashSet<String> = self
            .starred(&Owner::Authenticated, FetchOptions::refresh(true))
            .await?
            .into_iter()
            .map(|r| r.full_name.to_ascii_lowercase())
            .collect();

        let targets: Vec<String> = theirs
            .into_iter()
            .map(|r| r.full_name)
            .filter(|name| !mine.contains(&name.to_ascii_lowercase()))
            .collect();
        info!("Copying {} stars from {from}", targets.len());

        let progress = runner
            .run(targets, cancel, |full_name| async move {
                match full_name.split_once('/') {
                    Some((owner, repo)) => self.api.star(owner, repo).await,
                    None => Err(GhdashError::Other(format!(
                        "Invalid repository name '{full_name}'"
                    ))),
                }
            })
            .await;

        self.cache.invalidate_all(&Owner::Authenticated);
        Ok(progress)
    }

    /// Follow everyone `from` follows that the session user does not.
    pub async fn copy_following(
        &self,
        from: &str,
        runner: &BatchRunner,
        cancel: &CancellationToken,
    ) -> Result<CopyProgress> {
        let me = self.login_of(&Owner::Authenticated).await?.to_ascii_lowercase();
        let theirs = self
            .following(&Owner::user(from), FetchOptions::default())
            .await?;
        let mine: HashSet<String> = self
            .following(&Owner::Authenticated, FetchOptions::refresh(true))
            .await?
            .into_iter()
            .map(|u| u.login.to_ascii_lowercase())
            .collect();

        let targets: Vec<String> = theirs
            .into_iter()
            .map(|u| u.login)
            .filter(|login| {
                let login = login.to_ascii_lowercase();
                login != me && !mine.contains(&login)
            })
            .collect();
        info!("Copying {} follows from {from}", targets.len());

        let progress = runner
            .run(targets, cancel, |login| async move {
                self.api.follow(&login).await
            })
            .await;

        self.cache.invalidate_all(&Owner::Authenticated);
        Ok(progress)
    }
}
