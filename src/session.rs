// Session context.
// One authenticated login: client, cache store, dashboard, and credential slot.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{Credential, CredentialSlot};
use crate::batch::BatchRunner;
use crate::cache::{
    CacheKind, CacheManager, FileBackend, MemoryBackend, Owner, PersistentStore, StorageBackend,
    TtlPolicy,
};
use crate::clock::{Clock, SystemClock};
use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::error::Result;
use crate::github::{GitHubApi, GitHubClient, User};

/// Everything that lives from login to logout. Nothing here is global.
pub struct Session {
    user: User,
    dashboard: Dashboard,
    runner: BatchRunner,
    credentials: CredentialSlot,
}

impl Session {
    /// Validate `credential` against GitHub and open a file-backed session.
    pub async fn login(
        credential: Credential,
        config: DashboardConfig,
        credentials: CredentialSlot,
    ) -> Result<Self> {
        let client = GitHubClient::new(&credential.token)?;

        let backend: Arc<dyn StorageBackend> = match config.resolved_cache_dir() {
            Some(dir) => Arc::new(FileBackend::new(dir, config.storage_quota_bytes)),
            None => {
                warn!("No cache directory available, caching in memory only");
                Arc::new(match config.storage_quota_bytes {
                    Some(quota) => MemoryBackend::with_quota(quota),
                    None => MemoryBackend::new(),
                })
            }
        };

        Self::open(
            Arc::new(client),
            backend,
            Arc::new(SystemClock),
            config,
            credential,
            credentials,
        )
        .await
    }

    /// Open a session over explicit collaborators.
    pub async fn open(
        api: Arc<dyn GitHubApi>,
        backend: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
        config: DashboardConfig,
        credential: Credential,
        credentials: CredentialSlot,
    ) -> Result<Self> {
        let user = credential.validate(api.as_ref()).await?;
        credentials.store(credential)?;

        let store = PersistentStore::new(backend, clock.clone(), config.cache_namespace.clone())
            .with_max_attempts(config.write_attempts);
        let cache = CacheManager::new(Arc::new(store), TtlPolicy::from_config(&config));

        let swept = cache.sweep();
        if swept > 0 {
            info!("Removed {swept} expired cache entries");
        }
        adopt_authenticated_entries(&cache, &user);

        let runner = BatchRunner::new(config.batch_delay);
        let dashboard = Dashboard::new(api, cache, Arc::new(config), clock);

        Ok(Self {
            user,
            dashboard,
            runner,
            credentials,
        })
    }

    /// The account this session is logged in as.
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn runner(&self) -> &BatchRunner {
        &self.runner
    }

    /// Drop every cached entry in the namespace and forget the credential.
    pub fn logout(self) -> Result<usize> {
        let cleared = self.dashboard.cache().clear();
        self.credentials.clear()?;
        info!("Logged out {}, cleared {cleared} cache entries", self.user.login);
        Ok(cleared)
    }
}

/// `authenticated` entries belong to whoever cached them. Drop them when
/// that was someone else, then record who owns them now.
fn adopt_authenticated_entries(cache: &CacheManager, user: &User) {
    match cache.peek::<User>(CacheKind::User, &Owner::Authenticated) {
        Some(cached) if cached.id == user.id => return,
        Some(cached) => info!(
            "Signed in as {} after {}, dropping their cached data",
            user.login, cached.login
        ),
        None => debug!("No owner recorded for cached session data, dropping it"),
    }
    cache.invalidate_all(&Owner::Authenticated);
    cache.put(CacheKind::User, &Owner::Authenticated, user);
}
