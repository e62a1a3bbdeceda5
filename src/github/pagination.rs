// Paginated listing fetcher.
// Walks page-based GitHub listings until a short page marks the end.

use std::future::Future;

use tracing::{debug, warn};

use crate::config::DashboardConfig;
use crate::error::Result;

use super::api::GitHubApi;
use super::types::{Event, Gist, Repository, SimpleUser};

/// Request pages starting at 1 until one returns fewer than `per_page` items.
///
/// `max_pages` bounds the walk; hitting it returns what was collected so far.
pub async fn fetch_all_pages<T, F, Fut>(
    per_page: u32,
    max_pages: Option<u32>,
    mut fetch_page: F,
) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut items = Vec::new();
    let mut page = 1;

    loop {
        let batch = fetch_page(page).await?;
        let count = batch.len();
        items.extend(batch);

        if count < per_page as usize {
            break;
        }

        if max_pages.is_some_and(|max| page >= max) {
            warn!(
                "Stopped after {page} pages ({} items); listing may be truncated",
                items.len()
            );
            break;
        }

        page += 1;
    }

    debug!("Fetched {} items in {page} pages", items.len());
    Ok(items)
}

/// Fetches complete collections through a [`GitHubApi`].
pub struct PaginatedFetcher<'a> {
    api: &'a dyn GitHubApi,
    per_page: u32,
    max_pages: Option<u32>,
    event_max_pages: u32,
}

impl<'a> PaginatedFetcher<'a> {
    pub fn new(api: &'a dyn GitHubApi, config: &DashboardConfig) -> Self {
        Self {
            api,
            per_page: config.per_page,
            max_pages: config.max_pages,
            event_max_pages: config.event_max_pages,
        }
    }

    pub async fn repos(&self, owner: Option<&str>) -> Result<Vec<Repository>> {
        fetch_all_pages(self.per_page, self.max_pages, |page| {
            self.api.repos_page(owner, page, self.per_page)
        })
        .await
    }

    pub async fn starred(&self, owner: Option<&str>) -> Result<Vec<Repository>> {
        fetch_all_pages(self.per_page, self.max_pages, |page| {
            self.api.starred_page(owner, page, self.per_page)
        })
        .await
    }

    pub async fn followers(&self, owner: Option<&str>) -> Result<Vec<SimpleUser>> {
        fetch_all_pages(self.per_page, self.max_pages, |page| {
            self.api.followers_page(owner, page, self.per_page)
        })
        .await
    }

    pub async fn following(&self, owner: Option<&str>) -> Result<Vec<SimpleUser>> {
        fetch_all_pages(self.per_page, self.max_pages, |page| {
            self.api.following_page(owner, page, self.per_page)
        })
        .await
    }

    pub async fn gists(&self, owner: Option<&str>) -> Result<Vec<Gist>> {
        fetch_all_pages(self.per_page, self.max_pages, |page| {
            self.api.gists_page(owner, page, self.per_page)
        })
        .await
    }

    pub async fn events(&self, login: &str) -> Result<Vec<Event>> {
        let max_pages = match self.max_pages {
            Some(max) => max.min(self.event_max_pages),
            None => self.event_max_pages,
        };
        fetch_all_pages(self.per_page, Some(max_pages), |page| {
            self.api.events_page(login, page, self.per_page)
        })
        .await
    }
}
