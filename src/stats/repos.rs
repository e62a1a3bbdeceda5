// Repository statistics.
// Language breakdown and star/fork totals over a repository listing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::github::Repository;

/// Share of repositories using one primary language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageShare {
    pub language: String,
    pub repos: u32,
    /// Percentage of repositories that report a language.
    pub percentage: f64,
}

/// Aggregate numbers over an account's repositories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoStats {
    pub total_repos: u32,
    pub source_repos: u32,
    pub forked_repos: u32,
    pub total_stars: u64,
    pub total_forks: u64,
    pub languages: Vec<LanguageShare>,
    pub most_starred: Option<String>,
}

impl RepoStats {
    pub fn from_repos(repos: &[Repository]) -> Self {
        let forked = repos.iter().filter(|r| r.fork).count() as u32;

        let most_starred = repos
            .iter()
            .filter(|r| !r.fork && r.stargazers_count > 0)
            .max_by_key(|r| r.stargazers_count)
            .map(|r| r.full_name.clone());

        Self {
            total_repos: repos.len() as u32,
            source_repos: repos.len() as u32 - forked,
            forked_repos: forked,
            total_stars: repos.iter().map(|r| r.stargazers_count).sum(),
            total_forks: repos.iter().map(|r| r.forks_count).sum(),
            languages: language_breakdown(repos),
            most_starred,
        }
    }
}

/// Languages ordered by repository count, then name.
pub fn language_breakdown(repos: &[Repository]) -> Vec<LanguageShare> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for language in repos.iter().filter_map(|r| r.language.as_deref()) {
        *counts.entry(language).or_default() += 1;
    }

    let with_language: u32 = counts.values().sum();
    let mut shares: Vec<LanguageShare> = counts
        .into_iter()
        .map(|(language, repos)| LanguageShare {
            language: language.to_string(),
            repos,
            percentage: f64::from(repos) * 100.0 / f64::from(with_language),
        })
        .collect();

    shares.sort_by(|a, b| b.repos.cmp(&a.repos).then_with(|| a.language.cmp(&b.language)));
    shares
}
