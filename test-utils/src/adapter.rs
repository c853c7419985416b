//! Scripted collaborators: a canned source adapter and a recording
//! skill repository.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use sona_core::swarm::{
    FetchedSkill, RepositoryRef, SearchRequest, SearchResults, Skill, SkillLocation,
    SkillMetadata, SkillRepository, SourceAdapter, UpsertAction, UpsertOutcome,
};
use sona_core::{Error, Result};

/// Source adapter backed by an in-memory repository list.
///
/// Search filters the configured repositories by name initial against the
/// requested range and paginates by `per_page`. Failures can be injected
/// per URL (fetch) or per range start (search).
#[derive(Default)]
pub struct ScriptedSourceAdapter {
    repos: Mutex<Vec<RepositoryRef>>,
    contents: Mutex<HashMap<String, String>>,
    fail_fetch: Mutex<HashSet<String>>,
    fail_search: Mutex<HashSet<char>>,
    search_calls: Mutex<u32>,
}

impl ScriptedSourceAdapter {
    /// Empty adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository with raw skill content at `SKILL.md`.
    pub fn add_repo(&self, name: &str, url: &str, raw: &str) {
        self.repos.lock().push(RepositoryRef {
            name: name.to_string(),
            url: url.to_string(),
            skill_path: "SKILL.md".to_string(),
        });
        self.contents.lock().insert(url.to_string(), raw.to_string());
    }

    /// Make every fetch of `url` fail.
    pub fn fail_fetch(&self, url: &str) {
        self.fail_fetch.lock().insert(url.to_string());
    }

    /// Make every search of the range starting at `range_start` fail.
    pub fn fail_search_range(&self, range_start: char) {
        self.fail_search.lock().insert(range_start);
    }

    /// Number of search calls served so far.
    #[must_use]
    pub fn search_calls(&self) -> u32 {
        *self.search_calls.lock()
    }
}

fn in_range(name: &str, start: char, end: char) -> bool {
    name.chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .is_some_and(|c| c >= start && c <= end)
}

/// Hex-encoded SHA-256 of `content`.
#[must_use]
pub fn content_sha(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl SourceAdapter for ScriptedSourceAdapter {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        *self.search_calls.lock() += 1;
        if self.fail_search.lock().contains(&request.range_start) {
            return Err(Error::Fetch(format!(
                "search unavailable for range {}-{}",
                request.range_start, request.range_end
            )));
        }

        let matching: Vec<RepositoryRef> = self
            .repos
            .lock()
            .iter()
            .filter(|repo| in_range(&repo.name, request.range_start, request.range_end))
            .cloned()
            .collect();

        let total_count = matching.len();
        let start = (request.page as usize) * (request.per_page as usize);
        let page: Vec<RepositoryRef> = matching
            .into_iter()
            .skip(start)
            .take(request.per_page as usize)
            .collect();
        let has_more = start + page.len() < total_count;

        Ok(SearchResults {
            repositories: page,
            total_count,
            has_more,
        })
    }

    async fn fetch_skill_content(&self, location: &SkillLocation) -> Result<FetchedSkill> {
        if self.fail_fetch.lock().contains(&location.repository_url) {
            return Err(Error::Fetch(format!(
                "fetch failed for {}",
                location.repository_url
            )));
        }

        let raw = self
            .contents
            .lock()
            .get(&location.repository_url)
            .cloned()
            .ok_or_else(|| {
                Error::Fetch(format!("unknown repository {}", location.repository_url))
            })?;

        Ok(FetchedSkill {
            sha: content_sha(&raw),
            raw,
            location: location.clone(),
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Skill repository that records upserts, idempotent on content sha.
#[derive(Default)]
pub struct RecordingSkillRepository {
    by_sha: Mutex<HashMap<String, Skill>>,
    by_url: Mutex<HashMap<String, String>>,
    upserts: Mutex<Vec<(String, UpsertAction)>>,
}

impl RecordingSkillRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upsert so far, in call order.
    #[must_use]
    pub fn upserts(&self) -> Vec<(String, UpsertAction)> {
        self.upserts.lock().clone()
    }

    /// Number of distinct stored skills.
    #[must_use]
    pub fn skill_count(&self) -> usize {
        self.by_sha.lock().len()
    }
}

#[async_trait]
impl SkillRepository for RecordingSkillRepository {
    async fn upsert_from_metadata(&self, metadata: &SkillMetadata) -> Result<UpsertOutcome> {
        let mut by_sha = self.by_sha.lock();
        let mut by_url = self.by_url.lock();

        let outcome = if let Some(existing) = by_sha.get(&metadata.content_sha) {
            UpsertOutcome {
                id: existing.id.clone(),
                action: UpsertAction::Unchanged,
            }
        } else if let Some(previous_sha) = by_url.get(&metadata.repository_url).cloned() {
            let existing = by_sha
                .remove(&previous_sha)
                .ok_or_else(|| Error::InvalidState("url index out of sync".to_string()))?;
            let updated = Skill {
                content_sha: metadata.content_sha.clone(),
                ..existing
            };
            let id = updated.id.clone();
            by_sha.insert(metadata.content_sha.clone(), updated);
            by_url.insert(metadata.repository_url.clone(), metadata.content_sha.clone());
            UpsertOutcome {
                id,
                action: UpsertAction::Updated,
            }
        } else {
            let id = format!("skill-{}", by_url.len() + 1);
            by_sha.insert(
                metadata.content_sha.clone(),
                Skill {
                    id: id.clone(),
                    name: metadata.name.clone(),
                    content_sha: metadata.content_sha.clone(),
                    repository_url: metadata.repository_url.clone(),
                },
            );
            by_url.insert(metadata.repository_url.clone(), metadata.content_sha.clone());
            UpsertOutcome {
                id,
                action: UpsertAction::Created,
            }
        };

        self.upserts
            .lock()
            .push((metadata.repository_url.clone(), outcome.action));
        Ok(outcome)
    }

    async fn get_by_content_hash(&self, sha: &str) -> Result<Option<Skill>> {
        Ok(self.by_sha.lock().get(sha).cloned())
    }
}
