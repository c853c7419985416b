//! Collaborator contracts the swarm indexer consumes.
//!
//! The source adapter and skill repository live outside this crate; the
//! indexer only depends on these traits. Parsing fetched content into
//! structured skills is the repository's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

use super::partition::Partition;

/// One page request against a source registry, scoped to a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// First initial covered (inclusive)
    pub range_start: char,
    /// Last initial covered (inclusive)
    pub range_end: char,
    /// Zero-based page index
    pub page: u32,
    /// Page size
    pub per_page: u32,
}

impl SearchRequest {
    /// First page for a partition.
    #[must_use]
    pub fn for_partition(partition: &Partition, per_page: u32) -> Self {
        Self {
            range_start: partition.start,
            range_end: partition.end,
            page: 0,
            per_page,
        }
    }

    /// The next page of the same range.
    #[must_use]
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }
}

/// A repository reference returned by a source search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Repository name
    pub name: String,
    /// Canonical repository URL
    pub url: String,
    /// Path of the skill manifest inside the repository
    pub skill_path: String,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    /// Repositories on this page
    pub repositories: Vec<RepositoryRef>,
    /// Total repositories matching the range
    pub total_count: usize,
    /// Whether more pages exist
    pub has_more: bool,
}

/// Where a skill's content lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillLocation {
    /// Repository URL
    pub repository_url: String,
    /// Manifest path inside the repository
    pub path: String,
    /// Branch or revision, when pinned
    pub reference: Option<String>,
}

/// Raw fetched skill content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSkill {
    /// Raw manifest content
    pub raw: String,
    /// Content hash of `raw`
    pub sha: String,
    /// Where it came from
    pub location: SkillLocation,
}

/// Source registry adapter.
///
/// Implementations own their own transport-level retries where cheap;
/// the swarm wraps calls in its backoff policy regardless, and every
/// call is preceded by a rate-limiter token.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Search one page of a partition's range.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults>;

    /// Fetch raw skill content from a location.
    async fn fetch_skill_content(&self, location: &SkillLocation) -> Result<FetchedSkill>;

    /// Cheap reachability probe.
    async fn health_check(&self) -> Result<()>;
}

/// Parsed-enough skill metadata handed to the repository for upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMetadata {
    /// Skill name
    pub name: String,
    /// Canonical repository URL
    pub repository_url: String,
    /// Manifest path inside the repository
    pub path: String,
    /// Content hash; upserts are idempotent on it
    pub content_sha: String,
    /// Raw manifest content for downstream parsing
    pub raw: String,
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Created,
    Updated,
    Unchanged,
}

/// Result of an idempotent upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Repository-assigned skill id
    pub id: String,
    /// What happened
    pub action: UpsertAction,
}

/// A stored skill, as the repository reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Repository-assigned id
    pub id: String,
    /// Skill name
    pub name: String,
    /// Content hash of the stored manifest
    pub content_sha: String,
    /// Canonical repository URL
    pub repository_url: String,
}

/// Skill corpus writer consumed by the swarm.
#[async_trait]
pub trait SkillRepository: Send + Sync {
    /// Insert or refresh a skill; idempotent on `content_sha`.
    async fn upsert_from_metadata(&self, metadata: &SkillMetadata) -> Result<UpsertOutcome>;

    /// Look up a stored skill by content hash.
    async fn get_by_content_hash(&self, sha: &str) -> Result<Option<Skill>>;
}
