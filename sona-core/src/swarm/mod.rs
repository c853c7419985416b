//! Swarm indexer: partitioned, rate-limited parallel corpus population.
//!
//! One worker per partition runs under a concurrency bound, sharing a
//! single token bucket and feeding fetched skills into the repository
//! collaborator. Aggregation deduplicates repositories by canonical URL
//! after every worker has terminated.

mod partition;
mod rate_limit;
mod repository;
mod worker;

pub use crate::config::SwarmConfig;
pub use partition::{
    KEYSPACE_END, KEYSPACE_START, Partition, create_empty_partitions, create_partitions,
    validate_cover,
};
pub use rate_limit::{RateLimiterStats, TokenBucket};
pub use repository::{
    FetchedSkill, RepositoryRef, SearchRequest, SearchResults, Skill, SkillLocation,
    SkillMetadata, SkillRepository, SourceAdapter, UpsertAction, UpsertOutcome,
};
pub use worker::{IndexResult, PartitionStats, SwarmProgress, WorkerSnapshot, WorkerState};

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::Result;
use crate::retry::RetryPolicy;

type WorkerCallback = Arc<dyn Fn(&WorkerSnapshot) + Send + Sync>;
type ProgressCallback = Arc<dyn Fn(&SwarmProgress) + Send + Sync>;

/// Request-rate statistics for one swarm run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    /// Indexed plus failed repositories
    pub total_requests: usize,
    /// Indexed repositories per second of run time
    pub requests_per_second: f64,
}

/// Final result of one swarm run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmResult {
    /// Per-worker terminal snapshots, in partition order
    pub workers: Vec<WorkerSnapshot>,
    /// URL-deduplicated aggregate counters
    pub aggregate: IndexResult,
    /// Per-partition statistics
    pub partitions: Vec<PartitionStats>,
    /// Request-rate statistics
    pub rate: RateStats,
    /// Wall-clock run duration
    pub duration_ms: u64,
    /// Whether the run was cancelled before all workers started
    pub cancelled: bool,
}

/// Partitioned parallel indexer over a source registry.
pub struct SwarmIndexer {
    adapter: Arc<dyn SourceAdapter>,
    repository: Arc<dyn SkillRepository>,
    partitions: Vec<Partition>,
    config: SwarmConfig,
    limiter: Arc<TokenBucket>,
    cancelled: AtomicBool,
    on_worker_update: Mutex<Option<WorkerCallback>>,
    on_progress: Mutex<Option<ProgressCallback>>,
}

impl SwarmIndexer {
    /// Build an indexer over validated partitions and configuration.
    pub fn new(
        adapter: Arc<dyn SourceAdapter>,
        repository: Arc<dyn SkillRepository>,
        partitions: Vec<Partition>,
        config: SwarmConfig,
    ) -> Result<Self> {
        config.validate()?;
        validate_cover(&partitions)?;
        let limiter = Arc::new(TokenBucket::new(config.global_rate_limit));
        Ok(Self {
            adapter,
            repository,
            partitions,
            config,
            limiter,
            cancelled: AtomicBool::new(false),
            on_worker_update: Mutex::new(None),
            on_progress: Mutex::new(None),
        })
    }

    /// Register a callback invoked with the worker snapshot on every
    /// worker state transition.
    pub fn on_worker_update(&self, callback: impl Fn(&WorkerSnapshot) + Send + Sync + 'static) {
        *self.on_worker_update.lock() = Some(Arc::new(callback));
    }

    /// Register a callback invoked with swarm progress on every worker
    /// state transition.
    pub fn on_progress(&self, callback: impl Fn(&SwarmProgress) + Send + Sync + 'static) {
        *self.on_progress.lock() = Some(Arc::new(callback));
    }

    /// Advisory cancellation: no new workers start; in-flight workers run
    /// to completion.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Probe the source adapter.
    pub async fn source_health(&self) -> Result<()> {
        self.adapter.health_check().await
    }

    /// Shared rate limiter statistics.
    #[must_use]
    pub fn limiter_stats(&self) -> RateLimiterStats {
        self.limiter.stats()
    }

    /// Index every partition under the configured concurrency bound.
    pub async fn index_all(&self) -> Result<SwarmResult> {
        self.cancelled.store(false, Ordering::SeqCst);
        let started = tokio::time::Instant::now();

        // Priority order decides both start order and result order.
        let mut ordered = self.partitions.clone();
        ordered.sort_by_key(|p| std::cmp::Reverse(p.priority.unwrap_or(0)));

        let workers_state: Mutex<Vec<WorkerSnapshot>> = Mutex::new(
            ordered
                .iter()
                .enumerate()
                .map(|(id, partition)| WorkerSnapshot::idle(id, partition.id.clone()))
                .collect(),
        );

        info!(
            workers = ordered.len(),
            max_concurrent = self.config.max_concurrent_workers,
            "Starting swarm run"
        );
        futures::stream::iter(0..ordered.len())
            .map(|index| self.run_worker(index, &ordered[index], &workers_state))
            .buffer_unordered(self.config.max_concurrent_workers)
            .collect::<Vec<()>>()
            .await;

        let workers = workers_state.into_inner();
        let cancelled = self.cancelled.load(Ordering::SeqCst);
        let duration = started.elapsed();
        let result = Self::aggregate(workers, duration, cancelled);
        info!(
            found = result.aggregate.found,
            indexed = result.aggregate.indexed,
            failed = result.aggregate.failed,
            duration_ms = result.duration_ms,
            "Swarm run finished"
        );
        Ok(result)
    }

    async fn run_worker(
        &self,
        index: usize,
        partition: &Partition,
        workers: &Mutex<Vec<WorkerSnapshot>>,
    ) {
        if self.cancelled.load(Ordering::SeqCst) {
            debug!(partition_id = %partition.id, "Worker skipped: swarm cancelled");
            return;
        }

        self.transition(workers, index, |worker| {
            worker.state = WorkerState::Running;
        });

        match self.index_partition(partition).await {
            Ok(result) => {
                self.transition(workers, index, |worker| {
                    worker.state = WorkerState::Completed;
                    worker.result = Some(result.clone());
                });
            }
            Err(err) => {
                warn!(partition_id = %partition.id, "Worker failed: {err}");
                self.transition(workers, index, |worker| {
                    worker.state = WorkerState::Failed;
                    worker.error = Some(err.to_string());
                });
            }
        }
    }

    /// Search and fetch one partition, page by page.
    async fn index_partition(&self, partition: &Partition) -> Result<IndexResult> {
        let retry = RetryPolicy::with_config(self.config.retry.clone());
        let mut result = IndexResult::default();
        let mut request = SearchRequest::for_partition(partition, self.config.per_page);

        loop {
            self.limiter.acquire().await;
            let page = retry.execute(|| self.adapter.search(&request)).await?;
            if request.page == 0 {
                result.found = page.total_count;
            }

            for repo in &page.repositories {
                self.limiter.acquire().await;
                let location = SkillLocation {
                    repository_url: repo.url.clone(),
                    path: repo.skill_path.clone(),
                    reference: None,
                };

                let indexed = match retry
                    .execute(|| self.adapter.fetch_skill_content(&location))
                    .await
                {
                    Ok(fetched) => {
                        let metadata = SkillMetadata {
                            name: repo.name.clone(),
                            repository_url: repo.url.clone(),
                            path: fetched.location.path.clone(),
                            content_sha: fetched.sha.clone(),
                            raw: fetched.raw,
                        };
                        self.repository.upsert_from_metadata(&metadata).await
                    }
                    Err(err) => Err(err),
                };

                match indexed {
                    Ok(outcome) => {
                        debug!(url = %repo.url, action = ?outcome.action, "Indexed repository");
                        result.indexed += 1;
                        result.repositories.push(repo.url.clone());
                    }
                    Err(err) => {
                        result.failed += 1;
                        result.errors.push(format!("{}: {err}", repo.url));
                        if !self.config.continue_on_error {
                            return Err(err);
                        }
                    }
                }
            }

            if !page.has_more {
                break;
            }
            request = request.next_page();
        }
        Ok(result)
    }

    fn transition(
        &self,
        workers: &Mutex<Vec<WorkerSnapshot>>,
        index: usize,
        apply: impl FnOnce(&mut WorkerSnapshot),
    ) {
        let (snapshot, progress) = {
            let mut state = workers.lock();
            apply(&mut state[index]);
            (state[index].clone(), SwarmProgress::from_workers(&state))
        };

        let worker_callback = self.on_worker_update.lock().clone();
        if let Some(callback) = worker_callback {
            callback(&snapshot);
        }
        let progress_callback = self.on_progress.lock().clone();
        if let Some(callback) = progress_callback {
            callback(&progress);
        }
    }

    fn aggregate(
        workers: Vec<WorkerSnapshot>,
        duration: std::time::Duration,
        cancelled: bool,
    ) -> SwarmResult {
        let mut aggregate = IndexResult::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut partitions = Vec::with_capacity(workers.len());

        for snapshot in &workers {
            if let Some(result) = &snapshot.result {
                aggregate.found += result.found;
                aggregate.failed += result.failed;
                aggregate.errors.extend(result.errors.iter().cloned());
                for repo_url in &result.repositories {
                    if seen.insert(canonical_url(repo_url)) {
                        aggregate.indexed += 1;
                        aggregate.repositories.push(repo_url.clone());
                    }
                }
            }
            if snapshot.state == WorkerState::Failed {
                aggregate.failed += 1;
                aggregate.errors.push(format!(
                    "Worker {}: {}",
                    snapshot.id,
                    snapshot.error.clone().unwrap_or_default()
                ));
            }

            let (found, indexed, failed) = snapshot
                .result
                .as_ref()
                .map_or((0, 0, 0), |r| (r.found, r.indexed, r.failed));
            partitions.push(PartitionStats {
                partition_id: snapshot.partition_id.clone(),
                state: snapshot.state,
                found,
                indexed,
                failed,
            });
        }

        let duration_secs = duration.as_secs_f64();
        let rate = RateStats {
            total_requests: aggregate.indexed + aggregate.failed,
            requests_per_second: if duration_secs > 0.0 {
                aggregate.indexed as f64 / duration_secs
            } else {
                0.0
            },
        };

        SwarmResult {
            workers,
            aggregate,
            partitions,
            rate,
            duration_ms: duration.as_millis() as u64,
            cancelled,
        }
    }
}

/// Canonical form used for aggregate dedup: parsed URL, no fragment, no
/// trailing slash, lowercased.
fn canonical_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            let mut rendered = parsed.to_string();
            while rendered.ends_with('/') {
                rendered.pop();
            }
            rendered.to_lowercase()
        }
        Err(_) => raw.trim_end_matches('/').to_lowercase(),
    }
}
