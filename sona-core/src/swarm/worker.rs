//! Worker state, per-worker results, and swarm progress types.

use serde::{Deserialize, Serialize};

/// Lifecycle of one partition worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Created, not yet started
    Idle,
    /// Fetching its partition
    Running,
    /// Finished with a result
    Completed,
    /// Aborted with an error
    Failed,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Running => write!(f, "running"),
            WorkerState::Completed => write!(f, "completed"),
            WorkerState::Failed => write!(f, "failed"),
        }
    }
}

/// Indexing counters for one worker or for the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResult {
    /// Repositories the search reported for the range
    pub found: usize,
    /// Repositories successfully indexed
    pub indexed: usize,
    /// Repositories that failed to index
    pub failed: usize,
    /// Failure messages
    pub errors: Vec<String>,
    /// Canonical URLs of indexed repositories
    pub repositories: Vec<String>,
}

/// Read-only view of one worker, as handed to callbacks and results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    /// Worker index, stable across the run
    pub id: usize,
    /// Partition this worker owns
    pub partition_id: String,
    /// Current lifecycle state
    pub state: WorkerState,
    /// Result, present once completed
    pub result: Option<IndexResult>,
    /// Failure message, present once failed
    pub error: Option<String>,
}

impl WorkerSnapshot {
    /// A fresh idle worker for a partition.
    #[must_use]
    pub fn idle(id: usize, partition_id: impl Into<String>) -> Self {
        Self {
            id,
            partition_id: partition_id.into(),
            state: WorkerState::Idle,
            result: None,
            error: None,
        }
    }
}

/// Swarm-wide progress, recomputed on every worker state transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SwarmProgress {
    /// Worker count
    pub total: usize,
    /// Workers completed
    pub completed: usize,
    /// Workers currently running
    pub running: usize,
    /// Workers failed
    pub failed: usize,
    /// Repositories found so far
    pub total_repositories: usize,
    /// Repositories indexed so far
    pub indexed_repositories: usize,
    /// Terminal workers as a share of all workers, in [0, 100]
    pub percentage: f32,
}

impl SwarmProgress {
    /// Compute progress from the current worker snapshots.
    #[must_use]
    pub fn from_workers(workers: &[WorkerSnapshot]) -> Self {
        let total = workers.len();
        let mut progress = Self {
            total,
            ..Self::default()
        };
        for worker in workers {
            match worker.state {
                WorkerState::Running => progress.running += 1,
                WorkerState::Completed => progress.completed += 1,
                WorkerState::Failed => progress.failed += 1,
                WorkerState::Idle => {}
            }
            if let Some(result) = &worker.result {
                progress.total_repositories += result.found;
                progress.indexed_repositories += result.indexed;
            }
        }
        if total > 0 {
            progress.percentage =
                (progress.completed + progress.failed) as f32 / total as f32 * 100.0;
        }
        progress
    }
}

/// Per-partition statistics in the final swarm result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStats {
    /// Partition id
    pub partition_id: String,
    /// Terminal worker state
    pub state: WorkerState,
    /// Repositories found in the partition
    pub found: usize,
    /// Repositories indexed from the partition
    pub indexed: usize,
    /// Repositories that failed in the partition
    pub failed: usize,
}
