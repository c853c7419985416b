//! Swarm indexing scenarios: dedup, rate limiting, partitions, failure capture.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sona_core::retry::RetryConfig;
use sona_core::swarm::{
    Partition, SwarmIndexer, TokenBucket, UpsertAction, WorkerState, create_empty_partitions,
    validate_cover,
};
use sona_core::SwarmConfig;
use test_utils::{RecordingSkillRepository, ScriptedSourceAdapter};

fn fast_retry() -> RetryConfig {
    RetryConfig::default()
        .with_max_retries(0)
        .without_jitter()
}

fn indexer_with(
    adapter: Arc<ScriptedSourceAdapter>,
    repository: Arc<RecordingSkillRepository>,
    config: SwarmConfig,
) -> SwarmIndexer {
    SwarmIndexer::new(adapter, repository, create_empty_partitions(), config).unwrap()
}

fn default_config() -> SwarmConfig {
    SwarmConfig {
        global_rate_limit: 100,
        retry: fast_retry(),
        ..SwarmConfig::default()
    }
}

/// S4: the same URL surfacing in two partitions indexes exactly once.
#[tokio::test(start_paused = true)]
async fn test_swarm_dedups_shared_urls() {
    let adapter = Arc::new(ScriptedSourceAdapter::new());
    // Same canonical repository listed under two names in two partitions.
    adapter.add_repo("alpha-skill", "https://example.com/x", "skill: alpha");
    adapter.add_repo("zulu-skill", "https://example.com/x/", "skill: alpha");
    let repository = Arc::new(RecordingSkillRepository::new());

    let indexer = indexer_with(adapter, repository.clone(), default_config());
    let result = indexer.index_all().await.unwrap();

    assert_eq!(result.aggregate.found, 2);
    assert_eq!(result.aggregate.indexed, 1);
    assert_eq!(result.aggregate.repositories.len(), 1);
    // The repository saw both upserts; the second was a no-op by sha.
    assert_eq!(repository.skill_count(), 1);
    let actions: Vec<UpsertAction> = repository.upserts().iter().map(|(_, a)| *a).collect();
    assert!(actions.contains(&UpsertAction::Unchanged));
}

/// S5: 6 sequential token acquires at 2 tokens/sec take at least 2 seconds.
#[tokio::test(start_paused = true)]
async fn test_rate_limited_burst() {
    let bucket = TokenBucket::new(2);
    let before = tokio::time::Instant::now();
    for _ in 0..6 {
        bucket.acquire().await;
    }
    assert!(before.elapsed() >= Duration::from_secs(2));
}

/// The swarm's shared bucket throttles worker fetches end to end.
#[tokio::test(start_paused = true)]
async fn test_swarm_respects_rate_limit() {
    let adapter = Arc::new(ScriptedSourceAdapter::new());
    for i in 0..5 {
        adapter.add_repo(
            &format!("alpha-{i}"),
            &format!("https://example.com/alpha-{i}"),
            "skill: alpha",
        );
    }
    let repository = Arc::new(RecordingSkillRepository::new());

    // 4 searches + 5 fetches = 9 acquires at 2/sec.
    let config = SwarmConfig {
        global_rate_limit: 2,
        max_concurrent_workers: 1,
        retry: fast_retry(),
        ..SwarmConfig::default()
    };
    let indexer = indexer_with(adapter, repository, config);
    let result = indexer.index_all().await.unwrap();

    assert_eq!(result.aggregate.indexed, 5);
    assert!(result.duration_ms >= 3_000);
}

/// Partition cover invariant over the default split.
#[test]
fn test_partition_cover() {
    let partitions = create_empty_partitions();
    validate_cover(&partitions).unwrap();
    for c in 'A'..='Z' {
        let key = c.to_string();
        assert_eq!(partitions.iter().filter(|p| p.contains(&key)).count(), 1);
    }
}

/// A failing fetch is captured per repository and the swarm continues.
#[tokio::test(start_paused = true)]
async fn test_continue_on_error_captures_failures() {
    let adapter = Arc::new(ScriptedSourceAdapter::new());
    adapter.add_repo("alpha-ok", "https://example.com/ok", "skill: ok");
    adapter.add_repo("amber-bad", "https://example.com/bad", "skill: bad");
    adapter.fail_fetch("https://example.com/bad");
    let repository = Arc::new(RecordingSkillRepository::new());

    let indexer = indexer_with(adapter, repository, default_config());
    let result = indexer.index_all().await.unwrap();

    assert_eq!(result.aggregate.indexed, 1);
    assert_eq!(result.aggregate.failed, 1);
    assert!(result.aggregate.errors.iter().any(|e| e.contains("bad")));
    // The worker itself still completed.
    assert!(result.workers.iter().all(|w| w.state != WorkerState::Failed));
}

/// A failing search marks the worker failed with a "Worker {id}:" error.
#[tokio::test(start_paused = true)]
async fn test_failed_worker_reported() {
    let adapter = Arc::new(ScriptedSourceAdapter::new());
    adapter.add_repo("alpha-ok", "https://example.com/ok", "skill: ok");
    adapter.fail_search_range('G');
    let repository = Arc::new(RecordingSkillRepository::new());

    let indexer = indexer_with(adapter, repository, default_config());
    let result = indexer.index_all().await.unwrap();

    let failed: Vec<_> = result
        .workers
        .iter()
        .filter(|w| w.state == WorkerState::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].partition_id, "g-l");
    assert!(
        result
            .aggregate
            .errors
            .iter()
            .any(|e| e.starts_with(&format!("Worker {}:", failed[0].id)))
    );
    // The other partitions were unaffected.
    assert_eq!(result.aggregate.indexed, 1);
}

/// Progress callbacks observe every state transition in order.
#[tokio::test(start_paused = true)]
async fn test_progress_callbacks() {
    let adapter = Arc::new(ScriptedSourceAdapter::new());
    adapter.add_repo("alpha", "https://example.com/a", "skill: a");
    adapter.add_repo("mike", "https://example.com/m", "skill: m");
    let repository = Arc::new(RecordingSkillRepository::new());

    let indexer = indexer_with(adapter, repository, default_config());
    let transitions = Arc::new(AtomicUsize::new(0));
    let final_percentage = Arc::new(std::sync::Mutex::new(0.0f32));

    {
        let transitions = transitions.clone();
        indexer.on_worker_update(move |_worker| {
            transitions.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let final_percentage = final_percentage.clone();
        indexer.on_progress(move |progress| {
            *final_percentage.lock().unwrap() = progress.percentage;
        });
    }

    indexer.index_all().await.unwrap();

    // Each of the 4 workers transitions Idle→Running and Running→terminal.
    assert_eq!(transitions.load(Ordering::SeqCst), 8);
    assert!((*final_percentage.lock().unwrap() - 100.0).abs() < 1e-6);
}

/// Cancellation stops idle workers; started work runs to completion.
#[tokio::test(start_paused = true)]
async fn test_cancel_is_advisory() {
    let adapter = Arc::new(ScriptedSourceAdapter::new());
    for c in ['a', 'g', 'm', 's'] {
        adapter.add_repo(
            &format!("{c}-skill"),
            &format!("https://example.com/{c}"),
            "skill: x",
        );
    }
    let repository = Arc::new(RecordingSkillRepository::new());

    let config = SwarmConfig {
        max_concurrent_workers: 1,
        retry: fast_retry(),
        global_rate_limit: 100,
        ..SwarmConfig::default()
    };
    let indexer = Arc::new(indexer_with(adapter, repository, config));

    // Cancel as soon as the first worker starts.
    {
        let indexer_for_cancel = indexer.clone();
        indexer.on_worker_update(move |worker| {
            if worker.state == WorkerState::Running {
                indexer_for_cancel.cancel();
            }
        });
    }

    let result = indexer.index_all().await.unwrap();
    assert!(result.cancelled);
    let completed = result
        .workers
        .iter()
        .filter(|w| w.state == WorkerState::Completed)
        .count();
    let idle = result
        .workers
        .iter()
        .filter(|w| w.state == WorkerState::Idle)
        .count();
    assert_eq!(completed, 1);
    assert_eq!(idle, 3);
}

/// Worker result ordering follows partition priority.
#[tokio::test(start_paused = true)]
async fn test_priority_orders_results() {
    let adapter = Arc::new(ScriptedSourceAdapter::new());
    let repository = Arc::new(RecordingSkillRepository::new());

    let partitions = vec![
        Partition::new('A', 'F').with_priority(10),
        Partition::new('G', 'L').with_priority(40),
        Partition::new('M', 'R').with_priority(30),
        Partition::new('S', 'Z').with_priority(20),
    ];
    let indexer =
        SwarmIndexer::new(adapter, repository, partitions, default_config()).unwrap();
    let result = indexer.index_all().await.unwrap();

    let order: Vec<&str> = result
        .workers
        .iter()
        .map(|w| w.partition_id.as_str())
        .collect();
    assert_eq!(order, vec!["g-l", "m-r", "s-z", "a-f"]);
}
