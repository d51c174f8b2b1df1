use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use super::counters::{ActionResult, RunCounters};

/// How often progress snapshots are delivered to subscribers.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Periodic point-in-time view of a running test.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub elapsed: Duration,
    pub users_spawned: u64,
    pub avg_concurrent_users: f64,
    pub hits: u64,
    pub errors: u64,
    pub timeouts: u64,
    /// Mean response time over non-timed-out actions; 0 when there are none.
    pub avg_response_time_ms: f64,
}

/// Final view of a finished test, delivered exactly once.
#[derive(Debug, Clone)]
pub struct CompletionSnapshot {
    pub users_spawned: u64,
    pub test_duration: Duration,
    pub max_concurrent_users: u64,
    pub avg_concurrent_users: f64,
    pub avg_response_time_ms: f64,
    pub hits: u64,
    pub errors: u64,
    pub timeouts: u64,
}

pub type ProgressFn = Arc<dyn Fn(ProgressSnapshot) + Send + Sync + 'static>;
pub type CompletionFn = Arc<dyn Fn(CompletionSnapshot) + Send + Sync + 'static>;

pub(crate) fn progress_snapshot(counters: &RunCounters, elapsed: Duration) -> ProgressSnapshot {
    let results = counters.snapshot_results();

    ProgressSnapshot {
        elapsed,
        users_spawned: counters.spawned(),
        avg_concurrent_users: average_concurrency(&results),
        hits: counters.hits(),
        errors: counters.errors(),
        timeouts: counters.timeouts(),
        avg_response_time_ms: average_response_time_ms(&results),
    }
}

pub(crate) fn completion_snapshot(
    counters: &RunCounters,
    test_duration: Duration,
) -> CompletionSnapshot {
    let results = counters.snapshot_results();

    CompletionSnapshot {
        users_spawned: counters.spawned(),
        test_duration,
        max_concurrent_users: max_concurrency(&results),
        avg_concurrent_users: average_concurrency(&results),
        avg_response_time_ms: average_response_time_ms(&results),
        hits: counters.hits(),
        errors: counters.errors(),
        timeouts: counters.timeouts(),
    }
}

// The aggregates below are pure functions over the result multiset: the log's
// insertion order is completion order, which carries no meaning here.

fn average_concurrency(results: &[ActionResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }

    let total: u64 = results.iter().map(|r| r.concurrent_users).sum();
    (total as f64) / (results.len() as f64)
}

fn average_response_time_ms(results: &[ActionResult]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0u64;
    for result in results.iter().filter(|r| !r.timed_out) {
        sum += result.response_time_ms;
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }
    sum / (count as f64)
}

fn max_concurrency(results: &[ActionResult]) -> u64 {
    results.iter().map(|r| r.concurrent_users).max().unwrap_or(0)
}

/// Recurring progress reporter. First fire happens one interval after the
/// start; the engine stops this task at completion.
pub(crate) async fn progress_loop(
    counters: Arc<RunCounters>,
    started: Instant,
    listeners: Arc<[ProgressFn]>,
) {
    let start_at = tokio::time::Instant::from_std(started + PROGRESS_INTERVAL);
    let mut interval = tokio::time::interval_at(start_at, PROGRESS_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let snapshot = progress_snapshot(&counters, started.elapsed());
        for listener in listeners.iter() {
            listener(snapshot.clone());
        }
    }
}
