use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

/// Classified outcome of one executed action. Error and timeout are disjoint
/// categories: a timed-out request never counts as an http error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Error,
    Timeout,
}

/// Record of one executed action, appended to the shared result log and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub timed_out: bool,
    pub succeeded: bool,
    pub response_time_ms: f64,
    /// Concurrency level observed when this result was finalized.
    pub concurrent_users: u64,
}

/// Shared mutable state for one test run.
///
/// Every scalar is its own atomic and the result log has its own mutex, so
/// concurrent users contending on unrelated fields never serialize on a
/// single lock. Snapshot reads are consistent copies taken under the log
/// mutex.
#[derive(Debug, Default)]
pub struct RunCounters {
    spawned: AtomicU64,
    concurrent: AtomicU64,
    hits: AtomicU64,
    errors: AtomicU64,
    timeouts: AtomicU64,
    results: Mutex<Vec<ActionResult>>,
    idle: Notify,
}

impl RunCounters {
    pub fn increment_spawned(&self) {
        self.spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    pub fn enter_user(&self) {
        self.concurrent.fetch_add(1, Ordering::AcqRel);
    }

    pub fn leave_user(&self) {
        let prev = self.concurrent.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "concurrent user counter underflow");
        if prev == 1 {
            self.idle.notify_waiters();
        }
    }

    pub fn concurrent(&self) -> u64 {
        self.concurrent.load(Ordering::Acquire)
    }

    /// Record one attempted action. A hit is counted regardless of outcome.
    pub fn record_hit(&self, outcome: ActionOutcome) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        match outcome {
            ActionOutcome::Success => {}
            ActionOutcome::Error => {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
            ActionOutcome::Timeout => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn append_result(&self, result: ActionResult) {
        let mut results = self
            .results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results.push(result);
    }

    /// Consistent copy of the result log, in completion order.
    pub fn snapshot_results(&self) -> Vec<ActionResult> {
        let results = self
            .results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results.clone()
    }

    /// The drain barrier: resolve once the concurrency counter reaches zero.
    ///
    /// The waiter is enabled before the counter is re-checked, so a
    /// concurrent `leave_user` between the check and the await cannot be
    /// missed.
    pub async fn wait_idle(&self) {
        loop {
            if self.concurrent.load(Ordering::Acquire) == 0 {
                return;
            }

            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.concurrent.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_counter_returns_to_zero() {
        let counters = Arc::new(RunCounters::default());

        let mut handles = Vec::new();
        for _ in 0..64 {
            let counters = counters.clone();
            counters.enter_user();
            handles.push(tokio::spawn(async move {
                tokio::task::yield_now().await;
                counters.leave_user();
            }));
        }

        for handle in handles {
            if let Err(err) = handle.await {
                panic!("task panicked: {err}");
            }
        }

        assert_eq!(counters.concurrent(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn wait_idle_unblocks_when_the_last_user_leaves() {
        let counters = Arc::new(RunCounters::default());
        counters.enter_user();
        counters.enter_user();

        let waiter = {
            let counters = counters.clone();
            tokio::spawn(async move { counters.wait_idle().await })
        };

        counters.leave_user();
        counters.leave_user();

        match tokio::time::timeout(std::time::Duration::from_secs(5), waiter).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => panic!("waiter panicked: {err}"),
            Err(_) => panic!("wait_idle did not unblock"),
        }
    }

    #[tokio::test]
    async fn wait_idle_resolves_immediately_when_already_idle() {
        let counters = RunCounters::default();
        match tokio::time::timeout(std::time::Duration::from_secs(1), counters.wait_idle()).await {
            Ok(()) => {}
            Err(_) => panic!("wait_idle should not block with zero concurrency"),
        }
    }

    #[test]
    fn hits_count_every_attempt_and_split_by_outcome() {
        let counters = RunCounters::default();
        counters.record_hit(ActionOutcome::Success);
        counters.record_hit(ActionOutcome::Success);
        counters.record_hit(ActionOutcome::Error);
        counters.record_hit(ActionOutcome::Timeout);

        assert_eq!(counters.hits(), 4);
        assert_eq!(counters.errors(), 1);
        assert_eq!(counters.timeouts(), 1);

        // Successes are the remainder of the hit tally.
        let successes = counters.hits() - counters.errors() - counters.timeouts();
        assert_eq!(successes, 2);
    }

    #[test]
    fn snapshot_is_a_consistent_copy() {
        let counters = RunCounters::default();
        counters.append_result(ActionResult {
            timed_out: false,
            succeeded: true,
            response_time_ms: 12.5,
            concurrent_users: 1,
        });

        let snapshot = counters.snapshot_results();
        assert_eq!(snapshot.len(), 1);

        counters.append_result(ActionResult {
            timed_out: true,
            succeeded: false,
            response_time_ms: 3000.0,
            concurrent_users: 2,
        });

        // The earlier snapshot is unaffected by later appends.
        assert_eq!(snapshot.len(), 1);
        assert_eq!(counters.snapshot_results().len(), 2);
    }
}
