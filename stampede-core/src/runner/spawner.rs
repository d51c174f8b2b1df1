use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::HttpClient;

use super::counters::RunCounters;
use super::scenario::{GrowthModel, ScenarioSpec};
use super::vu::run_user;

/// Interval between user spawns, computed once per run.
///
/// The linear model spreads the whole user population evenly across the test
/// duration: `duration / users`.
pub fn spawn_interval(scenario: &ScenarioSpec) -> Duration {
    match scenario.growth() {
        GrowthModel::Linear => scenario.duration().div_f64(scenario.users() as f64),
    }
}

/// Recurring spawn timer. Each tick launches one virtual user as an
/// independent task without awaiting it; the loop retires itself once the
/// user quota is reached, which may happen before the test duration elapses.
pub(crate) async fn spawn_loop(
    scenario: Arc<ScenarioSpec>,
    client: Arc<HttpClient>,
    counters: Arc<RunCounters>,
) {
    let mut interval = tokio::time::interval(spawn_interval(&scenario));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if counters.spawned() >= scenario.users() {
            return;
        }

        // Claim the counters before spawning so the drain barrier can never
        // observe zero concurrency while a just-spawned user is waiting for
        // its first poll.
        counters.increment_spawned();
        counters.enter_user();

        let scenario = scenario.clone();
        let client = client.clone();
        let counters = counters.clone();
        tokio::spawn(run_user(scenario, client, counters));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(users: u64, duration_secs: u64) -> ScenarioSpec {
        match ScenarioSpec::new(
            users,
            "http://localhost/",
            duration_secs,
            GrowthModel::Linear,
            0,
            1000.0,
        ) {
            Ok(spec) => spec,
            Err(err) => panic!("scenario should be valid: {err}"),
        }
    }

    #[test]
    fn linear_interval_spreads_users_across_the_duration() {
        assert_eq!(
            spawn_interval(&scenario(10, 100)),
            Duration::from_millis(10_000)
        );
        assert_eq!(spawn_interval(&scenario(2000, 60)), Duration::from_millis(30));
        assert_eq!(spawn_interval(&scenario(1, 30)), Duration::from_secs(30));
    }
}
