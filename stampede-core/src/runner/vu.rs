use std::sync::Arc;

use crate::HttpClient;

use super::action::execute_step;
use super::counters::RunCounters;
use super::scenario::ScenarioSpec;

/// One virtual user's walk through the scenario's step sequence.
///
/// The spawn loop claims the spawned/concurrent counters before this task is
/// spawned, so the drain barrier always sees the user; the runner owns the
/// exit decrement. Step failures are recorded, never retried, and never abort
/// the remaining steps.
pub(crate) async fn run_user(
    scenario: Arc<ScenarioSpec>,
    client: Arc<HttpClient>,
    counters: Arc<RunCounters>,
) {
    let pause = scenario.pause();

    let mut steps = scenario.steps().iter().peekable();
    while let Some(step) = steps.next() {
        execute_step(&client, &scenario, step, &counters).await;

        if steps.peek().is_some() && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    counters.leave_user();
}
