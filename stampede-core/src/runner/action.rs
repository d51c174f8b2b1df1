use std::time::Instant;

use crate::{Error as HttpError, HttpClient};

use super::counters::{ActionOutcome, ActionResult, RunCounters};
use super::scenario::{ScenarioSpec, StepTemplate};

/// Execute one step against the target and record the classified outcome.
///
/// Every invocation counts exactly one hit and appends exactly one result.
/// A response within the timeout classifies by status (2xx success, anything
/// else an error); a cancelled request classifies as a timeout. Transport
/// failures other than timeout are folded into the error tally.
pub(crate) async fn execute_step(
    client: &HttpClient,
    scenario: &ScenarioSpec,
    step: &StepTemplate,
    counters: &RunCounters,
) {
    let started = Instant::now();
    let outcome = match step.to_request(scenario.base_address(), scenario.timeout()) {
        Ok(request) => match client.request(request).await {
            Ok(response) => classify_status(response.status),
            Err(HttpError::Timeout(_)) => ActionOutcome::Timeout,
            Err(_) => ActionOutcome::Error,
        },
        // Steps are validated when added; a template that no longer resolves
        // is still recorded as a failed attempt rather than aborting the user.
        Err(_) => ActionOutcome::Error,
    };
    let elapsed = started.elapsed();

    counters.record_hit(outcome);
    counters.append_result(ActionResult {
        timed_out: outcome == ActionOutcome::Timeout,
        succeeded: outcome == ActionOutcome::Success,
        response_time_ms: elapsed.as_secs_f64() * 1000.0,
        concurrent_users: counters.concurrent(),
    });
}

fn classify_status(status: u16) -> ActionOutcome {
    if (200..=299).contains(&status) {
        ActionOutcome::Success
    } else {
        ActionOutcome::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_2xx_statuses_are_successes() {
        assert_eq!(classify_status(200), ActionOutcome::Success);
        assert_eq!(classify_status(204), ActionOutcome::Success);
        assert_eq!(classify_status(301), ActionOutcome::Error);
        assert_eq!(classify_status(404), ActionOutcome::Error);
        assert_eq!(classify_status(500), ActionOutcome::Error);
    }
}
