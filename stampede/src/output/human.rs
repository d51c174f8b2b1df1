use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use stampede_core::runner::{CompletionSnapshot, ProgressFn, ScenarioSpec};

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    bar: ProgressBar,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(bar_style());

        Self { bar }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, scenario: &ScenarioSpec) {
        eprintln!(
            "target={} users={} duration={} pause={} timeout={} growth={} steps={}",
            scenario.base_address(),
            scenario.users(),
            humantime::format_duration(scenario.duration()),
            humantime::format_duration(scenario.pause()),
            format_millis(scenario.timeout().as_secs_f64() * 1000.0),
            scenario.growth(),
            scenario.steps().len(),
        );

        self.bar.set_length(scenario.duration().as_millis() as u64);
        self.bar
            .set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
    }

    fn progress(&self) -> Option<ProgressFn> {
        let bar = self.bar.clone();
        Some(Arc::new(move |update| {
            let elapsed_ms = update.elapsed.as_millis() as u64;
            bar.set_position(elapsed_ms.min(bar.length().unwrap_or(elapsed_ms)));
            bar.set_message(format!(
                "users={} avg_conc={:.1} hits={} errors={} timeouts={} avg_rt={}",
                update.users_spawned,
                update.avg_concurrent_users,
                update.hits,
                update.errors,
                update.timeouts,
                format_millis(update.avg_response_time_ms),
            ));
        }))
    }

    fn print_summary(&self, report: &CompletionSnapshot) -> anyhow::Result<()> {
        self.bar.finish_and_clear();

        let mut out = String::new();
        out.push_str("simulation completed\n");
        writeln!(&mut out, "  users spawned: {}", report.users_spawned).ok();
        writeln!(
            &mut out,
            "  test duration: {}",
            humantime::format_duration(Duration::from_secs(report.test_duration.as_secs()))
        )
        .ok();
        writeln!(
            &mut out,
            "  concurrent users: max={} avg={:.1}",
            report.max_concurrent_users, report.avg_concurrent_users
        )
        .ok();
        writeln!(
            &mut out,
            "  avg response time: {}",
            format_millis(report.avg_response_time_ms)
        )
        .ok();
        writeln!(
            &mut out,
            "  hits: {} (errors {}, timeouts {})",
            report.hits, report.errors, report.timeouts
        )
        .ok();

        print!("{out}");
        Ok(())
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("[ {bar:20.cyan/blue} ] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}

fn format_millis(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        format!("{ms:.1}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_millis_picks_a_stable_unit() {
        assert_eq!(format_millis(0.0), "0.0ms");
        assert_eq!(format_millis(82.5), "82.5ms");
        assert_eq!(format_millis(1500.0), "1.50s");
    }
}
