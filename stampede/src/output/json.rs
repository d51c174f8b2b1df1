use serde::Serialize;
use std::io::Write as _;
use std::sync::Arc;

use stampede_core::runner::{CompletionSnapshot, ProgressFn, ProgressSnapshot, ScenarioSpec};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _scenario: &ScenarioSpec) {}

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |update| {
            let line = build_progress_line(&update);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, report: &CompletionSnapshot) -> anyhow::Result<()> {
        let line = build_summary_line(report);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub elapsed_secs: f64,
    pub users_spawned: u64,
    pub avg_concurrent_users: f64,
    pub hits: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub avg_response_time_ms: f64,
}

fn build_progress_line(update: &ProgressSnapshot) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        elapsed_secs: update.elapsed.as_secs_f64(),
        users_spawned: update.users_spawned,
        avg_concurrent_users: update.avg_concurrent_users,
        hits: update.hits,
        errors: update.errors,
        timeouts: update.timeouts,
        avg_response_time_ms: update.avg_response_time_ms,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub users_spawned: u64,
    pub test_duration_secs: f64,
    pub max_concurrent_users: u64,
    pub avg_concurrent_users: f64,
    pub avg_response_time_ms: f64,
    pub hits: u64,
    pub errors: u64,
    pub timeouts: u64,
}

fn build_summary_line(report: &CompletionSnapshot) -> JsonSummaryLine {
    JsonSummaryLine {
        kind: "summary",
        users_spawned: report.users_spawned,
        test_duration_secs: report.test_duration.as_secs_f64(),
        max_concurrent_users: report.max_concurrent_users,
        avg_concurrent_users: report.avg_concurrent_users,
        avg_response_time_ms: report.avg_response_time_ms,
        hits: report.hits,
        errors: report.errors,
        timeouts: report.timeouts,
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let Ok(serialized) = serde_json::to_string(line) else {
        return;
    };

    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let _ = writeln!(lock, "{serialized}");
}
