use stampede_core::runner::{CompletionSnapshot, ProgressFn, ScenarioSpec};

use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, scenario: &ScenarioSpec);
    fn progress(&self) -> Option<ProgressFn>;
    fn print_summary(&self, report: &CompletionSnapshot) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
