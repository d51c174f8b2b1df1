mod action;
mod counters;
mod engine;
mod error;
mod progress;
mod scenario;
mod spawner;
mod vu;

pub use counters::{ActionOutcome, ActionResult, RunCounters};
pub use engine::Engine;
pub use error::{Error, Result};
pub use progress::{
    CompletionFn, CompletionSnapshot, PROGRESS_INTERVAL, ProgressFn, ProgressSnapshot,
};
pub use scenario::{
    BodyKind, DEFAULT_MIME, GrowthModel, ScenarioSpec, StepBody, StepTemplate, parse_form_pairs,
};
pub use spawner::spawn_interval;
