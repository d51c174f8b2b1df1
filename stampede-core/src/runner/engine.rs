use std::sync::Arc;
use std::time::Instant;

use crate::HttpClient;

use super::counters::RunCounters;
use super::error::{Error, Result};
use super::progress::{
    CompletionFn, CompletionSnapshot, ProgressFn, completion_snapshot, progress_loop,
};
use super::scenario::{GrowthModel, ScenarioSpec, StepTemplate};
use super::spawner::spawn_loop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Constructed,
    Running,
    Draining,
    Completed,
}

/// Composes the scenario, spawn scheduling, statistics, and reporting into
/// one test run.
///
/// Lifecycle: `Constructed -> Running -> Draining -> Completed`. Steps and
/// listeners are registered while constructed; `run` drives the test to
/// completion and an engine never runs twice.
pub struct Engine {
    scenario: ScenarioSpec,
    client: Arc<HttpClient>,
    progress_listeners: Vec<ProgressFn>,
    completion_listeners: Vec<CompletionFn>,
    lifecycle: Lifecycle,
}

impl Engine {
    /// Build an engine for a validated scenario. Configuration violations are
    /// aggregated and reported together in a single error.
    pub fn new(
        users: u64,
        target_address: &str,
        duration_secs: u64,
        growth: GrowthModel,
        pause_secs: u64,
        timeout_ms: f64,
    ) -> Result<Self> {
        let scenario = ScenarioSpec::new(
            users,
            target_address,
            duration_secs,
            growth,
            pause_secs,
            timeout_ms,
        )?;

        Ok(Self {
            scenario,
            client: Arc::new(HttpClient::default()),
            progress_listeners: Vec::new(),
            completion_listeners: Vec::new(),
            lifecycle: Lifecycle::Constructed,
        })
    }

    pub fn scenario(&self) -> &ScenarioSpec {
        &self.scenario
    }

    /// Append a step to the scenario. Chainable; only valid before `run`.
    pub fn add_step(&mut self, step: StepTemplate) -> Result<&mut Self> {
        if self.lifecycle != Lifecycle::Constructed {
            return Err(Error::AddStepAfterRun);
        }

        self.scenario.add_step(step)?;
        Ok(self)
    }

    /// Register a progress listener, invoked every reporting interval.
    /// Subscribe before `run`.
    pub fn on_progress(&mut self, listener: ProgressFn) -> &mut Self {
        self.progress_listeners.push(listener);
        self
    }

    /// Register a completion listener, invoked exactly once per run.
    /// Subscribe before `run`.
    pub fn on_completed(&mut self, listener: CompletionFn) -> &mut Self {
        self.completion_listeners.push(listener);
        self
    }

    /// Run the test: start the spawn and progress timers, let the test
    /// duration elapse, stop spawning, drain in-flight users, then emit the
    /// completion snapshot.
    ///
    /// Per-action failures (timeouts, http errors) never surface here; they
    /// are only visible as counters in the snapshots.
    pub async fn run(&mut self) -> Result<CompletionSnapshot> {
        if self.lifecycle != Lifecycle::Constructed {
            return Err(Error::AlreadyRun);
        }
        if self.scenario.steps().is_empty() {
            return Err(Error::NoSteps);
        }
        self.lifecycle = Lifecycle::Running;

        let scenario = Arc::new(self.scenario.clone());
        let counters = Arc::new(RunCounters::default());
        let started = Instant::now();

        let spawner = tokio::spawn(spawn_loop(
            scenario.clone(),
            self.client.clone(),
            counters.clone(),
        ));

        let progress = (!self.progress_listeners.is_empty()).then(|| {
            let listeners: Arc<[ProgressFn]> = self.progress_listeners.clone().into();
            tokio::spawn(progress_loop(counters.clone(), started, listeners))
        });

        tokio::time::sleep(scenario.duration()).await;

        // Block new spawns past the deadline. Under a consistent spawn rate
        // the loop has already retired at quota and the abort is a no-op.
        self.lifecycle = Lifecycle::Draining;
        spawner.abort();
        match spawner.await {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => {}
            Err(err) => return Err(Error::Join(err)),
        }

        counters.wait_idle().await;

        if let Some(handle) = progress {
            handle.abort();
            let _ = handle.await;
        }

        let report = completion_snapshot(&counters, started.elapsed());
        for listener in &self.completion_listeners {
            listener(report.clone());
        }
        self.lifecycle = Lifecycle::Completed;

        Ok(report)
    }
}
