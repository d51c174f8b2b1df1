use anyhow::Context as _;

use stampede_core::runner::{Engine, GrowthModel, StepTemplate};

use crate::cli::{RunArgs, parse_header, parse_step};
use crate::output;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<(), RunError> {
    let out = output::formatter(args.output);

    let growth: GrowthModel = args.growth.parse().map_err(|_| {
        RunError::Invalid(anyhow::anyhow!(
            "invalid --growth `{}` (expected `linear`)",
            args.growth
        ))
    })?;

    let mut engine = Engine::new(
        args.users,
        &args.target,
        args.duration.as_secs(),
        growth,
        args.pause.as_secs(),
        args.timeout.as_secs_f64() * 1000.0,
    )
    .map_err(|err| RunError::Invalid(err.into()))?;

    let headers: Vec<(String, String)> = args
        .header
        .iter()
        .map(|raw| parse_header(raw).map_err(|msg| RunError::Invalid(anyhow::anyhow!(msg))))
        .collect::<Result<_, _>>()?;

    for raw in &args.step {
        let step = build_step(raw, &headers).map_err(RunError::Invalid)?;
        engine
            .add_step(step)
            .map_err(|err| RunError::Invalid(err.into()))?;
    }

    if let Some(progress) = out.progress() {
        engine.on_progress(progress);
    }

    out.print_header(engine.scenario());

    let report = engine
        .run()
        .await
        .map_err(|err| RunError::Runtime(err.into()))?;

    out.print_summary(&report).map_err(RunError::Runtime)?;

    Ok(())
}

fn build_step(raw: &str, headers: &[(String, String)]) -> anyhow::Result<StepTemplate> {
    let (verb, endpoint, body) =
        parse_step(raw).map_err(|msg| anyhow::anyhow!(msg))?;

    let mut step = StepTemplate::new(&verb, &endpoint)
        .with_context(|| format!("invalid --step: {raw}"))?;

    for (name, value) in headers {
        step = step.header(name, value);
    }

    if let Some(body) = body {
        step = step
            .form_body(&body)
            .with_context(|| format!("invalid --step body: {raw}"))?;
    }

    Ok(step)
}
