use clap::{Args, Parser, Subcommand};
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    let unit = unit_str.trim();
    match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

/// Parse a `--step` value: `VERB endpoint [body]`. A body, when present, is
/// form-urlencoded content.
pub(crate) fn parse_step(raw: &str) -> Result<(String, String, Option<String>), String> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    match parts.as_slice() {
        [verb, endpoint] => Ok(((*verb).to_string(), (*endpoint).to_string(), None)),
        [verb, endpoint, body @ ..] => Ok((
            (*verb).to_string(),
            (*endpoint).to_string(),
            Some(body.join(" ")),
        )),
        _ => Err(format!(
            "invalid --step (expected `VERB endpoint [body]`): {raw}"
        )),
    }
}

/// Parse a `--header` value: `name: value`.
pub(crate) fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid --header (expected `name: value`): {raw}"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid --header (empty name): {raw}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress bar and summary.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "stampede",
    author,
    version,
    about = "HTTP load-generation engine with a growing virtual-user population",
    long_about = "stampede simulates a growing population of virtual users, each walking a scripted sequence of HTTP steps against a target service while throughput, latency, error, and timeout statistics are reported at fixed intervals and at completion.\n\nUsers are spawned on a linear ramp: the whole population is spread evenly across the test duration.",
    after_help = "Examples:\n  stampede run --target http://localhost:8080/ --users 100 --duration 60s --step \"GET /\"\n  stampede run --target http://localhost:8080/ --users 2000 --duration 5m --pause 3s \\\n      --step \"GET /\" --step \"POST /login user=bob&pass=secret\"\n  stampede run --target http://localhost:8080/ --users 10 --duration 30s --output json --step \"GET /health\""
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test against a target service
    #[command(
        long_about = "Run a load test. Virtual users are spawned on a linear ramp until --users is reached; each user executes every --step in order, pausing --pause between steps, and the run drains in-flight users after --duration elapses."
    )]
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Base address of the service under test (absolute http:// URI)
    #[arg(long)]
    pub target: String,

    /// Total number of virtual users spawned over the test duration
    #[arg(long)]
    pub users: u64,

    /// Test duration (e.g. 60s, 2m; allowed range 30s-300s)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Duration,

    /// Pause between steps (0s-10s)
    #[arg(long, value_parser = parse_duration, default_value = "3s")]
    pub pause: Duration,

    /// Per-request timeout (e.g. 3s, 1500ms)
    #[arg(long, value_parser = parse_duration, default_value = "3s")]
    pub timeout: Duration,

    /// User growth model
    #[arg(long, default_value = "linear")]
    pub growth: String,

    /// Request step, `VERB endpoint [body]` (repeatable, executed in order;
    /// a body is form-urlencoded content)
    #[arg(long = "step", value_name = "STEP", required = true)]
    pub step: Vec<String>,

    /// Header applied to every step, `name: value` (repeatable)
    #[arg(long = "header", value_name = "HEADER")]
    pub header: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("90"), Ok(Duration::from_secs(90)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn parse_step_splits_verb_endpoint_and_body() {
        assert_eq!(
            parse_step("GET /"),
            Ok(("GET".to_string(), "/".to_string(), None))
        );
        assert_eq!(
            parse_step("POST /login user=bob&pass=secret"),
            Ok((
                "POST".to_string(),
                "/login".to_string(),
                Some("user=bob&pass=secret".to_string())
            ))
        );
        assert!(parse_step("GET").is_err());
        assert!(parse_step("").is_err());
    }

    #[test]
    fn parse_header_splits_on_the_first_colon() {
        assert_eq!(
            parse_header("x-api-key: abc"),
            Ok(("x-api-key".to_string(), "abc".to_string()))
        );
        assert_eq!(
            parse_header("x-time: 10:30"),
            Ok(("x-time".to_string(), "10:30".to_string()))
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": empty-name").is_err());
    }

    #[test]
    fn cli_parses_run_with_steps() {
        let parsed = Cli::try_parse_from([
            "stampede",
            "run",
            "--target",
            "http://localhost:8080/",
            "--users",
            "100",
            "--duration",
            "60s",
            "--pause",
            "0s",
            "--timeout",
            "1500ms",
            "--step",
            "GET /",
            "--step",
            "POST /echo a=1",
            "--header",
            "x-api-key: abc",
            "--output",
            "json",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.target, "http://localhost:8080/");
                assert_eq!(args.users, 100);
                assert_eq!(args.duration, Duration::from_secs(60));
                assert_eq!(args.pause, Duration::ZERO);
                assert_eq!(args.timeout, Duration::from_millis(1500));
                assert_eq!(args.growth, "linear");
                assert_eq!(args.step.len(), 2);
                assert_eq!(args.header, vec!["x-api-key: abc".to_string()]);
                assert!(matches!(args.output, OutputFormat::Json));
            }
        }
    }

    #[test]
    fn cli_requires_at_least_one_step() {
        let parsed = Cli::try_parse_from([
            "stampede",
            "run",
            "--target",
            "http://localhost/",
            "--users",
            "1",
            "--duration",
            "30s",
        ]);
        assert!(parsed.is_err());
    }
}
