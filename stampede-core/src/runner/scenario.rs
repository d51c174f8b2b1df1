use std::time::Duration;

use bytes::Bytes;
use url::Url;

use super::error::{Error, Result};
use crate::HttpRequest;

pub const DURATION_SECS_MIN: u64 = 30;
pub const DURATION_SECS_MAX: u64 = 300;
pub const PAUSE_SECS_MAX: u64 = 10;

pub const DEFAULT_MIME: &str = "application/json";
const FORM_MIME: &str = "application/x-www-form-urlencoded";

/// How the virtual-user population grows over the lifespan of the test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
pub enum GrowthModel {
    /// Spread user spawns evenly across the test duration.
    #[default]
    #[strum(serialize = "linear")]
    Linear,
}

/// Body encoding for a step that carries content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
pub enum BodyKind {
    #[strum(serialize = "form-urlencoded", serialize = "form")]
    FormUrlEncoded,

    #[strum(serialize = "text", serialize = "string")]
    Text,
}

#[derive(Debug, Clone)]
pub struct StepBody {
    pub kind: BodyKind,
    pub content: String,
    pub mime: String,
}

/// One HTTP request template within a scenario.
///
/// Templates are immutable once added to a scenario; every execution clones
/// them into a fresh request instance so concurrent users never share mutable
/// request state.
#[derive(Debug, Clone)]
pub struct StepTemplate {
    method: http::Method,
    endpoint: String,
    headers: Vec<(String, String)>,
    body: Option<StepBody>,
}

impl StepTemplate {
    pub fn new(verb: &str, endpoint: &str) -> Result<Self> {
        let method = parse_verb(verb)?;
        Ok(Self {
            method,
            endpoint: endpoint.to_string(),
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn get(endpoint: &str) -> Result<Self> {
        Self::new("GET", endpoint)
    }

    pub fn post(endpoint: &str) -> Result<Self> {
        Self::new("POST", endpoint)
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Attach a form-urlencoded body. The content is validated eagerly and
    /// re-encoded per execution.
    pub fn form_body(self, content: &str) -> Result<Self> {
        parse_form_pairs(content)?;
        Ok(self.with_body(StepBody {
            kind: BodyKind::FormUrlEncoded,
            content: content.to_string(),
            mime: FORM_MIME.to_string(),
        }))
    }

    /// Attach a plain text body with the given mime type (defaults to
    /// `application/json`).
    #[must_use]
    pub fn text_body(self, content: &str, mime: Option<&str>) -> Self {
        self.with_body(StepBody {
            kind: BodyKind::Text,
            content: content.to_string(),
            mime: mime.unwrap_or(DEFAULT_MIME).to_string(),
        })
    }

    fn with_body(mut self, body: StepBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &http::Method {
        &self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Clone this template into an independent request instance bound to the
    /// scenario's base address and per-request timeout.
    pub(crate) fn to_request(&self, base: &Url, timeout: Duration) -> Result<HttpRequest> {
        let url = resolve_endpoint(base, &self.endpoint)?;

        let mut headers = self.headers.clone();
        let body = match &self.body {
            None => Bytes::new(),
            Some(body) => {
                headers.push(("content-type".to_string(), content_type_value(body)));
                encode_body(body)?
            }
        };

        Ok(HttpRequest {
            method: self.method.clone(),
            url: url.into(),
            headers,
            body,
            timeout: Some(timeout),
        })
    }
}

fn parse_verb(verb: &str) -> Result<http::Method> {
    let upper = verb.to_ascii_uppercase();
    http::Method::from_bytes(upper.as_bytes())
        .map_err(|_| Error::InvalidStep(format!("`{verb}` is not a valid http verb")))
}

fn resolve_endpoint(base: &Url, endpoint: &str) -> Result<Url> {
    match Url::parse(endpoint) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(endpoint).map_err(|_| {
            Error::InvalidStep(format!("`{endpoint}` is not a valid relative endpoint"))
        }),
        Err(_) => Err(Error::InvalidStep(format!(
            "`{endpoint}` is not a valid endpoint"
        ))),
    }
}

fn content_type_value(body: &StepBody) -> String {
    match body.kind {
        BodyKind::FormUrlEncoded => FORM_MIME.to_string(),
        BodyKind::Text => format!("{}; charset=utf-8", body.mime),
    }
}

fn encode_body(body: &StepBody) -> Result<Bytes> {
    match body.kind {
        BodyKind::FormUrlEncoded => {
            let pairs = parse_form_pairs(&body.content)?;
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in &pairs {
                serializer.append_pair(key, value);
            }
            Ok(Bytes::from(serializer.finish()))
        }
        BodyKind::Text => Ok(Bytes::from(body.content.clone())),
    }
}

/// Split `key=value&key=value` content into pairs.
pub fn parse_form_pairs(content: &str) -> Result<Vec<(String, String)>> {
    if content.is_empty() {
        return Err(Error::InvalidFormBody("content cannot be empty".to_string()));
    }

    let mut pairs = Vec::new();
    for couple in content.split('&') {
        let mut parts = couple.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) if !key.is_empty() => {
                pairs.push((key.to_string(), value.to_string()));
            }
            _ => {
                return Err(Error::InvalidFormBody(format!(
                    "expected key=value, got `{couple}`"
                )));
            }
        }
    }
    Ok(pairs)
}

/// Immutable, validated test configuration.
///
/// Construction checks every constraint and reports all violations together
/// rather than failing on the first.
#[derive(Debug, Clone)]
pub struct ScenarioSpec {
    users: u64,
    base_address: Url,
    duration: Duration,
    pause: Duration,
    timeout: Duration,
    growth: GrowthModel,
    steps: Vec<StepTemplate>,
}

impl ScenarioSpec {
    pub fn new(
        users: u64,
        target_address: &str,
        duration_secs: u64,
        growth: GrowthModel,
        pause_secs: u64,
        timeout_ms: f64,
    ) -> Result<Self> {
        let mut violations = Vec::new();

        if users < 1 {
            violations.push("total number of users must be greater than 0".to_string());
        }

        let base = match Url::parse(target_address) {
            Ok(url) if url.scheme() == "http" => Some(url),
            Ok(_) => {
                violations.push("the target address must be an absolute http:// URI".to_string());
                None
            }
            Err(_) => {
                violations.push("the supplied target address is not a valid absolute URI".to_string());
                None
            }
        };

        if !(DURATION_SECS_MIN..=DURATION_SECS_MAX).contains(&duration_secs) {
            violations.push(format!(
                "allowed test duration is between {DURATION_SECS_MIN} and {DURATION_SECS_MAX} seconds"
            ));
        }

        if pause_secs > PAUSE_SECS_MAX {
            violations.push(format!(
                "allowed pause length is between 0 and {PAUSE_SECS_MAX} seconds"
            ));
        }

        if !timeout_ms.is_finite() || timeout_ms < 0.0 {
            violations.push("timeout must be zero or more milliseconds".to_string());
        }

        match base {
            Some(base_address) if violations.is_empty() => Ok(Self {
                users,
                base_address,
                duration: Duration::from_secs(duration_secs),
                pause: Duration::from_secs(pause_secs),
                timeout: Duration::from_secs_f64(timeout_ms / 1000.0),
                growth,
                steps: Vec::new(),
            }),
            _ => Err(Error::InvalidScenario { violations }),
        }
    }

    /// Append a step, validating its endpoint against the base address.
    pub fn add_step(&mut self, step: StepTemplate) -> Result<()> {
        resolve_endpoint(&self.base_address, step.endpoint())?;
        self.steps.push(step);
        Ok(())
    }

    pub fn users(&self) -> u64 {
        self.users
    }

    pub fn base_address(&self) -> &Url {
        &self.base_address
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn growth(&self) -> GrowthModel {
        self.growth
    }

    pub fn steps(&self) -> &[StepTemplate] {
        &self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_scenario() -> ScenarioSpec {
        match ScenarioSpec::new(10, "http://localhost/", 60, GrowthModel::Linear, 3, 3000.0) {
            Ok(spec) => spec,
            Err(err) => panic!("scenario should be valid: {err}"),
        }
    }

    #[test]
    fn accepts_a_valid_scenario() {
        let spec = valid_scenario();
        assert_eq!(spec.users(), 10);
        assert_eq!(spec.duration(), Duration::from_secs(60));
        assert_eq!(spec.pause(), Duration::from_secs(3));
        assert_eq!(spec.timeout(), Duration::from_secs(3));
        assert_eq!(spec.growth(), GrowthModel::Linear);
        assert!(spec.steps().is_empty());
    }

    #[test]
    fn aggregates_all_violations_into_one_error() {
        let err = match ScenarioSpec::new(0, "not a uri", 60, GrowthModel::Linear, 3, 3000.0) {
            Ok(spec) => panic!("expected an error, got {spec:?}"),
            Err(err) => err,
        };

        match err {
            Error::InvalidScenario { violations } => {
                assert_eq!(violations.len(), 2);
                assert!(violations.iter().any(|v| v.contains("users")));
                assert!(violations.iter().any(|v| v.contains("target address")));
            }
            other => panic!("expected InvalidScenario, got {other}"),
        }
    }

    #[test]
    fn rejects_out_of_range_duration_pause_and_timeout() {
        let err = match ScenarioSpec::new(1, "http://localhost/", 10, GrowthModel::Linear, 11, -1.0)
        {
            Ok(spec) => panic!("expected an error, got {spec:?}"),
            Err(err) => err,
        };

        match err {
            Error::InvalidScenario { violations } => {
                assert_eq!(violations.len(), 3);
            }
            other => panic!("expected InvalidScenario, got {other}"),
        }
    }

    #[test]
    fn rejects_non_http_targets() {
        assert!(ScenarioSpec::new(1, "ftp://host/", 60, GrowthModel::Linear, 0, 0.0).is_err());
    }

    #[test]
    fn growth_model_parses_from_its_string_form() {
        assert_eq!("linear".parse::<GrowthModel>(), Ok(GrowthModel::Linear));
        assert!("exponential".parse::<GrowthModel>().is_err());
    }

    #[test]
    fn add_step_validates_the_endpoint() {
        let mut spec = valid_scenario();

        let step = match StepTemplate::get("test/123") {
            Ok(step) => step,
            Err(err) => panic!("step should be valid: {err}"),
        };
        assert!(spec.add_step(step).is_ok());
        assert_eq!(spec.steps().len(), 1);
    }

    #[test]
    fn step_rejects_invalid_verbs() {
        assert!(StepTemplate::new("not a verb", "/").is_err());
        assert!(StepTemplate::new("purge", "/").is_ok());
    }

    #[test]
    fn to_request_resolves_relative_endpoints() {
        let spec = valid_scenario();
        let step = match StepTemplate::get("test/123") {
            Ok(step) => step,
            Err(err) => panic!("step should be valid: {err}"),
        };

        let req = match step.to_request(spec.base_address(), spec.timeout()) {
            Ok(req) => req,
            Err(err) => panic!("request should build: {err}"),
        };
        assert_eq!(req.url, "http://localhost/test/123");
        assert_eq!(req.timeout, Some(Duration::from_secs(3)));
        assert!(req.body.is_empty());
    }

    #[test]
    fn to_request_encodes_form_bodies() {
        let spec = valid_scenario();
        let step = match StepTemplate::post("/submit").and_then(|s| s.form_body("name=bob&role=admin")) {
            Ok(step) => step,
            Err(err) => panic!("step should be valid: {err}"),
        };

        let req = match step.to_request(spec.base_address(), spec.timeout()) {
            Ok(req) => req,
            Err(err) => panic!("request should build: {err}"),
        };
        assert_eq!(req.body.as_ref(), b"name=bob&role=admin");
        assert!(
            req.headers
                .iter()
                .any(|(k, v)| k == "content-type" && v == "application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn to_request_sets_the_text_body_mime() {
        let spec = valid_scenario();
        let step = match StepTemplate::post("/submit") {
            Ok(step) => step.text_body("{\"a\":1}", None),
            Err(err) => panic!("step should be valid: {err}"),
        };

        let req = match step.to_request(spec.base_address(), spec.timeout()) {
            Ok(req) => req,
            Err(err) => panic!("request should build: {err}"),
        };
        assert!(
            req.headers
                .iter()
                .any(|(k, v)| k == "content-type" && v == "application/json; charset=utf-8")
        );
    }

    #[test]
    fn parse_form_pairs_splits_couples() {
        let pairs = match parse_form_pairs("a=1&b=2") {
            Ok(pairs) => pairs,
            Err(err) => panic!("content should parse: {err}"),
        };
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn parse_form_pairs_rejects_malformed_content() {
        assert!(parse_form_pairs("").is_err());
        assert!(parse_form_pairs("no-separator").is_err());
        assert!(parse_form_pairs("a=1&oops").is_err());
        assert!(parse_form_pairs("a=1=2").is_err());
    }
}
