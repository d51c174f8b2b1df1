pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid scenario: {}", violations.join("; "))]
    InvalidScenario { violations: Vec<String> },

    #[error("invalid step: {0}")]
    InvalidStep(String),

    #[error("malformed form-urlencoded content: {0}")]
    InvalidFormBody(String),

    #[error("create a test scenario with at least one step before running the test")]
    NoSteps,

    #[error("steps cannot be added once the test has started")]
    AddStepAfterRun,

    #[error("the engine has already run; build a new engine for another test")]
    AlreadyRun,

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
