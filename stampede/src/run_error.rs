use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    /// Invalid CLI input or scenario configuration.
    Invalid(anyhow::Error),

    /// Everything else.
    Runtime(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Invalid(_) => ExitCode::InvalidInput,
            Self::Runtime(_) => ExitCode::RuntimeError,
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) | Self::Runtime(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for RunError {}
