use std::error::Error;
use std::fmt::{Display, Formatter};

/// Number of body characters kept from a non-success response.
pub const BODY_PREFIX_CHARS: usize = 100;

/// Why a single attempt against the backend failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    Transport(String),
    BadStatus { status: u16, body_prefix: String },
    Parse(String),
}

impl AttemptError {
    pub fn bad_status(status: u16, body: &str) -> Self {
        Self::BadStatus {
            status,
            body_prefix: body_prefix(body),
        }
    }
}

impl Display for AttemptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "backend transport error: {msg}"),
            Self::BadStatus {
                status,
                body_prefix,
            } => write!(f, "backend responded with HTTP {status}: {body_prefix}"),
            Self::Parse(msg) => write!(f, "backend response is not valid JSON: {msg}"),
        }
    }
}

impl Error for AttemptError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    EmptyEndpoint,
    ZeroAttempts,
    InvalidPayload(String),
    ExhaustedRetries {
        attempts: u32,
        last_cause: AttemptError,
    },
}

impl Display for OrchestratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEndpoint => write!(f, "backend endpoint must not be empty"),
            Self::ZeroAttempts => write!(f, "max attempts must be at least 1"),
            Self::InvalidPayload(msg) => write!(f, "request payload cannot be serialized: {msg}"),
            Self::ExhaustedRetries {
                attempts,
                last_cause,
            } => write!(
                f,
                "backend unreachable after {attempts} attempt(s); last error: {last_cause}"
            ),
        }
    }
}

impl Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ExhaustedRetries { last_cause, .. } => Some(last_cause),
            _ => None,
        }
    }
}

pub(crate) fn body_prefix(body: &str) -> String {
    body.chars().take(BODY_PREFIX_CHARS).collect()
}
