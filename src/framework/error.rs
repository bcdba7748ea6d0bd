//! The closed error taxonomy every command reports through.

use std::backtrace::Backtrace;

use thiserror::Error;

use crate::exitcode;

/// Errors surfaced to the user. The runner is the only place that renders them.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("missing required argument: {0}")]
    MissingArgs(String),

    #[error("missing required flag: {0}")]
    MissingFlag(String),

    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("aborted: operation aborted")]
    Aborted,

    #[error("timeout: timed out waiting for {id} to become {want}")]
    Timeout { id: String, want: String },

    #[error("internal error: {error:#}")]
    Internal { error: anyhow::Error, frames: String },
}

/// Result type for command handlers and framework operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn invalid_arg(message: impl Into<String>) -> Self {
        Self::InvalidArg(message.into())
    }

    /// Wrap a programming or environment failure, capturing the current stack.
    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            error: error.into(),
            frames: Backtrace::force_capture().to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingArgs(_) | Self::MissingFlag(_) | Self::InvalidArg(_) => exitcode::USAGE,
            Self::NotFound(_) => exitcode::NOT_FOUND,
            Self::Conflict(_) => exitcode::CONFLICT,
            Self::Upstream(_) => exitcode::UPSTREAM,
            Self::Aborted => exitcode::ABORTED,
            Self::Timeout { .. } => exitcode::TIMEOUT,
            Self::Internal { .. } => exitcode::INTERNAL,
        }
    }

    /// Stack captured when an internal error was created.
    pub fn frames(&self) -> Option<&str> {
        match self {
            Self::Internal { frames, .. } => Some(frames),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(anyhow::Error::new(err).context("I/O failure"))
    }
}
