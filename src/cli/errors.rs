//! CLI-specific error types
//!
//! Every CLI error is fatal: `main` logs it and exits with status 1.

use std::io;

use thiserror::Error;

use crate::check::CheckError;
use crate::engine::EngineError;
use crate::explain::ExplainError;
use crate::requestor::RequestError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Scenario file error
    ConfigError,
    /// I/O error (files, stdin/stdout)
    IoError,
    /// The engine rejected a scenario operation
    EngineError,
    /// Explain output could not be read
    ExplainError,
    /// The check failed
    CheckFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "IXEXPLAIN_CLI_CONFIG_ERROR",
            Self::IoError => "IXEXPLAIN_CLI_IO_ERROR",
            Self::EngineError => "IXEXPLAIN_CLI_ENGINE_ERROR",
            Self::ExplainError => "IXEXPLAIN_CLI_EXPLAIN_ERROR",
            Self::CheckFailed => "IXEXPLAIN_CLI_CHECK_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
#[error("{}: {message}", .code.code())]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn check_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::CheckFailed, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        Self::new(
            CliErrorCode::EngineError,
            format!("{} ({}): {}", e.code_name(), e.code(), e),
        )
    }
}

impl From<RequestError> for CliError {
    fn from(e: RequestError) -> Self {
        Self::new(CliErrorCode::EngineError, format!("{}: {}", e.code(), e))
    }
}

impl From<ExplainError> for CliError {
    fn from(e: ExplainError) -> Self {
        Self::new(CliErrorCode::ExplainError, format!("{}: {}", e.code(), e))
    }
}

impl From<CheckError> for CliError {
    fn from(e: CheckError) -> Self {
        Self::check_failed(format!("{}: {}", e.code(), e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
