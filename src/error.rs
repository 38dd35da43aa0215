//! Typed errors for configuration and the command line protocol.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Malformed command: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidArguments(&'static str),
    #[error("Unknown command: {0}")]
    NotImplemented(String),
    #[error("Command failed: {0}")]
    Failed(String),
}

impl CommandError {
    /// Stable code reported to the controlling application.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Malformed(_) => "MALFORMED",
            CommandError::InvalidArguments(_) => "INVALID_ARGUMENTS",
            CommandError::NotImplemented(_) => "NOT_IMPLEMENTED",
            CommandError::Failed(_) => "COMMAND_FAILED",
        }
    }
}
