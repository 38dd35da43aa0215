//! Line protocol between the sentinel and its controlling application.
//!
//! Commands arrive as newline-delimited JSON on stdin; replies, device
//! records and error records leave as newline-delimited JSON on stdout.
use serde::{Deserialize, Serialize};

use crate::core::pipeline::PipelineStatus;
use crate::error::CommandError;

/// Commands sent from the controlling application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    StartScan,
    StopScan,
    /// Connect to a sighted device
    Trigger { id: String },
    /// Request current scan state
    Status,
}

/// Wire format for host commands. Converted to [`HostCommand`] in [`parse_command`].
#[derive(Deserialize)]
struct RawCommand {
    cmd: String,
    #[serde(default)]
    id: Option<String>,
}

/// Parses one command line.
pub fn parse_command(line: &str) -> Result<HostCommand, CommandError> {
    let raw: RawCommand = serde_json::from_str(line.trim())?;
    match raw.cmd.as_str() {
        "start_scan" => Ok(HostCommand::StartScan),
        "stop_scan" => Ok(HostCommand::StopScan),
        "status" => Ok(HostCommand::Status),
        "trigger" => match raw.id {
            Some(id) if !id.trim().is_empty() => Ok(HostCommand::Trigger { id }),
            _ => Err(CommandError::InvalidArguments("Device ID not provided")),
        },
        other => Err(CommandError::NotImplemented(other.to_string())),
    }
}

/// Reply to a single command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "reply")]
pub struct CommandReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PipelineStatus>,
}

impl CommandReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            code: None,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: PipelineStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::ok(message)
        }
    }

    pub fn error(err: &CommandError) -> Self {
        Self {
            ok: false,
            code: Some(err.code()),
            message: err.to_string(),
            status: None,
        }
    }
}

impl From<Result<CommandReply, CommandError>> for CommandReply {
    fn from(result: Result<CommandReply, CommandError>) -> Self {
        result.unwrap_or_else(|e| CommandReply::error(&e))
    }
}
