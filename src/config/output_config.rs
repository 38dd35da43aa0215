use serde::{Deserialize, Serialize};

/// Settings for the stdout record stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Only write device records flagged as suspicious. Error records are always written.
    pub suspicious_only: bool,
    /// Pretty-print records instead of one JSON object per line
    pub pretty: bool,
}
