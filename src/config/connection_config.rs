use serde::{Deserialize, Serialize};

use crate::core::bluetooth::{CONNECT_RETRY_DELAY_MS, MAX_CONNECT_RETRIES};

/// Connection settings for trigger requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Number of connection attempts before giving up
    pub max_retries: u32,
    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            max_retries: MAX_CONNECT_RETRIES,
            retry_delay_ms: CONNECT_RETRY_DELAY_MS,
        }
    }
}
