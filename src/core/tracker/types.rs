//! Defines the data shared between the tracker engine and its collaborators.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name shown for a device that advertises no usable name.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// Opaque, platform-assigned identifier for a radio peer.
///
/// Stable for the lifetime of one scan session; may change across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceIdentity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One observed advertisement, as delivered by the radio layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSighting {
    pub identity: DeviceIdentity,
    /// The local name carried in the advertisement, if any
    pub advertised_name: Option<String>,
    /// Received signal strength in dBm
    pub signal_strength: i16,
    pub is_connectable: bool,
    pub observed_at: DateTime<Utc>,
}

impl RawSighting {
    pub fn new(
        identity: impl Into<DeviceIdentity>,
        advertised_name: Option<String>,
        signal_strength: i16,
        is_connectable: bool,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity: identity.into(),
            advertised_name,
            signal_strength,
            is_connectable,
            observed_at,
        }
    }
}

/// Scored view of a tracked device. This is the only record that leaves the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredDevice {
    #[serde(rename = "id")]
    pub identity: DeviceIdentity,
    /// Advertised name, or "Unknown" when absent or empty
    #[serde(rename = "name")]
    pub display_name: String,
    /// Most recent RSSI sample
    #[serde(rename = "rssi")]
    pub latest_rssi: i16,
    /// Heuristic suspicion score in [0, 1]
    #[serde(rename = "airTagScore")]
    pub score: f64,
    /// `round(score * 100)`
    #[serde(rename = "probability")]
    pub probability_percent: u8,
    pub is_suspicious: bool,
    pub is_connectable: bool,
    /// Whole seconds between first and last sighting
    pub seen_seconds: i64,
    pub sample_count: usize,
}

/// Machine-readable code carried by an error record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A scan was requested while the radio was off, unauthorized or unsupported
    BluetoothNotReady,
}

/// Records pushed to the outbound event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Device(ScoredDevice),
    Error { code: ErrorCode },
}

/// Radio readiness as reported by the platform wireless stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadioState {
    /// Powered off
    Unavailable,
    Resetting,
    Unauthorized,
    Unsupported,
    Ready,
    /// Not yet reported
    Unknown,
}

impl RadioState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadioState::Unavailable => "unavailable",
            RadioState::Resetting => "resetting",
            RadioState::Unauthorized => "unauthorized",
            RadioState::Unsupported => "unsupported",
            RadioState::Ready => "ready",
            RadioState::Unknown => "unknown",
        }
    }
}
