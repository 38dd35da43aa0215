//! Tracker suspicion engine
//! This module holds the per-device statistics, the heuristic scorer and the
//! registry that ties them together.

pub mod registry;
pub mod scorer;
pub mod stats;
pub mod types;

pub use registry::DeviceRegistry;
pub use stats::TrackedDevice;
pub use types::{
    DeviceIdentity, ErrorCode, OutboundEvent, RadioState, RawSighting, ScoredDevice,
};
