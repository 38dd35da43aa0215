//! Core functionality for the tracker sentinel
//! This module contains the suspicion engine and the Bluetooth layer that feeds it.

pub mod bluetooth;
pub mod lifecycle;
pub mod pipeline;
pub mod tracker;

// Re-export commonly used types
pub use bluetooth::BluetoothManager;
pub use lifecycle::{ScanLifecycle, ScanState, StartOutcome};
pub use pipeline::{EventSink, PeerActivator, PipelineStatus, SightingPipeline};
