//! Bluetooth radio layer
//! This module discovers nearby devices with bluest, forwards their
//! advertisements to the sighting pipeline and handles trigger connections.

mod connection;
mod constants;
mod manager;
mod radio;
mod scanner;

// Re-export types that should be publicly accessible
pub use connection::ConnectionManager;
pub use constants::*; // Re-export all constants
pub use manager::BluetoothManager;
pub use radio::{current_radio_state, radio_state_for, spawn_radio_monitor};
pub use scanner::{BluetoothScanner, PeerMap};
