//! Tracker Sentinel library
//! Watches nearby BLE beacons and scores how much each one behaves like a
//! tracking tag travelling with the user.

// Module declarations
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod output;
pub mod protocol;
pub mod state;
pub mod utils;
