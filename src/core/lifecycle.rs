//! Scan lifecycle state machine
//! Mediates the user's wish to scan against what the radio can actually do.
//!
//! A scan only starts on an explicit request made while the radio is ready.
//! If the radio becomes ready later, or comes back after being switched off
//! mid-scan, the lifecycle parks in `Idle { wants_scan: true }` and waits for
//! the user to ask again.

use log::info;
use serde::Serialize;

use crate::core::tracker::RadioState;

/// Where the scan lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    RadioUnavailable,
    /// Radio ready, not scanning. `wants_scan` records an unserved request.
    Idle { wants_scan: bool },
    Scanning,
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyScanning,
    RadioNotReady,
}

/// Effect of a radio state notification on the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioTransition {
    Unchanged,
    BecameIdle,
    BecameUnavailable { scan_halted: bool },
}

#[derive(Debug)]
pub struct ScanLifecycle {
    state: ScanState,
    radio: RadioState,
    wants_scan: bool,
}

impl Default for ScanLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanLifecycle {
    /// Starts out unavailable until the radio reports in.
    pub fn new() -> Self {
        Self {
            state: ScanState::RadioUnavailable,
            radio: RadioState::Unknown,
            wants_scan: false,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn radio(&self) -> RadioState {
        self.radio
    }

    pub fn is_scanning(&self) -> bool {
        self.state == ScanState::Scanning
    }

    pub fn wants_scan(&self) -> bool {
        self.wants_scan
    }

    pub fn start_requested(&mut self) -> StartOutcome {
        self.wants_scan = true;

        if self.state == ScanState::Scanning {
            return StartOutcome::AlreadyScanning;
        }

        if self.radio != RadioState::Ready {
            if let ScanState::Idle { .. } = self.state {
                self.state = ScanState::Idle { wants_scan: true };
            }
            return StartOutcome::RadioNotReady;
        }

        self.state = ScanState::Scanning;
        StartOutcome::Started
    }

    /// Returns true if a running scan was halted.
    pub fn stop_requested(&mut self) -> bool {
        self.wants_scan = false;
        match self.state {
            ScanState::Scanning | ScanState::Idle { .. } => {
                let was_scanning = self.state == ScanState::Scanning;
                self.state = ScanState::Idle { wants_scan: false };
                was_scanning
            }
            ScanState::RadioUnavailable => false,
        }
    }

    pub fn radio_state_changed(&mut self, radio: RadioState) -> RadioTransition {
        let previous = self.radio;
        self.radio = radio;
        info!("Bluetooth radio state: {} -> {}", previous.as_str(), radio.as_str());

        match radio {
            RadioState::Unavailable | RadioState::Unauthorized | RadioState::Unsupported => {
                if self.state == ScanState::RadioUnavailable {
                    return RadioTransition::Unchanged;
                }
                let scan_halted = self.state == ScanState::Scanning;
                self.state = ScanState::RadioUnavailable;
                RadioTransition::BecameUnavailable { scan_halted }
            }
            RadioState::Ready => {
                if self.state != ScanState::RadioUnavailable {
                    return RadioTransition::Unchanged;
                }
                self.state = ScanState::Idle {
                    wants_scan: self.wants_scan,
                };
                RadioTransition::BecameIdle
            }
            RadioState::Resetting | RadioState::Unknown => RadioTransition::Unchanged,
        }
    }
}
