//! Rolling per-device statistics.
//! Each tracked device keeps its first/last sighting time, a bounded window of
//! RSSI samples and a sticky connectability flag.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};

use crate::core::tracker::types::RawSighting;

/// Number of RSSI samples retained per device. Older samples are evicted first.
pub const RSSI_WINDOW: usize = 50;

/// Accumulated state for one device over the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedDevice {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    rssi_samples: VecDeque<i16>,
    /// Once true, stays true for the rest of the session
    pub is_connectable: bool,
}

impl TrackedDevice {
    /// Creates the record for a device seen for the first time.
    pub fn from_sighting(sighting: &RawSighting) -> Self {
        let mut rssi_samples = VecDeque::with_capacity(RSSI_WINDOW);
        rssi_samples.push_back(sighting.signal_strength);
        Self {
            first_seen: sighting.observed_at,
            last_seen: sighting.observed_at,
            rssi_samples,
            is_connectable: sighting.is_connectable,
        }
    }

    /// Folds a later sighting of the same device into the record.
    pub fn apply(&mut self, sighting: &RawSighting) {
        self.last_seen = sighting.observed_at;
        self.rssi_samples.push_back(sighting.signal_strength);
        while self.rssi_samples.len() > RSSI_WINDOW {
            self.rssi_samples.pop_front();
        }
        self.is_connectable |= sighting.is_connectable;
    }

    /// Retained samples, oldest first.
    pub fn rssi_samples(&self) -> &VecDeque<i16> {
        &self.rssi_samples
    }

    pub fn latest_rssi(&self) -> Option<i16> {
        self.rssi_samples.back().copied()
    }

    pub fn sample_count(&self) -> usize {
        self.rssi_samples.len()
    }

    /// Time between the first and the latest sighting.
    pub fn seen_for(&self) -> TimeDelta {
        self.last_seen - self.first_seen
    }
}
