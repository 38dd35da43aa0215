//! Device registry
//! Keyed store of every device seen this session and the single write path
//! that turns a raw sighting into a scored record.

use std::collections::HashMap;

use log::{debug, info};

use crate::core::tracker::scorer;
use crate::core::tracker::stats::TrackedDevice;
use crate::core::tracker::types::{DeviceIdentity, RawSighting, ScoredDevice, UNKNOWN_DEVICE_NAME};

/// RSSI value the platform reports when no valid reading was taken.
pub const INVALID_RSSI: i16 = 127;
/// Weakest RSSI accepted as a real reading.
pub const MIN_VALID_RSSI: i16 = -127;
/// Strongest RSSI accepted as a real reading.
pub const MAX_VALID_RSSI: i16 = 20;

/// Returns false for the invalid-reading sentinel and for values outside the valid dBm range.
pub fn is_valid_rssi(rssi: i16) -> bool {
    rssi != INVALID_RSSI && (MIN_VALID_RSSI..=MAX_VALID_RSSI).contains(&rssi)
}

/// Stores rolling stats per device.
///
/// Entries are never evicted automatically; only [`forget`](Self::forget) and
/// [`clear`](Self::clear) remove them. The per-device sample window bounds the
/// size of each entry, so memory grows with the number of distinct devices seen.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceIdentity, TrackedDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a sighting and returns the rescored device.
    ///
    /// `name_hint` takes precedence over the advertised name when present.
    /// Returns `None` if the sighting carries an invalid RSSI.
    pub fn record(&mut self, sighting: &RawSighting, name_hint: Option<&str>) -> Option<ScoredDevice> {
        if !is_valid_rssi(sighting.signal_strength) {
            debug!(
                "Discarding sighting of {} with invalid RSSI {}",
                sighting.identity, sighting.signal_strength
            );
            return None;
        }

        let name = [name_hint, sighting.advertised_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty());

        let was_suspicious = self
            .devices
            .get(&sighting.identity)
            .is_some_and(|stats| scorer::is_suspicious(scorer::score(stats, name)));

        let stats = self
            .devices
            .entry(sighting.identity.clone())
            .and_modify(|stats| stats.apply(sighting))
            .or_insert_with(|| {
                debug!("Tracking new device {}", sighting.identity);
                TrackedDevice::from_sighting(sighting)
            });

        let score = scorer::score(stats, name);
        let scored = ScoredDevice {
            identity: sighting.identity.clone(),
            display_name: display_name(name),
            latest_rssi: sighting.signal_strength,
            score,
            probability_percent: scorer::probability_percent(score),
            is_suspicious: scorer::is_suspicious(score),
            is_connectable: stats.is_connectable,
            seen_seconds: stats.seen_for().num_seconds(),
            sample_count: stats.sample_count(),
        };

        if scored.is_suspicious && !was_suspicious {
            info!(
                "Suspicious device {} ({}): score {:.2}, seen {}s",
                scored.identity, scored.display_name, scored.score, scored.seen_seconds
            );
        }
        Some(scored)
    }

    pub fn get(&self, identity: &DeviceIdentity) -> Option<&TrackedDevice> {
        self.devices.get(identity)
    }

    pub fn contains(&self, identity: &DeviceIdentity) -> bool {
        self.devices.contains_key(identity)
    }

    /// Drops one device. Returns whether it was tracked.
    pub fn forget(&mut self, identity: &DeviceIdentity) -> bool {
        self.devices.remove(identity).is_some()
    }

    /// Drops every device, starting a fresh session.
    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

fn display_name(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => UNKNOWN_DEVICE_NAME.to_string(),
    }
}
