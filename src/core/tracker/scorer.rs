//! Tracker suspicion scoring.
//!
//! The score is a hand-tuned linear heuristic, not a calibrated probability.
//! Each signal below adds a fixed weight and the sum is clamped to [0, 1].
//! Signals are not independent: both persistence bonuses fire together for
//! anything seen longer than ten minutes, and an unnamed advert usually
//! coincides with a non-connectable one.

use chrono::TimeDelta;

use crate::core::tracker::stats::TrackedDevice;
use crate::core::tracker::types::UNKNOWN_DEVICE_NAME;

/// Added when the advertised name is absent, empty or literally "Unknown".
pub const ANONYMOUS_NAME_WEIGHT: f64 = 0.3;
/// Added when the device has never been seen connectable.
pub const NON_CONNECTABLE_WEIGHT: f64 = 0.3;
/// Added when the device has been around longer than [`PERSISTENT_PRESENCE_SECS`].
pub const PERSISTENT_PRESENCE_WEIGHT: f64 = 0.2;
/// Added on top of the persistence bonus past [`SUSTAINED_PRESENCE_SECS`].
pub const SUSTAINED_PRESENCE_WEIGHT: f64 = 0.1;
/// Added when the signal is steady at a following distance.
pub const STABLE_SIGNAL_WEIGHT: f64 = 0.2;

pub const PERSISTENT_PRESENCE_SECS: i64 = 5 * 60;
pub const SUSTAINED_PRESENCE_SECS: i64 = 10 * 60;

/// Minimum samples before signal stability is considered.
pub const STABLE_SIGNAL_MIN_SAMPLES: usize = 3;
/// Open interval (dBm) the mean RSSI must fall in.
pub const STABLE_SIGNAL_MEAN_RANGE: (f64, f64) = (-80.0, -30.0);
/// Population standard deviation (dB) the samples must stay under.
pub const STABLE_SIGNAL_MAX_STD_DEV: f64 = 10.0;

/// Scores at or above this are flagged as suspicious.
pub const SUSPICION_THRESHOLD: f64 = 0.6;

/// Computes the suspicion score for a device.
pub fn score(stats: &TrackedDevice, advertised_name: Option<&str>) -> f64 {
    let mut score = 0.0;

    if is_anonymous(advertised_name) {
        score += ANONYMOUS_NAME_WEIGHT;
    }

    if !stats.is_connectable {
        score += NON_CONNECTABLE_WEIGHT;
    }

    let seen_for = stats.seen_for();
    if seen_for > TimeDelta::seconds(PERSISTENT_PRESENCE_SECS) {
        score += PERSISTENT_PRESENCE_WEIGHT;
    }
    if seen_for > TimeDelta::seconds(SUSTAINED_PRESENCE_SECS) {
        score += SUSTAINED_PRESENCE_WEIGHT;
    }

    if has_stable_signal(stats.rssi_samples().iter().copied()) {
        score += STABLE_SIGNAL_WEIGHT;
    }

    score.clamp(0.0, 1.0)
}

pub fn is_suspicious(score: f64) -> bool {
    score >= SUSPICION_THRESHOLD
}

/// `round(score * 100)`, saturating into 0..=100.
pub fn probability_percent(score: f64) -> u8 {
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

fn is_anonymous(name: Option<&str>) -> bool {
    match name {
        None => true,
        Some(name) => {
            let name = name.trim();
            name.is_empty() || name == UNKNOWN_DEVICE_NAME
        }
    }
}

/// A moderate, steady signal suggests the beacon is moving with the observer
/// rather than being a fixed fixture or a passer-by.
fn has_stable_signal(samples: impl ExactSizeIterator<Item = i16> + Clone) -> bool {
    let count = samples.len();
    if count < STABLE_SIGNAL_MIN_SAMPLES {
        return false;
    }

    let n = count as f64;
    let mean = samples.clone().map(f64::from).sum::<f64>() / n;
    let variance = samples
        .map(|rssi| (f64::from(rssi) - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();

    let (low, high) = STABLE_SIGNAL_MEAN_RANGE;
    mean > low && mean < high && std_dev < STABLE_SIGNAL_MAX_STD_DEV
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tracker::types::RawSighting;
    use chrono::{DateTime, Utc};

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    /// Builds a device from `(seconds, rssi)` pairs.
    fn device(samples: &[(i64, i16)], connectable: bool) -> TrackedDevice {
        let (first, rest) = samples.split_first().unwrap();
        let mut device =
            TrackedDevice::from_sighting(&RawSighting::new("D", None, first.1, connectable, t(first.0)));
        for &(secs, rssi) in rest {
            device.apply(&RawSighting::new("D", None, rssi, connectable, t(secs)));
        }
        device
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    // ── Single signals ─────────────────────────────────────────────

    #[test]
    fn named_connectable_single_sighting_scores_zero() {
        let d = device(&[(0, -60)], true);
        let s = score(&d, Some("MyHeadphones"));
        assert_eq!(s, 0.0);
        assert!(!is_suspicious(s));
        assert_eq!(probability_percent(s), 0);
    }

    #[test]
    fn anonymous_non_connectable_hits_threshold_exactly() {
        let d = device(&[(0, -55)], false);
        let s = score(&d, None);
        assert_eq!(s, 0.6);
        assert!(is_suspicious(s));
        assert_eq!(probability_percent(s), 60);
    }

    #[test]
    fn empty_and_unknown_names_count_as_anonymous() {
        let d = device(&[(0, -60)], true);
        assert_close(score(&d, Some("")), ANONYMOUS_NAME_WEIGHT);
        assert_close(score(&d, Some("Unknown")), ANONYMOUS_NAME_WEIGHT);
        assert_close(score(&d, Some("   ")), ANONYMOUS_NAME_WEIGHT);
        assert_close(score(&d, Some(" Unknown ")), ANONYMOUS_NAME_WEIGHT);
        assert_eq!(score(&d, Some("unknown-ish")), 0.0);
    }

    // ── Persistence ────────────────────────────────────────────────

    #[test]
    fn exactly_five_minutes_is_not_persistent() {
        let d = device(&[(0, -20), (300, -100)], true);
        assert_eq!(score(&d, Some("Phone")), 0.0);
    }

    #[test]
    fn persistence_bonuses_stack() {
        let d = device(&[(0, -20), (301, -100)], true);
        assert_close(score(&d, Some("Phone")), PERSISTENT_PRESENCE_WEIGHT);

        let d = device(&[(0, -20), (601, -100)], true);
        assert_close(
            score(&d, Some("Phone")),
            PERSISTENT_PRESENCE_WEIGHT + SUSTAINED_PRESENCE_WEIGHT,
        );
    }

    // ── Signal stability ───────────────────────────────────────────

    #[test]
    fn stability_needs_three_samples() {
        let d = device(&[(0, -50), (1, -50)], true);
        assert_eq!(score(&d, Some("Phone")), 0.0);

        let d = device(&[(0, -50), (1, -50), (2, -50)], true);
        assert_close(score(&d, Some("Phone")), STABLE_SIGNAL_WEIGHT);
    }

    #[test]
    fn stability_mean_bounds_are_exclusive() {
        let d = device(&[(0, -80), (1, -80), (2, -80)], true);
        assert_eq!(score(&d, Some("Phone")), 0.0);

        let d = device(&[(0, -30), (1, -30), (2, -30)], true);
        assert_eq!(score(&d, Some("Phone")), 0.0);

        let d = device(&[(0, -79), (1, -79), (2, -79)], true);
        assert_close(score(&d, Some("Phone")), STABLE_SIGNAL_WEIGHT);
    }

    #[test]
    fn noisy_signal_is_not_stable() {
        // mean -50, population std dev exactly 10
        let d = device(&[(0, -60), (1, -40), (2, -60), (3, -40)], true);
        assert_eq!(score(&d, Some("Phone")), 0.0);

        // mean -50, population std dev 9
        let d = device(&[(0, -59), (1, -41), (2, -59), (3, -41)], true);
        assert_close(score(&d, Some("Phone")), STABLE_SIGNAL_WEIGHT);
    }

    // ── Combined ───────────────────────────────────────────────────

    #[test]
    fn anonymous_tag_following_for_eleven_minutes() {
        // every 30s for 11 minutes, clustered around -50
        let samples: Vec<(i64, i16)> = (0..=22)
            .map(|i| (i * 30, if i % 2 == 0 { -48 } else { -52 }))
            .collect();

        let connectable = device(&samples, true);
        let s = score(&connectable, None);
        assert_close(s, 0.8);
        assert!(is_suspicious(s));
        assert_eq!(probability_percent(s), 80);

        let beacon = device(&samples, false);
        assert_eq!(score(&beacon, None), 1.0);
        assert_eq!(probability_percent(score(&beacon, None)), 100);
    }

    #[test]
    fn score_is_always_within_unit_interval() {
        let extremes: [i16; 6] = [i16::MIN, -127, -80, 0, 20, i16::MAX];
        for &rssi in &extremes {
            for connectable in [false, true] {
                for name in [None, Some(""), Some("Tag")] {
                    let d = device(&[(0, rssi), (700, rssi), (701, rssi)], connectable);
                    let s = score(&d, name);
                    assert!((0.0..=1.0).contains(&s), "score {s} out of range");
                }
            }
        }
    }
}
