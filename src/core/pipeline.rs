//! Sighting pipeline
//! The single entry point between the radio layer, the controlling
//! application and the tracker engine.
//!
//! Registry, lifecycle and the outbound sink live behind one mutex, so a
//! sighting is applied, scored and emitted atomically with respect to
//! start/stop calls. A sighting that already holds the lock when a stop
//! arrives completes and is emitted; any sighting that takes the lock after
//! the stop has returned is dropped.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

use crate::core::lifecycle::{RadioTransition, ScanLifecycle, ScanState, StartOutcome};
use crate::core::tracker::{
    DeviceIdentity, DeviceRegistry, ErrorCode, OutboundEvent, RadioState, RawSighting,
    ScoredDevice, TrackedDevice,
};

/// Receives outbound records. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: OutboundEvent);
}

impl EventSink for UnboundedSender<OutboundEvent> {
    fn emit(&self, event: OutboundEvent) {
        if self.send(event).is_err() {
            debug!("Event stream receiver dropped; record discarded");
        }
    }
}

/// Connects to a previously sighted peer.
#[async_trait]
pub trait PeerActivator: Send + Sync {
    async fn activate(&self, identity: &DeviceIdentity) -> Result<()>;
}

/// Snapshot of the engine for status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStatus {
    #[serde(flatten)]
    pub scan: ScanState,
    pub radio: RadioState,
    pub tracked_devices: usize,
    pub subscribed: bool,
}

struct Engine {
    registry: DeviceRegistry,
    lifecycle: ScanLifecycle,
    sink: Option<Arc<dyn EventSink>>,
    scanning: watch::Sender<bool>,
}

impl Engine {
    /// Mirrors the lifecycle's scanning flag to `scan_halted` waiters.
    fn publish_scanning(&self) {
        self.scanning.send_replace(self.lifecycle.is_scanning());
    }

    fn emit(&self, event: OutboundEvent) {
        match &self.sink {
            Some(sink) => sink.emit(event),
            None => debug!("No subscriber; dropping {:?}", event),
        }
    }
}

#[derive(Clone)]
pub struct SightingPipeline {
    engine: Arc<Mutex<Engine>>,
}

impl Default for SightingPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl SightingPipeline {
    pub fn new() -> Self {
        Self {
            engine: Arc::new(Mutex::new(Engine {
                registry: DeviceRegistry::new(),
                lifecycle: ScanLifecycle::new(),
                sink: None,
                scanning: watch::channel(false).0,
            })),
        }
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs the outbound sink, replacing any previous one.
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.engine().sink = Some(sink);
        info!("Event stream subscribed");
    }

    /// Drops the outbound sink. Tracked devices are kept.
    pub fn unsubscribe(&self) {
        self.engine().sink = None;
        info!("Event stream unsubscribed");
    }

    /// Handles a user start request. Emits `bluetooth_not_ready` if the radio can't scan.
    pub fn start_scan(&self) -> StartOutcome {
        let mut engine = self.engine();
        let outcome = engine.lifecycle.start_requested();
        engine.publish_scanning();
        match outcome {
            StartOutcome::Started => info!("BLE scan started"),
            StartOutcome::AlreadyScanning => debug!("BLE scan already running"),
            StartOutcome::RadioNotReady => {
                warn!("Bluetooth not ready, cannot start scan");
                engine.emit(OutboundEvent::Error {
                    code: ErrorCode::BluetoothNotReady,
                });
            }
        }
        outcome
    }

    /// Handles a user stop request. Returns true if a scan was running.
    pub fn stop_scan(&self) -> bool {
        let halted = {
            let mut engine = self.engine();
            let halted = engine.lifecycle.stop_requested();
            engine.publish_scanning();
            halted
        };
        if halted {
            info!("BLE scan stopped");
        }
        halted
    }

    pub fn is_scanning(&self) -> bool {
        self.engine().lifecycle.is_scanning()
    }

    pub fn notify_radio_state(&self, radio: RadioState) -> RadioTransition {
        let transition = {
            let mut engine = self.engine();
            let transition = engine.lifecycle.radio_state_changed(radio);
            engine.publish_scanning();
            transition
        };
        if let RadioTransition::BecameUnavailable { scan_halted: true } = transition {
            warn!("Bluetooth became {}, scan halted", radio.as_str());
        }
        transition
    }

    /// Resolves once the pipeline is not scanning, whether from a user stop
    /// or from losing the radio. Resolves immediately if no scan is running.
    pub fn scan_halted(&self) -> impl Future<Output = ()> + Send + use<> {
        let mut scanning = self.engine().scanning.subscribe();
        async move {
            let _ = scanning.wait_for(|scanning| !*scanning).await;
        }
    }

    /// Applies one sighting and forwards the scored record to the sink.
    ///
    /// Returns `None` when no scan is running or the sighting is invalid.
    pub fn on_raw_sighting(
        &self,
        sighting: &RawSighting,
        name_hint: Option<&str>,
    ) -> Option<ScoredDevice> {
        let mut engine = self.engine();
        if !engine.lifecycle.is_scanning() {
            debug!("Ignoring sighting of {} while not scanning", sighting.identity);
            return None;
        }

        let scored = engine.registry.record(sighting, name_hint)?;
        debug!(
            "Device {} rssi {} score {:.2}",
            scored.identity, scored.latest_rssi, scored.score
        );
        engine.emit(OutboundEvent::Device(scored.clone()));
        Some(scored)
    }

    /// Asks the activator to connect to a sighted device.
    ///
    /// Unknown identities are ignored. Activation failures are logged and
    /// swallowed. Returns true if an activation was attempted.
    pub async fn trigger_device(
        &self,
        identity: &DeviceIdentity,
        activator: &dyn PeerActivator,
    ) -> bool {
        if !self.engine().registry.contains(identity) {
            debug!("Trigger requested for unknown device {}; ignoring", identity);
            return false;
        }

        info!("Triggering device {}", identity);
        if let Err(e) = activator.activate(identity).await {
            warn!("Failed to activate device {}: {}", identity, e);
        }
        true
    }

    pub fn tracked_device(&self, identity: &DeviceIdentity) -> Option<TrackedDevice> {
        self.engine().registry.get(identity).cloned()
    }

    pub fn forget(&self, identity: &DeviceIdentity) -> bool {
        self.engine().registry.forget(identity)
    }

    /// Forgets every tracked device.
    pub fn reset_session(&self) {
        self.engine().registry.clear();
        info!("Tracking session reset");
    }

    pub fn status(&self) -> PipelineStatus {
        let engine = self.engine();
        PipelineStatus {
            scan: engine.lifecycle.state(),
            radio: engine.lifecycle.radio(),
            tracked_devices: engine.registry.len(),
            subscribed: engine.sink.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::mpsc;

    // ── Test doubles ───────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<OutboundEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<OutboundEvent> {
            self.events.lock().unwrap().clone()
        }

        fn device_count(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| matches!(e, OutboundEvent::Device(_)))
                .count()
        }

        fn error_count(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| matches!(e, OutboundEvent::Error { .. }))
                .count()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: OutboundEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct CountingActivator {
        calls: AtomicU32,
        fail: bool,
    }

    impl CountingActivator {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PeerActivator for CountingActivator {
        async fn activate(&self, _identity: &DeviceIdentity) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("service discovery failed");
            }
            Ok(())
        }
    }

    fn sighting(id: &str, rssi: i16, secs: i64) -> RawSighting {
        let t0 = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        RawSighting::new(id, None, rssi, false, t0 + TimeDelta::seconds(secs))
    }

    fn scanning_pipeline() -> (SightingPipeline, Arc<RecordingSink>) {
        let pipeline = SightingPipeline::new();
        let sink = Arc::new(RecordingSink::default());
        pipeline.subscribe(sink.clone());
        pipeline.notify_radio_state(RadioState::Ready);
        assert_eq!(pipeline.start_scan(), StartOutcome::Started);
        (pipeline, sink)
    }

    // ── Start / stop ───────────────────────────────────────────────

    #[test]
    fn start_while_unavailable_reports_once_and_collects_nothing() {
        let pipeline = SightingPipeline::new();
        let sink = Arc::new(RecordingSink::default());
        pipeline.subscribe(sink.clone());
        pipeline.notify_radio_state(RadioState::Unavailable);

        assert_eq!(pipeline.start_scan(), StartOutcome::RadioNotReady);
        assert_eq!(
            sink.events(),
            vec![OutboundEvent::Error {
                code: ErrorCode::BluetoothNotReady
            }]
        );

        assert!(pipeline.on_raw_sighting(&sighting("D1", -55, 0), None).is_none());
        pipeline.notify_radio_state(RadioState::Ready);
        assert!(pipeline.on_raw_sighting(&sighting("D1", -55, 1), None).is_none());
        assert_eq!(sink.device_count(), 0);
        assert_eq!(sink.error_count(), 1);

        assert_eq!(pipeline.start_scan(), StartOutcome::Started);
        assert!(pipeline.on_raw_sighting(&sighting("D1", -55, 2), None).is_some());
        assert_eq!(sink.device_count(), 1);
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn no_records_after_stop() {
        let (pipeline, sink) = scanning_pipeline();
        pipeline.on_raw_sighting(&sighting("D1", -55, 0), None);
        assert!(pipeline.stop_scan());

        assert!(pipeline.on_raw_sighting(&sighting("D1", -55, 1), None).is_none());
        assert_eq!(sink.device_count(), 1);
        assert_eq!(pipeline.tracked_device(&"D1".into()).unwrap().sample_count(), 1);
    }

    #[test]
    fn radio_loss_stops_collection() {
        let (pipeline, sink) = scanning_pipeline();
        assert_eq!(
            pipeline.notify_radio_state(RadioState::Unavailable),
            RadioTransition::BecameUnavailable { scan_halted: true }
        );
        assert!(pipeline.on_raw_sighting(&sighting("D1", -55, 0), None).is_none());

        pipeline.notify_radio_state(RadioState::Ready);
        assert!(pipeline.on_raw_sighting(&sighting("D1", -55, 1), None).is_none());
        assert_eq!(sink.device_count(), 0);
    }

    #[test]
    fn concurrent_stop_never_leaks_records_afterwards() {
        let (pipeline, sink) = scanning_pipeline();
        let worker = {
            let pipeline = pipeline.clone();
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    pipeline.on_raw_sighting(&sighting("D1", -60, i), None);
                }
            })
        };

        std::thread::yield_now();
        pipeline.stop_scan();
        let emitted_at_stop = sink.device_count();
        worker.join().unwrap();
        assert_eq!(sink.device_count(), emitted_at_stop);
    }

    // ── Records ────────────────────────────────────────────────────

    #[test]
    fn scored_record_is_forwarded() {
        let (pipeline, sink) = scanning_pipeline();
        let scored = pipeline.on_raw_sighting(&sighting("D1", -55, 0), None).unwrap();
        assert!(scored.is_suspicious);
        assert_eq!(sink.events(), vec![OutboundEvent::Device(scored)]);
    }

    #[test]
    fn invalid_rssi_is_dropped_silently() {
        let (pipeline, sink) = scanning_pipeline();
        assert!(pipeline.on_raw_sighting(&sighting("D1", 127, 0), None).is_none());
        assert!(sink.events().is_empty());
        assert_eq!(pipeline.status().tracked_devices, 0);
    }

    #[test]
    fn unsubscribe_keeps_registry() {
        let (pipeline, sink) = scanning_pipeline();
        pipeline.on_raw_sighting(&sighting("D1", -55, 0), None);
        pipeline.unsubscribe();
        assert!(!pipeline.status().subscribed);

        let scored = pipeline.on_raw_sighting(&sighting("D1", -56, 30), None).unwrap();
        assert_eq!(scored.sample_count, 2);
        assert_eq!(sink.device_count(), 1);

        let resubscribed = Arc::new(RecordingSink::default());
        pipeline.subscribe(resubscribed.clone());
        let scored = pipeline.on_raw_sighting(&sighting("D1", -57, 60), None).unwrap();
        assert_eq!(scored.sample_count, 3);
        assert_eq!(resubscribed.device_count(), 1);
    }

    #[tokio::test]
    async fn scan_halted_resolves_on_radio_loss() {
        let (pipeline, _sink) = scanning_pipeline();
        let halted = tokio::spawn(pipeline.scan_halted());
        tokio::task::yield_now().await;
        assert!(!halted.is_finished());

        pipeline.notify_radio_state(RadioState::Unavailable);
        tokio::time::timeout(std::time::Duration::from_secs(1), halted)
            .await
            .expect("scan_halted did not resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn scan_halted_resolves_on_stop_and_when_idle() {
        let (pipeline, _sink) = scanning_pipeline();
        let halted = pipeline.scan_halted();
        pipeline.stop_scan();
        tokio::time::timeout(std::time::Duration::from_secs(1), halted)
            .await
            .expect("scan_halted did not resolve");

        tokio::time::timeout(std::time::Duration::from_secs(1), pipeline.scan_halted())
            .await
            .expect("idle pipeline should report halted");
    }

    #[tokio::test]
    async fn channel_sink_delivers_records() {
        let pipeline = SightingPipeline::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        pipeline.subscribe(Arc::new(tx));
        pipeline.start_scan();

        assert_eq!(
            rx.recv().await,
            Some(OutboundEvent::Error {
                code: ErrorCode::BluetoothNotReady
            })
        );
    }

    // ── Trigger ────────────────────────────────────────────────────

    #[tokio::test]
    async fn trigger_ignores_unknown_devices() {
        let (pipeline, _sink) = scanning_pipeline();
        let activator = CountingActivator::new(false);
        assert!(!pipeline.trigger_device(&"nope".into(), &activator).await);
        assert_eq!(activator.calls(), 0);
    }

    #[tokio::test]
    async fn trigger_swallows_activation_failures() {
        let (pipeline, _sink) = scanning_pipeline();
        pipeline.on_raw_sighting(&sighting("D1", -55, 0), None);

        let activator = CountingActivator::new(true);
        assert!(pipeline.trigger_device(&"D1".into(), &activator).await);
        assert_eq!(activator.calls(), 1);

        let scored = pipeline.on_raw_sighting(&sighting("D1", -55, 1), None).unwrap();
        assert_eq!(scored.score, 0.6);
    }

    // ── Session ────────────────────────────────────────────────────

    #[test]
    fn status_and_session_reset() {
        let (pipeline, _sink) = scanning_pipeline();
        pipeline.on_raw_sighting(&sighting("A", -55, 0), None);
        pipeline.on_raw_sighting(&sighting("B", -55, 0), None);

        let status = pipeline.status();
        assert_eq!(status.scan, ScanState::Scanning);
        assert_eq!(status.radio, RadioState::Ready);
        assert_eq!(status.tracked_devices, 2);

        assert!(pipeline.forget(&"A".into()));
        assert_eq!(pipeline.status().tracked_devices, 1);
        pipeline.reset_session();
        assert_eq!(pipeline.status().tracked_devices, 0);
        assert!(pipeline.status().scan == ScanState::Scanning);
    }
}
