//! Bluetooth manager
//! Wires the bluest adapter to the sighting pipeline and exposes the
//! controlling application's operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use bluest::Adapter;
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::connection_config::ConnectionConfig;
use crate::core::bluetooth::connection::ConnectionManager;
use crate::core::bluetooth::radio::{current_radio_state, spawn_radio_monitor};
use crate::core::bluetooth::scanner::BluetoothScanner;
use crate::core::lifecycle::StartOutcome;
use crate::core::pipeline::{EventSink, PipelineStatus, SightingPipeline};
use crate::core::tracker::RadioState;

/// Adapter-backed collaborators; absent when the host has no Bluetooth adapter.
struct Radio {
    scanner: BluetoothScanner,
    connection_manager: ConnectionManager,
    monitor: JoinHandle<()>,
}

/// Manages Bluetooth operations
pub struct BluetoothManager {
    pipeline: SightingPipeline,
    radio: Option<Radio>,
    shutdown_token: CancellationToken,
}

impl BluetoothManager {
    /// Creates a new BluetoothManager on the default adapter.
    pub async fn new(config: &ConnectionConfig) -> Result<Self> {
        let pipeline = SightingPipeline::new();
        let shutdown_token = CancellationToken::new();

        let radio = match Adapter::default().await {
            Some(adapter) => {
                let initial = current_radio_state(&adapter).await;
                info!("Bluetooth adapter found, radio is {}", initial.as_str());
                pipeline.notify_radio_state(initial);

                let peers = Arc::new(Mutex::new(HashMap::new()));
                let connection_manager = ConnectionManager::new(
                    adapter.clone(),
                    peers.clone(),
                    config.max_retries,
                    config.retry_delay_ms,
                );
                let scanner = BluetoothScanner::new(adapter.clone(), peers);
                let monitor =
                    spawn_radio_monitor(adapter, pipeline.clone(), shutdown_token.child_token());
                Some(Radio {
                    scanner,
                    connection_manager,
                    monitor,
                })
            }
            None => {
                warn!("No Bluetooth adapter found");
                pipeline.notify_radio_state(RadioState::Unsupported);
                None
            }
        };

        Ok(Self {
            pipeline,
            radio,
            shutdown_token,
        })
    }

    pub fn pipeline(&self) -> SightingPipeline {
        self.pipeline.clone()
    }

    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.pipeline.subscribe(sink);
    }

    pub fn unsubscribe(&self) {
        self.pipeline.unsubscribe();
    }

    /// Requests a scan. The radio scan task only runs once the lifecycle agrees.
    pub async fn start_scan(&mut self) -> Result<StartOutcome> {
        let outcome = self.pipeline.start_scan();
        let Some(radio) = self.radio.as_mut() else {
            return Ok(outcome);
        };

        let needs_task = match outcome {
            StartOutcome::Started => true,
            StartOutcome::AlreadyScanning => !radio.scanner.is_running(),
            StartOutcome::RadioNotReady => false,
        };

        if needs_task {
            if let Err(e) = radio.scanner.start_scan(self.pipeline.clone()).await {
                self.pipeline.stop_scan();
                return Err(e);
            }
        }
        Ok(outcome)
    }

    pub async fn stop_scan(&mut self) -> Result<()> {
        self.pipeline.stop_scan();
        if let Some(radio) = self.radio.as_mut() {
            radio.scanner.stop_scan().await?;
        }
        Ok(())
    }

    /// Connection handle for trigger requests. Cloned so callers can connect
    /// without holding the manager lock.
    pub fn connection_manager(&self) -> Option<ConnectionManager> {
        self.radio
            .as_ref()
            .map(|radio| radio.connection_manager.clone())
    }

    pub fn status(&self) -> PipelineStatus {
        self.pipeline.status()
    }

    /// Stops scanning and the radio monitor.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stop_scan().await?;
        self.unsubscribe();
        self.shutdown_token.cancel();
        if let Some(radio) = self.radio.take() {
            if let Err(e) = radio.monitor.await {
                warn!("Radio monitor ended abnormally: {}", e);
            }
        }
        info!("Bluetooth manager shut down.");
        Ok(())
    }
}
