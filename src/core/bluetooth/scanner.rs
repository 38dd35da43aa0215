use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, Result};
use bluest::{Adapter, AdvertisingDevice, Device};
use chrono::Utc;
use futures_util::StreamExt;
use log::{debug, error, info};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::pipeline::SightingPipeline;
use crate::core::tracker::{DeviceIdentity, RawSighting};

/// Platform handles for every device the registry has accepted a sighting from.
pub type PeerMap = Arc<Mutex<HashMap<DeviceIdentity, Device>>>;

pub struct BluetoothScanner {
    adapter: Adapter,
    peers: PeerMap,
    cancel_token: CancellationToken,
    scan_task_handle: Option<JoinHandle<Result<()>>>,
}

impl BluetoothScanner {
    pub fn new(adapter: Adapter, peers: PeerMap) -> Self {
        Self {
            adapter,
            peers,
            cancel_token: CancellationToken::new(),
            scan_task_handle: None,
        }
    }

    /// True while a scan task is alive.
    pub fn is_running(&self) -> bool {
        self.scan_task_handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub async fn start_scan(&mut self, pipeline: SightingPipeline) -> Result<()> {
        if self.scan_task_handle.is_some() {
            self.stop_scan().await?;
        }

        self.cancel_token = CancellationToken::new();
        let cancel_token_for_task = self.cancel_token.clone();
        let adapter_for_task = self.adapter.clone();
        let peers_for_task = self.peers.clone();

        let handle = spawn_scan_task(pipeline, move |pipeline, opened| {
            Self::internal_scan_task(
                adapter_for_task,
                peers_for_task,
                pipeline,
                cancel_token_for_task,
                opened,
            )
        })
        .await?;

        self.scan_task_handle = Some(handle);
        info!("Device scan task started.");
        Ok(())
    }

    /// Feeds every advertisement into the pipeline until cancelled, the
    /// stream ends, or the pipeline leaves the scanning state.
    async fn internal_scan_task(
        adapter: Adapter,
        peers: PeerMap,
        pipeline: SightingPipeline,
        cancel_token: CancellationToken,
        opened: oneshot::Sender<()>,
    ) -> Result<()> {
        info!("Starting bluetooth scan");
        let mut scan_stream = adapter.scan(&[]).await?;
        if opened.send(()).is_err() {
            debug!("Scan start caller went away before the stream opened");
        }

        let halted = pipeline.scan_halted();
        tokio::pin!(halted);

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    match result {
                        Some(discovered_device) => {
                            if !Self::handle_advertisement(&peers, &pipeline, discovered_device) {
                                info!("Scan no longer active, ending scan task.");
                                break;
                            }
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            pipeline.stop_scan();
                            break;
                        }
                    }
                }
                _ = &mut halted => {
                    info!("Scan halted, ending scan task.");
                    break;
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Returns false once the pipeline is no longer scanning.
    fn handle_advertisement(
        peers: &PeerMap,
        pipeline: &SightingPipeline,
        discovered_device: AdvertisingDevice,
    ) -> bool {
        if !pipeline.is_scanning() {
            return false;
        }

        let device = discovered_device.device;
        let Some(rssi) = discovered_device.rssi else {
            debug!("Advertisement from {:?} has no RSSI, skipping", device.id());
            return true;
        };

        let identity = DeviceIdentity::from(device.id().to_string());
        let name_hint = device.name().ok();
        let sighting = RawSighting::new(
            identity.clone(),
            discovered_device.adv_data.local_name,
            rssi,
            discovered_device.adv_data.is_connectable,
            Utc::now(),
        );

        if pipeline
            .on_raw_sighting(&sighting, name_hint.as_deref())
            .is_some()
        {
            peers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(identity, device);
        }
        true
    }

    pub async fn stop_scan(&mut self) -> Result<()> {
        info!("Stopping Bluetooth scan.");
        self.cancel_token.cancel();

        if let Some(handle) = self.scan_task_handle.take() {
            info!("Waiting for scan task to finish...");
            match handle.await {
                Ok(task_result) => match task_result {
                    Ok(_) => info!("Scan task finished."),
                    Err(e) => error!("Scan task finished with an error: {:?}", e),
                },
                Err(e) => {
                    if e.is_cancelled() {
                        info!("Scan task was cancelled.");
                    } else {
                        error!("Scan task finished with an unexpected join error: {:?}", e);
                    }
                }
            }
        } else {
            debug!("No active scan task handle found to wait for.");
        }
        Ok(())
    }
}

/// Spawns `scan` and waits until it signals that its advertisement stream is
/// open. A scan that fails, before or after opening, halts the pipeline so
/// the lifecycle never reports scanning without a collector behind it.
async fn spawn_scan_task<F, Fut>(
    pipeline: SightingPipeline,
    scan: F,
) -> Result<JoinHandle<Result<()>>>
where
    F: FnOnce(SightingPipeline, oneshot::Sender<()>) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let (opened_tx, opened_rx) = oneshot::channel();
    let task = scan(pipeline.clone(), opened_tx);

    let handle = tokio::spawn(async move {
        let result = task.await;
        if let Err(e) = &result {
            error!("Scan task failed: {}", e);
            pipeline.stop_scan();
        }
        result
    });

    if opened_rx.await.is_ok() {
        return Ok(handle);
    }

    // The sender was dropped, so the task finished without opening a stream.
    match handle.await {
        Ok(Ok(())) => Err(anyhow!("Scan task ended before the scan started")),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(e.into()),
    }
}
