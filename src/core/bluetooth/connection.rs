//! Bluetooth connection handling for trigger requests
//! Connects to a previously sighted peer and walks its GATT table. The
//! device-specific write that would make a tag play a sound is not known, so
//! activation stops after discovery.

use std::sync::PoisonError;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bluest::{Adapter, Device};
use log::{debug, info, warn};
use tokio::time::timeout;

use crate::core::bluetooth::constants::{service_label, BLUETOOTH_OPERATION_TIMEOUT_SECS};
use crate::core::bluetooth::scanner::PeerMap;
use crate::core::pipeline::PeerActivator;
use crate::core::tracker::DeviceIdentity;

/// Connection manager for sighted peers
#[derive(Clone)]
pub struct ConnectionManager {
    adapter: Adapter,
    peers: PeerMap,
    max_retries: u32,
    retry_delay: u64,
}

impl ConnectionManager {
    pub fn new(adapter: Adapter, peers: PeerMap, max_retries: u32, retry_delay: u64) -> Self {
        Self {
            adapter,
            peers,
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    /// Connect to the device with retry mechanism
    async fn connect_with_retry(&self, device: &Device) -> Result<()> {
        let mut retry_count = 0;
        let mut last_error = None;

        while retry_count < self.max_retries {
            match self.try_connect(device).await {
                Ok(()) => {
                    info!("Successfully connected to device {}", device.id());
                    return Ok(());
                }
                Err(e) => {
                    warn!("Connection attempt {} failed: {}", retry_count + 1, e);
                    last_error = Some(e);

                    if retry_count < self.max_retries - 1 {
                        info!("Retrying connection in {} ms...", self.retry_delay);
                        tokio::time::sleep(Duration::from_millis(self.retry_delay)).await;
                    }
                }
            }
            retry_count += 1;
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to connect after {} attempts", self.max_retries)))
    }

    async fn try_connect(&self, device: &Device) -> Result<()> {
        if device.is_connected().await {
            debug!("Device {} already connected", device.id());
            return Ok(());
        }

        info!("Initiating connection to {}...", device.id());
        timeout(
            Duration::from_secs(BLUETOOTH_OPERATION_TIMEOUT_SECS),
            self.adapter.connect_device(device),
        )
        .await
        .map_err(|_| anyhow!("Connection timed out after {}s", BLUETOOTH_OPERATION_TIMEOUT_SECS))??;
        Ok(())
    }

    /// Discovers services and their characteristics. Failures are logged and
    /// swallowed; connection state has no bearing on scoring.
    async fn discover(&self, device: &Device) {
        info!("Connected to {}, discovering services...", device.id());
        let services = match device.discover_services().await {
            Ok(services) => services,
            Err(e) => {
                warn!("Service discovery failed for {}: {}", device.id(), e);
                return;
            }
        };

        for service in &services {
            let uuid = service.uuid();
            match service.discover_characteristics().await {
                Ok(characteristics) => info!(
                    "Service {} ({}): {} characteristics",
                    uuid,
                    service_label(&uuid).unwrap_or("vendor"),
                    characteristics.len()
                ),
                Err(e) => warn!("Characteristic discovery failed for service {}: {}", uuid, e),
            }
        }
        info!("Discovery complete for {}: {} services", device.id(), services.len());
    }
}

#[async_trait]
impl PeerActivator for ConnectionManager {
    async fn activate(&self, identity: &DeviceIdentity) -> Result<()> {
        let device = {
            let peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);
            peers
                .get(identity)
                .cloned()
                .ok_or_else(|| anyhow!("No peer handle for device {}", identity))?
        };

        self.connect_with_retry(&device).await?;
        self.discover(&device).await;
        Ok(())
    }
}
