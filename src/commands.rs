//! Host commands
//! This module defines all the commands that can be invoked by the controlling application.

use crate::core::StartOutcome;
use crate::core::tracker::DeviceIdentity;
use crate::error::CommandError;
use crate::protocol::{CommandReply, HostCommand};
use crate::state::AppState;

/// Starts scanning for devices.
///
/// Scored device records stream out through the subscribed sink. If the radio
/// is not ready, a `bluetooth_not_ready` error record is streamed instead and
/// the request is not retried.
pub async fn start_scan(app_state: &AppState) -> Result<CommandReply, CommandError> {
    let bluetooth_manager_arc = app_state.get_bluetooth_manager_arc();
    let mut bluetooth_manager_guard = bluetooth_manager_arc.lock().await;

    let outcome = bluetooth_manager_guard
        .start_scan()
        .await
        .map_err(|e| CommandError::Failed(e.to_string()))?;
    let message = match outcome {
        StartOutcome::Started => "Scan started",
        StartOutcome::AlreadyScanning => "Scan already running",
        StartOutcome::RadioNotReady => "Bluetooth not ready",
    };
    Ok(CommandReply::ok(message))
}

pub async fn stop_scan(app_state: &AppState) -> Result<CommandReply, CommandError> {
    let bluetooth_manager_arc = app_state.get_bluetooth_manager_arc();
    let mut bluetooth_manager_guard = bluetooth_manager_arc.lock().await;

    bluetooth_manager_guard
        .stop_scan()
        .await
        .map_err(|e| CommandError::Failed(e.to_string()))?;
    Ok(CommandReply::ok("Scan stopped"))
}

/// Connects to a previously sighted device.
///
/// # Arguments
/// * `device_id` - The platform identifier reported in device records
///
/// Unknown devices are silently ignored, so the reply is the same either way.
pub async fn trigger_device(
    device_id: String,
    app_state: &AppState,
) -> Result<CommandReply, CommandError> {
    if device_id.trim().is_empty() {
        return Err(CommandError::InvalidArguments("Device ID not provided"));
    }

    let (pipeline, connection_manager) = {
        let bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
        (
            bluetooth_manager_guard.pipeline(),
            bluetooth_manager_guard.connection_manager(),
        )
    };

    if let Some(connection_manager) = connection_manager {
        let identity = DeviceIdentity::from(device_id.as_str());
        pipeline.trigger_device(&identity, &connection_manager).await;
    }
    Ok(CommandReply::ok(format!("trigger sent to device {}", device_id)))
}

pub async fn status(app_state: &AppState) -> Result<CommandReply, CommandError> {
    let bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    Ok(CommandReply::with_status("Status", bluetooth_manager_guard.status()))
}

/// Runs a parsed command and folds any error into the reply.
pub async fn dispatch(command: HostCommand, app_state: &AppState) -> CommandReply {
    let result = match command {
        HostCommand::StartScan => start_scan(app_state).await,
        HostCommand::StopScan => stop_scan(app_state).await,
        HostCommand::Trigger { id } => trigger_device(id, app_state).await,
        HostCommand::Status => status(app_state).await,
    };
    CommandReply::from(result)
}
