//! Adapter availability monitoring
//! Translates bluest adapter events into radio state notifications.

use bluest::{Adapter, AdapterEvent};
use futures_util::StreamExt;
use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::pipeline::SightingPipeline;
use crate::core::tracker::RadioState;

pub fn radio_state_for(event: &AdapterEvent) -> RadioState {
    match event {
        AdapterEvent::Available => RadioState::Ready,
        AdapterEvent::Unavailable => RadioState::Unavailable,
    }
}

/// Reads the adapter's current availability.
pub async fn current_radio_state(adapter: &Adapter) -> RadioState {
    match adapter.is_available().await {
        Ok(true) => RadioState::Ready,
        Ok(false) => RadioState::Unavailable,
        Err(e) => {
            warn!("Could not query adapter availability: {}", e);
            RadioState::Unknown
        }
    }
}

/// Spawns a task that forwards adapter availability changes to the pipeline.
pub fn spawn_radio_monitor(
    adapter: Adapter,
    pipeline: SightingPipeline,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = match adapter.events().await {
            Ok(events) => events,
            Err(e) => {
                error!("Failed to subscribe to adapter events: {}", e);
                return;
            }
        };

        loop {
            tokio::select! {
                event = events.next() => {
                    match event {
                        Some(Ok(event)) => {
                            pipeline.notify_radio_state(radio_state_for(&event));
                        }
                        Some(Err(e)) => warn!("Adapter event error: {}", e),
                        None => {
                            info!("Adapter event stream has ended.");
                            break;
                        }
                    }
                }
                _ = cancel_token.cancelled() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_events_map_to_radio_states() {
        assert_eq!(radio_state_for(&AdapterEvent::Available), RadioState::Ready);
        assert_eq!(radio_state_for(&AdapterEvent::Unavailable), RadioState::Unavailable);
    }
}
