//! Stdout record stream
//! Renders outbound records and command replies as JSON lines and hands them
//! to a single writer so they never interleave.

use log::{debug, error};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::config::output_config::OutputConfig;
use crate::core::pipeline::EventSink;
use crate::core::tracker::OutboundEvent;

/// Serializes a record on one line, or pretty-printed if configured.
pub fn render<T: Serialize>(record: &T, config: &OutputConfig) -> Option<String> {
    let rendered = if config.pretty {
        serde_json::to_string_pretty(record)
    } else {
        serde_json::to_string(record)
    };
    match rendered {
        Ok(line) => Some(line),
        Err(e) => {
            error!("Failed to serialize record: {}", e);
            None
        }
    }
}

/// Whether an event passes the output filter.
pub fn should_emit(event: &OutboundEvent, config: &OutputConfig) -> bool {
    match event {
        OutboundEvent::Device(device) => !config.suspicious_only || device.is_suspicious,
        OutboundEvent::Error { .. } => true,
    }
}

/// Event sink that renders records into the line channel.
pub struct LineSink {
    lines: UnboundedSender<String>,
    config: OutputConfig,
}

impl LineSink {
    pub fn new(lines: UnboundedSender<String>, config: OutputConfig) -> Self {
        Self { lines, config }
    }
}

impl EventSink for LineSink {
    fn emit(&self, event: OutboundEvent) {
        if !should_emit(&event, &self.config) {
            return;
        }
        if let Some(line) = render(&event, &self.config) {
            if self.lines.send(line).is_err() {
                debug!("Output writer gone; record discarded");
            }
        }
    }
}

/// Drains the line channel into `writer` until every sender is gone.
pub async fn write_lines<W: AsyncWrite + Unpin>(
    mut lines: UnboundedReceiver<String>,
    mut writer: W,
) -> std::io::Result<()> {
    while let Some(line) = lines.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
