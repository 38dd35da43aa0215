use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use tracker_sentinel_lib::config::AppConfig;
use tracker_sentinel_lib::logging;
use tracker_sentinel_lib::output::{self, LineSink};
use tracker_sentinel_lib::protocol::{parse_command, CommandReply};
use tracker_sentinel_lib::state::AppState;
use tracker_sentinel_lib::commands;

/// Flags nearby BLE beacons that behave like a tracking tag.
///
/// Reads JSON commands from stdin, one per line, and writes device records,
/// error records and command replies to stdout.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the JSON config file
    #[arg(long, default_value = "tracker-sentinel.json")]
    config: PathBuf,

    /// Log level, overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Write the default config to --config and exit
    #[arg(long)]
    write_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.write_default_config {
        AppConfig::default()
            .save_config(&args.config)
            .await
            .with_context(|| format!("Failed to write config to {:?}", args.config))?;
        return Ok(());
    }

    let mut config = AppConfig::load_config(&args.config)
        .await
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    let level = config.logging.level_filter()?;
    logging::init(level).context("Failed to install logger")?;
    info!("Starting tracker sentinel v{}", env!("CARGO_PKG_VERSION"));

    let app_state = AppState::new(config).await?;

    let (line_tx, line_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(output::write_lines(line_rx, tokio::io::stdout()));

    let sink = LineSink::new(line_tx.clone(), app_state.config.output.clone());
    app_state.bluetooth_manager.lock().await.subscribe(Arc::new(sink));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = stdin.next_line() => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => {
                        let reply = match parse_command(&line) {
                            Ok(command) => commands::dispatch(command, &app_state).await,
                            Err(e) => {
                                warn!("Rejected command {:?}: {}", line, e);
                                CommandReply::error(&e)
                            }
                        };
                        if let Some(rendered) = output::render(&reply, &app_state.config.output) {
                            if line_tx.send(rendered).is_err() {
                                debug!("Output writer gone; reply discarded");
                            }
                        }
                    }
                    Ok(None) => {
                        info!("Command input closed.");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read command input: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted.");
                break;
            }
        }
    }

    app_state.bluetooth_manager.lock().await.shutdown().await?;
    drop(line_tx);
    if let Err(e) = writer.await? {
        error!("Output writer failed: {}", e);
    }
    Ok(())
}
