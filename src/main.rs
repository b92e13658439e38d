//! # RVR Bridge
//!
//! Drive a Sphero RVR through a generic pin-based robot protocol.
//!
//! The binary opens the serial link to the robot, runs the controller on a
//! single event loop and resets the robot on Ctrl+C.
//!
//! # Examples
//!
//! ```bash
//! rvr-bridge --serial-port /dev/ttyS0
//! rvr-bridge -c config/default.toml
//! ```
//!
//! Expected output:
//! ```text
//! INFO rvr_bridge: RVR Bridge v0.1.0 starting...
//! INFO rvr_bridge::serial: Successfully opened RVR serial port at /dev/ttyS0
//! INFO rvr_bridge::controller::rvr: RVR channel open, controller ready
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rvr_bridge::config::{Config, LoggingConfig};
use rvr_bridge::controller::events::ControllerEvent;
use rvr_bridge::controller::rvr::RvrController;
use rvr_bridge::controller::RobotController;
use rvr_bridge::serial;
use rvr_bridge::telemetry::{analog_recorder, TelemetryLogger};

/// Time given to the serial writer to send the reset commands before exit
const SHUTDOWN_FLUSH_DELAY: Duration = Duration::from_millis(200);

/// File name prefix for daily rolling log files
const LOG_FILE_PREFIX: &str = "rvr-bridge.log";

/// Sphero RVR pin bridge
#[derive(Debug, Parser)]
#[command(name = "rvr-bridge")]
#[command(about = "Expose a Sphero RVR as digital, analog and servo pins", long_about = None)]
#[command(version)]
struct Cli {
    /// Serial device connected to the RVR (overrides [serial] port)
    #[arg(short, long)]
    serial_port: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Sets up console logging, plus a daily rolling file when a directory is
/// configured. The returned guard must live as long as logging is needed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = if config.directory.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(port) = &cli.serial_port {
        config.serial.port = port.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _log_guard = init_logging(&config.logging);

    info!("RVR Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let mut controller = RvrController::new(command_tx, &config.controller);

    if config.telemetry.enabled {
        let logger = TelemetryLogger::new(&config.telemetry).context("Failed to start telemetry")?;
        controller.add_listener(analog_recorder(logger));
    }
    controller.add_listener(Box::new(|event: &ControllerEvent| match event {
        ControllerEvent::Ready => info!("Controller ready"),
        ControllerEvent::AnalogRead { port, value } => trace!("A{} = {}", port, value),
    }));

    serial::connect(&config.serial, command_rx, event_tx);

    info!("Press Ctrl+C to exit");

    let outcome = loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(event) => {
                    if let Err(e) = controller.handle_device_event(event) {
                        break Err(e);
                    }
                }
                None => {
                    warn!("RVR connection closed");
                    break Ok(());
                }
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break Ok(());
            }
        }
    };

    controller.reset();
    sleep(SHUTDOWN_FLUSH_DELAY).await;

    outcome?;
    Ok(())
}
