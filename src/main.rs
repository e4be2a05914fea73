//! ==============================================================================
//! main.rs - particulate matter AQI monitor entry point
//! ==============================================================================
//!
//! purpose:
//!     raspberry pi daemon for a UART particulate sensor. every few seconds it
//!     reads PM1.0 / PM2.5 / PM10, approximates the AQI from PM2.5 and pushes
//!     everything to Blynk virtual pins. when air quality crosses AQI 50
//!     (with hysteresis) the user gets a notification to adjust their air
//!     purifier.
//!
//! responsibilities:
//!     - load configuration and set up logging
//!     - claim the RESET/SET gpio lines and open the serial port
//!     - run the sensor reset/wake sequence
//!     - run the sampling loop until ctrl-c / SIGTERM
//!     - hold the sensor in reset on the way out
//!
//! relationships:
//!     - uses: config.rs (monitor.toml)
//!     - uses: hal.rs (gpio + uart, real or mock)
//!     - uses: sensor.rs (startup/shutdown, transport)
//!     - uses: monitor.rs (sampling loop)
//!     - uses: connectivity.rs, telemetry.rs (network collaborators)
//!
//! pinout (BCM, defaults):
//!
//!     ┌──────────┬───────────────┬──────────────┐
//!     │ signal   │ raspberry pi  │ sensor       │
//!     ├──────────┼───────────────┼──────────────┤
//!     │ TX       │ pin 8         │ 7 (RX)       │
//!     │ RX       │ pin 10        │ 9 (TX)       │
//!     │ RESET    │ GPIO 23       │ 5            │
//!     │ SET      │ GPIO 24       │ 10           │
//!     └──────────┴───────────────┴──────────────┘
//!
//! ==============================================================================

mod alert;
mod aqi;
mod clock;
mod config;
mod connectivity;
mod domain;
mod error;
mod frame;
mod hal;
mod monitor;
mod sensor;
mod telemetry;

use crate::clock::TokioClock;
use crate::config::MonitorConfig;
use crate::connectivity::HttpProbe;
use crate::monitor::{Boot, Monitor, MonitorSettings};
use crate::sensor::Transport;
use crate::telemetry::{BlynkSink, LogSink, TelemetrySink};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Particulate matter AQI monitor
#[derive(Parser, Debug)]
#[command(name = "pm-aqi-monitor")]
#[command(version)]
#[command(about = "Polls a UART particulate sensor and reports AQI to Blynk")]
struct Args {
    /// Configuration file path (default: config/monitor.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // startup banner
    println!("===========================================================");
    println!("  PM Sensor AQI Monitor");
    println!("===========================================================");

    // step 1: load configuration
    let config = match &args.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => MonitorConfig::load_or_default(),
    };
    init_logging(&config.logging.level, args.debug);
    config.print_summary();

    // step 2: claim hardware. no sensor, no point running.
    let mut outputs = hal::open_outputs(&config.sensor).context("failed to initialise gpio")?;
    let link = hal::open_serial(&config.sensor).context("failed to open sensor serial port")?;
    let transport = Transport::new(link);
    let clock = TokioClock;

    // step 3: network collaborators, built before any line is driven
    let retry = config.connectivity.retry_policy();
    let probe = HttpProbe::new(&config.connectivity.probe_url, retry.attempt_timeout)?;
    let sink: Box<dyn TelemetrySink> = if config.telemetry.auth_token.is_empty() {
        tracing::warn!("No telemetry.auth_token configured - readings will only be logged");
        Box::new(LogSink)
    } else {
        Box::new(BlynkSink::new(&config.telemetry.server, &config.telemetry.auth_token)?)
    };

    // one handler for the whole process lifetime, boot included
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    // step 4: reset, wake, ask-answer mode, then wait for the network
    println!("\n[STARTUP] Resetting and waking sensor...");
    match monitor::boot(&mut outputs, &transport, &probe, &retry, &clock, shutdown.as_mut()).await? {
        Boot::Ready => println!("[STARTUP] ✓ Sensor ready, network reachable"),
        Boot::Interrupted => {
            println!("\nGoodbye!");
            return Ok(());
        }
    }

    // step 5: main polling loop
    let settings = MonitorSettings {
        interval: config.sample_interval(),
        hysteresis: config.alert.hysteresis,
        retry,
        show_sensor_data: config.logging.show_sensor_data,
    };
    println!("────────────────────────────────────────────────────────────");
    let mut monitor = Monitor::new(transport, probe, sink, clock, settings);
    monitor.run(shutdown.as_mut()).await;

    // step 6: leave the sensor held in reset
    sensor::shutdown(&mut outputs).context("failed to drive RESET low on exit")?;
    println!("\nGoodbye!");
    Ok(())
}

fn init_logging(level: &str, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// resolves on ctrl-c, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
