//! ==============================================================================
//! monitor.rs - the sampling loop
//! ==============================================================================
//!
//! purpose:
//!     boot() brings the sensor up and waits for the network, giving up
//!     cleanly (RESET held low) if shutdown is requested first. then run()
//!     takes one measurement cycle every `interval`:
//!
//!         connectivity ─▶ read frame ─▶ decode ─▶ aqi ─▶ alert ─▶ telemetry
//!
//!     until the shutdown future resolves.
//!
//! failure policy:
//!     - no network: wait (connectivity.rs retries forever)
//!     - short/failed sensor read: log, skip the rest of the cycle
//!     - notification or telemetry write failure: log, carry on
//!
//! relationships:
//!     - used by: main.rs
//!     - uses: sensor.rs, frame.rs, aqi.rs, alert.rs, telemetry.rs,
//!             connectivity.rs, clock.rs
//!
//! ==============================================================================

use crate::alert::{AlertEvent, AlertState};
use crate::aqi::compute_aqi;
use crate::clock::Clock;
use crate::connectivity::{wait_until_online, ConnectivityProbe, RetryPolicy};
use crate::domain::{AirQualityIndex, Reading};
use crate::error::CycleError;
use crate::frame::decode;
use crate::hal::{DigitalOutput, SerialLink};
use crate::sensor::{self, Transport};
use crate::telemetry::{Channel, TelemetrySink, TelemetryValue};

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// how the boot sequence ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boot {
    Ready,
    Interrupted,
}

/// sensor startup followed by the first connectivity wait, abandoned if
/// `shutdown` resolves first.
///
/// RESET is driven low on every path except `Boot::Ready`, including when
/// startup itself fails.
pub async fn boot<O, L, P, C, F>(
    outputs: &mut O,
    transport: &Transport<L>,
    probe: &P,
    retry: &RetryPolicy,
    clock: &C,
    shutdown: Pin<&mut F>,
) -> anyhow::Result<Boot>
where
    O: DigitalOutput,
    L: SerialLink,
    P: ConnectivityProbe,
    C: Clock,
    F: Future<Output = ()>,
{
    let outcome = tokio::select! {
        _ = shutdown => None,
        result = async {
            sensor::startup(&mut *outputs, transport, clock).await?;
            tracing::info!("[STARTUP] Sensor ready, waiting for network");
            let attempts = wait_until_online(probe, retry, clock).await;
            tracing::info!("[STARTUP] Network reachable after {} attempt(s)", attempts);
            anyhow::Ok(())
        } => Some(result),
    };

    match outcome {
        Some(Ok(())) => Ok(Boot::Ready),
        Some(Err(e)) => {
            if let Err(cleanup) = sensor::shutdown(outputs) {
                tracing::error!("[STARTUP] failed to hold sensor in reset: {}", cleanup);
            }
            Err(e)
        }
        None => {
            tracing::info!("[STARTUP] Shutdown requested before sampling started");
            sensor::shutdown(outputs)?;
            Ok(Boot::Interrupted)
        }
    }
}

/// what one successful cycle produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    pub reading: Reading,
    pub index: AirQualityIndex,
    pub alert: Option<AlertEvent>,
}

pub struct MonitorSettings {
    pub interval: Duration,
    pub hysteresis: u16,
    pub retry: RetryPolicy,
    pub show_sensor_data: bool,
}

pub struct Monitor<L, P, S, C>
where
    L: SerialLink,
    P: ConnectivityProbe,
    S: TelemetrySink,
    C: Clock,
{
    transport: Transport<L>,
    probe: P,
    sink: S,
    clock: C,
    settings: MonitorSettings,
    alert: AlertState,
}

impl<L, P, S, C> Monitor<L, P, S, C>
where
    L: SerialLink,
    P: ConnectivityProbe,
    S: TelemetrySink,
    C: Clock,
{
    pub fn new(transport: Transport<L>, probe: P, sink: S, clock: C, settings: MonitorSettings) -> Self {
        Self {
            transport,
            probe,
            sink,
            clock,
            settings,
            alert: AlertState::default(),
        }
    }

    /// run cycles at a fixed period until `shutdown` resolves
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.settings.interval);
        // a slow cycle (waiting on the network) pushes the schedule back
        // instead of firing a burst of catch-up samples
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("[RUNTIME] Starting sensor polling ({:?} interval)", self.settings.interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("[RUNTIME] Shutdown requested");
                    break;
                }
                _ = async {
                    ticker.tick().await;
                    self.tick().await;
                } => {}
            }
        }
    }

    async fn tick(&mut self) {
        match self.run_cycle().await {
            Ok(report) => {
                if self.settings.show_sensor_data {
                    tracing::info!(
                        "[PM] PM1.0: {} | PM2.5: {} | PM10: {} | AQI: {} ({})",
                        report.reading.pm1,
                        report.reading.pm2_5,
                        report.reading.pm10,
                        report.index.value,
                        report.index.level
                    );
                }
            }
            Err(e) => {
                tracing::warn!("[PM] ⚠ Cycle skipped: {}", e);
            }
        }
    }

    /// one full measurement cycle
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        wait_until_online(&self.probe, &self.settings.retry, &self.clock).await;

        let frame = self.transport.read_frame().await?;
        let reading = decode(&frame);
        let index = compute_aqi(reading.pm2_5);

        let (next, event) = self.alert.next(&index, self.settings.hysteresis);
        if next != self.alert {
            tracing::info!("[ALERT] {:?} -> {:?} at AQI {}", self.alert, next, index.value);
        }
        self.alert = next;
        if let Some(event) = &event {
            if let Err(e) = self.sink.notify(&event.message()).await {
                tracing::warn!("[ALERT] ⚠ Notification not delivered: {}", e);
            }
        }

        self.publish(&reading, &index).await;

        Ok(CycleReport { reading, index, alert: event })
    }

    async fn publish(&self, reading: &Reading, index: &AirQualityIndex) {
        let values = [
            (Channel::Pm1, TelemetryValue::Number(reading.pm1)),
            (Channel::Pm2_5, TelemetryValue::Number(reading.pm2_5)),
            (Channel::Pm10, TelemetryValue::Number(reading.pm10)),
            (Channel::Aqi, TelemetryValue::Number(index.value)),
            (Channel::Level, TelemetryValue::Text(index.level.label().to_string())),
        ];

        for (channel, value) in values {
            if let Err(e) = self.sink.write(channel, value).await {
                tracing::warn!("[TELEMETRY] ⚠ Write to {} failed: {}", channel, e);
            }
        }
    }
}
