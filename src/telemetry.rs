//! ==============================================================================
//! telemetry.rs - where readings and alerts are reported
//! ==============================================================================
//!
//! purpose:
//!     five virtual pins carry the per-cycle values, plus a free-text
//!     notification channel for alert transitions.
//!
//!         V0 = PM1.0    V1 = PM2.5    V2 = PM10
//!         V3 = AQI      V4 = AQI level label
//!
//! implementations:
//!     - BlynkSink: Blynk HTTP api
//!           GET  {server}/{token}/update/V{pin}?value={value}
//!           POST {server}/{token}/notify   {"body": "..."}
//!     - LogSink: no auth token configured, just log
//!
//! ==============================================================================

use crate::error::TelemetryError;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// named telemetry channels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Pm1,
    Pm2_5,
    Pm10,
    Aqi,
    Level,
}

impl Channel {
    pub fn virtual_pin(&self) -> u8 {
        match self {
            Channel::Pm1 => 0,
            Channel::Pm2_5 => 1,
            Channel::Pm10 => 2,
            Channel::Aqi => 3,
            Channel::Level => 4,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.virtual_pin())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelemetryValue {
    Number(u16),
    Text(String),
}

impl fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryValue::Number(n) => write!(f, "{}", n),
            TelemetryValue::Text(s) => f.write_str(s),
        }
    }
}

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn write(&self, channel: Channel, value: TelemetryValue) -> Result<(), TelemetryError>;

    async fn notify(&self, message: &str) -> Result<(), TelemetryError>;
}

#[async_trait]
impl<T: TelemetrySink + ?Sized> TelemetrySink for Box<T> {
    async fn write(&self, channel: Channel, value: TelemetryValue) -> Result<(), TelemetryError> {
        (**self).write(channel, value).await
    }

    async fn notify(&self, message: &str) -> Result<(), TelemetryError> {
        (**self).notify(message).await
    }
}

pub struct BlynkSink {
    client: reqwest::Client,
    server: String,
    token: String,
}

impl BlynkSink {
    pub fn new(server: &str, token: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.server, self.token, path)
    }
}

fn check_status(response: reqwest::Response) -> Result<(), TelemetryError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(TelemetryError::Status(status.as_u16()))
    }
}

#[async_trait]
impl TelemetrySink for BlynkSink {
    async fn write(&self, channel: Channel, value: TelemetryValue) -> Result<(), TelemetryError> {
        let response = self
            .client
            .get(self.url(&format!("update/{}", channel)))
            .query(&[("value", value.to_string())])
            .send()
            .await?;
        check_status(response)
    }

    async fn notify(&self, message: &str) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(self.url("notify"))
            .json(&serde_json::json!({ "body": message }))
            .send()
            .await?;
        check_status(response)
    }
}

/// used when no auth token is configured
#[derive(Default)]
pub struct LogSink;

#[async_trait]
impl TelemetrySink for LogSink {
    async fn write(&self, channel: Channel, value: TelemetryValue) -> Result<(), TelemetryError> {
        tracing::debug!("[TELEMETRY] {} = {}", channel, value);
        Ok(())
    }

    async fn notify(&self, message: &str) -> Result<(), TelemetryError> {
        tracing::info!("[NOTIFY] {}", message);
        Ok(())
    }
}
