//! ==============================================================================
//! hal.rs - Hardware Abstraction Layer
//! ==============================================================================
//!
//! purpose:
//!     the two pieces of hardware the monitor touches:
//!     - two digital outputs wired to the sensor RESET and SET inputs
//!     - the UART the sensor talks on
//!     abstracts away the difference between running on a real Raspberry Pi
//!     (using `rppal`) and a development machine (using mocks).
//!
//! design:
//!     - "Compile Anywhere": without feature="hardware" the mock HAL is used,
//!       the serial link answers with a fixed well-formed frame.
//!     - GPIO output pins are held for the lifetime of the process. dropping
//!       an rppal OutputPin would otherwise put the line back to input.
//!
//! relationships:
//!     - used by: sensor.rs (startup/shutdown sequence, Transport)
//!     - used by: main.rs (open_outputs, open_serial)
//!     - uses: rppal (on feature="hardware")
//!
//! ==============================================================================

use crate::config::SensorConfig;
use crate::error::TransportFault;
use crate::frame::FRAME_LEN;
use crate::sensor::READ_REQUEST;

use anyhow::Result;
use std::time::Duration;

/// logical sensor control lines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    Reset,
    Set,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// two-state digital outputs addressed by logical line
pub trait DigitalOutput: Send {
    fn set_line(&mut self, line: Line, level: Level) -> Result<()>;
}

/// byte-oriented serial connection to the sensor
pub trait SerialLink: Send + 'static {
    /// drop anything received but not yet read
    fn clear_input(&mut self) -> Result<(), TransportFault>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportFault>;

    /// read until `buf` is full or `timeout` elapses, returns bytes read
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportFault>;
}

#[cfg(not(feature = "hardware"))]
pub type Outputs = MockOutputs;
#[cfg(not(feature = "hardware"))]
pub type Link = SimulatedLink;

#[cfg(feature = "hardware")]
pub type Outputs = GpioOutputs;
#[cfg(feature = "hardware")]
pub type Link = UartLink;

#[cfg(not(feature = "hardware"))]
pub fn open_outputs(config: &SensorConfig) -> Result<Outputs> {
    tracing::info!(
        "Using MOCK HAL (No hardware access) for RESET={} SET={}",
        config.reset_pin,
        config.set_pin
    );
    Ok(MockOutputs::default())
}

#[cfg(not(feature = "hardware"))]
pub fn open_serial(config: &SensorConfig) -> Result<Link, TransportFault> {
    use crate::sensor::{BAUD_RATE, DATA_BITS, STOP_BITS};

    tracing::info!(
        "Using SIMULATED serial link instead of {} ({} baud, {} data bits, {} stop bit)",
        config.serial_port,
        BAUD_RATE,
        DATA_BITS,
        STOP_BITS
    );
    Ok(SimulatedLink::default())
}

// ==============================================================================================
// MOCK IMPLEMENTATION (For WSL / Non-Hardware Build, and tests)
// ==============================================================================================

/// remembers the last level driven on each line
#[derive(Debug, Default)]
#[cfg_attr(feature = "hardware", allow(dead_code))]
pub struct MockOutputs {
    reset: Option<Level>,
    set: Option<Level>,
    history: Vec<(Line, Level)>,
}

#[allow(dead_code)]
impl MockOutputs {
    pub fn level(&self, line: Line) -> Option<Level> {
        match line {
            Line::Reset => self.reset,
            Line::Set => self.set,
        }
    }

    pub fn history(&self) -> &[(Line, Level)] {
        &self.history
    }
}

impl DigitalOutput for MockOutputs {
    fn set_line(&mut self, line: Line, level: Level) -> Result<()> {
        tracing::debug!("[MOCK GPIO] {:?} -> {:?}", line, level);
        match line {
            Line::Reset => self.reset = Some(level),
            Line::Set => self.set = Some(level),
        }
        self.history.push((line, level));
        Ok(())
    }
}

/// answers each read-request with the same frame
#[derive(Debug)]
#[cfg_attr(feature = "hardware", allow(dead_code))]
pub struct SimulatedLink {
    frame: [u8; FRAME_LEN],
    pending: Option<[u8; FRAME_LEN]>,
}

impl Default for SimulatedLink {
    fn default() -> Self {
        let mut frame = [0u8; FRAME_LEN];
        // header, length 28, then PM1.0=8 PM2.5=12 PM10=15
        frame[..10].copy_from_slice(&[0x42, 0x4D, 0x00, 0x1C, 0x00, 0x08, 0x00, 0x0C, 0x00, 0x0F]);
        Self { frame, pending: None }
    }
}

impl SerialLink for SimulatedLink {
    fn clear_input(&mut self) -> Result<(), TransportFault> {
        self.pending = None;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportFault> {
        tracing::debug!("[MOCK UART] Write: {}", hex::encode(bytes));
        if bytes == READ_REQUEST.as_slice() {
            self.pending = Some(self.frame);
        }
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, TransportFault> {
        let Some(frame) = self.pending.take() else {
            return Ok(0);
        };
        let n = buf.len().min(frame.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }
}

// ==============================================================================================
// REAL IMPLEMENTATION (For Raspberry Pi)
// ==============================================================================================

#[cfg(feature = "hardware")]
pub struct GpioOutputs {
    reset: rppal::gpio::OutputPin,
    set: rppal::gpio::OutputPin,
}

#[cfg(feature = "hardware")]
pub fn open_outputs(config: &SensorConfig) -> Result<Outputs> {
    use anyhow::Context;
    use rppal::gpio::Gpio;

    tracing::info!("Using REAL HARDWARE HAL (rppal)");
    let gpio = Gpio::new().context("failed to open gpio")?;
    let mut reset = gpio
        .get(config.reset_pin)
        .with_context(|| format!("failed to claim RESET pin {}", config.reset_pin))?
        .into_output();
    let mut set = gpio
        .get(config.set_pin)
        .with_context(|| format!("failed to claim SET pin {}", config.set_pin))?
        .into_output();
    // the shutdown sequence leaves RESET low; keep it that way after exit
    reset.set_reset_on_drop(false);
    set.set_reset_on_drop(false);
    Ok(GpioOutputs { reset, set })
}

#[cfg(feature = "hardware")]
impl DigitalOutput for GpioOutputs {
    fn set_line(&mut self, line: Line, level: Level) -> Result<()> {
        let pin = match line {
            Line::Reset => &mut self.reset,
            Line::Set => &mut self.set,
        };
        match level {
            Level::Low => pin.set_low(),
            Level::High => pin.set_high(),
        }
        Ok(())
    }
}

#[cfg(feature = "hardware")]
pub struct UartLink {
    uart: rppal::uart::Uart,
}

#[cfg(feature = "hardware")]
pub fn open_serial(config: &SensorConfig) -> Result<Link, TransportFault> {
    use crate::sensor::{BAUD_RATE, DATA_BITS, STOP_BITS};
    use rppal::uart::{Parity, Uart};

    let open_err = |e: rppal::uart::Error| TransportFault::Open {
        path: config.serial_port.clone(),
        reason: e.to_string(),
    };
    let mut uart = Uart::with_path(&config.serial_port, BAUD_RATE, Parity::None, DATA_BITS, STOP_BITS)
        .map_err(open_err)?;
    uart.set_write_mode(true).map_err(open_err)?;
    tracing::info!("[UART] Opened {} at {} baud", config.serial_port, BAUD_RATE);
    Ok(UartLink { uart })
}

#[cfg(feature = "hardware")]
impl SerialLink for UartLink {
    fn clear_input(&mut self) -> Result<(), TransportFault> {
        self.uart
            .flush(rppal::uart::Queue::Input)
            .map_err(|e| TransportFault::Io(e.to_string()))
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportFault> {
        let mut written = 0;
        while written < bytes.len() {
            let n = self
                .uart
                .write(&bytes[written..])
                .map_err(|e| TransportFault::Io(e.to_string()))?;
            if n == 0 {
                return Err(TransportFault::Io("write returned 0 bytes".to_string()));
            }
            written += n;
        }
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportFault> {
        let deadline = std::time::Instant::now() + timeout;
        let mut filled = 0;
        while filled < buf.len() {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            // min_length 0: return as soon as anything arrives or the wait runs out
            self.uart
                .set_read_mode(0, remaining)
                .map_err(|e| TransportFault::Io(e.to_string()))?;
            let n = self
                .uart
                .read(&mut buf[filled..])
                .map_err(|e| TransportFault::Io(e.to_string()))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}
