//! ==============================================================================
//! sensor.rs - particulate sensor transport and power sequencing
//! ==============================================================================
//!
//! purpose:
//!     talks to the PM sensor in ask-answer mode over the UART and drives
//!     the RESET/SET lines that power-cycle and wake it.
//!
//! protocol:
//!     - 9600 8N1, 1s read timeout
//!     - mode-switch (ask-answer) command, sent once after wake:
//!           42 4D E1 00 00 01 70
//!     - read-request, sent once per cycle:
//!           42 4D E2 00 00 01 71
//!     - response: one 32-byte frame (see frame.rs)
//!
//! startup sequence (the sensor latches on these transitions, order matters):
//!     1. RESET low, hold RESET_HOLD, RESET high
//!     2. SET high, wait WAKE_SETTLE, send mode-switch, wait COMMAND_SETTLE
//!
//! relationships:
//!     - uses: hal.rs (DigitalOutput, SerialLink)
//!     - uses: clock.rs (timed waits)
//!     - used by: monitor.rs (read_frame each cycle), main.rs (startup/shutdown)
//!
//! ==============================================================================

use crate::clock::Clock;
use crate::error::TransportFault;
use crate::frame::{RawFrame, FRAME_LEN};
use crate::hal::{DigitalOutput, Level, Line, SerialLink};

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BAUD_RATE: u32 = 9600;
pub const DATA_BITS: u8 = 8;
pub const STOP_BITS: u8 = 1;
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// switch the sensor to ask-answer mode
pub const MODE_SWITCH: [u8; 7] = [0x42, 0x4D, 0xE1, 0x00, 0x00, 0x01, 0x70];
/// ask for one measurement frame
pub const READ_REQUEST: [u8; 7] = [0x42, 0x4D, 0xE2, 0x00, 0x00, 0x01, 0x71];

/// RESET held low this long power-cycles the sensor logic
pub const RESET_HOLD: Duration = Duration::from_secs(5);
/// SET high to first command (leaves dormant mode)
pub const WAKE_SETTLE: Duration = Duration::from_secs(1);
/// mode-switch to first read
pub const COMMAND_SETTLE: Duration = Duration::from_secs(1);

/// command/response channel to the sensor
///
/// the link sits behind a mutex and blocking i/o runs on the blocking pool,
/// one request at a time.
pub struct Transport<L: SerialLink> {
    link: Arc<Mutex<L>>,
    timeout: Duration,
}

impl<L: SerialLink> Transport<L> {
    pub fn new(link: L) -> Self {
        Self { link: Arc::new(Mutex::new(link)), timeout: READ_TIMEOUT }
    }

    /// write a 7-byte command frame verbatim
    pub async fn send_command(&self, command: &[u8; 7]) -> Result<(), TransportFault> {
        let command = *command;
        self.with_link(move |link| link.write_all(&command)).await
    }

    /// clear stale input, send a read-request and collect one full frame
    pub async fn read_frame(&self) -> Result<RawFrame, TransportFault> {
        let timeout = self.timeout;
        self.with_link(move |link| {
            link.clear_input()?;
            link.write_all(&READ_REQUEST)?;

            let mut buf = [0u8; FRAME_LEN];
            let received = link.read_timeout(&mut buf, timeout)?;
            RawFrame::from_slice(&buf[..received])
                .ok_or(TransportFault::ShortRead { expected: FRAME_LEN, received })
        })
        .await
    }

    // offload blocking io to dedicated thread
    async fn with_link<T, F>(&self, f: F) -> Result<T, TransportFault>
    where
        T: Send + 'static,
        F: FnOnce(&mut L) -> Result<T, TransportFault> + Send + 'static,
    {
        let link = Arc::clone(&self.link);
        tokio::task::spawn_blocking(move || {
            let mut guard = link
                .lock()
                .map_err(|_| TransportFault::Io("serial link lock poisoned".to_string()))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| TransportFault::Io(format!("task join error: {}", e)))?
    }
}

/// power-cycle the sensor, wake it and put it in ask-answer mode
pub async fn startup<O, L, C>(outputs: &mut O, transport: &Transport<L>, clock: &C) -> Result<()>
where
    O: DigitalOutput,
    L: SerialLink,
    C: Clock,
{
    tracing::info!("[SENSOR] Resetting sensor ({:?} hold)", RESET_HOLD);
    outputs.set_line(Line::Reset, Level::Low).context("failed to drive RESET low")?;
    clock.sleep(RESET_HOLD).await;
    outputs.set_line(Line::Reset, Level::High).context("failed to drive RESET high")?;

    tracing::info!("[SENSOR] Waking sensor and enabling ask-answer mode");
    outputs.set_line(Line::Set, Level::High).context("failed to drive SET high")?;
    clock.sleep(WAKE_SETTLE).await;
    transport
        .send_command(&MODE_SWITCH)
        .await
        .context("failed to send mode-switch command")?;
    clock.sleep(COMMAND_SETTLE).await;

    Ok(())
}

/// hold the sensor in reset. safe to call more than once.
pub fn shutdown<O: DigitalOutput>(outputs: &mut O) -> Result<()> {
    // RESET is written twice on the way out
    outputs.set_line(Line::Reset, Level::Low)?;
    outputs.set_line(Line::Reset, Level::Low)?;
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// replays canned responses, one per read-request, and logs writes
    #[derive(Default)]
    pub struct ScriptedLink {
        pub responses: VecDeque<Vec<u8>>,
        pub writes: Arc<Mutex<Vec<Vec<u8>>>>,
        pub clears: Arc<Mutex<usize>>,
        /// reject every write, as a disconnected port would
        pub fail_writes: bool,
        pending: Option<Vec<u8>>,
    }

    impl ScriptedLink {
        pub fn with_responses(responses: Vec<Vec<u8>>) -> Self {
            Self { responses: responses.into(), ..Default::default() }
        }

        pub fn failing() -> Self {
            Self { fail_writes: true, ..Default::default() }
        }
    }

    impl SerialLink for ScriptedLink {
        fn clear_input(&mut self) -> Result<(), TransportFault> {
            *self.clears.lock().unwrap() += 1;
            self.pending = None;
            Ok(())
        }

        fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportFault> {
            if self.fail_writes {
                return Err(TransportFault::Io("write failed".to_string()));
            }
            self.writes.lock().unwrap().push(bytes.to_vec());
            if bytes == READ_REQUEST.as_slice() {
                self.pending = self.responses.pop_front();
            }
            Ok(())
        }

        fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, TransportFault> {
            let data = self.pending.take().unwrap_or_default();
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            Ok(n)
        }
    }

    /// a full frame carrying the given concentrations
    pub fn frame_bytes(pm1: u16, pm2_5: u16, pm10: u16) -> Vec<u8> {
        let mut bytes = vec![0u8; FRAME_LEN];
        bytes[0] = 0x42;
        bytes[1] = 0x4D;
        bytes[4..6].copy_from_slice(&pm1.to_be_bytes());
        bytes[6..8].copy_from_slice(&pm2_5.to_be_bytes());
        bytes[8..10].copy_from_slice(&pm10.to_be_bytes());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::clock::testing::RecordingClock;
    use crate::frame::decode;
    use crate::hal::MockOutputs;

    #[tokio::test]
    async fn test_read_frame_clears_then_requests() {
        let link = ScriptedLink::with_responses(vec![frame_bytes(1, 2, 3)]);
        let writes = Arc::clone(&link.writes);
        let clears = Arc::clone(&link.clears);
        let transport = Transport::new(link);

        let frame = transport.read_frame().await.unwrap();
        let reading = decode(&frame);

        assert_eq!((reading.pm1, reading.pm2_5, reading.pm10), (1, 2, 3));
        assert_eq!(*clears.lock().unwrap(), 1);
        assert_eq!(writes.lock().unwrap().as_slice(), &[READ_REQUEST.to_vec()]);
    }

    #[tokio::test]
    async fn test_short_read_is_transport_fault() {
        let mut short = frame_bytes(1, 2, 3);
        short.truncate(20);
        let transport = Transport::new(ScriptedLink::with_responses(vec![short]));

        let err = transport.read_frame().await.unwrap_err();
        assert!(matches!(err, TransportFault::ShortRead { expected: 32, received: 20 }));
    }

    #[tokio::test]
    async fn test_silent_sensor_is_transport_fault() {
        let transport = Transport::new(ScriptedLink::default());
        let err = transport.read_frame().await.unwrap_err();
        assert!(matches!(err, TransportFault::ShortRead { received: 0, .. }));
    }

    #[tokio::test]
    async fn test_startup_sequence_order_and_delays() {
        let link = ScriptedLink::default();
        let writes = Arc::clone(&link.writes);
        let transport = Transport::new(link);
        let mut outputs = MockOutputs::default();
        let clock = RecordingClock::default();

        startup(&mut outputs, &transport, &clock).await.unwrap();

        assert_eq!(
            outputs.history(),
            &[
                (Line::Reset, Level::Low),
                (Line::Reset, Level::High),
                (Line::Set, Level::High),
            ]
        );
        assert_eq!(clock.recorded(), vec![RESET_HOLD, WAKE_SETTLE, COMMAND_SETTLE]);
        assert!(RESET_HOLD >= Duration::from_secs(5));
        assert!(WAKE_SETTLE >= Duration::from_secs(1));
        assert!(COMMAND_SETTLE >= Duration::from_secs(1));
        assert_eq!(writes.lock().unwrap().as_slice(), &[MODE_SWITCH.to_vec()]);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut outputs = MockOutputs::default();
        shutdown(&mut outputs).unwrap();
        shutdown(&mut outputs).unwrap();
        assert_eq!(outputs.level(Line::Reset), Some(Level::Low));
        assert!(outputs.history().iter().all(|&step| step == (Line::Reset, Level::Low)));
    }
}
