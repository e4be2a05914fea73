//! ==============================================================================
//! frame.rs - sensor response frame and decoder
//! ==============================================================================
//!
//! purpose:
//!     the sensor answers a read-request with a fixed 32-byte frame.
//!     this module owns the frame type and pulls the three mass
//!     concentrations out of it.
//!
//! layout (offsets into the frame, big-endian u16):
//!     0-1   header 0x42 0x4D
//!     2-3   frame length
//!     4-5   PM1.0
//!     6-7   PM2.5
//!     8-9   PM10
//!     ...   remaining fields and checksum (not used)
//!
//! no checksum validation is done. the only structural guarantee is length,
//! which RawFrame enforces at construction.
//!
//! ==============================================================================

use crate::domain::Reading;

/// size of a sensor response in bytes
pub const FRAME_LEN: usize = 32;

const PM1_OFFSET: usize = 4;
const PM2_5_OFFSET: usize = 6;
const PM10_OFFSET: usize = 8;

/// a complete response frame
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawFrame([u8; FRAME_LEN]);

impl RawFrame {
    pub fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// returns None unless `bytes` is exactly one frame long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; FRAME_LEN] = bytes.try_into().ok()?;
        Some(Self::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    fn be_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.0[offset], self.0[offset + 1]])
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawFrame({})", hex::encode(self.0))
    }
}

/// extract PM1.0 / PM2.5 / PM10 from a frame
pub fn decode(frame: &RawFrame) -> Reading {
    tracing::debug!("[FRAME] {}", hex::encode(frame.as_bytes()));
    Reading {
        pm1: frame.be_u16(PM1_OFFSET),
        pm2_5: frame.be_u16(PM2_5_OFFSET),
        pm10: frame.be_u16(PM10_OFFSET),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> RawFrame {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..4].copy_from_slice(&[0x42, 0x4D, 0x00, 0x1C]);
        bytes[4..10].copy_from_slice(&[0x00, 0x0C, 0x00, 0x1E, 0x01, 0x2C]);
        // trailing fields should be ignored
        bytes[10..].fill(0xFF);
        RawFrame::new(bytes)
    }

    #[test]
    fn test_decode_known_frame() {
        let reading = decode(&sample_frame());
        assert_eq!(reading, Reading { pm1: 12, pm2_5: 30, pm10: 300 });
    }

    #[test]
    fn test_decode_is_big_endian() {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[6] = 0x12;
        bytes[7] = 0x34;
        let reading = decode(&RawFrame::new(bytes));
        assert_eq!(reading.pm2_5, 0x1234);
        assert_eq!(reading.pm1, 0);
        assert_eq!(reading.pm10, 0);
    }

    #[test]
    fn test_short_slice_is_not_a_frame() {
        assert!(RawFrame::from_slice(&[0x42, 0x4D]).is_none());
        assert!(RawFrame::from_slice(&[0u8; FRAME_LEN - 1]).is_none());
        assert!(RawFrame::from_slice(&[0u8; FRAME_LEN + 1]).is_none());
        assert!(RawFrame::from_slice(&[0u8; FRAME_LEN]).is_some());
    }

    #[test]
    fn test_debug_shows_hex() {
        let text = format!("{:?}", sample_frame());
        assert!(text.starts_with("RawFrame(424d001c000c001e012c"));
    }
}
