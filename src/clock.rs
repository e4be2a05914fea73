//! ==============================================================================
//! clock.rs - injectable sleep
//! ==============================================================================
//!
//! purpose:
//!     timed waits behind a trait so the wake sequence and connectivity
//!     backoff can be tested without sleeping.
//!
//! relationships:
//!     - used by: sensor.rs (startup delays), connectivity.rs (backoff)
//!
//! ==============================================================================

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// real clock backed by tokio::time
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
