//! ==============================================================================
//! connectivity.rs - wait for the network before talking to telemetry
//! ==============================================================================
//!
//! purpose:
//!     the monitor treats the network as a prerequisite: before every cycle
//!     it blocks until a probe request succeeds. there is no give-up path.
//!
//! policy:
//!     each attempt is cut off after `attempt_timeout`. failed attempts are
//!     followed by an exponential backoff starting at `initial_backoff`,
//!     doubling, capped at `max_backoff`.
//!
//! ==============================================================================

use crate::clock::Clock;
use crate::error::ConnectivityFault;

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self) -> Result<(), ConnectivityFault>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempt_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// delay after the given failed attempt (1-based)
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed_attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// block until `probe` succeeds; returns the number of attempts it took
pub async fn wait_until_online<P, C>(probe: &P, policy: &RetryPolicy, clock: &C) -> u32
where
    P: ConnectivityProbe + ?Sized,
    C: Clock + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        attempt = attempt.saturating_add(1);
        let result = match tokio::time::timeout(policy.attempt_timeout, probe.probe()).await {
            Ok(result) => result,
            Err(_) => Err(ConnectivityFault::Timeout(policy.attempt_timeout)),
        };

        match result {
            Ok(()) => {
                if attempt > 1 {
                    tracing::info!("[NET] Connectivity restored after {} attempts", attempt);
                }
                return attempt;
            }
            Err(e) => {
                let delay = policy.backoff(attempt);
                if attempt == 1 {
                    tracing::warn!("[NET] Network unreachable ({}), waiting...", e);
                } else {
                    tracing::debug!("[NET] Attempt {} failed: {} (retry in {:?})", attempt, e, delay);
                }
                clock.sleep(delay).await;
            }
        }
    }
}

/// plain http GET; any response at all means the network is up
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, attempt_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(attempt_timeout).build()?;
        Ok(Self { client, url: url.into(), timeout: attempt_timeout })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn probe(&self) -> Result<(), ConnectivityFault> {
        match self.client.get(&self.url).send().await {
            Ok(_) => Ok(()),
            Err(e) if e.is_timeout() => Err(ConnectivityFault::Timeout(self.timeout)),
            Err(e) => Err(ConnectivityFault::Unreachable(e.to_string())),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// fails the first `failures` probes, then succeeds
    #[derive(Default)]
    pub struct FlakyProbe {
        pub failures: u32,
        pub calls: AtomicU32,
    }

    impl FlakyProbe {
        pub fn new(failures: u32) -> Self {
            Self { failures, calls: AtomicU32::new(0) }
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConnectivityProbe for FlakyProbe {
        async fn probe(&self) -> Result<(), ConnectivityFault> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ConnectivityFault::Unreachable("no route to host".to_string()))
            } else {
                Ok(())
            }
        }
    }
}
