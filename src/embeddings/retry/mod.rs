
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::{Result, TestGenError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_WAIT: Duration = Duration::from_secs(4);

/// Bounded attempts with exponential backoff between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_wait: Duration,
}

/// Per-attempt bookkeeping, alive only while one chunk is being embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Zero-based attempt index
    pub attempt: u32,
    /// Wait applied if this attempt fails and another one follows
    pub wait: Duration,
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_wait: DEFAULT_BASE_WAIT,
        }
    }
}

impl RetryPolicy {
    #[inline]
    pub fn new(max_attempts: u32, base_wait: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(TestGenError::InvalidInput(
                "max_retries must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            base_wait,
        })
    }

    #[inline]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[inline]
    pub const fn base_wait(&self) -> Duration {
        self.base_wait
    }

    /// `base_wait * 2^attempt`, saturating instead of overflowing
    #[inline]
    pub fn wait_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_wait.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    #[inline]
    pub fn state(&self, attempt: u32) -> RetryState {
        RetryState {
            attempt,
            wait: self.wait_for(attempt),
        }
    }

    /// Run `operation` until it succeeds or attempts run out.
    ///
    /// `sleep` is called between attempts only, so `max_attempts` attempts
    /// produce `max_attempts - 1` waits. The error of the final attempt is
    /// returned inside [`TestGenError::EmbeddingGeneration`].
    #[inline]
    pub fn run<T, F, S>(&self, mut operation: F, mut sleep: S) -> Result<T>
    where
        F: FnMut(RetryState) -> anyhow::Result<T>,
        S: FnMut(Duration),
    {
        let mut attempt = 0;

        loop {
            let state = self.state(attempt);
            debug!("Attempt {}/{}", attempt + 1, self.max_attempts);

            match operation(state) {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(value);
                }
                Err(e) if attempt + 1 < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} failed: {:#}",
                        attempt + 1,
                        self.max_attempts,
                        e
                    );
                    debug!("Waiting {:?} before retry", state.wait);
                    sleep(state.wait);
                    attempt += 1;
                }
                Err(e) => {
                    error!("All {} attempts failed", self.max_attempts);
                    return Err(TestGenError::EmbeddingGeneration {
                        attempts: self.max_attempts,
                        source: e,
                    });
                }
            }
        }
    }
}
