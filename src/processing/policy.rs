/*!
 * Retry and pacing policies.
 *
 * `RetryPolicy` bounds the attempts made against one provider and the pause
 * between them. `RateWindow` is the minimum gap between independent
 * dispatches (between chunks of a document and between documents).
 * Both pauses go through the `Pacer` trait so tests can observe them
 * without actually waiting.
 */

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Bounded retry policy applied to each provider in turn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Attempts made against a single provider before moving on
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause before each retry of the same provider
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Minimum delay between successive independent dispatches
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateWindow {
    delay: Duration,
}

impl RateWindow {
    /// `60 / requests_per_minute` seconds; zero disables pacing
    pub fn from_requests_per_minute(requests_per_minute: u32) -> Self {
        if requests_per_minute == 0 {
            return Self::none();
        }
        Self {
            delay: Duration::from_secs_f64(60.0 / f64::from(requests_per_minute)),
        }
    }

    /// A window with a fixed delay
    pub fn from_delay(delay: Duration) -> Self {
        Self { delay }
    }

    /// No pacing at all
    pub fn none() -> Self {
        Self { delay: Duration::ZERO }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Why a pause is taken; lets tests tell retry pauses from rate pauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Between attempts on the same provider
    Retry,
    /// Between independent dispatches
    RateWindow,
}

/// Something that can suspend the calling flow for a while
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait for `duration` before the flow continues
    async fn pause(&self, duration: Duration, reason: PauseReason);
}

/// Pacer backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration, _reason: PauseReason) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Pacer that records every pause and returns immediately
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<(Duration, PauseReason)>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All pauses requested so far, in order
    pub fn pauses(&self) -> Vec<(Duration, PauseReason)> {
        self.pauses.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of pauses taken for the given reason
    pub fn count(&self, reason: PauseReason) -> usize {
        self.pauses().iter().filter(|(_, r)| *r == reason).count()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration, reason: PauseReason) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push((duration, reason));
        }
    }
}
