//! Suspension points for polling and backoff waits.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Something that can wait for a duration.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl<T: Sleeper + ?Sized> Sleeper for std::sync::Arc<T> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

/// Waits on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately and remembers every requested wait.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All waits requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits
            .lock()
            .map(|w| w.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Total simulated time.
    pub fn total(&self) -> Duration {
        self.waits().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        match self.waits.lock() {
            Ok(mut waits) => waits.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
    }
}
