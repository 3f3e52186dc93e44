//! Shared run control for the ticker and the server.
//!
//! [`StreamControl`] is wrapped in [`Arc`](std::sync::Arc) and shared
//! between the ticker task, the HTTP server (graceful shutdown and the
//! status endpoint), and the operator input task. All fields are atomics
//! so reads on the tick path never take a lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Stop flag, tick counter, and start time for one service run.
#[derive(Debug)]
pub struct StreamControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes every task waiting in [`stopped`](Self::stopped).
    stop_notify: Notify,

    /// Broadcast ticks completed so far.
    ticks: AtomicU64,

    /// Configured broadcast interval in milliseconds.
    broadcast_interval_ms: u64,

    /// Wall-clock time when the run started.
    started_at: DateTime<Utc>,
}

impl StreamControl {
    /// Create control state for a run broadcasting every `broadcast_interval_ms`.
    pub fn new(broadcast_interval_ms: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            ticks: AtomicU64::new(0),
            broadcast_interval_ms,
            started_at: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a stop and wake every waiter.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wait until a stop is requested. Returns immediately if one already was.
    pub async fn stopped(&self) {
        loop {
            let notified = self.stop_notify.notified();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    /// Count one completed broadcast tick and return the new total.
    pub fn record_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    /// Broadcast ticks completed so far.
    pub fn ticks_broadcast(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Configured broadcast interval in milliseconds.
    pub const fn broadcast_interval_ms(&self) -> u64 {
        self.broadcast_interval_ms
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since the run started.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}

/// JSON-serializable run status for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    /// Open socket sessions.
    pub connections: usize,
    /// Sessions that completed the handshake.
    pub ready: usize,
    /// Broadcast ticks completed.
    pub ticks_broadcast: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured broadcast interval in milliseconds.
    pub broadcast_interval_ms: u64,
    /// Whether a stop has been requested.
    pub stopping: bool,
    /// ISO 8601 timestamp of when the run started.
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn initial_state_is_running() {
        let control = StreamControl::new(200);
        assert!(!control.is_stop_requested());
        assert_eq!(control.ticks_broadcast(), 0);
        assert_eq!(control.broadcast_interval_ms(), 200);
    }

    #[test]
    fn record_tick_counts_up() {
        let control = StreamControl::new(200);
        assert_eq!(control.record_tick(), 1);
        assert_eq!(control.record_tick(), 2);
        assert_eq!(control.ticks_broadcast(), 2);
    }

    #[tokio::test]
    async fn stopped_returns_immediately_after_stop() {
        let control = StreamControl::new(200);
        control.request_stop();
        let waited = tokio::time::timeout(Duration::from_secs(1), control.stopped()).await;
        assert!(waited.is_ok());
    }

    #[tokio::test]
    async fn stop_wakes_every_waiter() {
        let control = Arc::new(StreamControl::new(200));
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let control = Arc::clone(&control);
                tokio::spawn(async move { control.stopped().await })
            })
            .collect();

        tokio::task::yield_now().await;
        control.request_stop();

        for waiter in waiters {
            let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
            assert!(matches!(joined, Ok(Ok(()))));
        }
    }
}
