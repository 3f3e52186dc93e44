//! Fixed-interval broadcast loop.
//!
//! [`run_ticker`] drives a [`StreamService`] from a single task: once per
//! interval it produces the next page and hands it to a
//! [`BroadcastSink`]. A tick that overruns its period makes the next one
//! late; ticks never overlap and are never skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::control::StreamControl;
use crate::service::{StreamService, TickOutput};

/// Receives each tick's output.
///
/// Implementations forward the payload to connected clients. `deliver`
/// runs on the ticker task and must not block.
pub trait BroadcastSink: Send {
    /// Called once per tick with the freshly encoded page.
    fn deliver(&mut self, output: &TickOutput);
}

/// A sink that drops every page, for running the simulation headless.
pub struct NullSink;

impl BroadcastSink for NullSink {
    fn deliver(&mut self, _output: &TickOutput) {}
}

/// Summary of a completed ticker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerResult {
    /// Ticks that produced a page.
    pub ticks: u64,
    /// Ticks whose page failed to encode.
    pub encode_failures: u64,
}

/// Run the broadcast loop until `control` requests a stop.
///
/// # Arguments
///
/// * `service` - Simulation state, owned exclusively by this loop
/// * `control` - Shared stop flag and tick counter
/// * `sink` - Receives each tick's page
pub async fn run_ticker(
    service: &mut StreamService,
    control: &Arc<StreamControl>,
    sink: &mut dyn BroadcastSink,
) -> TickerResult {
    let period = Duration::from_millis(control.broadcast_interval_ms().max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut result = TickerResult {
        ticks: 0,
        encode_failures: 0,
    };

    info!(
        interval_ms = control.broadcast_interval_ms(),
        slots = service.slot_count(),
        tracked_assets = service.config().tracked_assets,
        pages_per_cycle = service.pages_per_cycle(),
        "Ticker starting"
    );

    loop {
        tokio::select! {
            biased;
            () = control.stopped() => {
                info!(ticks = result.ticks, "Ticker stop requested");
                return result;
            }
            _ = interval.tick() => {}
        }

        match service.next_tick() {
            Ok(output) => {
                sink.deliver(&output);
                result.ticks = control.record_tick();
                debug!(
                    tick = result.ticks,
                    page = output.page,
                    advanced = output.advance.map(|a| a.advanced),
                    bytes = output.payload.len(),
                    "Tick complete"
                );
            }
            Err(e) => {
                result.encode_failures = result.encode_failures.saturating_add(1);
                warn!(error = %e, "Failed to encode page, skipping broadcast");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use trackstream_types::{NetworkFeature, PathNetwork, Vertex};

    use super::*;
    use crate::config::StreamConfig;

    struct RecordingSink {
        pages: Vec<u32>,
        stop_after: usize,
        control: Arc<StreamControl>,
    }

    impl BroadcastSink for RecordingSink {
        fn deliver(&mut self, output: &TickOutput) {
            self.pages.push(output.page);
            if self.pages.len() >= self.stop_after {
                self.control.request_stop();
            }
        }
    }

    fn service() -> StreamService {
        let path: Vec<Vertex> = (0..20).map(|i| Vertex::new(f64::from(i), 0.0)).collect();
        let config = StreamConfig {
            tracked_assets: 9,
            page_size: 3,
            broadcast_interval_ms: 10,
            ..StreamConfig::default()
        };
        StreamService::new(
            config,
            PathNetwork::new(vec![NetworkFeature::from_paths(vec![path])]),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_pages_in_cursor_order_until_stopped() {
        let mut service = service();
        let control = Arc::new(StreamControl::new(10));
        let mut sink = RecordingSink {
            pages: Vec::new(),
            stop_after: 5,
            control: Arc::clone(&control),
        };

        let result = run_ticker(&mut service, &control, &mut sink).await;

        assert_eq!(sink.pages, vec![1, 2, 0, 1, 2]);
        assert_eq!(result.ticks, 5);
        assert_eq!(result.encode_failures, 0);
        assert_eq!(control.ticks_broadcast(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_when_already_stopped() {
        let mut service = service();
        let control = Arc::new(StreamControl::new(10));
        control.request_stop();

        let result = run_ticker(&mut service, &control, &mut NullSink).await;
        assert_eq!(result.ticks, 0);
    }
}
