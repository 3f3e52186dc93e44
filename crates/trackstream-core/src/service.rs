//! Per-tick composition of cursor, simulator, and encoder.
//!
//! [`StreamService`] is the single owner of all mutable simulation state.
//! The ticker calls [`StreamService::next_tick`] once per interval; within
//! a call the advance (when due) always completes before the page is
//! encoded.

use tracing::debug;
use trackstream_types::PathNetwork;

use crate::config::StreamConfig;
use crate::cursor::DeliveryCursor;
use crate::encoder::{EncodeError, ObservationEncoder};
use crate::simulator::{AdvanceOutcome, Observation, PositionSimulator};

/// Everything produced by one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutput {
    /// Page that was encoded.
    pub page: u32,
    /// Result of the advance pass, when this tick triggered one.
    pub advance: Option<AdvanceOutcome>,
    /// Serialized `featureResult` message.
    pub payload: String,
}

/// Owns the path network and all per-asset state for a run.
#[derive(Debug, Clone)]
pub struct StreamService {
    config: StreamConfig,
    network: PathNetwork,
    simulator: PositionSimulator,
    cursor: DeliveryCursor,
    encoder: ObservationEncoder,
}

impl StreamService {
    /// Seed a new service on `network`.
    pub fn new(config: StreamConfig, network: PathNetwork) -> Self {
        let simulator = PositionSimulator::new(&config);
        Self::with_simulator(config, network, simulator)
    }

    /// Seed a new service using a caller-supplied (unseeded) simulator.
    pub fn with_simulator(
        config: StreamConfig,
        network: PathNetwork,
        mut simulator: PositionSimulator,
    ) -> Self {
        simulator.seed(&network, &config);
        let cursor = DeliveryCursor::new(&config);
        let encoder = ObservationEncoder::new(&config);
        Self {
            config,
            network,
            simulator,
            cursor,
            encoder,
        }
    }

    /// Produce the next page, advancing the simulation first when the
    /// cursor wraps to page 0.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the page cannot be serialized. The
    /// cursor and simulation state have still moved on.
    pub fn next_tick(&mut self) -> Result<TickOutput, EncodeError> {
        let page = self.cursor.next_page();
        let advance = DeliveryCursor::is_advance_page(page).then(|| {
            let outcome = self.simulator.advance(&self.network);
            if let Some(slot) = outcome.aborted_at {
                debug!(slot, advanced = outcome.advanced, "Advance pass stopped at unresolved path");
            }
            outcome
        });
        let payload = self
            .encoder
            .encode_page(self.simulator.observations(), &self.cursor, page)?;
        Ok(TickOutput {
            page,
            advance,
            payload,
        })
    }

    /// The run's stream configuration.
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Current observations in slot order.
    pub fn observations(&self) -> &[Observation] {
        self.simulator.observations()
    }

    /// Number of asset slots produced by seeding.
    pub fn slot_count(&self) -> usize {
        self.simulator.slot_count()
    }

    /// Pages per full cycle.
    pub const fn pages_per_cycle(&self) -> u32 {
        self.cursor.max_page()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use trackstream_types::{NetworkFeature, Vertex};

    use super::*;

    fn network() -> PathNetwork {
        let path: Vec<Vertex> = (0..10)
            .map(|i| Vertex::new(f64::from(i) * 100.0, 0.0))
            .collect();
        PathNetwork::new(vec![NetworkFeature::from_paths(vec![path])])
    }

    fn feature_count(payload: &str) -> usize {
        let value: serde_json::Value = serde_json::from_str(payload).unwrap();
        value["features"].as_array().unwrap().len()
    }

    #[test]
    fn advances_once_per_full_page_cycle() {
        // 10 vertices / 6 assets -> stride 1.67 -> 6 slots; 3 pages of 2.
        let config = StreamConfig {
            tracked_assets: 6,
            page_size: 2,
            ..StreamConfig::default()
        };
        let mut service = StreamService::new(config, network());
        assert_eq!(service.pages_per_cycle(), 3);

        let ticks: Vec<TickOutput> = (0..6).map(|_| service.next_tick().unwrap()).collect();
        let pages: Vec<u32> = ticks.iter().map(|t| t.page).collect();
        let advanced: Vec<bool> = ticks.iter().map(|t| t.advance.is_some()).collect();

        assert_eq!(pages, vec![1, 2, 0, 1, 2, 0]);
        assert_eq!(advanced, vec![false, false, true, false, false, true]);
        assert!(ticks.iter().all(|t| feature_count(&t.payload) == 2));
    }

    #[test]
    fn page_zero_reflects_the_advance_of_the_same_tick() {
        let config = StreamConfig {
            tracked_assets: 2,
            page_size: 2,
            ..StreamConfig::default()
        };
        let mut service = StreamService::new(config, network());
        let before: Vec<u32> = service.observations().iter().map(|o| o.object_id.0).collect();

        let tick = service.next_tick().unwrap();
        assert_eq!(tick.page, 0);
        assert!(tick.advance.is_some());
        let after: Vec<u32> = service.observations().iter().map(|o| o.object_id.0).collect();
        assert_ne!(before, after);

        let payload = tick.payload;
        for id in after {
            assert!(payload.contains(&format!("\"OBJECTID\":{id}")), "{payload}");
        }
    }
}
