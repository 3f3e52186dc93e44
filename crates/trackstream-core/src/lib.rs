//! Simulation core for the Trackstream feature streaming service.
//!
//! Deterministically moves a population of synthetic assets along a
//! fixed path network and encodes their positions, one page at a time,
//! as `featureResult` messages.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with defaults and validation
//! - [`simulator`] -- Asset placement, interpolation, and advancing
//! - [`cursor`] -- Page cursor that also paces the simulation
//! - [`encoder`] -- Point / extruded-polygon page encoding
//! - [`service`] -- Per-tick composition of the above
//! - [`control`] -- Shared stop flag and run statistics
//! - [`ticker`] -- Fixed-interval broadcast loop

pub mod config;
pub mod control;
pub mod cursor;
pub mod encoder;
pub mod service;
pub mod simulator;
pub mod ticker;

pub use config::{ConfigError, StreamConfig, TrackstreamConfig};
pub use control::{StreamControl, StreamStatus};
pub use cursor::DeliveryCursor;
pub use encoder::{EXTRUDE_HALF_WIDTH, EncodeError, ObservationEncoder};
pub use service::{StreamService, TickOutput};
pub use simulator::{AdvanceOutcome, Observation, PlacementRecord, PositionSimulator};
pub use ticker::{BroadcastSink, NullSink, TickerResult, run_ticker};
