//! Shared application state for the stream server.

use std::sync::Arc;

use trackstream_core::{StreamControl, StreamStatus};

use crate::hub::ConnectionHub;

/// Shared state injected into every handler via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live sessions and the broadcast fan-out.
    pub hub: Arc<ConnectionHub>,
    /// Stop flag and run statistics.
    pub control: Arc<StreamControl>,
}

impl AppState {
    /// Create state with an empty hub.
    pub fn new(max_buffered_bytes: usize, control: Arc<StreamControl>) -> Self {
        Self {
            hub: Arc::new(ConnectionHub::new(max_buffered_bytes)),
            control,
        }
    }

    /// Point-in-time status document.
    pub fn status(&self) -> StreamStatus {
        StreamStatus {
            connections: self.hub.connection_count(),
            ready: self.hub.ready_count(),
            ticks_broadcast: self.control.ticks_broadcast(),
            elapsed_seconds: self.control.elapsed_seconds(),
            broadcast_interval_ms: self.control.broadcast_interval_ms(),
            stopping: self.control.is_stop_requested(),
            started_at: self.control.started_at().to_rfc3339(),
        }
    }
}
