//! Broadcast sink that fans each tick's page out through the hub.

use std::sync::Arc;

use trackstream_core::{BroadcastSink, TickOutput};
use trackstream_server::ConnectionHub;
use tracing::debug;

/// Bridges the ticker to connected sockets.
pub struct HubSink {
    hub: Arc<ConnectionHub>,
}

impl HubSink {
    /// Create a sink delivering into `hub`.
    pub const fn new(hub: Arc<ConnectionHub>) -> Self {
        Self { hub }
    }
}

impl BroadcastSink for HubSink {
    fn deliver(&mut self, output: &TickOutput) {
        let report = self.hub.broadcast(output.payload.clone());
        debug!(
            page = output.page,
            delivered = report.delivered,
            skipped_backpressure = report.skipped_backpressure,
            not_ready = report.not_ready,
            "Page broadcast"
        );
    }
}

#[cfg(test)]
mod tests {
    use trackstream_server::hub::Outbound;

    use super::*;

    #[test]
    fn delivers_payload_to_ready_clients() {
        let hub = Arc::new(ConnectionHub::new(1024));
        let mut ready = hub.register();
        hub.mark_ready(ready.id);
        let mut waiting = hub.register();

        let mut sink = HubSink::new(Arc::clone(&hub));
        sink.deliver(&TickOutput {
            page: 1,
            advance: None,
            payload: String::from(r#"{"type":"featureResult","features":[]}"#),
        });

        assert!(matches!(
            ready.rx.try_recv(),
            Ok(Outbound::Text(text)) if text.as_str().starts_with(r#"{"type":"featureResult""#)
        ));
        assert!(waiting.rx.try_recv().is_err());
    }
}
