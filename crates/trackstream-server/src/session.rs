//! One socket session: the protocol state machine bound to a hub entry.
//!
//! A [`Session`] is driven by the socket reader. Replies and the close
//! request go through the hub into the session's outbound queue, which
//! [`pump_outbound`] writes to the socket on a separate task. Dropping
//! the session removes it from the hub.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use tracing::{debug, info};
use trackstream_types::ConnectionId;

use crate::hub::{ClientChannel, ConnectionHub, Outbound};
use crate::protocol::{ConnectionProtocol, ProtocolAction};

/// Whether the reader should keep going after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next frame.
    Continue,
    /// Stop reading; the session is over.
    Close,
}

/// Reader-side state for one connection.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    hub: Arc<ConnectionHub>,
    protocol: ConnectionProtocol,
}

impl Session {
    /// Register a new connection with `hub`.
    ///
    /// Returns the session and the outbound channel its writer drains.
    pub fn open(hub: Arc<ConnectionHub>) -> (Self, ClientChannel) {
        let channel = hub.register();
        let session = Self {
            id: channel.id,
            hub,
            protocol: ConnectionProtocol::new(),
        };
        (session, channel)
    }

    /// This session's hub identity.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the handshake has completed.
    pub const fn is_ready(&self) -> bool {
        self.protocol.is_ready()
    }

    /// Handle one inbound frame.
    pub fn on_message(&mut self, message: Message) -> Flow {
        match message {
            Message::Text(text) => {
                let action = self.protocol.on_text(text.as_str());
                self.apply(action)
            }
            Message::Binary(_) => {
                let action = self.protocol.on_binary();
                self.apply(action)
            }
            Message::Ping(_) | Message::Pong(_) => Flow::Continue,
            Message::Close(_) => {
                debug!(connection = %self.id, "Client sent close frame");
                Flow::Close
            }
        }
    }

    /// Ask the writer to close the socket, e.g. on shutdown.
    pub fn close(&self) {
        self.hub.close(self.id);
    }

    fn apply(&self, action: ProtocolAction) -> Flow {
        match action {
            ProtocolAction::Accept(reply) => {
                self.hub.send_to(self.id, reply);
                self.hub.mark_ready(self.id);
                info!(connection = %self.id, "Handshake accepted");
                Flow::Continue
            }
            ProtocolAction::Reply(reply) => {
                self.hub.send_to(self.id, reply);
                Flow::Continue
            }
            ProtocolAction::Close(reason) => {
                info!(connection = %self.id, %reason, "Closing connection");
                self.hub.close(self.id);
                Flow::Close
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.hub.remove(self.id);
    }
}

/// Write a session's outbound frames to `sink` until the queue ends,
/// a close is requested, or a write fails.
///
/// The byte count shared with the hub is decremented after each text
/// frame, whether or not the write succeeded.
pub async fn pump_outbound<S>(mut channel: ClientChannel, mut sink: S)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = channel.rx.recv().await {
        match frame {
            Outbound::Text(text) => {
                let len = text.as_str().len();
                let sent = sink.send(Message::Text(text)).await;
                channel.mark_written(len);
                if let Err(e) = sent {
                    debug!(connection = %channel.id, "WebSocket send failed: {e}");
                    return;
                }
            }
            Outbound::Close => {
                if let Err(e) = sink.send(Message::Close(None)).await {
                    debug!(connection = %channel.id, "WebSocket close failed: {e}");
                }
                return;
            }
        }
    }
    if let Err(e) = sink.close().await {
        debug!(connection = %channel.id, "WebSocket close failed: {e}");
    }
}
