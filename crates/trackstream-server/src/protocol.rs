//! Per-connection protocol state machine.
//!
//! ```text
//! Connected --valid handshake--> Ready --close/error--> (removed)
//!     |                            |
//!     +--anything else--> close    +--bad command / binary--> close
//! ```
//!
//! The machine is synchronous and transport-free: it consumes a frame and
//! returns what the session should do. The session owns the socket and
//! the hub registration.

use trackstream_types::{
    ClientCommand, HandshakeRequest, HandshakeResponse, SUPPORTED_WKID,
};

use crate::error::ProtocolError;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Socket open, handshake not yet completed.
    Connected,
    /// Handshake completed; eligible for broadcasts.
    Ready,
}

/// What the session must do after a frame.
#[derive(Debug)]
pub enum ProtocolAction {
    /// Handshake accepted: send this reply and admit the client to broadcasts.
    Accept(String),
    /// Send this reply.
    Reply(String),
    /// Close the connection.
    Close(ProtocolError),
}

/// State machine for one client connection.
#[derive(Debug, Clone)]
pub struct ConnectionProtocol {
    phase: Phase,
}

impl ConnectionProtocol {
    /// A freshly connected socket.
    pub const fn new() -> Self {
        Self {
            phase: Phase::Connected,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the handshake has completed.
    pub const fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready)
    }

    /// Handle a text frame.
    pub fn on_text(&mut self, text: &str) -> ProtocolAction {
        let result = match self.phase {
            Phase::Connected => self.handshake(text),
            Phase::Ready => command(text),
        };
        result.unwrap_or_else(ProtocolAction::Close)
    }

    /// Handle a binary frame. Only text is spoken, in every phase.
    pub const fn on_binary(&self) -> ProtocolAction {
        ProtocolAction::Close(ProtocolError::NonText)
    }

    fn handshake(&mut self, text: &str) -> Result<ProtocolAction, ProtocolError> {
        let request: HandshakeRequest =
            serde_json::from_str(text).map_err(ProtocolError::MalformedHandshake)?;
        let wkid = request.spatial_reference.wkid;
        if wkid != SUPPORTED_WKID {
            return Err(ProtocolError::UnsupportedSpatialReference(wkid));
        }
        let reply = serde_json::to_string(&HandshakeResponse::accept(&request))
            .map_err(ProtocolError::Reply)?;
        self.phase = Phase::Ready;
        Ok(ProtocolAction::Accept(reply))
    }
}

impl Default for ConnectionProtocol {
    fn default() -> Self {
        Self::new()
    }
}

fn command(text: &str) -> Result<ProtocolAction, ProtocolError> {
    let command = ClientCommand::parse(text)?;
    let reply = serde_json::to_string(command.reply()).map_err(ProtocolError::Reply)?;
    Ok(ProtocolAction::Reply(reply))
}
