//! Error types for the stream connection protocol.
//!
//! Every [`ProtocolError`] ends the connection it occurred on. The
//! protocol has no soft error reply: the client sees the socket close.

use trackstream_types::CommandError;

/// Reasons a connection is closed by the server.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The first message was not a valid handshake.
    #[error("malformed handshake: {0}")]
    MalformedHandshake(serde_json::Error),

    /// The handshake asked for a spatial reference the service cannot serve.
    #[error("unsupported spatial reference wkid {0}")]
    UnsupportedSpatialReference(u32),

    /// A post-handshake message was not a recognised command.
    #[error("bad command: {0}")]
    Command(#[from] CommandError),

    /// The client sent a binary frame.
    #[error("non-text payload")]
    NonText,

    /// A reply could not be serialized.
    #[error("reply serialization failed: {0}")]
    Reply(serde_json::Error),
}
