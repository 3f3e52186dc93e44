//! Stream socket server for the Trackstream service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Stream socket** (`/`, alias `/ws`): clients handshake once, then
//!   receive every broadcast `featureResult` page
//! - **Status endpoint** (`/status`): connection counts and run statistics
//!
//! # Architecture
//!
//! Each socket runs a [`Session`](session::Session) wrapping the
//! [`ConnectionProtocol`] state machine. Sessions register with the
//! [`ConnectionHub`], which fans broadcasts out to ready clients and skips
//! any client whose unwritten bytes are at or above the configured ceiling.
//! The ticker never waits on a socket.

pub mod error;
pub mod handlers;
pub mod hub;
pub mod protocol;
pub mod router;
pub mod server;
pub mod session;
pub mod startup;
pub mod state;
pub mod ws;

pub use error::ProtocolError;
pub use hub::{BroadcastReport, ConnectionHub};
pub use protocol::{ConnectionProtocol, Phase, ProtocolAction};
pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use startup::{StartupError, spawn_server};
pub use state::AppState;
