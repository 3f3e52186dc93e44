//! Shared type definitions for the Trackstream feature streaming service.
//!
//! This crate is the single source of truth for the shapes that cross
//! crate and process boundaries: the input path network, the JSON wire
//! messages, and the identifier newtypes.
//!
//! # Modules
//!
//! - [`ids`] -- Numeric identifier newtypes and the `OBJECTID` counter
//! - [`network`] -- Path network decoded from the upstream feature service
//! - [`wire`] -- Handshake, broadcast, and client command messages

pub mod ids;
pub mod network;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use ids::{ConnectionId, MAX_OBJECT_ID, ObjectId, ObjectIdCounter, TrackId};
pub use network::{NetworkFeature, Path, PathNetwork, Polyline, Vertex, VertexError};
pub use wire::{
    ClientCommand, CommandError, FeatureAttributes, FeatureResult, HandshakeRequest,
    HandshakeResponse, PointFeature, PointGeometry, PolygonFeature, PolygonGeometry,
    SUPPORTED_WKID, SpatialReference, StreamFeature, WireFormat,
};
