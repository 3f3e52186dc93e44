//! Input path network consumed by the simulator.
//!
//! The network is the JSON body returned by a feature-service polyline
//! query:
//!
//! ```json
//! { "features": [ { "attributes": {...}, "geometry": { "paths": [[[x, y], ...], ...] } } ] }
//! ```
//!
//! It is loaded once at startup and treated as read-only afterwards, so
//! `(feature, path, vertex)` indices into it stay valid for the process
//! lifetime.

use serde::{Deserialize, Serialize};

/// A 2D vertex. Any extra ordinates (z, m) in the source are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Vertex {
    /// Easting / longitude.
    pub x: f64,
    /// Northing / latitude.
    pub y: f64,
}

impl Vertex {
    /// Create a vertex from its coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation between `self` and `next` at `fraction`.
    ///
    /// Computed as `x0 + (x1 - x0) * fraction` with separate rounding, so
    /// results match clients doing the same arithmetic bit for bit.
    #[allow(clippy::suboptimal_flops)]
    pub fn lerp(self, next: Self, fraction: f64) -> (f64, f64) {
        (
            self.x + (next.x - self.x) * fraction,
            self.y + (next.y - self.y) * fraction,
        )
    }
}

/// Error produced when a vertex array carries fewer than two ordinates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("vertex needs at least 2 ordinates, got {0}")]
pub struct VertexError(pub usize);

impl TryFrom<Vec<f64>> for Vertex {
    type Error = VertexError;

    fn try_from(ordinates: Vec<f64>) -> Result<Self, Self::Error> {
        match ordinates.as_slice() {
            [x, y, ..] => Ok(Self::new(*x, *y)),
            other => Err(VertexError(other.len())),
        }
    }
}

impl From<Vertex> for [f64; 2] {
    fn from(vertex: Vertex) -> Self {
        [vertex.x, vertex.y]
    }
}

/// An ordered run of vertices.
pub type Path = Vec<Vertex>;

/// Polyline geometry: one or more paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    /// The paths making up this polyline.
    #[serde(default)]
    pub paths: Vec<Path>,
}

/// One polyline feature of the network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkFeature {
    /// Source attributes, carried through untouched.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Feature geometry. Services return `null` for features without one.
    #[serde(default)]
    pub geometry: Option<Polyline>,
}

impl NetworkFeature {
    /// Build a feature from bare paths with no attributes.
    pub fn from_paths(paths: Vec<Path>) -> Self {
        Self {
            attributes: serde_json::Map::new(),
            geometry: Some(Polyline { paths }),
        }
    }

    /// The feature's paths, empty when it has no geometry.
    pub fn paths(&self) -> &[Path] {
        self.geometry.as_ref().map_or(&[], |g| g.paths.as_slice())
    }
}

/// The full path network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathNetwork {
    /// Polyline features in service order.
    pub features: Vec<NetworkFeature>,
}

impl PathNetwork {
    /// Build a network from its features.
    pub const fn new(features: Vec<NetworkFeature>) -> Self {
        Self { features }
    }

    /// Look up a path by feature and path index.
    pub fn path(&self, feature_index: usize, path_index: usize) -> Option<&Path> {
        self.features
            .get(feature_index)
            .and_then(|feature| feature.paths().get(path_index))
    }

    /// Total number of vertices across every path of every feature.
    pub fn vertex_count(&self) -> usize {
        self.features
            .iter()
            .flat_map(NetworkFeature::paths)
            .map(Vec::len)
            .sum()
    }

    /// Total number of paths across every feature.
    pub fn path_count(&self) -> usize {
        self.features.iter().map(|f| f.paths().len()).sum()
    }
}
