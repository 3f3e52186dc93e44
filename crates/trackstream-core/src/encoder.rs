//! Turns a page of observations into a `featureResult` message.

use trackstream_types::{
    FeatureAttributes, FeatureResult, PointFeature, PointGeometry, PolygonFeature,
    PolygonGeometry, StreamFeature,
};

use crate::config::StreamConfig;
use crate::cursor::DeliveryCursor;
use crate::simulator::Observation;

/// Half-width, in map units, of the square drawn around each asset when
/// polygon extrusion is on.
pub const EXTRUDE_HALF_WIDTH: f64 = 2500.0;

/// Errors that can occur while encoding a page.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The page could not be serialized.
    #[error("failed to serialize feature page: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Encodes observation pages into wire messages.
#[derive(Debug, Clone)]
pub struct ObservationEncoder {
    extrude_polygons: bool,
}

impl ObservationEncoder {
    /// Create an encoder for the configured output shape.
    pub const fn new(config: &StreamConfig) -> Self {
        Self {
            extrude_polygons: config.extrude_polygons,
        }
    }

    /// Build the features for one page.
    ///
    /// Indices in `range` with no observation (the simulator produced
    /// fewer slots than configured) are skipped.
    pub fn page_features(
        &self,
        observations: &[Observation],
        range: std::ops::Range<usize>,
    ) -> Vec<StreamFeature> {
        observations
            .get(range.start.min(observations.len())..range.end.min(observations.len()))
            .unwrap_or_default()
            .iter()
            .map(|observation| self.feature(observation))
            .collect()
    }

    /// Serialize one page as `{"type":"featureResult","features":[...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Serialization`] if JSON encoding fails.
    pub fn encode_page(
        &self,
        observations: &[Observation],
        cursor: &DeliveryCursor,
        page: u32,
    ) -> Result<String, EncodeError> {
        let message = FeatureResult {
            features: self.page_features(observations, cursor.page_range(page)),
        };
        Ok(serde_json::to_string(&message)?)
    }

    fn feature(&self, observation: &Observation) -> StreamFeature {
        let point = to_point(observation);
        if self.extrude_polygons {
            StreamFeature::Polygon(extrude(&point, EXTRUDE_HALF_WIDTH))
        } else {
            StreamFeature::Point(point)
        }
    }
}

/// Point feature for one observation.
pub const fn to_point(observation: &Observation) -> PointFeature {
    PointFeature {
        attributes: FeatureAttributes {
            object_id: observation.object_id,
            track_id: observation.track_id,
        },
        geometry: PointGeometry {
            x: observation.x,
            y: observation.y,
        },
    }
}

/// Axis-aligned square of half-width `half_width` centred on `point`.
///
/// One closed ring: top-left, top-right, bottom-right, bottom-left,
/// top-left.
pub fn extrude(point: &PointFeature, half_width: f64) -> PolygonFeature {
    let PointGeometry { x, y } = point.geometry;
    let top_left = [x - half_width, y + half_width];
    PolygonFeature {
        attributes: point.attributes,
        geometry: PolygonGeometry {
            rings: vec![vec![
                top_left,
                [x + half_width, y + half_width],
                [x + half_width, y - half_width],
                [x - half_width, y - half_width],
                top_left,
            ]],
        },
    }
}
