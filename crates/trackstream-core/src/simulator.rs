//! Position simulator: places tracked assets on the path network and moves
//! them along their paths.
//!
//! # Seeding
//!
//! Assets are spread over the network in proportion to vertex count. A
//! fractional `stride = total_vertices / tracked_assets` is walked along
//! every path; each step places one asset at `floor(cursor)` with the
//! remainder as its starting fraction. Because the walk restarts at 0 on
//! every path, the number of slots produced is close to, but generally
//! not equal to, `tracked_assets`. Callers must not assume the two match.
//!
//! # Advancing
//!
//! Every advance moves each asset `distance_step` of a segment forward and
//! reissues its `OBJECTID`. Reaching the end of a segment rolls onto the
//! next one; reaching the last segment wraps to the first, so every path
//! is traversed as a loop.

use tracing::debug;
use trackstream_types::{ObjectId, ObjectIdCounter, PathNetwork, TrackId};

use crate::config::StreamConfig;

/// Path-relative position of one asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRecord {
    /// Index of the feature in the network.
    pub feature_index: usize,
    /// Index of the path within the feature.
    pub path_index: usize,
    /// Start vertex of the current segment.
    pub vertex_index: usize,
    /// Position along the segment, in `[0, 1)`.
    pub fraction: f64,
}

/// Public snapshot of one asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Reissued on every advance.
    pub object_id: ObjectId,
    /// The asset's slot index; never changes.
    pub track_id: TrackId,
    /// Interpolated easting.
    pub x: f64,
    /// Interpolated northing.
    pub y: f64,
}

/// Result of one [`PositionSimulator::advance`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceOutcome {
    /// Number of assets moved before the pass finished or stopped.
    pub advanced: usize,
    /// Slot whose path could not be resolved, if the pass stopped early.
    pub aborted_at: Option<usize>,
}

impl AdvanceOutcome {
    /// Whether every asset was moved.
    pub const fn is_complete(&self) -> bool {
        self.aborted_at.is_none()
    }
}

/// Owns per-asset placement state, the observations derived from it, and
/// the `OBJECTID` counter.
#[derive(Debug, Clone)]
pub struct PositionSimulator {
    distance_step: f64,
    placements: Vec<PlacementRecord>,
    observations: Vec<Observation>,
    ids: ObjectIdCounter,
}

impl PositionSimulator {
    /// Create an empty simulator. Call [`seed`](Self::seed) before use.
    pub const fn new(config: &StreamConfig) -> Self {
        Self::with_counter(config, ObjectIdCounter::new())
    }

    /// Create an empty simulator drawing ids from `ids`.
    pub const fn with_counter(config: &StreamConfig, ids: ObjectIdCounter) -> Self {
        Self {
            distance_step: config.distance_step,
            placements: Vec::new(),
            observations: Vec::new(),
            ids,
        }
    }

    /// Place assets on `network` and compute their initial observations.
    ///
    /// Any previous placement state is discarded.
    #[allow(clippy::cast_precision_loss)]
    pub fn seed(&mut self, network: &PathNetwork, config: &StreamConfig) {
        self.placements.clear();
        self.observations.clear();

        let total_vertices = network.vertex_count();
        if total_vertices == 0 || config.tracked_assets == 0 {
            debug!("Path network has no vertices, nothing to seed");
            return;
        }
        let stride = total_vertices as f64 / f64::from(config.tracked_assets);

        for (feature_index, feature) in network.features.iter().enumerate() {
            for (path_index, path) in feature.paths().iter().enumerate() {
                let last_segment = path.len().saturating_sub(1) as f64;
                let mut cursor = 0.0_f64;
                while cursor < last_segment {
                    let base = cursor.floor();
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let vertex_index = base as usize;
                    self.placements.push(PlacementRecord {
                        feature_index,
                        path_index,
                        vertex_index,
                        fraction: cursor - base,
                    });
                    cursor += stride;
                }
            }
        }

        self.observations.reserve(self.placements.len());
        for (slot, placement) in self.placements.iter().enumerate() {
            let (x, y) = locate(network, placement).unwrap_or_default();
            self.observations.push(Observation {
                object_id: self.ids.next_id(),
                track_id: TrackId(u32::try_from(slot).unwrap_or(u32::MAX)),
                x,
                y,
            });
        }

        debug!(
            total_vertices,
            stride,
            slots = self.placements.len(),
            tracked_assets = config.tracked_assets,
            "Seeded asset placements"
        );
    }

    /// Move every asset one step along its path.
    ///
    /// If any placement refers to a feature, path, or segment that no
    /// longer exists in `network`, the whole pass stops at that slot:
    /// it and every later slot keep their previous position and id.
    pub fn advance(&mut self, network: &PathNetwork) -> AdvanceOutcome {
        let step = self.distance_step;
        for (slot, (placement, observation)) in self
            .placements
            .iter_mut()
            .zip(self.observations.iter_mut())
            .enumerate()
        {
            let Some(path_len) = network
                .path(placement.feature_index, placement.path_index)
                .map(Vec::len)
            else {
                return AdvanceOutcome {
                    advanced: slot,
                    aborted_at: Some(slot),
                };
            };
            let Some((x, y)) = locate(network, placement) else {
                return AdvanceOutcome {
                    advanced: slot,
                    aborted_at: Some(slot),
                };
            };

            observation.x = x;
            observation.y = y;
            observation.object_id = self.ids.next_id();

            let next = placement.fraction + step;
            if next >= 1.0 {
                placement.fraction = 0.0;
                placement.vertex_index = placement.vertex_index.saturating_add(1);
                if placement.vertex_index >= path_len.saturating_sub(1) {
                    placement.vertex_index = 0;
                }
            } else {
                placement.fraction = next;
            }
        }

        AdvanceOutcome {
            advanced: self.placements.len(),
            aborted_at: None,
        }
    }

    /// Current observations in slot order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Current placements in slot order.
    pub fn placements(&self) -> &[PlacementRecord] {
        &self.placements
    }

    /// Number of asset slots produced by seeding.
    pub fn slot_count(&self) -> usize {
        self.placements.len()
    }

    /// Mutable access to one placement, for repositioning an asset.
    pub fn placement_mut(&mut self, slot: usize) -> Option<&mut PlacementRecord> {
        self.placements.get_mut(slot)
    }
}

/// Interpolate the position of `placement` on `network`.
fn locate(network: &PathNetwork, placement: &PlacementRecord) -> Option<(f64, f64)> {
    let path = network.path(placement.feature_index, placement.path_index)?;
    let start = path.get(placement.vertex_index)?;
    let end = path.get(placement.vertex_index.checked_add(1)?)?;
    Some(start.lerp(*end, placement.fraction))
}
