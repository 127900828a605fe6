//! Lane coordinate model shared by the local player, rivals and animation.
//!
//! Configuration and the wire protocol address lanes with a 1-based
//! [`LaneIndex`]. Simulation and rendering use a [`CenteredLane`] that is
//! symmetric about zero: with three lanes the centred values are `-1, 0, 1`,
//! with four they are `-1.5, -0.5, 0.5, 1.5`. Every consumer converts through
//! this module so peers agree on where a lane is drawn.

use serde::{Deserialize, Serialize};

/// Lane addressed with a 1-based index where `1` is the leftmost lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneIndex(u32);

impl LaneIndex {
    /// Creates a lane index from its 1-based value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the 1-based value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Lane position expressed symmetrically about the road centre.
///
/// Values are multiples of one half, so `f32` represents them exactly.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CenteredLane(f32);

impl CenteredLane {
    /// Wraps a centred lane coordinate.
    #[must_use]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Retrieves the centred coordinate.
    #[must_use]
    pub const fn get(&self) -> f32 {
        self.0
    }
}

/// Direction of a lane-change request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LaneDirection {
    /// Towards lane `1`.
    Left,
    /// Towards lane `max_lanes`.
    Right,
}

/// Converts a 1-based lane index into its centred coordinate.
#[must_use]
pub fn to_centered(lane: LaneIndex, max_lanes: u32) -> CenteredLane {
    CenteredLane(lane.get() as f32 - (max_lanes as f32 + 1.0) / 2.0)
}

/// Converts a centred coordinate back into a 1-based lane index.
///
/// Returns `None` when the coordinate does not land exactly on a lane.
#[must_use]
pub fn to_lane_index(centered: CenteredLane, max_lanes: u32) -> Option<LaneIndex> {
    let raw = centered.get() + (max_lanes as f32 + 1.0) / 2.0;
    if raw.fract() != 0.0 || raw < 1.0 || raw > max_lanes as f32 {
        return None;
    }
    Some(LaneIndex(raw as u32))
}

/// Lane count and width of the road, taken from the active configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneLayout {
    max_lanes: u32,
    lane_width: f32,
}

impl LaneLayout {
    /// Creates a layout with the given lane count and world-space lane width.
    #[must_use]
    pub const fn new(max_lanes: u32, lane_width: f32) -> Self {
        Self {
            max_lanes,
            lane_width,
        }
    }

    /// Number of lanes on the road.
    #[must_use]
    pub const fn max_lanes(&self) -> u32 {
        self.max_lanes
    }

    /// Width of a single lane in world units.
    #[must_use]
    pub const fn lane_width(&self) -> f32 {
        self.lane_width
    }

    /// Centred coordinate of the provided lane.
    #[must_use]
    pub fn centered(&self, lane: LaneIndex) -> CenteredLane {
        to_centered(lane, self.max_lanes)
    }

    /// Inverse of [`LaneLayout::centered`].
    #[must_use]
    pub fn lane_index(&self, centered: CenteredLane) -> Option<LaneIndex> {
        to_lane_index(centered, self.max_lanes)
    }

    /// All centred lane coordinates from left to right.
    pub fn centered_lanes(&self) -> impl Iterator<Item = CenteredLane> + '_ {
        (1..=self.max_lanes).map(|lane| self.centered(LaneIndex(lane)))
    }

    /// Lateral world-space offset of a (possibly fractional) centred coordinate.
    #[must_use]
    pub fn world_x(&self, centered: CenteredLane) -> f32 {
        centered.get() * self.lane_width
    }

    /// Moves one lane in the given direction, stopping at the outermost lanes.
    #[must_use]
    pub fn shift(&self, centered: CenteredLane, direction: LaneDirection) -> CenteredLane {
        let edge = (self.max_lanes as f32 - 1.0) / 2.0;
        let step = match direction {
            LaneDirection::Left => -1.0,
            LaneDirection::Right => 1.0,
        };
        CenteredLane((centered.get() + step).clamp(-edge, edge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_lanes_center_on_zero() {
        assert_eq!(to_centered(LaneIndex::new(1), 3), CenteredLane::new(-1.0));
        assert_eq!(to_centered(LaneIndex::new(2), 3), CenteredLane::new(0.0));
        assert_eq!(to_centered(LaneIndex::new(3), 3), CenteredLane::new(1.0));
    }

    #[test]
    fn four_lanes_use_half_offsets() {
        let layout = LaneLayout::new(4, 4.5);
        let lanes: Vec<f32> = layout.centered_lanes().map(|lane| lane.get()).collect();
        assert_eq!(lanes, vec![-1.5, -0.5, 0.5, 1.5]);
    }

    #[test]
    fn centered_lanes_are_symmetric_with_unit_spacing() {
        for max_lanes in 1..=9 {
            let layout = LaneLayout::new(max_lanes, 1.0);
            let lanes: Vec<f32> = layout.centered_lanes().map(|lane| lane.get()).collect();
            let sum: f32 = lanes.iter().sum();
            assert!(sum.abs() < f32::EPSILON, "lanes {lanes:?} not symmetric");
            for pair in lanes.windows(2) {
                assert!((pair[1] - pair[0] - 1.0).abs() < f32::EPSILON);
            }
        }
    }

    #[test]
    fn inverse_round_trips_and_rejects_off_lane_values() {
        for max_lanes in 1..=6 {
            for lane in 1..=max_lanes {
                let centered = to_centered(LaneIndex::new(lane), max_lanes);
                assert_eq!(
                    to_lane_index(centered, max_lanes),
                    Some(LaneIndex::new(lane))
                );
            }
        }
        assert_eq!(to_lane_index(CenteredLane::new(0.25), 3), None);
        assert_eq!(to_lane_index(CenteredLane::new(2.0), 3), None);
        assert_eq!(to_lane_index(CenteredLane::new(0.0), 4), None);
    }

    #[test]
    fn shift_clamps_at_road_edges() {
        let layout = LaneLayout::new(3, 4.5);
        let left = layout.shift(CenteredLane::new(-1.0), LaneDirection::Left);
        assert_eq!(left, CenteredLane::new(-1.0));
        let right = layout.shift(CenteredLane::new(0.0), LaneDirection::Right);
        assert_eq!(right, CenteredLane::new(1.0));
        assert!((layout.world_x(right) - 4.5).abs() < f32::EPSILON);
    }
}
