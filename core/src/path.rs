//! Waypoint sequences produced by the pathfinder and consumed by walkers.

use std::collections::VecDeque;

use crate::CellCoord;

/// Cost of a horizontal or vertical step.
pub const ORTHOGONAL_STEP_COST: u32 = 10;

/// Cost of a diagonal step.
pub const DIAGONAL_STEP_COST: u32 = 14;

/// Cost of stepping between two adjacent cells, or `None` when the cells are
/// not neighbours.
#[must_use]
pub fn octile_step_cost(from: CellCoord, to: CellCoord) -> Option<u32> {
    let rows = from.row().abs_diff(to.row());
    let columns = from.column().abs_diff(to.column());
    match (rows, columns) {
        (0, 1) | (1, 0) => Some(ORTHOGONAL_STEP_COST),
        (1, 1) => Some(DIAGONAL_STEP_COST),
        _ => None,
    }
}

/// Ordered waypoints from the first hop after the start cell up to and
/// including the target. Waypoints are consumed front to back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    waypoints: VecDeque<CellCoord>,
}

impl Path {
    /// Creates a path from waypoints listed in travel order.
    #[must_use]
    pub fn from_waypoints(waypoints: impl IntoIterator<Item = CellCoord>) -> Self {
        Self {
            waypoints: waypoints.into_iter().collect(),
        }
    }

    /// Single-hop path straight to the target.
    #[must_use]
    pub fn direct(target: CellCoord) -> Self {
        Self::from_waypoints([target])
    }

    /// Removes and returns the next waypoint.
    pub fn pop_next(&mut self) -> Option<CellCoord> {
        self.waypoints.pop_front()
    }

    /// Final waypoint of the path.
    #[must_use]
    pub fn last(&self) -> Option<CellCoord> {
        self.waypoints.back().copied()
    }

    /// Inserts a waypoint that must be visited before all others.
    pub fn prepend(&mut self, waypoint: CellCoord) {
        self.waypoints.push_front(waypoint);
    }

    /// Number of waypoints left.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether every waypoint has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Iterates the remaining waypoints in travel order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.waypoints.iter().copied()
    }

    /// Total octile cost of walking the path from `start`, or `None` when two
    /// consecutive waypoints are not adjacent.
    #[must_use]
    pub fn cost_from(&self, start: CellCoord) -> Option<u32> {
        let mut previous = start;
        let mut total = 0_u32;
        for waypoint in self.iter() {
            total = total.checked_add(octile_step_cost(previous, waypoint)?)?;
            previous = waypoint;
        }
        Some(total)
    }
}
