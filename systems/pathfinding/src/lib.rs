#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Octile A* search over a rectangular grid.
//!
//! The pathfinder never inspects a concrete grid type. Callers pass the grid
//! dimensions and a walkability predicate, which keeps the search usable for
//! the live world grid as well as for hypothetical grids such as "the current
//! grid with this tower footprint blocked". Scratch buffers are kept between
//! calls and only reallocated when the grid dimensions change.

use std::{cmp::Reverse, collections::BinaryHeap};

use bastion_core::{
    CellCoord, GridSize, Path, DIAGONAL_STEP_COST, ORTHOGONAL_STEP_COST,
};

/// Neighbour offsets as `(row, column)` deltas in expansion order.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// What the caller wants back from a search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Reconstruct the full waypoint list.
    #[default]
    ComputePath,
    /// Only report whether the target can be reached.
    CheckReachabilityOnly,
}

/// Distance estimate used to order the open set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Heuristic {
    /// Exact obstacle-free octile distance. Never overestimates, so found
    /// paths are always shortest.
    #[default]
    Octile,
    /// Ten times the Manhattan distance. Overestimates diagonal travel, which
    /// speeds up searches on open maps at the price of occasionally longer
    /// paths.
    Manhattan,
}

impl Heuristic {
    fn estimate(self, from: CellCoord, to: CellCoord) -> u32 {
        match self {
            Self::Octile => {
                let rows = from.row().abs_diff(to.row());
                let columns = from.column().abs_diff(to.column());
                let diagonal = rows.min(columns);
                let straight = rows.max(columns) - diagonal;
                diagonal
                    .saturating_mul(DIAGONAL_STEP_COST)
                    .saturating_add(straight.saturating_mul(ORTHOGONAL_STEP_COST))
            }
            Self::Manhattan => from
                .manhattan_distance(to)
                .saturating_mul(ORTHOGONAL_STEP_COST),
        }
    }
}

/// Parameters of a single search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathQuery {
    start: CellCoord,
    target: CellCoord,
    max_iterations: u32,
    mode: SearchMode,
    heuristic: Heuristic,
}

impl PathQuery {
    /// Creates a path computation query with the default iteration cap.
    #[must_use]
    pub const fn new(start: CellCoord, target: CellCoord) -> Self {
        Self {
            start,
            target,
            max_iterations: 0,
            mode: SearchMode::ComputePath,
            heuristic: Heuristic::Octile,
        }
    }

    /// Limits the number of expanded cells. Zero selects `rows × columns`.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Selects what the search returns.
    #[must_use]
    pub const fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Selects the distance estimate.
    #[must_use]
    pub const fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Cell the search starts from.
    #[must_use]
    pub const fn start(&self) -> CellCoord {
        self.start
    }

    /// Cell the search tries to reach.
    #[must_use]
    pub const fn target(&self) -> CellCoord {
        self.target
    }

    /// Requested iteration cap, zero meaning the grid's cell count.
    #[must_use]
    pub const fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Requested result shape.
    #[must_use]
    pub const fn mode(&self) -> SearchMode {
        self.mode
    }
}

/// Terminal outcome of a search. Every variant is an ordinary result the
/// caller is expected to branch on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathResult {
    /// A route exists; waypoints run from the first hop to the target.
    Found(Path),
    /// Reachability-only answer.
    Reachable(bool),
    /// The open set emptied before the target was discovered.
    Unreachable,
    /// The search expanded the allowed number of cells without an answer.
    IterationLimitReached,
}

impl PathResult {
    /// Consumes the result, yielding the path when one was found.
    #[must_use]
    pub fn into_path(self) -> Option<Path> {
        match self {
            Self::Found(path) => Some(path),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::Reachable(true) => "reachable",
            Self::Reachable(false) => "not reachable",
            Self::Unreachable => "unreachable",
            Self::IterationLimitReached => "iteration limit reached",
        }
    }
}

/// Open-set entry ordered by ascending `f`, then by insertion sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    f: u32,
    sequence: u64,
    index: usize,
}

/// Reusable A* solver.
#[derive(Debug, Default)]
pub struct Pathfinder {
    size: GridSize,
    g: Vec<u32>,
    f: Vec<u32>,
    parent: Vec<usize>,
    opened: Vec<u32>,
    closed: Vec<u32>,
    search: u32,
    open: BinaryHeap<Reverse<OpenEntry>>,
    sequence: u64,
    last_expansions: u32,
}

impl Pathfinder {
    /// Creates a pathfinder with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells expanded by the most recent search.
    #[must_use]
    pub const fn last_expansions(&self) -> u32 {
        self.last_expansions
    }

    /// Searches for a route from the query's start to its target.
    ///
    /// Diagonal steps are only taken when both orthogonal cells flanking the
    /// diagonal are walkable. Start and target must both be walkable.
    pub fn find_path<F>(&mut self, size: GridSize, query: &PathQuery, is_walkable: F) -> PathResult
    where
        F: Fn(CellCoord) -> bool,
    {
        let result = self.search(size, query, &is_walkable);
        let waypoints = match &result {
            PathResult::Found(path) => path.len(),
            _ => 0,
        };
        tracing::debug!(
            start = ?query.start,
            target = ?query.target,
            result = result.label(),
            expansions = self.last_expansions,
            waypoints,
            "pathfinder search finished"
        );
        result
    }

    fn search<F>(&mut self, size: GridSize, query: &PathQuery, is_walkable: &F) -> PathResult
    where
        F: Fn(CellCoord) -> bool,
    {
        self.last_expansions = 0;

        let (Some(start), Some(target)) = (size.index(query.start), size.index(query.target))
        else {
            return self.not_found(query.mode);
        };
        if !is_walkable(query.start) || !is_walkable(query.target) {
            return self.not_found(query.mode);
        }
        if start == target {
            return match query.mode {
                SearchMode::ComputePath => PathResult::Found(Path::default()),
                SearchMode::CheckReachabilityOnly => PathResult::Reachable(true),
            };
        }

        self.prepare(size);
        let max_iterations = if query.max_iterations == 0 {
            u32::try_from(size.cell_count()).unwrap_or(u32::MAX)
        } else {
            query.max_iterations
        };

        self.discover(start, start, 0, query.heuristic.estimate(query.start, query.target));

        loop {
            let Some(current) = self.pop_open() else {
                return self.not_found(query.mode);
            };
            if self.last_expansions >= max_iterations {
                return PathResult::IterationLimitReached;
            }
            self.last_expansions += 1;
            self.closed[current] = self.search;

            let Some(cell) = size.cell_at(current) else {
                continue;
            };
            let walkable = |row: i32, column: i32| {
                cell.offset(row, column)
                    .is_some_and(|neighbour| size.contains(neighbour) && is_walkable(neighbour))
            };

            for (row_delta, column_delta) in NEIGHBOURS {
                let Some(neighbour) = cell.offset(row_delta, column_delta) else {
                    continue;
                };
                let Some(index) = size.index(neighbour) else {
                    continue;
                };
                if self.closed[index] == self.search || !is_walkable(neighbour) {
                    continue;
                }

                let diagonal = row_delta != 0 && column_delta != 0;
                if diagonal && !(walkable(row_delta, 0) && walkable(0, column_delta)) {
                    continue;
                }

                let step = if diagonal {
                    DIAGONAL_STEP_COST
                } else {
                    ORTHOGONAL_STEP_COST
                };
                let tentative = self.g[current].saturating_add(step);
                if self.opened[index] == self.search && tentative >= self.g[index] {
                    continue;
                }

                let estimate = query.heuristic.estimate(neighbour, query.target);
                self.discover(index, current, tentative, estimate);

                if index == target {
                    return match query.mode {
                        SearchMode::ComputePath => {
                            PathResult::Found(self.reconstruct(size, start, target))
                        }
                        SearchMode::CheckReachabilityOnly => PathResult::Reachable(true),
                    };
                }
            }
        }
    }

    fn not_found(&self, mode: SearchMode) -> PathResult {
        match mode {
            SearchMode::ComputePath => PathResult::Unreachable,
            SearchMode::CheckReachabilityOnly => PathResult::Reachable(false),
        }
    }

    fn prepare(&mut self, size: GridSize) {
        if self.size != size {
            let cells = size.cell_count();
            self.size = size;
            self.g = vec![0; cells];
            self.f = vec![0; cells];
            self.parent = vec![0; cells];
            self.opened = vec![0; cells];
            self.closed = vec![0; cells];
            self.search = 0;
        }
        debug_assert_eq!(
            self.g.len(),
            size.cell_count(),
            "pathfinder scratch buffers out of sync with grid size"
        );

        self.search = self.search.wrapping_add(1);
        if self.search == 0 {
            self.opened.fill(0);
            self.closed.fill(0);
            self.search = 1;
        }
        self.open.clear();
        self.sequence = 0;
    }

    fn discover(&mut self, index: usize, parent: usize, g: u32, h: u32) {
        let f = g.saturating_add(h);
        self.g[index] = g;
        self.f[index] = f;
        self.parent[index] = parent;
        self.opened[index] = self.search;
        self.open.push(Reverse(OpenEntry {
            f,
            sequence: self.sequence,
            index,
        }));
        self.sequence += 1;
    }

    fn pop_open(&mut self) -> Option<usize> {
        while let Some(Reverse(entry)) = self.open.pop() {
            let stale = self.closed[entry.index] == self.search || self.f[entry.index] != entry.f;
            if !stale {
                return Some(entry.index);
            }
        }
        None
    }

    fn reconstruct(&self, size: GridSize, start: usize, target: usize) -> Path {
        let mut reversed = Vec::new();
        let mut current = target;
        while current != start && reversed.len() < size.cell_count() {
            if let Some(cell) = size.cell_at(current) {
                reversed.push(cell);
            }
            current = self.parent[current];
        }
        debug_assert_eq!(current, start, "parent chain did not lead back to start");
        Path::from_waypoints(reversed.into_iter().rev())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(_: CellCoord) -> bool {
        true
    }

    #[test]
    fn octile_estimate_matches_free_space_cost() {
        let from = CellCoord::new(0, 0);
        let to = CellCoord::new(2, 5);
        assert_eq!(Heuristic::Octile.estimate(from, to), 2 * 14 + 3 * 10);
        assert_eq!(Heuristic::Manhattan.estimate(from, to), 70);
    }

    #[test]
    fn adjacent_target_is_found_after_one_expansion() {
        let mut pathfinder = Pathfinder::new();
        let query = PathQuery::new(CellCoord::new(1, 1), CellCoord::new(1, 2));
        let result = pathfinder.find_path(GridSize::new(3, 3), &query, open_grid);
        assert_eq!(
            result,
            PathResult::Found(Path::from_waypoints([CellCoord::new(1, 2)]))
        );
        assert_eq!(pathfinder.last_expansions(), 1);
    }

    #[test]
    fn start_equal_to_target_yields_empty_path() {
        let mut pathfinder = Pathfinder::new();
        let cell = CellCoord::new(0, 0);
        let result = pathfinder.find_path(GridSize::new(2, 2), &PathQuery::new(cell, cell), open_grid);
        assert_eq!(result, PathResult::Found(Path::default()));
    }

    #[test]
    fn out_of_bounds_target_is_unreachable() {
        let mut pathfinder = Pathfinder::new();
        let query = PathQuery::new(CellCoord::new(0, 0), CellCoord::new(5, 5))
            .with_mode(SearchMode::CheckReachabilityOnly);
        let result = pathfinder.find_path(GridSize::new(2, 2), &query, open_grid);
        assert_eq!(result, PathResult::Reachable(false));
    }

    #[test]
    fn scratch_buffers_follow_grid_size() {
        let mut pathfinder = Pathfinder::new();
        let query = PathQuery::new(CellCoord::new(0, 0), CellCoord::new(0, 3));
        let _ = pathfinder.find_path(GridSize::new(1, 4), &query, open_grid);
        assert_eq!(pathfinder.g.len(), 4);
        let _ = pathfinder.find_path(GridSize::new(4, 4), &query, open_grid);
        assert_eq!(pathfinder.g.len(), 16);
    }
}
