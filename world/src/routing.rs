//! Route planning against the live grid: spawn paths, placement validation
//! and the recompute pass that follows every grid mutation.

use bastion_core::{
    CellCoord, CellKind, CellRect, Event, Grid, Path, SpawnDropReason, StartBases,
};
use bastion_system_pathfinding::{PathQuery, PathResult, Pathfinder, SearchMode};

use crate::{
    enemies::{Enemy, Geometry},
    pool::Pool,
};

fn is_walkable(grid: &Grid<CellKind>, cell: CellCoord) -> bool {
    grid.get(cell).is_some_and(|kind| kind.is_walkable())
}

/// Computes a walker path from `start` to `home` on the live grid.
pub(crate) fn spawn_path(
    pathfinder: &mut Pathfinder,
    grid: &Grid<CellKind>,
    start: CellCoord,
    home: CellCoord,
    max_iterations: u32,
) -> Result<Path, SpawnDropReason> {
    let query = PathQuery::new(start, home).with_max_iterations(max_iterations);
    match pathfinder.find_path(grid.size(), &query, |cell| is_walkable(grid, cell)) {
        PathResult::Found(path) => Ok(path),
        PathResult::IterationLimitReached => Err(SpawnDropReason::IterationLimitReached),
        PathResult::Unreachable | PathResult::Reachable(_) => Err(SpawnDropReason::Unreachable),
    }
}

/// Reports whether every start base keeps at least one route home once
/// `footprint` is blocked. Searches that hit the iteration cap count as
/// blocked.
pub(crate) fn footprint_keeps_routes(
    pathfinder: &mut Pathfinder,
    grid: &Grid<CellKind>,
    start_bases: &StartBases,
    home: CellCoord,
    footprint: CellRect,
    max_iterations: u32,
) -> bool {
    let walkable = |cell: CellCoord| !footprint.contains(cell) && is_walkable(grid, cell);
    start_bases.iter().all(|(_, points)| {
        points.iter().any(|&start| {
            let query = PathQuery::new(start, home)
                .with_max_iterations(max_iterations)
                .with_mode(SearchMode::CheckReachabilityOnly);
            pathfinder.find_path(grid.size(), &query, walkable) == PathResult::Reachable(true)
        })
    })
}

/// Replaces the path of every living walker after the grid changed.
///
/// Each walker is routed from the cell containing it, which counts as walkable
/// even if a tower now covers it. Walkers without a route are released and
/// reported through [`Event::EnemyStranded`]. Flyers keep their course.
pub(crate) fn recompute_paths(
    pathfinder: &mut Pathfinder,
    grid: &Grid<CellKind>,
    enemies: &mut Pool<Enemy>,
    home: CellCoord,
    geometry: &Geometry,
    max_iterations: u32,
    out_events: &mut Vec<Event>,
) {
    let mut rerouted = 0_u32;
    let mut stranded = 0_u32;

    enemies.retain_mut(|handle, enemy| {
        if !enemy.is_walker() {
            return true;
        }

        let from = geometry
            .cell_containing(enemy.position())
            .filter(|cell| grid.contains(*cell));
        let route = from.and_then(|from| {
            let query = PathQuery::new(from, home).with_max_iterations(max_iterations);
            let walkable = |cell: CellCoord| cell == from || is_walkable(grid, cell);
            pathfinder
                .find_path(grid.size(), &query, walkable)
                .into_path()
                .map(|path| (from, path))
        });

        match route {
            Some((from, path)) => {
                enemy.reroute(from, path);
                rerouted += 1;
                true
            }
            None => {
                tracing::debug!(enemy = ?handle, "walker stranded without a route home");
                out_events.push(Event::EnemyStranded { enemy: handle });
                stranded += 1;
                false
            }
        }
    });

    tracing::debug!(rerouted, stranded, "recomputed walker paths");
    out_events.push(Event::PathsRecomputed { rerouted, stranded });
}
