//! Enemy records and their per-tick movement.

use std::time::Duration;

use bastion_core::{
    bearing_degrees, CellCoord, EnemyHandle, EnemySnapshot, EnemySpawn, EnemyType, Heading,
    MovementKind, Path,
};
use glam::Vec2;

/// Diagonal-to-orthogonal speed ratio applied to walkers moving along one axis.
const ORTHOGONAL_SPEED_FACTOR: f32 = 1.41;

/// Result of advancing an enemy by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    Travelling,
    ReachedHome,
}

/// Leg of a walker's journey toward a single waypoint. The heading is fixed
/// when the leg starts.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WalkerLeg {
    destination: Vec2,
    heading: Heading,
}

/// Leg of a flyer's journey along an exact direction vector.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FlyerLeg {
    destination: Vec2,
    direction: Vec2,
}

#[derive(Clone, Debug)]
pub(crate) enum Movement {
    Walker { path: Path, leg: Option<WalkerLeg> },
    Flyer { path: Path, leg: Option<FlyerLeg> },
}

impl Movement {
    pub(crate) fn walker(path: Path) -> Self {
        Self::Walker { path, leg: None }
    }

    pub(crate) fn flyer(target: CellCoord) -> Self {
        Self::Flyer {
            path: Path::direct(target),
            leg: None,
        }
    }

    fn kind(&self) -> MovementKind {
        match self {
            Self::Walker { .. } => MovementKind::Walker,
            Self::Flyer { .. } => MovementKind::Flyer,
        }
    }

    fn remaining_waypoints(&self) -> usize {
        match self {
            Self::Walker { path, .. } | Self::Flyer { path, .. } => path.len(),
        }
    }
}

/// Pixel geometry shared by every moving entity.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Geometry {
    pub(crate) cell_size: f32,
    pub(crate) flyer_arrival_radius: f32,
}

impl Geometry {
    pub(crate) fn cell_center(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(
            (cell.column() as f32 + 0.5) * self.cell_size,
            (cell.row() as f32 + 0.5) * self.cell_size,
        )
    }

    pub(crate) fn cell_containing(&self, position: Vec2) -> Option<CellCoord> {
        if self.cell_size <= 0.0 || position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let column = (position.x / self.cell_size).floor();
        let row = (position.y / self.cell_size).floor();
        if !(column.is_finite() && row.is_finite()) {
            return None;
        }
        Some(CellCoord::new(row as u32, column as u32))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    enemy_type: EnemyType,
    position: Vec2,
    orientation: f32,
    size: f32,
    speed: f32,
    energy: u32,
    max_energy: u32,
    bounty: u32,
    target: CellCoord,
    movement: Movement,
}

impl Enemy {
    pub(crate) fn new(
        spawn: &EnemySpawn,
        position: Vec2,
        size: f32,
        target: CellCoord,
        movement: Movement,
    ) -> Self {
        Self {
            enemy_type: spawn.enemy_type,
            position,
            orientation: 0.0,
            size,
            speed: spawn.speed,
            energy: spawn.energy,
            max_energy: spawn.energy,
            bounty: spawn.bounty,
            target,
            movement,
        }
    }

    pub(crate) fn position(&self) -> Vec2 {
        self.position
    }

    pub(crate) fn bounty(&self) -> u32 {
        self.bounty
    }

    pub(crate) fn is_walker(&self) -> bool {
        matches!(self.movement, Movement::Walker { .. })
    }

    /// Removes `damage` energy, reporting whether the enemy is destroyed.
    pub(crate) fn apply_damage(&mut self, damage: u32) -> bool {
        self.energy = self.energy.saturating_sub(damage);
        self.energy == 0
    }

    /// Replaces a walker's path, first re-centring on `from`.
    pub(crate) fn reroute(&mut self, from: CellCoord, mut path: Path) {
        if let Movement::Walker {
            path: current,
            leg,
        } = &mut self.movement
        {
            path.prepend(from);
            *current = path;
            *leg = None;
        }
    }

    pub(crate) fn step(&mut self, dt: Duration, geometry: &Geometry) -> StepOutcome {
        let seconds = dt.as_secs_f32();
        match &mut self.movement {
            Movement::Walker { path, leg } => {
                let current = match *leg {
                    Some(current) => current,
                    None => {
                        let Some(next) = next_walker_leg(path, self.position, geometry) else {
                            return StepOutcome::ReachedHome;
                        };
                        self.orientation = next.heading.degrees();
                        next
                    }
                };

                let distance = if current.heading.is_diagonal() {
                    self.speed * seconds
                } else {
                    self.speed * seconds * ORTHOGONAL_SPEED_FACTOR
                };
                self.position += current.heading.axis_signs() * distance;

                if walker_arrived(current.heading, self.position, current.destination) {
                    self.position = current.destination;
                    *leg = None;
                } else {
                    *leg = Some(current);
                }
            }
            Movement::Flyer { path, leg } => {
                let current = match *leg {
                    Some(current) => current,
                    None => {
                        let Some(next) = path.pop_next() else {
                            return StepOutcome::ReachedHome;
                        };
                        let destination = geometry.cell_center(next);
                        self.orientation = bearing_degrees(self.position, destination);
                        FlyerLeg {
                            destination,
                            direction: (destination - self.position).normalize_or_zero(),
                        }
                    }
                };

                let remaining = self.position.distance(current.destination);
                let travel = self.speed * seconds;
                if travel >= remaining {
                    self.position = current.destination;
                } else {
                    self.position += current.direction * travel;
                }

                if self.position.distance(current.destination) <= geometry.flyer_arrival_radius {
                    self.position = current.destination;
                    *leg = None;
                } else {
                    *leg = Some(current);
                }
            }
        }
        StepOutcome::Travelling
    }

    pub(crate) fn snapshot(&self, handle: EnemyHandle) -> EnemySnapshot {
        EnemySnapshot {
            handle,
            enemy_type: self.enemy_type,
            movement: self.movement.kind(),
            position: self.position,
            orientation: self.orientation,
            size: self.size,
            speed: self.speed,
            energy: self.energy,
            max_energy: self.max_energy,
            bounty: self.bounty,
            target: self.target,
            remaining_waypoints: self.movement.remaining_waypoints(),
        }
    }
}

/// Pops waypoints until one lies away from the current position.
fn next_walker_leg(path: &mut Path, position: Vec2, geometry: &Geometry) -> Option<WalkerLeg> {
    while let Some(next) = path.pop_next() {
        let destination = geometry.cell_center(next);
        if let Some(heading) = Heading::from_delta(destination - position) {
            return Some(WalkerLeg {
                destination,
                heading,
            });
        }
    }
    None
}

/// Only the dominant axis of the heading is compared.
fn walker_arrived(heading: Heading, position: Vec2, destination: Vec2) -> bool {
    match heading {
        Heading::NorthEast | Heading::East | Heading::SouthEast => position.x >= destination.x,
        Heading::NorthWest | Heading::West | Heading::SouthWest => position.x <= destination.x,
        Heading::North => position.y <= destination.y,
        Heading::South => position.y >= destination.y,
    }
}
