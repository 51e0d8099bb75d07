#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Bastion tower-defense engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems and adapters submit
//! [`Command`] values describing per-tick simulation work and [`BuildOrder`]
//! values describing player construction requests. The world executes them
//! and broadcasts [`Event`] values describing what happened. Read-only
//! snapshot views expose world state without granting mutation access.

mod grid;
mod level;
mod path;
mod tower;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use grid::{Grid, GridSize};
pub use level::{
    CellKind, EnemyType, Level, LevelError, StartBaseId, StartBases, Wave, MAX_START_BASES,
};
pub use path::{octile_step_cost, Path, DIAGONAL_STEP_COST, ORTHOGONAL_STEP_COST};
pub use tower::{
    TowerCatalog, TowerClass, TowerClassError, TowerClassId, TowerParameter, UpgradeLadder,
    UpgradeLevels, UpgradeTier,
};

/// Commands that express all per-tick world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock and records the frame duration used by
    /// the subsequent step commands.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a new enemy be drawn from the enemy pool.
    SpawnEnemy {
        /// Parameters of the enemy to spawn.
        spawn: EnemySpawn,
    },
    /// Advances every living enemy along its path by the recorded frame time.
    StepEnemies,
    /// Counts down every tower's reload timer by the recorded frame time.
    ReloadTowers,
    /// Requests that a ready tower fire a bullet at the provided enemy.
    FireBullet {
        /// Tower firing the bullet.
        tower: TowerId,
        /// Enemy captured as the bullet's target.
        target: EnemyHandle,
    },
    /// Advances every bullet toward its destination by the recorded frame time.
    StepBullets,
    /// Restores the pristine level and clears every pool and tower.
    Reset,
}

/// Player construction requests. Each order is gated by a [`Treasury`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildOrder {
    /// Places a tower of the given class with its footprint anchored at `origin`.
    PlaceTower {
        /// Class of the tower to construct.
        class: TowerClassId,
        /// Upper-left cell of the tower footprint.
        origin: CellCoord,
    },
    /// Sells an existing tower, refunding part of its cost.
    RemoveTower {
        /// Identifier of the tower to remove.
        tower: TowerId,
    },
    /// Advances one upgradeable parameter of a tower by a single tier.
    UpgradeTower {
        /// Identifier of the tower to upgrade.
        tower: TowerId,
        /// Parameter whose ladder should advance.
        parameter: TowerParameter,
    },
}

/// Events broadcast by the world after processing commands and build orders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
        /// Number of ticks processed since the world was created.
        tick: u64,
    },
    /// Confirms that an enemy entered the field.
    EnemySpawned {
        /// Handle assigned to the enemy.
        enemy: EnemyHandle,
        /// Type of the spawned enemy.
        enemy_type: EnemyType,
        /// Cell the enemy started from.
        start: CellCoord,
    },
    /// Reports that a spawn request was dropped without creating an enemy.
    EnemySpawnDropped {
        /// Type of the enemy that was requested.
        enemy_type: EnemyType,
        /// Requested start cell.
        start: CellCoord,
        /// Reason the spawn was dropped.
        reason: SpawnDropReason,
    },
    /// Reports that an enemy exhausted its path and breached the home cell.
    EnemyReachedHome {
        /// Handle of the enemy that reached home.
        enemy: EnemyHandle,
    },
    /// Reports that an enemy's energy was depleted.
    EnemyDestroyed {
        /// Handle of the destroyed enemy.
        enemy: EnemyHandle,
        /// Currency awarded for the kill.
        bounty: u32,
    },
    /// Reports that an enemy lost every route home after the grid changed and
    /// was removed without bounty or life loss.
    EnemyStranded {
        /// Handle of the stranded enemy.
        enemy: EnemyHandle,
    },
    /// Summarises a path recompute pass triggered by a grid mutation.
    PathsRecomputed {
        /// Number of ground walkers that received a fresh path.
        rerouted: u32,
        /// Number of ground walkers that were stranded.
        stranded: u32,
    },
    /// Confirms that a tower fired a bullet.
    BulletFired {
        /// Handle assigned to the bullet.
        bullet: BulletHandle,
        /// Tower that fired the bullet.
        tower: TowerId,
        /// Enemy targeted by the bullet at fire time.
        target: EnemyHandle,
    },
    /// Reports that a tower could not fire because the bullet pool was full.
    BulletDropped {
        /// Tower that attempted to fire.
        tower: TowerId,
    },
    /// Reports that a bullet reached its still-valid target and dealt damage.
    BulletHit {
        /// Handle of the bullet that hit.
        bullet: BulletHandle,
        /// Enemy that received the damage.
        target: EnemyHandle,
        /// Damage dealt by the bullet.
        damage: u32,
    },
    /// Reports that a bullet whose target vanished reached its last known
    /// destination and expired harmlessly.
    BulletExpired {
        /// Handle of the expired bullet.
        bullet: BulletHandle,
    },
    /// Confirms that a tower was placed into the world.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Class of the placed tower.
        class: TowerClassId,
        /// Region of cells occupied by the tower.
        region: CellRect,
        /// Currency charged for the placement.
        cost: u32,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Class requested for placement.
        class: TowerClassId,
        /// Origin cell provided in the placement request.
        origin: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a tower was sold and removed from the world.
    TowerRemoved {
        /// Identifier of the tower that was removed.
        tower: TowerId,
        /// Region of cells previously occupied by the tower.
        region: CellRect,
        /// Currency refunded for the sale.
        refund: u32,
    },
    /// Reports that a tower removal request was rejected.
    TowerRemovalRejected {
        /// Identifier of the tower targeted for removal.
        tower: TowerId,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Confirms that a tower parameter advanced by one tier.
    TowerUpgraded {
        /// Identifier of the upgraded tower.
        tower: TowerId,
        /// Parameter that advanced.
        parameter: TowerParameter,
        /// Tier index reached by the parameter.
        level: u32,
        /// Currency charged for the upgrade.
        cost: u32,
    },
    /// Reports that an upgrade request was rejected.
    TowerUpgradeRejected {
        /// Identifier of the tower targeted by the upgrade.
        tower: TowerId,
        /// Parameter requested for upgrade.
        parameter: TowerParameter,
        /// Specific reason the upgrade failed.
        reason: UpgradeError,
    },
    /// Confirms that the world returned to its pristine level state.
    WorldReset,
}

/// Pay/fail gate consulted by the world before charging for construction.
///
/// The world never owns the currency balance; it only asks the gate to spend
/// and refunds through [`Treasury::deposit`] when a tower is sold.
pub trait Treasury {
    /// Attempts to deduct `amount`, returning `false` without side effects
    /// when the balance is insufficient.
    fn try_spend(&mut self, amount: u32) -> bool;

    /// Credits `amount` to the balance.
    fn deposit(&mut self, amount: u32);
}

/// Treasury that accepts every charge, used for sandbox and test setups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnlimitedTreasury;

impl Treasury for UnlimitedTreasury {
    fn try_spend(&mut self, _amount: u32) -> bool {
        true
    }

    fn deposit(&mut self, _amount: u32) {}
}

/// Generation-checked reference to a pooled entity.
///
/// The generation is captured when the handle is created; a handle whose
/// generation differs from the slot's live generation refers to a previous
/// occupant and must be treated as stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotHandle {
    slot: u32,
    generation: u32,
}

impl SlotHandle {
    /// Creates a handle for the provided slot and generation.
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Stable index of the pool slot.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation of the slot occupant at the time the handle was created.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Handle referencing a pooled enemy.
pub type EnemyHandle = SlotHandle;

/// Handle referencing a pooled bullet.
pub type BulletHandle = SlotHandle;

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as row and column coordinates.
///
/// Ordering is row-major.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the neighbouring cell offset by the provided deltas, if it
    /// does not underflow.
    #[must_use]
    pub fn offset(self, row_delta: i32, column_delta: i32) -> Option<CellCoord> {
        let row = self.row.checked_add_signed(row_delta)?;
        let column = self.column.checked_add_signed(column_delta)?;
        Some(CellCoord::new(row, column))
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Upper-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        let row_offset = cell.row().checked_sub(self.origin.row());
        let column_offset = cell.column().checked_sub(self.origin.column());
        matches!(
            (row_offset, column_offset),
            (Some(row), Some(column)) if row < self.size.height() && column < self.size.width()
        )
    }

    /// Reports whether the whole rectangle fits inside a grid of `size`.
    #[must_use]
    pub fn fits_within(&self, size: GridSize) -> bool {
        let bottom = u64::from(self.origin.row()) + u64::from(self.size.height());
        let right = u64::from(self.origin.column()) + u64::from(self.size.width());
        bottom <= u64::from(size.rows()) && right <= u64::from(size.columns())
    }

    /// Iterates every covered cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let origin = self.origin;
        let width = self.size.width();
        (0..self.size.height()).flat_map(move |row| {
            (0..width).filter_map(move |column| {
                Some(CellCoord::new(
                    origin.row().checked_add(row)?,
                    origin.column().checked_add(column)?,
                ))
            })
        })
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Eight-way travel direction used by ground walkers.
///
/// Screen coordinates grow downward, so north means decreasing `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    /// Movement toward decreasing rows.
    North,
    /// Movement up and to the right.
    NorthEast,
    /// Movement toward increasing columns.
    East,
    /// Movement down and to the right.
    SouthEast,
    /// Movement toward increasing rows.
    South,
    /// Movement down and to the left.
    SouthWest,
    /// Movement toward decreasing columns.
    West,
    /// Movement up and to the left.
    NorthWest,
}

impl Heading {
    /// Buckets a pixel delta into one of the eight headings using only the
    /// signs of its components. Returns `None` for a zero delta.
    #[must_use]
    pub fn from_delta(delta: Vec2) -> Option<Self> {
        const EPSILON: f32 = 1.0e-3;
        let sign = |value: f32| {
            if value > EPSILON {
                1
            } else if value < -EPSILON {
                -1
            } else {
                0
            }
        };

        match (sign(delta.x), sign(delta.y)) {
            (1, -1) => Some(Self::NorthEast),
            (1, 0) => Some(Self::East),
            (1, _) => Some(Self::SouthEast),
            (-1, -1) => Some(Self::NorthWest),
            (-1, 0) => Some(Self::West),
            (-1, _) => Some(Self::SouthWest),
            (_, 1) => Some(Self::South),
            (_, -1) => Some(Self::North),
            _ => None,
        }
    }

    /// Orientation in degrees, clockwise from north.
    #[must_use]
    pub const fn degrees(self) -> f32 {
        match self {
            Self::North => 0.0,
            Self::NorthEast => 45.0,
            Self::East => 90.0,
            Self::SouthEast => 135.0,
            Self::South => 180.0,
            Self::SouthWest => 225.0,
            Self::West => 270.0,
            Self::NorthWest => 315.0,
        }
    }

    /// Reports whether the heading moves along both axes at once.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::NorthEast | Self::SouthEast | Self::SouthWest | Self::NorthWest
        )
    }

    /// Unit signs of the heading along the screen axes.
    #[must_use]
    pub const fn axis_signs(self) -> Vec2 {
        match self {
            Self::North => Vec2::new(0.0, -1.0),
            Self::NorthEast => Vec2::new(1.0, -1.0),
            Self::East => Vec2::new(1.0, 0.0),
            Self::SouthEast => Vec2::new(1.0, 1.0),
            Self::South => Vec2::new(0.0, 1.0),
            Self::SouthWest => Vec2::new(-1.0, 1.0),
            Self::West => Vec2::new(-1.0, 0.0),
            Self::NorthWest => Vec2::new(-1.0, -1.0),
        }
    }
}

/// Computes the bearing from `from` toward `to` in degrees clockwise from
/// north, normalised into `[0, 360)`.
#[must_use]
pub fn bearing_degrees(from: Vec2, to: Vec2) -> f32 {
    let delta = to - from;
    (delta.y.atan2(delta.x).to_degrees() + 90.0).rem_euclid(360.0)
}

/// Movement model applied to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    /// Follows a grid path around walls and towers.
    Walker,
    /// Flies in a straight line to the home cell, ignoring walkability.
    Flyer,
}

/// Parameters describing a single enemy spawn request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemySpawn {
    /// Type of the enemy to spawn.
    pub enemy_type: EnemyType,
    /// Cell the enemy starts from.
    pub start: CellCoord,
    /// Travel speed in pixels per second.
    pub speed: f32,
    /// Starting energy.
    pub energy: u32,
    /// Currency awarded when the enemy is destroyed.
    pub bounty: u32,
}

/// Signals that a fixed-capacity pool has no free slot left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[error("entity pool exhausted")]
pub struct PoolExhausted;

/// Reasons a spawn request may be dropped by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum SpawnDropReason {
    /// Every enemy slot is occupied.
    #[error("enemy pool exhausted")]
    PoolExhausted,
    /// The start cell has no route to the home cell.
    #[error("no route from the start cell to home")]
    Unreachable,
    /// The pathfinder gave up before finding a route.
    #[error("pathfinder iteration limit reached")]
    IterationLimitReached,
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested footprint extends beyond the grid bounds.
    #[error("footprint extends beyond the grid")]
    OutOfBounds,
    /// The requested footprint overlaps a cell that is not empty.
    #[error("footprint overlaps an occupied cell")]
    Occupied,
    /// The footprint would cut every route from a start base to home.
    #[error("footprint would block every route home")]
    PathBlocked,
    /// No tower class with the requested identifier exists.
    #[error("unknown tower class")]
    UnknownClass,
    /// The treasury refused to pay for the tower.
    #[error("insufficient currency")]
    InsufficientCurrency,
}

/// Reasons a tower removal request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum RemovalError {
    /// No tower with the provided identifier exists.
    #[error("no such tower")]
    MissingTower,
}

/// Reasons a tower upgrade request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum UpgradeError {
    /// No tower with the provided identifier exists.
    #[error("no such tower")]
    MissingTower,
    /// The tower's class offers a single tier for the parameter.
    #[error("parameter cannot be upgraded")]
    NotUpgradeable,
    /// The parameter already reached its last tier.
    #[error("parameter already at its last tier")]
    MaxLevel,
    /// The treasury refused to pay for the upgrade.
    #[error("insufficient currency")]
    InsufficientCurrency,
}

/// Immutable representation of a single enemy used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Handle of the enemy.
    pub handle: EnemyHandle,
    /// Type of the enemy.
    pub enemy_type: EnemyType,
    /// Movement model driving the enemy.
    pub movement: MovementKind,
    /// Centre of the enemy in pixels.
    pub position: Vec2,
    /// Orientation in degrees clockwise from north.
    pub orientation: f32,
    /// Side length of the enemy sprite in pixels.
    pub size: f32,
    /// Travel speed in pixels per second.
    pub speed: f32,
    /// Remaining energy.
    pub energy: u32,
    /// Energy the enemy spawned with.
    pub max_energy: u32,
    /// Currency awarded when the enemy is destroyed.
    pub bounty: u32,
    /// Cell the enemy is heading for.
    pub target: CellCoord,
    /// Number of waypoints left in the enemy's path.
    pub remaining_waypoints: usize,
}

/// Immutable representation of a single bullet used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct BulletSnapshot {
    /// Handle of the bullet.
    pub handle: BulletHandle,
    /// Tower that fired the bullet.
    pub tower: TowerId,
    /// Enemy captured at fire time.
    pub target: EnemyHandle,
    /// Current position in pixels.
    pub position: Vec2,
    /// Point the bullet is flying toward.
    pub destination: Vec2,
    /// Damage dealt on a valid hit.
    pub damage: u32,
    /// Whether the target was recycled since the bullet was fired.
    pub lost: bool,
}

/// Immutable representation of a single tower used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Class of the tower.
    pub class: TowerClassId,
    /// Region of cells occupied by the tower.
    pub region: CellRect,
    /// Centre of the footprint in pixels.
    pub center: Vec2,
    /// Orientation in degrees clockwise from north.
    pub orientation: f32,
    /// Effective damage per bullet.
    pub damage: u32,
    /// Effective targeting range in pixels.
    pub range: f32,
    /// Effective time between shots.
    pub reload: Duration,
    /// Time left before the tower may fire again.
    pub reload_remaining: Duration,
    /// Current tier index of every upgradeable parameter.
    pub levels: UpgradeLevels,
}

impl TowerSnapshot {
    /// Reports whether the tower finished reloading.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.reload_remaining.is_zero()
    }
}

/// Read-only snapshot describing all living enemies.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.handle.slot());
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured enemies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no enemy is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Read-only snapshot describing all bullets in flight.
#[derive(Clone, Debug, Default)]
pub struct BulletView {
    snapshots: Vec<BulletSnapshot>,
}

impl BulletView {
    /// Creates a new bullet view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<BulletSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.handle.slot());
        Self { snapshots }
    }

    /// Iterator over the captured bullet snapshots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &BulletSnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured bullets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no bullet is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<BulletSnapshot> {
        self.snapshots
    }
}

/// Read-only snapshot describing all towers placed on the grid.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured towers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no tower is placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(3, 4);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn offset_refuses_to_underflow() {
        let corner = CellCoord::new(0, 0);
        assert_eq!(corner.offset(-1, 0), None);
        assert_eq!(corner.offset(1, 1), Some(CellCoord::new(1, 1)));
    }

    #[test]
    fn cell_rect_enumerates_footprint() {
        let rect =
            CellRect::from_origin_and_size(CellCoord::new(2, 3), CellRectSize::new(2, 2));
        let cells: Vec<_> = rect.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(2, 3),
                CellCoord::new(2, 4),
                CellCoord::new(3, 3),
                CellCoord::new(3, 4),
            ]
        );
        assert!(rect.contains(CellCoord::new(3, 4)));
        assert!(!rect.contains(CellCoord::new(4, 4)));
        assert!(rect.fits_within(GridSize::new(4, 5)));
        assert!(!rect.fits_within(GridSize::new(4, 4)));
    }

    #[test]
    fn heading_buckets_follow_delta_signs() {
        assert_eq!(Heading::from_delta(Vec2::new(5.0, -5.0)), Some(Heading::NorthEast));
        assert_eq!(Heading::from_delta(Vec2::new(0.0, 25.0)), Some(Heading::South));
        assert_eq!(Heading::from_delta(Vec2::new(-3.0, 0.0)), Some(Heading::West));
        assert_eq!(Heading::from_delta(Vec2::ZERO), None);
        assert!(Heading::SouthWest.is_diagonal());
        assert!(!Heading::North.is_diagonal());
    }

    #[test]
    fn bearing_points_clockwise_from_north() {
        let origin = Vec2::new(10.0, 10.0);
        assert!((bearing_degrees(origin, Vec2::new(10.0, 0.0)) - 0.0).abs() < 1.0e-3);
        assert!((bearing_degrees(origin, Vec2::new(20.0, 10.0)) - 90.0).abs() < 1.0e-3);
        assert!((bearing_degrees(origin, Vec2::new(10.0, 20.0)) - 180.0).abs() < 1.0e-3);
        assert!((bearing_degrees(origin, Vec2::new(0.0, 10.0)) - 270.0).abs() < 1.0e-3);
    }

    #[test]
    fn unlimited_treasury_always_pays() {
        let mut treasury = UnlimitedTreasury;
        assert!(treasury.try_spend(u32::MAX));
        treasury.deposit(5);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn build_order_round_trips_through_bincode() {
        assert_round_trip(&BuildOrder::PlaceTower {
            class: TowerClassId::new("normal"),
            origin: CellCoord::new(4, 7),
        });
        assert_round_trip(&BuildOrder::UpgradeTower {
            tower: TowerId::new(3),
            parameter: TowerParameter::Reload,
        });
    }

    #[test]
    fn rejection_reasons_round_trip_through_bincode() {
        assert_round_trip(&PlacementError::PathBlocked);
        assert_round_trip(&UpgradeError::MaxLevel);
        assert_round_trip(&SpawnDropReason::PoolExhausted);
    }

    #[test]
    fn slot_handle_round_trips_through_bincode() {
        assert_round_trip(&SlotHandle::new(4, 9));
    }

    #[test]
    fn rejection_reasons_render_messages() {
        assert_eq!(
            PlacementError::InsufficientCurrency.to_string(),
            "insufficient currency"
        );
        assert_eq!(PoolExhausted.to_string(), "entity pool exhausted");
    }
}
