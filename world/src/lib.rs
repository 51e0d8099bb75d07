#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Bastion.
//!
//! The world owns the live grid, the enemy and bullet pools, the tower
//! registry and the pathfinder scratch space. It is mutated exclusively
//! through [`apply`] for per-tick simulation commands and [`build`] for player
//! construction orders; everything else reads it through the [`query`]
//! module.

mod bullets;
mod enemies;
mod pool;
mod routing;
mod towers;

use std::time::Duration;

use bastion_core::{
    BuildOrder, CellCoord, CellKind, CellRect, Command, EnemyHandle, EnemySpawn, Event, Grid,
    Level, PlacementError, RemovalError, SpawnDropReason, TowerCatalog, TowerClassId, TowerId,
    TowerParameter, Treasury, UpgradeError,
};
use bastion_system_pathfinding::Pathfinder;
use glam::Vec2;
use serde::Deserialize;

use bullets::{Bullet, FlightOutcome};
use enemies::{Enemy, Geometry, Movement, StepOutcome};
use towers::TowerRegistry;

pub use pool::Pool;

/// Tunable parameters of the world simulation.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    enemy_capacity: u32,
    bullet_capacity: u32,
    cell_size: f32,
    enemy_size: f32,
    bullet_speed: f32,
    bullet_hit_radius: f32,
    flyer_arrival_radius: f32,
    max_path_iterations: u32,
}

impl Config {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enemy_capacity: 256,
            bullet_capacity: 512,
            cell_size: 25.0,
            enemy_size: 25.0,
            bullet_speed: 128.0,
            bullet_hit_radius: 10.0,
            flyer_arrival_radius: 10.0,
            max_path_iterations: 0,
        }
    }

    /// Overrides the number of enemy slots.
    #[must_use]
    pub const fn with_enemy_capacity(mut self, capacity: u32) -> Self {
        self.enemy_capacity = capacity;
        self
    }

    /// Overrides the number of bullet slots.
    #[must_use]
    pub const fn with_bullet_capacity(mut self, capacity: u32) -> Self {
        self.bullet_capacity = capacity;
        self
    }

    /// Overrides the side length of a grid cell in pixels.
    #[must_use]
    pub const fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Overrides the bullet speed in pixels per second.
    #[must_use]
    pub const fn with_bullet_speed(mut self, speed: f32) -> Self {
        self.bullet_speed = speed;
        self
    }

    /// Overrides the pathfinder iteration cap; zero means `rows × columns`.
    #[must_use]
    pub const fn with_max_path_iterations(mut self, max_iterations: u32) -> Self {
        self.max_path_iterations = max_iterations;
        self
    }

    /// Number of enemy slots.
    #[must_use]
    pub const fn enemy_capacity(&self) -> u32 {
        self.enemy_capacity
    }

    /// Number of bullet slots.
    #[must_use]
    pub const fn bullet_capacity(&self) -> u32 {
        self.bullet_capacity
    }

    /// Side length of a grid cell in pixels.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Side length of an enemy in pixels.
    #[must_use]
    pub const fn enemy_size(&self) -> f32 {
        self.enemy_size
    }

    /// Bullet speed in pixels per second.
    #[must_use]
    pub const fn bullet_speed(&self) -> f32 {
        self.bullet_speed
    }

    /// Distance at which a bullet counts as arrived.
    #[must_use]
    pub const fn bullet_hit_radius(&self) -> f32 {
        self.bullet_hit_radius
    }

    /// Distance at which a flyer snaps onto its destination.
    #[must_use]
    pub const fn flyer_arrival_radius(&self) -> f32 {
        self.flyer_arrival_radius
    }

    /// Pathfinder iteration cap; zero means `rows × columns`.
    #[must_use]
    pub const fn max_path_iterations(&self) -> u32 {
        self.max_path_iterations
    }

    fn geometry(&self) -> Geometry {
        Geometry {
            cell_size: self.cell_size,
            flyer_arrival_radius: self.flyer_arrival_radius,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Represents the authoritative Bastion world state.
#[derive(Debug)]
pub struct World {
    level: Level,
    grid: Grid<CellKind>,
    catalog: TowerCatalog,
    config: Config,
    enemies: Pool<Enemy>,
    bullets: Pool<Bullet>,
    towers: TowerRegistry,
    pathfinder: Pathfinder,
    frame_dt: Duration,
    tick_index: u64,
}

impl World {
    /// Creates a world for the level, with its pristine grid and empty pools.
    #[must_use]
    pub fn new(level: Level, catalog: TowerCatalog, config: Config) -> Self {
        Self {
            grid: level.grid().clone(),
            level,
            catalog,
            enemies: Pool::with_capacity(config.enemy_capacity),
            bullets: Pool::with_capacity(config.bullet_capacity),
            config,
            towers: TowerRegistry::new(),
            pathfinder: Pathfinder::new(),
            frame_dt: Duration::ZERO,
            tick_index: 0,
        }
    }

    fn spawn_enemy(&mut self, spawn: EnemySpawn, out_events: &mut Vec<Event>) {
        let dropped = |reason: SpawnDropReason| {
            tracing::warn!(
                enemy_type = spawn.enemy_type.name(),
                start = ?spawn.start,
                %reason,
                "enemy spawn dropped"
            );
            Event::EnemySpawnDropped {
                enemy_type: spawn.enemy_type,
                start: spawn.start,
                reason,
            }
        };

        if self.enemies.is_full() {
            out_events.push(dropped(SpawnDropReason::PoolExhausted));
            return;
        }

        let home = self.level.home();
        let movement = match spawn.enemy_type.movement() {
            bastion_core::MovementKind::Flyer => Movement::flyer(home),
            bastion_core::MovementKind::Walker => {
                match routing::spawn_path(
                    &mut self.pathfinder,
                    &self.grid,
                    spawn.start,
                    home,
                    self.config.max_path_iterations,
                ) {
                    Ok(path) => Movement::walker(path),
                    Err(reason) => {
                        out_events.push(dropped(reason));
                        return;
                    }
                }
            }
        };

        let position = self.config.geometry().cell_center(spawn.start);
        let enemy = Enemy::new(&spawn, position, self.config.enemy_size, home, movement);
        match self.enemies.spawn(enemy) {
            Ok(enemy) => {
                tracing::debug!(?enemy, start = ?spawn.start, "enemy spawned");
                out_events.push(Event::EnemySpawned {
                    enemy,
                    enemy_type: spawn.enemy_type,
                    start: spawn.start,
                });
            }
            Err(_) => out_events.push(dropped(SpawnDropReason::PoolExhausted)),
        }
    }

    fn step_enemies(&mut self, out_events: &mut Vec<Event>) {
        let dt = self.frame_dt;
        let geometry = self.config.geometry();
        self.enemies
            .retain_mut(|enemy, state| match state.step(dt, &geometry) {
                StepOutcome::Travelling => true,
                StepOutcome::ReachedHome => {
                    tracing::debug!(?enemy, "enemy reached home");
                    out_events.push(Event::EnemyReachedHome { enemy });
                    false
                }
            });
    }

    fn reload_towers(&mut self) {
        let dt = self.frame_dt;
        for tower in self.towers.iter_mut() {
            tower.count_down(dt);
        }
    }

    fn fire_bullet(&mut self, tower_id: TowerId, target: EnemyHandle, out_events: &mut Vec<Event>) {
        let Some(tower) = self.towers.get_mut(tower_id) else {
            tracing::debug!(tower = ?tower_id, "fire request for unknown tower ignored");
            return;
        };
        let Some(enemy) = self.enemies.get(target) else {
            tracing::debug!(?target, "fire request for stale target ignored");
            return;
        };
        let aim = enemy.position();
        let in_range = tower.center().distance_squared(aim) <= tower.range() * tower.range();
        if !tower.is_ready() || !in_range {
            return;
        }

        let bullet = Bullet::new(
            tower_id,
            target,
            tower.center(),
            aim,
            self.config.bullet_speed,
            tower.damage(),
        );
        match self.bullets.spawn(bullet) {
            Ok(bullet) => {
                tower.fire_at(aim);
                out_events.push(Event::BulletFired {
                    bullet,
                    tower: tower_id,
                    target,
                });
            }
            Err(_) => {
                tracing::warn!(tower = ?tower_id, "bullet pool exhausted");
                out_events.push(Event::BulletDropped { tower: tower_id });
            }
        }
    }

    fn step_bullets(&mut self, out_events: &mut Vec<Event>) {
        let dt = self.frame_dt;
        let hit_radius = self.config.bullet_hit_radius;
        let enemies = &mut self.enemies;
        self.bullets.retain_mut(|bullet, state| {
            match state.step(bullet, enemies, dt, hit_radius) {
                FlightOutcome::InFlight => return true,
                FlightOutcome::Expired => out_events.push(Event::BulletExpired { bullet }),
                FlightOutcome::Hit => {
                    let target = state.target();
                    let damage = state.damage();
                    out_events.push(Event::BulletHit {
                        bullet,
                        target,
                        damage,
                    });
                    let destroyed = enemies
                        .get_mut(target)
                        .is_some_and(|enemy| enemy.apply_damage(damage));
                    if destroyed {
                        if let Some(enemy) = enemies.release(target) {
                            tracing::debug!(?target, "enemy destroyed");
                            out_events.push(Event::EnemyDestroyed {
                                enemy: target,
                                bounty: enemy.bounty(),
                            });
                        }
                    }
                }
            }
            false
        });
    }

    fn recompute_paths(&mut self, out_events: &mut Vec<Event>) {
        routing::recompute_paths(
            &mut self.pathfinder,
            &self.grid,
            &mut self.enemies,
            self.level.home(),
            &self.config.geometry(),
            self.config.max_path_iterations,
            out_events,
        );
    }

    fn place_tower<T>(
        &mut self,
        class_id: TowerClassId,
        origin: CellCoord,
        treasury: &mut T,
        out_events: &mut Vec<Event>,
    ) where
        T: Treasury + ?Sized,
    {
        match self.validate_placement(&class_id, origin, treasury) {
            Ok((class, region)) => {
                for cell in region.cells() {
                    let previous = self.grid.set(cell, CellKind::Tower);
                    debug_assert_eq!(previous, Some(CellKind::Empty), "footprint cell was not empty");
                }
                let center = self.region_center(region);
                let cost = class.cost();
                let tower = self.towers.insert(class, region, center);
                tracing::info!(?tower, class = %class_id, ?origin, cost, "tower placed");
                out_events.push(Event::TowerPlaced {
                    tower,
                    class: class_id,
                    region,
                    cost,
                });
                self.recompute_paths(out_events);
            }
            Err(reason) => {
                tracing::warn!(class = %class_id, ?origin, %reason, "tower placement rejected");
                out_events.push(Event::TowerPlacementRejected {
                    class: class_id,
                    origin,
                    reason,
                });
            }
        }
    }

    fn validate_placement<T>(
        &mut self,
        class_id: &TowerClassId,
        origin: CellCoord,
        treasury: &mut T,
    ) -> Result<(std::sync::Arc<bastion_core::TowerClass>, CellRect), PlacementError>
    where
        T: Treasury + ?Sized,
    {
        let class = self
            .catalog
            .get(class_id)
            .cloned()
            .ok_or(PlacementError::UnknownClass)?;
        let region = CellRect::from_origin_and_size(origin, class.footprint());
        if !region.fits_within(self.grid.size()) {
            return Err(PlacementError::OutOfBounds);
        }
        if region
            .cells()
            .any(|cell| self.grid.get(cell) != Some(&CellKind::Empty))
        {
            return Err(PlacementError::Occupied);
        }
        if !routing::footprint_keeps_routes(
            &mut self.pathfinder,
            &self.grid,
            self.level.start_bases(),
            self.level.home(),
            region,
            self.config.max_path_iterations,
        ) {
            return Err(PlacementError::PathBlocked);
        }
        if !treasury.try_spend(class.cost()) {
            return Err(PlacementError::InsufficientCurrency);
        }
        Ok((class, region))
    }

    fn remove_tower<T>(&mut self, tower: TowerId, treasury: &mut T, out_events: &mut Vec<Event>)
    where
        T: Treasury + ?Sized,
    {
        let Some(state) = self.towers.remove(tower) else {
            tracing::warn!(?tower, "tower removal rejected");
            out_events.push(Event::TowerRemovalRejected {
                tower,
                reason: RemovalError::MissingTower,
            });
            return;
        };

        let region = state.region();
        for cell in region.cells() {
            let previous = self.grid.set(cell, CellKind::Empty);
            debug_assert_eq!(previous, Some(CellKind::Tower), "footprint cell was not a tower");
        }
        let refund = state.class().refund();
        treasury.deposit(refund);
        tracing::info!(?tower, refund, "tower removed");
        out_events.push(Event::TowerRemoved {
            tower,
            region,
            refund,
        });
        self.recompute_paths(out_events);
    }

    fn upgrade_tower<T>(
        &mut self,
        tower: TowerId,
        parameter: TowerParameter,
        treasury: &mut T,
        out_events: &mut Vec<Event>,
    ) where
        T: Treasury + ?Sized,
    {
        let result = self
            .towers
            .get_mut(tower)
            .ok_or(UpgradeError::MissingTower)
            .and_then(|state| {
                let (level, cost) = state.next_tier(parameter)?;
                if !treasury.try_spend(cost) {
                    return Err(UpgradeError::InsufficientCurrency);
                }
                state.set_level(parameter, level);
                Ok((level, cost))
            });

        match result {
            Ok((level, cost)) => {
                tracing::info!(?tower, parameter = parameter.name(), level, cost, "tower upgraded");
                out_events.push(Event::TowerUpgraded {
                    tower,
                    parameter,
                    level,
                    cost,
                });
            }
            Err(reason) => {
                tracing::warn!(?tower, parameter = parameter.name(), %reason, "tower upgrade rejected");
                out_events.push(Event::TowerUpgradeRejected {
                    tower,
                    parameter,
                    reason,
                });
            }
        }
    }

    fn reset(&mut self, out_events: &mut Vec<Event>) {
        self.grid = self.level.grid().clone();
        self.enemies.clear();
        self.bullets.clear();
        self.towers.clear();
        self.frame_dt = Duration::ZERO;
        self.tick_index = 0;
        tracing::info!(level = self.level.name(), "world reset");
        out_events.push(Event::WorldReset);
    }

    fn region_center(&self, region: CellRect) -> Vec2 {
        let size = self.config.cell_size;
        let origin = region.origin();
        let footprint = region.size();
        Vec2::new(
            (origin.column() as f32 + footprint.width() as f32 / 2.0) * size,
            (origin.row() as f32 + footprint.height() as f32 / 2.0) * size,
        )
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.frame_dt = dt;
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced {
                dt,
                tick: world.tick_index,
            });
        }
        Command::SpawnEnemy { spawn } => world.spawn_enemy(spawn, out_events),
        Command::StepEnemies => world.step_enemies(out_events),
        Command::ReloadTowers => world.reload_towers(),
        Command::FireBullet { tower, target } => world.fire_bullet(tower, target, out_events),
        Command::StepBullets => world.step_bullets(out_events),
        Command::Reset => world.reset(out_events),
    }
}

/// Executes a construction order, charging or refunding through `treasury`.
///
/// Placement is validated in full before the grid changes: bounds, empty
/// footprint, a remaining route home for every start base, then payment.
/// Successful placements and removals re-route every living walker before
/// returning.
pub fn build<T>(world: &mut World, order: BuildOrder, treasury: &mut T, out_events: &mut Vec<Event>)
where
    T: Treasury + ?Sized,
{
    match order {
        BuildOrder::PlaceTower { class, origin } => {
            world.place_tower(class, origin, treasury, out_events)
        }
        BuildOrder::RemoveTower { tower } => world.remove_tower(tower, treasury, out_events),
        BuildOrder::UpgradeTower { tower, parameter } => {
            world.upgrade_tower(tower, parameter, treasury, out_events)
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use bastion_core::{
        BulletView, CellCoord, CellKind, EnemyHandle, EnemySnapshot, EnemyView, Grid, Level,
        StartBaseId, TowerCatalog, TowerId, TowerSnapshot, TowerView,
    };
    use glam::Vec2;

    use super::{Config, World};

    /// Level the world was created from.
    #[must_use]
    pub fn level(world: &World) -> &Level {
        &world.level
    }

    /// Configuration the world runs with.
    #[must_use]
    pub fn config(world: &World) -> &Config {
        &world.config
    }

    /// Tower classes available for placement.
    #[must_use]
    pub fn catalog(world: &World) -> &TowerCatalog {
        &world.catalog
    }

    /// Live grid including tower footprints.
    #[must_use]
    pub fn grid(world: &World) -> &Grid<CellKind> {
        &world.grid
    }

    /// Kind of the cell on the live grid.
    #[must_use]
    pub fn cell_kind(world: &World, cell: CellCoord) -> Option<CellKind> {
        world.grid.get(cell).copied()
    }

    /// Reports whether walkers may currently enter the cell.
    #[must_use]
    pub fn is_walkable(world: &World, cell: CellCoord) -> bool {
        cell_kind(world, cell).is_some_and(CellKind::is_walkable)
    }

    /// Cell every enemy tries to reach.
    #[must_use]
    pub fn home(world: &World) -> CellCoord {
        world.level.home()
    }

    /// Start points of the base in row-major order.
    #[must_use]
    pub fn start_points(world: &World, base: StartBaseId) -> &[CellCoord] {
        world.level.start_bases().points(base)
    }

    /// Pixel centre of the cell.
    #[must_use]
    pub fn cell_center(world: &World, cell: CellCoord) -> Vec2 {
        world.config.geometry().cell_center(cell)
    }

    /// Cell containing the pixel position, if it lies on the grid.
    #[must_use]
    pub fn cell_at(world: &World, position: Vec2) -> Option<CellCoord> {
        world
            .config
            .geometry()
            .cell_containing(position)
            .filter(|cell| world.grid.contains(*cell))
    }

    /// Captures a read-only view of the living enemies.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(
            world
                .enemies
                .iter()
                .map(|(handle, enemy)| enemy.snapshot(handle))
                .collect(),
        )
    }

    /// Snapshot of a single living enemy.
    #[must_use]
    pub fn enemy(world: &World, handle: EnemyHandle) -> Option<EnemySnapshot> {
        world.enemies.get(handle).map(|enemy| enemy.snapshot(handle))
    }

    /// Current generation of an enemy slot, alive or free.
    #[must_use]
    pub fn enemy_generation(world: &World, slot: u32) -> Option<u32> {
        world.enemies.generation(slot)
    }

    /// Number of living enemies.
    #[must_use]
    pub fn alive_enemies(world: &World) -> usize {
        world.enemies.len()
    }

    /// Captures a read-only view of the bullets in flight.
    #[must_use]
    pub fn bullet_view(world: &World) -> BulletView {
        BulletView::from_snapshots(
            world
                .bullets
                .iter()
                .map(|(handle, bullet)| bullet.snapshot(handle))
                .collect(),
        )
    }

    /// Number of bullets in flight.
    #[must_use]
    pub fn bullets_in_flight(world: &World) -> usize {
        world.bullets.len()
    }

    /// Captures a read-only view of the placed towers.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.iter().map(|tower| tower.snapshot()).collect())
    }

    /// Snapshot of a single tower.
    #[must_use]
    pub fn tower(world: &World, id: TowerId) -> Option<TowerSnapshot> {
        world.towers.get(id).map(|tower| tower.snapshot())
    }

    /// Tower whose footprint covers the cell.
    #[must_use]
    pub fn tower_at(world: &World, cell: CellCoord) -> Option<TowerId> {
        world.towers.tower_at(cell)
    }

    /// Number of placed towers.
    #[must_use]
    pub fn tower_count(world: &World) -> usize {
        world.towers.len()
    }

    /// Duration recorded by the most recent tick.
    #[must_use]
    pub fn frame_dt(world: &World) -> Duration {
        world.frame_dt
    }

    /// Number of ticks processed since creation or the last reset.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
