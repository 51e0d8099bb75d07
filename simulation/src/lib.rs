#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-by-frame orchestration of a Bastion level.
//!
//! A [`Simulation`] owns the world together with the systems that drive it and
//! advances them in a fixed order every frame: clock, wave scheduler, enemy
//! movement, tower reload and targeting, then bullets. Enemies spawned during a
//! frame are hidden from that frame's targeting pass.

mod session;

use std::time::Duration;

use bastion_core::{BuildOrder, Command, EnemyHandle, EnemyView, Event, Level, TowerCatalog};
use bastion_system_spawning::{Phase, WaveScheduler};
use bastion_system_tower_targeting::TowerTargeting;
use bastion_world::{self as world, query, World};

pub use session::Session;

/// Aggregated configuration of the world and the systems driving it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    world: world::Config,
    spawning: bastion_system_spawning::Config,
    max_frame_ms: u64,
}

impl Config {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            world: world::Config::new(),
            spawning: bastion_system_spawning::Config::default(),
            max_frame_ms: 100,
        }
    }

    /// Replaces the world configuration.
    #[must_use]
    pub fn with_world(mut self, world: world::Config) -> Self {
        self.world = world;
        self
    }

    /// Replaces the wave scheduler configuration.
    #[must_use]
    pub fn with_spawning(mut self, spawning: bastion_system_spawning::Config) -> Self {
        self.spawning = spawning;
        self
    }

    /// Caps the simulated time a single frame may consume.
    #[must_use]
    pub fn with_max_frame_time(mut self, max_frame_time: Duration) -> Self {
        self.max_frame_ms = u64::try_from(max_frame_time.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// World configuration.
    #[must_use]
    pub fn world(&self) -> world::Config {
        self.world
    }

    /// Wave scheduler configuration.
    #[must_use]
    pub fn spawning(&self) -> bastion_system_spawning::Config {
        self.spawning
    }

    /// Longest simulated time a single frame may consume.
    #[must_use]
    pub fn max_frame_time(&self) -> Duration {
        Duration::from_millis(self.max_frame_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The level is still being played.
    InProgress,
    /// Every wave was sent and every enemy is gone.
    Victory,
    /// Every life was lost.
    Defeat,
}

/// Running level: world, wave scheduler, targeting and player session.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    scheduler: WaveScheduler,
    targeting: TowerTargeting,
    session: Session,
    outcome: Outcome,
    max_frame_time: Duration,
    events: Vec<Event>,
    commands: Vec<Command>,
}

impl Simulation {
    /// Creates a simulation for the level with an idle wave schedule.
    #[must_use]
    pub fn new(level: Level, catalog: TowerCatalog, config: Config) -> Self {
        let session = Session::new(level.lives(), level.bucks());
        Self {
            world: World::new(level, catalog, config.world),
            scheduler: WaveScheduler::new(config.spawning),
            targeting: TowerTargeting::new(),
            session,
            outcome: Outcome::InProgress,
            max_frame_time: config.max_frame_time(),
            events: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// World driven by the simulation.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Lives and currency of the player.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Wave scheduler state.
    #[must_use]
    pub fn scheduler(&self) -> &WaveScheduler {
        &self.scheduler
    }

    /// Current result of the level.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Waves that have not been started yet.
    #[must_use]
    pub fn remaining_waves(&self) -> usize {
        self.scheduler.remaining_waves(query::level(&self.world))
    }

    /// Starts the wave schedule.
    pub fn start(&mut self) {
        self.scheduler.start(query::level(&self.world));
    }

    /// Starts the next wave without waiting for its timer.
    pub fn send_next_wave(&mut self) -> bool {
        if self.outcome != Outcome::InProgress {
            return false;
        }
        self.scheduler.send_next_wave(query::level(&self.world))
    }

    /// Advances the level by `dt`, capped at the configured frame time, and
    /// returns the events of the frame. Does nothing once the outcome is
    /// decided.
    pub fn step(&mut self, dt: Duration) -> &[Event] {
        self.events.clear();
        if self.outcome != Outcome::InProgress {
            return &self.events;
        }

        let dt = if dt > self.max_frame_time {
            tracing::debug!(?dt, cap = ?self.max_frame_time, "frame time capped");
            self.max_frame_time
        } else {
            dt
        };

        world::apply(&mut self.world, Command::Tick { dt }, &mut self.events);

        self.commands.clear();
        self.scheduler.handle(
            &self.events,
            query::level(&self.world),
            &mut self.commands,
        );
        let spawn_start = self.events.len();
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }
        let spawned: Vec<EnemyHandle> = self.events[spawn_start..]
            .iter()
            .filter_map(|event| match event {
                Event::EnemySpawned { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .collect();

        world::apply(&mut self.world, Command::StepEnemies, &mut self.events);
        world::apply(&mut self.world, Command::ReloadTowers, &mut self.events);

        let enemies = query::enemy_view(&self.world);
        let enemies = if spawned.is_empty() {
            enemies
        } else {
            EnemyView::from_snapshots(
                enemies
                    .into_vec()
                    .into_iter()
                    .filter(|snapshot| !spawned.contains(&snapshot.handle))
                    .collect(),
            )
        };
        self.targeting.handle(
            &query::tower_view(&self.world),
            &enemies,
            &mut self.commands,
        );
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }

        world::apply(&mut self.world, Command::StepBullets, &mut self.events);

        self.session.record(&self.events);
        self.evaluate_outcome();
        &self.events
    }

    /// Executes a construction order paid from the session. Ignored once the
    /// outcome is decided.
    pub fn build(&mut self, order: BuildOrder) -> &[Event] {
        self.events.clear();
        if self.outcome == Outcome::InProgress {
            world::build(&mut self.world, order, &mut self.session, &mut self.events);
            self.session.record(&self.events);
        }
        &self.events
    }

    /// Restarts the level: pristine grid, empty pools, idle schedule and the
    /// level's starting lives and currency.
    pub fn reset(&mut self) -> &[Event] {
        self.events.clear();
        world::apply(&mut self.world, Command::Reset, &mut self.events);
        self.scheduler.reset();
        let level = query::level(&self.world);
        self.session = Session::new(level.lives(), level.bucks());
        self.outcome = Outcome::InProgress;
        &self.events
    }

    fn evaluate_outcome(&mut self) {
        let outcome = if self.session.is_defeated() {
            Outcome::Defeat
        } else if self.scheduler.phase() == Phase::AllWavesSent
            && query::alive_enemies(&self.world) == 0
        {
            Outcome::Victory
        } else {
            Outcome::InProgress
        };

        if outcome != Outcome::InProgress {
            tracing::info!(
                ?outcome,
                lives = self.session.lives(),
                bucks = self.session.bucks(),
                destroyed = self.session.destroyed(),
                tick = query::tick_index(&self.world),
                "level finished"
            );
        }
        self.outcome = outcome;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_caps_frames_at_one_hundred_milliseconds() {
        let config = Config::default();
        assert_eq!(config.max_frame_time(), Duration::from_millis(100));
        let config = config.with_max_frame_time(Duration::from_millis(40));
        assert_eq!(config.max_frame_time(), Duration::from_millis(40));
    }
}
