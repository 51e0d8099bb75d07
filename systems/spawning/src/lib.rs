#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave scheduler responsible for emitting enemy spawn commands.
//!
//! Every started wave owns a spawn accumulator that fires one spawn whenever
//! it reaches the wave's spawn interval. A separate accumulator measures time
//! since the latest wave started and begins the next wave once that wave's
//! inter-wave wait elapsed. Waves that are still spawning when the next one
//! begins keep spawning alongside it.

use std::time::Duration;

use bastion_core::{CellCoord, Command, EnemySpawn, Event, Level, Wave};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

/// Configuration parameters required to construct the wave scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Seed used when none is configured.
    pub const DEFAULT_SEED: u64 = 0x6261_7374_696f_6e21;

    /// Creates a configuration that selects start points using `rng_seed`.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }

    /// Seed of the start-point generator.
    #[must_use]
    pub const fn rng_seed(&self) -> u64 {
        self.rng_seed
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

/// Coarse state of the schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The schedule has not been started.
    Idle,
    /// At least one started wave still has enemies to spawn.
    WaveActive,
    /// Every started wave finished spawning; the next wave waits for its
    /// timer or a manual trigger.
    AwaitingAdvance,
    /// Every wave has been started and fully spawned.
    AllWavesSent,
}

#[derive(Clone, Copy, Debug)]
struct ActiveWave {
    index: usize,
    remaining: u32,
    since_spawn: Duration,
}

/// Pure system that turns elapsed time into spawn commands.
#[derive(Debug)]
pub struct WaveScheduler {
    seed: u64,
    rng: ChaCha8Rng,
    started: bool,
    wave_count: usize,
    next_wave: usize,
    since_wave_start: Duration,
    active: Vec<ActiveWave>,
}

impl WaveScheduler {
    /// Creates an idle scheduler using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            seed: config.rng_seed,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            started: false,
            wave_count: 0,
            next_wave: 0,
            since_wave_start: Duration::ZERO,
            active: Vec::new(),
        }
    }

    /// Current coarse state of the schedule.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if !self.started {
            Phase::Idle
        } else if !self.active.is_empty() {
            Phase::WaveActive
        } else if self.has_pending_wave() {
            Phase::AwaitingAdvance
        } else {
            Phase::AllWavesSent
        }
    }

    /// Starts the first wave. Does nothing unless the scheduler is idle.
    pub fn start(&mut self, level: &Level) {
        if !self.started {
            self.begin_next_wave(level);
        }
    }

    /// Starts the next wave immediately, starting the schedule if it was
    /// idle. Returns `false` when every wave has already been started.
    pub fn send_next_wave(&mut self, level: &Level) -> bool {
        let pending = self.next_wave < level.waves().len();
        self.begin_next_wave(level);
        pending
    }

    /// Consumes events and emits a spawn command for every wave whose spawn
    /// interval elapsed.
    pub fn handle(&mut self, events: &[Event], level: &Level, out: &mut Vec<Command>) {
        if !self.started {
            return;
        }

        let dt = events
            .iter()
            .filter_map(|event| match event {
                Event::TimeAdvanced { dt, .. } => Some(*dt),
                _ => None,
            })
            .fold(Duration::ZERO, Duration::saturating_add);
        if dt.is_zero() {
            return;
        }

        let waves = level.waves();
        for index in 0..self.active.len() {
            let active = &mut self.active[index];
            let Some(wave) = waves.get(active.index) else {
                active.remaining = 0;
                continue;
            };
            active.since_spawn = active.since_spawn.saturating_add(dt);
            if active.since_spawn < wave.spawn_interval {
                continue;
            }
            active.since_spawn -= wave.spawn_interval;
            active.remaining = active.remaining.saturating_sub(1);
            let number = active.index + 1;
            let points = level.start_bases().points(wave.start_base);
            if let Some(start) = self.pick_start(points) {
                tracing::debug!(wave = number, ?start, "spawning enemy");
                out.push(Command::SpawnEnemy {
                    spawn: spawn_for(wave, start),
                });
            }
        }
        self.active.retain(|wave| wave.remaining > 0);

        if let Some(latest) = self.next_wave.checked_sub(1).and_then(|index| waves.get(index)) {
            if self.has_pending_wave() {
                self.since_wave_start = self.since_wave_start.saturating_add(dt);
                if self.since_wave_start >= latest.inter_wave_wait {
                    self.begin_next_wave(level);
                }
            }
        }
    }

    /// Number of waves that have not been started yet.
    #[must_use]
    pub fn remaining_waves(&self, level: &Level) -> usize {
        level.waves().len().saturating_sub(self.next_wave)
    }

    /// Enemies still to be spawned by the started waves.
    #[must_use]
    pub fn remaining_in_wave(&self) -> u32 {
        self.active.iter().map(|wave| wave.remaining).sum()
    }

    /// Number of waves started so far.
    #[must_use]
    pub fn waves_started(&self) -> usize {
        self.next_wave
    }

    /// Returns the scheduler to [`Phase::Idle`] and reseeds the generator so a
    /// restarted level replays the same start points.
    pub fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.started = false;
        self.wave_count = 0;
        self.next_wave = 0;
        self.since_wave_start = Duration::ZERO;
        self.active.clear();
    }

    fn begin_next_wave(&mut self, level: &Level) {
        self.started = true;
        self.wave_count = level.waves().len();
        let Some(wave) = level.waves().get(self.next_wave) else {
            return;
        };

        tracing::info!(
            wave = self.next_wave + 1,
            of = level.waves().len(),
            enemy_type = wave.enemy_type.name(),
            count = wave.enemy_count,
            base = wave.start_base.get(),
            "wave started"
        );
        if wave.enemy_count > 0 {
            self.active.push(ActiveWave {
                index: self.next_wave,
                remaining: wave.enemy_count,
                since_spawn: Duration::ZERO,
            });
        }
        self.next_wave += 1;
        self.since_wave_start = Duration::ZERO;
    }

    fn has_pending_wave(&self) -> bool {
        self.next_wave < self.wave_count
    }

    fn pick_start(&mut self, points: &[CellCoord]) -> Option<CellCoord> {
        if points.is_empty() {
            tracing::warn!("wave start base has no start points");
            return None;
        }
        points.get(self.rng.gen_range(0..points.len())).copied()
    }
}

fn spawn_for(wave: &Wave, start: CellCoord) -> EnemySpawn {
    EnemySpawn {
        enemy_type: wave.enemy_type,
        start,
        speed: wave.speed,
        energy: wave.energy,
        bounty: wave.bounty,
    }
}
