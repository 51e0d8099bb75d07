//! Bullet flight and target-loss detection.

use std::time::Duration;

use bastion_core::{BulletHandle, BulletSnapshot, EnemyHandle, TowerId};
use glam::Vec2;

use crate::{enemies::Enemy, pool::Pool};

/// Result of advancing a bullet by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FlightOutcome {
    InFlight,
    /// Arrived next to a target that is still the enemy it was fired at.
    Hit,
    /// Arrived at the last known position of a recycled target.
    Expired,
}

#[derive(Clone, Debug)]
pub(crate) struct Bullet {
    tower: TowerId,
    target: EnemyHandle,
    position: Vec2,
    destination: Vec2,
    speed: f32,
    damage: u32,
    lost: bool,
}

impl Bullet {
    pub(crate) fn new(
        tower: TowerId,
        target: EnemyHandle,
        origin: Vec2,
        destination: Vec2,
        speed: f32,
        damage: u32,
    ) -> Self {
        Self {
            tower,
            target,
            position: origin,
            destination,
            speed,
            damage,
            lost: false,
        }
    }

    pub(crate) fn target(&self) -> EnemyHandle {
        self.target
    }

    pub(crate) fn damage(&self) -> u32 {
        self.damage
    }

    /// Tracks the target while it is alive, then flies toward the
    /// destination and reports whether it arrived within `hit_radius`.
    pub(crate) fn step(
        &mut self,
        handle: BulletHandle,
        enemies: &Pool<Enemy>,
        dt: Duration,
        hit_radius: f32,
    ) -> FlightOutcome {
        if !self.lost {
            match enemies.get(self.target) {
                Some(enemy) => self.destination = enemy.position(),
                None => {
                    self.lost = true;
                    tracing::debug!(
                        bullet = ?handle,
                        target = ?self.target,
                        "bullet lost its target"
                    );
                }
            }
        }

        let offset = self.destination - self.position;
        let remaining = offset.length();
        let travel = self.speed * dt.as_secs_f32();
        if travel >= remaining {
            self.position = self.destination;
        } else {
            self.position += offset / remaining * travel;
        }

        if self.position.distance(self.destination) >= hit_radius {
            FlightOutcome::InFlight
        } else if self.lost {
            FlightOutcome::Expired
        } else {
            FlightOutcome::Hit
        }
    }

    pub(crate) fn snapshot(&self, handle: BulletHandle) -> BulletSnapshot {
        BulletSnapshot {
            handle,
            tower: self.tower,
            target: self.target,
            position: self.position,
            destination: self.destination,
            damage: self.damage,
            lost: self.lost,
        }
    }
}
