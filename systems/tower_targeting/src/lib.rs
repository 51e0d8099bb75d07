#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that picks the nearest enemy for every ready tower.

use bastion_core::{Command, EnemyHandle, EnemyView, TowerView};
use glam::Vec2;

/// Tower targeting system that reuses a scratch buffer to avoid repeated
/// allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    enemy_workspace: Vec<EnemyCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a [`Command::FireBullet`] for every ready tower whose nearest
    /// enemy lies within range.
    ///
    /// Enemies are scanned in slot order and only a strictly closer enemy
    /// replaces the current best, so equidistant enemies resolve to the lowest
    /// slot.
    pub fn handle(&mut self, towers: &TowerView, enemies: &EnemyView, out: &mut Vec<Command>) {
        if towers.is_empty() || enemies.is_empty() {
            return;
        }

        self.enemy_workspace.clear();
        self.enemy_workspace
            .extend(enemies.iter().map(|snapshot| EnemyCandidate {
                handle: snapshot.handle,
                position: snapshot.position,
            }));

        for tower in towers.iter().filter(|tower| tower.is_ready()) {
            if let Some(target) = self.nearest_within(tower.center, tower.range) {
                out.push(Command::FireBullet {
                    tower: tower.id,
                    target,
                });
            }
        }
    }

    fn nearest_within(&self, center: Vec2, range: f32) -> Option<EnemyHandle> {
        let mut best: Option<(f32, EnemyHandle)> = None;
        for candidate in &self.enemy_workspace {
            let distance = center.distance_squared(candidate.position);
            if best.map_or(true, |(closest, _)| distance < closest) {
                best = Some((distance, candidate.handle));
            }
        }
        best.filter(|&(distance, _)| distance <= range * range)
            .map(|(_, handle)| handle)
    }
}

#[derive(Clone, Copy, Debug)]
struct EnemyCandidate {
    handle: EnemyHandle,
    position: Vec2,
}
