//! Authoritative tower state and upgrade bookkeeping.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use bastion_core::{
    bearing_degrees, CellCoord, CellRect, TowerClass, TowerId, TowerParameter, TowerSnapshot,
    UpgradeError, UpgradeLevels,
};
use glam::Vec2;

/// Tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    id: TowerId,
    class: Arc<TowerClass>,
    region: CellRect,
    center: Vec2,
    orientation: f32,
    levels: UpgradeLevels,
    damage: u32,
    range: f32,
    reload: Duration,
    reload_remaining: Duration,
    /// Part of the latest frame left over after the countdown reached zero.
    overshoot: Duration,
}

impl TowerState {
    fn new(id: TowerId, class: Arc<TowerClass>, region: CellRect, center: Vec2) -> Self {
        let mut tower = Self {
            id,
            class,
            region,
            center,
            orientation: 0.0,
            levels: UpgradeLevels::default(),
            damage: 0,
            range: 0.0,
            reload: Duration::ZERO,
            reload_remaining: Duration::ZERO,
            overshoot: Duration::ZERO,
        };
        tower.refresh();
        tower
    }

    pub(crate) fn class(&self) -> &TowerClass {
        &self.class
    }

    pub(crate) fn region(&self) -> CellRect {
        self.region
    }

    pub(crate) fn center(&self) -> Vec2 {
        self.center
    }

    pub(crate) fn damage(&self) -> u32 {
        self.damage
    }

    pub(crate) fn range(&self) -> f32 {
        self.range
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.reload_remaining.is_zero()
    }

    /// Recomputes the effective parameter values from the current tiers.
    fn refresh(&mut self) {
        let value = |parameter: TowerParameter| {
            self.class
                .ladder(parameter)
                .tier(self.levels.get(parameter))
                .map_or(0, |tier| tier.value)
        };
        self.damage = value(TowerParameter::Damage);
        self.range = value(TowerParameter::Range) as f32;
        self.reload = Duration::from_millis(u64::from(value(TowerParameter::Reload)));
    }

    /// Level and cost of the next tier of `parameter`.
    pub(crate) fn next_tier(&self, parameter: TowerParameter) -> Result<(u32, u32), UpgradeError> {
        let ladder = self.class.ladder(parameter);
        if ladder.max_level() == 0 {
            return Err(UpgradeError::NotUpgradeable);
        }
        let next = self.levels.get(parameter).saturating_add(1);
        let tier = ladder.tier(next).ok_or(UpgradeError::MaxLevel)?;
        Ok((next, tier.cost))
    }

    /// Moves `parameter` to `level` and refreshes the effective values.
    pub(crate) fn set_level(&mut self, parameter: TowerParameter, level: u32) {
        self.levels.set(parameter, level);
        self.refresh();
    }

    pub(crate) fn count_down(&mut self, dt: Duration) {
        self.overshoot = if self.reload_remaining.is_zero() {
            Duration::ZERO
        } else {
            dt.saturating_sub(self.reload_remaining)
        };
        self.reload_remaining = self.reload_remaining.saturating_sub(dt);
    }

    /// Turns toward `target` and restarts the reload countdown, crediting
    /// time the countdown overran during the frame it became ready.
    pub(crate) fn fire_at(&mut self, target: Vec2) {
        self.orientation = bearing_degrees(self.center, target);
        self.reload_remaining = self.reload.saturating_sub(self.overshoot);
        self.overshoot = Duration::ZERO;
    }

    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            class: self.class.id().clone(),
            region: self.region,
            center: self.center,
            orientation: self.orientation,
            damage: self.damage,
            range: self.range,
            reload: self.reload,
            reload_remaining: self.reload_remaining,
            levels: self.levels,
        }
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Stores a new tower and returns its identifier.
    pub(crate) fn insert(&mut self, class: Arc<TowerClass>, region: CellRect, center: Vec2) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().wrapping_add(1));
        let _ = self
            .entries
            .insert(id, TowerState::new(id, class, region, center));
        id
    }

    pub(crate) fn remove(&mut self, id: TowerId) -> Option<TowerState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TowerState> {
        self.entries.values_mut()
    }

    /// Tower whose footprint covers the cell.
    pub(crate) fn tower_at(&self, cell: CellCoord) -> Option<TowerId> {
        self.entries
            .values()
            .find(|tower| tower.region.contains(cell))
            .map(|tower| tower.id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops every tower. Identifiers keep counting up so stale ids held by
    /// adapters never alias a new tower.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::{CellRectSize, TowerClassId, UpgradeTier};

    fn class() -> Arc<TowerClass> {
        let class = TowerClass::from_tiers(TowerClassId::new("normal"), 10, |parameter| {
            match parameter {
                TowerParameter::Damage => vec![UpgradeTier::new(10, 0), UpgradeTier::new(20, 5)],
                TowerParameter::Range => vec![UpgradeTier::new(100, 0)],
                TowerParameter::Reload => vec![UpgradeTier::new(500, 0)],
            }
        })
        .expect("valid class");
        Arc::new(class)
    }

    fn region() -> CellRect {
        CellRect::from_origin_and_size(CellCoord::new(1, 2), CellRectSize::new(2, 2))
    }

    #[test]
    fn registry_allocates_increasing_identifiers() {
        let mut registry = TowerRegistry::new();
        let first = registry.insert(class(), region(), Vec2::ZERO);
        let second = registry.insert(class(), region(), Vec2::ZERO);
        assert_eq!(first, TowerId::new(0));
        assert_eq!(second, TowerId::new(1));

        registry.clear();
        let third = registry.insert(class(), region(), Vec2::ZERO);
        assert_eq!(third, TowerId::new(2));
    }

    #[test]
    fn new_tower_uses_base_tiers_and_is_ready() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(class(), region(), Vec2::new(75.0, 50.0));
        let tower = registry.get(id).expect("tower stored");
        assert_eq!(tower.damage(), 10);
        assert_eq!(tower.range(), 100.0);
        assert!(tower.is_ready());
        assert_eq!(registry.tower_at(CellCoord::new(2, 3)), Some(id));
        assert_eq!(registry.tower_at(CellCoord::new(0, 0)), None);
    }

    #[test]
    fn next_tier_reports_ladder_limits() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(class(), region(), Vec2::ZERO);
        let tower = registry.get_mut(id).expect("tower stored");

        assert_eq!(tower.next_tier(TowerParameter::Damage), Ok((1, 5)));
        assert_eq!(
            tower.next_tier(TowerParameter::Range),
            Err(UpgradeError::NotUpgradeable)
        );

        tower.set_level(TowerParameter::Damage, 1);
        assert_eq!(tower.damage(), 20);
        assert_eq!(
            tower.next_tier(TowerParameter::Damage),
            Err(UpgradeError::MaxLevel)
        );
    }

    #[test]
    fn firing_restarts_reload_countdown() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(class(), region(), Vec2::ZERO);
        let tower = registry.get_mut(id).expect("tower stored");

        tower.fire_at(Vec2::new(10.0, 0.0));
        assert!(!tower.is_ready());
        assert_eq!(tower.snapshot().orientation, 90.0);

        tower.count_down(Duration::from_millis(300));
        assert!(!tower.is_ready());
        tower.count_down(Duration::from_millis(300));
        assert!(tower.is_ready());
    }

    #[test]
    fn reload_overshoot_carries_into_the_next_countdown() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(class(), region(), Vec2::ZERO);
        let tower = registry.get_mut(id).expect("tower stored");

        tower.fire_at(Vec2::new(10.0, 0.0));
        tower.count_down(Duration::from_millis(300));
        tower.count_down(Duration::from_millis(300));
        assert!(tower.is_ready());
        tower.fire_at(Vec2::new(10.0, 0.0));
        assert_eq!(
            tower.snapshot().reload_remaining,
            Duration::from_millis(400),
            "100ms overrun of the 500ms reload is credited"
        );

        tower.count_down(Duration::from_millis(400));
        tower.count_down(Duration::from_millis(300));
        tower.fire_at(Vec2::new(10.0, 0.0));
        assert_eq!(
            tower.snapshot().reload_remaining,
            Duration::from_millis(500),
            "frames spent idle while ready are not credited"
        );
    }
}
