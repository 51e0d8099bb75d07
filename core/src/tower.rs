//! Tower classes, their upgrade ladders and the catalog that shares them.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CellRectSize;

/// Identifier naming a tower class.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerClassId(String);

impl TowerClassId {
    /// Creates a class identifier from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name of the class.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TowerClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Independently upgradeable tower parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerParameter {
    /// Energy removed from an enemy per bullet.
    Damage,
    /// Targeting radius in pixels.
    Range,
    /// Milliseconds between shots.
    Reload,
}

impl TowerParameter {
    /// Every parameter in ladder order.
    pub const ALL: [TowerParameter; 3] = [Self::Damage, Self::Range, Self::Reload];

    /// Lower-case name used in settings files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Damage => "damage",
            Self::Range => "range",
            Self::Reload => "reload",
        }
    }

    /// Looks up a parameter by its lower-case name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|parameter| parameter.name() == name)
    }

    const fn index(self) -> usize {
        match self {
            Self::Damage => 0,
            Self::Range => 1,
            Self::Reload => 2,
        }
    }
}

/// One step of an upgrade ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpgradeTier {
    /// Effective parameter value once the tier is reached.
    pub value: u32,
    /// Currency charged to reach the tier. Ignored for the base tier.
    pub cost: u32,
}

impl UpgradeTier {
    /// Creates a tier from its value and cost.
    #[must_use]
    pub const fn new(value: u32, cost: u32) -> Self {
        Self { value, cost }
    }
}

/// Ordered list of tiers for one parameter. Tier zero is the base value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpgradeLadder {
    tiers: Vec<UpgradeTier>,
}

impl UpgradeLadder {
    /// Wraps the provided tiers, returning `None` when the list is empty.
    #[must_use]
    pub fn new(tiers: Vec<UpgradeTier>) -> Option<Self> {
        (!tiers.is_empty()).then_some(Self { tiers })
    }

    /// Ladder with a single, non-upgradeable tier.
    #[must_use]
    pub fn fixed(value: u32) -> Self {
        Self {
            tiers: vec![UpgradeTier::new(value, 0)],
        }
    }

    /// Tier at the provided level.
    #[must_use]
    pub fn tier(&self, level: u32) -> Option<UpgradeTier> {
        let index = usize::try_from(level).ok()?;
        self.tiers.get(index).copied()
    }

    /// Value of the base tier.
    #[must_use]
    pub fn base_value(&self) -> u32 {
        self.tiers.first().map_or(0, |tier| tier.value)
    }

    /// Highest reachable level.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.tiers.len().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    /// Tiers in ascending order.
    #[must_use]
    pub fn tiers(&self) -> &[UpgradeTier] {
        &self.tiers
    }
}

/// Current tier index of every upgradeable parameter of a tower.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpgradeLevels {
    levels: [u32; 3],
}

impl UpgradeLevels {
    /// Level reached by the parameter.
    #[must_use]
    pub const fn get(&self, parameter: TowerParameter) -> u32 {
        self.levels[parameter.index()]
    }

    /// Overwrites the level reached by the parameter.
    pub fn set(&mut self, parameter: TowerParameter, level: u32) {
        self.levels[parameter.index()] = level;
    }
}

/// Reasons a tower class definition may be invalid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TowerClassError {
    /// A ladder contains no tiers.
    #[error("tower class `{class}` has no {} tiers", .parameter.name())]
    EmptyLadder {
        /// Class being defined.
        class: TowerClassId,
        /// Parameter whose ladder is empty.
        parameter: TowerParameter,
    },
    /// The footprint covers no cells.
    #[error("tower class `{0}` has an empty footprint")]
    EmptyFootprint(TowerClassId),
    /// The sell factor lies outside `[0, 1]`.
    #[error("tower class `{0}` has a sell factor outside [0, 1]")]
    InvalidSellFactor(TowerClassId),
}

/// Static, shared configuration of a kind of tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerClass {
    id: TowerClassId,
    name: String,
    description: String,
    cost: u32,
    sell_factor: f32,
    footprint: CellRectSize,
    ladders: [UpgradeLadder; 3],
}

impl TowerClass {
    /// Default footprint of a tower, two cells square.
    pub const DEFAULT_FOOTPRINT: CellRectSize = CellRectSize::new(2, 2);

    /// Default share of the cost refunded when the tower is sold.
    pub const DEFAULT_SELL_FACTOR: f32 = 0.5;

    /// Creates a class from its damage, range and reload ladders.
    pub fn new(
        id: TowerClassId,
        cost: u32,
        damage: UpgradeLadder,
        range: UpgradeLadder,
        reload: UpgradeLadder,
    ) -> Self {
        Self {
            name: id.as_str().to_owned(),
            id,
            description: String::new(),
            cost,
            sell_factor: Self::DEFAULT_SELL_FACTOR,
            footprint: Self::DEFAULT_FOOTPRINT,
            ladders: [damage, range, reload],
        }
    }

    /// Builds a class from raw tier lists, validating every ladder.
    pub fn from_tiers(
        id: TowerClassId,
        cost: u32,
        mut tiers: impl FnMut(TowerParameter) -> Vec<UpgradeTier>,
    ) -> Result<Self, TowerClassError> {
        let mut ladder = |parameter| {
            UpgradeLadder::new(tiers(parameter)).ok_or_else(|| TowerClassError::EmptyLadder {
                class: id.clone(),
                parameter,
            })
        };
        let damage = ladder(TowerParameter::Damage)?;
        let range = ladder(TowerParameter::Range)?;
        let reload = ladder(TowerParameter::Reload)?;
        Ok(Self::new(id, cost, damage, range, reload))
    }

    /// Replaces the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replaces the footprint.
    pub fn with_footprint(mut self, footprint: CellRectSize) -> Result<Self, TowerClassError> {
        if footprint.width() == 0 || footprint.height() == 0 {
            return Err(TowerClassError::EmptyFootprint(self.id));
        }
        self.footprint = footprint;
        Ok(self)
    }

    /// Replaces the sell factor.
    pub fn with_sell_factor(mut self, sell_factor: f32) -> Result<Self, TowerClassError> {
        if !(0.0..=1.0).contains(&sell_factor) {
            return Err(TowerClassError::InvalidSellFactor(self.id));
        }
        self.sell_factor = sell_factor;
        Ok(self)
    }

    /// Identifier of the class.
    #[must_use]
    pub const fn id(&self) -> &TowerClassId {
        &self.id
    }

    /// Display name of the class.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description of the class.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Placement cost.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Share of the cost refunded on sale.
    #[must_use]
    pub const fn sell_factor(&self) -> f32 {
        self.sell_factor
    }

    /// Cells covered by a tower of this class.
    #[must_use]
    pub const fn footprint(&self) -> CellRectSize {
        self.footprint
    }

    /// Upgrade ladder of the parameter.
    #[must_use]
    pub const fn ladder(&self, parameter: TowerParameter) -> &UpgradeLadder {
        &self.ladders[parameter.index()]
    }

    /// Currency returned when a tower of this class is sold.
    #[must_use]
    pub fn refund(&self) -> u32 {
        let refund = (f64::from(self.cost) * f64::from(self.sell_factor)).floor();
        // sell factor is bounded to [0, 1], so the refund never exceeds cost
        refund as u32
    }
}

/// Registry of tower classes keyed by identifier.
#[derive(Clone, Debug, Default)]
pub struct TowerCatalog {
    classes: BTreeMap<TowerClassId, Arc<TowerClass>>,
}

impl TowerCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class, replacing any class with the same identifier.
    pub fn insert(&mut self, class: TowerClass) -> Option<Arc<TowerClass>> {
        self.classes.insert(class.id().clone(), Arc::new(class))
    }

    /// Looks up a class by identifier.
    #[must_use]
    pub fn get(&self, id: &TowerClassId) -> Option<&Arc<TowerClass>> {
        self.classes.get(id)
    }

    /// Iterates the registered classes in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TowerClass>> {
        self.classes.values()
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Reports whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<TowerClass> for TowerCatalog {
    fn from_iter<I: IntoIterator<Item = TowerClass>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for class in iter {
            let _ = catalog.insert(class);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder(values: &[(u32, u32)]) -> Vec<UpgradeTier> {
        values
            .iter()
            .map(|&(value, cost)| UpgradeTier::new(value, cost))
            .collect()
    }

    fn normal() -> TowerClass {
        TowerClass::from_tiers(TowerClassId::new("normal"), 15, |parameter| match parameter {
            TowerParameter::Damage => ladder(&[(10, 0), (15, 10), (25, 20)]),
            TowerParameter::Range => ladder(&[(100, 0)]),
            TowerParameter::Reload => ladder(&[(800, 0), (600, 15)]),
        })
        .expect("valid class")
    }

    #[test]
    fn refund_rounds_down() {
        let class = normal().with_sell_factor(0.7).expect("valid factor");
        assert_eq!(class.refund(), 10);
    }

    #[test]
    fn ladders_report_base_and_max_level() {
        let class = normal();
        assert_eq!(class.ladder(TowerParameter::Damage).base_value(), 10);
        assert_eq!(class.ladder(TowerParameter::Damage).max_level(), 2);
        assert_eq!(class.ladder(TowerParameter::Range).max_level(), 0);
        assert_eq!(
            class.ladder(TowerParameter::Reload).tier(1),
            Some(UpgradeTier::new(600, 15))
        );
    }

    #[test]
    fn empty_ladder_is_rejected() {
        let result = TowerClass::from_tiers(TowerClassId::new("broken"), 5, |parameter| {
            if parameter == TowerParameter::Range {
                Vec::new()
            } else {
                ladder(&[(1, 0)])
            }
        });
        assert_eq!(
            result.err(),
            Some(TowerClassError::EmptyLadder {
                class: TowerClassId::new("broken"),
                parameter: TowerParameter::Range,
            })
        );
    }

    #[test]
    fn invalid_footprint_and_sell_factor_are_rejected() {
        assert!(normal().with_footprint(CellRectSize::new(0, 2)).is_err());
        assert!(normal().with_sell_factor(1.5).is_err());
    }

    #[test]
    fn upgrade_levels_track_each_parameter() {
        let mut levels = UpgradeLevels::default();
        levels.set(TowerParameter::Reload, 2);
        assert_eq!(levels.get(TowerParameter::Reload), 2);
        assert_eq!(levels.get(TowerParameter::Damage), 0);
    }

    #[test]
    fn catalog_replaces_classes_with_same_id() {
        let mut catalog: TowerCatalog = std::iter::once(normal()).collect();
        let replaced = catalog.insert(normal().with_name("Normal Tower"));
        assert!(replaced.is_some());
        assert_eq!(catalog.len(), 1);
        let class = catalog.get(&TowerClassId::new("normal")).expect("registered");
        assert_eq!(class.name(), "Normal Tower");
    }

    #[test]
    fn parameter_names_resolve() {
        assert_eq!(TowerParameter::from_name("range"), Some(TowerParameter::Range));
        assert_eq!(TowerParameter::from_name("speed"), None);
    }
}
