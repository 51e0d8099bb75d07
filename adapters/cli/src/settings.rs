//! TOML settings: world tuning, spawn seed, frame cap and tower classes.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use bastion_core::{
    CellRectSize, TowerCatalog, TowerClass, TowerClassError, TowerClassId, TowerParameter,
    UpgradeTier,
};
use serde::Deserialize;

const DEFAULT_TOWERS: &str = include_str!("default_towers.toml");

/// Settings loaded from a TOML file. Every table is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    world: bastion_world::Config,
    spawning: bastion_system_spawning::Config,
    simulation: SimulationSettings,
    tower: Vec<TowerSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SimulationSettings {
    max_frame_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self { max_frame_ms: 100 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TowerSettings {
    id: String,
    name: Option<String>,
    description: Option<String>,
    cost: u32,
    /// Width and height in cells.
    footprint: Option<[u32; 2]>,
    sell_factor: Option<f32>,
    damage: u32,
    range: u32,
    reload: u32,
    #[serde(default)]
    upgrade: Vec<UpgradeSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpgradeSettings {
    parameter: TowerParameter,
    value: u32,
    cost: u32,
}

impl Settings {
    /// Reads and parses a settings file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse settings file {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Simulation configuration, optionally overriding the spawn seed.
    pub(crate) fn simulation_config(&self, seed: Option<u64>) -> bastion_simulation::Config {
        let spawning = seed.map_or(self.spawning, bastion_system_spawning::Config::new);
        bastion_simulation::Config::new()
            .with_world(self.world)
            .with_spawning(spawning)
            .with_max_frame_time(Duration::from_millis(self.simulation.max_frame_ms))
    }

    /// Tower catalog declared by the settings, or the built-in classes when
    /// none are declared.
    pub(crate) fn catalog(&self) -> Result<TowerCatalog> {
        if self.tower.is_empty() {
            return default_catalog();
        }
        let catalog = build_catalog(&self.tower)?;
        Ok(catalog)
    }
}

/// Built-in tower classes.
pub(crate) fn default_catalog() -> Result<TowerCatalog> {
    let defaults: Settings =
        toml::from_str(DEFAULT_TOWERS).context("built-in tower table is malformed")?;
    let catalog = build_catalog(&defaults.tower)?;
    Ok(catalog)
}

fn build_catalog(towers: &[TowerSettings]) -> Result<TowerCatalog, TowerClassError> {
    towers.iter().map(TowerSettings::to_class).collect()
}

impl TowerSettings {
    fn to_class(&self) -> Result<TowerClass, TowerClassError> {
        let base = |parameter: TowerParameter| match parameter {
            TowerParameter::Damage => self.damage,
            TowerParameter::Range => self.range,
            TowerParameter::Reload => self.reload,
        };
        let tiers = |parameter: TowerParameter| -> Vec<UpgradeTier> {
            std::iter::once(UpgradeTier::new(base(parameter), 0))
                .chain(
                    self.upgrade
                        .iter()
                        .filter(|upgrade| upgrade.parameter == parameter)
                        .map(|upgrade| UpgradeTier::new(upgrade.value, upgrade.cost)),
                )
                .collect()
        };
        let mut class = TowerClass::from_tiers(TowerClassId::new(&self.id), self.cost, tiers)?;

        if let Some(name) = &self.name {
            class = class.with_name(name);
        }
        if let Some(description) = &self.description {
            class = class.with_description(description);
        }
        if let Some([width, height]) = self.footprint {
            class = class.with_footprint(CellRectSize::new(width, height))?;
        }
        if let Some(sell_factor) = self.sell_factor {
            class = class.with_sell_factor(sell_factor)?;
        }
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(class: &TowerClass, parameter: TowerParameter) -> Vec<(u32, u32)> {
        class
            .ladder(parameter)
            .tiers()
            .iter()
            .map(|tier| (tier.value, tier.cost))
            .collect()
    }

    #[test]
    fn empty_settings_fall_back_to_built_in_towers() {
        let settings = Settings::parse("").expect("empty settings parse");
        let catalog = settings.catalog().expect("built-in catalog is valid");
        assert_eq!(catalog.len(), 4);

        let normal = catalog
            .get(&TowerClassId::new("normal"))
            .expect("normal tower exists");
        assert_eq!(normal.name(), "Normal Tower");
        assert_eq!(normal.cost(), 15);
        assert_eq!(
            values(normal, TowerParameter::Damage),
            vec![(10, 0), (15, 10), (22, 20)]
        );
        assert_eq!(values(normal, TowerParameter::Range), vec![(300, 0), (350, 10)]);
        assert_eq!(
            catalog
                .get(&TowerClassId::new("powerup"))
                .map(|class| class.name().to_owned()),
            Some("DamageUP Tower".to_owned())
        );
    }

    #[test]
    fn declared_towers_replace_the_built_ins() {
        let settings = Settings::parse(
            r#"
            [world]
            bullet_speed = 200.0

            [spawning]
            rng_seed = 9

            [simulation]
            max_frame_ms = 50

            [[tower]]
            id = "wall"
            cost = 5
            footprint = [1, 1]
            sell_factor = 1.0
            damage = 1
            range = 50
            reload = 1000

            [[tower.upgrade]]
            parameter = "reload"
            value = 800
            cost = 3
            "#,
        )
        .expect("settings parse");

        let catalog = settings.catalog().expect("catalog is valid");
        assert_eq!(catalog.len(), 1);
        let wall = catalog.get(&TowerClassId::new("wall")).expect("wall exists");
        assert_eq!(wall.footprint(), CellRectSize::new(1, 1));
        assert_eq!(wall.refund(), 5);
        assert_eq!(values(wall, TowerParameter::Reload), vec![(1000, 0), (800, 3)]);
        assert_eq!(values(wall, TowerParameter::Damage), vec![(1, 0)]);

        let config = settings.simulation_config(None);
        assert_eq!(config.world().bullet_speed(), 200.0);
        assert_eq!(config.spawning().rng_seed(), 9);
        assert_eq!(config.max_frame_time(), Duration::from_millis(50));
        assert_eq!(settings.simulation_config(Some(3)).spawning().rng_seed(), 3);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(Settings::parse("[simulation]\nframe = 3\n").is_err());
        assert!(Settings::parse("[[tower]]\nid = \"x\"\ncost = 1\n").is_err());

        let settings = Settings::parse(
            "[[tower]]\nid = \"x\"\ncost = 1\ndamage = 1\nrange = 1\nreload = 1\nsell_factor = 2.0\n",
        )
        .expect("settings parse");
        assert!(settings.catalog().is_err());
    }
}
