//! Parsed level data: the cell grid, start bases, the home cell and the
//! ordered wave list.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, Grid, GridSize, MovementKind};

/// Number of distinct start bases a level may declare.
pub const MAX_START_BASES: usize = 10;

/// Identifier of a numbered start base in `0..MAX_START_BASES`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StartBaseId(u8);

impl StartBaseId {
    /// Creates a start base identifier, rejecting values outside the
    /// supported range.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (usize::from(value) < MAX_START_BASES).then_some(Self(value))
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Content of a single grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Open ground that walkers may cross and towers may occupy.
    #[default]
    Empty,
    /// Permanent obstacle.
    Wall,
    /// Spawn cell belonging to a numbered start base.
    StartBase(StartBaseId),
    /// Cell covered by a tower footprint.
    Tower,
    /// Destination every enemy tries to reach.
    Home,
}

impl CellKind {
    /// Reports whether ground walkers may enter the cell.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Empty | Self::StartBase(_) | Self::Home)
    }
}

/// Start-point lists indexed by start base identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartBases {
    bases: [Vec<CellCoord>; MAX_START_BASES],
}

impl StartBases {
    /// Collects start points from the grid in row-major order.
    #[must_use]
    pub fn from_grid(grid: &Grid<CellKind>) -> Self {
        let mut bases = Self::default();
        for (cell, kind) in grid.iter() {
            if let CellKind::StartBase(id) = kind {
                if let Some(points) = bases.bases.get_mut(usize::from(id.get())) {
                    points.push(cell);
                }
            }
        }
        bases
    }

    /// Start points belonging to the base, in row-major order.
    #[must_use]
    pub fn points(&self, id: StartBaseId) -> &[CellCoord] {
        self.bases
            .get(usize::from(id.get()))
            .map_or(&[], Vec::as_slice)
    }

    /// Iterates every base that owns at least one start point.
    pub fn iter(&self) -> impl Iterator<Item = (StartBaseId, &[CellCoord])> {
        self.bases.iter().enumerate().filter_map(|(index, points)| {
            if points.is_empty() {
                return None;
            }
            let id = StartBaseId::new(u8::try_from(index).ok()?)?;
            Some((id, points.as_slice()))
        })
    }
}

/// Enemy archetypes a wave may spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyType {
    /// Ground unit that walks its path around walls and towers.
    Standard,
    /// Air unit that flies straight to the home cell.
    Flying,
}

impl EnemyType {
    /// Looks up an enemy type by its level-file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::Standard),
            "flying" => Some(Self::Flying),
            _ => None,
        }
    }

    /// Level-file name of the enemy type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Flying => "flying",
        }
    }

    /// Movement model used by enemies of this type.
    #[must_use]
    pub const fn movement(self) -> MovementKind {
        match self {
            Self::Standard => MovementKind::Walker,
            Self::Flying => MovementKind::Flyer,
        }
    }
}

/// Timed batch of identical enemies spawned from a single start base.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    /// Number of enemies the wave spawns.
    pub enemy_count: u32,
    /// Type of every enemy in the wave.
    pub enemy_type: EnemyType,
    /// Start base the enemies emerge from.
    pub start_base: StartBaseId,
    /// Enemy travel speed in pixels per second.
    pub speed: f32,
    /// Enemy starting energy.
    pub energy: u32,
    /// Currency awarded per destroyed enemy.
    pub bounty: u32,
    /// Delay between successive spawns.
    pub spawn_interval: Duration,
    /// Delay between the start of this wave and the start of the next one.
    pub inter_wave_wait: Duration,
}

/// Reasons level data may fail validation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LevelError {
    /// The grid holds no cells.
    #[error("level grid is empty")]
    EmptyGrid,
    /// The grid contains no home cell.
    #[error("level has no home cell")]
    MissingHome,
    /// The grid contains more than one home cell.
    #[error("level has a second home cell at row {}, column {}", .second.row(), .second.column())]
    MultipleHomes {
        /// First home cell discovered in row-major order.
        first: CellCoord,
        /// Second home cell discovered in row-major order.
        second: CellCoord,
    },
    /// The pristine grid must not contain tower cells.
    #[error("level grid contains a tower cell at row {}, column {}", .0.row(), .0.column())]
    TowerInGrid(CellCoord),
    /// A wave references a start base without start points.
    #[error("wave {wave} spawns from start base {base} which has no cells")]
    UnknownStartBase {
        /// Zero-based index of the offending wave.
        wave: usize,
        /// Start base named by the wave.
        base: u8,
    },
    /// A wave has a non-positive or non-finite speed.
    #[error("wave {wave} has an invalid speed")]
    InvalidSpeed {
        /// Zero-based index of the offending wave.
        wave: usize,
    },
}

/// Validated level: grid, derived start bases and home, waves and the
/// session's starting lives and currency.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    name: String,
    grid: Grid<CellKind>,
    home: CellCoord,
    start_bases: StartBases,
    waves: Vec<Wave>,
    lives: u32,
    bucks: u32,
}

impl Level {
    /// Validates the grid and waves, deriving the home cell and start bases.
    pub fn new(
        name: impl Into<String>,
        grid: Grid<CellKind>,
        waves: Vec<Wave>,
        lives: u32,
        bucks: u32,
    ) -> Result<Self, LevelError> {
        if grid.size().cell_count() == 0 {
            return Err(LevelError::EmptyGrid);
        }

        let mut home = None;
        for (cell, kind) in grid.iter() {
            match kind {
                CellKind::Home => {
                    if let Some(first) = home {
                        return Err(LevelError::MultipleHomes {
                            first,
                            second: cell,
                        });
                    }
                    home = Some(cell);
                }
                CellKind::Tower => return Err(LevelError::TowerInGrid(cell)),
                _ => {}
            }
        }
        let home = home.ok_or(LevelError::MissingHome)?;

        let start_bases = StartBases::from_grid(&grid);
        for (index, wave) in waves.iter().enumerate() {
            if start_bases.points(wave.start_base).is_empty() {
                return Err(LevelError::UnknownStartBase {
                    wave: index,
                    base: wave.start_base.get(),
                });
            }
            if !(wave.speed.is_finite() && wave.speed > 0.0) {
                return Err(LevelError::InvalidSpeed { wave: index });
            }
        }

        Ok(Self {
            name: name.into(),
            grid,
            home,
            start_bases,
            waves,
            lives,
            bucks,
        })
    }

    /// Display name of the level.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pristine cell grid.
    #[must_use]
    pub const fn grid(&self) -> &Grid<CellKind> {
        &self.grid
    }

    /// Dimensions of the grid.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.grid.size()
    }

    /// Cell every enemy tries to reach.
    #[must_use]
    pub const fn home(&self) -> CellCoord {
        self.home
    }

    /// Start points grouped by base.
    #[must_use]
    pub const fn start_bases(&self) -> &StartBases {
        &self.start_bases
    }

    /// Waves in the order they are sent.
    #[must_use]
    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Lives the player starts with.
    #[must_use]
    pub const fn lives(&self) -> u32 {
        self.lives
    }

    /// Currency the player starts with.
    #[must_use]
    pub const fn bucks(&self) -> u32 {
        self.bucks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(value: u8) -> StartBaseId {
        StartBaseId::new(value).expect("valid base")
    }

    fn corridor() -> Grid<CellKind> {
        let mut grid = Grid::filled(GridSize::new(1, 4), CellKind::Empty);
        let _ = grid.set(CellCoord::new(0, 0), CellKind::StartBase(base(1)));
        let _ = grid.set(CellCoord::new(0, 3), CellKind::Home);
        grid
    }

    fn wave(start_base: StartBaseId) -> Wave {
        Wave {
            enemy_count: 3,
            enemy_type: EnemyType::Standard,
            start_base,
            speed: 10.0,
            energy: 100,
            bounty: 1,
            spawn_interval: Duration::from_millis(500),
            inter_wave_wait: Duration::from_secs(5),
        }
    }

    #[test]
    fn start_base_id_is_bounded() {
        assert!(StartBaseId::new(9).is_some());
        assert!(StartBaseId::new(10).is_none());
    }

    #[test]
    fn walkability_follows_cell_kind() {
        assert!(CellKind::Empty.is_walkable());
        assert!(CellKind::Home.is_walkable());
        assert!(CellKind::StartBase(base(0)).is_walkable());
        assert!(!CellKind::Wall.is_walkable());
        assert!(!CellKind::Tower.is_walkable());
    }

    #[test]
    fn level_derives_home_and_start_bases() {
        let level = Level::new("corridor", corridor(), vec![wave(base(1))], 20, 100)
            .expect("valid level");
        assert_eq!(level.home(), CellCoord::new(0, 3));
        assert_eq!(level.start_bases().points(base(1)), &[CellCoord::new(0, 0)]);
        assert!(level.start_bases().points(base(2)).is_empty());
        assert_eq!(level.start_bases().iter().count(), 1);
    }

    #[test]
    fn level_rejects_missing_home() {
        let mut grid = corridor();
        let _ = grid.set(CellCoord::new(0, 3), CellKind::Empty);
        assert_eq!(
            Level::new("broken", grid, Vec::new(), 1, 0),
            Err(LevelError::MissingHome)
        );
    }

    #[test]
    fn level_rejects_wave_from_empty_base() {
        let result = Level::new("broken", corridor(), vec![wave(base(4))], 1, 0);
        assert_eq!(
            result,
            Err(LevelError::UnknownStartBase { wave: 0, base: 4 })
        );
    }

    #[test]
    fn enemy_type_names_resolve() {
        assert_eq!(EnemyType::from_name("flying"), Some(EnemyType::Flying));
        assert_eq!(EnemyType::from_name("armoured"), None);
        assert_eq!(EnemyType::Standard.movement(), MovementKind::Walker);
    }
}
