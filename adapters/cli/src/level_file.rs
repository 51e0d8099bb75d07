//! Plain-text level format.
//!
//! A level file starts with `Key=value` header lines, followed by a `DATA`
//! marker, exactly `rows` grid rows and finally one wave per line:
//!
//! ```text
//! Name=First Steps
//! Size=12x6
//! Lives=10
//! Bucks=60
//! DATA
//! 0.....#.....
//! ...
//! spawn 10 standard enemy from base 0 [speed: 40 energy: 30 bucks: 2], wait 12
//! ```

use std::{str::FromStr, time::Duration};

use bastion_core::{
    CellKind, EnemyType, Grid, GridSize, Level, LevelError, StartBaseId, Wave,
};
use thiserror::Error;

const DEFAULT_LIVES: u32 = 20;
const DEFAULT_BUCKS: u32 = 50;
const DEFAULT_BOUNTY: u32 = 1;
const DEFAULT_SPAWN_DELAY: Duration = Duration::from_millis(500);

/// Parsed level file: validated level plus descriptive metadata.
#[derive(Debug)]
pub(crate) struct LevelFile {
    pub(crate) level: Level,
    pub(crate) description: String,
    pub(crate) author: String,
    pub(crate) version: u32,
}

/// Errors raised while reading a level file.
#[derive(Debug, Error)]
pub(crate) enum LevelFileError {
    #[error("line {line}: invalid {key} value {value:?}")]
    InvalidHeader {
        line: usize,
        key: &'static str,
        value: String,
    },
    #[error("level header has no {0} entry")]
    MissingHeader(&'static str),
    #[error("level file ends after {found} of {expected} grid rows")]
    MissingRows { found: u32, expected: u32 },
    #[error("line {line}: grid row has {found} cells, expected {expected}")]
    RowLength {
        line: usize,
        found: usize,
        expected: u32,
    },
    #[error("line {line}: malformed wave, {reason}")]
    InvalidWave { line: usize, reason: String },
    #[error(transparent)]
    Level(#[from] LevelError),
}

#[derive(Debug, Default)]
struct Header {
    name: Option<String>,
    description: String,
    author: String,
    version: u32,
    size: Option<GridSize>,
    lives: Option<u32>,
    bucks: Option<u32>,
}

/// Parses the full text of a level file.
pub(crate) fn parse(text: &str) -> Result<LevelFile, LevelFileError> {
    let mut lines = text.lines().enumerate().map(|(index, line)| (index + 1, line));

    let mut header = Header::default();
    let mut found_data = false;
    for (number, line) in lines.by_ref() {
        if !line.starts_with(|symbol: char| symbol.is_ascii_alphanumeric()) {
            continue;
        }
        if line.starts_with("DATA") {
            found_data = true;
            break;
        }
        header.read(number, line)?;
    }
    if !found_data {
        return Err(LevelFileError::MissingHeader("DATA"));
    }
    let name = header.name.ok_or(LevelFileError::MissingHeader("Name"))?;
    let size = header.size.ok_or(LevelFileError::MissingHeader("Size"))?;

    let mut cells = Vec::with_capacity(size.cell_count());
    for row in 0..size.rows() {
        let (number, line) = lines.next().ok_or(LevelFileError::MissingRows {
            found: row,
            expected: size.rows(),
        })?;
        let line = line.trim_end_matches('\r');
        if line.chars().count() != size.columns() as usize {
            return Err(LevelFileError::RowLength {
                line: number,
                found: line.chars().count(),
                expected: size.columns(),
            });
        }
        cells.extend(line.chars().map(cell_kind));
    }
    let grid = Grid::from_cells(size, cells).ok_or(LevelFileError::MissingRows {
        found: 0,
        expected: size.rows(),
    })?;

    let mut waves = Vec::new();
    for (number, line) in lines {
        let line = line.trim_end();
        if line.len() < 5 || line.starts_with('#') {
            continue;
        }
        let wave = parse_wave(line).map_err(|reason| LevelFileError::InvalidWave {
            line: number,
            reason,
        })?;
        waves.push(wave);
    }

    let level = Level::new(
        name,
        grid,
        waves,
        header.lives.unwrap_or(DEFAULT_LIVES),
        header.bucks.unwrap_or(DEFAULT_BUCKS),
    )?;
    Ok(LevelFile {
        level,
        description: header.description,
        author: header.author,
        version: header.version,
    })
}

impl Header {
    fn read(&mut self, number: usize, line: &str) -> Result<(), LevelFileError> {
        let Some((key, value)) = line.split_once('=') else {
            return Ok(());
        };
        let value = value.trim();
        let invalid = |key| LevelFileError::InvalidHeader {
            line: number,
            key,
            value: value.to_owned(),
        };
        match key.trim() {
            "Name" => self.name = Some(value.to_owned()),
            "Description" => self.description = value.to_owned(),
            "Author" => self.author = value.to_owned(),
            "Version" => self.version = value.parse().map_err(|_| invalid("Version"))?,
            "Lives" => self.lives = Some(value.parse().map_err(|_| invalid("Lives"))?),
            "Bucks" => self.bucks = Some(value.parse().map_err(|_| invalid("Bucks"))?),
            "Size" => {
                let (columns, rows) = value.split_once('x').ok_or_else(|| invalid("Size"))?;
                let columns: u32 = columns.trim().parse().map_err(|_| invalid("Size"))?;
                let rows: u32 = rows.trim().parse().map_err(|_| invalid("Size"))?;
                if columns == 0 || rows == 0 {
                    return Err(invalid("Size"));
                }
                self.size = Some(GridSize::new(rows, columns));
            }
            other => tracing::debug!(line = number, key = other, "ignoring unknown header key"),
        }
        Ok(())
    }
}

fn cell_kind(symbol: char) -> CellKind {
    match symbol {
        '#' => CellKind::Wall,
        '@' => CellKind::Home,
        digit @ '0'..='9' => digit
            .to_digit(10)
            .and_then(|value| u8::try_from(value).ok())
            .and_then(StartBaseId::new)
            .map_or(CellKind::Empty, CellKind::StartBase),
        _ => CellKind::Empty,
    }
}

/// Parses `spawn <n> <type> enemy from base <b> [speed: <s> energy: <e>], wait <w>`.
fn parse_wave(line: &str) -> Result<Wave, String> {
    let rest = line
        .strip_prefix("spawn ")
        .ok_or_else(|| "expected it to start with `spawn`".to_owned())?;
    let (head, rest) = rest
        .split_once('[')
        .ok_or_else(|| "missing `[`".to_owned())?;
    let (attributes, tail) = rest
        .split_once(']')
        .ok_or_else(|| "missing `]`".to_owned())?;

    let head: Vec<&str> = head.split_whitespace().collect();
    let [count, enemy_type, "enemy", "from", "base", base] = head.as_slice() else {
        return Err("expected `<count> <type> enemy from base <base>`".to_owned());
    };
    let enemy_count = number(count, "count")?;
    let enemy_type =
        EnemyType::from_name(enemy_type).ok_or_else(|| format!("unknown enemy type `{enemy_type}`"))?;
    let base: u8 = number(base, "base")?;
    let start_base =
        StartBaseId::new(base).ok_or_else(|| format!("start base {base} is out of range"))?;

    let mut speed = None;
    let mut energy = None;
    let mut bounty = DEFAULT_BOUNTY;
    let mut spawn_interval = DEFAULT_SPAWN_DELAY;
    let tokens: Vec<&str> = attributes.split_whitespace().collect();
    for pair in tokens.chunks(2) {
        let [key, value] = pair else {
            return Err(format!("attribute `{}` has no value", pair[0]));
        };
        match *key {
            "speed:" => speed = Some(number::<f32>(value, "speed")?),
            "energy:" => energy = Some(number(value, "energy")?),
            "bucks:" => bounty = number(value, "bucks")?,
            "delay:" => spawn_interval = seconds(value, "delay")?,
            other => return Err(format!("unknown attribute `{other}`")),
        }
    }

    let wait = tail
        .trim()
        .strip_prefix(',')
        .map(str::trim)
        .and_then(|tail| tail.strip_prefix("wait"))
        .ok_or_else(|| "missing `, wait <seconds>`".to_owned())?;

    Ok(Wave {
        enemy_count,
        enemy_type,
        start_base,
        speed: speed.ok_or_else(|| "missing speed".to_owned())?,
        energy: energy.ok_or_else(|| "missing energy".to_owned())?,
        bounty,
        spawn_interval,
        inter_wave_wait: seconds(wait.trim(), "wait")?,
    })
}

fn number<T: FromStr>(text: &str, field: &str) -> Result<T, String> {
    text.parse()
        .map_err(|_| format!("{field} `{text}` is not a valid number"))
}

fn seconds(text: &str, field: &str) -> Result<Duration, String> {
    let value: f64 = number(text, field)?;
    Duration::try_from_secs_f64(value).map_err(|_| format!("{field} `{text}` is not a duration"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::CellCoord;

    const SAMPLE: &str = "\
# comment lines before the header are skipped
Name=Corridor
Description=Single lane
Author=tests
Version=2
Size=5x3
Lives=7
Bucks=40
DATA
#####
0...@
#1###
# waves
spawn 3 standard enemy from base 0 [speed: 20 energy: 15], wait 4
spawn 2 flying enemy from base 1 [speed: 35 energy: 10 bucks: 5 delay: 1.5], wait 0.5
";

    #[test]
    fn parses_header_grid_and_waves() {
        let file = parse(SAMPLE).expect("sample parses");
        let level = &file.level;
        assert_eq!(level.name(), "Corridor");
        assert_eq!(file.description, "Single lane");
        assert_eq!(file.author, "tests");
        assert_eq!(file.version, 2);
        assert_eq!(level.size(), GridSize::new(3, 5));
        assert_eq!((level.lives(), level.bucks()), (7, 40));
        assert_eq!(level.home(), CellCoord::new(1, 4));
        assert_eq!(level.grid().get(CellCoord::new(0, 0)), Some(&CellKind::Wall));

        let waves = level.waves();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].enemy_count, 3);
        assert_eq!(waves[0].enemy_type, EnemyType::Standard);
        assert_eq!(waves[0].bounty, DEFAULT_BOUNTY);
        assert_eq!(waves[0].spawn_interval, DEFAULT_SPAWN_DELAY);
        assert_eq!(waves[0].inter_wave_wait, Duration::from_secs(4));
        assert_eq!(waves[1].enemy_type, EnemyType::Flying);
        assert_eq!(waves[1].start_base.get(), 1);
        assert_eq!(waves[1].bounty, 5);
        assert_eq!(waves[1].spawn_interval, Duration::from_millis(1500));
        assert_eq!(waves[1].inter_wave_wait, Duration::from_millis(500));
    }

    #[test]
    fn short_rows_report_their_line() {
        let text = "Name=Bad\nSize=4x2\nDATA\n0..@\n...\n";
        match parse(text) {
            Err(LevelFileError::RowLength {
                line,
                found,
                expected,
            }) => assert_eq!((line, found, expected), (5, 3, 4)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_rows_and_headers_are_reported() {
        assert!(matches!(
            parse("Name=Bad\nSize=4x3\nDATA\n0..@\n"),
            Err(LevelFileError::MissingRows {
                found: 1,
                expected: 3
            })
        ));
        assert!(matches!(
            parse("Size=4x1\nDATA\n0..@\n"),
            Err(LevelFileError::MissingHeader("Name"))
        ));
        assert!(matches!(
            parse("Name=Bad\nSize=4x1\n"),
            Err(LevelFileError::MissingHeader("DATA"))
        ));
        assert!(matches!(
            parse("Name=Bad\nSize=4by1\nDATA\n"),
            Err(LevelFileError::InvalidHeader { line: 2, key: "Size", .. })
        ));
    }

    #[test]
    fn malformed_waves_report_their_line() {
        let text = "Name=W\nSize=4x1\nDATA\n0..@\nspawn 3 standard enemy from base 0 [speed: 10], wait 1\n";
        match parse(text) {
            Err(LevelFileError::InvalidWave { line, reason }) => {
                assert_eq!(line, 5);
                assert_eq!(reason, "missing energy");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let text = "Name=W\nSize=4x1\nDATA\n0..@\nspawn 3 ogre enemy from base 0 [speed: 1 energy: 1], wait 1\n";
        assert!(matches!(parse(text), Err(LevelFileError::InvalidWave { line: 5, .. })));
    }

    #[test]
    fn level_validation_errors_pass_through() {
        let text = "Name=W\nSize=4x1\nDATA\n0...\n";
        assert!(matches!(
            parse(text),
            Err(LevelFileError::Level(LevelError::MissingHome))
        ));
    }
}
