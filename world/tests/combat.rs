use std::time::Duration;

use bastion_core::{
    BuildOrder, CellCoord, CellKind, Command, EnemyHandle, EnemySpawn, EnemyType, Event, Grid,
    GridSize, Level, SlotHandle, SpawnDropReason, StartBaseId, TowerCatalog, TowerClass,
    TowerClassId, TowerId, UnlimitedTreasury, UpgradeLadder,
};
use bastion_world::{self as world, query, Config, World};

fn level(rows: &[&str]) -> Level {
    let size = GridSize::new(rows.len() as u32, rows[0].len() as u32);
    let cells = rows
        .iter()
        .flat_map(|row| row.chars())
        .map(|symbol| match symbol {
            '#' => CellKind::Wall,
            '@' => CellKind::Home,
            digit @ '0'..='9' => CellKind::StartBase(
                StartBaseId::new(digit as u8 - b'0').expect("digit is a valid base"),
            ),
            _ => CellKind::Empty,
        })
        .collect();
    let grid = Grid::from_cells(size, cells).expect("rows share a width");
    Level::new("combat", grid, Vec::new(), 3, 0).expect("valid level")
}

fn catalog() -> TowerCatalog {
    let class = |name: &str, damage: u32| {
        TowerClass::new(
            TowerClassId::new(name),
            10,
            UpgradeLadder::fixed(damage),
            UpgradeLadder::fixed(300),
            UpgradeLadder::fixed(500),
        )
    };
    [class("heavy", 100), class("light", 1)].into_iter().collect()
}

fn spawn(enemy_type: EnemyType, start: CellCoord) -> Command {
    Command::SpawnEnemy {
        spawn: EnemySpawn {
            enemy_type,
            start,
            speed: 100.0,
            energy: 10,
            bounty: 3,
        },
    }
}

fn place(world: &mut World, class: &str, origin: CellCoord) -> TowerId {
    let mut events = Vec::new();
    world::build(
        world,
        BuildOrder::PlaceTower {
            class: TowerClassId::new(class),
            origin,
        },
        &mut UnlimitedTreasury,
        &mut events,
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::TowerPlaced { tower, .. } => Some(*tower),
            _ => None,
        })
        .unwrap_or_else(|| panic!("tower placement failed: {events:?}"))
}

fn spawned(events: &[Event]) -> EnemyHandle {
    events
        .iter()
        .find_map(|event| match event {
            Event::EnemySpawned { enemy, .. } => Some(*enemy),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no enemy spawned: {events:?}"))
}

fn tick(world: &mut World, dt: Duration, events: &mut Vec<Event>) {
    world::apply(world, Command::Tick { dt }, events);
}

#[test]
fn bullet_in_flight_never_damages_the_next_occupant_of_its_target_slot() {
    let mut world = World::new(
        level(&["0........@", "..........", ".........."]),
        catalog(),
        Config::new().with_enemy_capacity(1),
    );
    let heavy = place(&mut world, "heavy", CellCoord::new(0, 1));
    let light = place(&mut world, "light", CellCoord::new(1, 7));

    let mut events = Vec::new();
    world::apply(&mut world, spawn(EnemyType::Standard, CellCoord::new(0, 0)), &mut events);
    let first = spawned(&events);
    assert_eq!(first, SlotHandle::new(0, 1), "first occupant of slot 0");

    events.clear();
    tick(&mut world, Duration::from_millis(500), &mut events);
    for tower in [light, heavy] {
        world::apply(&mut world, Command::FireBullet { tower, target: first }, &mut events);
    }
    let fired: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            Event::BulletFired { bullet, .. } => Some(*bullet),
            _ => None,
        })
        .collect();
    assert_eq!(fired.len(), 2, "both towers fire: {events:?}");
    let stray = fired[0];

    events.clear();
    world::apply(&mut world, Command::StepBullets, &mut events);
    assert!(
        events.contains(&Event::EnemyDestroyed {
            enemy: first,
            bounty: 3
        }),
        "heavy bullet destroys the first occupant: {events:?}"
    );
    assert_eq!(query::bullets_in_flight(&world), 1, "light bullet still flying");

    events.clear();
    world::apply(&mut world, spawn(EnemyType::Standard, CellCoord::new(0, 0)), &mut events);
    let second = spawned(&events);
    assert_eq!(second, SlotHandle::new(0, 2), "slot reused with the next generation");

    events.clear();
    for _ in 0..10 {
        world::apply(&mut world, Command::StepBullets, &mut events);
    }
    assert!(
        events.contains(&Event::BulletExpired { bullet: stray }),
        "lost bullet expires: {events:?}"
    );
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::BulletHit { .. })),
        "lost bullet must not hit anything: {events:?}"
    );
    let survivor = query::enemy(&world, second).expect("second occupant alive");
    assert_eq!(survivor.energy, 10, "second occupant keeps its energy");
    assert_eq!(query::bullets_in_flight(&world), 0);
}

#[test]
fn reset_clears_bullets_in_flight() {
    let mut world = World::new(
        level(&["0........@", "..........", ".........."]),
        catalog(),
        Config::new(),
    );
    let light = place(&mut world, "light", CellCoord::new(1, 7));

    let mut events = Vec::new();
    world::apply(&mut world, spawn(EnemyType::Standard, CellCoord::new(0, 0)), &mut events);
    let target = spawned(&events);
    tick(&mut world, Duration::from_millis(100), &mut events);
    world::apply(&mut world, Command::FireBullet { tower: light, target }, &mut events);
    world::apply(&mut world, Command::Reset, &mut events);
    assert_eq!(query::bullets_in_flight(&world), 0, "reset clears bullets");
    assert!(query::bullet_view(&world).is_empty());
}

#[test]
fn fire_requests_respect_range_and_reload() {
    let mut world = World::new(
        level(&["0........@", "..........", ".........."]),
        catalog(),
        Config::new(),
    );
    let light = place(&mut world, "light", CellCoord::new(1, 7));

    let mut events = Vec::new();
    world::apply(&mut world, spawn(EnemyType::Standard, CellCoord::new(0, 0)), &mut events);
    let target = spawned(&events);

    events.clear();
    tick(&mut world, Duration::from_millis(100), &mut events);
    world::apply(&mut world, Command::FireBullet { tower: light, target }, &mut events);
    world::apply(&mut world, Command::FireBullet { tower: light, target }, &mut events);
    let fired = events
        .iter()
        .filter(|event| matches!(event, Event::BulletFired { .. }))
        .count();
    assert_eq!(fired, 1, "second request arrives while reloading");

    let tower = query::tower(&world, light).expect("tower exists");
    assert!(!tower.is_ready());
    assert_eq!(tower.reload_remaining, Duration::from_millis(500));

    world::apply(&mut world, Command::ReloadTowers, &mut events);
    let tower = query::tower(&world, light).expect("tower exists");
    assert_eq!(tower.reload_remaining, Duration::from_millis(400));
}

#[test]
fn walker_follows_its_path_home() {
    let mut world = World::new(level(&["0..@"]), TowerCatalog::new(), Config::new());
    let mut events = Vec::new();
    world::apply(&mut world, spawn(EnemyType::Standard, CellCoord::new(0, 0)), &mut events);
    let enemy = spawned(&events);
    assert_eq!(
        query::enemy(&world, enemy).map(|snapshot| snapshot.remaining_waypoints),
        Some(3)
    );

    events.clear();
    for _ in 0..100 {
        tick(&mut world, Duration::from_millis(100), &mut events);
        world::apply(&mut world, Command::StepEnemies, &mut events);
        if query::alive_enemies(&world) == 0 {
            break;
        }
    }
    assert!(
        events.contains(&Event::EnemyReachedHome { enemy }),
        "walker reaches home: {events:?}"
    );
    assert_eq!(query::alive_enemies(&world), 0, "enemy recycled after arrival");
}

#[test]
fn flyer_ignores_walls() {
    let mut world = World::new(level(&["0#@"]), TowerCatalog::new(), Config::new());
    let mut events = Vec::new();
    world::apply(&mut world, spawn(EnemyType::Flying, CellCoord::new(0, 0)), &mut events);
    let enemy = spawned(&events);

    for _ in 0..100 {
        tick(&mut world, Duration::from_millis(100), &mut events);
        world::apply(&mut world, Command::StepEnemies, &mut events);
    }
    assert!(events.contains(&Event::EnemyReachedHome { enemy }));
}

#[test]
fn spawns_are_dropped_when_pool_is_full_or_start_is_sealed() {
    let mut world = World::new(
        level(&["0..@", "####", "1#.."]),
        TowerCatalog::new(),
        Config::new().with_enemy_capacity(1),
    );
    let mut events = Vec::new();

    world::apply(&mut world, spawn(EnemyType::Standard, CellCoord::new(2, 0)), &mut events);
    assert!(
        events.contains(&Event::EnemySpawnDropped {
            enemy_type: EnemyType::Standard,
            start: CellCoord::new(2, 0),
            reason: SpawnDropReason::Unreachable,
        }),
        "sealed start cannot reach home: {events:?}"
    );

    world::apply(&mut world, spawn(EnemyType::Standard, CellCoord::new(0, 0)), &mut events);
    world::apply(&mut world, spawn(EnemyType::Standard, CellCoord::new(0, 0)), &mut events);
    assert!(
        events.contains(&Event::EnemySpawnDropped {
            enemy_type: EnemyType::Standard,
            start: CellCoord::new(0, 0),
            reason: SpawnDropReason::PoolExhausted,
        }),
        "second walker exceeds capacity: {events:?}"
    );
    assert_eq!(query::alive_enemies(&world), 1, "pool state left intact");
}
