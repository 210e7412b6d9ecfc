//! Floor graph generation
//!
//! A floor is a sparse grid of rooms. The critical path is a biased random
//! walk that climbs from the bottom row toward row 0, ending at the boss.
//! Side rooms hang off the path, and doors are derived from grid adjacency
//! once every room is placed.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec2;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::choice::RoomFeature;
use super::state::{Pickup, ROOM_CENTER};
use crate::catalog::Catalog;
use crate::consts::*;
use crate::error::{Result, SimError};
use crate::settings::Settings;

/// Walk weights: north is the "depth" direction, south is never taken
const WALK_WEIGHTS: [(Direction, u32); 3] = [
    (Direction::North, 6),
    (Direction::East, 2),
    (Direction::West, 2),
];

/// Minimum critical path (start, at least one room, boss)
const MIN_PATH_LENGTH: usize = 3;

/// Spawn positions stay this far from the walls
const SPAWN_MARGIN: f32 = 120.0;

/// Escorts that accompany a miniboss
const MINIBOSS_ESCORTS: usize = 2;

/// Grid coordinate of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn neighbors(self) -> impl Iterator<Item = Coord> {
        Direction::ALL.into_iter().map(move |d| self.step(d))
    }
}

/// Door side, as seen from inside the room (north is toward row 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Direction from `from` to an adjacent `to`
    pub fn between(from: Coord, to: Coord) -> Option<Self> {
        Direction::ALL
            .into_iter()
            .find(|d| from.step(*d) == to)
    }

    /// Unit vector in room space (y grows downward, like grid rows)
    pub fn unit(self) -> Vec2 {
        let (dx, dy) = self.delta();
        Vec2::new(dx as f32, dy as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomRole {
    Start,
    Normal,
    Miniboss,
    Boss,
    Shop,
    Upgrade,
    Shrine,
    Secret,
}

impl RoomRole {
    /// Rooms that hold a roster and must be cleared
    pub fn is_combat(self) -> bool {
        matches!(self, RoomRole::Normal | RoomRole::Miniboss | RoomRole::Boss)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub dir: Direction,
    pub target: Coord,
    pub locked: bool,
    /// Hidden until revealed by a bomb
    pub secret: bool,
    pub revealed: bool,
}

impl Door {
    pub fn is_open(&self) -> bool {
        !self.locked && (!self.secret || self.revealed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnRole {
    Regular,
    Miniboss,
    Boss,
}

/// One roster entry, replayed every time the room is entered uncleared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnDescriptor {
    /// Enemy or boss catalog id
    pub id: String,
    pub role: SpawnRole,
    pub pos: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub coord: Coord,
    pub role: RoomRole,
    pub cleared: bool,
    /// Ordered N, S, E, W
    pub doors: Vec<Door>,
    pub roster: Vec<SpawnDescriptor>,
    /// Shop stock, upgrade choices, shrine state; generated on first visit
    pub feature: Option<RoomFeature>,
    /// Pickups left behind when the player walked out
    pub stash: Vec<Pickup>,
    pub visited: bool,
}

impl Room {
    fn new(coord: Coord, role: RoomRole) -> Self {
        Self {
            coord,
            role,
            cleared: !role.is_combat(),
            doors: Vec::new(),
            roster: Vec::new(),
            feature: None,
            stash: Vec::new(),
            visited: false,
        }
    }

    pub fn door(&self, dir: Direction) -> Option<&Door> {
        self.doors.iter().find(|d| d.dir == dir)
    }

    pub fn open_doors(&self) -> impl Iterator<Item = &Door> {
        self.doors.iter().filter(|d| d.is_open())
    }
}

/// All rooms of one floor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorGraph {
    pub index: u32,
    pub start: Coord,
    pub boss: Coord,
    #[serde(with = "room_map")]
    pub rooms: BTreeMap<Coord, Room>,
}

impl FloorGraph {
    pub fn room(&self, coord: Coord) -> Option<&Room> {
        self.rooms.get(&coord)
    }

    pub fn room_mut(&mut self, coord: Coord) -> Option<&mut Room> {
        self.rooms.get_mut(&coord)
    }

    pub fn rooms_with_role(&self, role: RoomRole) -> impl Iterator<Item = &Room> {
        self.rooms.values().filter(move |r| r.role == role)
    }

    pub fn minibosses_cleared(&self) -> bool {
        self.rooms_with_role(RoomRole::Miniboss).all(|r| r.cleared)
    }

    /// Unlock every door that leads into the boss room; returns how many changed
    pub fn unlock_boss_doors(&mut self) -> usize {
        let boss = self.boss;
        let mut unlocked = 0;
        for door in self.rooms.values_mut().flat_map(|r| r.doors.iter_mut()) {
            if door.target == boss && door.locked {
                door.locked = false;
                unlocked += 1;
            }
        }
        unlocked
    }

    /// Reveal hidden doors touching `coord` (both sides); returns newly exposed secret rooms
    pub fn reveal_secrets_around(&mut self, coord: Coord) -> Vec<Coord> {
        let targets: Vec<Coord> = match self.room(coord) {
            Some(room) => room
                .doors
                .iter()
                .filter(|d| d.secret && !d.revealed)
                .map(|d| d.target)
                .collect(),
            None => return Vec::new(),
        };

        let mut exposed = Vec::new();
        for target in targets {
            for (from, to) in [(coord, target), (target, coord)] {
                if let Some(door) = self
                    .rooms
                    .get_mut(&from)
                    .and_then(|r| r.doors.iter_mut().find(|d| d.target == to))
                {
                    door.revealed = true;
                }
            }
            let secret = if self.room(target).is_some_and(|r| r.role == RoomRole::Secret) {
                target
            } else {
                coord
            };
            if !exposed.contains(&secret) {
                exposed.push(secret);
            }
        }
        exposed
    }

    /// Rooms reachable from `from` through doors that are not hidden
    ///
    /// With `ignore_locks` the boss gate counts as open.
    pub fn reachable_from(&self, from: Coord, ignore_locks: bool) -> BTreeSet<Coord> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        if self.rooms.contains_key(&from) {
            seen.insert(from);
            queue.push_back(from);
        }
        while let Some(coord) = queue.pop_front() {
            let Some(room) = self.room(coord) else {
                continue;
            };
            for door in &room.doors {
                let passable = if ignore_locks {
                    !door.secret || door.revealed
                } else {
                    door.is_open()
                };
                if passable && seen.insert(door.target) {
                    queue.push_back(door.target);
                }
            }
        }
        seen
    }

    fn validate(&self) -> bool {
        if self.rooms_with_role(RoomRole::Boss).count() != 1 {
            return false;
        }
        let reachable = self.reachable_from(self.start, true);
        self.rooms
            .values()
            .filter(|r| r.role != RoomRole::Secret)
            .all(|r| reachable.contains(&r.coord))
    }
}

/// JSON maps need string keys, so rooms serialize as a list keyed by their own coord
mod room_map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Coord, Room};

    pub fn serialize<S: Serializer>(
        rooms: &BTreeMap<Coord, Room>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(rooms.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Coord, Room>, D::Error> {
        let rooms = Vec::<Room>::deserialize(deserializer)?;
        Ok(rooms.into_iter().map(|r| (r.coord, r)).collect())
    }
}

/// Build a connected floor, regenerating until it validates or the retry cap runs out
pub fn generate_floor(
    index: u32,
    settings: &Settings,
    catalog: &Catalog,
    rng: &mut Pcg32,
) -> Result<FloorGraph> {
    let attempts = settings.generation.retry_cap.max(1);
    for attempt in 1..=attempts {
        match try_generate(index, settings, catalog, rng) {
            Some(floor) if floor.validate() => {
                log::info!(
                    "Generated floor {} with {} rooms (attempt {})",
                    index,
                    floor.rooms.len(),
                    attempt
                );
                return Ok(floor);
            }
            _ => log::warn!("floor {} attempt {} rejected, regenerating", index, attempt),
        }
    }
    Err(SimError::FloorGeneration {
        floor: index,
        attempts,
    })
}

fn in_grid(coord: Coord, settings: &Settings) -> bool {
    let g = &settings.generation;
    (0..g.grid_width).contains(&coord.x) && (0..g.grid_height).contains(&coord.y)
}

/// Critical path from `start`; None when the walk boxes itself in
fn random_walk(
    start: Coord,
    length: usize,
    settings: &Settings,
    rng: &mut Pcg32,
) -> Option<Vec<Coord>> {
    let mut path = vec![start];
    while path.len() < length {
        let last = *path.last()?;
        let options: Vec<(Coord, u32)> = WALK_WEIGHTS
            .iter()
            .map(|&(dir, weight)| (last.step(dir), weight))
            .filter(|(c, _)| in_grid(*c, settings) && !path.contains(c))
            .collect();
        let (next, _) = options.choose_weighted(rng, |(_, w)| *w).ok()?;
        path.push(*next);
    }
    Some(path)
}

fn try_generate(
    index: u32,
    settings: &Settings,
    catalog: &Catalog,
    rng: &mut Pcg32,
) -> Option<FloorGraph> {
    let g = &settings.generation;
    let start = Coord::new(g.grid_width / 2, g.grid_height - 1);
    let length = settings.path_length(index).max(MIN_PATH_LENGTH);

    let path = random_walk(start, length, settings, rng)?;
    let boss = *path.last()?;
    let shop = path[path.len() / 2];

    let mut rooms: BTreeMap<Coord, Room> = BTreeMap::new();
    for &coord in &path {
        let role = if coord == start {
            RoomRole::Start
        } else if coord == boss {
            RoomRole::Boss
        } else if coord == shop {
            RoomRole::Shop
        } else {
            RoomRole::Normal
        };
        rooms.insert(coord, Room::new(coord, role));
    }

    // Side rooms: never next to the boss, so the boss stays at the end of the path
    let wanted = settings.side_rooms(index);
    let mut sides: Vec<Coord> = Vec::new();
    let mut tries = wanted * 8;
    while sides.len() < wanted && tries > 0 {
        tries -= 1;
        let anchors: Vec<Coord> = rooms.keys().copied().filter(|c| *c != boss).collect();
        let anchor = *anchors.choose(rng)?;
        let dir = *Direction::ALL.choose(rng)?;
        let cell = anchor.step(dir);
        if !in_grid(cell, settings)
            || rooms.contains_key(&cell)
            || cell.neighbors().any(|n| n == boss)
        {
            continue;
        }
        rooms.insert(cell, Room::new(cell, RoomRole::Normal));
        sides.push(cell);
    }

    // Roles for side rooms: minibosses first, then the upgrade and shrine
    sides.shuffle(rng);
    let mut minibosses = settings.minibosses(index);
    let mut side_roles = std::iter::repeat_n(RoomRole::Miniboss, minibosses)
        .chain([RoomRole::Upgrade, RoomRole::Shrine]);
    for cell in &sides {
        let Some(role) = side_roles.next() else {
            break;
        };
        if role == RoomRole::Miniboss {
            minibosses -= 1;
        }
        if let Some(room) = rooms.get_mut(cell) {
            room.role = role;
            room.cleared = !role.is_combat();
        }
    }
    // Not enough side rooms: remaining minibosses take over path rooms
    if minibosses > 0 {
        let mut normals: Vec<Coord> = path
            .iter()
            .copied()
            .filter(|c| rooms.get(c).is_some_and(|r| r.role == RoomRole::Normal))
            .collect();
        normals.shuffle(rng);
        for cell in normals.into_iter().take(minibosses) {
            if let Some(room) = rooms.get_mut(&cell) {
                room.role = RoomRole::Miniboss;
            }
        }
    }

    // One secret leaf: a free cell touching exactly one ordinary room
    let mut secret_cells: Vec<Coord> = rooms
        .keys()
        .flat_map(|c| c.neighbors())
        .filter(|c| in_grid(*c, settings) && !rooms.contains_key(c))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|c| {
            let mut touching = c.neighbors().filter_map(|n| rooms.get(&n));
            matches!(
                (touching.next(), touching.next()),
                (Some(r), None) if !matches!(r.role, RoomRole::Boss | RoomRole::Start)
            )
        })
        .collect();
    secret_cells.shuffle(rng);
    if let Some(&cell) = secret_cells.first() {
        rooms.insert(cell, Room::new(cell, RoomRole::Secret));
    }

    let gated = rooms.values().any(|r| r.role == RoomRole::Miniboss);
    let mut floor = FloorGraph {
        index,
        start,
        boss,
        rooms,
    };
    connect_doors(&mut floor, gated);
    populate_rosters(&mut floor, settings, catalog, rng);
    Some(floor)
}

/// Derive doors from adjacency after all rooms exist
fn connect_doors(floor: &mut FloorGraph, gated: bool) {
    let roles: BTreeMap<Coord, RoomRole> = floor.rooms.iter().map(|(c, r)| (*c, r.role)).collect();
    for (coord, room) in floor.rooms.iter_mut() {
        room.doors = Direction::ALL
            .into_iter()
            .filter_map(|dir| {
                let target = coord.step(dir);
                let target_role = *roles.get(&target)?;
                Some(Door {
                    dir,
                    target,
                    locked: gated && target_role == RoomRole::Boss,
                    secret: room.role == RoomRole::Secret || target_role == RoomRole::Secret,
                    revealed: false,
                })
            })
            .collect();
    }
}

fn spawn_point(rng: &mut Pcg32) -> Vec2 {
    Vec2::new(
        rng.random_range(SPAWN_MARGIN..ROOM_WIDTH - SPAWN_MARGIN),
        rng.random_range(SPAWN_MARGIN..ROOM_HEIGHT - SPAWN_MARGIN),
    )
}

fn regulars(count: usize, pool: &[String], rng: &mut Pcg32) -> Vec<SpawnDescriptor> {
    (0..count)
        .filter_map(|_| {
            let id = pool.choose(rng)?.clone();
            Some(SpawnDescriptor {
                id,
                role: SpawnRole::Regular,
                pos: spawn_point(rng),
            })
        })
        .collect()
}

fn populate_rosters(
    floor: &mut FloorGraph,
    settings: &Settings,
    catalog: &Catalog,
    rng: &mut Pcg32,
) {
    let index = floor.index;
    let pool = catalog.pool(index);
    let base = settings.roster_size(index);

    for room in floor.rooms.values_mut() {
        room.roster = match room.role {
            RoomRole::Normal => {
                let count = base + rng.random_range(0..=1usize);
                regulars(count, pool, rng)
            }
            RoomRole::Miniboss => {
                let mut roster: Vec<SpawnDescriptor> = catalog
                    .minibosses()
                    .choose(rng)
                    .map(|id| SpawnDescriptor {
                        id: id.clone(),
                        role: SpawnRole::Miniboss,
                        pos: ROOM_CENTER,
                    })
                    .into_iter()
                    .collect();
                roster.extend(regulars(MINIBOSS_ESCORTS, pool, rng));
                roster
            }
            RoomRole::Boss => catalog
                .boss_for_floor(index)
                .map(|id| SpawnDescriptor {
                    id: id.to_string(),
                    role: SpawnRole::Boss,
                    pos: ROOM_CENTER,
                })
                .into_iter()
                .collect(),
            _ => Vec::new(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn floor_for(seed: u64, index: u32) -> FloorGraph {
        let mut rng = Pcg32::seed_from_u64(seed);
        generate_floor(index, &Settings::default(), &Catalog::builtin(), &mut rng)
            .expect("floor generates")
    }

    #[test]
    fn test_floor_has_required_roles() {
        let floor = floor_for(7, 0);
        assert_eq!(floor.rooms_with_role(RoomRole::Boss).count(), 1);
        assert_eq!(floor.rooms_with_role(RoomRole::Start).count(), 1);
        assert_eq!(floor.rooms_with_role(RoomRole::Shop).count(), 1);
        assert!(floor.rooms_with_role(RoomRole::Miniboss).count() >= 1);
        assert_eq!(floor.room(floor.start).map(|r| r.role), Some(RoomRole::Start));
    }

    #[test]
    fn test_boss_doors_locked_until_minibosses_cleared() {
        let mut floor = floor_for(11, 0);
        let boss = floor.boss;
        let into_boss: Vec<&Door> = floor
            .rooms
            .values()
            .flat_map(|r| r.doors.iter())
            .filter(|d| d.target == boss)
            .collect();
        assert!(!into_boss.is_empty());
        assert!(into_boss.iter().all(|d| d.locked));
        assert!(!floor.reachable_from(floor.start, false).contains(&boss));

        assert!(floor.unlock_boss_doors() > 0);
        assert!(floor.reachable_from(floor.start, false).contains(&boss));
    }

    #[test]
    fn test_doors_are_reciprocal() {
        let floor = floor_for(3, 1);
        for room in floor.rooms.values() {
            for door in &room.doors {
                let back = floor
                    .room(door.target)
                    .and_then(|t| t.door(door.dir.opposite()));
                assert_eq!(back.map(|d| d.target), Some(room.coord));
            }
        }
    }

    #[test]
    fn test_non_combat_rooms_start_cleared() {
        let floor = floor_for(5, 2);
        for room in floor.rooms.values() {
            assert_eq!(room.cleared, !room.role.is_combat(), "{:?}", room.role);
            if !room.role.is_combat() {
                assert!(room.roster.is_empty());
            }
        }
        let boss = floor.room(floor.boss).expect("boss room");
        assert_eq!(boss.roster.len(), 1);
        assert_eq!(boss.roster[0].role, SpawnRole::Boss);
    }

    #[test]
    fn test_secret_reveal_is_reciprocal() {
        let mut floor = floor_for(9, 0);
        let Some(secret) = floor.rooms_with_role(RoomRole::Secret).next().map(|r| r.coord) else {
            return;
        };
        let neighbor = floor
            .room(secret)
            .and_then(|r| r.doors.first())
            .map(|d| d.target)
            .expect("secret room has a door");
        assert!(!floor.reachable_from(floor.start, true).contains(&secret));

        let exposed = floor.reveal_secrets_around(neighbor);
        assert_eq!(exposed, vec![secret]);
        assert!(floor.room(secret).is_some_and(|r| r.doors.iter().all(|d| d.revealed)));
        assert!(floor.reachable_from(floor.start, true).contains(&secret));
    }

    #[test]
    fn test_cramped_grid_fails_after_retry_cap() {
        let mut settings = Settings::default();
        settings.generation.grid_width = 1;
        settings.generation.grid_height = 2;
        settings.generation.retry_cap = 3;
        let mut rng = Pcg32::seed_from_u64(1);
        let err = generate_floor(0, &settings, &Catalog::builtin(), &mut rng)
            .expect_err("no room for a path");
        assert!(matches!(err, SimError::FloorGeneration { attempts: 3, .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_floor_serializes() {
        let floor = floor_for(21, 0);
        let json = serde_json::to_string(&floor).expect("serialize");
        let back: FloorGraph = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.rooms.len(), floor.rooms.len());
        assert_eq!(back.boss, floor.boss);
    }

    proptest! {
        #[test]
        fn test_every_floor_is_connected(seed in any::<u64>(), index in 0u32..6) {
            let floor = floor_for(seed, index);
            let reachable = floor.reachable_from(floor.start, true);
            for room in floor.rooms.values().filter(|r| r.role != RoomRole::Secret) {
                prop_assert!(reachable.contains(&room.coord));
            }
            prop_assert!(reachable.contains(&floor.boss));
            prop_assert!(floor.rooms.len() >= MIN_PATH_LENGTH);

            // Every miniboss can be reached without walking through the boss room
            let mut gated = floor.clone();
            gated.rooms.remove(&floor.boss);
            let without_boss = gated.reachable_from(floor.start, true);
            for room in floor.rooms_with_role(RoomRole::Miniboss) {
                prop_assert!(without_boss.contains(&room.coord));
            }
        }
    }
}
