//! Room lifecycle
//!
//! Entering a room swaps out every per-room collection, replays the roster of
//! an uncleared room and places the player just inside the door they came
//! through. Clearing is one-shot. The boss room offers a reward and, once it
//! is taken, a portal to the next floor.

use glam::Vec2;
use rand::seq::IndexedRandom;

use super::choice::{self, RoomFeature};
use super::collision::{Rect, circle_rect_overlap, circles_overlap};
use super::events::GameEvent;
use super::floor::{self, Coord, Direction, RoomRole, SpawnDescriptor, SpawnRole};
use super::state::{Enemy, EnemyRole, Pickup, PickupKind, ROOM_CENTER, SimulationState};
use crate::catalog::{Catalog, EnemyDef};
use crate::consts::*;
use crate::error::Result;
use crate::heading;

/// Midpoint of the wall a door sits in
pub fn door_point(dir: Direction) -> Vec2 {
    match dir {
        Direction::North => Vec2::new(ROOM_WIDTH / 2.0, 0.0),
        Direction::South => Vec2::new(ROOM_WIDTH / 2.0, ROOM_HEIGHT),
        Direction::East => Vec2::new(ROOM_WIDTH, ROOM_HEIGHT / 2.0),
        Direction::West => Vec2::new(0.0, ROOM_HEIGHT / 2.0),
    }
}

/// Trigger rectangle hugging the wall at a door
pub fn door_rect(dir: Direction) -> Rect {
    let center = door_point(dir) - dir.unit() * (DOOR_DEPTH / 2.0);
    let half = match dir {
        Direction::North | Direction::South => Vec2::new(DOOR_HALF_WIDTH, DOOR_DEPTH / 2.0),
        Direction::East | Direction::West => Vec2::new(DOOR_DEPTH / 2.0, DOOR_HALF_WIDTH),
    };
    Rect::from_center(center, half)
}

/// Where the player stands after walking in through the door on side `dir`
pub fn entry_point(dir: Direction) -> Vec2 {
    door_point(dir) - dir.unit() * ENTRY_OFFSET
}

/// Make `coord` the active room
pub fn enter_room(state: &mut SimulationState, catalog: &Catalog, coord: Coord) {
    let previous = state.current;

    // Uncollected pickups stay where they were dropped
    let leftovers: Vec<Pickup> = state.pickups.drain(..).filter(|p| p.active).collect();
    if let Some(room) = state.floor.room_mut(previous) {
        room.stash.extend(leftovers);
    }
    state.enemies.clear();
    state.projectiles.clear();
    state.hazards.clear();

    // Came through the door on our side that faces the previous room
    let player = &mut state.player;
    player.body.pos = match Direction::between(previous, coord) {
        Some(moved) => entry_point(moved.opposite()),
        None => ROOM_CENTER,
    };
    player.body.vel = Vec2::ZERO;
    player.status.knockback = Vec2::ZERO;
    player.dash_remaining = 0.0;
    player.weapon.charging = false;
    player.weapon.charge = 0.0;

    state.current = coord;
    let weapon_id = state.player.weapon.def.id.clone();
    let Some(room) = state.floor.room_mut(coord) else {
        log::warn!("entered missing room {:?}", coord);
        return;
    };
    let first_visit = !room.visited;
    room.visited = true;
    let role = room.role;
    let cleared = room.cleared;
    let roster: Vec<SpawnDescriptor> = if cleared { Vec::new() } else { room.roster.clone() };
    let needs_feature = room.feature.is_none() && role != RoomRole::Boss;
    state.pickups = std::mem::take(&mut room.stash);

    if needs_feature {
        let feature = choice::generate_feature(role, catalog, &weapon_id, &mut state.rng);
        if let Some(room) = state.current_room_mut() {
            room.feature = feature;
        }
    }
    if first_visit && role == RoomRole::Secret {
        stock_secret_room(state, catalog);
    }

    let spawned = roster
        .iter()
        .filter(|desc| spawn_from_descriptor(state, catalog, desc).is_some())
        .count();
    state.room_enemies_seen = spawned > 0;

    log::info!(
        "entered {:?} room at ({}, {}), {} enemies",
        role,
        coord.x,
        coord.y,
        spawned
    );
    state.emit(GameEvent::RoomEntered { coord });

    if !cleared && role.is_combat() && spawned == 0 {
        log::warn!("room ({}, {}) has no spawnable enemies, clearing it", coord.x, coord.y);
        clear_room(state, catalog);
    }
}

fn stock_secret_room(state: &mut SimulationState, catalog: &Catalog) {
    let modifiers: Vec<&str> = catalog.modifier_ids().collect();
    let mut loot = vec![(PickupKind::Currency, 10), (PickupKind::Bomb, 1)];
    if let Some(id) = modifiers.choose(&mut state.rng) {
        loot.push((PickupKind::Cartridge(id.to_string()), 1));
    }
    let current = state.player.weapon.def.id.as_str();
    let weapons: Vec<&str> = catalog.weapon_ids().filter(|id| *id != current).collect();
    if let Some(id) = weapons.choose(&mut state.rng) {
        loot.push((PickupKind::Weapon(id.to_string()), 1));
    }
    let count = loot.len();
    for (i, (kind, value)) in loot.into_iter().enumerate() {
        let angle = i as f32 / count as f32 * std::f32::consts::TAU;
        let id = state.next_entity_id();
        state.pickups.push(Pickup {
            id,
            kind,
            pos: ROOM_CENTER + crate::polar_to_cartesian(40.0, angle),
            vel: Vec2::ZERO,
            value,
            active: true,
        });
    }
}

/// Add an enemy to the active room; returns its id
pub fn spawn_enemy(
    state: &mut SimulationState,
    def: &EnemyDef,
    pos: Vec2,
    role: EnemyRole,
) -> u32 {
    let id = state.next_entity_id();
    let scale = state.health_scale();
    let enemy = Enemy::from_def(id, def, pos, scale, role);
    push_facing_player(state, enemy);
    id
}

/// Add an enemy that starts out facing the player
fn push_facing_player(state: &mut SimulationState, mut enemy: Enemy) {
    enemy.facing = heading(state.player.body.pos - enemy.body.pos);
    state.enemies.push(enemy);
}

/// Spawn one roster entry, skipping unknown catalog keys
fn spawn_from_descriptor(
    state: &mut SimulationState,
    catalog: &Catalog,
    desc: &SpawnDescriptor,
) -> Option<u32> {
    let spawned = match desc.role {
        SpawnRole::Regular => catalog
            .enemy(&desc.id)
            .map(|def| spawn_enemy(state, def, desc.pos, EnemyRole::Regular)),
        SpawnRole::Miniboss => catalog
            .enemy(&desc.id)
            .map(|def| spawn_enemy(state, def, desc.pos, EnemyRole::Miniboss)),
        SpawnRole::Boss => catalog.boss(&desc.id).map(|def| {
            let id = state.next_entity_id();
            let scale = state.health_scale();
            push_facing_player(state, Enemy::from_boss(id, def, desc.pos, scale));
            id
        }),
    };
    match spawned {
        Ok(id) => Some(id),
        Err(err) => {
            log::warn!("skipping spawn: {}", err);
            None
        }
    }
}

/// Clear the active room once its last enemy is gone
///
/// Returns true on the tick the room flips to cleared.
pub fn check_room_cleared(state: &mut SimulationState, catalog: &Catalog) -> bool {
    if !state.room_enemies_seen || state.active_enemy_count() > 0 {
        return false;
    }
    if state.current_room().is_none_or(|r| r.cleared) {
        return false;
    }
    clear_room(state, catalog);
    true
}

fn clear_room(state: &mut SimulationState, catalog: &Catalog) {
    let coord = state.current;
    let weapon_id = state.player.weapon.def.id.clone();
    let Some(room) = state.floor.room_mut(coord) else {
        return;
    };
    if room.cleared {
        return;
    }
    room.cleared = true;
    let role = room.role;
    log::info!("cleared {:?} room at ({}, {})", role, coord.x, coord.y);
    state.emit(GameEvent::RoomCleared { coord });

    match role {
        RoomRole::Miniboss => {
            if state.floor.minibosses_cleared() && state.floor.unlock_boss_doors() > 0 {
                log::info!("boss doors unlocked");
                state.emit(GameEvent::DoorsUnlocked);
            }
        }
        RoomRole::Boss => {
            let reward =
                choice::generate_feature(RoomRole::Boss, catalog, &weapon_id, &mut state.rng);
            if let Some(room) = state.current_room_mut() {
                room.feature = reward;
            }
        }
        _ => {}
    }
}

/// The boss reward has been taken in the active room
pub fn portal_open(state: &SimulationState) -> bool {
    state.current_role() == Some(RoomRole::Boss)
        && matches!(
            state.current_room().and_then(|r| r.feature.as_ref()),
            Some(RoomFeature::BossReward { taken: true, .. })
        )
}

pub fn portal_position() -> Vec2 {
    ROOM_CENTER
}

/// Replace the floor with floor+1 and start at its entrance
pub fn advance_floor(state: &mut SimulationState, catalog: &Catalog) -> Result<()> {
    let next = state.floor_index + 1;
    let graph = floor::generate_floor(next, &state.settings, catalog, &mut state.rng)?;
    let start = graph.start;
    state.floor = graph;
    state.floor_index = next;
    state.pickups.clear();
    state.current = start;
    enter_room(state, catalog, start);
    state.emit(GameEvent::FloorAdvanced { floor: next });
    Ok(())
}

/// Open door under the player in a cleared room
pub fn door_under_player(state: &SimulationState) -> Option<Coord> {
    let room = state.current_room()?;
    if !room.cleared {
        return None;
    }
    let body = &state.player.body;
    room.open_doors()
        .find(|door| circle_rect_overlap(body.pos, body.radius, &door_rect(door.dir)))
        .map(|door| door.target)
}

/// Pass (e): portal first, then doors
pub fn check_exits(state: &mut SimulationState, catalog: &Catalog) -> Result<()> {
    if portal_open(state)
        && circles_overlap(
            state.player.body.pos,
            state.player.body.radius,
            portal_position(),
            PORTAL_RADIUS,
        )
    {
        return advance_floor(state, catalog);
    }
    if let Some(target) = door_under_player(state) {
        enter_room(state, catalog, target);
    }
    Ok(())
}
