//! Demo mode - the simulation plays itself
//!
//! Produces a `TickInput` from the current state. Good enough to fight
//! through rooms, take rewards and walk to the portal; used by the headless
//! runner and by long-running tests.

use std::collections::{BTreeMap, VecDeque};

use glam::Vec2;

use super::choice::{self, RoomFeature};
use super::floor::{Coord, Direction, RoomRole};
use super::room::{door_point, portal_open, portal_position};
use super::state::{ROOM_CENTER, Side, SimulationState};
use super::tick::TickInput;
use crate::catalog::FireMode;
use crate::consts::*;

/// Comfortable distance to keep from the nearest enemy
const ENGAGE_RANGE: (f32, f32) = (180.0, 320.0);
/// Enemy shots closer than this trigger a dash
const DODGE_RADIUS: f32 = 48.0;
/// Arrival tolerance for move targets
const ARRIVE: f32 = 6.0;

/// Build this tick's input
pub fn drive(state: &SimulationState) -> TickInput {
    let mut input = TickInput::default();
    let player = &state.player;
    let pos = player.body.pos;

    if let Some(target) = state.nearest_enemy(pos, f32::INFINITY) {
        let to_target = target.body.pos - pos;
        input.aim = to_target;
        input.fire_held = match player.weapon.def.mode {
            // Release once fully charged, then start over
            FireMode::Charge { .. } => player.weapon.charge_fraction() < 1.0,
            _ => true,
        };

        // Hold a band of distance, circling inside it
        let dist = to_target.length();
        let away = -to_target.normalize_or_zero();
        input.movement = if dist < ENGAGE_RANGE.0 {
            away
        } else if dist > ENGAGE_RANGE.1 {
            -away
        } else {
            away.perp()
        };
        // Drift back toward the middle so we never pin ourselves on a wall
        let centering = (ROOM_CENTER - pos).normalize_or_zero() * 0.3;
        input.movement = (input.movement + centering).normalize_or_zero();
    } else if let Some(target) = move_target(state) {
        input.movement = steer_to(pos, target);
    }

    if let Some(threat) = incoming_shot(state) {
        input.movement = threat.perp();
        input.dash_pressed = player.dash_cooldown <= 0.0;
        // Last hit point: wipe the screen
        input.bomb_pressed = player.body.health + player.body.shield <= 1.0 && player.bombs > 0;
    }

    input.reload_pressed = player.weapon.capacity().is_some() && player.weapon.clip == 0;

    // Shrines are used on the spot; bombs are spent near hidden doors
    if state.current_role() == Some(RoomRole::Shrine) && wants_shrine(state) {
        input.interact_pressed = pos.distance(ROOM_CENTER) <= SHRINE_RADIUS;
    }
    if room_is_quiet(state) && player.bombs > 0 && hidden_door_here(state) {
        input.bomb_pressed = true;
    }
    input
}

/// Pick an offer to commit in the current room, if any is worth taking
///
/// Shrines are left to `interact`.
pub fn choose(state: &SimulationState) -> Option<usize> {
    let feature = state.current_room()?.feature.as_ref()?;
    if matches!(feature, RoomFeature::Shrine { .. }) {
        return None;
    }
    (0..feature.offers().len()).find(|&i| choice::can_afford(state, i))
}

/// Velocity of the nearest enemy shot about to hit us
fn incoming_shot(state: &SimulationState) -> Option<Vec2> {
    let pos = state.player.body.pos;
    state
        .projectiles
        .iter()
        .filter(|p| p.active && p.side == Side::Enemy)
        .filter(|p| p.pos.distance(pos) <= DODGE_RADIUS + p.radius && p.vel.dot(pos - p.pos) > 0.0)
        .min_by(|a, b| a.pos.distance_squared(pos).total_cmp(&b.pos.distance_squared(pos)))
        .map(|p| p.vel.normalize_or_zero())
}

fn room_is_quiet(state: &SimulationState) -> bool {
    state.active_enemy_count() == 0 && state.current_room().is_some_and(|r| r.cleared)
}

fn hidden_door_here(state: &SimulationState) -> bool {
    state
        .current_room()
        .is_some_and(|r| r.doors.iter().any(|d| d.secret && !d.revealed))
}

fn wants_shrine(state: &SimulationState) -> bool {
    choice::can_use_shrine(state) && state.player.body.health > choice::SHRINE_HEALTH_COST + 1.0
}

/// Where to walk when there is nothing to shoot
fn move_target(state: &SimulationState) -> Option<Vec2> {
    let pos = state.player.body.pos;
    if let Some(pickup) = state
        .pickups
        .iter()
        .filter(|p| p.active)
        .min_by(|a, b| a.pos.distance_squared(pos).total_cmp(&b.pos.distance_squared(pos)))
    {
        return Some(pickup.pos);
    }
    if !room_is_quiet(state) {
        // Enemies still spawning in
        return Some(ROOM_CENTER);
    }
    if portal_open(state) {
        return Some(portal_position());
    }
    if state.current_role() == Some(RoomRole::Shrine) && wants_shrine(state) {
        return Some(ROOM_CENTER);
    }
    next_door(state).map(door_point)
}

/// First door on the shortest open route to an unvisited room, else to the boss
fn next_door(state: &SimulationState) -> Option<Direction> {
    let floor = &state.floor;
    let start = state.current;
    let mut parent: BTreeMap<Coord, (Coord, Direction)> = BTreeMap::new();
    let mut queue = VecDeque::from([start]);
    let mut order = Vec::new();

    while let Some(coord) = queue.pop_front() {
        order.push(coord);
        let Some(room) = floor.room(coord) else {
            continue;
        };
        for door in room.open_doors() {
            if door.target != start && !parent.contains_key(&door.target) {
                parent.insert(door.target, (coord, door.dir));
                queue.push_back(door.target);
            }
        }
    }

    // Leave the boss for last
    let goal = order
        .iter()
        .copied()
        .find(|c| *c != floor.boss && floor.room(*c).is_some_and(|r| !r.visited))
        .or_else(|| parent.contains_key(&floor.boss).then_some(floor.boss))?;

    let mut step = goal;
    loop {
        let (from, dir) = *parent.get(&step)?;
        if from == start {
            return Some(dir);
        }
        step = from;
    }
}

fn steer_to(pos: Vec2, target: Vec2) -> Vec2 {
    let delta = target - pos;
    if delta.length() <= ARRIVE {
        Vec2::ZERO
    } else {
        delta.normalize_or_zero()
    }
}
