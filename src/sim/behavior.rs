//! Enemy movement strategies
//!
//! Each `Behavior` maps to one plain function. Strategies see only the mover
//! and the player's position, keep their own bookkeeping in `MoveMemory`, and
//! return a desired velocity. They never touch other entities.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::state::ROOM_CENTER;
use crate::catalog::Behavior;
use crate::consts::*;
use crate::{heading, polar_to_cartesian};

/// Retreaters stop backing off once past the preferred range and resume
/// once the player closes inside this fraction of it
const RETREAT_RESUME: f32 = 0.6;
const WANDER_INTERVAL: (f32, f32) = (0.8, 2.0);
const DASH_REST: (f32, f32) = (1.2, 2.2);
const DASH_BURST_SECS: f32 = 0.35;
const DASH_BURST_MULT: f32 = 3.5;
const TELEPORT_INTERVAL: (f32, f32) = (2.0, 3.5);
/// Teleports never land closer than this to the player
const TELEPORT_MIN_GAP: f32 = 160.0;
/// Strength of the radial correction while strafing
const STRAFE_CORRECTION: f32 = 0.02;

/// Per-entity scratch state for movement strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveMemory {
    /// Countdown until the next decision (wander turn, dash, teleport)
    pub timer: f32,
    pub dir: Vec2,
    /// Retreat: holding position at range
    pub holding: bool,
    /// Dash: remaining burst time
    pub dashing: f32,
    /// Strafe: +1 or -1 around the player
    pub orbit_sign: f32,
}

impl Default for MoveMemory {
    fn default() -> Self {
        Self {
            timer: 1.0,
            dir: Vec2::ZERO,
            holding: false,
            dashing: 0.0,
            orbit_sign: 1.0,
        }
    }
}

/// Read-only inputs for one strategy call
#[derive(Debug, Clone, Copy)]
pub struct SteerInput {
    pub pos: Vec2,
    pub speed: f32,
    pub radius: f32,
    pub preferred_range: f32,
    pub player_pos: Vec2,
    pub dt: f32,
}

/// Strategy output
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Steer {
    pub velocity: Vec2,
    /// Instant relocation (teleporters only)
    pub teleport: Option<Vec2>,
}

impl Steer {
    fn moving(velocity: Vec2) -> Self {
        Self {
            velocity,
            teleport: None,
        }
    }
}

pub type Strategy = fn(&SteerInput, &mut MoveMemory, &mut Pcg32) -> Steer;

impl Behavior {
    pub fn strategy(self) -> Strategy {
        match self {
            Behavior::Stationary => stationary,
            Behavior::Chase => chase,
            Behavior::Flee => flee,
            Behavior::Retreat => retreat,
            Behavior::Wander => wander,
            Behavior::Strafe => strafe,
            Behavior::Bounce => bounce,
            Behavior::Mirror => mirror,
            Behavior::Dash => dash,
            Behavior::Teleport => teleport,
        }
    }
}

/// Run the strategy for `behavior`
pub fn steer(
    behavior: Behavior,
    input: &SteerInput,
    memory: &mut MoveMemory,
    rng: &mut Pcg32,
) -> Steer {
    (behavior.strategy())(input, memory, rng)
}

fn toward_player(input: &SteerInput) -> Vec2 {
    heading(input.player_pos - input.pos)
}

fn stationary(_: &SteerInput, _: &mut MoveMemory, _: &mut Pcg32) -> Steer {
    Steer::default()
}

fn chase(input: &SteerInput, _: &mut MoveMemory, _: &mut Pcg32) -> Steer {
    Steer::moving(toward_player(input) * input.speed)
}

fn flee(input: &SteerInput, _: &mut MoveMemory, _: &mut Pcg32) -> Steer {
    Steer::moving(-toward_player(input) * input.speed)
}

fn retreat(input: &SteerInput, memory: &mut MoveMemory, _: &mut Pcg32) -> Steer {
    let dist = input.pos.distance(input.player_pos);
    if memory.holding {
        if dist < input.preferred_range * RETREAT_RESUME {
            memory.holding = false;
        }
    } else if dist >= input.preferred_range {
        memory.holding = true;
    }

    if memory.holding {
        Steer::default()
    } else {
        Steer::moving(-toward_player(input) * input.speed)
    }
}

fn wander(input: &SteerInput, memory: &mut MoveMemory, rng: &mut Pcg32) -> Steer {
    memory.timer -= input.dt;
    if memory.timer <= 0.0 || memory.dir == Vec2::ZERO {
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        memory.dir = polar_to_cartesian(1.0, angle);
        memory.timer = rng.random_range(WANDER_INTERVAL.0..WANDER_INTERVAL.1);
    }
    Steer::moving(memory.dir * input.speed * 0.6)
}

fn strafe(input: &SteerInput, memory: &mut MoveMemory, rng: &mut Pcg32) -> Steer {
    let to_player = input.player_pos - input.pos;
    let radial = heading(to_player);
    let tangent = radial.perp() * memory.orbit_sign;

    memory.timer -= input.dt;
    if memory.timer <= 0.0 {
        memory.timer = rng.random_range(2.0..4.0);
        if rng.random_bool(0.3) {
            memory.orbit_sign = -memory.orbit_sign;
        }
    }

    // Close in or back off toward the preferred ring
    let error = to_player.length() - input.preferred_range;
    let correction = (error * STRAFE_CORRECTION).clamp(-1.0, 1.0);
    let dir = heading(tangent + radial * correction);
    Steer::moving(dir * input.speed)
}

fn bounce(input: &SteerInput, memory: &mut MoveMemory, rng: &mut Pcg32) -> Steer {
    if memory.dir == Vec2::ZERO {
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        memory.dir = polar_to_cartesian(1.0, angle);
    }
    let next = input.pos + memory.dir * input.speed * input.dt;
    let r = input.radius;
    if (next.x < r && memory.dir.x < 0.0) || (next.x > ROOM_WIDTH - r && memory.dir.x > 0.0) {
        memory.dir.x = -memory.dir.x;
    }
    if (next.y < r && memory.dir.y < 0.0) || (next.y > ROOM_HEIGHT - r && memory.dir.y > 0.0) {
        memory.dir.y = -memory.dir.y;
    }
    Steer::moving(memory.dir * input.speed)
}

fn mirror(input: &SteerInput, _: &mut MoveMemory, _: &mut Pcg32) -> Steer {
    let target = ROOM_CENTER * 2.0 - input.player_pos;
    let offset = target - input.pos;
    // Arrive without overshooting
    let max_step = input.speed * input.dt;
    let velocity = if max_step > 0.0 && offset.length() <= max_step {
        offset / input.dt
    } else {
        offset.try_normalize().unwrap_or(Vec2::ZERO) * input.speed
    };
    Steer::moving(velocity)
}

fn dash(input: &SteerInput, memory: &mut MoveMemory, rng: &mut Pcg32) -> Steer {
    if memory.dashing > 0.0 {
        memory.dashing -= input.dt;
        return Steer::moving(memory.dir * input.speed * DASH_BURST_MULT);
    }
    memory.timer -= input.dt;
    if memory.timer <= 0.0 {
        memory.dir = toward_player(input);
        memory.dashing = DASH_BURST_SECS;
        memory.timer = rng.random_range(DASH_REST.0..DASH_REST.1);
    }
    // Drift toward the player between bursts
    Steer::moving(toward_player(input) * input.speed * 0.25)
}

fn teleport(input: &SteerInput, memory: &mut MoveMemory, rng: &mut Pcg32) -> Steer {
    memory.timer -= input.dt;
    if memory.timer > 0.0 {
        return Steer::default();
    }
    memory.timer = rng.random_range(TELEPORT_INTERVAL.0..TELEPORT_INTERVAL.1);

    let margin = input.radius + 40.0;
    let mut target = input.pos;
    for _ in 0..8 {
        let candidate = Vec2::new(
            rng.random_range(margin..ROOM_WIDTH - margin),
            rng.random_range(margin..ROOM_HEIGHT - margin),
        );
        target = candidate;
        if candidate.distance(input.player_pos) >= TELEPORT_MIN_GAP {
            break;
        }
    }
    Steer {
        velocity: Vec2::ZERO,
        teleport: Some(target),
    }
}
