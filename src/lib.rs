//! Bullet Crawl - simulation core for a top-down bullet-hell roguelike
//!
//! Core modules:
//! - `sim`: Deterministic simulation (floor generation, rooms, entities, projectiles, collisions)
//! - `catalog`: Immutable stat tables for enemies, bosses, weapons and modifiers
//! - `settings`: Tunable run configuration
//! - `error`: Error taxonomy shared by all modules

pub mod catalog;
pub mod error;
pub mod settings;
pub mod sim;

pub use catalog::Catalog;
pub use error::{Result, SimError};
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Nominal simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Room dimensions (every room shares one footprint)
    pub const ROOM_WIDTH: f32 = 960.0;
    pub const ROOM_HEIGHT: f32 = 640.0;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 12.0;
    pub const PLAYER_SPEED: f32 = 220.0;
    /// Movement multiplier while focus is held
    pub const FOCUS_SPEED_MULT: f32 = 0.45;
    pub const DASH_SPEED: f32 = 640.0;
    pub const DASH_DURATION: f32 = 0.15;
    pub const DASH_COOLDOWN: f32 = 0.8;
    /// Invulnerability window after taking a hit
    pub const HIT_INVULN_SECS: f32 = 0.75;

    /// Enemy entry animation length (no movement/attacks)
    pub const SPAWN_DURATION: f32 = 0.6;
    /// Cap on live enemies a summon attack may grow a room to
    pub const MAX_ROOM_ENEMIES: usize = 24;
    /// How fast an enemy turns to face the player (rad/s)
    pub const ENEMY_TURN_RATE: f32 = 3.0;

    /// Door trigger rectangle: half width along the wall, depth into the room
    pub const DOOR_HALF_WIDTH: f32 = 40.0;
    pub const DOOR_DEPTH: f32 = 28.0;
    /// Distance from the wall the player is placed at when entering a room
    pub const ENTRY_OFFSET: f32 = 72.0;
    pub const PORTAL_RADIUS: f32 = 28.0;
    /// Distance from the room center that counts as "at the shrine"
    pub const SHRINE_RADIUS: f32 = 48.0;

    /// Homing projectiles only look for targets within this radius
    pub const HOMING_RADIUS: f32 = 260.0;
    pub const DEFAULT_TURN_RATE: f32 = 4.0;
    /// Orbiting projectiles
    pub const ORBIT_RADIUS: f32 = 48.0;
    pub const ORBIT_ANGULAR_SPEED: f32 = 4.0;
    pub const ORBIT_RELEASE_RANGE: f32 = 220.0;
    pub const ORBIT_RELEASE_SPEED: f32 = 420.0;
    pub const ORBIT_LIFETIME: f32 = 8.0;
    pub const MAX_ORBITERS: usize = 4;

    /// Pickups
    pub const PICKUP_RADIUS: f32 = 8.0;
    pub const MAGNET_RADIUS: f32 = 120.0;
    pub const MAGNET_ACCEL: f32 = 900.0;
    pub const PICKUP_MAX_SPEED: f32 = 360.0;
    pub const PICKUP_DRAG: f32 = 0.9;

    /// Bombs
    pub const BOMB_RADIUS: f32 = 260.0;
    pub const BOMB_DAMAGE: f32 = 40.0;

    /// Hazards deal their damage in pulses
    pub const HAZARD_PULSE_SECS: f32 = 0.5;

    /// Knockback velocity decays exponentially at this rate (1/s)
    pub const KNOCKBACK_DECAY: f32 = 8.0;
}

/// Heading used whenever a direction is requested from a zero-length vector
pub const FALLBACK_HEADING: Vec2 = Vec2::NEG_Y;

/// Unit direction of `v`, or `FALLBACK_HEADING` when `v` has no usable length
#[inline]
pub fn heading(v: Vec2) -> Vec2 {
    v.try_normalize().unwrap_or(FALLBACK_HEADING)
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Rotate unit vector `dir` toward `target` by at most `max_angle` radians
pub fn rotate_toward(dir: Vec2, target: Vec2, max_angle: f32) -> Vec2 {
    let dir = heading(dir);
    let target = heading(target);
    let delta = dir.perp_dot(target).atan2(dir.dot(target));
    let step = delta.clamp(-max_angle, max_angle);
    Vec2::from_angle(step).rotate(dir)
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}
