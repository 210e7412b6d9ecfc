//! Player movement and actions
//!
//! Runs first in the behavior pass, before weapons and enemies.

use glam::Vec2;

use super::choice;
use super::collision::{bleed_player, clamp_to_room, damage_enemy};
use super::events::{Feedback, GameEvent};
use super::floor::RoomRole;
use super::state::{GamePhase, ROOM_CENTER, Side, SimulationState};
use super::tick::TickInput;
use crate::catalog::Catalog;
use crate::consts::*;
use crate::heading;

/// Sanitized movement axes: finite and at most unit length
fn movement_axes(raw: Vec2) -> Vec2 {
    if raw.is_finite() {
        raw.clamp_length_max(1.0)
    } else {
        Vec2::ZERO
    }
}

/// Timers, aim, dash, movement, bombs and interaction
pub fn update_player(state: &mut SimulationState, catalog: &Catalog, input: &TickInput, dt: f32) {
    let player = &mut state.player;
    player.invuln = (player.invuln - dt).max(0.0);
    player.dash_cooldown = (player.dash_cooldown - dt).max(0.0);
    player.dash_remaining = (player.dash_remaining - dt).max(0.0);
    let dot = player.status.tick(dt);
    if dot > 0.0 {
        bleed_player(state, dot);
        if state.phase != GamePhase::Playing {
            return;
        }
    }
    let player = &mut state.player;

    if input.aim.is_finite() && input.aim != Vec2::ZERO {
        player.aim = heading(input.aim);
    }

    let axes = movement_axes(input.movement);
    if input.dash_pressed && player.dash_cooldown <= 0.0 && !player.is_dashing() {
        player.dash_dir = if axes == Vec2::ZERO { player.aim } else { heading(axes) };
        player.dash_remaining = DASH_DURATION;
        player.dash_cooldown = DASH_COOLDOWN;
    }

    let vel = if player.is_dashing() {
        player.dash_dir * DASH_SPEED
    } else {
        let focus = if input.focus_held { FOCUS_SPEED_MULT } else { 1.0 };
        let speed = PLAYER_SPEED * player.stats.speed_mult * focus * player.status.speed_mult();
        axes * speed + player.status.knockback
    };
    player.body.vel = vel;
    player.body.pos = clamp_to_room(player.body.pos + vel * dt, player.body.radius);

    if input.bomb_pressed {
        use_bomb(state);
    }
    if input.interact_pressed {
        interact(state, catalog);
    }
}

/// Spend a bomb: wipe enemy fire, hurt nearby enemies, expose hidden doors
///
/// A no-op returning false with no bombs left.
pub fn use_bomb(state: &mut SimulationState) -> bool {
    if state.player.bombs == 0 {
        return false;
    }
    state.player.bombs -= 1;
    let origin = state.player.body.pos;

    for shot in state.projectiles.iter_mut().filter(|p| p.side == Side::Enemy) {
        shot.active = false;
    }
    for i in 0..state.enemies.len() {
        let enemy = &state.enemies[i];
        let reach = BOMB_RADIUS + enemy.body.radius;
        if enemy.is_engaged() && enemy.body.pos.distance(origin) <= reach {
            damage_enemy(state, i, BOMB_DAMAGE);
        }
    }

    state.emit(GameEvent::BombUsed);
    state.emit(GameEvent::Feedback(Feedback::ScreenShake(0.8)));
    let current = state.current;
    for coord in state.floor.reveal_secrets_around(current) {
        log::info!("secret room revealed at ({}, {})", coord.x, coord.y);
        state.emit(GameEvent::SecretRevealed { coord });
    }
    true
}

/// Use the shrine when standing at it
fn interact(state: &mut SimulationState, catalog: &Catalog) {
    if state.current_role() != Some(RoomRole::Shrine) {
        return;
    }
    let at_shrine = state.player.body.pos.distance(ROOM_CENTER) <= SHRINE_RADIUS;
    if at_shrine && choice::can_use_shrine(state) {
        choice::commit_choice(state, catalog, 0);
    }
}
