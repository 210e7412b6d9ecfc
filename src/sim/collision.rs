//! Collision detection and resolution
//!
//! Geometry helpers first, then the resolver. The resolver runs once per tick
//! after every position has been updated, in a fixed order: player shots vs
//! enemies, enemy shots vs player, contact damage, hazard pulses, pickups.
//! Room exits are checked separately once room clearing has been evaluated.
//!
//! Entities are only marked inactive here. They are filtered out at the start
//! of the next tick.

use glam::Vec2;
use rand::Rng;

use super::events::GameEvent;
use super::state::{
    DamageReport, GamePhase, Hazard, PickupKind, ROOM_CENTER, Side, SimulationState,
};
use crate::catalog::{Catalog, HitPayload};
use crate::consts::*;
use crate::heading;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Collision point (if hit)
    pub point: Vec2,
    /// Surface normal at collision (pointing back into the room)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// Check a circle against the four room walls
///
/// Reports the deepest wall penetration with an inward normal.
pub fn wall_contact(pos: Vec2, radius: f32) -> CollisionResult {
    let walls = [
        (radius - pos.x, Vec2::X, Vec2::new(0.0, pos.y)),
        (pos.x + radius - ROOM_WIDTH, Vec2::NEG_X, Vec2::new(ROOM_WIDTH, pos.y)),
        (radius - pos.y, Vec2::Y, Vec2::new(pos.x, 0.0)),
        (pos.y + radius - ROOM_HEIGHT, Vec2::NEG_Y, Vec2::new(pos.x, ROOM_HEIGHT)),
    ];
    walls
        .into_iter()
        .filter(|(pen, _, _)| *pen > 0.0)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(penetration, normal, point)| CollisionResult {
            hit: true,
            point,
            normal,
            penetration,
        })
        .unwrap_or_else(CollisionResult::miss)
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) <= r * r
}

pub fn circle_rect_overlap(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let closest = center.clamp(rect.min, rect.max);
    closest.distance_squared(center) <= radius * radius
}

/// Keep a circle inside the room; invalid positions snap to the center
pub fn clamp_to_room(pos: Vec2, radius: f32) -> Vec2 {
    if !pos.is_finite() {
        return ROOM_CENTER;
    }
    let r = Vec2::splat(radius.min(ROOM_HEIGHT / 2.0));
    pos.clamp(r, Vec2::new(ROOM_WIDTH, ROOM_HEIGHT) - r)
}

/// Point inside a cone of total angle `arc` opening along `facing`
pub fn in_cone(origin: Vec2, facing: Vec2, arc: f32, range: f32, point: Vec2) -> bool {
    let offset = point - origin;
    if offset.length_squared() > range * range {
        return false;
    }
    if offset == Vec2::ZERO {
        return true;
    }
    heading(facing).angle_to(offset).abs() <= arc / 2.0
}

/// Apply an enemy hit to the player, honoring invulnerability
///
/// Returns true when damage landed.
pub fn hit_player(
    state: &mut SimulationState,
    amount: f32,
    payload: &HitPayload,
    source: Vec2,
) -> bool {
    let player = &mut state.player;
    if !player.body.active || player.is_invulnerable() {
        return false;
    }
    let report = player.body.apply_damage(amount);
    if report.total() <= 0.0 {
        return false;
    }
    player.invuln = HIT_INVULN_SECS;
    if let Some(slow) = payload.slow {
        player.status.apply_slow(slow);
    }
    if let Some(burn) = payload.burn {
        player.status.apply_dot(burn.dps, burn.duration);
    }
    if payload.knockback > 0.0 {
        let push = heading(player.body.pos - source) * payload.knockback;
        player.status.apply_knockback(push);
    }
    report_player_damage(state, amount, report);
    true
}

/// Damage-over-time on the player; ignores the invulnerability window
pub(crate) fn bleed_player(state: &mut SimulationState, amount: f32) {
    let player = &mut state.player;
    if !player.body.active || amount <= 0.0 {
        return;
    }
    let report = player.body.apply_damage(amount);
    if report.total() > 0.0 {
        report_player_damage(state, amount, report);
    }
}

fn report_player_damage(state: &mut SimulationState, amount: f32, report: DamageReport) {
    let health = state.player.body.health.max(0.0);
    state.emit(GameEvent::DamageTaken {
        amount,
        absorbed: report.absorbed,
        health,
    });
    if report.killed {
        log::info!("player killed on floor {}", state.floor_index);
        state.phase = GamePhase::GameOver;
        state.emit(GameEvent::PlayerDied);
    }
}

/// Damage one enemy by index and report the amount dealt
pub(crate) fn damage_enemy(state: &mut SimulationState, index: usize, amount: f32) -> bool {
    let enemy = &mut state.enemies[index];
    let report = enemy.body.apply_damage(amount);
    let id = enemy.id;
    if report.total() > 0.0 {
        state.emit(GameEvent::DamageDealt {
            target: id,
            amount: report.total(),
        });
    }
    report.killed
}

/// Pending splash from an explosive hit
struct Splash {
    pos: Vec2,
    radius: f32,
    damage: f32,
    /// The enemy that took the direct hit
    skip: u32,
}

/// Run passes (a) through (d)
pub fn resolve(state: &mut SimulationState, catalog: &Catalog) {
    player_shots(state);
    if state.phase == GamePhase::Playing {
        enemy_shots(state);
    }
    if state.phase == GamePhase::Playing {
        contact_damage(state);
    }
    if state.phase == GamePhase::Playing {
        hazard_pulses(state);
    }
    if state.phase == GamePhase::Playing {
        collect_pickups(state, catalog);
    }
}

/// (a) Player projectiles vs enemies
fn player_shots(state: &mut SimulationState) {
    let mut splashes: Vec<Splash> = Vec::new();
    let mut fields: Vec<(Vec2, f32, f32, f32)> = Vec::new();
    let mut heals = 0u32;

    for pi in 0..state.projectiles.len() {
        let shot = &state.projectiles[pi];
        if !shot.active || shot.side != Side::Player {
            continue;
        }
        let (pos, radius) = (shot.pos, shot.radius);
        let (damage, modifiers) = (shot.damage, shot.modifiers);

        for ei in 0..state.enemies.len() {
            let enemy = &state.enemies[ei];
            if !enemy.is_engaged()
                || !circles_overlap(pos, radius, enemy.body.pos, enemy.body.radius)
            {
                continue;
            }
            let enemy_id = enemy.id;
            if state.projectiles[pi].hits.contains(&enemy_id) {
                continue;
            }

            let killed = damage_enemy(state, ei, damage);
            let enemy = &mut state.enemies[ei];
            if let Some(dot) = modifiers.dot {
                enemy.status.apply_dot(dot.dps, dot.duration);
            }
            if let Some(impact) = modifiers.impact {
                enemy.status.apply_stun(impact.stun);
                let push = heading(enemy.body.pos - pos) * impact.knockback;
                enemy.status.apply_knockback(push);
            }
            if let Some(explosive) = modifiers.explosive {
                splashes.push(Splash {
                    pos,
                    radius: explosive.radius,
                    damage: damage * explosive.damage_mult,
                    skip: enemy_id,
                });
            }
            if let Some(field) = modifiers.field {
                fields.push((pos, field.radius, field.damage, field.duration));
            }
            if killed {
                if let Some(chance) = modifiers.vampiric {
                    if state.rng.random_bool(f64::from(chance.clamp(0.0, 1.0))) {
                        heals += 1;
                    }
                }
            }

            let shot = &mut state.projectiles[pi];
            shot.hits.push(enemy_id);
            if !modifiers.piercing {
                // Consumed by its first hit
                shot.active = false;
                break;
            }
        }
    }

    for splash in splashes {
        for ei in 0..state.enemies.len() {
            let enemy = &state.enemies[ei];
            if enemy.id == splash.skip
                || !enemy.is_engaged()
                || !circles_overlap(splash.pos, splash.radius, enemy.body.pos, enemy.body.radius)
            {
                continue;
            }
            damage_enemy(state, ei, splash.damage);
        }
    }

    for (pos, radius, damage, duration) in fields {
        let id = state.next_entity_id();
        state.hazards.push(Hazard {
            id,
            pos,
            radius,
            damage,
            remaining: duration,
            pulse_timer: HAZARD_PULSE_SECS,
            side: Side::Player,
            active: true,
        });
    }

    if heals > 0 {
        state.player.body.heal(heals as f32);
    }
}

/// (b) Enemy projectiles vs player
fn enemy_shots(state: &mut SimulationState) {
    for pi in 0..state.projectiles.len() {
        let shot = &state.projectiles[pi];
        if !shot.active
            || shot.side != Side::Enemy
            || !circles_overlap(
                shot.pos,
                shot.radius,
                state.player.body.pos,
                state.player.body.radius,
            )
        {
            continue;
        }
        let (damage, payload, pos) = (shot.damage, shot.payload, shot.pos);
        if hit_player(state, damage, &payload, pos) {
            state.projectiles[pi].active = false;
        }
        if state.phase == GamePhase::GameOver {
            return;
        }
    }
}

/// (c) Touch damage from enemy bodies
fn contact_damage(state: &mut SimulationState) {
    for ei in 0..state.enemies.len() {
        let enemy = &state.enemies[ei];
        if !enemy.is_engaged()
            || enemy.contact_damage <= 0.0
            || !circles_overlap(
                enemy.body.pos,
                enemy.body.radius,
                state.player.body.pos,
                state.player.body.radius,
            )
        {
            continue;
        }
        let (damage, pos) = (enemy.contact_damage, enemy.body.pos);
        hit_player(state, damage, &HitPayload::default(), pos);
        if state.phase == GamePhase::GameOver {
            return;
        }
    }
}

/// Hazards whose pulse timer ran out damage everything on the other side
fn hazard_pulses(state: &mut SimulationState) {
    for hi in 0..state.hazards.len() {
        let hazard = &mut state.hazards[hi];
        if !hazard.active || hazard.pulse_timer > 0.0 {
            continue;
        }
        hazard.pulse_timer += HAZARD_PULSE_SECS;
        let (pos, radius, damage, side) = (hazard.pos, hazard.radius, hazard.damage, hazard.side);

        match side {
            Side::Enemy => {
                let player = &state.player.body;
                if circles_overlap(pos, radius, player.pos, player.radius) {
                    hit_player(state, damage, &HitPayload::default(), pos);
                    if state.phase == GamePhase::GameOver {
                        return;
                    }
                }
            }
            Side::Player => {
                for ei in 0..state.enemies.len() {
                    let enemy = &state.enemies[ei];
                    if enemy.is_engaged()
                        && circles_overlap(pos, radius, enemy.body.pos, enemy.body.radius)
                    {
                        damage_enemy(state, ei, damage);
                    }
                }
            }
        }
    }
}

/// (d) Player vs pickups
fn collect_pickups(state: &mut SimulationState, catalog: &Catalog) {
    let player_pos = state.player.body.pos;
    let reach = state.player.body.radius + PICKUP_RADIUS;
    for i in 0..state.pickups.len() {
        let pickup = &mut state.pickups[i];
        if !pickup.active || pickup.pos.distance_squared(player_pos) > reach * reach {
            continue;
        }
        pickup.active = false;
        let (kind, value) = (pickup.kind.clone(), pickup.value);
        apply_pickup(state, catalog, &kind, value);
    }
}

pub fn apply_pickup(state: &mut SimulationState, catalog: &Catalog, kind: &PickupKind, value: u32) {
    let player = &mut state.player;
    let name = match kind {
        PickupKind::Health => {
            player.body.heal(value as f32);
            "health"
        }
        PickupKind::Shield => {
            player.body.shield += value as f32;
            "shield"
        }
        PickupKind::Ammo => {
            player.ammo += value;
            "ammo"
        }
        PickupKind::Bomb => {
            player.bombs += value;
            "bomb"
        }
        PickupKind::Currency => {
            player.currency += value;
            "currency"
        }
        PickupKind::Cartridge(id) => {
            match catalog.modifier(id) {
                Ok(def) => player.add_modifier(def),
                Err(err) => log::warn!("empty cartridge: {}", err),
            }
            "cartridge"
        }
        PickupKind::Weapon(id) => {
            match catalog.weapon(id) {
                Ok(def) => player.equip(def),
                Err(err) => log::warn!("skipping weapon pickup: {}", err),
            }
            "weapon"
        }
    };
    state.emit(GameEvent::ItemPickedUp {
        kind: name.to_string(),
        value,
    });
}
