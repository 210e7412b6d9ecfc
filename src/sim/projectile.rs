//! Projectile, hazard and pickup motion
//!
//! Runs after the behavior pass and before collision resolution, so the
//! resolver always sees this tick's final positions.

use glam::Vec2;

use super::collision::{clamp_to_room, reflect_velocity, wall_contact};
use super::state::{Homing, Orbit, SimulationState};
use crate::consts::*;
use crate::{heading, polar_to_cartesian, rotate_toward};

fn nearest(targets: &[Vec2], from: Vec2, range: f32) -> Option<Vec2> {
    targets
        .iter()
        .copied()
        .map(|t| (t, t.distance_squared(from)))
        .filter(|(_, d2)| *d2 <= range * range)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}

/// Move every live projectile one step
pub fn advance_projectiles(state: &mut SimulationState, dt: f32) {
    let player_pos = state.player.body.pos;
    let targets: Vec<Vec2> = state
        .enemies
        .iter()
        .filter(|e| e.is_engaged())
        .map(|e| e.body.pos)
        .collect();

    for p in state.projectiles.iter_mut().filter(|p| p.active) {
        p.lifetime -= dt;
        if p.lifetime <= 0.0 {
            p.active = false;
            continue;
        }

        if let Some(Orbit::Orbiting { angle, radius }) = p.orbit {
            let angle = angle + ORBIT_ANGULAR_SPEED * dt;
            p.pos = player_pos + polar_to_cartesian(radius, angle);
            match nearest(&targets, p.pos, ORBIT_RELEASE_RANGE) {
                Some(target) => {
                    p.orbit = Some(Orbit::Homing);
                    p.vel = heading(target - p.pos) * ORBIT_RELEASE_SPEED;
                    if p.modifiers.homing.is_none() {
                        p.modifiers.homing = Some(Homing {
                            turn_rate: DEFAULT_TURN_RATE,
                        });
                    }
                }
                None => {
                    p.orbit = Some(Orbit::Orbiting { angle, radius });
                    continue;
                }
            }
        }

        // Enemy shots never home; player shots home on enemies
        if let Some(homing) = p.modifiers.homing {
            if let Some(target) = nearest(&targets, p.pos, HOMING_RADIUS) {
                let speed = p.vel.length();
                let dir = rotate_toward(p.vel, target - p.pos, homing.turn_rate * dt);
                p.vel = dir * speed;
            }
        }

        p.pos += p.vel * dt;

        let contact = wall_contact(p.pos, p.radius);
        if !contact.hit {
            continue;
        }
        match &mut p.modifiers.bounce {
            Some(bounce) if bounce.remaining > 0 => {
                if p.vel.dot(contact.normal) < 0.0 {
                    p.vel = reflect_velocity(p.vel, contact.normal);
                    bounce.remaining -= 1;
                    p.damage *= bounce.decay;
                }
                p.pos += contact.normal * contact.penetration;
            }
            _ => p.active = false,
        }
    }
}

/// Count down hazard lifetimes and pulse timers; damage is applied by the resolver
pub fn advance_hazards(state: &mut SimulationState, dt: f32) {
    for hazard in state.hazards.iter_mut().filter(|h| h.active) {
        hazard.remaining -= dt;
        hazard.pulse_timer -= dt;
        if hazard.remaining <= 0.0 {
            hazard.active = false;
        }
    }
}

/// Pickups drift and get pulled toward a nearby player
pub fn advance_pickups(state: &mut SimulationState, dt: f32) {
    let player_pos = state.player.body.pos;
    let drag = PICKUP_DRAG.powf(dt * 60.0);
    for pickup in state.pickups.iter_mut().filter(|p| p.active) {
        let to_player = player_pos - pickup.pos;
        if to_player.length_squared() < MAGNET_RADIUS * MAGNET_RADIUS {
            pickup.vel += heading(to_player) * MAGNET_ACCEL * dt;
            pickup.vel = pickup.vel.clamp_length_max(PICKUP_MAX_SPEED);
        } else {
            pickup.vel *= drag;
        }
        pickup.pos = clamp_to_room(pickup.pos + pickup.vel * dt, PICKUP_RADIUS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::settings::Settings;
    use crate::sim::state::{Bounce, Enemy, EnemyRole, Pickup, PickupKind, Projectile, Side};

    fn empty_state() -> SimulationState {
        let catalog = Catalog::builtin();
        SimulationState::new(5, Settings::default(), &catalog).expect("state builds")
    }

    fn shot(state: &mut SimulationState, pos: Vec2, vel: Vec2) -> usize {
        let id = state.next_entity_id();
        state
            .projectiles
            .push(Projectile::new(id, Side::Player, pos, vel, 10.0, 4.0));
        state.projectiles.len() - 1
    }

    fn add_enemy(state: &mut SimulationState, pos: Vec2) {
        let catalog = Catalog::builtin();
        let def = catalog.enemy("drone").expect("drone");
        let id = state.next_entity_id();
        let mut enemy = Enemy::from_def(id, def, pos, 1.0, EnemyRole::Regular);
        enemy.spawn_timer = 0.0;
        state.enemies.push(enemy);
    }

    #[test]
    fn test_bounce_survives_once_then_despawns() {
        let mut state = empty_state();
        let i = shot(&mut state, Vec2::new(6.0, 300.0), Vec2::new(-300.0, 0.0));
        state.projectiles[i].modifiers.bounce = Some(Bounce {
            remaining: 1,
            decay: 0.5,
        });

        advance_projectiles(&mut state, SIM_DT);
        let p = &state.projectiles[i];
        assert!(p.active);
        assert_eq!(p.modifiers.bounce.map(|b| b.remaining), Some(0));
        assert!(p.vel.x > 0.0);
        assert!((p.damage - 5.0).abs() < 1e-5);

        // Second wall contact on a later tick
        state.projectiles[i].vel = Vec2::new(-300.0, 0.0);
        advance_projectiles(&mut state, SIM_DT);
        assert!(!state.projectiles[i].active);
    }

    #[test]
    fn test_leaving_room_despawns() {
        let mut state = empty_state();
        let i = shot(&mut state, Vec2::new(ROOM_WIDTH - 2.0, 300.0), Vec2::new(300.0, 0.0));
        advance_projectiles(&mut state, SIM_DT);
        assert!(!state.projectiles[i].active);
    }

    #[test]
    fn test_lifetime_expires() {
        let mut state = empty_state();
        let i = shot(&mut state, Vec2::new(400.0, 300.0), Vec2::ZERO);
        state.projectiles[i].lifetime = 0.01;
        advance_projectiles(&mut state, SIM_DT);
        assert!(!state.projectiles[i].active);
    }

    #[test]
    fn test_homing_turn_is_rate_limited() {
        let mut state = empty_state();
        add_enemy(&mut state, Vec2::new(400.0, 100.0));
        let i = shot(&mut state, Vec2::new(300.0, 300.0), Vec2::new(200.0, 0.0));
        state.projectiles[i].modifiers.homing = Some(Homing { turn_rate: 3.0 });

        advance_projectiles(&mut state, SIM_DT);
        let vel = state.projectiles[i].vel;
        let turned = Vec2::X.angle_to(vel).abs();
        assert!(turned > 0.0);
        assert!(turned <= 3.0 * SIM_DT + 1e-4);
        assert!((vel.length() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_orbiter_follows_player_until_release() {
        let mut state = empty_state();
        let i = shot(&mut state, Vec2::ZERO, Vec2::ZERO);
        state.projectiles[i].orbit = Some(Orbit::Orbiting {
            angle: 0.0,
            radius: ORBIT_RADIUS,
        });
        advance_projectiles(&mut state, SIM_DT);
        let p = &state.projectiles[i];
        assert!((p.pos.distance(state.player.body.pos) - ORBIT_RADIUS).abs() < 1e-3);
        assert!(p.is_orbiting());

        let near = state.player.body.pos + Vec2::new(120.0, 0.0);
        add_enemy(&mut state, near);
        advance_projectiles(&mut state, SIM_DT);
        let p = &state.projectiles[i];
        assert_eq!(p.orbit, Some(Orbit::Homing));
        assert!(p.modifiers.homing.is_some());
        assert!(p.vel.length() > 0.0);
    }

    #[test]
    fn test_pickup_magnet() {
        let mut state = empty_state();
        let player = state.player.body.pos;
        let id = state.next_entity_id();
        state.pickups.push(Pickup {
            id,
            kind: PickupKind::Currency,
            pos: player + Vec2::new(60.0, 0.0),
            vel: Vec2::ZERO,
            value: 1,
            active: true,
        });
        advance_pickups(&mut state, SIM_DT);
        assert!(state.pickups[0].vel.x < 0.0);
        assert!(state.pickups[0].pos.x < player.x + 60.0);
    }
}
