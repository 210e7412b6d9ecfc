//! Enemy and boss update
//!
//! Per tick, for each enemy: entry animation, status effects, movement via
//! its behavior strategy, then every attack timer independently. Deaths are
//! resolved after collisions, and boss phases are re-evaluated last so a
//! phase change sees this tick's damage.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::behavior::{self, SteerInput};
use super::collision::{clamp_to_room, hit_player, in_cone};
use super::events::{Feedback, GameEvent};
use super::room::spawn_enemy;
use super::state::{
    AttackState, EnemyRole, GamePhase, Hazard, Pickup, PickupKind, Projectile, Side,
    SimulationState,
};
use crate::catalog::{AttackDef, AttackPattern, Catalog, DeathEffect};
use crate::consts::*;
use crate::{heading, polar_to_cartesian, rotate_toward};

/// Enemy projectiles outlive any trip across the room
const ENEMY_SHOT_LIFETIME: f32 = 6.0;

/// Advance every live enemy by `dt`
pub fn update_enemies(state: &mut SimulationState, catalog: &Catalog, dt: f32) {
    let player_pos = state.player.body.pos;

    for i in 0..state.enemies.len() {
        let enemy = &mut state.enemies[i];
        if !enemy.body.active {
            continue;
        }
        if enemy.spawn_timer > 0.0 {
            enemy.spawn_timer = (enemy.spawn_timer - dt).max(0.0);
            continue;
        }

        let dot = enemy.status.tick(dt);
        if dot > 0.0 {
            let report = enemy.body.apply_damage(dot);
            let target = enemy.id;
            state.emit(GameEvent::DamageDealt {
                target,
                amount: report.total(),
            });
            if report.killed {
                continue;
            }
        }

        let enemy = &mut state.enemies[i];
        if enemy.status.is_stunned() {
            // Only knockback moves a stunned enemy
            let vel = enemy.status.knockback;
            enemy.body.vel = vel;
            enemy.body.pos = clamp_to_room(enemy.body.pos + vel * dt, enemy.body.radius);
            continue;
        }

        let input = SteerInput {
            pos: enemy.body.pos,
            speed: enemy.speed,
            radius: enemy.body.radius,
            preferred_range: enemy.preferred_range,
            player_pos,
            dt,
        };
        let steer = behavior::steer(
            enemy.current_behavior(),
            &input,
            &mut enemy.memory,
            &mut state.rng,
        );
        if let Some(target) = steer.teleport {
            enemy.body.pos = clamp_to_room(target, enemy.body.radius);
        }
        let mut vel = steer.velocity * enemy.status.speed_mult() + enemy.status.knockback;
        if !vel.is_finite() {
            vel = Vec2::ZERO;
        }
        enemy.body.vel = vel;
        enemy.body.pos = clamp_to_room(enemy.body.pos + vel * dt, enemy.body.radius);
        enemy.facing = rotate_toward(
            enemy.facing,
            player_pos - enemy.body.pos,
            ENEMY_TURN_RATE * dt,
        );

        let fired: Vec<(AttackDef, u32)> = enemy
            .attacks
            .iter_mut()
            .filter_map(|attack| {
                attack
                    .advance(dt)
                    .then(|| (attack.def.clone(), attack.volleys))
            })
            .collect();
        for (def, volleys) in fired {
            execute_attack(state, catalog, i, &def, volleys);
            if state.phase != GamePhase::Playing {
                return;
            }
        }
    }
}

/// Shape of one enemy projectile
#[derive(Debug, Clone, Copy)]
struct Shot {
    speed: f32,
    damage: f32,
    radius: f32,
}

fn enemy_shot(state: &mut SimulationState, origin: Vec2, dir: Vec2, shape: Shot, def: &AttackDef) {
    let id = state.next_entity_id();
    let vel = dir * shape.speed;
    let mut shot = Projectile::new(id, Side::Enemy, origin, vel, shape.damage, shape.radius);
    shot.payload = def.payload;
    shot.lifetime = ENEMY_SHOT_LIFETIME;
    state.projectiles.push(shot);
}

/// Run one attack for the enemy at `index`
fn execute_attack(
    state: &mut SimulationState,
    catalog: &Catalog,
    index: usize,
    def: &AttackDef,
    volleys: u32,
) {
    let (origin, body_radius, facing) = {
        let enemy = &state.enemies[index];
        (enemy.body.pos, enemy.body.radius, enemy.facing)
    };
    let player_pos = state.player.body.pos;
    let aim = heading(player_pos - origin);

    match &def.pattern {
        AttackPattern::Aimed {
            count,
            spread,
            speed,
            damage,
            radius,
        } => {
            let shot = Shot {
                speed: *speed,
                damage: *damage,
                radius: *radius,
            };
            let count = (*count).max(1);
            for k in 0..count {
                let offset = if count > 1 {
                    spread * (k as f32 / (count - 1) as f32 - 0.5)
                } else {
                    0.0
                };
                let dir = Vec2::from_angle(offset).rotate(aim);
                enemy_shot(state, origin + dir * body_radius, dir, shot, def);
            }
        }
        AttackPattern::Ring {
            count,
            speed,
            damage,
            radius,
        } => {
            let shot = Shot {
                speed: *speed,
                damage: *damage,
                radius: *radius,
            };
            let base = aim.to_angle();
            for k in 0..*count {
                let angle = base + std::f32::consts::TAU * k as f32 / *count as f32;
                let dir = polar_to_cartesian(1.0, angle);
                enemy_shot(state, origin + dir * body_radius, dir, shot, def);
            }
        }
        AttackPattern::Spiral {
            arms,
            speed,
            damage,
            radius,
            step,
        } => {
            let shot = Shot {
                speed: *speed,
                damage: *damage,
                radius: *radius,
            };
            let base = volleys as f32 * step;
            for k in 0..*arms {
                let angle = base + std::f32::consts::TAU * k as f32 / *arms as f32;
                let dir = polar_to_cartesian(1.0, angle);
                enemy_shot(state, origin + dir * body_radius, dir, shot, def);
            }
        }
        AttackPattern::Summon { enemy, count } => {
            let minion = match catalog.enemy(enemy) {
                Ok(minion) => minion,
                Err(err) => {
                    log::warn!("summon skipped: {}", err);
                    return;
                }
            };
            for _ in 0..*count {
                if state.active_enemy_count() >= MAX_ROOM_ENEMIES {
                    log::debug!("summon capped at {} enemies", MAX_ROOM_ENEMIES);
                    break;
                }
                let angle = state.rng.random_range(0.0..std::f32::consts::TAU);
                let pos = clamp_to_room(
                    origin + polar_to_cartesian(body_radius + minion.radius + 8.0, angle),
                    minion.radius,
                );
                spawn_enemy(state, minion, pos, EnemyRole::Regular);
            }
        }
        AttackPattern::MeleeCone { arc, range, damage } => {
            let reach = range + state.player.body.radius;
            if in_cone(origin, facing, *arc, reach, player_pos) {
                hit_player(state, *damage, &def.payload, origin);
            }
        }
        AttackPattern::Hazard {
            radius,
            damage,
            duration,
        } => {
            let id = state.next_entity_id();
            state.hazards.push(Hazard {
                id,
                pos: player_pos,
                radius: *radius,
                damage: *damage,
                remaining: *duration,
                // First pulse lands one full interval after placement
                pulse_timer: HAZARD_PULSE_SECS,
                side: Side::Enemy,
                active: true,
            });
        }
    }
}

/// Resolve deaths: kill events, death effects, drops
pub fn reap_dead(state: &mut SimulationState, catalog: &Catalog) {
    for i in 0..state.enemies.len() {
        let enemy = &mut state.enemies[i];
        if enemy.body.active || enemy.reaped {
            continue;
        }
        enemy.reaped = true;
        let (id, kind, pos) = (enemy.id, enemy.kind.clone(), enemy.body.pos);
        let on_death = enemy.on_death.clone();
        let role = match enemy.role {
            EnemyRole::Regular => DropTier::Regular,
            EnemyRole::Miniboss => DropTier::Miniboss,
            EnemyRole::Boss(_) => DropTier::Boss,
        };

        state.emit(GameEvent::EnemyKilled {
            id,
            kind: kind.clone(),
            pos,
        });
        if role == DropTier::Boss {
            log::info!("boss {} defeated", kind);
            state.emit(GameEvent::BossDefeated { kind: kind.clone() });
            state.emit(GameEvent::Feedback(Feedback::ScreenShake(1.0)));
        }

        match on_death {
            DeathEffect::None => {}
            DeathEffect::Split { into, count } => spawn_children(state, catalog, &into, count, pos),
            DeathEffect::Ghost { into } => spawn_children(state, catalog, &into, 1, pos),
        }
        drop_loot(state, catalog, role, pos);
    }
}

fn spawn_children(
    state: &mut SimulationState,
    catalog: &Catalog,
    into: &str,
    count: u32,
    pos: Vec2,
) {
    let child = match catalog.enemy(into) {
        Ok(child) => child,
        Err(err) => {
            log::warn!("death effect skipped: {}", err);
            return;
        }
    };
    for k in 0..count {
        if state.active_enemy_count() >= MAX_ROOM_ENEMIES {
            break;
        }
        let angle = std::f32::consts::TAU * k as f32 / count as f32;
        let offset = if count > 1 {
            polar_to_cartesian(child.radius * 1.5, angle)
        } else {
            Vec2::ZERO
        };
        let spawn = clamp_to_room(pos + offset, child.radius);
        spawn_enemy(state, child, spawn, EnemyRole::Regular);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropTier {
    Regular,
    Miniboss,
    Boss,
}

fn drop_loot(state: &mut SimulationState, catalog: &Catalog, tier: DropTier, pos: Vec2) {
    let drops: Vec<(PickupKind, u32)> = match tier {
        DropTier::Boss => {
            let modifiers: Vec<&str> = catalog.modifier_ids().collect();
            let mut drops = vec![(PickupKind::Currency, 15)];
            if let Some(id) = modifiers.choose(&mut state.rng) {
                drops.push((PickupKind::Cartridge(id.to_string()), 1));
            }
            drops
        }
        DropTier::Miniboss => vec![(PickupKind::Currency, 8), (PickupKind::Health, 1)],
        DropTier::Regular => {
            if !state.rng.random_bool(state.settings.difficulty.drop_chance.clamp(0.0, 1.0)) {
                return;
            }
            let roll = state.rng.random_range(0..10u32);
            let drop = match roll {
                0..=4 => (PickupKind::Currency, state.rng.random_range(1..=3)),
                5..=6 => (PickupKind::Ammo, 10),
                7..=8 => (PickupKind::Health, 1),
                _ => (PickupKind::Shield, 1),
            };
            vec![drop]
        }
    };

    for (kind, value) in drops {
        let angle = state.rng.random_range(0.0..std::f32::consts::TAU);
        let id = state.next_entity_id();
        state.pickups.push(Pickup {
            id,
            kind,
            pos: clamp_to_room(pos, PICKUP_RADIUS),
            vel: polar_to_cartesian(80.0, angle),
            value,
            active: true,
        });
    }
}

/// Advance boss phases after this tick's damage
pub fn update_boss_phases(state: &mut SimulationState) {
    let mut events = Vec::new();
    for enemy in state.enemies.iter_mut().filter(|e| e.body.active) {
        let fraction = enemy.body.health_fraction();
        let EnemyRole::Boss(track) = &mut enemy.role else {
            continue;
        };
        let target = track.phase_for(fraction);
        if target <= track.current {
            continue;
        }
        let from = track.current;
        track.current = target;
        // Fresh timers so the new phase's first attack telegraphs fully
        enemy.attacks = track.phases[target]
            .attacks
            .iter()
            .cloned()
            .map(AttackState::new)
            .collect();
        log::info!("boss {} phase {} -> {}", enemy.kind, from, target);
        events.push(GameEvent::BossPhaseChange {
            id: enemy.id,
            from,
            to: target,
        });
        events.push(GameEvent::Feedback(Feedback::ScreenShake(0.6)));
        events.push(GameEvent::Feedback(Feedback::Flash));
    }
    for event in events {
        state.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BossDef, Behavior, HitPayload, PhaseDef};
    use crate::settings::Settings;
    use crate::sim::state::Enemy;

    fn empty_state() -> SimulationState {
        SimulationState::new(31, Settings::default(), &Catalog::builtin()).expect("state builds")
    }

    fn ready(state: &mut SimulationState, id: &str, pos: Vec2) -> usize {
        let catalog = Catalog::builtin();
        let def = catalog.enemy(id).expect("known enemy").clone();
        spawn_enemy(state, &def, pos, EnemyRole::Regular);
        let i = state.enemies.len() - 1;
        state.enemies[i].spawn_timer = 0.0;
        i
    }

    fn ring_attack(cooldown: f32) -> AttackDef {
        AttackDef {
            cooldown,
            pattern: AttackPattern::Ring {
                count: 6,
                speed: 100.0,
                damage: 1.0,
                radius: 5.0,
            },
            payload: HitPayload::default(),
        }
    }

    #[test]
    fn test_spawning_enemy_neither_moves_nor_attacks() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let def = catalog.enemy("drone").expect("drone").clone();
        let pos = Vec2::new(200.0, 200.0);
        spawn_enemy(&mut state, &def, pos, EnemyRole::Regular);
        state.enemies[0].attacks = vec![AttackState::new(ring_attack(0.0))];

        update_enemies(&mut state, &catalog, SIM_DT);
        assert_eq!(state.enemies[0].body.pos, pos);
        assert!(state.projectiles.is_empty());

        for _ in 0..60 {
            update_enemies(&mut state, &catalog, SIM_DT);
        }
        assert!(!state.projectiles.is_empty());
    }

    #[test]
    fn test_attacks_run_independently() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let i = ready(&mut state, "turret", Vec2::new(200.0, 200.0));
        state.enemies[i].attacks = vec![
            AttackState::new(ring_attack(0.5)),
            AttackState::new(ring_attack(1.0)),
        ];
        // A little over one second
        for _ in 0..70 {
            update_enemies(&mut state, &catalog, SIM_DT);
        }
        let volleys: Vec<u32> = state.enemies[i].attacks.iter().map(|a| a.volleys).collect();
        assert_eq!(volleys, vec![2, 1]);
        assert_eq!(state.projectiles.len(), 18);
    }

    #[test]
    fn test_summon_respects_cap() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let carrier = ready(&mut state, "carrier", Vec2::new(300.0, 300.0));
        for k in 0..MAX_ROOM_ENEMIES - 2 {
            ready(&mut state, "turret", Vec2::new(150.0 + k as f32 * 20.0, 150.0));
        }
        let summon = AttackDef {
            cooldown: 0.0,
            pattern: AttackPattern::Summon {
                enemy: "mite".into(),
                count: 5,
            },
            payload: HitPayload::default(),
        };
        execute_attack(&mut state, &catalog, carrier, &summon, 1);
        assert_eq!(state.active_enemy_count(), MAX_ROOM_ENEMIES);
    }

    #[test]
    fn test_unknown_summon_is_skipped() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let i = ready(&mut state, "carrier", Vec2::new(300.0, 300.0));
        let summon = AttackDef {
            cooldown: 0.0,
            pattern: AttackPattern::Summon {
                enemy: "nope".into(),
                count: 2,
            },
            payload: HitPayload::default(),
        };
        execute_attack(&mut state, &catalog, i, &summon, 1);
        assert_eq!(state.enemies.len(), 1);
    }

    #[test]
    fn test_melee_cone_hits_player_in_front() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let player = state.player.body.pos;
        let i = ready(&mut state, "brute", player + Vec2::new(40.0, 0.0));
        let melee = state.enemies[i].attacks[0].def.clone();
        let health = state.player.body.health;
        execute_attack(&mut state, &catalog, i, &melee, 1);
        assert!(state.player.body.health < health);
        assert!(state.player.status.knockback.x < 0.0);
    }

    #[test]
    fn test_melee_cone_misses_player_outside_arc() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let player = state.player.body.pos;
        let i = ready(&mut state, "brute", player + Vec2::new(0.0, -40.0));
        let melee = AttackDef {
            cooldown: 1.0,
            pattern: AttackPattern::MeleeCone {
                arc: 0.5,
                range: 60.0,
                damage: 1.0,
            },
            payload: HitPayload::default(),
        };
        let total = |state: &SimulationState| state.player.body.health + state.player.body.shield;
        let before = total(&state);

        // Turned away: the swing whiffs
        state.enemies[i].facing = Vec2::NEG_Y;
        execute_attack(&mut state, &catalog, i, &melee, 1);
        assert_eq!(total(&state), before);

        state.enemies[i].facing = Vec2::Y;
        execute_attack(&mut state, &catalog, i, &melee, 1);
        assert_eq!(total(&state), before - 1.0);
    }

    #[test]
    fn test_enemy_turns_toward_player_at_limited_rate() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let player = state.player.body.pos;
        let i = ready(&mut state, "turret", player + Vec2::new(0.0, -100.0));
        state.enemies[i].facing = Vec2::new(0.1, -1.0).normalize();

        update_enemies(&mut state, &catalog, SIM_DT);
        let turned = state.enemies[i].facing.angle_to(Vec2::new(0.1, -1.0)).abs();
        assert!((turned - ENEMY_TURN_RATE * SIM_DT).abs() < 1e-3);

        for _ in 0..70 {
            update_enemies(&mut state, &catalog, SIM_DT);
        }
        assert!(state.enemies[i].facing.distance(Vec2::Y) < 1e-3);
    }

    #[test]
    fn test_stunned_enemy_still_takes_knockback() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let pos = Vec2::new(300.0, 300.0);
        let i = ready(&mut state, "skitter", pos);
        state.enemies[i].status.apply_stun(1.0);
        state.enemies[i].status.apply_knockback(Vec2::new(200.0, 0.0));
        update_enemies(&mut state, &catalog, SIM_DT);
        let enemy = &state.enemies[i];
        assert!(enemy.body.pos.x > pos.x);
        assert_eq!(enemy.body.pos.y, pos.y);
        assert!(enemy.status.is_stunned());
    }

    #[test]
    fn test_split_on_death() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let i = ready(&mut state, "bouncer", Vec2::new(300.0, 300.0));
        state.enemies[i].body.apply_damage(1000.0);
        reap_dead(&mut state, &catalog);
        let mites = state.enemies.iter().filter(|e| e.kind == "mite" && e.body.active).count();
        assert_eq!(mites, 2);
        let kills = state.events.iter().filter(|e| e.name() == "enemy_killed").count();
        assert_eq!(kills, 1);

        // Already reaped: no duplicate events or children
        reap_dead(&mut state, &catalog);
        let kills = state.events.iter().filter(|e| e.name() == "enemy_killed").count();
        assert_eq!(kills, 1);
    }

    #[test]
    fn test_stunned_enemy_holds_still() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let pos = Vec2::new(300.0, 300.0);
        let i = ready(&mut state, "skitter", pos);
        state.enemies[i].status.apply_stun(1.0);
        update_enemies(&mut state, &catalog, SIM_DT);
        assert_eq!(state.enemies[i].body.pos, pos);
    }

    fn two_phase_boss() -> BossDef {
        BossDef {
            id: "test_boss".into(),
            health: 100.0,
            shield: 0.0,
            speed: 0.0,
            radius: 30.0,
            contact_damage: 0.0,
            behavior: Behavior::Stationary,
            preferred_range: 200.0,
            phases: vec![
                PhaseDef {
                    threshold: 1.0,
                    attacks: vec![ring_attack(2.0)],
                    behavior: None,
                },
                PhaseDef {
                    threshold: 0.5,
                    attacks: vec![ring_attack(1.0), ring_attack(3.0)],
                    behavior: Some(Behavior::Chase),
                },
            ],
        }
    }

    #[test]
    fn test_boss_phase_change_resets_timers() {
        let mut state = empty_state();
        let id = state.next_entity_id();
        let mut boss = Enemy::from_boss(id, &two_phase_boss(), Vec2::new(300.0, 300.0), 1.0);
        boss.spawn_timer = 0.0;
        boss.body.health = 60.0;
        boss.attacks[0].timer = 1.5;
        state.enemies.push(boss);

        update_boss_phases(&mut state);
        assert_eq!(state.enemies[0].phase_index(), Some(0));

        state.enemies[0].body.apply_damage(20.0);
        update_boss_phases(&mut state);
        let changes = state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::BossPhaseChange { from: 0, to: 1, .. }))
            .count();
        assert_eq!(changes, 1);
        let boss = &state.enemies[0];
        assert_eq!(boss.attacks.len(), 2);
        assert!(boss.attacks.iter().all(|a| a.timer == 0.0));
        assert_eq!(boss.current_behavior(), Behavior::Chase);

        // Healing never regresses the phase
        state.enemies[0].body.health = 100.0;
        update_boss_phases(&mut state);
        assert_eq!(state.enemies[0].phase_index(), Some(1));
    }

    #[test]
    fn test_boss_death_drops_cartridge() {
        let mut state = empty_state();
        let catalog = Catalog::builtin();
        let id = state.next_entity_id();
        let mut boss = Enemy::from_boss(id, &two_phase_boss(), Vec2::new(300.0, 300.0), 1.0);
        boss.body.apply_damage(500.0);
        state.enemies.push(boss);
        reap_dead(&mut state, &catalog);
        assert!(state.events.iter().any(|e| e.name() == "boss_defeated"));
        assert!(
            state
                .pickups
                .iter()
                .any(|p| matches!(p.kind, PickupKind::Cartridge(_)))
        );
        assert_eq!(state.phase, GamePhase::Playing);
    }
}
