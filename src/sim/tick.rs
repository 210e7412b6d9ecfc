//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use glam::Vec2;

use super::events::EventSink;
use super::state::{GamePhase, SimulationState};
use super::{collision, enemy, player, projectile, room, weapon};
use crate::catalog::Catalog;
use crate::error::Result;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Movement axes, each in -1..1
    pub movement: Vec2,
    /// Aim direction (any length; zero keeps the previous aim)
    pub aim: Vec2,
    pub fire_held: bool,
    pub dash_pressed: bool,
    pub bomb_pressed: bool,
    /// Slow, precise movement
    pub focus_held: bool,
    /// Use a shrine
    pub interact_pressed: bool,
    pub reload_pressed: bool,
}

/// Advance the simulation by one step
///
/// `dt` is clamped to the configured maximum. Events raised during the tick
/// are flushed to `sink` at the end. The only error is a failed floor
/// generation while advancing through the portal.
pub fn tick(
    state: &mut SimulationState,
    catalog: &Catalog,
    input: &TickInput,
    dt: f32,
    sink: &mut impl EventSink,
) -> Result<()> {
    if state.phase == GamePhase::GameOver {
        flush(state, sink);
        return Ok(());
    }
    let dt = state.settings.clamp_dt(dt);

    // Last tick's removals take effect now
    state.remove_inactive();
    if state.active_enemy_count() > 0 {
        state.room_enemies_seen = true;
    }
    state.time += dt;
    state.ticks += 1;

    // Behavior pass
    player::update_player(state, catalog, input, dt);
    if state.phase == GamePhase::GameOver {
        flush(state, sink);
        return Ok(());
    }
    weapon::update_weapon(state, input.fire_held, input.reload_pressed, dt);
    enemy::update_enemies(state, catalog, dt);

    // Motion
    projectile::advance_projectiles(state, dt);
    projectile::advance_hazards(state, dt);
    projectile::advance_pickups(state, dt);

    // Resolution
    collision::resolve(state, catalog);
    enemy::reap_dead(state, catalog);
    enemy::update_boss_phases(state);
    room::check_room_cleared(state, catalog);

    let exits = if state.phase == GamePhase::Playing {
        room::check_exits(state, catalog)
    } else {
        Ok(())
    };
    flush(state, sink);
    exits
}

fn flush(state: &mut SimulationState, sink: &mut impl EventSink) {
    for event in state.events.drain(..) {
        sink.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Behavior;
    use crate::consts::SIM_DT;
    use crate::settings::Settings;
    use crate::sim::autopilot;
    use crate::sim::events::GameEvent;
    use crate::sim::floor::{RoomRole, SpawnDescriptor, SpawnRole};
    use crate::sim::state::{Projectile, ROOM_CENTER, Side};

    fn new_state(seed: u64) -> (SimulationState, Catalog) {
        let catalog = Catalog::builtin();
        let state =
            SimulationState::new(seed, Settings::default(), &catalog).expect("state builds");
        (state, catalog)
    }

    /// Put the player in a combat room holding a single passive enemy
    fn one_enemy_room(state: &mut SimulationState, catalog: &Catalog, health: f32) -> usize {
        let target = state
            .floor
            .rooms
            .values()
            .find(|r| r.role == RoomRole::Normal)
            .map(|r| r.coord)
            .expect("a normal room");
        let room = state.floor.room_mut(target).expect("room");
        room.roster = vec![SpawnDescriptor {
            id: "drone".into(),
            role: SpawnRole::Regular,
            pos: ROOM_CENTER + Vec2::new(200.0, 0.0),
        }];
        room::enter_room(state, catalog, target);

        let enemy = &mut state.enemies[0];
        enemy.body.health = health;
        enemy.body.max_health = health;
        enemy.body.shield = 0.0;
        enemy.spawn_timer = 0.0;
        enemy.attacks.clear();
        enemy.contact_damage = 0.0;
        enemy.behavior = Behavior::Stationary;
        0
    }

    #[test]
    fn test_kill_clears_room_same_tick() {
        let (mut state, catalog) = new_state(100);
        let i = one_enemy_room(&mut state, &catalog, 15.0);
        let pos = state.enemies[i].body.pos;
        let id = state.next_entity_id();
        state
            .projectiles
            .push(Projectile::new(id, Side::Player, pos, Vec2::ZERO, 20.0, 4.0));

        let mut events: Vec<GameEvent> = Vec::new();
        tick(&mut state, &catalog, &TickInput::default(), SIM_DT, &mut events).expect("tick");

        assert!(!state.enemies[i].body.active);
        assert!(state.current_room().is_some_and(|r| r.cleared));
        let kills = events.iter().filter(|e| e.name() == "enemy_killed").count();
        assert_eq!(kills, 1);
        assert_eq!(events.iter().filter(|e| e.name() == "room_cleared").count(), 1);

        // Removed at the start of the next tick, and the clear is not repeated
        events.clear();
        tick(&mut state, &catalog, &TickInput::default(), SIM_DT, &mut events).expect("tick");
        assert!(state.enemies.is_empty());
        assert!(events.iter().all(|e| e.name() != "room_cleared"));
    }

    #[test]
    fn test_dt_is_clamped() {
        let (mut state, catalog) = new_state(101);
        let mut events: Vec<GameEvent> = Vec::new();
        tick(&mut state, &catalog, &TickInput::default(), 10.0, &mut events).expect("tick");
        assert!((state.time - state.settings.max_dt).abs() < 1e-6);
        tick(&mut state, &catalog, &TickInput::default(), f32::NAN, &mut events).expect("tick");
        assert!((state.time - state.settings.max_dt).abs() < 1e-6);
    }

    #[test]
    fn test_game_over_freezes_state() {
        let (mut state, catalog) = new_state(102);
        state.phase = GamePhase::GameOver;
        let before = state.ticks;
        let input = TickInput {
            movement: Vec2::X,
            ..TickInput::default()
        };
        let pos = state.player.body.pos;
        let mut events: Vec<GameEvent> = Vec::new();
        tick(&mut state, &catalog, &input, SIM_DT, &mut events).expect("tick");
        assert_eq!(state.ticks, before);
        assert_eq!(state.player.body.pos, pos);
    }

    fn run(seed: u64, ticks: usize) -> (SimulationState, Vec<GameEvent>) {
        let catalog = Catalog::builtin();
        let mut state =
            SimulationState::new(seed, Settings::default(), &catalog).expect("state builds");
        let mut events = Vec::new();
        for _ in 0..ticks {
            if let Some(index) = autopilot::choose(&state) {
                crate::sim::choice::commit_choice(&mut state, &catalog, index);
            }
            let input = autopilot::drive(&state);
            tick(&mut state, &catalog, &input, SIM_DT, &mut events).expect("tick");
            if state.phase == GamePhase::GameOver {
                break;
            }
        }
        (state, events)
    }

    #[test]
    fn test_determinism() {
        let (a, events_a) = run(12345, 1200);
        let (b, events_b) = run(12345, 1200);
        assert_eq!(events_a, events_b);
        let json_a = serde_json::to_string(&a).expect("serialize");
        let json_b = serde_json::to_string(&b).expect("serialize");
        assert_eq!(json_a, json_b);
    }

    #[test]
    fn test_long_run_invariants() {
        let (state, events) = run(777, 3600);
        assert!(state.player.body.pos.is_finite());
        assert!(state.enemies.iter().all(|e| e.body.pos.is_finite()));
        assert!(state.projectiles.iter().all(|p| p.pos.is_finite()));

        // Phase indices per boss only ever increase
        let mut last: std::collections::BTreeMap<u32, usize> = Default::default();
        for event in &events {
            if let GameEvent::BossPhaseChange { id, from, to } = event {
                assert!(to > from);
                let prev = last.insert(*id, *to).unwrap_or(0);
                assert!(*to > prev || prev == 0);
            }
        }

        // Every room that was cleared was cleared once
        let mut cleared = std::collections::BTreeSet::new();
        for event in &events {
            if let GameEvent::RoomCleared { coord } = event {
                if state.floor_index == 0 {
                    assert!(cleared.insert(*coord));
                }
            }
        }
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let (state, _) = run(55, 300);
        let json = serde_json::to_string(&state).expect("serialize");
        let back: SimulationState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.ticks, state.ticks);
        assert_eq!(back.floor.rooms.len(), state.floor.rooms.len());
        assert_eq!(back.current, state.current);
    }
}
