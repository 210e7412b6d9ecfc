//! Player weapon handling
//!
//! Fire rate is limited by a per-weapon cooldown. Clip weapons also gate on
//! loaded rounds and reload from the shared ammo pool. Charge weapons build
//! up while the trigger is held and fire once on release.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{Modifiers, Orbit, Projectile, Side, SimulationState};
use crate::catalog::{FireMode, WeaponDef};
use crate::consts::*;
use crate::polar_to_cartesian;

/// Loaded weapon plus its timers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponState {
    pub def: WeaponDef,
    /// Seconds until the next shot is allowed
    pub cooldown: f32,
    /// Rounds loaded (clip weapons only)
    pub clip: u32,
    /// Seconds of reload remaining; firing is blocked while positive
    pub reload: f32,
    /// Accumulated charge (charge weapons only)
    pub charge: f32,
    pub charging: bool,
}

impl WeaponState {
    pub fn new(def: WeaponDef) -> Self {
        let clip = match def.mode {
            FireMode::Clip { capacity, .. } => capacity,
            _ => 0,
        };
        Self {
            def,
            cooldown: 0.0,
            clip,
            reload: 0.0,
            charge: 0.0,
            charging: false,
        }
    }

    /// Weapon used when the configured one is missing from the catalog
    pub fn sidearm() -> WeaponDef {
        WeaponDef {
            id: "sidearm".to_string(),
            damage: 4.0,
            speed: 480.0,
            radius: 5.0,
            cooldown: 0.3,
            lifetime: 1.5,
            pellets: 1,
            spread: 0.0,
            mode: FireMode::Auto,
            modifiers: Vec::new(),
        }
    }

    pub fn capacity(&self) -> Option<u32> {
        match self.def.mode {
            FireMode::Clip { capacity, .. } => Some(capacity),
            _ => None,
        }
    }

    pub fn is_reloading(&self) -> bool {
        self.reload > 0.0
    }

    pub fn charge_fraction(&self) -> f32 {
        match self.def.mode {
            FireMode::Charge { max_charge, .. } if max_charge > 0.0 => {
                (self.charge / max_charge).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn can_fire(&self) -> bool {
        if self.cooldown > 0.0 || self.is_reloading() {
            return false;
        }
        match self.def.mode {
            FireMode::Clip { .. } => self.clip > 0,
            _ => true,
        }
    }

    /// A reload would add rounds
    pub fn can_reload(&self, pool: u32) -> bool {
        match self.def.mode {
            FireMode::Clip { capacity, .. } => {
                !self.is_reloading() && self.clip < capacity && pool > 0
            }
            _ => false,
        }
    }

    /// Begin a reload; a no-op returning false when `can_reload` does not hold
    pub fn start_reload(&mut self, pool: u32) -> bool {
        if !self.can_reload(pool) {
            return false;
        }
        if let FireMode::Clip { reload_secs, .. } = self.def.mode {
            self.reload = reload_secs.max(f32::EPSILON);
        }
        true
    }

    /// Advance timers; a finished reload refills the clip from `pool`
    pub fn advance(&mut self, dt: f32, pool: &mut u32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
        if self.reload > 0.0 {
            self.reload -= dt;
            if self.reload <= 0.0 {
                self.reload = 0.0;
                if let FireMode::Clip { capacity, .. } = self.def.mode {
                    let moved = capacity.saturating_sub(self.clip).min(*pool);
                    self.clip += moved;
                    *pool -= moved;
                }
            }
        }
    }
}

/// Fire, charge and reload for this tick
pub fn update_weapon(state: &mut SimulationState, fire_held: bool, reload_pressed: bool, dt: f32) {
    let player = &mut state.player;
    player.weapon.advance(dt, &mut player.ammo);
    if reload_pressed {
        player.weapon.start_reload(player.ammo);
    }

    let mode = player.weapon.def.mode;
    match mode {
        FireMode::Auto => {
            if fire_held && player.weapon.can_fire() {
                discharge(state, 1.0, 1.0);
            }
        }
        FireMode::Clip { .. } => {
            if fire_held && player.weapon.can_fire() {
                discharge(state, 1.0, 1.0);
                let player = &mut state.player;
                player.weapon.clip -= 1;
                if player.weapon.clip == 0 {
                    player.weapon.start_reload(player.ammo);
                }
            }
        }
        FireMode::Charge {
            max_charge,
            max_damage_mult,
            max_size_mult,
        } => {
            let weapon = &mut player.weapon;
            if fire_held {
                if weapon.charging {
                    weapon.charge = (weapon.charge + dt).min(max_charge);
                } else if weapon.can_fire() {
                    weapon.charging = true;
                    weapon.charge = 0.0;
                }
            } else if weapon.charging {
                let t = weapon.charge_fraction();
                weapon.charging = false;
                weapon.charge = 0.0;
                discharge(
                    state,
                    1.0 + (max_damage_mult - 1.0) * t,
                    1.0 + (max_size_mult - 1.0) * t,
                );
            }
        }
    }
}

/// Emit one volley and start the cooldown
fn discharge(state: &mut SimulationState, damage_mult: f32, size_mult: f32) {
    let effects = state.player.shot_effects();
    let modifiers = Modifiers::from_effects(&effects);
    let player = &state.player;
    let def = &player.weapon.def;
    let damage = def.damage * damage_mult * player.stats.damage_mult;
    let radius = def.radius * size_mult;
    let speed = def.speed;
    let lifetime = def.lifetime;
    let pellets = def.pellets.max(1);
    let spread = def.spread;
    let cooldown = def.cooldown / player.stats.fire_rate_mult.max(0.1);
    let origin = player.body.pos;
    let aim = player.aim;

    state.player.weapon.cooldown = cooldown;

    if modifiers.orbit {
        let orbiters = state
            .projectiles
            .iter()
            .filter(|p| p.active && p.side == Side::Player && p.is_orbiting())
            .count();
        if orbiters < MAX_ORBITERS {
            let angle = aim.to_angle();
            let id = state.next_entity_id();
            let mut shot = Projectile::new(
                id,
                Side::Player,
                origin + polar_to_cartesian(ORBIT_RADIUS, angle),
                Vec2::ZERO,
                damage,
                radius,
            );
            shot.modifiers = modifiers;
            shot.lifetime = ORBIT_LIFETIME;
            shot.orbit = Some(Orbit::Orbiting {
                angle,
                radius: ORBIT_RADIUS,
            });
            state.projectiles.push(shot);
            return;
        }
    }

    for i in 0..pellets {
        let offset = if pellets > 1 {
            spread * (i as f32 / (pellets - 1) as f32 - 0.5)
        } else {
            0.0
        };
        let dir = Vec2::from_angle(offset).rotate(aim);
        let id = state.next_entity_id();
        let mut shot = Projectile::new(
            id,
            Side::Player,
            origin + dir * PLAYER_RADIUS,
            dir * speed,
            damage,
            radius,
        );
        shot.modifiers = modifiers;
        shot.lifetime = lifetime;
        state.projectiles.push(shot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ModifierDef, ModifierEffect};
    use crate::settings::Settings;

    fn state_with(def: WeaponDef) -> SimulationState {
        let catalog = Catalog::builtin();
        let mut state =
            SimulationState::new(12, Settings::default(), &catalog).expect("state builds");
        state.player.equip(&def);
        state
    }

    fn clip_gun(capacity: u32) -> WeaponDef {
        WeaponDef {
            mode: FireMode::Clip {
                capacity,
                reload_secs: 0.5,
            },
            cooldown: 0.0,
            ..WeaponState::sidearm()
        }
    }

    #[test]
    fn test_cooldown_limits_fire_rate() {
        let mut state = state_with(WeaponState::sidearm());
        update_weapon(&mut state, true, false, SIM_DT);
        update_weapon(&mut state, true, false, SIM_DT);
        assert_eq!(state.projectiles.len(), 1);

        // 0.3s cooldown at 60Hz
        for _ in 0..20 {
            update_weapon(&mut state, true, false, SIM_DT);
        }
        assert_eq!(state.projectiles.len(), 2);
    }

    #[test]
    fn test_fire_rate_multiplier_shortens_cooldown() {
        let mut state = state_with(WeaponState::sidearm());
        state.player.stats.fire_rate_mult = 2.0;
        update_weapon(&mut state, true, false, SIM_DT);
        assert!((state.player.weapon.cooldown - 0.15).abs() < 1e-5);
    }

    #[test]
    fn test_empty_clip_blocks_until_reload() {
        let mut state = state_with(clip_gun(2));
        state.player.ammo = 1;
        update_weapon(&mut state, true, false, SIM_DT);
        update_weapon(&mut state, true, false, SIM_DT);
        assert_eq!(state.projectiles.len(), 2);
        assert_eq!(state.player.weapon.clip, 0);
        assert!(state.player.weapon.is_reloading());

        // Firing while reloading is a no-op
        update_weapon(&mut state, true, false, SIM_DT);
        assert_eq!(state.projectiles.len(), 2);

        for _ in 0..40 {
            update_weapon(&mut state, false, false, SIM_DT);
        }
        // Bounded by the pool, not the capacity
        assert_eq!(state.player.weapon.clip, 1);
        assert_eq!(state.player.ammo, 0);
        assert!(!state.player.weapon.can_reload(state.player.ammo));
    }

    #[test]
    fn test_manual_reload_requires_missing_rounds() {
        let mut weapon = WeaponState::new(clip_gun(6));
        assert!(!weapon.start_reload(50));
        weapon.clip = 2;
        assert!(weapon.start_reload(50));
        let mut pool = 50;
        weapon.advance(1.0, &mut pool);
        assert_eq!(weapon.clip, 6);
        assert_eq!(pool, 46);
    }

    #[test]
    fn test_charge_release_scales_shot() {
        let charge = WeaponDef {
            mode: FireMode::Charge {
                max_charge: 1.0,
                max_damage_mult: 3.0,
                max_size_mult: 2.0,
            },
            ..WeaponState::sidearm()
        };

        // Tap: base stats
        let mut state = state_with(charge.clone());
        update_weapon(&mut state, true, false, SIM_DT);
        assert!(state.projectiles.is_empty());
        update_weapon(&mut state, false, false, SIM_DT);
        assert_eq!(state.projectiles.len(), 1);
        assert!((state.projectiles[0].damage - 4.0).abs() < 1e-5);

        // Full hold: maximum stats
        let mut state = state_with(charge);
        for _ in 0..90 {
            update_weapon(&mut state, true, false, SIM_DT);
        }
        update_weapon(&mut state, false, false, SIM_DT);
        assert_eq!(state.projectiles.len(), 1);
        assert!((state.projectiles[0].damage - 12.0).abs() < 1e-4);
        assert!((state.projectiles[0].radius - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_pellets_fan_out() {
        let mut state = state_with(WeaponDef {
            pellets: 3,
            spread: 0.4,
            ..WeaponState::sidearm()
        });
        update_weapon(&mut state, true, false, SIM_DT);
        assert_eq!(state.projectiles.len(), 3);
        let dirs: Vec<Vec2> = state.projectiles.iter().map(|p| p.vel.normalize()).collect();
        assert!((dirs[1] - state.player.aim).length() < 1e-5);
        assert!(dirs[0].angle_to(dirs[2]).abs() > 0.39);
    }

    #[test]
    fn test_orbit_modifier_caps_orbiters() {
        let mut state = state_with(WeaponDef {
            cooldown: 0.0,
            ..WeaponState::sidearm()
        });
        state.player.add_modifier(&ModifierDef {
            id: "razor".into(),
            effect: ModifierEffect::Orbit,
        });
        for _ in 0..MAX_ORBITERS + 2 {
            update_weapon(&mut state, true, false, SIM_DT);
        }
        let orbiting = state.projectiles.iter().filter(|p| p.is_orbiting()).count();
        assert_eq!(orbiting, MAX_ORBITERS);
        assert_eq!(state.projectiles.len(), MAX_ORBITERS + 2);
    }
}
