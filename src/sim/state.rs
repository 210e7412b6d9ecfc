//! Simulation state and core data types
//!
//! Everything a save layer would need to resume a run lives here, and the
//! whole tree is serializable.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::behavior::MoveMemory;
use super::events::GameEvent;
use super::floor::{Coord, FloorGraph, Room, RoomRole};
use super::weapon::WeaponState;
use super::{floor, room};
use crate::catalog::{
    AttackDef, Behavior, BossDef, Catalog, DeathEffect, EnemyDef, HitPayload, ModifierDef,
    ModifierEffect, PhaseDef, Slow, WeaponDef,
};
use crate::FALLBACK_HEADING;
use crate::consts::*;
use crate::error::Result;
use crate::settings::{PlayerSettings, Settings};

/// Center of every room
pub const ROOM_CENTER: Vec2 = Vec2::new(ROOM_WIDTH / 2.0, ROOM_HEIGHT / 2.0);

/// Maximum simultaneous damage-over-time stacks on one target
pub const MAX_DOT_STACKS: usize = 5;

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Player died; ticks are no-ops
    GameOver,
}

/// Outcome of a single damage application
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DamageReport {
    /// Damage soaked by the shield
    pub absorbed: f32,
    /// Damage that reached health
    pub to_health: f32,
    /// This hit took health to zero or below
    pub killed: bool,
}

impl DamageReport {
    pub fn total(&self) -> f32 {
        self.absorbed + self.to_health
    }
}

/// Position, motion and the two damage buffers every combatant has
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    /// Consumed before health
    pub shield: f32,
    /// Cleared on death; inactive bodies are filtered out at the next tick
    pub active: bool,
}

impl Body {
    pub fn new(pos: Vec2, radius: f32, health: f32, shield: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius,
            health,
            max_health: health,
            shield,
            active: true,
        }
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    /// Shield absorbs first, overflow carries to health
    pub fn apply_damage(&mut self, amount: f32) -> DamageReport {
        if !self.active || !(amount > 0.0) {
            return DamageReport::default();
        }
        let absorbed = amount.min(self.shield.max(0.0));
        self.shield = (self.shield - absorbed).max(0.0);
        let to_health = amount - absorbed;
        self.health -= to_health;

        let killed = self.health <= 0.0;
        if killed {
            self.active = false;
        }
        DamageReport {
            absorbed,
            to_health,
            killed,
        }
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount.max(0.0)).min(self.max_health);
    }
}

/// One damage-over-time stack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotStack {
    pub dps: f32,
    pub remaining: f32,
}

/// Timed status effects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusEffects {
    pub dots: Vec<DotStack>,
    pub slow_factor: f32,
    pub slow_remaining: f32,
    pub stun_remaining: f32,
    /// Impulse velocity, decays every tick
    pub knockback: Vec2,
}

impl StatusEffects {
    pub fn apply_dot(&mut self, dps: f32, duration: f32) {
        let stack = DotStack {
            dps,
            remaining: duration,
        };
        if self.dots.len() < MAX_DOT_STACKS {
            self.dots.push(stack);
        } else if let Some(shortest) = self
            .dots
            .iter_mut()
            .min_by(|a, b| a.remaining.total_cmp(&b.remaining))
        {
            *shortest = stack;
        }
    }

    /// Strongest slow wins; duration refreshes to the longer one
    pub fn apply_slow(&mut self, slow: Slow) {
        let factor = slow.factor.clamp(0.0, 1.0);
        self.slow_factor = if self.slow_remaining > 0.0 {
            self.slow_factor.min(factor)
        } else {
            factor
        };
        self.slow_remaining = self.slow_remaining.max(slow.duration);
    }

    pub fn apply_stun(&mut self, secs: f32) {
        self.stun_remaining = self.stun_remaining.max(secs);
    }

    pub fn apply_knockback(&mut self, impulse: Vec2) {
        if impulse.is_finite() {
            self.knockback += impulse;
        }
    }

    pub fn speed_mult(&self) -> f32 {
        if self.slow_remaining > 0.0 {
            self.slow_factor
        } else {
            1.0
        }
    }

    pub fn is_stunned(&self) -> bool {
        self.stun_remaining > 0.0
    }

    /// Advance all timers by `dt`, returning damage dealt by DoT stacks
    pub fn tick(&mut self, dt: f32) -> f32 {
        let mut damage = 0.0;
        for dot in &mut self.dots {
            damage += dot.dps * dt.min(dot.remaining);
            dot.remaining -= dt;
        }
        self.dots.retain(|d| d.remaining > 0.0);

        self.slow_remaining = (self.slow_remaining - dt).max(0.0);
        self.stun_remaining = (self.stun_remaining - dt).max(0.0);
        self.knockback *= (-KNOCKBACK_DECAY * dt).exp();
        if self.knockback.length_squared() < 1.0 {
            self.knockback = Vec2::ZERO;
        }
        damage
    }
}

/// An attack with its own countdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackState {
    pub def: AttackDef,
    /// Elapsed time since the attack last fired
    pub timer: f32,
    /// Times this attack has fired (drives spiral rotation)
    pub volleys: u32,
}

impl AttackState {
    pub fn new(def: AttackDef) -> Self {
        Self {
            def,
            timer: 0.0,
            volleys: 0,
        }
    }

    /// Accumulate `dt`; returns true when the attack fires (timer resets to zero)
    pub fn advance(&mut self, dt: f32) -> bool {
        self.timer += dt;
        if self.timer >= self.def.cooldown {
            self.timer = 0.0;
            self.volleys += 1;
            true
        } else {
            false
        }
    }
}

/// Phase track owned by a boss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossPhases {
    pub phases: Vec<PhaseDef>,
    /// Index into `phases`; never decreases
    pub current: usize,
}

impl BossPhases {
    /// Highest-index phase whose threshold is at or above `fraction`
    pub fn phase_for(&self, fraction: f32) -> usize {
        self.phases
            .iter()
            .rposition(|p| p.threshold >= fraction)
            .unwrap_or(0)
    }
}

/// Enemy variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EnemyRole {
    Regular,
    Miniboss,
    Boss(BossPhases),
}

/// An enemy or boss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    /// Catalog id
    pub kind: String,
    pub body: Body,
    pub speed: f32,
    pub contact_damage: f32,
    pub behavior: Behavior,
    pub preferred_range: f32,
    pub memory: MoveMemory,
    pub attacks: Vec<AttackState>,
    pub status: StatusEffects,
    /// Direction melee attacks sweep toward; turns toward the player over time
    #[serde(default)]
    pub facing: Vec2,
    /// Remaining entry animation; no movement or attacks until zero
    pub spawn_timer: f32,
    pub role: EnemyRole,
    pub on_death: DeathEffect,
    /// Death effects already resolved
    #[serde(default)]
    pub reaped: bool,
}

impl Enemy {
    pub fn from_def(
        id: u32,
        def: &EnemyDef,
        pos: Vec2,
        health_scale: f32,
        role: EnemyRole,
    ) -> Self {
        let health = def.health * health_scale;
        Self {
            id,
            kind: def.id.clone(),
            body: Body::new(pos, def.radius, health, def.shield * health_scale),
            speed: def.speed,
            contact_damage: def.contact_damage,
            behavior: def.behavior,
            preferred_range: def.preferred_range,
            memory: MoveMemory::default(),
            attacks: def.attacks.iter().cloned().map(AttackState::new).collect(),
            status: StatusEffects::default(),
            facing: FALLBACK_HEADING,
            spawn_timer: SPAWN_DURATION,
            role,
            on_death: def.on_death.clone(),
            reaped: false,
        }
    }

    pub fn from_boss(id: u32, def: &BossDef, pos: Vec2, health_scale: f32) -> Self {
        let health = def.health * health_scale;
        let attacks = def
            .phases
            .first()
            .map(|p| p.attacks.iter().cloned().map(AttackState::new).collect())
            .unwrap_or_default();
        Self {
            id,
            kind: def.id.clone(),
            body: Body::new(pos, def.radius, health, def.shield * health_scale),
            speed: def.speed,
            contact_damage: def.contact_damage,
            behavior: def.behavior,
            preferred_range: def.preferred_range,
            memory: MoveMemory::default(),
            attacks,
            status: StatusEffects::default(),
            facing: FALLBACK_HEADING,
            spawn_timer: SPAWN_DURATION,
            role: EnemyRole::Boss(BossPhases {
                phases: def.phases.clone(),
                current: 0,
            }),
            on_death: DeathEffect::None,
            reaped: false,
        }
    }

    pub fn is_spawning(&self) -> bool {
        self.spawn_timer > 0.0
    }

    /// Alive and past its entry animation
    pub fn is_engaged(&self) -> bool {
        self.body.active && !self.is_spawning()
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.role, EnemyRole::Boss(_))
    }

    pub fn phase_index(&self) -> Option<usize> {
        match &self.role {
            EnemyRole::Boss(phases) => Some(phases.current),
            _ => None,
        }
    }

    /// Movement in effect, honoring a boss phase override
    pub fn current_behavior(&self) -> Behavior {
        match &self.role {
            EnemyRole::Boss(track) => track
                .phases
                .get(track.current)
                .and_then(|p| p.behavior)
                .unwrap_or(self.behavior),
            _ => self.behavior,
        }
    }
}

/// Permanent stat multipliers from upgrades
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStats {
    pub damage_mult: f32,
    pub fire_rate_mult: f32,
    pub speed_mult: f32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            damage_mult: 1.0,
            fire_rate_mult: 1.0,
            speed_mult: 1.0,
        }
    }
}

/// The player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub body: Body,
    pub stats: PlayerStats,
    pub weapon: WeaponState,
    /// Collected cartridges
    pub modifiers: Vec<ModifierDef>,
    /// Reserve ammo for clip weapons
    pub ammo: u32,
    pub bombs: u32,
    /// Debris
    pub currency: u32,
    /// Facing used for firing
    pub aim: Vec2,
    pub invuln: f32,
    pub dash_remaining: f32,
    pub dash_cooldown: f32,
    pub dash_dir: Vec2,
    pub status: StatusEffects,
}

impl Player {
    pub fn new(loadout: &PlayerSettings, catalog: &Catalog) -> Self {
        let weapon = match catalog.weapon(&loadout.weapon) {
            Ok(def) => def.clone(),
            Err(err) => {
                log::warn!("starting weapon unavailable ({}), using sidearm", err);
                WeaponState::sidearm()
            }
        };
        Self {
            body: Body::new(ROOM_CENTER, PLAYER_RADIUS, loadout.max_health, loadout.shield),
            stats: PlayerStats::default(),
            weapon: WeaponState::new(weapon),
            modifiers: Vec::new(),
            ammo: loadout.ammo,
            bombs: loadout.bombs,
            currency: loadout.currency,
            aim: FALLBACK_HEADING,
            invuln: 0.0,
            dash_remaining: 0.0,
            dash_cooldown: 0.0,
            dash_dir: FALLBACK_HEADING,
            status: StatusEffects::default(),
        }
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invuln > 0.0 || self.dash_remaining > 0.0
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_remaining > 0.0
    }

    pub fn equip(&mut self, def: &WeaponDef) {
        self.weapon = WeaponState::new(def.clone());
    }

    pub fn add_modifier(&mut self, def: &ModifierDef) {
        self.modifiers.push(def.clone());
    }

    /// Modifier effects every shot carries (weapon intrinsics first)
    pub fn shot_effects(&self) -> Vec<ModifierEffect> {
        self.weapon
            .def
            .modifiers
            .iter()
            .copied()
            .chain(self.modifiers.iter().map(|m| m.effect))
            .collect()
    }
}

/// Which side fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Homing {
    /// Radians per second
    pub turn_rate: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounce {
    pub remaining: u32,
    /// Damage multiplier per bounce
    pub decay: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Explosive {
    pub radius: f32,
    /// Splash damage as a fraction of the hit
    pub damage_mult: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageOverTime {
    pub dps: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldOnHit {
    pub radius: f32,
    pub damage: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub stun: f32,
    pub knockback: f32,
}

/// Fixed set of optional modifier components
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub piercing: bool,
    pub homing: Option<Homing>,
    pub bounce: Option<Bounce>,
    pub explosive: Option<Explosive>,
    pub dot: Option<DamageOverTime>,
    pub field: Option<FieldOnHit>,
    /// Heal chance on kill
    pub vampiric: Option<f32>,
    pub orbit: bool,
    pub impact: Option<Impact>,
}

impl Modifiers {
    /// Fold modifier effects into one component set; duplicates stack
    pub fn from_effects<'a>(effects: impl IntoIterator<Item = &'a ModifierEffect>) -> Self {
        let mut m = Self::default();
        for effect in effects {
            match *effect {
                ModifierEffect::Piercing => m.piercing = true,
                ModifierEffect::Homing { turn_rate } => {
                    let turn_rate = m.homing.map_or(turn_rate, |h| h.turn_rate.max(turn_rate));
                    m.homing = Some(Homing { turn_rate });
                }
                ModifierEffect::Bounce { count, decay } => {
                    m.bounce = Some(match m.bounce {
                        Some(b) => Bounce {
                            remaining: b.remaining + count,
                            decay: b.decay.max(decay),
                        },
                        None => Bounce {
                            remaining: count,
                            decay,
                        },
                    });
                }
                ModifierEffect::Explosive {
                    radius,
                    damage_mult,
                } => {
                    m.explosive = Some(match m.explosive {
                        Some(e) => Explosive {
                            radius: e.radius.max(radius),
                            damage_mult: e.damage_mult + damage_mult,
                        },
                        None => Explosive {
                            radius,
                            damage_mult,
                        },
                    });
                }
                ModifierEffect::Spear { dps, duration } => {
                    m.dot = Some(match m.dot {
                        Some(d) => DamageOverTime {
                            dps: d.dps + dps,
                            duration: d.duration.max(duration),
                        },
                        None => DamageOverTime { dps, duration },
                    });
                }
                ModifierEffect::Field {
                    radius,
                    damage,
                    duration,
                } => {
                    m.field = Some(match m.field {
                        Some(f) => FieldOnHit {
                            radius: f.radius.max(radius),
                            damage: f.damage + damage,
                            duration: f.duration.max(duration),
                        },
                        None => FieldOnHit {
                            radius,
                            damage,
                            duration,
                        },
                    });
                }
                ModifierEffect::Vampiric { chance } => {
                    m.vampiric = Some((m.vampiric.unwrap_or(0.0) + chance).min(1.0));
                }
                ModifierEffect::Orbit => m.orbit = true,
                ModifierEffect::Concussive { stun, knockback } => {
                    m.impact = Some(match m.impact {
                        Some(i) => Impact {
                            stun: i.stun.max(stun),
                            knockback: i.knockback + knockback,
                        },
                        None => Impact { stun, knockback },
                    });
                }
            }
        }
        m
    }
}

/// Orbiting projectile lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Orbit {
    /// Circling the player; position derived from angle and radius
    Orbiting { angle: f32, radius: f32 },
    /// Released toward an enemy; ordinary homing physics from here on
    Homing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    pub radius: f32,
    pub side: Side,
    /// Seconds until expiry
    pub lifetime: f32,
    pub modifiers: Modifiers,
    pub orbit: Option<Orbit>,
    /// Effects applied to the player on an enemy hit
    pub payload: HitPayload,
    /// Enemy ids a piercing projectile has already damaged
    pub hits: Vec<u32>,
    pub active: bool,
}

impl Projectile {
    pub fn new(id: u32, side: Side, pos: Vec2, vel: Vec2, damage: f32, radius: f32) -> Self {
        Self {
            id,
            pos,
            vel,
            damage,
            radius,
            side,
            lifetime: 6.0,
            modifiers: Modifiers::default(),
            orbit: None,
            payload: HitPayload::default(),
            hits: Vec::new(),
            active: true,
        }
    }

    pub fn is_orbiting(&self) -> bool {
        matches!(self.orbit, Some(Orbit::Orbiting { .. }))
    }
}

/// A lingering damage area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hazard {
    pub id: u32,
    pub pos: Vec2,
    pub radius: f32,
    /// Damage per pulse
    pub damage: f32,
    pub remaining: f32,
    pub pulse_timer: f32,
    /// Side that placed it; it hurts the other side
    pub side: Side,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    Health,
    Shield,
    Ammo,
    Bomb,
    Currency,
    /// Grants the named modifier
    Cartridge(String),
    /// Swaps to the named weapon
    Weapon(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: u32,
    pub kind: PickupKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub value: u32,
    pub active: bool,
}

/// Scalar state the HUD draws
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hud {
    pub health: f32,
    pub max_health: f32,
    pub shield: f32,
    /// (loaded, capacity) for clip weapons
    pub clip: Option<(u32, u32)>,
    pub ammo: u32,
    pub bombs: u32,
    pub currency: u32,
    pub weapon: String,
    pub weapon_cooldown: f32,
    pub reload_remaining: f32,
    /// 0..1 for charge weapons
    pub charge: f32,
    pub dash_cooldown: f32,
    pub floor: u32,
    pub room: Coord,
    pub phase: GamePhase,
}

/// Complete simulation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub settings: Settings,
    /// Current floor (0-based)
    pub floor_index: u32,
    pub floor: FloorGraph,
    /// Active room
    pub current: Coord,
    pub phase: GamePhase,
    /// Simulated seconds
    pub time: f32,
    pub ticks: u64,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub hazards: Vec<Hazard>,
    pub pickups: Vec<Pickup>,
    /// The active room has had live enemies since it was entered
    pub(crate) room_enemies_seen: bool,
    /// Events raised this tick, flushed to the sink at the end of it
    #[serde(skip)]
    pub(crate) events: Vec<GameEvent>,
    next_id: u32,
}

impl SimulationState {
    /// Start a run: generate floor 0 and enter its start room
    pub fn new(seed: u64, settings: Settings, catalog: &Catalog) -> Result<Self> {
        let mut rng = Pcg32::seed_from_u64(seed);
        let floor = floor::generate_floor(0, &settings, catalog, &mut rng)?;
        let player = Player::new(&settings.player, catalog);
        let start = floor.start;

        let mut state = Self {
            seed,
            rng,
            settings,
            floor_index: 0,
            floor,
            current: start,
            phase: GamePhase::Playing,
            time: 0.0,
            ticks: 0,
            player,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            hazards: Vec::new(),
            pickups: Vec::new(),
            room_enemies_seen: false,
            events: Vec::new(),
            next_id: 1,
        };
        room::enter_room(&mut state, catalog, start);
        Ok(state)
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn current_room(&self) -> Option<&Room> {
        self.floor.room(self.current)
    }

    pub fn current_room_mut(&mut self) -> Option<&mut Room> {
        self.floor.room_mut(self.current)
    }

    pub fn current_role(&self) -> Option<RoomRole> {
        self.current_room().map(|r| r.role)
    }

    /// Live enemies (including ones still spawning in)
    pub fn active_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.body.active).count()
    }

    /// Nearest engaged enemy within `range` of `from`
    pub fn nearest_enemy(&self, from: Vec2, range: f32) -> Option<&Enemy> {
        self.enemies
            .iter()
            .filter(|e| e.is_engaged())
            .map(|e| (e, e.body.pos.distance_squared(from)))
            .filter(|(_, d2)| *d2 <= range * range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(e, _)| e)
    }

    /// Drop everything marked inactive during the previous tick
    pub fn remove_inactive(&mut self) {
        self.enemies.retain(|e| e.body.active || !e.reaped);
        self.projectiles.retain(|p| p.active);
        self.hazards.retain(|h| h.active);
        self.pickups.retain(|p| p.active);
    }

    /// Enemy health multiplier for the current floor
    pub fn health_scale(&self) -> f32 {
        self.settings.health_scale(self.floor_index)
    }

    pub fn hud(&self) -> Hud {
        let weapon = &self.player.weapon;
        Hud {
            health: self.player.body.health.max(0.0),
            max_health: self.player.body.max_health,
            shield: self.player.body.shield,
            clip: weapon.capacity().map(|cap| (weapon.clip, cap)),
            ammo: self.player.ammo,
            bombs: self.player.bombs,
            currency: self.player.currency,
            weapon: weapon.def.id.clone(),
            weapon_cooldown: weapon.cooldown,
            reload_remaining: weapon.reload,
            charge: weapon.charge_fraction(),
            dash_cooldown: self.player.dash_cooldown,
            floor: self.floor_index,
            room: self.current,
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shield_absorbs_before_health() {
        let mut body = Body::new(Vec2::ZERO, 10.0, 4.0, 2.0);
        let report = body.apply_damage(5.0);
        assert_eq!(body.shield, 0.0);
        assert_eq!(body.health, 1.0);
        assert_eq!(report.absorbed, 2.0);
        assert_eq!(report.to_health, 3.0);
        assert!(!report.killed);
    }

    #[test]
    fn test_damage_without_shield() {
        let mut body = Body::new(Vec2::ZERO, 10.0, 15.0, 0.0);
        let report = body.apply_damage(20.0);
        assert!(report.killed);
        assert!(!body.active);

        // Dead bodies take no further damage
        let again = body.apply_damage(20.0);
        assert_eq!(again, DamageReport::default());
        assert_eq!(body.health, -5.0);
    }

    #[test]
    fn test_invalid_damage_is_ignored() {
        let mut body = Body::new(Vec2::ZERO, 10.0, 5.0, 1.0);
        body.apply_damage(f32::NAN);
        body.apply_damage(-3.0);
        assert_eq!(body.health, 5.0);
        assert_eq!(body.shield, 1.0);
    }

    #[test]
    fn test_attack_timer_resets_on_fire() {
        let def = AttackDef {
            cooldown: 1.0,
            pattern: crate::catalog::AttackPattern::Ring {
                count: 4,
                speed: 100.0,
                damage: 1.0,
                radius: 5.0,
            },
            payload: HitPayload::default(),
        };
        let mut attack = AttackState::new(def);
        assert!(!attack.advance(0.6));
        assert!(attack.advance(0.6));
        assert_eq!(attack.timer, 0.0);
        assert_eq!(attack.volleys, 1);
    }

    #[test]
    fn test_phase_for_fraction() {
        let phase = |threshold| PhaseDef {
            threshold,
            attacks: Vec::new(),
            behavior: None,
        };
        let track = BossPhases {
            phases: vec![phase(1.0), phase(0.5), phase(0.25)],
            current: 0,
        };
        assert_eq!(track.phase_for(1.0), 0);
        assert_eq!(track.phase_for(0.6), 0);
        assert_eq!(track.phase_for(0.5), 1);
        assert_eq!(track.phase_for(0.4), 1);
        assert_eq!(track.phase_for(0.1), 2);
    }

    #[test]
    fn test_status_effects_tick() {
        let mut status = StatusEffects::default();
        status.apply_dot(2.0, 1.0);
        status.apply_slow(Slow {
            factor: 0.5,
            duration: 0.5,
        });
        assert_eq!(status.speed_mult(), 0.5);

        let damage = status.tick(0.5);
        assert!((damage - 1.0).abs() < 1e-5);
        assert_eq!(status.speed_mult(), 1.0);

        // Remaining half second of DoT, then it expires
        let damage = status.tick(2.0);
        assert!((damage - 1.0).abs() < 1e-5);
        assert!(status.dots.is_empty());
    }

    #[test]
    fn test_modifiers_stack() {
        let effects = [
            ModifierEffect::Bounce {
                count: 1,
                decay: 0.8,
            },
            ModifierEffect::Bounce {
                count: 2,
                decay: 0.5,
            },
            ModifierEffect::Piercing,
            ModifierEffect::Vampiric { chance: 0.7 },
            ModifierEffect::Vampiric { chance: 0.7 },
        ];
        let m = Modifiers::from_effects(&effects);
        assert!(m.piercing);
        assert_eq!(m.bounce.map(|b| b.remaining), Some(3));
        assert_eq!(m.vampiric, Some(1.0));
        assert!(m.homing.is_none());
    }
}
