//! Stat catalog
//!
//! Immutable per-kind definitions for enemies, bosses, weapons and projectile
//! modifiers. The simulation reads these by id; a lookup for an unknown id is
//! a recoverable configuration error.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Movement strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    #[default]
    Stationary,
    /// Move straight at the player
    Chase,
    /// Move straight away from the player
    Flee,
    /// Back off until at preferred range, then hold position
    Retreat,
    /// Random direction, re-rolled periodically
    Wander,
    /// Circle the player at preferred range
    Strafe,
    /// Travel in a straight line, reflecting off walls
    Bounce,
    /// Track the player's reflection through the room center
    Mirror,
    /// Rest, then burst toward the player
    Dash,
    /// Blink on a timer to a random spot, preferring one well clear of the player
    Teleport,
}

/// Slow applied by an enemy projectile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slow {
    /// Movement multiplier while slowed (0.5 = half speed)
    pub factor: f32,
    pub duration: f32,
}

/// Damage over time applied by an enemy projectile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Burn {
    pub dps: f32,
    pub duration: f32,
}

/// Extra effects carried by enemy projectiles
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HitPayload {
    pub slow: Option<Slow>,
    pub burn: Option<Burn>,
    /// Knockback impulse pushing the player away from the hit
    pub knockback: f32,
}

/// What an attack does when its timer fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttackPattern {
    /// Fan of projectiles aimed at the player
    Aimed {
        count: u32,
        spread: f32,
        speed: f32,
        damage: f32,
        radius: f32,
    },
    /// Evenly spaced radial burst
    Ring {
        count: u32,
        speed: f32,
        damage: f32,
        radius: f32,
    },
    /// Radial burst whose angle advances by `step` every volley
    Spiral {
        arms: u32,
        speed: f32,
        damage: f32,
        radius: f32,
        step: f32,
    },
    /// Spawn minions next to the attacker
    Summon { enemy: String, count: u32 },
    /// Instant damage to the player if inside the cone
    MeleeCone { arc: f32, range: f32, damage: f32 },
    /// Lingering damage pool placed under the player
    Hazard {
        radius: f32,
        damage: f32,
        duration: f32,
    },
}

/// One independently timed attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackDef {
    pub cooldown: f32,
    pub pattern: AttackPattern,
    #[serde(default)]
    pub payload: HitPayload,
}

/// Effect triggered when an enemy dies
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeathEffect {
    #[default]
    None,
    /// Break into `count` smaller enemies
    Split { into: String, count: u32 },
    /// Release a single ghost enemy
    Ghost { into: String },
}

fn default_range() -> f32 {
    220.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyDef {
    pub id: String,
    pub health: f32,
    #[serde(default)]
    pub shield: f32,
    pub speed: f32,
    pub radius: f32,
    pub contact_damage: f32,
    pub behavior: Behavior,
    #[serde(default = "default_range")]
    pub preferred_range: f32,
    #[serde(default)]
    pub attacks: Vec<AttackDef>,
    #[serde(default)]
    pub on_death: DeathEffect,
}

/// A health-gated bundle of boss attacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDef {
    /// Phase is eligible once health fraction is at or below this value
    pub threshold: f32,
    pub attacks: Vec<AttackDef>,
    /// Overrides the boss's movement while this phase is active
    #[serde(default)]
    pub behavior: Option<Behavior>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossDef {
    pub id: String,
    pub health: f32,
    #[serde(default)]
    pub shield: f32,
    pub speed: f32,
    pub radius: f32,
    pub contact_damage: f32,
    pub behavior: Behavior,
    #[serde(default = "default_range")]
    pub preferred_range: f32,
    /// Ordered by descending threshold; phase 0 should use 1.0
    pub phases: Vec<PhaseDef>,
}

/// How a weapon turns trigger input into shots
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FireMode {
    /// Fires whenever the cooldown allows; never consumes ammo
    #[default]
    Auto,
    /// Consumes clip ammo and needs explicit reloads from the ammo pool
    Clip { capacity: u32, reload_secs: f32 },
    /// Charges while held, releases one scaled shot
    Charge {
        max_charge: f32,
        max_damage_mult: f32,
        max_size_mult: f32,
    },
}

/// A projectile modifier effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierEffect {
    Piercing,
    Homing { turn_rate: f32 },
    Bounce { count: u32, decay: f32 },
    Explosive { radius: f32, damage_mult: f32 },
    /// Damage-over-time payload applied on hit
    Spear { dps: f32, duration: f32 },
    /// Leaves a damaging field where it hits
    Field {
        radius: f32,
        damage: f32,
        duration: f32,
    },
    /// Chance to heal the player on a kill
    Vampiric { chance: f32 },
    /// Shots circle the player until an enemy comes into range
    Orbit,
    /// Stuns and shoves the enemy it hits
    Concussive { stun: f32, knockback: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDef {
    pub id: String,
    pub damage: f32,
    pub speed: f32,
    pub radius: f32,
    /// Seconds between shots
    pub cooldown: f32,
    /// Seconds a projectile lives before expiring
    pub lifetime: f32,
    #[serde(default = "one")]
    pub pellets: u32,
    /// Total fan angle across pellets (radians)
    #[serde(default)]
    pub spread: f32,
    #[serde(default)]
    pub mode: FireMode,
    /// Modifiers every shot from this weapon carries
    #[serde(default)]
    pub modifiers: Vec<ModifierEffect>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierDef {
    pub id: String,
    pub effect: ModifierEffect,
}

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogData {
    pub enemies: Vec<EnemyDef>,
    pub bosses: Vec<BossDef>,
    pub weapons: Vec<WeaponDef>,
    pub modifiers: Vec<ModifierDef>,
    /// Enemy ids for normal rooms, one list per floor tier
    pub pools: Vec<Vec<String>>,
    /// Enemy ids that anchor miniboss rooms
    pub minibosses: Vec<String>,
    /// Boss ids, cycled by floor index
    pub boss_order: Vec<String>,
}

/// Indexed, read-only catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    enemies: BTreeMap<String, EnemyDef>,
    bosses: BTreeMap<String, BossDef>,
    weapons: BTreeMap<String, WeaponDef>,
    modifiers: BTreeMap<String, ModifierDef>,
    pools: Vec<Vec<String>>,
    minibosses: Vec<String>,
    boss_order: Vec<String>,
}

impl Catalog {
    pub fn from_data(data: CatalogData) -> Self {
        let catalog = Self {
            enemies: data.enemies.into_iter().map(|e| (e.id.clone(), e)).collect(),
            bosses: data.bosses.into_iter().map(|b| (b.id.clone(), b)).collect(),
            weapons: data.weapons.into_iter().map(|w| (w.id.clone(), w)).collect(),
            modifiers: data.modifiers.into_iter().map(|m| (m.id.clone(), m)).collect(),
            pools: data.pools,
            minibosses: data.minibosses,
            boss_order: data.boss_order,
        };
        for problem in catalog.dangling_references() {
            log::warn!("catalog: {}", problem);
        }
        catalog
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: CatalogData = serde_json::from_str(json).map_err(SimError::Catalog)?;
        Ok(Self::from_data(data))
    }

    /// Read a catalog file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json(&json)?;
        log::info!("Loaded catalog from {}", path.as_ref().display());
        Ok(catalog)
    }

    pub fn enemy(&self, id: &str) -> Result<&EnemyDef> {
        self.enemies.get(id).ok_or_else(|| unknown("enemy", id))
    }

    pub fn boss(&self, id: &str) -> Result<&BossDef> {
        self.bosses.get(id).ok_or_else(|| unknown("boss", id))
    }

    pub fn weapon(&self, id: &str) -> Result<&WeaponDef> {
        self.weapons.get(id).ok_or_else(|| unknown("weapon", id))
    }

    pub fn modifier(&self, id: &str) -> Result<&ModifierDef> {
        self.modifiers.get(id).ok_or_else(|| unknown("modifier", id))
    }

    /// Enemy pool for a floor (deeper floors reuse the last tier)
    pub fn pool(&self, floor: u32) -> &[String] {
        match self.pools.len() {
            0 => &[],
            n => self.pools[(floor as usize).min(n - 1)].as_slice(),
        }
    }

    pub fn minibosses(&self) -> &[String] {
        &self.minibosses
    }

    /// Boss assigned to a floor
    pub fn boss_for_floor(&self, floor: u32) -> Option<&str> {
        match self.boss_order.len() {
            0 => None,
            n => Some(self.boss_order[floor as usize % n].as_str()),
        }
    }

    pub fn weapon_ids(&self) -> impl Iterator<Item = &str> {
        self.weapons.keys().map(String::as_str)
    }

    pub fn modifier_ids(&self) -> impl Iterator<Item = &str> {
        self.modifiers.keys().map(String::as_str)
    }

    /// Ids referenced somewhere in the catalog that have no definition
    pub fn dangling_references(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut check_enemy = |id: &str, from: &str| {
            if !self.enemies.contains_key(id) {
                problems.push(format!("{from} references unknown enemy `{id}`"));
            }
        };

        for id in self.pools.iter().flatten() {
            check_enemy(id, "pool");
        }
        for id in &self.minibosses {
            check_enemy(id, "miniboss list");
        }
        let attacks = self
            .enemies
            .values()
            .flat_map(|e| e.attacks.iter().map(move |a| (e.id.as_str(), a)))
            .chain(self.bosses.values().flat_map(|b| {
                b.phases
                    .iter()
                    .flat_map(move |p| p.attacks.iter().map(move |a| (b.id.as_str(), a)))
            }));
        for (owner, attack) in attacks {
            if let AttackPattern::Summon { enemy, .. } = &attack.pattern {
                check_enemy(enemy, owner);
            }
        }
        for enemy in self.enemies.values() {
            match &enemy.on_death {
                DeathEffect::Split { into, .. } | DeathEffect::Ghost { into } => {
                    check_enemy(into, &enemy.id)
                }
                DeathEffect::None => {}
            }
        }
        for id in &self.boss_order {
            if !self.bosses.contains_key(id) {
                problems.push(format!("boss order references unknown boss `{id}`"));
            }
        }
        problems
    }

    /// Built-in stat tables
    pub fn builtin() -> Self {
        Self::from_data(builtin_data())
    }
}

fn unknown(kind: &'static str, key: &str) -> SimError {
    SimError::UnknownCatalogKey {
        kind,
        key: key.to_string(),
    }
}

fn aimed(cooldown: f32, count: u32, spread: f32, speed: f32) -> AttackDef {
    AttackDef {
        cooldown,
        pattern: AttackPattern::Aimed {
            count,
            spread,
            speed,
            damage: 1.0,
            radius: 6.0,
        },
        payload: HitPayload::default(),
    }
}

fn ring(cooldown: f32, count: u32, speed: f32) -> AttackDef {
    AttackDef {
        cooldown,
        pattern: AttackPattern::Ring {
            count,
            speed,
            damage: 1.0,
            radius: 6.0,
        },
        payload: HitPayload::default(),
    }
}

fn spiral(cooldown: f32, arms: u32, step: f32) -> AttackDef {
    AttackDef {
        cooldown,
        pattern: AttackPattern::Spiral {
            arms,
            speed: 170.0,
            damage: 1.0,
            radius: 6.0,
            step,
        },
        payload: HitPayload::default(),
    }
}

fn summon(cooldown: f32, enemy: &str, count: u32) -> AttackDef {
    AttackDef {
        cooldown,
        pattern: AttackPattern::Summon {
            enemy: enemy.to_string(),
            count,
        },
        payload: HitPayload::default(),
    }
}

fn hazard(cooldown: f32, radius: f32, duration: f32) -> AttackDef {
    AttackDef {
        cooldown,
        pattern: AttackPattern::Hazard {
            radius,
            damage: 1.0,
            duration,
        },
        payload: HitPayload::default(),
    }
}

fn enemy(id: &str, health: f32, speed: f32, radius: f32, behavior: Behavior) -> EnemyDef {
    EnemyDef {
        id: id.to_string(),
        health,
        shield: 0.0,
        speed,
        radius,
        contact_damage: 1.0,
        behavior,
        preferred_range: default_range(),
        attacks: Vec::new(),
        on_death: DeathEffect::None,
    }
}

fn builtin_data() -> CatalogData {
    use Behavior::*;

    let mut sniper = enemy("sniper", 12.0, 110.0, 12.0, Retreat);
    sniper.preferred_range = 320.0;
    sniper.attacks = vec![AttackDef {
        payload: HitPayload {
            slow: Some(Slow {
                factor: 0.5,
                duration: 1.5,
            }),
            ..HitPayload::default()
        },
        ..aimed(2.5, 1, 0.0, 320.0)
    }];

    let mut orbiter = enemy("orbiter", 14.0, 120.0, 13.0, Strafe);
    orbiter.preferred_range = 200.0;
    orbiter.attacks = vec![ring(3.0, 6, 150.0)];

    let mut bouncer = enemy("bouncer", 12.0, 140.0, 14.0, Bounce);
    bouncer.on_death = DeathEffect::Split {
        into: "mite".to_string(),
        count: 2,
    };

    let mut phantom = enemy("phantom", 12.0, 0.0, 12.0, Teleport);
    phantom.preferred_range = 180.0;
    phantom.attacks = vec![ring(2.8, 8, 140.0)];
    phantom.on_death = DeathEffect::Ghost {
        into: "wisp".to_string(),
    };

    let mut carrier = enemy("carrier", 24.0, 60.0, 18.0, Flee);
    carrier.attacks = vec![summon(4.0, "mite", 2)];

    let mut brute = enemy("brute", 80.0, 70.0, 22.0, Chase);
    brute.shield = 10.0;
    brute.contact_damage = 2.0;
    brute.attacks = vec![
        AttackDef {
            cooldown: 1.8,
            pattern: AttackPattern::MeleeCone {
                arc: 1.6,
                range: 70.0,
                damage: 2.0,
            },
            payload: HitPayload {
                knockback: 260.0,
                ..HitPayload::default()
            },
        },
        ring(3.5, 10, 140.0),
    ];

    let mut warden = enemy("warden", 90.0, 90.0, 20.0, Strafe);
    warden.preferred_range = 240.0;
    warden.attacks = vec![spiral(0.4, 3, 0.35), hazard(5.0, 60.0, 3.0)];

    let enemies = vec![
        enemy("drone", 10.0, 90.0, 12.0, Chase),
        EnemyDef {
            attacks: vec![aimed(1.6, 1, 0.0, 180.0)],
            ..enemy("turret", 14.0, 0.0, 14.0, Stationary)
        },
        EnemyDef {
            attacks: vec![aimed(2.2, 1, 0.0, 160.0)],
            ..enemy("skitter", 6.0, 120.0, 10.0, Wander)
        },
        EnemyDef {
            contact_damage: 2.0,
            ..enemy("lancer", 16.0, 100.0, 13.0, Dash)
        },
        EnemyDef {
            attacks: vec![aimed(2.0, 3, 0.4, 170.0)],
            ..enemy("mirror", 14.0, 150.0, 12.0, Mirror)
        },
        enemy("mite", 4.0, 150.0, 8.0, Chase),
        EnemyDef {
            attacks: vec![AttackDef {
                payload: HitPayload {
                    burn: Some(Burn {
                        dps: 0.5,
                        duration: 2.0,
                    }),
                    ..HitPayload::default()
                },
                ..aimed(2.4, 1, 0.0, 150.0)
            }],
            ..enemy("wisp", 3.0, 70.0, 9.0, Chase)
        },
        sniper,
        orbiter,
        bouncer,
        phantom,
        carrier,
        brute,
        warden,
    ];

    let bosses = vec![
        BossDef {
            id: "hive_queen".to_string(),
            health: 300.0,
            shield: 0.0,
            speed: 80.0,
            radius: 32.0,
            contact_damage: 2.0,
            behavior: Strafe,
            preferred_range: 260.0,
            phases: vec![
                PhaseDef {
                    threshold: 1.0,
                    attacks: vec![aimed(1.4, 3, 0.5, 200.0), summon(6.0, "mite", 2)],
                    behavior: None,
                },
                PhaseDef {
                    threshold: 0.6,
                    attacks: vec![ring(2.0, 14, 160.0), summon(5.0, "drone", 1)],
                    behavior: None,
                },
                PhaseDef {
                    threshold: 0.3,
                    attacks: vec![spiral(0.25, 4, 0.3), hazard(4.0, 70.0, 3.0)],
                    behavior: Some(Dash),
                },
            ],
        },
        BossDef {
            id: "iron_saint".to_string(),
            health: 360.0,
            shield: 40.0,
            speed: 60.0,
            radius: 36.0,
            contact_damage: 2.0,
            behavior: Chase,
            preferred_range: 200.0,
            phases: vec![
                PhaseDef {
                    threshold: 1.0,
                    attacks: vec![ring(1.8, 12, 150.0), aimed(2.4, 5, 0.8, 220.0)],
                    behavior: None,
                },
                PhaseDef {
                    threshold: 0.5,
                    attacks: vec![spiral(0.2, 5, 0.25), summon(7.0, "lancer", 2)],
                    behavior: Some(Teleport),
                },
            ],
        },
    ];

    let weapons = vec![
        WeaponDef {
            id: "pistol".to_string(),
            damage: 5.0,
            speed: 520.0,
            radius: 5.0,
            cooldown: 0.25,
            lifetime: 1.6,
            pellets: 1,
            spread: 0.0,
            mode: FireMode::Auto,
            modifiers: Vec::new(),
        },
        WeaponDef {
            id: "smg".to_string(),
            damage: 3.0,
            speed: 560.0,
            radius: 4.0,
            cooldown: 0.08,
            lifetime: 1.2,
            pellets: 1,
            spread: 0.1,
            mode: FireMode::Clip {
                capacity: 30,
                reload_secs: 1.2,
            },
            modifiers: Vec::new(),
        },
        WeaponDef {
            id: "scattergun".to_string(),
            damage: 3.0,
            speed: 480.0,
            radius: 4.0,
            cooldown: 0.7,
            lifetime: 0.6,
            pellets: 5,
            spread: 0.5,
            mode: FireMode::Clip {
                capacity: 6,
                reload_secs: 1.5,
            },
            modifiers: Vec::new(),
        },
        WeaponDef {
            id: "railgun".to_string(),
            damage: 8.0,
            speed: 900.0,
            radius: 5.0,
            cooldown: 0.4,
            lifetime: 1.0,
            pellets: 1,
            spread: 0.0,
            mode: FireMode::Charge {
                max_charge: 1.2,
                max_damage_mult: 4.0,
                max_size_mult: 2.5,
            },
            modifiers: vec![ModifierEffect::Piercing],
        },
        WeaponDef {
            id: "harpoon".to_string(),
            damage: 6.0,
            speed: 460.0,
            radius: 6.0,
            cooldown: 0.5,
            lifetime: 1.4,
            pellets: 1,
            spread: 0.0,
            mode: FireMode::Auto,
            modifiers: vec![ModifierEffect::Spear {
                dps: 3.0,
                duration: 3.0,
            }],
        },
    ];

    let modifier = |id: &str, effect| ModifierDef {
        id: id.to_string(),
        effect,
    };
    let modifiers = vec![
        modifier("piercing", ModifierEffect::Piercing),
        modifier("homing", ModifierEffect::Homing { turn_rate: 4.0 }),
        modifier(
            "ricochet",
            ModifierEffect::Bounce {
                count: 2,
                decay: 0.8,
            },
        ),
        modifier(
            "blast",
            ModifierEffect::Explosive {
                radius: 64.0,
                damage_mult: 0.5,
            },
        ),
        modifier(
            "spear",
            ModifierEffect::Spear {
                dps: 2.0,
                duration: 3.0,
            },
        ),
        modifier(
            "thunderhead",
            ModifierEffect::Field {
                radius: 48.0,
                damage: 2.0,
                duration: 2.0,
            },
        ),
        modifier("vampiric", ModifierEffect::Vampiric { chance: 0.15 }),
        modifier("razor", ModifierEffect::Orbit),
        modifier(
            "concussion",
            ModifierEffect::Concussive {
                stun: 0.4,
                knockback: 180.0,
            },
        ),
    ];

    let ids = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    CatalogData {
        enemies,
        bosses,
        weapons,
        modifiers,
        pools: vec![
            ids(&["drone", "turret", "skitter", "bouncer"]),
            ids(&[
                "drone", "turret", "skitter", "bouncer", "sniper", "orbiter", "lancer", "mirror",
            ]),
            ids(&[
                "turret", "skitter", "bouncer", "sniper", "orbiter", "lancer", "mirror", "phantom",
                "carrier",
            ]),
        ],
        minibosses: ids(&["brute", "warden"]),
        boss_order: ids(&["hive_queen", "iron_saint"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_no_dangling_references() {
        let catalog = Catalog::builtin();
        assert!(catalog.dangling_references().is_empty());
        assert!(catalog.weapon("pistol").is_ok());
    }

    #[test]
    fn test_unknown_key_is_recoverable() {
        let catalog = Catalog::builtin();
        let err = catalog.enemy("not_a_thing").unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, SimError::UnknownCatalogKey { kind: "enemy", .. }));
    }

    #[test]
    fn test_boss_phases_descend() {
        let catalog = Catalog::builtin();
        for id in ["hive_queen", "iron_saint"] {
            let boss = catalog.boss(id).unwrap();
            assert_eq!(boss.phases[0].threshold, 1.0);
            assert!(boss.phases.windows(2).all(|w| w[0].threshold > w[1].threshold));
        }
    }

    #[test]
    fn test_pool_reuses_last_tier() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.pool(50), catalog.pool(2));
        assert!(Catalog::default().pool(0).is_empty());
        assert_eq!(catalog.boss_for_floor(0), Some("hive_queen"));
        assert_eq!(catalog.boss_for_floor(3), Some("iron_saint"));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "enemies": [{
                "id": "blob", "health": 5.0, "speed": 50.0, "radius": 10.0,
                "contact_damage": 1.0, "behavior": "wander",
                "attacks": [{
                    "cooldown": 1.0,
                    "pattern": {
                        "type": "ring", "count": 4, "speed": 100.0, "damage": 1.0, "radius": 5.0
                    }
                }],
                "on_death": { "type": "split", "into": "ghost_blob", "count": 2 }
            }],
            "pools": [["blob"]]
        }"#;
        let catalog = Catalog::from_json(json).expect("valid catalog");
        let blob = catalog.enemy("blob").unwrap();
        assert_eq!(blob.behavior, Behavior::Wander);
        assert_eq!(blob.preferred_range, 220.0);
        assert_eq!(catalog.dangling_references().len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Catalog::load("/nonexistent/catalog.json").unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
        assert!(!err.is_recoverable());
    }
}
