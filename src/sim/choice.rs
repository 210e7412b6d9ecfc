//! Shop, upgrade, shrine and boss-reward choices
//!
//! Offers are generated once per room and memoized on it. The UI layer reads
//! them with [`offers`] and commits one with [`commit_choice`]; everything
//! here only changes player stats.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::events::GameEvent;
use super::floor::RoomRole;
use super::state::SimulationState;
use crate::catalog::Catalog;

/// Health paid to use a shrine
pub const SHRINE_HEALTH_COST: f32 = 1.0;

const UPGRADE_CHOICES: usize = 3;

/// Stat effect of an offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OfferKind {
    Heal,
    MaxHealth,
    Shield,
    DamageUp,
    FireRateUp,
    SpeedUp,
    Bombs,
    Ammo,
    Modifier(String),
    Weapon(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub kind: OfferKind,
    /// Currency price (zero for free choices)
    pub cost: u32,
    pub taken: bool,
}

impl Offer {
    fn free(kind: OfferKind) -> Self {
        Self {
            kind,
            cost: 0,
            taken: false,
        }
    }

    fn priced(kind: OfferKind, cost: u32) -> Self {
        Self {
            kind,
            cost,
            taken: false,
        }
    }
}

/// Persisted sub-state of a non-combat room (or a cleared boss room)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoomFeature {
    /// Each item can be bought once
    Shop { stock: Vec<Offer> },
    /// Pick one of several free upgrades
    Upgrade { choices: Vec<Offer>, taken: bool },
    /// Trade health for a modifier, once
    Shrine { offer: Offer, health_cost: f32, used: bool },
    /// One-time pick after the boss; taking it opens the portal
    BossReward { choices: Vec<Offer>, taken: bool },
}

impl RoomFeature {
    pub fn offers(&self) -> &[Offer] {
        match self {
            RoomFeature::Shop { stock } => stock,
            RoomFeature::Upgrade { choices, .. } | RoomFeature::BossReward { choices, .. } => {
                choices
            }
            RoomFeature::Shrine { offer, .. } => std::slice::from_ref(offer),
        }
    }
}

fn random_modifier(catalog: &Catalog, rng: &mut Pcg32) -> Option<OfferKind> {
    let ids: Vec<&str> = catalog.modifier_ids().collect();
    ids.choose(rng).map(|id| OfferKind::Modifier(id.to_string()))
}

fn random_weapon(catalog: &Catalog, current: &str, rng: &mut Pcg32) -> Option<OfferKind> {
    let ids: Vec<&str> = catalog.weapon_ids().filter(|id| *id != current).collect();
    ids.choose(rng).map(|id| OfferKind::Weapon(id.to_string()))
}

/// Build the memoized feature for a room role, if it has one
pub fn generate_feature(
    role: RoomRole,
    catalog: &Catalog,
    current_weapon: &str,
    rng: &mut Pcg32,
) -> Option<RoomFeature> {
    match role {
        RoomRole::Shop => {
            let mut stock = vec![
                Offer::priced(OfferKind::Heal, 5),
                Offer::priced(OfferKind::Ammo, 4),
                Offer::priced(OfferKind::Bombs, 6),
            ];
            if let Some(kind) = random_modifier(catalog, rng) {
                stock.push(Offer::priced(kind, rng.random_range(12..=18)));
            }
            if let Some(kind) = random_weapon(catalog, current_weapon, rng) {
                stock.push(Offer::priced(kind, 20));
            }
            Some(RoomFeature::Shop { stock })
        }
        RoomRole::Upgrade => {
            let mut pool = vec![
                OfferKind::DamageUp,
                OfferKind::FireRateUp,
                OfferKind::SpeedUp,
                OfferKind::MaxHealth,
                OfferKind::Shield,
            ];
            pool.shuffle(rng);
            let choices = pool
                .into_iter()
                .take(UPGRADE_CHOICES)
                .map(Offer::free)
                .collect();
            Some(RoomFeature::Upgrade {
                choices,
                taken: false,
            })
        }
        RoomRole::Shrine => random_modifier(catalog, rng).map(|kind| RoomFeature::Shrine {
            offer: Offer::free(kind),
            health_cost: SHRINE_HEALTH_COST,
            used: false,
        }),
        RoomRole::Boss => {
            let mut choices: Vec<Offer> = random_modifier(catalog, rng)
                .into_iter()
                .chain(random_weapon(catalog, current_weapon, rng))
                .map(Offer::free)
                .collect();
            choices.push(Offer::free(OfferKind::MaxHealth));
            Some(RoomFeature::BossReward {
                choices,
                taken: false,
            })
        }
        _ => None,
    }
}

/// Offers in the current room (empty when it has none)
pub fn offers(state: &SimulationState) -> &[Offer] {
    state
        .current_room()
        .and_then(|r| r.feature.as_ref())
        .map(RoomFeature::offers)
        .unwrap_or_default()
}

/// Whether committing `index` in the current room would succeed
pub fn can_afford(state: &SimulationState, index: usize) -> bool {
    let Some(feature) = state.current_room().and_then(|r| r.feature.as_ref()) else {
        return false;
    };
    let Some(offer) = feature.offers().get(index) else {
        return false;
    };
    match feature {
        RoomFeature::Shop { .. } => !offer.taken && state.player.currency >= offer.cost,
        RoomFeature::Upgrade { taken, .. } | RoomFeature::BossReward { taken, .. } => !taken,
        RoomFeature::Shrine { .. } => can_use_shrine(state),
    }
}

pub fn can_use_shrine(state: &SimulationState) -> bool {
    match state.current_room().and_then(|r| r.feature.as_ref()) {
        Some(RoomFeature::Shrine {
            used, health_cost, ..
        }) => !used && state.player.body.health > *health_cost,
        _ => false,
    }
}

/// A boss has fallen here and its reward has not been chosen yet
pub fn reward_pending(state: &SimulationState) -> bool {
    matches!(
        state.current_room().and_then(|r| r.feature.as_ref()),
        Some(RoomFeature::BossReward { taken: false, .. })
    )
}

/// Commit offer `index` in the current room; invalid commits are no-ops returning false
pub fn commit_choice(state: &mut SimulationState, catalog: &Catalog, index: usize) -> bool {
    if !can_afford(state, index) {
        return false;
    }
    let Some(feature) = state.current_room_mut().and_then(|r| r.feature.as_mut()) else {
        return false;
    };

    let mut price = 0;
    let mut health_cost = 0.0;
    let mut opens_portal = false;
    let kind = match feature {
        RoomFeature::Shop { stock } => {
            let offer = &mut stock[index];
            offer.taken = true;
            price = offer.cost;
            offer.kind.clone()
        }
        RoomFeature::Upgrade { choices, taken } => {
            *taken = true;
            choices[index].taken = true;
            choices[index].kind.clone()
        }
        RoomFeature::BossReward { choices, taken } => {
            *taken = true;
            opens_portal = true;
            choices[index].taken = true;
            choices[index].kind.clone()
        }
        RoomFeature::Shrine {
            offer,
            health_cost: cost,
            used,
        } => {
            *used = true;
            offer.taken = true;
            health_cost = *cost;
            offer.kind.clone()
        }
    };

    state.player.currency -= price;
    state.player.body.health -= health_cost;
    apply_offer(state, catalog, &kind);
    state.emit(GameEvent::ChoiceCommitted { index });
    if opens_portal {
        log::info!("boss reward taken, portal open");
        state.emit(GameEvent::PortalOpened);
    }
    true
}

fn apply_offer(state: &mut SimulationState, catalog: &Catalog, kind: &OfferKind) {
    let player = &mut state.player;
    match kind {
        OfferKind::Heal => player.body.heal(2.0),
        OfferKind::MaxHealth => {
            player.body.max_health += 1.0;
            player.body.heal(1.0);
        }
        OfferKind::Shield => player.body.shield += 1.0,
        OfferKind::DamageUp => player.stats.damage_mult += 0.2,
        OfferKind::FireRateUp => player.stats.fire_rate_mult += 0.15,
        OfferKind::SpeedUp => player.stats.speed_mult += 0.1,
        OfferKind::Bombs => player.bombs += 1,
        OfferKind::Ammo => player.ammo += 30,
        OfferKind::Modifier(id) => match catalog.modifier(id) {
            Ok(def) => player.add_modifier(def),
            Err(err) => log::warn!("skipping offer: {}", err),
        },
        OfferKind::Weapon(id) => match catalog.weapon(id) {
            Ok(def) => player.equip(def),
            Err(err) => log::warn!("skipping offer: {}", err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use rand::SeedableRng;

    fn state_in(role: RoomRole, feature: RoomFeature) -> SimulationState {
        let catalog = Catalog::builtin();
        let mut state =
            SimulationState::new(4, Settings::default(), &catalog).expect("state builds");
        let room = state.current_room_mut().expect("start room");
        room.role = role;
        room.feature = Some(feature);
        state
    }

    #[test]
    fn test_shop_purchase_requires_currency() {
        let catalog = Catalog::builtin();
        let mut state = state_in(
            RoomRole::Shop,
            RoomFeature::Shop {
                stock: vec![Offer::priced(OfferKind::Bombs, 6)],
            },
        );
        state.player.currency = 5;
        let bombs = state.player.bombs;
        assert!(!can_afford(&state, 0));
        assert!(!commit_choice(&mut state, &catalog, 0));
        assert_eq!(state.player.bombs, bombs);

        state.player.currency = 10;
        assert!(commit_choice(&mut state, &catalog, 0));
        assert_eq!(state.player.currency, 4);
        assert_eq!(state.player.bombs, bombs + 1);

        // Sold out
        assert!(!commit_choice(&mut state, &catalog, 0));
        assert!(!commit_choice(&mut state, &catalog, 9));
    }

    #[test]
    fn test_upgrade_only_once() {
        let catalog = Catalog::builtin();
        let mut state = state_in(
            RoomRole::Upgrade,
            RoomFeature::Upgrade {
                choices: vec![Offer::free(OfferKind::DamageUp), Offer::free(OfferKind::SpeedUp)],
                taken: false,
            },
        );
        assert!(commit_choice(&mut state, &catalog, 0));
        assert!(!commit_choice(&mut state, &catalog, 1));
        assert!((state.player.stats.damage_mult - 1.2).abs() < 1e-5);
        assert!((state.player.stats.speed_mult - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shrine_costs_health() {
        let catalog = Catalog::builtin();
        let mut state = state_in(
            RoomRole::Shrine,
            RoomFeature::Shrine {
                offer: Offer::free(OfferKind::Modifier("piercing".into())),
                health_cost: SHRINE_HEALTH_COST,
                used: false,
            },
        );
        let health = state.player.body.health;
        assert!(can_use_shrine(&state));
        assert!(commit_choice(&mut state, &catalog, 0));
        assert_eq!(state.player.body.health, health - SHRINE_HEALTH_COST);
        assert_eq!(state.player.modifiers.len(), 1);
        assert!(!can_use_shrine(&state));
    }

    #[test]
    fn test_boss_reward_opens_portal() {
        let catalog = Catalog::builtin();
        let mut rng = Pcg32::seed_from_u64(2);
        let feature =
            generate_feature(RoomRole::Boss, &catalog, "pistol", &mut rng).expect("reward");
        let mut state = state_in(RoomRole::Boss, feature);
        assert!(reward_pending(&state));
        assert!(commit_choice(&mut state, &catalog, 0));
        assert!(!reward_pending(&state));
        assert!(state.events.contains(&GameEvent::PortalOpened));
    }

    #[test]
    fn test_generated_features_are_non_empty() {
        let catalog = Catalog::builtin();
        let mut rng = Pcg32::seed_from_u64(8);
        for role in [RoomRole::Shop, RoomRole::Upgrade, RoomRole::Shrine, RoomRole::Boss] {
            let feature = generate_feature(role, &catalog, "pistol", &mut rng).expect("feature");
            assert!(!feature.offers().is_empty());
        }
        assert!(generate_feature(RoomRole::Normal, &catalog, "pistol", &mut rng).is_none());
    }
}
