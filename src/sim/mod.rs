//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod autopilot;
pub mod behavior;
pub mod choice;
pub mod collision;
pub mod enemy;
pub mod events;
pub mod floor;
pub mod player;
pub mod projectile;
pub mod room;
pub mod state;
pub mod tick;
pub mod weapon;

pub use behavior::{MoveMemory, Steer, SteerInput, steer};
pub use choice::{Offer, OfferKind, RoomFeature, commit_choice};
pub use collision::{CollisionResult, Rect, reflect_velocity, wall_contact};
pub use events::{EventSink, Feedback, GameEvent, LogSink, NullSink};
pub use floor::{Coord, Direction, FloorGraph, Room, RoomRole, generate_floor};
pub use player::use_bomb;
pub use room::{advance_floor, enter_room};
pub use state::{
    Body, Enemy, GamePhase, Hazard, Hud, Pickup, PickupKind, Player, Projectile, ROOM_CENTER, Side,
    SimulationState,
};
pub use tick::{TickInput, tick};
pub use weapon::WeaponState;
