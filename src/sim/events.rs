//! Outward-facing gameplay events
//!
//! Events are fire-and-forget notifications for logging, telemetry and tests.
//! Nothing in the simulation reads them back.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::floor::Coord;

/// One-shot presentation cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Feedback {
    /// Shake intensity (0..1)
    ScreenShake(f32),
    Flash,
}

/// Events emitted during a tick (for audio, logging, telemetry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    EnemyKilled { id: u32, kind: String, pos: Vec2 },
    DamageDealt { target: u32, amount: f32 },
    DamageTaken { amount: f32, absorbed: f32, health: f32 },
    RoomEntered { coord: Coord },
    RoomCleared { coord: Coord },
    /// Boss doors opened after the last miniboss fell
    DoorsUnlocked,
    SecretRevealed { coord: Coord },
    BossPhaseChange { id: u32, from: usize, to: usize },
    BossDefeated { kind: String },
    Feedback(Feedback),
    ChoiceCommitted { index: usize },
    PortalOpened,
    FloorAdvanced { floor: u32 },
    ItemPickedUp { kind: String, value: u32 },
    BombUsed,
    PlayerDied,
}

impl GameEvent {
    /// Stable snake-case name for telemetry
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::EnemyKilled { .. } => "enemy_killed",
            GameEvent::DamageDealt { .. } => "damage_dealt",
            GameEvent::DamageTaken { .. } => "damage_taken",
            GameEvent::RoomEntered { .. } => "room_entered",
            GameEvent::RoomCleared { .. } => "room_cleared",
            GameEvent::DoorsUnlocked => "doors_unlocked",
            GameEvent::SecretRevealed { .. } => "secret_revealed",
            GameEvent::BossPhaseChange { .. } => "boss_phase_change",
            GameEvent::BossDefeated { .. } => "boss_defeated",
            GameEvent::Feedback(_) => "feedback",
            GameEvent::ChoiceCommitted { .. } => "choice_committed",
            GameEvent::PortalOpened => "portal_opened",
            GameEvent::FloorAdvanced { .. } => "floor_advanced",
            GameEvent::ItemPickedUp { .. } => "item_picked_up",
            GameEvent::BombUsed => "bomb_used",
            GameEvent::PlayerDied => "player_died",
        }
    }
}

/// Receiver for events flushed at the end of every tick
pub trait EventSink {
    fn emit(&mut self, event: GameEvent);
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}

/// Sink that traces every event through the `log` facade
#[derive(Debug, Default)]
pub struct LogSink {
    pub count: u64,
}

impl EventSink for LogSink {
    fn emit(&mut self, event: GameEvent) {
        self.count += 1;
        match &event {
            GameEvent::FloorAdvanced { floor } => log::info!("advanced to floor {}", floor),
            GameEvent::PlayerDied => log::info!("player died"),
            _ => log::debug!("{}: {:?}", event.name(), event),
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: GameEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(GameEvent::BombUsed.name(), "bomb_used");
        assert_eq!(
            GameEvent::BossPhaseChange { id: 1, from: 0, to: 1 }.name(),
            "boss_phase_change"
        );
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<GameEvent> = Vec::new();
        sink.emit(GameEvent::PortalOpened);
        sink.emit(GameEvent::PlayerDied);
        assert_eq!(sink.len(), 2);
    }
}
