//! Run settings
//!
//! Tunables that shape a run: tick clamping, floor generation, difficulty
//! scaling and the player's starting loadout. Loaded from JSON, falling back
//! to defaults when no file is present.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Floor graph generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Grid width in rooms
    pub grid_width: i32,
    /// Grid height in rooms (the walk climbs toward row 0)
    pub grid_height: i32,
    /// Critical path length (start to boss, inclusive) on floor 0
    pub base_path_length: usize,
    /// Upper bound on the critical path length
    pub max_path_length: usize,
    /// Side rooms attached on floor 0
    pub base_side_rooms: usize,
    pub max_side_rooms: usize,
    /// Miniboss rooms per floor (before scaling)
    pub base_minibosses: usize,
    pub max_minibosses: usize,
    /// Whole-floor regeneration attempts before giving up
    pub retry_cap: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            grid_width: 9,
            grid_height: 9,
            base_path_length: 5,
            max_path_length: 10,
            base_side_rooms: 4,
            max_side_rooms: 9,
            base_minibosses: 1,
            max_minibosses: 2,
            retry_cap: 64,
        }
    }
}

/// Difficulty scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultySettings {
    /// Enemy health multiplier added per floor (floor 2 = 1 + 2 * this)
    pub health_per_floor: f32,
    /// Regular enemies per normal room on floor 0
    pub base_roster: usize,
    /// Extra roster slots per floor
    pub roster_per_floor: f32,
    pub max_roster: usize,
    /// Chance a killed regular enemy drops a pickup
    pub drop_chance: f64,
}

impl Default for DifficultySettings {
    fn default() -> Self {
        Self {
            health_per_floor: 0.25,
            base_roster: 3,
            roster_per_floor: 0.75,
            max_roster: 8,
            drop_chance: 0.3,
        }
    }
}

/// Player starting loadout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub max_health: f32,
    pub shield: f32,
    pub bombs: u32,
    pub ammo: u32,
    pub currency: u32,
    pub weapon: String,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            max_health: 6.0,
            shield: 0.0,
            bombs: 1,
            ammo: 60,
            currency: 0,
            weapon: "pistol".to_string(),
        }
    }
}

/// All run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Upper bound on a single tick's delta (seconds)
    pub max_dt: f32,
    pub generation: GenerationSettings,
    pub difficulty: DifficultySettings,
    pub player: PlayerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_dt: 0.05,
            generation: GenerationSettings::default(),
            difficulty: DifficultySettings::default(),
            player: PlayerSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(SimError::Settings)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(SimError::Settings)
    }

    /// Load settings from a file, using defaults if it is missing or invalid
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(err) => {
                    log::warn!("Ignoring {}: {}", path.display(), err);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Clamp a wall-clock delta to the simulation's stable range
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if dt.is_finite() { dt.clamp(0.0, self.max_dt) } else { 0.0 }
    }

    /// Critical path length for a floor
    pub fn path_length(&self, floor: u32) -> usize {
        (self.generation.base_path_length + floor as usize).min(self.generation.max_path_length)
    }

    pub fn side_rooms(&self, floor: u32) -> usize {
        (self.generation.base_side_rooms + floor as usize).min(self.generation.max_side_rooms)
    }

    pub fn minibosses(&self, floor: u32) -> usize {
        (self.generation.base_minibosses + floor as usize / 2).min(self.generation.max_minibosses)
    }

    /// Enemy health multiplier for a floor
    pub fn health_scale(&self, floor: u32) -> f32 {
        1.0 + floor as f32 * self.difficulty.health_per_floor
    }

    pub fn roster_size(&self, floor: u32) -> usize {
        let extra = (floor as f32 * self.difficulty.roster_per_floor).floor() as usize;
        (self.difficulty.base_roster + extra).min(self.difficulty.max_roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "max_dt": 0.1, "player": { "bombs": 3 } }"#)
            .expect("valid settings");
        assert!((settings.max_dt - 0.1).abs() < f32::EPSILON);
        assert_eq!(settings.player.bombs, 3);
        assert_eq!(settings.player.weapon, "pistol");
        assert_eq!(settings.generation.grid_width, 9);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(Settings::from_json("{ nope"), Err(SimError::Settings(_))));
    }

    #[test]
    fn test_clamp_dt() {
        let settings = Settings::default();
        assert_eq!(settings.clamp_dt(5.0), settings.max_dt);
        assert_eq!(settings.clamp_dt(-1.0), 0.0);
        assert_eq!(settings.clamp_dt(f32::NAN), 0.0);
        assert!((settings.clamp_dt(0.01) - 0.01).abs() < f32::EPSILON);
    }

    #[test]
    fn test_scaling_is_capped() {
        let settings = Settings::default();
        assert_eq!(settings.path_length(0), 5);
        assert_eq!(settings.path_length(100), settings.generation.max_path_length);
        assert_eq!(settings.roster_size(100), settings.difficulty.max_roster);
        assert!(settings.health_scale(2) > settings.health_scale(1));
    }
}
