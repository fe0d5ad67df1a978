use crate::game::vector::Vector2D;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GameMode {
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "poison")]
    Poison,
    #[serde(rename = "venom")]
    Venom,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WallConfig {
    #[serde(rename = "ID")]
    pub id: u32,
    pub p1: Vector2D,
    pub p2: Vector2D,
}

/// Tunable arena parameters, immutable after load. Every key falls back to
/// its default when missing; a structurally broken document falls back to
/// the full default set with no walls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "MSPerFrame")]
    pub ms_per_frame: u64,
    #[serde(rename = "RespawnRate")]
    pub respawn_rate: u32,
    #[serde(rename = "UniverseSize")]
    pub universe_size: u32,
    #[serde(rename = "SnakeSpeed")]
    pub snake_speed: u32,
    #[serde(rename = "PowerupDelay")]
    pub powerup_delay: u32,
    #[serde(rename = "MaxPowerups")]
    pub max_powerups: u32,
    #[serde(rename = "SnakeGrowthFrames")]
    pub snake_growth_frames: u32,
    #[serde(rename = "SnakeStartingSize")]
    pub snake_starting_size: u32,
    #[serde(rename = "GameMode")]
    pub game_mode: GameMode,
    #[serde(rename = "VenomCounter")]
    pub venom_counter: u32,
    #[serde(rename = "Walls")]
    pub walls: Vec<WallConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ms_per_frame: 17,
            respawn_rate: 300,
            universe_size: 2000,
            snake_speed: 6,
            powerup_delay: 200,
            max_powerups: 20,
            snake_growth_frames: 24,
            snake_starting_size: 120,
            game_mode: GameMode::Default,
            venom_counter: 10,
            walls: Vec::new(),
        }
    }
}

impl Settings {
    /// Reads a settings document from disk. An unreadable file is a startup
    /// error; a malformed document degrades to defaults with no walls.
    pub fn load(path: &Path) -> anyhow::Result<Settings> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        match serde_json::from_str::<Settings>(&text) {
            Ok(settings) => Ok(settings),
            Err(error) => {
                tracing::warn!(%error, path = %path.display(), "malformed settings document, using defaults");
                Ok(Settings::default())
            }
        }
    }

    /// Venom time granted per powerup, converted from configured seconds to
    /// ticks.
    pub fn venom_ticks(&self) -> u32 {
        (self.venom_counter as u64 * 1000 / self.ms_per_frame.max(1)) as u32
    }
}
