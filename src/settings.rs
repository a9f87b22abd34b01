//! Gameplay tuning
//!
//! Persisted as JSON next to the binary. Scoring formulas are not tunable and
//! live in `consts`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::ms_to_ticks;

/// Difficulty preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "norm" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Worm travel speed multiplier
    pub fn speed_scale(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.3,
        }
    }

    /// Maximum worms alive at once
    pub fn max_concurrent(&self) -> usize {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Cooldown between spawns (ms)
    pub fn spawn_cooldown_ms(&self) -> u32 {
        match self {
            Difficulty::Easy => 9000,
            Difficulty::Normal => 6000,
            Difficulty::Hard => 4000,
        }
    }
}

/// Play area in world units. x grows to the right, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayArea {
    pub width: f32,
    pub height: f32,
    /// Head x below this counts as an escape
    pub left_boundary: f32,
    /// Distance past the right edge where worms are seeded
    pub spawn_margin: f32,
    /// Vertical padding above the top lane and below the bottom lane
    pub lane_padding: f32,
}

impl Default for PlayArea {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            left_boundary: -40.0,
            spawn_margin: 60.0,
            lane_padding: 60.0,
        }
    }
}

impl PlayArea {
    /// x where new worms are seeded (off-field, right side)
    pub fn spawn_x(&self) -> f32 {
        self.width + self.spawn_margin
    }
}

/// Gameplay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,

    // === Motion ===
    /// Leftward travel speed (units/s) before difficulty scaling
    pub worm_speed: f32,
    /// Horizontal gap between consecutive nodes
    pub node_spacing: f32,
    /// Per-tick exponential approach factor toward the lane target
    pub smoothing_factor: f32,

    // === Timing (ms) ===
    pub growth_interval_ms: u32,
    pub shrink_duration_ms: u32,
    pub cascade_pop_interval_ms: u32,
    pub cascade_pop_duration_ms: u32,

    // === Limits ===
    /// Upper bound on nodes per worm regardless of note count
    pub max_nodes_cap: usize,
    /// Overrides the difficulty's concurrency cap when set
    pub max_concurrent_worms: Option<usize>,
    /// Overrides the difficulty's cooldown when set
    pub spawn_cooldown_ms: Option<u32>,

    // === Geometry ===
    pub head_radius: f32,
    pub node_radius: f32,
    pub projectile_radius: f32,
    /// Curve samples per inter-node interval
    pub curve_samples: usize,
    pub play_area: PlayArea,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,

            worm_speed: 120.0,
            node_spacing: 28.0,
            smoothing_factor: 0.08,

            growth_interval_ms: 400,
            shrink_duration_ms: 400,
            cascade_pop_interval_ms: 50,
            cascade_pop_duration_ms: 100,

            max_nodes_cap: 16,
            max_concurrent_worms: None,
            spawn_cooldown_ms: None,

            head_radius: 22.0,
            node_radius: 14.0,
            projectile_radius: 4.0,
            curve_samples: 40,
            play_area: PlayArea::default(),
        }
    }
}

impl Settings {
    /// Create settings from a difficulty preset
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Effective travel speed
    pub fn effective_speed(&self) -> f32 {
        self.worm_speed * self.difficulty.speed_scale()
    }

    /// Effective concurrency cap
    pub fn effective_max_concurrent(&self) -> usize {
        self.max_concurrent_worms
            .unwrap_or_else(|| self.difficulty.max_concurrent())
    }

    pub fn growth_interval_ticks(&self) -> u32 {
        ms_to_ticks(self.growth_interval_ms)
    }

    pub fn shrink_duration_ticks(&self) -> u32 {
        ms_to_ticks(self.shrink_duration_ms)
    }

    pub fn cascade_interval_ticks(&self) -> u32 {
        ms_to_ticks(self.cascade_pop_interval_ms)
    }

    pub fn cascade_pop_ticks(&self) -> u32 {
        ms_to_ticks(self.cascade_pop_duration_ms)
    }

    pub fn spawn_cooldown_ticks(&self) -> u32 {
        ms_to_ticks(
            self.spawn_cooldown_ms
                .unwrap_or_else(|| self.difficulty.spawn_cooldown_ms()),
        )
    }

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!(
            "Loaded settings from {} ({})",
            path.as_ref().display(),
            settings.difficulty.as_str()
        );
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}
