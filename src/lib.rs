//! Beatworm - music-driven segmented worm enemies
//!
//! Core modules:
//! - `sim`: Deterministic simulation (worm chains, curve, collisions, scoring)
//! - `settings`: Data-driven gameplay tuning with difficulty presets
//! - `analysis`: Song analysis input (note feed and activity gate)
//! - `error`: Error types for chain operations and input loading

pub mod analysis;
pub mod error;
pub mod settings;
pub mod sim;

pub use analysis::SongAnalysis;
pub use error::{AnalysisError, SettingsError, WormError};
pub use settings::{Difficulty, Settings};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_HZ: u32 = 120;
    pub const SIM_DT: f32 = 1.0 / SIM_HZ as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Number of note lanes (C D E F G A B)
    pub const LANE_COUNT: usize = 7;

    /// Normal hit: base + per remaining node
    pub const NORMAL_HIT_BASE: i64 = 250;
    pub const NORMAL_HIT_PER_NODE: i64 = 20;
    /// Chain cleared by normal hits: base + per removed node
    pub const COMPLETION_BASE: i64 = 750;
    pub const COMPLETION_PER_NODE: i64 = 75;
    /// Energy cascade lump: base + per node at trigger
    pub const ENERGY_BASE: i64 = 2000;
    pub const ENERGY_PER_NODE: i64 = 100;
    /// Escape penalty per node still alive
    pub const ESCAPE_PER_NODE: i64 = 500;
}

/// Convert a duration in milliseconds to whole simulation ticks (at least 1)
#[inline]
pub fn ms_to_ticks(ms: u32) -> u32 {
    let ticks = (ms as f32 * consts::SIM_HZ as f32 / 1000.0).round() as u32;
    ticks.max(1)
}

/// Convert a tick count to seconds
#[inline]
pub fn ticks_to_secs(ticks: u64) -> f32 {
    ticks as f32 * consts::SIM_DT
}
