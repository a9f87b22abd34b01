//! Outbound events and the service bundle
//!
//! Worms never touch global state. Score deltas and visual requests go out
//! through the sinks in `Services`; both are append-only.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Why a score delta was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreReason {
    NormalHit,
    EnergyCascade,
    CompletionBonus,
    EscapePenalty,
}

impl ScoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreReason::NormalHit => "normal-hit",
            ScoreReason::EnergyCascade => "energy-cascade",
            ScoreReason::CompletionBonus => "completion-bonus",
            ScoreReason::EscapePenalty => "escape-penalty",
        }
    }
}

/// A signed score change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub amount: i64,
    pub reason: ScoreReason,
}

/// Receives score deltas
pub trait ScoreSink {
    fn push(&mut self, delta: ScoreDelta);
}

/// Running score plus the full delta history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreLedger {
    pub total: i64,
    pub history: Vec<ScoreDelta>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all deltas with the given reason
    pub fn total_for(&self, reason: ScoreReason) -> i64 {
        self.history
            .iter()
            .filter(|d| d.reason == reason)
            .map(|d| d.amount)
            .sum()
    }

    /// Number of deltas with the given reason
    pub fn count(&self, reason: ScoreReason) -> usize {
        self.history.iter().filter(|d| d.reason == reason).count()
    }
}

impl ScoreSink for ScoreLedger {
    fn push(&mut self, delta: ScoreDelta) {
        self.total += delta.amount;
        self.history.push(delta);
    }
}

/// Kind of visual effect requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualKind {
    Spawn,
    Hit,
    CascadePop,
    Completion,
}

/// Fire-and-forget effect request for the particle system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualEvent {
    pub kind: VisualKind,
    pub position: Vec2,
    pub size: f32,
    /// 0xRRGGBB
    pub color: u32,
}

/// Receives visual effect requests
pub trait VisualSink {
    fn emit(&mut self, event: VisualEvent);
}

/// Maximum queued visual events before the oldest are dropped
pub const MAX_VISUAL_EVENTS: usize = 256;

/// Bounded queue of visual requests, drained by the presentation layer
#[derive(Debug, Clone, Default)]
pub struct VisualQueue {
    pub events: Vec<VisualEvent>,
}

impl VisualQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all queued events
    pub fn drain(&mut self) -> Vec<VisualEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn count(&self, kind: VisualKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

impl VisualSink for VisualQueue {
    fn emit(&mut self, event: VisualEvent) {
        if self.events.len() >= MAX_VISUAL_EVENTS {
            self.events.remove(0);
        }
        self.events.push(event);
    }
}

/// Musical-activity predicate evaluated at a song time (seconds)
pub trait SpawnGate {
    fn is_active(&self, song_time: f32) -> bool;
}

impl<F: Fn(f32) -> bool> SpawnGate for F {
    fn is_active(&self, song_time: f32) -> bool {
        self(song_time)
    }
}

/// Gate that is always open
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysActive;

impl SpawnGate for AlwaysActive {
    fn is_active(&self, _song_time: f32) -> bool {
        true
    }
}

/// Explicit service bundle handed to worm operations
pub struct Services<'a> {
    pub score: &'a mut dyn ScoreSink,
    pub visuals: &'a mut dyn VisualSink,
    pub gate: &'a dyn SpawnGate,
}

impl<'a> Services<'a> {
    pub fn new(
        score: &'a mut dyn ScoreSink,
        visuals: &'a mut dyn VisualSink,
        gate: &'a dyn SpawnGate,
    ) -> Self {
        Self {
            score,
            visuals,
            gate,
        }
    }

    pub fn award(&mut self, amount: i64, reason: ScoreReason) {
        log::debug!("Score {:+} ({})", amount, reason.as_str());
        self.score.push(ScoreDelta { amount, reason });
    }

    pub fn visual(&mut self, kind: VisualKind, position: Vec2, size: f32, color: u32) {
        self.visuals.emit(VisualEvent {
            kind,
            position,
            size,
            color,
        });
    }
}
