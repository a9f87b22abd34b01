//! Deterministic simulation module
//!
//! All worm gameplay lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by worm and node ID)
//! - No rendering or platform dependencies

pub mod chain;
pub mod collision;
pub mod curve;
pub mod destruction;
pub mod events;
pub mod head;
pub mod note;
pub mod state;
pub mod tick;
pub mod timer;
pub mod wiggle;

pub use collision::{HitEvent, Projectile, ProjectileKind, detect_hits};
pub use curve::{CurvePoint, catmull_rom, interpolate};
pub use destruction::{completion_bonus, energy_cascade_points, escape_penalty, normal_hit_points};
pub use events::{
    AlwaysActive, ScoreDelta, ScoreLedger, ScoreReason, ScoreSink, Services, SpawnGate,
    VisualEvent, VisualKind, VisualQueue, VisualSink,
};
pub use note::{NoteEvent, NoteSequence, lane_position, lane_y_for};
pub use state::{
    CollisionRegion, DestroyCause, FieldState, Node, NodeId, SubscriptionId, Worm, WormId,
    WormPhase,
};
pub use tick::{TickInput, TickReport, tick};
pub use timer::{TimerSlot, WormTimers};
pub use wiggle::organic_offset;
