//! Worm and field state
//!
//! Nodes live in a per-worm arena (`Vec<Node>`) and are addressed by stable
//! `NodeId`s. Timers and collision regions hold ids, never references, and
//! re-validate before acting.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::curve::CurvePoint;
use super::note::NoteSequence;
use super::timer::WormTimers;
use crate::error::WormError;
use crate::settings::{PlayArea, Settings};
use crate::ticks_to_secs;

/// Stable node identity within one worm
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Stable worm identity within a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WormId(pub u32);

impl std::fmt::Display for WormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worm#{}", self.0)
    }
}

/// Identity of one collision-region subscription. A new one is issued every
/// time a region is created, so hits aimed at an older region are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u32);

/// One segment of a worm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub x: f32,
    /// Eased vertical position (what is drawn and collided)
    pub smooth_y: f32,
    /// Lane the node is easing toward
    pub target_y: f32,
    /// Note that placed this node
    pub lane_note: String,
    /// Seconds since the node was created
    pub age: f32,
    pub is_head: bool,
    pub is_shrinking: bool,
    /// 1.0 = full size, 0.0 = gone
    pub shrink_scale: f32,
    pub has_collision_region: bool,
}

impl Node {
    pub fn new(id: NodeId, x: f32, y: f32, target_y: f32, lane_note: impl Into<String>) -> Self {
        Self {
            id,
            x,
            smooth_y: y,
            target_y,
            lane_note: lane_note.into(),
            age: 0.0,
            is_head: false,
            is_shrinking: false,
            shrink_scale: 1.0,
            has_collision_region: false,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.smooth_y)
    }
}

/// The single collidable region of a worm, always owned by the head
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionRegion {
    pub owner: NodeId,
    pub subscription: SubscriptionId,
    /// Synced to the front of the current curve every tick
    pub center: Vec2,
    pub radius: f32,
}

/// How a worm ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestroyCause {
    /// Every node shot off by normal hits
    Cleared,
    /// Energy cascade finished
    Cascade,
    /// Head left the play area
    Escaped,
    /// Removed by the owner
    Forced,
}

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WormPhase {
    Growing,
    /// Head is animating out after a normal hit
    ShrinkingNormal,
    EnergyCascading,
    Destroyed(DestroyCause),
}

impl WormPhase {
    pub fn is_destroyed(&self) -> bool {
        matches!(self, WormPhase::Destroyed(_))
    }
}

/// Per-worm copy of the tuning it needs, in ticks where applicable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WormParams {
    pub speed: f32,
    pub spacing: f32,
    pub smoothing: f32,
    pub growth_ticks: u32,
    pub shrink_ticks: u32,
    pub cascade_interval_ticks: u32,
    pub cascade_pop_ticks: u32,
    pub max_nodes_cap: usize,
    pub head_radius: f32,
    pub node_radius: f32,
    pub curve_samples: usize,
    pub play_area: PlayArea,
}

impl WormParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            speed: settings.effective_speed(),
            spacing: settings.node_spacing,
            smoothing: settings.smoothing_factor.clamp(0.0, 1.0),
            growth_ticks: settings.growth_interval_ticks(),
            shrink_ticks: settings.shrink_duration_ticks(),
            cascade_interval_ticks: settings.cascade_interval_ticks(),
            cascade_pop_ticks: settings.cascade_pop_ticks(),
            max_nodes_cap: settings.max_nodes_cap.max(1),
            head_radius: settings.head_radius,
            node_radius: settings.node_radius,
            curve_samples: settings.curve_samples.max(1),
            play_area: settings.play_area,
        }
    }
}

/// A segmented worm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worm {
    pub id: WormId,
    /// Seed for cosmetic motion
    pub seed: u32,
    /// Sorted ascending by x after every reconcile; index 0 is the head
    pub nodes: Vec<Node>,
    pub max_nodes: usize,
    pub notes: NoteSequence,
    pub nodes_consumed: usize,
    pub phase: WormPhase,
    /// Set once on the first energy hit, never cleared
    pub is_energy_destroying: bool,
    pub nodes_removed: u32,
    pub region: Option<CollisionRegion>,
    pub timers: WormTimers,
    /// Simulation ticks this worm has lived
    pub age_ticks: u64,
    /// Curve regenerated every tick (not persisted)
    #[serde(skip)]
    pub curve: Vec<CurvePoint>,
    pub params: WormParams,
    /// Nodes alive at the moment of escape, until the owner collects it
    pub(crate) escape_penalty_nodes: Option<usize>,
    pub(crate) next_node_id: u32,
    pub(crate) next_subscription: u32,
}

impl Worm {
    /// Allocate a new node ID
    pub(crate) fn next_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// Allocate a new subscription ID
    pub(crate) fn next_subscription(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        id
    }

    pub fn is_active(&self) -> bool {
        !self.phase.is_destroyed()
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase.is_destroyed()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn head(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn tail(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub(crate) fn node_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Notes not yet turned into nodes
    pub fn notes_remaining(&self) -> usize {
        self.notes.len().saturating_sub(self.nodes_consumed)
    }

    /// Cause of destruction, if destroyed
    pub fn destroy_cause(&self) -> Option<DestroyCause> {
        match self.phase {
            WormPhase::Destroyed(cause) => Some(cause),
            _ => None,
        }
    }

    /// Collect the escape penalty node count. Returns Some exactly once.
    pub fn take_escape_penalty(&mut self) -> Option<usize> {
        self.escape_penalty_nodes.take()
    }

    /// Verify the structural invariants of the chain
    pub fn check_invariants(&self) -> Result<(), WormError> {
        if self.nodes.len() > self.max_nodes {
            return Err(WormError::InvariantViolated(format!(
                "{} nodes exceeds max {}",
                self.nodes.len(),
                self.max_nodes
            )));
        }
        let heads = self.nodes.iter().filter(|n| n.is_head).count();
        if heads > 1 {
            return Err(WormError::InvariantViolated(format!("{heads} heads")));
        }
        if let Some(head) = self.nodes.iter().find(|n| n.is_head) {
            let min_x = self.nodes.iter().map(|n| n.x).fold(f32::INFINITY, f32::min);
            if head.x > min_x {
                return Err(WormError::InvariantViolated(format!(
                    "head {} is not the leftmost node",
                    head.id
                )));
            }
        } else if !self.nodes.is_empty() {
            return Err(WormError::InvariantViolated("no head".into()));
        }
        if let Some(node) = self
            .nodes
            .iter()
            .find(|n| n.has_collision_region && !n.is_head)
        {
            return Err(WormError::InvariantViolated(format!(
                "non-head {} holds a collision region",
                node.id
            )));
        }
        if let Some(region) = &self.region {
            match self.head() {
                Some(head) if head.id == region.owner && head.has_collision_region => {}
                _ => {
                    return Err(WormError::InvariantViolated(format!(
                        "region owned by {} which is not the head",
                        region.owner
                    )));
                }
            }
        }
        if let Some(node) = self
            .nodes
            .iter()
            .find(|n| !(0.0..=1.0).contains(&n.shrink_scale) || (!n.is_shrinking && n.shrink_scale < 1.0))
        {
            return Err(WormError::InvariantViolated(format!(
                "{} has shrink scale {}",
                node.id, node.shrink_scale
            )));
        }
        Ok(())
    }
}

/// All live worms plus the note feed and spawn bookkeeping
#[derive(Debug, Clone)]
pub struct FieldState {
    pub seed: u64,
    pub settings: Settings,
    /// Live worms, sorted by id
    pub worms: Vec<Worm>,
    /// Notes not yet handed to a worm
    pub notes: NoteSequence,
    pub time_ticks: u64,
    /// Ticks until the next spawn is allowed
    pub spawn_cooldown: u32,
    pub(crate) rng: Pcg32,
    next_id: u32,
}

impl FieldState {
    pub fn new(seed: u64, settings: Settings, notes: NoteSequence) -> Self {
        Self {
            seed,
            settings,
            worms: Vec::new(),
            notes,
            time_ticks: 0,
            spawn_cooldown: 0,
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Allocate a new worm ID
    pub fn next_worm_id(&mut self) -> WormId {
        let id = WormId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Song time in seconds
    pub fn song_time(&self) -> f32 {
        ticks_to_secs(self.time_ticks)
    }

    pub fn active_count(&self) -> usize {
        self.worms.iter().filter(|w| w.is_active()).count()
    }

    pub fn total_nodes(&self) -> usize {
        self.worms.iter().map(|w| w.node_count()).sum()
    }

    pub fn worm(&self, id: WormId) -> Option<&Worm> {
        self.worms.iter().find(|w| w.id == id)
    }

    pub fn worm_mut(&mut self, id: WormId) -> Option<&mut Worm> {
        self.worms.iter_mut().find(|w| w.id == id)
    }

    /// Add a worm, keeping id order
    pub fn insert_worm(&mut self, worm: Worm) {
        self.worms.push(worm);
        self.worms.sort_by_key(|w| w.id);
    }
}
