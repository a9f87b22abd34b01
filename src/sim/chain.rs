//! Segment chain: creation, motion and growth
//!
//! A worm is seeded with a single head node off the right edge and grows one
//! tail node per growth tick, consuming one note per node.

use glam::Vec2;

use super::curve::interpolate;
use super::events::{Services, VisualKind};
use super::note::{NoteSequence, lane_position, lane_y_for};
use super::state::{Node, NodeId, Worm, WormId, WormParams, WormPhase};
use super::timer::{RepeatingTimer, TimerSlot, WormTimers};
use super::wiggle::offset_at_param;
use crate::error::WormError;
use crate::settings::Settings;

/// Lane colors, C through B (0xRRGGBB)
const LANE_COLORS: [u32; 7] = [
    0xff4d4d, 0xff9f40, 0xffe14d, 0x5cd65c, 0x4dc3ff, 0x6b6bff, 0xc26bff,
];

/// Color for a note's lane
pub fn lane_color(note: &str) -> u32 {
    let lane = lane_position(note).unwrap_or(3.0).round() as usize;
    LANE_COLORS[lane.min(LANE_COLORS.len() - 1)]
}

impl Worm {
    /// Seed a worm with one head node at `start`, easing toward the lane of
    /// the first note.
    pub fn create(
        id: WormId,
        notes: NoteSequence,
        start: Vec2,
        settings: &Settings,
        seed: u32,
    ) -> Result<Self, WormError> {
        let first = notes.get(0).ok_or(WormError::EmptyNoteSequence)?;
        let params = WormParams::from_settings(settings);
        let target_y = lane_y_for(&first.note, &params.play_area);
        let head = Node::new(NodeId(0), start.x, start.y, target_y, first.note.clone());
        let max_nodes = notes.len().min(params.max_nodes_cap);

        let mut worm = Self {
            id,
            seed,
            nodes: vec![head],
            max_nodes,
            notes,
            nodes_consumed: 1,
            phase: WormPhase::Growing,
            is_energy_destroying: false,
            nodes_removed: 0,
            region: None,
            timers: WormTimers::default(),
            age_ticks: 0,
            curve: Vec::new(),
            params,
            escape_penalty_nodes: None,
            next_node_id: 1,
            next_subscription: 1,
        };

        if worm.notes_remaining() > 0 {
            worm.timers.growth = Some(RepeatingTimer::new(worm.params.growth_ticks));
        }

        worm.reconcile_head();
        worm.regenerate_curve();
        worm.sync_anchor();

        log::info!(
            "Spawned {} at ({:.0}, {:.0}) with {} notes, max {} nodes",
            worm.id,
            start.x,
            start.y,
            worm.notes.len(),
            worm.max_nodes
        );

        Ok(worm)
    }

    /// Whether a growth tick would add a node
    pub fn can_grow(&self) -> bool {
        self.is_active()
            && !self.is_energy_destroying
            && self.nodes.len() < self.max_nodes
            && self.notes_remaining() > 0
    }

    /// Move every node left, age it and ease it toward its lane
    pub fn tick_motion(&mut self, dt: f32) {
        let step = self.params.speed * dt;
        let k = self.params.smoothing;
        for node in &mut self.nodes {
            node.x -= step;
            node.age += dt;
            node.smooth_y += (node.target_y - node.smooth_y) * k;
        }
    }

    /// Append one tail node for the next unconsumed note.
    ///
    /// Returns `Ok(false)` when the chain is full or out of notes.
    pub fn grow_tick(&mut self, services: &mut Services) -> Result<bool, WormError> {
        if self.is_destroyed() {
            return Err(WormError::AlreadyDestroyed);
        }
        if !self.can_grow() {
            return Ok(false);
        }
        let tail = self.tail().ok_or(WormError::MissingTail)?;
        let x = tail.x + self.params.spacing;
        // Continue from where the tail currently is
        let y = tail.smooth_y;

        let Some(note) = self.notes.get(self.nodes_consumed).map(|n| n.note.clone()) else {
            return Ok(false);
        };
        let target_y = lane_y_for(&note, &self.params.play_area);
        let color = lane_color(&note);

        let id = self.next_node_id();
        self.nodes.push(Node::new(id, x, y, target_y, note));
        self.nodes_consumed += 1;

        services.visual(
            VisualKind::Spawn,
            Vec2::new(x, y),
            self.params.node_radius,
            color,
        );
        log::debug!(
            "{} grew {} ({}/{} nodes)",
            self.id,
            id,
            self.nodes.len(),
            self.max_nodes
        );
        Ok(true)
    }

    /// Advance one fixed tick.
    ///
    /// Order: motion, escape check, growth, destruction animations, head
    /// reconciliation, curve regeneration, anchor sync. Collision detection
    /// and hit application happen afterwards at the field level.
    pub fn update(&mut self, dt: f32, services: &mut Services) {
        if self.is_destroyed() {
            return;
        }
        self.age_ticks += 1;

        self.tick_motion(dt);

        if self.check_escape() {
            return;
        }

        let fired = self
            .timers
            .growth
            .as_mut()
            .map(|t| t.advance())
            .unwrap_or(false);
        if fired {
            match self.grow_tick(services) {
                Ok(_) => {}
                Err(e) => {
                    log::warn!("{} growth failed: {}", self.id, e);
                    self.timers.cancel(TimerSlot::Growth);
                }
            }
            if self.notes_remaining() == 0 && self.timers.growth.is_some() {
                log::debug!("{} consumed all notes, growth halted", self.id);
                self.timers.cancel(TimerSlot::Growth);
            }
        }

        self.advance_destruction(services);
        if self.is_destroyed() {
            return;
        }

        self.reconcile_head();
        self.regenerate_curve();
        self.sync_anchor();
    }

    /// Rebuild the body curve from the current node positions
    pub fn regenerate_curve(&mut self) {
        self.curve = interpolate(&self.nodes, self.params.curve_samples);
    }

    /// Move the collision region onto the front of the current curve
    pub fn sync_anchor(&mut self) {
        let Some(front) = self.curve.first().map(|p| p.pos) else {
            return;
        };
        if let Some(region) = self.region.as_mut() {
            region.center = front;
        }
    }

    /// Front of the current curve (the collision anchor)
    pub fn anchor(&self) -> Option<Vec2> {
        self.curve.first().map(|p| p.pos)
    }

    /// Curve points with cosmetic sway applied, for drawing only.
    ///
    /// The sway fades in over the first interval behind the tip, so the drawn
    /// front stays exactly on the collision anchor.
    pub fn presentation_points(&self, time: f32) -> Vec<Vec2> {
        let Some(front) = self.curve.first().map(|p| p.param) else {
            return Vec::new();
        };
        self.curve
            .iter()
            .map(|p| {
                let weight = (p.param - front).clamp(0.0, 1.0);
                p.pos + offset_at_param(time, p.param, self.seed) * weight
            })
            .collect()
    }
}
