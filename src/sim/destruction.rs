//! Destruction state machine
//!
//! Growing -> {ShrinkingNormal, EnergyCascading, escape} -> Destroyed.
//!
//! Normal hits shrink the head out over the shrink duration and pay when it
//! is gone. An energy hit pays a lump sum up front and pops every node in
//! quick succession. Escaping pays nothing; the owner applies the penalty.
//! Every terminal path cancels all timers and the collision region before the
//! node data is released.

use super::collision::{HitEvent, ProjectileKind};
use super::events::{ScoreReason, Services, VisualKind};
use super::state::{DestroyCause, NodeId, Worm, WormPhase};
use super::timer::{RepeatingTimer, ShrinkTimer, TimerSlot};
use crate::consts::*;
use crate::error::WormError;

/// Score for a normal hit landing on a chain of `node_count` nodes
pub fn normal_hit_points(node_count: usize) -> i64 {
    NORMAL_HIT_BASE + NORMAL_HIT_PER_NODE * node_count as i64
}

/// Bonus for clearing a chain with normal hits
pub fn completion_bonus(nodes_removed: u32) -> i64 {
    COMPLETION_BASE + COMPLETION_PER_NODE * nodes_removed as i64
}

/// Lump score for an energy cascade on a chain of `node_count` nodes
pub fn energy_cascade_points(node_count: usize) -> i64 {
    ENERGY_BASE + ENERGY_PER_NODE * node_count as i64
}

/// Penalty for letting a chain escape with `node_count` nodes alive
pub fn escape_penalty(node_count: usize) -> i64 {
    -(ESCAPE_PER_NODE * node_count as i64)
}

impl Worm {
    /// Apply a hit reported by the collision gate.
    ///
    /// The hit is re-validated against the live region: a hit aimed at a
    /// region that has since been torn down or replaced is ignored.
    pub fn apply_hit(&mut self, hit: &HitEvent, services: &mut Services) -> Result<bool, WormError> {
        if self.is_destroyed() {
            return Err(WormError::AlreadyDestroyed);
        }
        let live = matches!(
            self.region,
            Some(region) if region.owner == hit.node && region.subscription == hit.subscription
        );
        if !live {
            log::debug!("{} ignored stale hit on {}", self.id, hit.node);
            return Ok(false);
        }
        match hit.kind {
            ProjectileKind::Normal => self.apply_normal_hit(services),
            ProjectileKind::Energy => self.trigger_energy_cascade(services),
        }
    }

    /// Start shrinking the head. Points are fixed now and paid on removal.
    pub fn apply_normal_hit(&mut self, services: &mut Services) -> Result<bool, WormError> {
        if self.is_destroyed() {
            return Err(WormError::AlreadyDestroyed);
        }
        if self.is_energy_destroying || self.phase == WormPhase::ShrinkingNormal {
            return Ok(false);
        }
        let Some(head) = self.nodes.first() else {
            return Ok(false);
        };
        if head.is_shrinking {
            return Ok(false);
        }
        let head_id = head.id;
        let color = super::chain::lane_color(&head.lane_note);

        // Tear down first so nothing else can hit this node
        self.teardown_region();

        let points = normal_hit_points(self.nodes.len());
        let hit_pos = self.anchor().unwrap_or_else(|| self.nodes[0].position());
        if let Some(head) = self.nodes.first_mut() {
            head.is_shrinking = true;
        }
        self.timers
            .shrink
            .push(ShrinkTimer::new(head_id, self.params.shrink_ticks).with_reward(points));
        self.phase = WormPhase::ShrinkingNormal;

        services.visual(VisualKind::Hit, hit_pos, self.params.head_radius, color);
        log::debug!("{} normal hit on {} (+{} on removal)", self.id, head_id, points);
        Ok(true)
    }

    /// Start an energy cascade. A second trigger on the same chain is a no-op.
    pub fn trigger_energy_cascade(&mut self, services: &mut Services) -> Result<bool, WormError> {
        if self.is_destroyed() {
            return Err(WormError::AlreadyDestroyed);
        }
        if self.is_energy_destroying {
            log::debug!("{} already cascading, energy hit ignored", self.id);
            return Ok(false);
        }
        self.is_energy_destroying = true;
        self.teardown_region();
        self.timers.cancel(TimerSlot::Growth);

        let points = energy_cascade_points(self.nodes.len());
        services.award(points, ScoreReason::EnergyCascade);

        self.phase = WormPhase::EnergyCascading;
        self.timers.cascade = Some(RepeatingTimer::new(self.params.cascade_interval_ticks));
        log::info!(
            "{} energy cascade: {} nodes, +{}",
            self.id,
            self.nodes.len(),
            points
        );

        // First pop is immediate
        if !self.pop_next(services) {
            self.timers.cancel(TimerSlot::Cascade);
        }
        Ok(true)
    }

    /// Mark the frontmost node that is not already shrinking for a fast pop
    fn pop_next(&mut self, services: &mut Services) -> bool {
        let duration = self.params.cascade_pop_ticks;
        let size = self.params.node_radius;
        let Some(node) = self.nodes.iter_mut().find(|n| !n.is_shrinking) else {
            return false;
        };
        node.is_shrinking = true;
        let id = node.id;
        let pos = node.position();
        let color = super::chain::lane_color(&node.lane_note);
        self.timers.shrink.push(ShrinkTimer::new(id, duration));
        services.visual(VisualKind::CascadePop, pos, size, color);
        log::debug!("{} cascade pop {}", self.id, id);
        true
    }

    /// Advance cascade cadence and shrink animations; remove finished nodes
    pub fn advance_destruction(&mut self, services: &mut Services) {
        if self.is_destroyed() {
            return;
        }

        let pop_due = self
            .timers
            .cascade
            .as_mut()
            .map(|t| t.advance())
            .unwrap_or(false);
        if pop_due && !self.pop_next(services) {
            self.timers.cancel(TimerSlot::Cascade);
        }

        let mut finished: Vec<(NodeId, i64)> = Vec::new();
        let mut timers = std::mem::take(&mut self.timers.shrink);
        timers.retain_mut(|timer| {
            // Re-validate: the node may already be gone
            let Some(node) = self.nodes.iter_mut().find(|n| n.id == timer.node) else {
                log::debug!("{} dropped shrink timer for missing {}", self.id, timer.node);
                return false;
            };
            let scale = timer.advance();
            node.shrink_scale = node.shrink_scale.min(scale);
            if timer.finished() {
                finished.push((timer.node, timer.reward));
                false
            } else {
                true
            }
        });
        self.timers.shrink = timers;

        for (id, reward) in finished {
            if let Err(e) = self.remove_node(id) {
                log::warn!("{}: {}", self.id, e);
                continue;
            }
            if reward > 0 {
                services.award(reward, ScoreReason::NormalHit);
            }
        }

        if self.phase == WormPhase::ShrinkingNormal && self.timers.shrink.is_empty() {
            self.phase = WormPhase::Growing;
        }

        if self.nodes.is_empty() {
            self.finish(services);
        }
    }

    /// Remove a node that has shrunk to zero and promote the next head
    fn remove_node(&mut self, id: NodeId) -> Result<(), WormError> {
        let index = self.node_index(id).ok_or(WormError::UnknownNode(id))?;
        if self.region.map(|r| r.owner) == Some(id) {
            self.teardown_region();
        }
        self.nodes.remove(index);
        self.nodes_removed += 1;
        self.reconcile_head();
        log::debug!("{} removed {} ({} left)", self.id, id, self.nodes.len());
        Ok(())
    }

    /// Chain emptied by hits or a cascade
    fn finish(&mut self, services: &mut Services) {
        let pos = self.anchor().unwrap_or_default();
        let size = self.params.head_radius * 2.0;
        if self.is_energy_destroying {
            services.visual(VisualKind::Completion, pos, size, 0xffffff);
            self.destroy(DestroyCause::Cascade);
        } else {
            let bonus = completion_bonus(self.nodes_removed);
            services.award(bonus, ScoreReason::CompletionBonus);
            services.visual(VisualKind::Completion, pos, size, 0xffd700);
            self.destroy(DestroyCause::Cleared);
        }
    }

    /// Head crossed the left boundary: destroy with no reward and leave the
    /// penalty node count for the owner to collect.
    pub fn check_escape(&mut self) -> bool {
        if self.is_destroyed() {
            return false;
        }
        let Some(head) = self.nodes.first() else {
            return false;
        };
        if head.x >= self.params.play_area.left_boundary {
            return false;
        }
        let remaining = self.nodes.len();
        self.escape_penalty_nodes = Some(remaining);
        log::info!("{} escaped with {} nodes", self.id, remaining);
        self.destroy(DestroyCause::Escaped);
        true
    }

    /// Destroy immediately with no score
    pub fn force_destroy(&mut self) {
        if self.is_destroyed() {
            return;
        }
        self.destroy(DestroyCause::Forced);
    }

    /// Terminal teardown: timers first, then the region, then node data
    fn destroy(&mut self, cause: DestroyCause) {
        self.timers.cancel_all();
        self.teardown_region();
        self.nodes.clear();
        self.curve.clear();
        self.phase = WormPhase::Destroyed(cause);
        log::info!(
            "{} destroyed ({:?}), {} nodes removed",
            self.id,
            cause,
            self.nodes_removed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::chain::tests::{grown_worm, new_worm, run};
    use crate::sim::events::{AlwaysActive, ScoreLedger, VisualQueue};
    use proptest::prelude::*;

    fn hit_head(worm: &mut Worm, kind: ProjectileKind, ledger: &mut ScoreLedger, vfx: &mut VisualQueue) -> bool {
        let region = worm.region.expect("head has a region");
        let hit = HitEvent {
            worm: worm.id,
            node: region.owner,
            subscription: region.subscription,
            kind,
            projectile: 0,
            point: region.center,
        };
        let gate = AlwaysActive;
        let mut services = Services::new(ledger, vfx, &gate);
        worm.apply_hit(&hit, &mut services).unwrap()
    }

    /// A worm that has finished growing, so counts stay fixed
    fn full_worm(n: usize) -> Worm {
        let worm = grown_worm(n);
        assert!(worm.timers.growth.is_none());
        worm
    }

    #[test]
    fn test_normal_hit_scenario() {
        let mut worm = full_worm(3);
        let second = worm.nodes[1].id;
        let mut ledger = ScoreLedger::new();
        let mut vfx = VisualQueue::new();

        assert!(hit_head(&mut worm, ProjectileKind::Normal, &mut ledger, &mut vfx));
        assert!(worm.region.is_none(), "region torn down immediately");
        assert_eq!(worm.phase, WormPhase::ShrinkingNormal);
        assert_eq!(ledger.total, 0, "paid on removal, not on impact");

        let ticks = worm.params.shrink_ticks - 1;
        run(&mut worm, ticks, &mut ledger, &mut vfx);
        assert_eq!(worm.node_count(), 3);
        run(&mut worm, 1, &mut ledger, &mut vfx);

        assert_eq!(worm.node_count(), 2);
        assert_eq!(ledger.total, 310);
        assert_eq!(worm.nodes[0].id, second);
        assert!(worm.nodes[0].is_head);
        assert_eq!(worm.region.unwrap().owner, second);
        assert_eq!(worm.phase, WormPhase::Growing);
        assert_eq!(worm.nodes_removed, 1);
    }

    #[test]
    fn test_shrink_scale_monotonic_until_removal() {
        let mut worm = full_worm(2);
        let head = worm.nodes[0].id;
        let mut ledger = ScoreLedger::new();
        let mut vfx = VisualQueue::new();
        hit_head(&mut worm, ProjectileKind::Normal, &mut ledger, &mut vfx);

        let mut last: f32 = 1.0;
        for _ in 0..worm.params.shrink_ticks - 1 {
            run(&mut worm, 1, &mut ledger, &mut vfx);
            let node = worm.node(head).expect("still present before reaching zero");
            assert!(node.is_shrinking);
            assert!(node.shrink_scale <= last);
            assert!(node.shrink_scale > 0.0);
            last = node.shrink_scale;
        }
        run(&mut worm, 1, &mut ledger, &mut vfx);
        assert!(worm.node(head).is_none());
    }

    #[test]
    fn test_sequential_normal_hits_score_and_completion() {
        let n = 4;
        let mut worm = full_worm(n);
        let mut ledger = ScoreLedger::new();
        let mut vfx = VisualQueue::new();
        let shrink = worm.params.shrink_ticks;

        for k in 1..=n {
            assert!(hit_head(&mut worm, ProjectileKind::Normal, &mut ledger, &mut vfx));
            let before = ledger.total_for(ScoreReason::NormalHit);
            run(&mut worm, shrink, &mut ledger, &mut vfx);
            let paid = ledger.total_for(ScoreReason::NormalHit) - before;
            assert_eq!(paid, 250 + 20 * (n - k + 1) as i64);
            if k < n {
                run(&mut worm, 1, &mut ledger, &mut vfx);
            }
        }

        assert_eq!(worm.phase, WormPhase::Destroyed(DestroyCause::Cleared));
        assert_eq!(ledger.total_for(ScoreReason::CompletionBonus), 750 + 75 * n as i64);
        assert_eq!(ledger.count(ScoreReason::CompletionBonus), 1);
        assert!(!worm.timers.any_armed());
        assert_eq!(vfx.count(VisualKind::Completion), 1);
    }

    #[test]
    fn test_second_hit_during_shrink_is_ignored() {
        let mut worm = full_worm(3);
        let region = worm.region.unwrap();
        let mut ledger = ScoreLedger::new();
        let mut vfx = VisualQueue::new();
        let gate = AlwaysActive;
        let mut services = Services::new(&mut ledger, &mut vfx, &gate);
        let hit = HitEvent {
            worm: worm.id,
            node: region.owner,
            subscription: region.subscription,
            kind: ProjectileKind::Normal,
            projectile: 0,
            point: region.center,
        };
        assert_eq!(worm.apply_hit(&hit, &mut services), Ok(true));
        assert_eq!(worm.apply_hit(&hit, &mut services), Ok(false));
        assert_eq!(worm.apply_normal_hit(&mut services), Ok(false));
        assert_eq!(worm.timers.shrink.len(), 1);
    }

    #[test]
    fn test_energy_cascade_scenario() {
        let mut worm = full_worm(6);
        let mut ledger = ScoreLedger::new();
        let mut vfx = VisualQueue::new();

        assert!(hit_head(&mut worm, ProjectileKind::Energy, &mut ledger, &mut vfx));
        assert_eq!(ledger.total, 2600);
        assert_eq!(worm.phase, WormPhase::EnergyCascading);
        assert!(worm.region.is_none());
        assert_eq!(vfx.count(VisualKind::CascadePop), 1);

        let interval = worm.params.cascade_interval_ticks;
        for pop in 2..=6 {
            run(&mut worm, interval, &mut ledger, &mut vfx);
            assert_eq!(vfx.count(VisualKind::CascadePop), pop);
        }

        // Last pop still animating
        assert!(worm.is_active());
        let ticks = worm.params.cascade_pop_ticks;
        run(&mut worm, ticks, &mut ledger, &mut vfx);

        assert_eq!(worm.phase, WormPhase::Destroyed(DestroyCause::Cascade));
        assert_eq!(worm.nodes_removed, 6);
        assert_eq!(ledger.total, 2600, "no per-pop score and no completion bonus");
        assert_eq!(ledger.count(ScoreReason::CompletionBonus), 0);
        assert!(!worm.timers.any_armed());
    }

    #[test]
    fn test_cascade_curve_has_no_gaps() {
        let settings = crate::settings::Settings::default();
        let notes = crate::sim::note::NoteSequence::from_names(&["E4"; 6], 0.1);
        let area = settings.play_area;
        let start = glam::Vec2::new(area.spawn_x(), crate::sim::note::lane_y_for("E4", &area));
        let mut worm = Worm::create(crate::sim::state::WormId(3), notes, start, &settings, 11).unwrap();
        let mut ledger = ScoreLedger::new();
        let mut vfx = VisualQueue::new();
        let ticks = worm.params.growth_ticks * 5;
        run(&mut worm, ticks, &mut ledger, &mut vfx);
        assert_eq!(worm.node_count(), 6);

        let max_step = worm.params.spacing / 4.0;
        hit_head(&mut worm, ProjectileKind::Energy, &mut ledger, &mut vfx);
        let mut overlapping = false;
        while worm.is_active() {
            run(&mut worm, 1, &mut ledger, &mut vfx);
            overlapping |= worm.nodes.iter().filter(|n| n.is_shrinking).count() >= 2;
            for pair in worm.curve.windows(2) {
                let gap = (pair[1].pos - pair[0].pos).length();
                assert!(gap < max_step, "gap {gap} at tick {}", worm.age_ticks);
            }
        }
        assert!(overlapping, "pops overlap while the curve is checked");
        assert_eq!(worm.destroy_cause(), Some(DestroyCause::Cascade));
    }

    #[test]
    fn test_energy_trigger_is_idempotent() {
        let mut worm = full_worm(4);
        let mut ledger = ScoreLedger::new();
        let mut vfx = VisualQueue::new();
        let gate = AlwaysActive;
        let mut services = Services::new(&mut ledger, &mut vfx, &gate);
        assert_eq!(worm.trigger_energy_cascade(&mut services), Ok(true));
        assert_eq!(worm.trigger_energy_cascade(&mut services), Ok(false));
        assert_eq!(worm.apply_normal_hit(&mut services), Ok(false));
        drop(services);
        assert_eq!(ledger.count(ScoreReason::EnergyCascade), 1);
        assert_eq!(ledger.total, 2000 + 100 * 4);
    }

    #[test]
    fn test_cascade_stops_growth() {
        let mut worm = new_worm(8);
        let mut ledger = ScoreLedger::new();
        let mut vfx = VisualQueue::new();
        let ticks = worm.params.growth_ticks;
        run(&mut worm, ticks, &mut ledger, &mut vfx);
        assert_eq!(worm.node_count(), 2);
        hit_head(&mut worm, ProjectileKind::Energy, &mut ledger, &mut vfx);
        assert!(worm.timers.growth.is_none());
        run(&mut worm, 200, &mut ledger, &mut vfx);
        assert_eq!(worm.phase, WormPhase::Destroyed(DestroyCause::Cascade));
        assert_eq!(ledger.total, 2200);
    }

    #[test]
    fn test_escape_scenario() {
        let mut worm = full_worm(4);
        let boundary = worm.params.play_area.left_boundary;
        let shift = worm.nodes[0].x - boundary + 1.0;
        for node in &mut worm.nodes {
            node.x -= shift;
        }
        let mut ledger = ScoreLedger::new();
        let mut vfx = VisualQueue::new();
        run(&mut worm, 1, &mut ledger, &mut vfx);

        assert_eq!(worm.phase, WormPhase::Destroyed(DestroyCause::Escaped));
        assert_eq!(ledger.total, 0, "the worm itself pays nothing");
        assert_eq!(worm.take_escape_penalty(), Some(4));
        assert_eq!(worm.take_escape_penalty(), None);
        assert_eq!(escape_penalty(4), -2000);
        assert!(!worm.timers.any_armed());
        assert!(worm.region.is_none());
    }

    #[test]
    fn test_force_destroy_releases_everything() {
        let mut worm = new_worm(6);
        worm.force_destroy();
        assert_eq!(worm.phase, WormPhase::Destroyed(DestroyCause::Forced));
        assert!(worm.nodes.is_empty());
        assert!(worm.region.is_none());
        assert!(!worm.timers.any_armed());
        // Second call is harmless
        worm.force_destroy();
        assert_eq!(worm.destroy_cause(), Some(DestroyCause::Forced));
    }

    #[test]
    fn test_hits_on_destroyed_worm_are_errors() {
        let mut worm = new_worm(2);
        worm.force_destroy();
        let mut ledger = ScoreLedger::new();
        let mut vfx = VisualQueue::new();
        let gate = AlwaysActive;
        let mut services = Services::new(&mut ledger, &mut vfx, &gate);
        assert_eq!(
            worm.trigger_energy_cascade(&mut services),
            Err(WormError::AlreadyDestroyed)
        );
        assert_eq!(worm.apply_normal_hit(&mut services), Err(WormError::AlreadyDestroyed));
    }

    #[test]
    fn test_remove_unknown_node_is_error() {
        let mut worm = new_worm(2);
        assert_eq!(worm.remove_node(NodeId(99)), Err(WormError::UnknownNode(NodeId(99))));
        assert_eq!(worm.node_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_k_th_hit_pays_for_remaining_nodes(n in 1usize..=16, k in 1usize..=16) {
            prop_assume!(k <= n);
            prop_assert_eq!(normal_hit_points(n - k + 1), 250 + 20 * (n - k + 1) as i64);
            prop_assert_eq!(energy_cascade_points(n), 2000 + 100 * n as i64);
            prop_assert!(escape_penalty(n) < 0);
        }
    }

    #[test]
    fn test_score_formulas() {
        assert_eq!(normal_hit_points(3), 310);
        assert_eq!(completion_bonus(4), 1050);
        assert_eq!(energy_cascade_points(6), 2600);
        assert_eq!(escape_penalty(4), -2000);
    }
}
