//! Head tracking
//!
//! The leftmost node is the head and the only node that may own the collision
//! region. Reconciliation runs after every position update and every removal.

use super::state::{CollisionRegion, Worm};

impl Worm {
    /// Re-sort by x, reassign the head and move the collision region with it.
    ///
    /// A node leaving the head role loses its region immediately, which also
    /// retires the region's subscription. A fresh region (new subscription) is
    /// created for the new head when the worm can still take hits.
    pub fn reconcile_head(&mut self) {
        // Stable sort: equal x keeps creation order
        self.nodes
            .sort_by(|a, b| a.x.total_cmp(&b.x).then(a.id.cmp(&b.id)));

        let new_head = self.nodes.first().map(|n| n.id);

        if let Some(region) = self.region {
            if Some(region.owner) != new_head {
                self.teardown_region();
            }
        }

        for node in &mut self.nodes {
            node.is_head = Some(node.id) == new_head;
            if !node.is_head {
                node.has_collision_region = false;
            }
        }

        if self.region.is_none() && self.head_accepts_region() {
            self.create_region();
        }
    }

    /// Whether the current head may own a collision region
    fn head_accepts_region(&self) -> bool {
        match self.nodes.first() {
            Some(head) => self.is_active() && !self.is_energy_destroying && !head.is_shrinking,
            None => false,
        }
    }

    fn create_region(&mut self) {
        let subscription = self.next_subscription();
        let radius = self.params.head_radius;
        let Some(head) = self.nodes.first_mut() else {
            return;
        };
        head.has_collision_region = true;
        let center = self
            .curve
            .first()
            .map(|p| p.pos)
            .unwrap_or_else(|| head.position());
        self.region = Some(CollisionRegion {
            owner: head.id,
            subscription,
            center,
            radius,
        });
        log::debug!("{} region {:?} bound to {}", self.id, subscription, head.id);
    }

    /// Drop the collision region and its subscription, if any
    pub fn teardown_region(&mut self) {
        if let Some(region) = self.region.take() {
            if let Some(node) = self.nodes.iter_mut().find(|n| n.id == region.owner) {
                node.has_collision_region = false;
            }
            log::debug!(
                "{} region {:?} released from {}",
                self.id,
                region.subscription,
                region.owner
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::sim::chain::tests::{grown_worm, new_worm};

    #[test]
    fn test_single_head_is_leftmost() {
        let worm = grown_worm(4);
        let heads: Vec<_> = worm.nodes.iter().filter(|n| n.is_head).collect();
        assert_eq!(heads.len(), 1);
        let min_x = worm.nodes.iter().map(|n| n.x).fold(f32::INFINITY, f32::min);
        assert_eq!(heads[0].x, min_x);
        assert_eq!(worm.region.unwrap().owner, heads[0].id);
    }

    #[test]
    fn test_reconcile_moves_region_to_new_leftmost() {
        let mut worm = grown_worm(3);
        let old_head = worm.nodes[0].id;
        let old_sub = worm.region.unwrap().subscription;
        let second = worm.nodes[1].id;

        // Push the old head behind everything
        worm.nodes[0].x += 1000.0;
        worm.reconcile_head();

        assert_eq!(worm.nodes[0].id, second);
        assert!(worm.nodes[0].is_head);
        let region = worm.region.unwrap();
        assert_eq!(region.owner, second);
        assert_ne!(region.subscription, old_sub);
        let demoted = worm.node(old_head).unwrap();
        assert!(!demoted.is_head);
        assert!(!demoted.has_collision_region);
        worm.check_invariants().unwrap();
    }

    #[test]
    fn test_reconcile_is_stable_without_change() {
        let mut worm = grown_worm(3);
        let sub = worm.region.unwrap().subscription;
        worm.reconcile_head();
        worm.reconcile_head();
        assert_eq!(worm.region.unwrap().subscription, sub);
    }

    #[test]
    fn test_no_region_for_shrinking_head() {
        let mut worm = new_worm(2);
        worm.teardown_region();
        worm.nodes[0].is_shrinking = true;
        worm.reconcile_head();
        assert!(worm.region.is_none());
        assert!(!worm.nodes[0].has_collision_region);
        assert!(worm.nodes[0].is_head);
    }

    #[test]
    fn test_removed_owner_region_is_torn_down() {
        let mut worm = grown_worm(3);
        let owner = worm.nodes[0].id;
        worm.nodes.remove(0);
        worm.reconcile_head();
        let region = worm.region.unwrap();
        assert_ne!(region.owner, owner);
        assert_eq!(region.owner, worm.nodes[0].id);
        worm.check_invariants().unwrap();
    }
}
