//! Collision gate between projectiles and worm heads
//!
//! Only a worm's live collision region can be hit. Each region takes at most
//! one projectile per tick and each projectile hits at most one region; the
//! hit carries the region's subscription so it can be re-validated when it is
//! applied.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{CollisionRegion, NodeId, SubscriptionId, Worm, WormId};

/// Projectile category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    Normal,
    Energy,
}

/// A projectile position sampled this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    pub kind: ProjectileKind,
}

impl Projectile {
    pub fn normal(pos: Vec2) -> Self {
        Self {
            pos,
            kind: ProjectileKind::Normal,
        }
    }

    pub fn energy(pos: Vec2) -> Self {
        Self {
            pos,
            kind: ProjectileKind::Energy,
        }
    }
}

/// A projectile overlapping a head region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEvent {
    pub worm: WormId,
    pub node: NodeId,
    pub subscription: SubscriptionId,
    pub kind: ProjectileKind,
    /// Index into the tick's projectile list
    pub projectile: usize,
    pub point: Vec2,
}

/// Result of a circle overlap check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the region boundary (if hit)
    pub point: Vec2,
    /// Penetration depth
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check a projectile of radius `projectile_radius` against a head region
pub fn projectile_region_collision(
    pos: Vec2,
    projectile_radius: f32,
    region: &CollisionRegion,
) -> CollisionResult {
    let offset = pos - region.center;
    let dist = offset.length();
    let reach = region.radius + projectile_radius;
    if dist > reach {
        return CollisionResult::miss();
    }
    let dir = offset.normalize_or_zero();
    CollisionResult {
        hit: true,
        point: region.center + dir * region.radius.min(dist),
        penetration: reach - dist,
    }
}

/// Match this tick's projectiles against every live head region.
///
/// Worms are visited in id order and projectiles in list order, so results
/// are deterministic.
pub fn detect_hits(worms: &[Worm], projectiles: &[Projectile], projectile_radius: f32) -> Vec<HitEvent> {
    let mut hits = Vec::new();
    let mut used = vec![false; projectiles.len()];

    for worm in worms {
        if !worm.is_active() {
            continue;
        }
        let Some(region) = worm.region.as_ref() else {
            continue;
        };
        for (index, projectile) in projectiles.iter().enumerate() {
            if used[index] {
                continue;
            }
            let result = projectile_region_collision(projectile.pos, projectile_radius, region);
            if result.hit {
                used[index] = true;
                hits.push(HitEvent {
                    worm: worm.id,
                    node: region.owner,
                    subscription: region.subscription,
                    kind: projectile.kind,
                    projectile: index,
                    point: result.point,
                });
                // One hit per region per tick
                break;
            }
        }
    }

    hits
}
