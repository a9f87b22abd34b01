//! Catmull-Rom body curve
//!
//! The curve is rebuilt from node positions every tick. Its first point is the
//! collision anchor for the head, so the drawn tip and the collidable tip are
//! always the same point.

use glam::Vec2;

use super::state::Node;

/// One sample on the body curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub pos: Vec2,
    /// Index of the node this sample sits exactly on, if any
    pub origin: Option<usize>,
    /// Shrink scale of the node whose interval produced this sample
    pub shrink_scale: f32,
    /// Fractional position along the chain (interval index + local t)
    pub param: f32,
}

/// Uniform Catmull-Rom basis between `p1` and `p2`
#[inline]
pub fn catmull_rom(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Interpolate a curve through `nodes` (already sorted by x, head first).
///
/// Each interval gets `samples` points. When the head is shrinking, the first
/// interval only emits the trailing `shrink_scale` fraction of its parameter
/// range, so the tip retracts toward the next node without a gap. Shrinking
/// interior nodes keep their full interval and only report their scale.
pub fn interpolate(nodes: &[Node], samples: usize) -> Vec<CurvePoint> {
    match nodes.len() {
        0 => return Vec::new(),
        1 => {
            return vec![CurvePoint {
                pos: nodes[0].position(),
                origin: Some(0),
                shrink_scale: nodes[0].shrink_scale,
                param: 0.0,
            }];
        }
        _ => {}
    }

    let samples = samples.max(1);
    let last = nodes.len() - 1;
    let pts: Vec<Vec2> = nodes.iter().map(Node::position).collect();
    let mut curve = Vec::with_capacity(last * samples + 1);

    for i in 0..last {
        // Edge duplication at both ends
        let p0 = pts[i.saturating_sub(1)];
        let p1 = pts[i];
        let p2 = pts[i + 1];
        let p3 = pts[(i + 2).min(last)];

        // Only the front retracts; interior pops keep their full interval
        let scale = if i == 0 {
            nodes[0].shrink_scale.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let count = ((samples as f32 * scale).ceil() as usize).clamp(1, samples);
        let t0 = 1.0 - scale;

        for j in 0..count {
            let t = t0 + scale * j as f32 / count as f32;
            curve.push(CurvePoint {
                pos: catmull_rom(p0, p1, p2, p3, t),
                origin: (j == 0 && scale >= 1.0).then_some(i),
                shrink_scale: nodes[i].shrink_scale,
                param: i as f32 + t,
            });
        }
    }

    curve.push(CurvePoint {
        pos: pts[last],
        origin: Some(last),
        shrink_scale: nodes[last].shrink_scale,
        param: last as f32,
    });

    curve
}
