//! Cosmetic body motion
//!
//! Layered sines give the body an organic sway. Purely presentational: the
//! collision curve never includes these offsets.

use glam::Vec2;

/// Peak vertical offset
pub const WIGGLE_AMPLITUDE: f32 = 6.0;
/// Horizontal sway relative to vertical
const HORIZONTAL_RATIO: f32 = 0.35;

/// Offset for a node at `time` seconds. Bounded by `WIGGLE_AMPLITUDE` on each
/// axis and continuous in `time`.
pub fn organic_offset(time: f32, node_index: usize, seed: u32) -> Vec2 {
    let phase = (seed % 10_000) as f32 / 10_000.0 * std::f32::consts::TAU + node_index as f32 * 0.7;

    // Weights sum to 1.0
    let y = 0.6 * (time * 2.1 + phase).sin()
        + 0.3 * (time * 3.7 + phase * 1.3).sin()
        + 0.1 * (time * 7.9 + phase * 0.5).sin();
    let x = 0.7 * (time * 1.3 + phase * 0.8).sin() + 0.3 * (time * 2.9 + phase * 1.7).sin();

    Vec2::new(x * WIGGLE_AMPLITUDE * HORIZONTAL_RATIO, y * WIGGLE_AMPLITUDE)
}

/// Offset at a fractional chain position, blending the neighbouring nodes
pub fn offset_at_param(time: f32, param: f32, seed: u32) -> Vec2 {
    let param = param.max(0.0);
    let index = param.floor() as usize;
    let t = param - index as f32;
    organic_offset(time, index, seed).lerp(organic_offset(time, index + 1, seed), t)
}
