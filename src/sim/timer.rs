//! Named, cancellable timed transitions
//!
//! Every worm owns three timer slots: growth, shrink and cascade. All of them
//! count fixed simulation ticks and are advanced by the worm's own update, so a
//! cancelled timer can never fire against a destroyed chain.

use serde::{Deserialize, Serialize};

use super::state::NodeId;

/// Repeating countdown in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatingTimer {
    pub period: u32,
    pub remaining: u32,
}

impl RepeatingTimer {
    pub fn new(period: u32) -> Self {
        let period = period.max(1);
        Self {
            period,
            remaining: period,
        }
    }

    /// Advance one tick; true when the timer fires (and re-arms)
    pub fn advance(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = self.period;
            true
        } else {
            false
        }
    }
}

/// One node's shrink animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShrinkTimer {
    pub node: NodeId,
    pub elapsed: u32,
    pub duration: u32,
    /// Score paid when the node is removed (0 for cascade pops)
    pub reward: i64,
}

impl ShrinkTimer {
    pub fn new(node: NodeId, duration: u32) -> Self {
        Self {
            node,
            elapsed: 0,
            duration: duration.max(1),
            reward: 0,
        }
    }

    pub fn with_reward(mut self, reward: i64) -> Self {
        self.reward = reward;
        self
    }

    /// Advance one tick and return the new scale in [0, 1]
    pub fn advance(&mut self) -> f32 {
        self.elapsed = (self.elapsed + 1).min(self.duration);
        self.scale()
    }

    pub fn scale(&self) -> f32 {
        1.0 - self.elapsed as f32 / self.duration as f32
    }

    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Which timer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSlot {
    Growth,
    Shrink,
    Cascade,
}

/// The three timer slots of a worm
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WormTimers {
    pub growth: Option<RepeatingTimer>,
    /// One entry per node currently animating toward removal
    pub shrink: Vec<ShrinkTimer>,
    pub cascade: Option<RepeatingTimer>,
}

impl WormTimers {
    pub fn cancel(&mut self, slot: TimerSlot) {
        match slot {
            TimerSlot::Growth => self.growth = None,
            TimerSlot::Shrink => self.shrink.clear(),
            TimerSlot::Cascade => self.cascade = None,
        }
    }

    pub fn cancel_all(&mut self) {
        self.cancel(TimerSlot::Growth);
        self.cancel(TimerSlot::Shrink);
        self.cancel(TimerSlot::Cascade);
    }

    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        match slot {
            TimerSlot::Growth => self.growth.is_some(),
            TimerSlot::Shrink => !self.shrink.is_empty(),
            TimerSlot::Cascade => self.cascade.is_some(),
        }
    }

    pub fn any_armed(&self) -> bool {
        self.is_armed(TimerSlot::Growth)
            || self.is_armed(TimerSlot::Shrink)
            || self.is_armed(TimerSlot::Cascade)
    }

}
