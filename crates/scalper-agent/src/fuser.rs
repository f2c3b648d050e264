//! Signal fusion: strict priority between the learned and pattern sources,
//! never a weighted blend. Only one branch can fire per symbol per cycle.

use engine_core::Signal;

pub const LEARNED_THRESHOLD: f64 = 40.0;
pub const PATTERN_THRESHOLD: f64 = 50.0;

pub struct SignalFuser {
    learned_threshold: f64,
    pattern_threshold: f64,
}

impl SignalFuser {
    pub fn new() -> Self {
        Self {
            learned_threshold: LEARNED_THRESHOLD,
            pattern_threshold: PATTERN_THRESHOLD,
        }
    }

    /// Learned confidence > 40 wins outright; otherwise pattern confidence
    /// > 50; otherwise no trade this cycle.
    pub fn fuse(&self, learned: &Signal, pattern: &Signal) -> Option<Signal> {
        if learned.is_actionable() && learned.confidence > self.learned_threshold {
            return Some(*learned);
        }
        if pattern.is_actionable() && pattern.confidence > self.pattern_threshold {
            return Some(*pattern);
        }
        None
    }
}

impl Default for SignalFuser {
    fn default() -> Self {
        Self::new()
    }
}
