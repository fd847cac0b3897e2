//! Deferred slope reductions keyed by lock-period boundaries.
//!
//! When a lock is written, its slope keeps draining the global line until the
//! lock ends. Instead of visiting every account to stop that drain, the lock's
//! slope is recorded here at its (aligned) end and subtracted from the running
//! global slope when the replay crosses that boundary.

use std::collections::BTreeMap;

/// Map from aligned timestamp to the slope that stops decaying at that instant.
#[derive(Debug, Clone, Default)]
pub struct SlopeSchedule {
    reductions: BTreeMap<u64, i128>,
}

impl SlopeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slope reduction pending at exactly `t` (0 if none).
    pub fn scheduled(&self, t: u64) -> i128 {
        self.reductions.get(&t).copied().unwrap_or(0)
    }

    /// Add `slope` to the reduction at `t`.
    pub fn schedule(&mut self, t: u64, slope: i128) {
        if slope == 0 {
            return;
        }
        let entry = self.reductions.entry(t).or_insert(0);
        *entry += slope;
        if *entry == 0 {
            self.reductions.remove(&t);
        }
    }

    /// Withdraw `slope` from the reduction at `t`.
    pub fn unschedule(&mut self, t: u64, slope: i128) {
        self.schedule(t, -slope);
    }

    /// Boundaries with a pending reduction in `(after, until]`.
    pub fn pending_between(&self, after: u64, until: u64) -> impl Iterator<Item = (u64, i128)> + '_ {
        self.reductions
            .range(after.saturating_add(1)..=until)
            .map(|(t, s)| (*t, *s))
    }

    pub fn len(&self) -> usize {
        self.reductions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reductions.is_empty()
    }
}
