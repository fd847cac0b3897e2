//! Append-only checkpoint histories with point-in-time lookup.
//!
//! Every history is ordered by insertion, and insertion order is also
//! timestamp and block order (the ledger only ever appends at "now"). Lookups
//! therefore binary-search for the greatest index whose timestamp (or block)
//! is at or before the query.
//!
//! Several points may share a timestamp when more than one mutation lands in
//! the same block; the last one written is authoritative, which is exactly
//! what "greatest index" selects.

use bond_core::types::Point;

/// Append-only sequence of decay-line checkpoints.
#[derive(Debug, Clone, Default)]
pub struct CheckpointHistory {
    points: Vec<Point>,
}

impl CheckpointHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History seeded with a single point.
    pub fn starting_at(point: Point) -> Self {
        Self { points: vec![point] }
    }

    pub fn push(&mut self, point: Point) {
        debug_assert!(
            self.points.last().is_none_or(|last| last.ts <= point.ts && last.blk <= point.blk),
            "checkpoints must be appended in time order"
        );
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Point> + ExactSizeIterator {
        self.points.iter()
    }

    /// Greatest index with `ts <= t`, or `None` if `t` precedes the history.
    pub fn find_by_timestamp(&self, t: u64) -> Option<usize> {
        self.points.partition_point(|p| p.ts <= t).checked_sub(1)
    }

    /// Greatest index with `blk <= block`, or `None` if `block` precedes the history.
    pub fn find_by_block(&self, block: u64) -> Option<usize> {
        self.points.partition_point(|p| p.blk <= block).checked_sub(1)
    }

    /// Checkpoint governing timestamp `t`.
    pub fn point_at_timestamp(&self, t: u64) -> Option<&Point> {
        self.find_by_timestamp(t).and_then(|i| self.points.get(i))
    }

    /// Checkpoint governing block `block`.
    pub fn point_at_block(&self, block: u64) -> Option<&Point> {
        self.find_by_block(block).and_then(|i| self.points.get(i))
    }

    /// Balance at `t` by extrapolating the governing line.
    ///
    /// Empty history and queries before the first checkpoint both yield 0.
    /// Queries past the last checkpoint extrapolate its line, clamped at zero.
    /// Only valid for lines without scheduled slope changes (per-account
    /// histories); the global line needs the schedule replay in the ledger.
    pub fn value_at_timestamp(&self, t: u64) -> u128 {
        self.point_at_timestamp(t).map_or(0, |p| p.value_at(t))
    }
}
