//! Sources of the current timestamp and block number.

use chrono::Utc;
use parking_lot::Mutex;

use bond_core::types::BlockStamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> BlockStamp;
}

/// Wall clock. Block numbers are derived from elapsed time at a fixed
/// average block time after `genesis`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    genesis: BlockStamp,
    block_time_secs: u64,
}

impl SystemClock {
    pub fn new(genesis: BlockStamp, block_time_secs: u64) -> Self {
        Self { genesis, block_time_secs: block_time_secs.max(1) }
    }

    /// Clock whose genesis is the current wall-clock second at block 0.
    pub fn starting_now(block_time_secs: u64) -> Self {
        Self::new(BlockStamp::new(unix_now(), 0), block_time_secs)
    }

    pub fn genesis(&self) -> BlockStamp {
        self.genesis
    }

    pub fn block_time_secs(&self) -> u64 {
        self.block_time_secs
    }
}

impl Clock for SystemClock {
    fn now(&self) -> BlockStamp {
        let timestamp = unix_now().max(self.genesis.timestamp);
        let elapsed = timestamp - self.genesis.timestamp;
        BlockStamp::new(timestamp, self.genesis.block + elapsed / self.block_time_secs)
    }
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Clock moved by hand, for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<BlockStamp>,
}

impl ManualClock {
    pub fn new(start: BlockStamp) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, stamp: BlockStamp) {
        *self.now.lock() = stamp;
    }

    /// Move forward by `secs` seconds and `blocks` blocks.
    pub fn advance(&self, secs: u64, blocks: u64) -> BlockStamp {
        let mut now = self.now.lock();
        now.timestamp += secs;
        now.block += blocks;
        *now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> BlockStamp {
        *self.now.lock()
    }
}
