pub mod block;
pub mod compact;
pub mod miner;
pub mod model;
pub mod retarget;

use std::time::Duration;

pub use block::Block;
pub use miner::CancelToken;
pub use model::Blockchain;

/// Initial compact bits: the highest target (the lowest difficulty).
pub const GENESIS_BITS: u32 = 0x1EFF_FFFF;

/// Target seconds per block for retargeting
pub const TARGET_BLOCK_TIME_SECS: u64 = 2;

/// Upper bound on the configurable block spacing (one week).
pub const MAX_TARGET_BLOCK_TIME_SECS: u64 = 7 * 24 * 60 * 60;

/// Blocks per difficulty period
pub const RETARGET_WINDOW: usize = 32;

/// Parameters of a proof-of-work chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    pub initial_bits: u32,
    pub target_block_time: Duration,
    pub retarget_window: usize,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            initial_bits: GENESIS_BITS,
            target_block_time: Duration::from_secs(TARGET_BLOCK_TIME_SECS),
            retarget_window: RETARGET_WINDOW,
        }
    }
}
