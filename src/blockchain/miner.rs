use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use num_traits::Zero;

use super::Block;
use super::compact;
use crate::error::MiningError;

/// Shared stop flag polled by the nonce search between attempts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Perform Proof-of-Work: bump the nonce until the block hash is strictly
/// below the target decoded from `block.bits`, then seal the block.
pub fn mine(mut block: Block, cancel: &CancelToken) -> Result<Block, MiningError> {
    let target = block.target()?;
    if target.is_zero() {
        return Err(MiningError::TargetUnreachable { bits: block.bits });
    }

    let mut attempts: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            debug!("MINER - block #{} cancelled after {} attempts", block.index, attempts);
            return Err(MiningError::Cancelled { attempts });
        }

        let hash = block.compute_hash();
        attempts += 1;
        if compact::hash_value(&hash).is_some_and(|value| value < target) {
            debug!(
                "MINER - block #{} sealed (nonce={}, attempts={})",
                block.index, block.nonce, attempts
            );
            block.hash = Some(hash);
            return Ok(block);
        }

        block.nonce = block
            .nonce
            .checked_add(1)
            .ok_or(MiningError::TargetUnreachable { bits: block.bits })?;
    }
}
