use std::time::Duration;

use log::info;

use super::block::GENESIS_PREVIOUS_HASH;
use super::miner::{self, CancelToken};
use super::{Block, ChainParams, compact, retarget};
use crate::error::{CompactError, MiningError, RetargetError};

/// In-memory proof-of-work chain whose bits are retargeted every
/// `retarget_window` blocks.
#[derive(Debug)]
pub struct Blockchain {
    pub chain: Vec<Block>,
    initial_bits: u32,
    bits: u32,
    /// Block spacing in force from each height on, oldest first.
    target_times: Vec<(usize, Duration)>,
    retarget_window: usize,
}

impl Blockchain {
    /// Initialize a new blockchain by mining its genesis block.
    pub fn new(params: &ChainParams, cancel: &CancelToken) -> Result<Self, MiningError> {
        retarget::desired_timespan(params.target_block_time, params.retarget_window)?;
        let genesis = miner::mine(Self::genesis_block(params.initial_bits), cancel)?;
        info!(
            "genesis sealed (bits={:#010x}, nonce={})",
            genesis.bits, genesis.nonce
        );
        Ok(Self {
            chain: vec![genesis],
            initial_bits: params.initial_bits,
            bits: params.initial_bits,
            target_times: vec![(0, params.target_block_time)],
            retarget_window: params.retarget_window,
        })
    }

    /// First block of the chain; not mined yet.
    pub fn genesis_block(bits: u32) -> Block {
        Block::new(0, GENESIS_PREVIOUS_HASH.to_string(), bits)
    }

    /// Unmined block on top of the current tip.
    pub fn make_empty_block(&self, bits: u32) -> Block {
        Block::new(self.chain.len() as u64, self.tip_hash(), bits)
    }

    /// Template for the next block at the bits currently in force.
    pub fn next_block(&self) -> Block {
        self.make_empty_block(self.bits)
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    fn tip_hash(&self) -> String {
        self.last_block().hash.clone().unwrap_or_default()
    }

    /// Mine and append the next block.
    pub fn mine_next(&mut self, cancel: &CancelToken) -> Result<&Block, MiningError> {
        let sealed = miner::mine(self.next_block(), cancel)?;
        self.append(sealed)
    }

    /// Append a sealed block mined elsewhere. The block must extend the
    /// current tip and be mined at the bits in force; when it closes a
    /// window the bits are retargeted.
    pub fn append(&mut self, block: Block) -> Result<&Block, MiningError> {
        let index = self.chain.len() as u64;
        if block.index != index || block.previous_hash != self.tip_hash() {
            return Err(MiningError::StaleTip { index: block.index });
        }
        if block.bits != self.bits || !block.is_valid() {
            return Err(MiningError::InvalidBlock { index: block.index });
        }

        let next_bits = self.bits_after(self.bits, &block)?;
        self.chain.push(block);
        if next_bits != self.bits {
            info!(
                "RETARGET - height {} bits {:#010x} -> {:#010x}",
                index, self.bits, next_bits
            );
            self.bits = next_bits;
        }
        Ok(self.last_block())
    }

    /// Bits in force after `block` (mined at `bits`) joins the chain.
    /// Only `chain[..block.index]` is read.
    fn bits_after(&self, bits: u32, block: &Block) -> Result<u32, RetargetError> {
        let window = self.retarget_window;
        let index = block.index as usize;
        if window == 0 || index < window || index % window != 0 {
            return Ok(bits);
        }
        let start = self.chain[index - window].timestamp()?;
        let end = block.timestamp()?;
        let desired = retarget::desired_timespan(self.target_time_at(index), window)?;
        retarget::retarget(bits, start, end, desired)
    }

    fn target_time_at(&self, height: usize) -> Duration {
        self.target_times
            .iter()
            .rev()
            .find(|(from, _)| *from <= height)
            .map(|(_, target)| *target)
            .unwrap_or_else(|| self.target_block_time())
    }

    /// Validate the entire chain: linkage, indices, hashes, PoW, and that
    /// every block carries the bits the retarget schedule put in force.
    pub fn is_valid_chain(&self) -> bool {
        let Some(genesis) = self.chain.first() else {
            return false;
        };
        if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
            return false;
        }

        let mut expected_bits = self.initial_bits;
        let mut previous_hash: Option<&String> = None;
        for (i, block) in self.chain.iter().enumerate() {
            if block.index != i as u64
                || (i > 0 && Some(&block.previous_hash) != previous_hash)
                || block.bits != expected_bits
                || !block.is_valid()
            {
                return false;
            }
            expected_bits = match self.bits_after(expected_bits, block) {
                Ok(bits) => bits,
                Err(_) => return false,
            };
            previous_hash = block.hash.as_ref();
        }
        expected_bits == self.bits
    }

    /// Mean seconds per block between two chain heights.
    pub fn average_block_time(&self, from: usize, to: usize) -> Option<f64> {
        if from >= to || to >= self.chain.len() {
            return None;
        }
        let start = self.chain[from].timestamp().ok()?;
        let end = self.chain[to].timestamp().ok()?;
        let micros = (end - start).num_microseconds()?;
        Some(micros as f64 / 1_000_000.0 / (to - from) as f64)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn difficulty(&self) -> Result<f64, CompactError> {
        compact::difficulty_from_bits(self.bits)
    }

    pub fn target_block_time(&self) -> Duration {
        self.target_times
            .last()
            .map(|(_, target)| *target)
            .unwrap_or(Duration::from_secs(super::TARGET_BLOCK_TIME_SECS))
    }

    pub fn retarget_window(&self) -> usize {
        self.retarget_window
    }

    /// Change the desired block spacing; takes effect at the next window.
    pub fn set_target_block_time(&mut self, target: Duration) -> Result<(), RetargetError> {
        retarget::desired_timespan(target, self.retarget_window)?;
        let height = self.chain.len();
        match self.target_times.last_mut() {
            Some((from, current)) if *from == height => *current = target,
            _ => self.target_times.push((height, target)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::GENESIS_BITS;

    fn easy(window: usize, target: Duration) -> Blockchain {
        let params = ChainParams {
            initial_bits: 0x207F_FFFF,
            target_block_time: target,
            retarget_window: window,
        };
        Blockchain::new(&params, &CancelToken::new()).unwrap()
    }

    #[test]
    fn genesis_is_sealed_and_anchored() {
        let bc = easy(32, Duration::from_secs(2));
        let genesis = bc.last_block();
        assert_eq!(bc.len(), 1);
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.is_valid());
        assert!(bc.is_valid_chain());
    }

    #[test]
    fn mined_blocks_link_to_the_tip() {
        let mut bc = easy(32, Duration::from_secs(2));
        let cancel = CancelToken::new();
        for _ in 0..3 {
            bc.mine_next(&cancel).unwrap();
        }
        assert_eq!(bc.len(), 4);
        for (i, block) in bc.chain.iter().enumerate() {
            assert_eq!(block.index, i as u64);
        }
        assert_eq!(bc.chain[2].previous_hash, bc.chain[1].hash.clone().unwrap());
        assert!(bc.is_valid_chain());
    }

    #[test]
    fn tampered_chain_is_invalid() {
        let mut bc = easy(32, Duration::from_secs(2));
        bc.mine_next(&CancelToken::new()).unwrap();
        bc.chain[1].nonce += 1;
        assert!(!bc.is_valid_chain());
    }

    #[test]
    fn stale_block_is_refused() {
        let mut bc = easy(32, Duration::from_secs(2));
        let cancel = CancelToken::new();
        let stale = miner::mine(bc.next_block(), &cancel).unwrap();
        bc.mine_next(&cancel).unwrap();
        assert_eq!(bc.append(stale), Err(MiningError::StaleTip { index: 1 }));
        assert_eq!(bc.len(), 2);
    }

    #[test]
    fn unsealed_block_is_refused() {
        let mut bc = easy(32, Duration::from_secs(2));
        let block = bc.next_block();
        assert_eq!(bc.append(block), Err(MiningError::InvalidBlock { index: 1 }));
    }

    #[test]
    fn block_at_foreign_bits_is_refused() {
        let mut bc = easy(32, Duration::from_secs(2));
        let cancel = CancelToken::new();
        // Target above 2^256: any hash qualifies.
        let cheap = miner::mine(bc.make_empty_block(0x2100_FFFF), &cancel).unwrap();
        assert!(cheap.is_valid());
        assert_eq!(
            bc.append(cheap.clone()),
            Err(MiningError::InvalidBlock { index: 1 })
        );
        assert_eq!(bc.len(), 1);
        assert_eq!(bc.bits(), 0x207F_FFFF);

        bc.chain.push(cheap);
        assert!(!bc.is_valid_chain());
    }

    #[test]
    fn oversized_block_time_is_refused_without_panicking() {
        let mut bc = easy(2, Duration::from_secs(2));
        assert_eq!(
            bc.set_target_block_time(Duration::from_secs(u64::MAX)),
            Err(RetargetError::TimespanOverflow)
        );
        assert_eq!(bc.target_block_time(), Duration::from_secs(2));

        let cancel = CancelToken::new();
        bc.mine_next(&cancel).unwrap();
        bc.mine_next(&cancel).unwrap();
        assert_eq!(bc.len(), 3);
    }

    #[test]
    fn fast_window_raises_difficulty() {
        let mut bc = easy(2, Duration::from_secs(1000));
        let cancel = CancelToken::new();
        bc.mine_next(&cancel).unwrap();
        assert_eq!(bc.bits(), 0x207F_FFFF);
        bc.mine_next(&cancel).unwrap();
        assert!(compact::decode(bc.bits()).unwrap() < compact::decode(0x207F_FFFF).unwrap());
        // Blocks keep the bits they were mined with.
        assert_eq!(bc.chain[2].bits, 0x207F_FFFF);
    }

    #[test]
    fn slow_window_lowers_difficulty() {
        let mut bc = easy(2, Duration::from_micros(1));
        let cancel = CancelToken::new();
        bc.mine_next(&cancel).unwrap();
        bc.mine_next(&cancel).unwrap();
        assert!(compact::decode(bc.bits()).unwrap() > compact::decode(0x207F_FFFF).unwrap());

        // The next block must carry the retargeted bits, and a replay of the
        // schedule agrees with them.
        bc.mine_next(&cancel).unwrap();
        assert_eq!(bc.chain[3].bits, bc.bits());
        assert!(bc.is_valid_chain());
    }

    #[test]
    fn changed_block_time_replays_from_its_height() {
        let mut bc = easy(2, Duration::from_micros(1));
        let cancel = CancelToken::new();
        bc.mine_next(&cancel).unwrap();
        bc.set_target_block_time(Duration::from_micros(2)).unwrap();
        bc.mine_next(&cancel).unwrap();
        bc.mine_next(&cancel).unwrap();
        assert_eq!(bc.target_block_time(), Duration::from_micros(2));
        assert!(bc.is_valid_chain());
    }

    #[test]
    fn zero_block_time_is_rejected() {
        let mut bc = easy(32, Duration::from_secs(2));
        assert_eq!(
            bc.set_target_block_time(Duration::ZERO),
            Err(RetargetError::ZeroTimespan)
        );
        assert_eq!(bc.target_block_time(), Duration::from_secs(2));
    }

    #[test]
    fn average_block_time_needs_a_range() {
        let mut bc = easy(32, Duration::from_secs(2));
        bc.mine_next(&CancelToken::new()).unwrap();
        assert!(bc.average_block_time(0, 1).unwrap() >= 0.0);
        assert_eq!(bc.average_block_time(1, 1), None);
        assert_eq!(bc.average_block_time(0, 5), None);
    }

    /// Mines 64 blocks at real difficulty; run with `cargo test --release -- --ignored`.
    #[test]
    #[ignore]
    fn retarget_converges_to_two_seconds() {
        let params = ChainParams {
            initial_bits: GENESIS_BITS,
            target_block_time: Duration::from_secs(2),
            retarget_window: 32,
        };
        let cancel = CancelToken::new();
        let mut bc = Blockchain::new(&params, &cancel).unwrap();
        for _ in 0..64 {
            bc.mine_next(&cancel).unwrap();
        }
        let average = bc.average_block_time(32, 64).unwrap();
        assert!((1.5..=3.0).contains(&average), "average {average}s");
    }
}
