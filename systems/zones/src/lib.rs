#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic zone sequencing.
//!
//! The track is cut into blocks of `segment_length` tiles. Each block draws its
//! zone from a generator seeded with the session seed followed by
//! `block * 9999` in decimal, so any block can be evaluated in any order, by any
//! client, with the same result.

use dash_runner_config::GameConfig;
use dash_runner_core::{SeededHashRng, SessionSeed, TrackIndex, Zone, ZoneBlock};

const BLOCK_SEED_STRIDE: u64 = 9_999;

/// Maps track indices onto zones for one session.
#[derive(Clone, Debug)]
pub struct ZoneSequencer {
    seed: SessionSeed,
    segment_length: u64,
    sequence: Vec<Zone>,
}

impl ZoneSequencer {
    /// Creates a sequencer for the provided seed using the zone tunables of `config`.
    #[must_use]
    pub fn new(seed: SessionSeed, config: &GameConfig) -> Self {
        Self {
            seed,
            segment_length: config.zones.segment_length,
            sequence: config.zones.sequence.clone(),
        }
    }

    /// Session seed driving the sequence.
    #[must_use]
    pub fn seed(&self) -> &SessionSeed {
        &self.seed
    }

    /// Number of track tiles per block.
    #[must_use]
    pub const fn segment_length(&self) -> u64 {
        self.segment_length
    }

    /// Block containing the provided index.
    #[must_use]
    pub const fn block_of(&self, index: TrackIndex) -> ZoneBlock {
        index.block(self.segment_length)
    }

    /// Zone of the block containing `index`.
    #[must_use]
    pub fn zone_at(&self, index: TrackIndex) -> Zone {
        self.zone_of_block(self.block_of(index))
    }

    /// Zone assigned to `block`.
    #[must_use]
    pub fn zone_of_block(&self, block: ZoneBlock) -> Zone {
        zone_of_block(&self.seed, block, &self.sequence)
    }

    /// Whether `index` lies within the first `gap` tiles of a block whose zone
    /// differs from the previous block's.
    #[must_use]
    pub fn in_transition(&self, index: TrackIndex, gap: u64) -> bool {
        let block = self.block_of(index);
        if block.get() == 0 {
            return false;
        }
        let into_block = index.get() - block.first_index(self.segment_length).get();
        if into_block >= gap {
            return false;
        }
        self.zone_of_block(block) != self.zone_of_block(ZoneBlock::new(block.get() - 1))
    }
}

/// Zone of the block containing `index` for the given seed and tunables.
#[must_use]
pub fn zone_at(index: TrackIndex, seed: &SessionSeed, config: &GameConfig) -> Zone {
    let block = index.block(config.zones.segment_length);
    zone_of_block(seed, block, &config.zones.sequence)
}

fn zone_of_block(seed: &SessionSeed, block: ZoneBlock, sequence: &[Zone]) -> Zone {
    let block_seed = seed.with_suffix(block.get().wrapping_mul(BLOCK_SEED_STRIDE));
    let mut rng = SeededHashRng::new(&block_seed);
    rng.pick(sequence).copied().unwrap_or(Zone::City)
}
