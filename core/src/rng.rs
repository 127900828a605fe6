//! Seeded hash RNG shared by every generation system.
//!
//! The stream is a bit-exact port of the browser client's generator: the seed's
//! string form is folded with FNV-1a over UTF-16 code units, and draws come
//! from Mulberry32. Every client must produce the same sequence for the same
//! seed, so the constants and the operation order here are frozen.

use crate::SessionSeed;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;
const MULBERRY_INCREMENT: u32 = 0x6d2b_79f5;
const UNIT_SCALE: f64 = 4_294_967_296.0;

/// Folds the provided seed text into the initial 32-bit generator state.
#[must_use]
pub fn hash_seed(text: &str) -> u32 {
    text.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// Deterministic pseudo-random stream derived from a [`SessionSeed`].
///
/// Each logical consumer owns its own instance. Generation systems construct
/// a fresh instance per evaluated block or slot instead of continuing a shared
/// stream, so results never depend on how many draws happened elsewhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeededHashRng {
    state: u32,
}

impl SeededHashRng {
    /// Creates a generator whose state is the hash of the seed's string form.
    #[must_use]
    pub fn new(seed: &SessionSeed) -> Self {
        Self::from_state(hash_seed(seed.as_str()))
    }

    /// Creates a generator that resumes from a previously captured state.
    #[must_use]
    pub const fn from_state(state: u32) -> Self {
        Self { state }
    }

    /// Current internal state.
    #[must_use]
    pub const fn state(&self) -> u32 {
        self.state
    }

    /// Advances the generator and returns the next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Returns a float in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        f64::from(self.next_u32()) / UNIT_SCALE
    }

    /// Returns a float in `[min, max)`.
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next() * (max - min)
    }

    /// Returns an integer in `[min, max)`; yields `min` when the range is empty.
    pub fn range_int(&mut self, min: i64, max: i64) -> i64 {
        self.range(min as f64, max as f64).floor() as i64
    }

    /// Returns `true` with the provided probability.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next() < probability
    }

    /// Picks a uniformly distributed element, or `None` for an empty slice.
    ///
    /// No draw is consumed when the slice is empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.pick_index(items.len())?;
        items.get(index)
    }

    /// Picks a uniformly distributed index below `len`, or `None` when `len` is zero.
    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let index = self.range_int(0, len as i64);
        usize::try_from(index).ok().filter(|index| *index < len)
    }
}
