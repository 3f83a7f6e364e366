//! Chunk boundary strategies.
//!
//! A strategy hands out a fresh [`BoundaryChecker`] for every chunk. The
//! checker sees the boundary bytes of each item in turn and says whether
//! the chunk ends after it. Because a checker only ever sees the items of
//! its own chunk, a boundary depends only on the items since the previous
//! boundary, which is what lets an edit re-synchronise with the chunks of
//! the unedited remainder.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Decides where chunks end.
pub trait BoundaryStrategy: Send + Sync + fmt::Debug {
    /// A checker for a new chunk.
    fn checker(&self) -> Box<dyn BoundaryChecker>;
}

/// Per-chunk boundary state.
pub trait BoundaryChecker {
    /// Feed the boundary bytes of one item. Returns `true` if the chunk
    /// should end after this item.
    fn write(&mut self, item: &[u8]) -> bool;
}

/// Configuration for the boundary strategy used when building collections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ChunkerConfig {
    /// Content-defined chunking with a rolling hash.
    Rolling {
        /// Bytes in the rolling window.
        window: usize,
        /// A boundary falls where the low `pattern_bits` of the hash are
        /// all set, so chunks average `2^pattern_bits` items.
        pattern_bits: u32,
        /// Hard upper bound on items per chunk.
        max_items: usize,
    },
    /// Every chunk holds exactly `items` items (the last may hold fewer).
    Fixed { items: usize },
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::Rolling {
            window: 64,
            pattern_bits: 10,
            max_items: 8192,
        }
    }
}

impl ChunkerConfig {
    pub fn build(&self) -> Box<dyn BoundaryStrategy> {
        match *self {
            Self::Rolling {
                window,
                pattern_bits,
                max_items,
            } => Box::new(RollingHashBoundary::new(window, pattern_bits, max_items)),
            Self::Fixed { items } => Box::new(FixedSizeBoundary::new(items)),
        }
    }
}

// =============================================================================
// Rolling hash
// =============================================================================

const fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

const fn buzhash_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut state = 0u64;
    let mut i = 0;
    while i < 256 {
        state = splitmix64(state);
        table[i] = (state >> 32) as u32;
        i += 1;
    }
    table
}

static BUZHASH: [u32; 256] = buzhash_table();

/// Content-defined boundaries from a buzhash over the last `window` bytes.
#[derive(Clone, Debug)]
pub struct RollingHashBoundary {
    window: usize,
    mask: u32,
    max_items: usize,
}

impl RollingHashBoundary {
    pub fn new(window: usize, pattern_bits: u32, max_items: usize) -> Self {
        let bits = pattern_bits.min(31);
        Self {
            window: window.max(1),
            mask: (1u32 << bits) - 1,
            max_items: max_items.max(1),
        }
    }
}

impl BoundaryStrategy for RollingHashBoundary {
    fn checker(&self) -> Box<dyn BoundaryChecker> {
        Box::new(RollingChecker {
            window: vec![0; self.window],
            filled: 0,
            pos: 0,
            hash: 0,
            mask: self.mask,
            items: 0,
            max_items: self.max_items,
        })
    }
}

struct RollingChecker {
    window: Vec<u8>,
    filled: usize,
    pos: usize,
    hash: u32,
    mask: u32,
    items: usize,
    max_items: usize,
}

impl RollingChecker {
    fn roll(&mut self, byte: u8) {
        let size = self.window.len();
        self.hash = self.hash.rotate_left(1) ^ BUZHASH[byte as usize];
        if self.filled == size {
            let out = self.window[self.pos];
            self.hash ^= BUZHASH[out as usize].rotate_left((size % 32) as u32);
        } else {
            self.filled += 1;
        }
        self.window[self.pos] = byte;
        self.pos = (self.pos + 1) % size;
    }
}

impl BoundaryChecker for RollingChecker {
    fn write(&mut self, item: &[u8]) -> bool {
        for &byte in item {
            self.roll(byte);
        }
        self.items += 1;
        self.items >= self.max_items || self.hash & self.mask == self.mask
    }
}

// =============================================================================
// Fixed size
// =============================================================================

/// A boundary after every `items` items.
#[derive(Clone, Debug)]
pub struct FixedSizeBoundary {
    items: usize,
}

impl FixedSizeBoundary {
    pub fn new(items: usize) -> Self {
        Self {
            items: items.max(1),
        }
    }
}

impl BoundaryStrategy for FixedSizeBoundary {
    fn checker(&self) -> Box<dyn BoundaryChecker> {
        Box::new(FixedChecker {
            seen: 0,
            items: self.items,
        })
    }
}

struct FixedChecker {
    seen: usize,
    items: usize,
}

impl BoundaryChecker for FixedChecker {
    fn write(&mut self, _item: &[u8]) -> bool {
        self.seen += 1;
        self.seen >= self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundaries(strategy: &dyn BoundaryStrategy, items: &[Vec<u8>]) -> Vec<usize> {
        let mut checker = strategy.checker();
        let mut out = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if checker.write(item) {
                out.push(i);
                checker = strategy.checker();
            }
        }
        out
    }

    fn items(n: u32) -> Vec<Vec<u8>> {
        (0..n).map(|i| i.to_le_bytes().to_vec()).collect()
    }

    #[test]
    fn fixed_size_boundaries() {
        let strategy = FixedSizeBoundary::new(3);
        assert_eq!(boundaries(&strategy, &items(10)), vec![2, 5, 8]);
    }

    #[test]
    fn rolling_is_deterministic() {
        let strategy = RollingHashBoundary::new(16, 4, 1000);
        let data = items(2000);
        let first = boundaries(&strategy, &data);
        assert_eq!(first, boundaries(&strategy, &data));
        assert!(!first.is_empty());
    }

    #[test]
    fn rolling_respects_max_items() {
        let strategy = RollingHashBoundary::new(16, 31, 50);
        let cuts = boundaries(&strategy, &items(500));
        let mut prev = None;
        for cut in cuts {
            let len = cut - prev.map_or(0, |p: usize| p + 1) + 1;
            assert!(len <= 50);
            prev = Some(cut);
        }
    }

    #[test]
    fn rolling_boundaries_are_local() {
        // A boundary depends only on the items since the previous boundary,
        // so a prefix ending at a boundary does not change what follows.
        let strategy = RollingHashBoundary::new(8, 3, 1000);
        let data = items(400);
        let cuts = boundaries(&strategy, &data);
        let first = cuts[0];
        let rest = boundaries(&strategy, &data[first + 1..]);
        let shifted: Vec<usize> = cuts[1..].iter().map(|c| c - first - 1).collect();
        assert_eq!(rest, shifted);
    }

    #[test]
    fn config_serde() {
        let config = ChunkerConfig::Fixed { items: 2 };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"strategy":"fixed","items":2}"#);
        let back: ChunkerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        let default: ChunkerConfig =
            serde_json::from_str(&serde_json::to_string(&ChunkerConfig::default()).unwrap())
                .unwrap();
        assert_eq!(default, ChunkerConfig::default());
    }
}
