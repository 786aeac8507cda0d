//! Sparse byte n-gram counting.
//!
//! N-grams are counted with a stride-1 sliding window over a single
//! logical block and keyed by a packed big-endian integer, so a bigram
//! `[b0, b1]` becomes `b0 * 256 + b1` and a trigram `[b0, b1, b2]`
//! becomes `b0 * 65536 + b1 * 256 + b2`. The encoding is internal; it
//! only has to agree between reference and query, and it does because
//! both go through this module.
//!
//! Counting is per block: feeding two blocks never forms an n-gram that
//! straddles the boundary between them. Callers that want cross-chunk
//! n-grams must concatenate first.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// N-gram order supported by the recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Two-byte n-grams.
    Bigram,
    /// Three-byte n-grams.
    Trigram,
}

impl Order {
    /// N-gram width in bytes.
    pub fn width(self) -> usize {
        match self {
            Order::Bigram => 2,
            Order::Trigram => 3,
        }
    }

    /// Size of the key universe, `256^n`.
    pub fn universe(self) -> u64 {
        match self {
            Order::Bigram => 1 << 16,
            Order::Trigram => 1 << 24,
        }
    }

    /// Both orders, in ascending length.
    pub const ALL: [Order; 2] = [Order::Bigram, Order::Trigram];
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Bigram => write!(f, "bigrams"),
            Order::Trigram => write!(f, "trigrams"),
        }
    }
}

/// Sparse occurrence counts for one n-gram order.
///
/// Keys absent from the map have an implicit count of zero. Counts are
/// plain occurrence totals times the block weight; the profile builder
/// turns them into probabilities.
#[derive(Debug, Clone)]
pub struct NgramCounts {
    order: Order,
    counts: HashMap<u32, u64>,
    total: u64,
}

impl NgramCounts {
    /// Create an empty count map for `order`.
    pub fn new(order: Order) -> Self {
        Self {
            order,
            counts: HashMap::new(),
            total: 0,
        }
    }

    /// Count all n-grams of one block.
    pub fn from_block(order: Order, data: &[u8]) -> Self {
        let mut counts = Self::new(order);
        counts.add_block(data);
        counts
    }

    /// Add the n-grams of one more block, weight 1.
    pub fn add_block(&mut self, data: &[u8]) {
        self.add_block_weighted(data, 1);
    }

    /// Add the n-grams of one more block, each occurrence counting
    /// `weight` times.
    ///
    /// This is the "repeat the corpus" mechanism: scaling the counts is
    /// numerically equivalent to concatenating `weight` copies of the
    /// block (up to the `weight - 1` junction n-grams, which real
    /// repetition would fabricate and this does not).
    pub fn add_block_weighted(&mut self, data: &[u8], weight: u64) {
        if weight == 0 {
            return;
        }
        let n = self.order.width();
        if data.len() < n {
            return;
        }
        match self.order {
            Order::Bigram => {
                for pair in data.windows(2) {
                    let key = u32::from(pair[0]) << 8 | u32::from(pair[1]);
                    *self.counts.entry(key).or_insert(0) += weight;
                }
            }
            Order::Trigram => {
                for tri in data.windows(3) {
                    let key =
                        u32::from(tri[0]) << 16 | u32::from(tri[1]) << 8 | u32::from(tri[2]);
                    *self.counts.entry(key).or_insert(0) += weight;
                }
            }
        }
        self.total += (data.len() - n + 1) as u64 * weight;
    }

    /// N-gram order of this map.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Number of distinct n-grams seen.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// True when no n-gram has been counted.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over `(key, count)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.counts.iter().map(|(&k, &v)| (k, v))
    }

    /// Count for one packed key (zero when absent).
    pub fn get(&self, key: u32) -> u64 {
        self.counts.get(&key).copied().unwrap_or(0)
    }
}
