// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Splittable random key. Splitting is a pure function of the key, so a fixed
/// root key and a fixed traversal order reproduce every derived key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrngKey(u64);

impl PrngKey {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Key derived from the process-wide base seed.
    pub fn from_config() -> Self {
        Self(spiral_config::config().base_seed)
    }

    /// Key derived from the process-wide base seed and a component label.
    pub fn for_label(label: &str) -> Self {
        Self(spiral_config::seed_for(label))
    }

    /// Returns `(carry, sub)`: `carry` continues the chain, `sub` is handed to
    /// exactly one consumer.
    pub fn split(self) -> (PrngKey, PrngKey) {
        let mut stream = ChaCha8Rng::seed_from_u64(self.0);
        let carry = stream.next_u64();
        let sub = stream.next_u64();
        (PrngKey(carry), PrngKey(sub))
    }

    /// Splits off `n` sub-keys in chain order.
    pub fn split_n(self, n: usize) -> Vec<PrngKey> {
        let mut carry = self;
        let mut keys = Vec::with_capacity(n);
        for _ in 0..n {
            let (next, sub) = carry.split();
            keys.push(sub);
            carry = next;
        }
        keys
    }

    /// Random stream for initializers that consume this key.
    pub fn rng(self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.0)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PrngKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrngKey({:#018x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn split_is_pure() {
        let key = PrngKey::new(0);
        assert_eq!(key.split(), key.split());
        let (carry, sub) = key.split();
        assert_ne!(carry, sub);
        assert_ne!(carry, key);
    }

    #[test]
    fn chained_splits_are_distinct_and_stable() {
        let first = PrngKey::new(7).split_n(256);
        let second = PrngKey::new(7).split_n(256);
        assert_eq!(first, second);
        let unique: HashSet<_> = first.iter().copied().collect();
        assert_eq!(unique.len(), first.len());
    }

    #[test]
    fn labelled_keys_follow_the_configured_seed() {
        assert_eq!(PrngKey::for_label("encoder"), PrngKey::for_label("encoder"));
        assert_ne!(PrngKey::for_label("encoder"), PrngKey::for_label("decoder"));
        assert_eq!(PrngKey::from_config().raw(), spiral_config::config().base_seed);
    }

    #[test]
    fn different_roots_diverge() {
        assert_ne!(PrngKey::new(1).split_n(4), PrngKey::new(2).split_n(4));
    }
}
