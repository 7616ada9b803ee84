//! Structural hashing.
//!
//! Nodes are compared by a rolling multiplicative hash (`h = h * 33 + x`) over
//! their component identity, properties, and children. The hash is computed
//! once when a node is built and is never recomputed. Two nodes with equal
//! hashes are treated as describing the same subtree; collisions are accepted
//! as non-events.
//!
//! Hashing is explicit: every hashable type implements [`StructuralHash`]
//! instead of relying on [`core::hash::Hash`], so results are deterministic
//! across runs and platforms.

/// Seed of every rolling hash.
pub const SEED: u64 = 5381;

/// Folds `value` into the running hash `hash`.
#[inline]
#[must_use]
pub const fn combine(hash: u64, value: u64) -> u64 {
    hash.wrapping_mul(33).wrapping_add(value)
}

/// Hashes a byte slice starting from [`SEED`].
#[must_use]
pub fn bytes(data: &[u8]) -> u64 {
    data.iter()
        .fold(SEED, |hash, &byte| combine(hash, u64::from(byte)))
}

/// Hashes a string starting from [`SEED`].
#[inline]
#[must_use]
pub fn str(value: &str) -> u64 {
    bytes(value.as_bytes())
}

/// Types with an explicit, deterministic structural hash.
pub trait StructuralHash {
    /// Returns the structural hash of `self`.
    fn structural_hash(&self) -> u64;
}

impl StructuralHash for str {
    fn structural_hash(&self) -> u64 {
        str(self)
    }
}

impl StructuralHash for String {
    fn structural_hash(&self) -> u64 {
        str(self)
    }
}

impl StructuralHash for bool {
    fn structural_hash(&self) -> u64 {
        u64::from(*self)
    }
}

impl StructuralHash for i64 {
    #[allow(clippy::cast_sign_loss)]
    fn structural_hash(&self) -> u64 {
        *self as u64
    }
}

impl StructuralHash for f64 {
    fn structural_hash(&self) -> u64 {
        // normalise -0.0 so that it hashes like 0.0
        if *self == 0.0 { 0 } else { self.to_bits() }
    }
}

impl<T: StructuralHash> StructuralHash for [T] {
    fn structural_hash(&self) -> u64 {
        self.iter()
            .fold(SEED, |hash, item| combine(hash, item.structural_hash()))
    }
}

impl<T: StructuralHash> StructuralHash for Option<T> {
    fn structural_hash(&self) -> u64 {
        self.as_ref().map_or(0, StructuralHash::structural_hash)
    }
}
