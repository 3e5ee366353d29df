//! Threefry-2xW counter-based cipher
//!
//! Threefish-derived bijection from Salmon et al. "Parallel Random Numbers:
//! As Easy as 1, 2, 3" (2011). For a fixed key and round count the map
//! counter -> output is a permutation of the 2-word counter space.
//!
//! # Algorithms
//!
//! - `threefry2x32`: 2 x 32-bit words (the device kernel variant)
//! - `threefry2x64`: 2 x 64-bit words
//!
//! Both share one round structure: a mix step per round with a rotation
//! taken from an 8-entry table, and a key injection after every fourth
//! round.

mod reference;
mod stream;

pub use reference::{THREEFRY2X32_20_VECTORS, THREEFRY2X64_20_VECTORS, self_test};
pub use stream::ThreefryRng;

use crate::error::{Error, Result};

/// Skein key schedule parity constant (32-bit words)
pub const SKEIN_KS_PARITY32: u32 = 0x1BD11BDA;

/// Skein key schedule parity constant (64-bit words)
pub const SKEIN_KS_PARITY64: u64 = 0x1BD11BDAA9FC1A22;

/// Rotation schedule for Threefry-2x32
pub const THREEFRY2X32_ROTATIONS: [u32; 8] = [13, 15, 26, 6, 17, 29, 16, 24];

/// Rotation schedule for Threefry-2x64
pub const THREEFRY2X64_ROTATIONS: [u32; 8] = [16, 42, 12, 31, 16, 32, 24, 21];

/// A 2-word counter: a position in the stream
pub type Counter<W> = [W; 2];

/// A 2-word key: selects the stream
pub type Key<W> = [W; 2];

/// Word type the cipher operates on
pub trait Word: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Word width in bits
    const BITS: u32;
    /// Parity constant folded into the third key-schedule word
    const PARITY: Self;
    /// Rotation amounts, indexed by `round % 8`
    const ROTATIONS: [u32; 8];

    /// Modular addition
    fn wrapping_add(self, rhs: Self) -> Self;
    /// Bit rotation to the left
    fn rotate_left(self, n: u32) -> Self;
    /// Exclusive or
    fn xor(self, rhs: Self) -> Self;
    /// Widen a small injection counter into a word
    fn from_u32(v: u32) -> Self;
}

impl Word for u32 {
    const BITS: u32 = 32;
    const PARITY: Self = SKEIN_KS_PARITY32;
    const ROTATIONS: [u32; 8] = THREEFRY2X32_ROTATIONS;

    #[inline(always)]
    fn wrapping_add(self, rhs: Self) -> Self {
        u32::wrapping_add(self, rhs)
    }

    #[inline(always)]
    fn rotate_left(self, n: u32) -> Self {
        u32::rotate_left(self, n)
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        self ^ rhs
    }

    #[inline(always)]
    fn from_u32(v: u32) -> Self {
        v
    }
}

impl Word for u64 {
    const BITS: u32 = 64;
    const PARITY: Self = SKEIN_KS_PARITY64;
    const ROTATIONS: [u32; 8] = THREEFRY2X64_ROTATIONS;

    #[inline(always)]
    fn wrapping_add(self, rhs: Self) -> Self {
        u64::wrapping_add(self, rhs)
    }

    #[inline(always)]
    fn rotate_left(self, n: u32) -> Self {
        u64::rotate_left(self, n)
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        self ^ rhs
    }

    #[inline(always)]
    fn from_u32(v: u32) -> Self {
        v as u64
    }
}

// ============================================================================
// Round count
// ============================================================================

/// Number of mixing rounds, validated to lie in `[0, 32]`
///
/// Key injection points are only defined up to round 32, so larger counts
/// are rejected when the value is constructed rather than at dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rounds(u32);

impl Rounds {
    /// Canonical round count
    pub const DEFAULT: Rounds = Rounds(20);
    /// Largest permitted round count
    pub const MAX: Rounds = Rounds(32);

    /// Validate a round count
    ///
    /// # Errors
    ///
    /// Returns `InvalidRoundCount` for negative values and values above 32.
    pub fn new(rounds: i64) -> Result<Self> {
        if (0..=Self::MAX.0 as i64).contains(&rounds) {
            Ok(Self(rounds as u32))
        } else {
            Err(Error::InvalidRoundCount { rounds })
        }
    }

    /// The round count as an integer
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Rounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Rounds {
    type Error = Error;

    fn try_from(rounds: i64) -> Result<Self> {
        Self::new(rounds)
    }
}

impl TryFrom<u32> for Rounds {
    type Error = Error;

    fn try_from(rounds: u32) -> Result<Self> {
        Self::new(rounds as i64)
    }
}

impl std::fmt::Display for Rounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Mixing function
// ============================================================================

/// Derive the 3-word key schedule
#[inline(always)]
pub fn key_schedule<W: Word>(key: Key<W>) -> [W; 3] {
    [key[0], key[1], W::PARITY.xor(key[0]).xor(key[1])]
}

/// One mix step: `x0 += x1; x1 = rotl(x1, R[r % 8]) ^ x0`
#[inline(always)]
fn mix_round<W: Word>(x: &mut [W; 2], r: u32) {
    x[0] = x[0].wrapping_add(x[1]);
    x[1] = x[1].rotate_left(W::ROTATIONS[(r % 8) as usize]);
    x[1] = x[1].xor(x[0]);
}

/// Inject the key schedule after the `inject`-th group of four rounds
#[inline(always)]
fn inject_key<W: Word>(x: &mut [W; 2], ks: &[W; 3], inject: u32) {
    let d = inject as usize;
    x[0] = x[0].wrapping_add(ks[d % 3]);
    x[1] = x[1]
        .wrapping_add(ks[(d + 1) % 3])
        .wrapping_add(W::from_u32(inject));
}

/// Threefry-2xW with an explicit round count
#[inline]
pub fn threefry2x<W: Word>(ctr: Counter<W>, key: Key<W>, rounds: Rounds) -> [W; 2] {
    let ks = key_schedule(key);
    let mut x = [ctr[0].wrapping_add(ks[0]), ctr[1].wrapping_add(ks[1])];

    for r in 0..rounds.get() {
        mix_round(&mut x, r);
        let completed = r + 1;
        if completed.is_multiple_of(4) {
            inject_key(&mut x, &ks, completed / 4);
        }
    }

    x
}

/// Threefry-2x32 with an explicit round count
#[inline]
pub fn threefry2x32(ctr: Counter<u32>, key: Key<u32>, rounds: Rounds) -> [u32; 2] {
    threefry2x(ctr, key, rounds)
}

/// Threefry-2x32-20
#[inline]
pub fn threefry2x32_20(ctr: Counter<u32>, key: Key<u32>) -> [u32; 2] {
    threefry2x(ctr, key, Rounds::DEFAULT)
}

/// Threefry-2x64 with an explicit round count
#[inline]
pub fn threefry2x64(ctr: Counter<u64>, key: Key<u64>, rounds: Rounds) -> [u64; 2] {
    threefry2x(ctr, key, rounds)
}

/// Threefry-2x64-20
#[inline]
pub fn threefry2x64_20(ctr: Counter<u64>, key: Key<u64>) -> [u64; 2] {
    threefry2x(ctr, key, Rounds::DEFAULT)
}

/// Pack a 2x32 output as one 64-bit value (`x1` in the high half)
#[inline]
pub fn pack2x32(x: [u32; 2]) -> u64 {
    ((x[1] as u64) << 32) | x[0] as u64
}

/// Split a 64-bit counter index into a 2x32 counter (low word first)
#[inline]
pub fn counter2x32(index: u64) -> Counter<u32> {
    [index as u32, (index >> 32) as u32]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rounds_bounds() {
        assert_eq!(Rounds::new(0).unwrap().get(), 0);
        assert_eq!(Rounds::new(32).unwrap(), Rounds::MAX);
        assert!(matches!(
            Rounds::new(33),
            Err(Error::InvalidRoundCount { rounds: 33 })
        ));
        assert!(matches!(
            Rounds::new(-1),
            Err(Error::InvalidRoundCount { rounds: -1 })
        ));
        assert!(Rounds::try_from(u32::MAX).is_err());
        assert_eq!(Rounds::default(), Rounds::DEFAULT);
    }

    #[test]
    fn test_zero_rounds_is_key_addition() {
        let ctr = [0xFFFF_FFF0u32, 7];
        let key = [0x20u32, 0xDEAD_BEEF];
        let out = threefry2x32(ctr, key, Rounds::new(0).unwrap());
        assert_eq!(out, [0x10, 0xDEAD_BEF6]);
    }

    #[test]
    fn test_key_schedule_parity() {
        let ks = key_schedule([0u32, 0]);
        assert_eq!(ks, [0, 0, SKEIN_KS_PARITY32]);
        let ks = key_schedule([1u64, 2]);
        assert_eq!(ks[2], SKEIN_KS_PARITY64 ^ 3);
    }

    #[test]
    fn test_known_answers_2x32() {
        assert_eq!(threefry2x32_20([0, 0], [0, 0]), [0x6b200159, 0x99ba4efe]);
        assert_eq!(
            threefry2x32_20([u32::MAX, u32::MAX], [u32::MAX, u32::MAX]),
            [0x1cb996fc, 0xbb002be7]
        );
        assert_eq!(
            threefry2x32_20([0x243f6a88, 0x85a308d3], [0x13198a2e, 0x03707344]),
            [0xc4923a9c, 0x483df7a0]
        );
        assert_eq!(
            threefry2x32([0, 0], [0, 0], Rounds::new(13).unwrap()),
            [0x9d1c5ec6, 0x8bd50731]
        );
    }

    #[test]
    fn test_known_answers_2x64() {
        assert_eq!(
            threefry2x64_20([u64::MAX, u64::MAX], [u64::MAX, u64::MAX]),
            [0xe02cb7c4d95d277a, 0xd06633d0893b8b68]
        );
        assert_eq!(
            threefry2x64_20(
                [0x243f6a8885a308d3, 0x13198a2e03707344],
                [0xa4093822299f31d0, 0x082efa98ec4e6c89]
            ),
            [0x263c7d30bb0f0af1, 0x56be8361d3311526]
        );
    }

    #[test]
    fn test_max_rounds() {
        let out = threefry2x32([0, 0], [0, 0], Rounds::MAX);
        assert_eq!(out, [0xcee3d47e, 0xa23dfd5c]);
    }

    #[test]
    fn test_bijective_over_low_counters() {
        let key = [0x1234_5678, 0x9abc_def0];
        let mut seen = HashSet::with_capacity(1 << 16);
        for i in 0..=u16::MAX as u32 {
            let out = threefry2x32_20([i, 0], key);
            assert!(seen.insert(pack2x32(out)), "duplicate output for counter {}", i);
        }
    }

    #[test]
    fn test_pack_and_split() {
        assert_eq!(pack2x32([0x6b200159, 0x99ba4efe]), 0x99ba4efe6b200159);
        assert_eq!(counter2x32(0x1_0000_0002), [2, 1]);
    }
}
