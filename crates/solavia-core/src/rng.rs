//! Deterministic random generators.
//!
//! - [`ChainedRng`]: SHA-256 hash chain. Cryptographic, slow, used for
//!   identifiers (UUIDs) and for seeding per-entity generators.
//! - [`FastPrng`]: xoshiro128** style generator. Non-cryptographic, used for
//!   per-agent decisions.
//!
//! Both are pure functions of (seed, draw count). The constants and update
//! order are part of the cross-implementation contract.

use sha2::{Digest as _, Sha256};

/// SHA-256 hash-chain generator.
///
/// `state₀ = H(seed)`; every output byte advances `state ← H(state)` and
/// emits byte 0 of the new state.
#[derive(Clone)]
pub struct ChainedRng {
    state: [u8; 32],
    draws: u64,
}

impl ChainedRng {
    /// Seed from arbitrary bytes (typically the hex text of the host seed).
    pub fn new(seed: impl AsRef<[u8]>) -> Self {
        Self {
            state: Sha256::digest(seed.as_ref()).into(),
            draws: 0,
        }
    }

    /// Produce `n` bytes, one hash iteration each.
    pub fn next_bytes(&mut self, n: usize) -> Vec<u8> {
        (0..n).map(|_| self.next_byte()).collect()
    }

    fn next_byte(&mut self) -> u8 {
        self.state = Sha256::digest(self.state).into();
        self.draws += 1;
        self.state[0]
    }

    /// Next big-endian `u32`.
    pub fn next_u32(&mut self) -> u32 {
        let b = [self.next_byte(), self.next_byte(), self.next_byte(), self.next_byte()];
        u32::from_be_bytes(b)
    }

    /// Uniform-ish integer in `0..max` (modulo reduction). Zero when `max == 0`.
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        self.next_u32() % max
    }

    /// A version-4 formatted UUID drawn from the stream.
    pub fn uuid(&mut self) -> String {
        let mut b = self.next_bytes(16);
        b[6] = (b[6] & 0x0f) | 0x40;
        b[8] = (b[8] & 0x3f) | 0x80;
        let hex = hex::encode(&b);
        format!(
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }

    /// Number of bytes drawn so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }
}

impl std::fmt::Debug for ChainedRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChainedRng(draws={})", self.draws)
    }
}

/// Fast 128-bit-state generator (xoshiro128** core).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastPrng {
    state: [u32; 4],
}

impl FastPrng {
    /// Expand a 32-bit seed into four state words with xorshift(13, 17, 5),
    /// keeping every intermediate value.
    pub fn new(seed: u32) -> Self {
        let mut s = seed;
        let mut state = [0u32; 4];
        for word in state.iter_mut() {
            s ^= s << 13;
            s ^= s >> 17;
            s ^= s << 5;
            *word = s;
        }
        Self { state }
    }

    /// Current state words.
    pub fn state(&self) -> [u32; 4] {
        self.state
    }

    /// Next 32-bit output.
    pub fn next(&mut self) -> u32 {
        let s = &mut self.state;
        let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = s[1] << 9;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(11);

        result
    }

    /// `next() / 0xFFFFFFFF`, in `[0, 1]` inclusive.
    pub fn next_float(&mut self) -> f64 {
        f64::from(self.next()) / f64::from(u32::MAX)
    }

    /// `floor(next_float() * max)`.
    ///
    /// Returns `max` itself when `next()` hits `u32::MAX`.
    pub fn next_int(&mut self, max: u32) -> u32 {
        (self.next_float() * f64::from(max)).floor() as u32
    }
}
