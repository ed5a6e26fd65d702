// crates/pw_core/src/seeds.rs
//
// Seed sequences for the multi-seed search. Both modes are pure functions
// of the base seed; the only nondeterminism permitted anywhere in the
// engine comes from the external generator's own seed contract.
//
// - deterministic mode: the fixed progression base, base+1, base+2, ...
// - drawn mode: ChaCha20 draws seeded from the base (no OS entropy)

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Infinite sequence of attempt seeds.
pub struct SeedSequence {
    mode: Mode,
}

enum Mode {
    Progression { next: u64 },
    Drawn(ChaCha20Rng),
}

impl SeedSequence {
    pub fn from_base(base: u64, deterministic: bool) -> Self {
        if deterministic {
            Self::progression(base)
        } else {
            Self::drawn(base)
        }
    }

    /// `base, base+1, base+2, ...` (wrapping).
    pub fn progression(base: u64) -> Self {
        Self {
            mode: Mode::Progression { next: base },
        }
    }

    /// ChaCha20 stream seeded from `base`: little-endian bytes in the first
    /// 8 positions of the 32-byte seed, the rest zero. The explicit mapping
    /// avoids endianness ambiguity across platforms.
    pub fn drawn(base: u64) -> Self {
        let mut seed32 = [0u8; 32];
        seed32[..8].copy_from_slice(&base.to_le_bytes());
        Self {
            mode: Mode::Drawn(ChaCha20Rng::from_seed(seed32)),
        }
    }
}

impl SeedSequence {
    /// The sequence is infinite; this is the loop-facing accessor.
    pub fn next_seed(&mut self) -> u64 {
        match &mut self.mode {
            Mode::Progression { next } => {
                let out = *next;
                *next = next.wrapping_add(1);
                out
            }
            Mode::Drawn(rng) => rng.next_u64(),
        }
    }
}

impl Iterator for SeedSequence {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        Some(self.next_seed())
    }
}
