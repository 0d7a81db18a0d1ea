//! Per-channel xoshiro128++ generator.
//!
//! Fast and non-cryptographic. Strong material only enters through
//! [`GeneratorState::from_words`] (initial keying) and
//! [`GeneratorState::mix_entropy`] (periodic stirring).

/// Word rotations applied to incoming entropy, by position mod 4.
const MIX_ROTATIONS: [u32; 4] = [0, 5, 13, 21];

/// Discarded steps after every entropy mix.
pub const DIFFUSION_STEPS: usize = 8;

/// Non-zero word used when a state would otherwise collapse to zero.
const ZERO_ESCAPE: u32 = 0x9E37_79B9;

/// Fallback constants, one row per channel.
const FALLBACK: [[u32; 4]; 2] = [
    [0xA341_316C, 0xC801_3EA4, 0xAD90_777D, 0x7E95_761E],
    [0x5851_F42D, 0x4C95_7F2D, 0x1405_7B7E, 0xF767_814F],
];

/// 128-bit generator state (`s0..s3`).
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratorState {
    s: [u32; 4],
}

impl GeneratorState {
    /// Creates a state from four words.
    ///
    /// An all-zero input is a fixed point of the step function, so it is
    /// re-anchored to a non-zero word.
    pub fn from_words(words: [u32; 4]) -> Self {
        let mut state = Self { s: words };
        state.escape_zero();
        state
    }

    /// Weak provisional state derived from the host frame counter.
    ///
    /// Only used until real seed material arrives. `channel` selects a
    /// distinct constant row so the two channels never start equal.
    pub fn fallback(frame: u64, channel: usize) -> Self {
        let row = FALLBACK[channel % FALLBACK.len()];
        let lo = frame as u32;
        let hi = (frame >> 32) as u32;
        Self::from_words([
            row[0] ^ lo,
            row[1] ^ hi.rotate_left(7),
            row[2] ^ lo.rotate_left(16),
            row[3] ^ (lo ^ hi).rotate_left(25),
        ])
    }

    /// Returns the raw state words.
    #[inline]
    pub fn words(&self) -> [u32; 4] {
        self.s
    }

    /// Advances the state and returns the next 32-bit output.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let s = &mut self.s;
        let result = s[0].wrapping_add(s[3]).rotate_left(7).wrapping_add(s[0]);
        let t = s[1] << 9;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(11);

        result
    }

    /// Next white sample in `[-1, 1)`.
    #[inline]
    pub fn next_sample(&mut self) -> f64 {
        word_to_sample(self.next_u32())
    }

    /// Folds entropy words into the state and diffuses them.
    ///
    /// Word `i` is rotated by `MIX_ROTATIONS[i % 4]` and XORed into
    /// `s[i % 4]`, after which the generator is stepped
    /// [`DIFFUSION_STEPS`] times with the output thrown away. Returns the
    /// number of diffusion steps taken (zero for an empty slice, which is a
    /// no-op).
    pub fn mix_entropy(&mut self, words: &[u32]) -> usize {
        if words.is_empty() {
            return 0;
        }

        for (i, &word) in words.iter().enumerate() {
            self.s[i % 4] ^= word.rotate_left(MIX_ROTATIONS[i % 4]);
        }
        self.escape_zero();

        for _ in 0..DIFFUSION_STEPS {
            self.next_u32();
        }
        DIFFUSION_STEPS
    }

    fn escape_zero(&mut self) {
        if self.s == [0; 4] {
            self.s[0] = ZERO_ESCAPE;
        }
    }
}

impl std::fmt::Debug for GeneratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorState").finish_non_exhaustive()
    }
}

/// Maps a generator word onto `[-1, 1)`.
#[inline]
pub fn word_to_sample(word: u32) -> f64 {
    (word as f64) / 4_294_967_296.0 * 2.0 - 1.0
}
