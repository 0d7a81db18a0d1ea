//! Eight-word mixing pool.
//!
//! The pool is keyed once from a cryptographically strong source and then
//! continuously stirred: by ambient events, by its own draw counter, and
//! by every word it hands out (feed-forward, so one leaked output does not
//! reveal the pool).

use super::source::{os_source, passphrase_source, EntropyError};
use crate::protocol::SeedBatch;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, OsRng, RngCore};

/// Pool size in words.
pub const POOL_WORDS: usize = 8;

/// Rotation applied to incoming words.
const STIR_ROTATION: u32 = 7;
/// Odd multiplier of the avalanche step.
const STIR_MULTIPLIER: u32 = 0x9E37_79B1;
/// Rotation of the closing rotate-XOR.
const STIR_AVALANCHE: u32 = 13;

/// Mixes one incoming word into a pool slot.
#[inline]
fn stir_slot(slot: u32, word: u32) -> u32 {
    let x = (slot ^ word.rotate_left(STIR_ROTATION)).wrapping_mul(STIR_MULTIPLIER);
    x ^ x.rotate_left(STIR_AVALANCHE)
}

/// Entropy pool over a strong word source `R`.
#[derive(Clone)]
pub struct EntropyPool<R = OsRng> {
    pool: [u32; POOL_WORDS],
    cursor: usize,
    counter: u64,
    source: R,
    words_stirred: u64,
}

impl EntropyPool<OsRng> {
    /// Creates a pool keyed from the operating system generator.
    pub fn from_os() -> Result<Self, EntropyError> {
        Self::new(os_source()?)
    }
}

impl EntropyPool<ChaCha20Rng> {
    /// Creates a reproducible pool keyed from a passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut source = passphrase_source(passphrase);
        let pool = std::array::from_fn(|_| source.next_u32());
        Self::with_pool(pool, source)
    }
}

impl<R: RngCore + CryptoRng> EntropyPool<R> {
    /// Creates a pool keyed from `source`.
    ///
    /// Fails if the source cannot produce the initial pool words.
    pub fn new(mut source: R) -> Result<Self, EntropyError> {
        let mut bytes = [0u8; POOL_WORDS * 4];
        source
            .try_fill_bytes(&mut bytes)
            .map_err(|e| EntropyError::SourceUnavailable(e.to_string()))?;

        let mut pool = [0u32; POOL_WORDS];
        for (word, chunk) in pool.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        Ok(Self::with_pool(pool, source))
    }

    /// Every constructor keys through here.
    fn with_pool(pool: [u32; POOL_WORDS], source: R) -> Self {
        tracing::debug!(words = POOL_WORDS, "Entropy pool keyed");
        Self {
            pool,
            cursor: 0,
            counter: 0,
            source,
            words_stirred: 0,
        }
    }

    /// Folds one word into the slot under the cursor and advances it.
    #[inline]
    pub fn stir(&mut self, word: u32) {
        self.pool[self.cursor] = stir_slot(self.pool[self.cursor], word);
        self.cursor = (self.cursor + 1) % POOL_WORDS;
        self.words_stirred += 1;
    }

    /// Draws one output word.
    ///
    /// Advances the counter and stirs it in, combines a fresh strong word
    /// with the slot selected by the counter, and stirs the result back.
    pub fn next_word(&mut self) -> u32 {
        self.counter += 1;
        self.stir(self.counter as u32);

        let fresh = self.source.next_u32();
        let out = fresh ^ self.pool[(self.counter % POOL_WORDS as u64) as usize];
        self.stir(out);
        out
    }

    /// Draws `n` words in order as a batch.
    ///
    /// Best effort: the words are no better than the mixing function.
    pub fn next_words(&mut self, n: usize) -> SeedBatch {
        SeedBatch::new((0..n).map(|_| self.next_word()).collect())
    }

    /// Current cursor position (always `< POOL_WORDS`).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of words drawn so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Total stir operations (ambient, counter and feed-forward).
    pub fn words_stirred(&self) -> u64 {
        self.words_stirred
    }

    #[cfg(test)]
    pub(crate) fn words(&self) -> [u32; POOL_WORDS] {
        self.pool
    }
}

impl<R> std::fmt::Debug for EntropyPool<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropyPool")
            .field("cursor", &self.cursor)
            .field("counter", &self.counter)
            .field("words_stirred", &self.words_stirred)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand_core::SeedableRng;

    fn seeded(seed: u64) -> EntropyPool<ChaCha20Rng> {
        EntropyPool::new(ChaCha20Rng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_stir_touches_only_cursor_slot() {
        let mut pool = seeded(1);
        let before = pool.words();

        pool.stir(0x1234_5678);

        let after = pool.words();
        assert_ne!(after[0], before[0]);
        assert_eq!(after[1..], before[1..]);
        assert_eq!(pool.cursor(), 1);
    }

    #[test]
    fn test_cursor_wraps() {
        let mut pool = seeded(2);
        for _ in 0..POOL_WORDS {
            pool.stir(0);
        }
        assert_eq!(pool.cursor(), 0);
    }

    #[test]
    fn test_next_word_combines_fresh_and_slot() {
        let mut pool = seeded(3);
        let mut shadow = ChaCha20Rng::seed_from_u64(3);
        shadow.fill_bytes(&mut [0u8; POOL_WORDS * 4]);

        let mut expected = pool.clone();
        expected.stir(1);
        let slot = expected.words()[1];

        let out = pool.next_word();
        assert_eq!(out, shadow.next_u32() ^ slot);
        assert_eq!(pool.counter(), 1);
        assert_eq!(pool.cursor(), 2);
    }

    #[test]
    fn test_output_fed_forward() {
        let mut pool = seeded(4);
        let mut expected = pool.clone();

        let out = pool.next_word();
        expected.stir(1);
        expected.stir(out);

        assert_eq!(pool.words(), expected.words());
    }

    #[test]
    fn test_next_words_order_and_length() {
        let mut a = seeded(5);
        let mut b = seeded(5);

        let batch = a.next_words(8);
        let singles: Vec<u32> = (0..8).map(|_| b.next_word()).collect();

        assert_eq!(batch.words(), singles.as_slice());
        assert!(a.next_words(0).is_empty());
    }

    #[test]
    fn test_ambient_stirring_changes_output() {
        let mut quiet = seeded(6);
        let mut stirred = seeded(6);
        stirred.stir(0xCAFE_F00D);

        assert_ne!(quiet.next_word(), stirred.next_word());
    }

    #[test]
    fn test_passphrase_pool_reproducible() {
        let mut a = EntropyPool::from_passphrase("forest");
        let mut b = EntropyPool::from_passphrase("forest");
        assert_eq!(a.next_words(16), b.next_words(16));
    }

    /// Counts events emitted from this module.
    struct PoolEvents(std::sync::Arc<std::sync::atomic::AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for PoolEvents {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if event.metadata().module_path() == Some(module_path!().trim_end_matches("::tests")) {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_every_source_logs_keying() {
        use tracing_subscriber::layer::SubscriberExt;

        let count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(PoolEvents(count.clone()));
        tracing::subscriber::with_default(subscriber, || {
            let _ = EntropyPool::from_passphrase("logged");
            assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
            let _ = seeded(3);
            assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn test_os_pool_constructs() {
        let mut pool = EntropyPool::from_os().unwrap();
        assert_eq!(pool.next_words(8).len(), 8);
    }

    proptest! {
        #[test]
        fn prop_cursor_in_range(words in proptest::collection::vec(any::<u32>(), 0..100)) {
            let mut pool = seeded(7);
            for (i, &w) in words.iter().enumerate() {
                pool.stir(w);
                prop_assert!(pool.cursor() < POOL_WORDS);
                prop_assert_eq!(pool.cursor(), (i + 1) % POOL_WORDS);
            }
        }
    }
}
