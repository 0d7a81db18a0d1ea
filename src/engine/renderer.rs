//! The real-time noise engine.

use super::color::{BrownFilter, PinkFilter};
use super::crossfade::Crossfade;
use super::prng::GeneratorState;
use crate::config::EngineConfig;
use crate::protocol::{HostMessage, NoiseMode, RenderMessage, RenderPort, SeedBatch};
use std::collections::VecDeque;

/// Words needed by an `InitialSeeds` message (4 per channel).
pub const INITIAL_SEED_WORDS: usize = 8;

/// Seed requests are suppressed once this many batches are queued.
const REQUEST_QUEUE_DEPTH: usize = 2;

/// Keying status of the generator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Running on the frame-counter fallback seed.
    Provisional,
    /// Carrying strong material (initial seeds or mixed entropy).
    Keyed,
}

/// Counters describing engine activity.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    /// Frames rendered (one frame = one left + one right sample).
    pub frames_rendered: u64,
    /// Render calls served.
    pub blocks_rendered: u64,
    /// Entropy batches accepted into the pending queue.
    pub batches_received: u64,
    /// Entropy batches folded into the generators.
    pub batches_mixed: u64,
    /// Batches discarded because the pending queue was full.
    pub batches_dropped: u64,
    /// Messages ignored as malformed or out of turn.
    pub messages_ignored: u64,
    /// `NeedSeed` requests emitted.
    pub seed_requests: u64,
    /// Completed mode crossfades.
    pub crossfades: u64,
}

/// Per-channel generator and filter state.
#[derive(Debug, Clone)]
struct Channel {
    rng: GeneratorState,
    pink: PinkFilter,
    brown: BrownFilter,
}

impl Channel {
    fn new(rng: GeneratorState, sample_rate: f64, tau: f64) -> Self {
        Self {
            rng,
            pink: PinkFilter::new(),
            brown: BrownFilter::with_time_constant(sample_rate, tau),
        }
    }

    /// Produces `(pink, brown)` for the next white sample.
    #[inline]
    fn next(&mut self) -> (f64, f64) {
        let white = self.rng.next_sample();
        (self.pink.process(white), self.brown.process(white))
    }
}

/// Stereo pink/brown noise renderer.
///
/// Owns two independent generator states and never blocks: incoming
/// messages are drained with `try_recv`, at most one entropy batch is mixed
/// per render call, and every call fills its buffers completely.
pub struct NoiseEngine {
    left: Channel,
    right: Channel,
    fade: Crossfade,
    pending: VecDeque<SeedBatch>,
    pending_capacity: usize,
    port: Option<RenderPort>,
    key_state: KeyState,
    samples_since_request: u64,
    request_threshold: u64,
    sample_rate: f64,
    stats: EngineStats,
}

impl NoiseEngine {
    /// Creates an engine seeded from the host frame counter.
    ///
    /// The engine is detached until [`NoiseEngine::with_port`] links it to
    /// a host; messages can still be delivered directly through
    /// [`NoiseEngine::handle_message`].
    pub fn new(config: &EngineConfig, frame: u64) -> Self {
        let sample_rate = config.sample_rate.max(1) as f64;
        let tau = config.brown_time_constant_s;
        let pending_capacity = config.pending_capacity.max(REQUEST_QUEUE_DEPTH);

        tracing::debug!(
            sample_rate,
            frame,
            mode = %config.initial_mode,
            "Noise engine created on provisional seed"
        );

        Self {
            left: Channel::new(GeneratorState::fallback(frame, 0), sample_rate, tau),
            right: Channel::new(GeneratorState::fallback(frame, 1), sample_rate, tau),
            fade: Crossfade::with_duration(config.initial_mode, sample_rate, config.crossfade_ms),
            pending: VecDeque::with_capacity(pending_capacity),
            pending_capacity,
            port: None,
            key_state: KeyState::Provisional,
            samples_since_request: 0,
            request_threshold: config.seed_request_threshold(),
            sample_rate,
            stats: EngineStats::default(),
        }
    }

    /// Links the engine to the host side of a channel.
    pub fn with_port(mut self, port: RenderPort) -> Self {
        self.port = Some(port);
        self
    }

    /// Applies one host message.
    ///
    /// Malformed or out-of-turn messages are ignored without touching
    /// generator state.
    pub fn handle_message(&mut self, message: HostMessage) {
        match message {
            HostMessage::InitialSeeds(batch) => self.apply_initial_seeds(&batch),
            HostMessage::EntropySeeds(batch) => self.enqueue(batch),
            HostMessage::SetMode(mode) => {
                if self.fade.request(mode) {
                    tracing::debug!(
                        from = %self.fade.current(),
                        to = %mode,
                        samples = self.fade.fade_samples(),
                        "Crossfade armed"
                    );
                }
            }
        }
    }

    /// Renders one block into the two channel buffers.
    ///
    /// The block length is the longer of the two buffers; both are filled
    /// completely.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        while let Some(message) = self.next_message() {
            self.handle_message(message);
        }

        self.mix_pending();

        let frames = left.len().max(right.len());
        self.samples_since_request += frames as u64;
        if self.samples_since_request >= self.request_threshold
            && self.pending.len() < REQUEST_QUEUE_DEPTH
        {
            self.request_seed();
            self.samples_since_request = 0;
        }

        for i in 0..frames {
            let (pink_l, brown_l) = self.left.next();
            let (pink_r, brown_r) = self.right.next();

            let out_l = self.fade.blend(pink_l, brown_l);
            let out_r = self.fade.blend(pink_r, brown_r);
            if self.fade.advance() {
                self.stats.crossfades += 1;
                tracing::trace!(mode = %self.fade.current(), "Crossfade complete");
            }

            if let Some(sample) = left.get_mut(i) {
                *sample = out_l as f32;
            }
            if let Some(sample) = right.get_mut(i) {
                *sample = out_r as f32;
            }
        }

        self.stats.frames_rendered += frames as u64;
        self.stats.blocks_rendered += 1;
    }

    fn next_message(&self) -> Option<HostMessage> {
        self.port.as_ref()?.try_recv()
    }

    fn apply_initial_seeds(&mut self, batch: &SeedBatch) {
        if self.key_state == KeyState::Keyed {
            tracing::trace!("Initial seeds ignored: engine already keyed");
            self.stats.messages_ignored += 1;
            return;
        }

        let words = batch.words();
        if words.len() < INITIAL_SEED_WORDS {
            tracing::trace!(words = words.len(), "Initial seeds ignored: payload short");
            self.stats.messages_ignored += 1;
            return;
        }

        let left = [words[0], words[1], words[2], words[3]];
        let right = [words[4], words[5], words[6], words[7]];
        if left == [0; 4] || right == [0; 4] {
            tracing::trace!("Initial seeds ignored: all-zero channel state");
            self.stats.messages_ignored += 1;
            return;
        }

        self.left.rng = GeneratorState::from_words(left);
        self.right.rng = GeneratorState::from_words(right);
        self.key_state = KeyState::Keyed;
        tracing::debug!("Noise engine keyed from initial seeds");
    }

    fn enqueue(&mut self, batch: SeedBatch) {
        if batch.is_empty() {
            self.stats.messages_ignored += 1;
            return;
        }

        if self.pending.len() >= self.pending_capacity {
            self.pending.pop_front();
            self.stats.batches_dropped += 1;
        }
        self.pending.push_back(batch);
        self.stats.batches_received += 1;
    }

    fn mix_pending(&mut self) {
        let Some(batch) = self.pending.pop_front() else {
            return;
        };

        let (left, right) = batch.halves();
        self.left.rng.mix_entropy(left);
        self.right.rng.mix_entropy(right);
        self.stats.batches_mixed += 1;

        if self.key_state == KeyState::Provisional {
            self.key_state = KeyState::Keyed;
            tracing::debug!("Noise engine keyed from mixed entropy");
        }
    }

    fn request_seed(&mut self) {
        self.stats.seed_requests += 1;
        if let Some(port) = &self.port {
            // A full or closed queue just means the host already knows.
            let _ = port.post(RenderMessage::NeedSeed);
        }
    }

    /// Current keying status.
    pub fn key_state(&self) -> KeyState {
        self.key_state
    }

    /// Returns true once strong material has reached the generators.
    pub fn is_keyed(&self) -> bool {
        self.key_state == KeyState::Keyed
    }

    /// Mode currently sounding.
    pub fn mode(&self) -> NoiseMode {
        self.fade.current()
    }

    /// Mode being faded towards (equal to [`NoiseEngine::mode`] at rest).
    pub fn target_mode(&self) -> NoiseMode {
        self.fade.target()
    }

    /// Crossfade state.
    pub fn crossfade(&self) -> &Crossfade {
        &self.fade
    }

    /// Queued entropy batches.
    pub fn pending_batches(&self) -> usize {
        self.pending.len()
    }

    /// Seed request threshold in samples.
    pub fn request_threshold(&self) -> u64 {
        self.request_threshold
    }

    /// Engine sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Activity counters.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Generator states `(left, right)`.
    pub fn generator_states(&self) -> (&GeneratorState, &GeneratorState) {
        (&self.left.rng, &self.right.rng)
    }
}

impl std::fmt::Debug for NoiseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseEngine")
            .field("sample_rate", &self.sample_rate)
            .field("key_state", &self.key_state)
            .field("fade", &self.fade)
            .field("pending", &self.pending.len())
            .field("linked", &self.port.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::link;

    fn config() -> EngineConfig {
        EngineConfig::with_sample_rate(48_000)
    }

    fn render_blocks(engine: &mut NoiseEngine, blocks: usize, size: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0; size];
        let mut right = vec![0.0; size];
        let mut all_l = Vec::with_capacity(blocks * size);
        let mut all_r = Vec::with_capacity(blocks * size);
        for _ in 0..blocks {
            engine.render(&mut left, &mut right);
            all_l.extend_from_slice(&left);
            all_r.extend_from_slice(&right);
        }
        (all_l, all_r)
    }

    fn seeds(words: &[u32]) -> HostMessage {
        HostMessage::InitialSeeds(SeedBatch::new(words.to_vec()))
    }

    #[test]
    fn test_starts_provisional_and_renders() {
        let mut engine = NoiseEngine::new(&config(), 0);
        assert_eq!(engine.key_state(), KeyState::Provisional);

        let (l, r) = render_blocks(&mut engine, 4, 128);
        assert!(l.iter().any(|&s| s != 0.0));
        assert!(l.iter().chain(r.iter()).all(|s| s.is_finite() && s.abs() <= 2.0));
        assert_eq!(engine.stats().frames_rendered, 512);
    }

    #[test]
    fn test_initial_seeds_applied_once() {
        let mut engine = NoiseEngine::new(&config(), 7);
        engine.handle_message(seeds(&[1, 2, 3, 4, 5, 6, 7, 8]));
        assert!(engine.is_keyed());

        let (left, right) = engine.generator_states();
        assert_eq!(left.words(), [1, 2, 3, 4]);
        assert_eq!(right.words(), [5, 6, 7, 8]);

        engine.handle_message(seeds(&[9; 8]));
        let (left, _) = engine.generator_states();
        assert_eq!(left.words(), [1, 2, 3, 4]);
        assert_eq!(engine.stats().messages_ignored, 1);
    }

    #[test]
    fn test_short_initial_seeds_ignored() {
        let mut engine = NoiseEngine::new(&config(), 7);
        let before = engine.generator_states().0.clone();

        engine.handle_message(seeds(&[1, 2, 3]));
        engine.handle_message(seeds(&[0, 0, 0, 0, 5, 6, 7, 8]));

        assert!(!engine.is_keyed());
        assert_eq!(engine.generator_states().0, &before);
        assert_eq!(engine.stats().messages_ignored, 2);
    }

    #[test]
    fn test_initial_seeds_after_mixing_ignored() {
        let mut engine = NoiseEngine::new(&config(), 7);
        engine.handle_message(HostMessage::EntropySeeds(SeedBatch::new(vec![1, 2, 3, 4])));
        render_blocks(&mut engine, 1, 16);
        assert!(engine.is_keyed());

        engine.handle_message(seeds(&[1, 2, 3, 4, 5, 6, 7, 8]));
        assert_ne!(engine.generator_states().0.words(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_channels_independent() {
        let mut engine = NoiseEngine::new(&config(), 0);
        engine.handle_message(seeds(&[1, 2, 3, 4, 5, 6, 7, 8]));

        let (l, r) = render_blocks(&mut engine, 32, 128);
        let equal = l.iter().zip(r.iter()).filter(|(a, b)| a == b).count();
        assert!(equal < 4, "{} identical samples", equal);
    }

    #[test]
    fn test_one_batch_mixed_per_block() {
        let mut engine = NoiseEngine::new(&config(), 0);
        for i in 0..3 {
            engine.handle_message(HostMessage::EntropySeeds(SeedBatch::new(vec![i; 8])));
        }
        assert_eq!(engine.pending_batches(), 3);

        render_blocks(&mut engine, 1, 64);
        assert_eq!(engine.pending_batches(), 2);
        assert_eq!(engine.stats().batches_mixed, 1);

        render_blocks(&mut engine, 2, 64);
        assert_eq!(engine.pending_batches(), 0);
        assert_eq!(engine.stats().batches_mixed, 3);
    }

    #[test]
    fn test_mixing_splits_halves_across_channels() {
        let mut engine = NoiseEngine::new(&config(), 0);
        engine.handle_message(seeds(&[1, 2, 3, 4, 5, 6, 7, 8]));
        engine.handle_message(HostMessage::EntropySeeds(SeedBatch::new(vec![
            0xAAAA_0001,
            0xAAAA_0002,
            0xBBBB_0001,
            0xBBBB_0002,
        ])));
        render_blocks(&mut engine, 1, 0);

        let mut left = GeneratorState::from_words([1, 2, 3, 4]);
        left.mix_entropy(&[0xAAAA_0001, 0xAAAA_0002]);
        let mut right = GeneratorState::from_words([5, 6, 7, 8]);
        right.mix_entropy(&[0xBBBB_0001, 0xBBBB_0002]);

        let (l, r) = engine.generator_states();
        assert_eq!(l, &left);
        assert_eq!(r, &right);
    }

    #[test]
    fn test_pending_queue_bounded() {
        let mut cfg = config();
        cfg.pending_capacity = 4;
        let mut engine = NoiseEngine::new(&cfg, 0);
        for i in 0..10 {
            engine.handle_message(HostMessage::EntropySeeds(SeedBatch::new(vec![i])));
        }
        assert_eq!(engine.pending_batches(), 4);
        assert_eq!(engine.stats().batches_dropped, 6);

        engine.handle_message(HostMessage::EntropySeeds(SeedBatch::new(vec![])));
        assert_eq!(engine.pending_batches(), 4);
    }

    #[test]
    fn test_backpressure_cadence() {
        let mut cfg = config();
        // 1000-sample threshold with 128-frame blocks: ceil(1000/128) = 8.
        cfg.seed_request_interval_s = 1000.0 / 48_000.0;
        let (host, render) = link(64, 64);
        let mut engine = NoiseEngine::new(&cfg, 0).with_port(render);
        assert_eq!(engine.request_threshold(), 1000);

        let mut request_blocks = Vec::new();
        for block in 1..=40 {
            render_blocks(&mut engine, 1, 128);
            while let Some(RenderMessage::NeedSeed) = host.try_recv() {
                request_blocks.push(block);
            }
        }
        assert_eq!(request_blocks, vec![8, 16, 24, 32, 40]);
    }

    #[test]
    fn test_backpressure_suppressed_when_queue_full() {
        let mut cfg = config();
        cfg.seed_request_interval_s = 1000.0 / 48_000.0;
        let (host, render) = link(64, 64);
        let mut engine = NoiseEngine::new(&cfg, 0).with_port(render);
        for _ in 0..3 {
            host.post(HostMessage::EntropySeeds(SeedBatch::new(vec![3; 8])))
                .unwrap();
        }

        for _ in 0..40 {
            // Two fresh batches per block outpace the one-per-block mix.
            for _ in 0..2 {
                host.post(HostMessage::EntropySeeds(SeedBatch::new(vec![7; 8])))
                    .unwrap();
            }
            render_blocks(&mut engine, 1, 128);
            assert!(engine.pending_batches() >= 2);
        }
        assert_eq!(host.try_recv(), None);
        assert_eq!(engine.stats().seed_requests, 0);
    }

    #[test]
    fn test_set_mode_crossfades() {
        let mut cfg = config();
        cfg.crossfade_ms = 10.0; // 480 samples
        let mut engine = NoiseEngine::new(&cfg, 0);
        assert_eq!(engine.mode(), NoiseMode::Pink);

        engine.handle_message(HostMessage::SetMode(NoiseMode::Brown));
        assert!(engine.crossfade().is_fading());

        render_blocks(&mut engine, 3, 128);
        assert!(engine.crossfade().is_fading());
        assert_eq!(engine.crossfade().remaining(), 480 - 384);

        render_blocks(&mut engine, 1, 128);
        assert!(!engine.crossfade().is_fading());
        assert_eq!(engine.mode(), NoiseMode::Brown);
        assert_eq!(engine.stats().crossfades, 1);
    }

    #[test]
    fn test_crossfade_has_no_jump() {
        let mut cfg = config();
        cfg.crossfade_ms = 50.0;
        let mut engine = NoiseEngine::new(&cfg, 3);
        engine.handle_message(seeds(&[11, 12, 13, 14, 15, 16, 17, 18]));
        render_blocks(&mut engine, 100, 128);

        engine.handle_message(HostMessage::SetMode(NoiseMode::Brown));
        let (l, _) = render_blocks(&mut engine, 40, 128);

        let max_step = l
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0f32, f32::max);
        // Pink alone is bounded near 0.52 per sample and brown moves far
        // less; a hard switch would jump by roughly a full sample value.
        assert!(max_step < 0.6, "max step {}", max_step);
    }

    #[test]
    fn test_bad_time_constant_stays_finite() {
        let mut cfg = config();
        cfg.brown_time_constant_s = -0.02;
        cfg.initial_mode = NoiseMode::Brown;
        let mut engine = NoiseEngine::new(&cfg, 0);

        let (l, r) = render_blocks(&mut engine, 8, 128);
        assert!(l.iter().chain(r.iter()).all(|s| s.is_finite()));

        engine.handle_message(HostMessage::SetMode(NoiseMode::Pink));
        let (l, r) = render_blocks(&mut engine, 30, 128);
        assert!(l.iter().chain(r.iter()).all(|s| s.is_finite()));
        assert_eq!(engine.mode(), NoiseMode::Pink);
    }

    #[test]
    fn test_uneven_buffers_filled() {
        let mut engine = NoiseEngine::new(&config(), 0);
        let mut left = vec![0.0f32; 64];
        let mut right = vec![0.0f32; 32];
        engine.render(&mut left, &mut right);
        assert_eq!(engine.stats().frames_rendered, 64);
        assert!(left[32..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_renders_without_host() {
        // Degraded operation: no host at all, output keeps flowing.
        let (host, render) = link(4, 1);
        drop(host);
        let mut engine = NoiseEngine::new(&config(), 0).with_port(render);
        let (l, _) = render_blocks(&mut engine, 400, 128);
        assert!(l.iter().any(|&s| s != 0.0));
        assert!(engine.stats().seed_requests > 0);
    }
}
