//! Metrics collection and registry.

use crate::engine::NoiseEngine;
use crate::feeder::EntropyFeeder;
use crate::protocol::NoiseMode;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of engine and feeder state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Frames rendered.
    pub frames_rendered: u64,
    /// Render calls served.
    pub blocks_rendered: u64,
    /// Entropy batches folded into the generators.
    pub batches_mixed: u64,
    /// Entropy batches discarded on a full pending queue.
    pub batches_dropped: u64,
    /// Batches waiting to be mixed.
    pub pending_batches: usize,
    /// `NeedSeed` requests emitted by the engine.
    pub seed_requests: u64,
    /// Completed crossfades.
    pub crossfades: u64,
    /// Whether the engine carries strong seed material.
    pub engine_keyed: bool,
    /// Mode currently sounding.
    pub mode: NoiseMode,
    /// Batches the feeder delivered (timer and on demand).
    pub feeder_batches: u64,
    /// Messages the link refused.
    pub send_failures: u64,
    /// Words produced by the entropy pool.
    pub pool_words: u64,
    /// Ambient words stirred into the pool.
    pub ambient_words: u64,
    /// Ambient words dropped on a full queue.
    pub ambient_dropped: u64,
}

/// Prometheus metrics registry for the noise pipeline.
pub struct MetricsRegistry {
    registry: Registry,

    // Engine metrics
    frames_rendered: IntCounter,
    blocks_rendered: IntCounter,
    batches_mixed: IntCounter,
    batches_dropped: IntCounter,
    pending_batches: IntGauge,
    seed_requests: IntCounter,
    crossfades: IntCounter,
    engine_keyed: IntGauge,
    brown_mode: IntGauge,

    // Feeder metrics
    feeder_batches: IntCounter,
    send_failures: IntCounter,
    pool_words: IntCounter,
    ambient_words: IntCounter,
    ambient_dropped: IntCounter,
}

/// Raises a counter to `target`; counters never go down.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all pipeline metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_rendered = IntCounter::new(
            "focus_noise_frames_rendered_total",
            "Stereo frames rendered by the engine",
        )?;
        let blocks_rendered = IntCounter::new(
            "focus_noise_blocks_rendered_total",
            "Render calls served by the engine",
        )?;
        let batches_mixed = IntCounter::new(
            "focus_noise_batches_mixed_total",
            "Entropy batches mixed into the generators",
        )?;
        let batches_dropped = IntCounter::new(
            "focus_noise_batches_dropped_total",
            "Entropy batches dropped on a full pending queue",
        )?;
        let pending_batches = IntGauge::new(
            "focus_noise_pending_batches",
            "Entropy batches waiting to be mixed",
        )?;
        let seed_requests = IntCounter::new(
            "focus_noise_seed_requests_total",
            "Seed requests emitted by the engine",
        )?;
        let crossfades = IntCounter::new(
            "focus_noise_crossfades_total",
            "Completed mode crossfades",
        )?;
        let engine_keyed = IntGauge::new(
            "focus_noise_engine_keyed",
            "Engine keying status (1=keyed, 0=provisional)",
        )?;
        let brown_mode = IntGauge::new(
            "focus_noise_brown_mode",
            "Sounding mode (1=brown, 0=pink)",
        )?;

        let feeder_batches = IntCounter::new(
            "focus_noise_feeder_batches_total",
            "Entropy batches delivered by the feeder",
        )?;
        let send_failures = IntCounter::new(
            "focus_noise_feeder_send_failures_total",
            "Feeder messages refused by the link",
        )?;
        let pool_words = IntCounter::new(
            "focus_noise_pool_words_total",
            "Words produced by the entropy pool",
        )?;
        let ambient_words = IntCounter::new(
            "focus_noise_ambient_words_total",
            "Ambient words stirred into the pool",
        )?;
        let ambient_dropped = IntCounter::new(
            "focus_noise_ambient_dropped_total",
            "Ambient words dropped on a full queue",
        )?;

        registry.register(Box::new(frames_rendered.clone()))?;
        registry.register(Box::new(blocks_rendered.clone()))?;
        registry.register(Box::new(batches_mixed.clone()))?;
        registry.register(Box::new(batches_dropped.clone()))?;
        registry.register(Box::new(pending_batches.clone()))?;
        registry.register(Box::new(seed_requests.clone()))?;
        registry.register(Box::new(crossfades.clone()))?;
        registry.register(Box::new(engine_keyed.clone()))?;
        registry.register(Box::new(brown_mode.clone()))?;
        registry.register(Box::new(feeder_batches.clone()))?;
        registry.register(Box::new(send_failures.clone()))?;
        registry.register(Box::new(pool_words.clone()))?;
        registry.register(Box::new(ambient_words.clone()))?;
        registry.register(Box::new(ambient_dropped.clone()))?;

        Ok(Self {
            registry,
            frames_rendered,
            blocks_rendered,
            batches_mixed,
            batches_dropped,
            pending_batches,
            seed_requests,
            crossfades,
            engine_keyed,
            brown_mode,
            feeder_batches,
            send_failures,
            pool_words,
            ambient_words,
            ambient_dropped,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        advance(&self.frames_rendered, snapshot.frames_rendered);
        advance(&self.blocks_rendered, snapshot.blocks_rendered);
        advance(&self.batches_mixed, snapshot.batches_mixed);
        advance(&self.batches_dropped, snapshot.batches_dropped);
        advance(&self.seed_requests, snapshot.seed_requests);
        advance(&self.crossfades, snapshot.crossfades);
        self.pending_batches.set(snapshot.pending_batches as i64);
        self.engine_keyed.set(i64::from(snapshot.engine_keyed));
        self.brown_mode
            .set(i64::from(snapshot.mode == NoiseMode::Brown));

        advance(&self.feeder_batches, snapshot.feeder_batches);
        advance(&self.send_failures, snapshot.send_failures);
        advance(&self.pool_words, snapshot.pool_words);
        advance(&self.ambient_words, snapshot.ambient_words);
        advance(&self.ambient_dropped, snapshot.ambient_dropped);
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current engine and feeder state.
    pub fn from_components<R: RngCore + CryptoRng>(
        engine: &NoiseEngine,
        feeder: &EntropyFeeder<R>,
    ) -> Self {
        let engine_stats = engine.stats();
        let feeder_stats = feeder.stats();

        Self {
            frames_rendered: engine_stats.frames_rendered,
            blocks_rendered: engine_stats.blocks_rendered,
            batches_mixed: engine_stats.batches_mixed,
            batches_dropped: engine_stats.batches_dropped,
            pending_batches: engine.pending_batches(),
            seed_requests: engine_stats.seed_requests,
            crossfades: engine_stats.crossfades,
            engine_keyed: engine.is_keyed(),
            mode: engine.mode(),
            feeder_batches: feeder_stats.periodic_batches + feeder_stats.on_demand_batches,
            send_failures: feeder_stats.send_failures,
            pool_words: feeder.pool().counter(),
            ambient_words: feeder_stats.ambient_words,
            ambient_dropped: feeder.ambient_dropped(),
        }
    }
}
