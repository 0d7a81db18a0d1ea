//! End-to-end host/render pipeline over a real link.

use focus_noise::{
    analysis::OutputStatistics,
    config::{EngineConfig, FeederConfig},
    engine::{KeyState, NoiseEngine},
    entropy::{AmbientEvent, EntropyPool},
    feeder::EntropyFeeder,
    protocol::{link, NoiseMode},
};
use rand_chacha::ChaCha20Rng;
use std::time::{Duration, Instant};

const BLOCK: usize = 128;

struct Pipeline {
    engine: NoiseEngine,
    feeder: EntropyFeeder<ChaCha20Rng>,
    clock: Instant,
}

impl Pipeline {
    fn new(passphrase: &str, engine_config: &EngineConfig) -> Self {
        let (host, render) = link(64, 4);
        let engine = NoiseEngine::new(engine_config, 0).with_port(render);
        let pool = EntropyPool::from_passphrase(passphrase);
        let feeder = EntropyFeeder::new(pool, host, &FeederConfig::default());
        Self {
            engine,
            feeder,
            clock: Instant::now(),
        }
    }

    /// Renders `blocks` blocks, advancing the host clock by the audio time
    /// of each block and polling the feeder in between.
    fn run(&mut self, blocks: usize) -> Vec<f32> {
        let step = Duration::from_secs_f64(BLOCK as f64 / self.engine.sample_rate());
        let mut left = vec![0.0f32; BLOCK];
        let mut right = vec![0.0f32; BLOCK];
        let mut out = Vec::with_capacity(blocks * BLOCK);
        for _ in 0..blocks {
            self.engine.render(&mut left, &mut right);
            out.extend_from_slice(&left);
            self.clock += step;
            self.feeder.poll(self.clock);
        }
        out
    }
}

#[test]
fn test_initial_seeds_key_engine() {
    let mut p = Pipeline::new("keying", &EngineConfig::default());
    assert!(p.feeder.send_initial_seeds());
    p.run(1);

    assert_eq!(p.engine.key_state(), KeyState::Keyed);
    assert_eq!(p.engine.stats().messages_ignored, 0);
}

#[test]
fn test_same_passphrase_same_audio() {
    let render = |phrase: &str| {
        let mut p = Pipeline::new(phrase, &EngineConfig::default());
        p.feeder.send_initial_seeds();
        p.feeder.start(p.clock);
        p.run(200)
    };

    let a = render("reproducible");
    let b = render("reproducible");
    let c = render("different");
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_periodic_and_on_demand_supply() {
    let mut config = EngineConfig::default();
    config.seed_request_interval_s = 0.1;
    let mut p = Pipeline::new("supply", &config);
    p.feeder.send_initial_seeds();
    p.feeder.start(p.clock);

    // Two seconds of audio.
    p.run(750);

    let feeder = p.feeder.stats();
    let engine = p.engine.stats();
    assert!(feeder.periodic_batches >= 13, "{:?}", feeder);
    assert_eq!(feeder.requests_received, engine.seed_requests);
    assert_eq!(feeder.on_demand_batches, engine.seed_requests);
    assert_eq!(engine.batches_dropped, 0);
    assert!(engine.batches_mixed >= feeder.periodic_batches);
}

#[test]
fn test_mode_switch_crosses_link() {
    let mut p = Pipeline::new("modes", &EngineConfig::default());
    p.run(10);
    assert!(p.feeder.post_mode(NoiseMode::Brown));

    p.run(1);
    assert_eq!(p.engine.target_mode(), NoiseMode::Brown);
    assert!(p.engine.crossfade().is_fading());

    // 50 ms at 48 kHz is 2400 samples, under 20 blocks.
    p.run(20);
    assert_eq!(p.engine.mode(), NoiseMode::Brown);
    assert!(!p.engine.crossfade().is_fading());
}

#[test]
fn test_output_survives_disposed_feeder() {
    let mut p = Pipeline::new("dispose", &EngineConfig::default());
    p.feeder.send_initial_seeds();
    p.feeder.start(p.clock);
    p.run(50);

    p.feeder.dispose();
    let tail = p.run(400);

    let stats = OutputStatistics::analyze(&tail);
    assert_eq!(stats.sample_size, 400 * BLOCK);
    assert!(stats.rms > 0.1, "{:?}", stats);
    assert_eq!(p.feeder.stats().on_demand_batches, 0);
}

#[test]
fn test_ambient_events_change_supply() {
    let render = |stir: bool| {
        let mut p = Pipeline::new("ambient", &EngineConfig::default());
        if stir {
            p.feeder.stirrer().record(AmbientEvent::KeyPress { code: 42 });
        }
        p.feeder.poll(p.clock);
        p.feeder.send_initial_seeds();
        p.run(4)
    };

    assert_ne!(render(false), render(true));
}
