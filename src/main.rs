//! Focus Noise CLI
//!
//! Renders pink/brown noise through the full host/render pipeline and
//! optionally writes it to a WAV file.

use clap::Parser;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use focus_noise::{
    analysis::StatsAccumulator,
    config::{ConfigError, FileConfig},
    engine::NoiseEngine,
    entropy::{AmbientEvent, EntropyPool},
    feeder::EntropyFeeder,
    metrics::{MetricsError, MetricsRegistry, MetricsSnapshot},
    protocol::{link, NoiseMode},
};
use rand_core::{CryptoRng, RngCore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Rendered blocks buffered between the render thread and the writer.
const BLOCK_QUEUE_DEPTH: usize = 32;

/// Capacity of the render-to-host request queue.
const REQUEST_QUEUE_CAPACITY: usize = 4;

/// A stereo block travelling between the render thread and the writer.
type Block = (Vec<f32>, Vec<f32>);

/// What the render thread has to produce.
#[derive(Debug, Clone, Copy)]
struct RenderJob {
    total_frames: u64,
    block_size: usize,
    sample_rate: u32,
    realtime: bool,
}

/// Allocates the fixed set of block buffers and the free list they cycle
/// through. Nothing else on the render side allocates.
fn block_pool(depth: usize, block_size: usize) -> (Sender<Block>, Receiver<Block>) {
    let (free_tx, free_rx) = bounded(depth);
    for _ in 0..depth {
        let _ = free_tx.try_send((vec![0.0f32; block_size], vec![0.0f32; block_size]));
    }
    (free_tx, free_rx)
}

/// Renders `job` block by block into recycled buffers.
///
/// Offline renders wait for the writer to hand a buffer back. Real-time
/// renders never wait: without a free buffer the block is rendered into
/// scratch and dropped, so the engine clock keeps pace. Returns the engine
/// and the number of dropped blocks.
fn render_loop(
    mut engine: NoiseEngine,
    job: &RenderJob,
    filled: &Sender<Block>,
    free: &Receiver<Block>,
    stop: &AtomicBool,
) -> (NoiseEngine, u64) {
    let mut scratch_l = vec![0.0f32; job.block_size];
    let mut scratch_r = vec![0.0f32; job.block_size];
    let started = Instant::now();
    let mut rendered = 0u64;
    let mut overruns = 0u64;

    while rendered < job.total_frames && !stop.load(Ordering::SeqCst) {
        let frames = job.block_size.min((job.total_frames - rendered) as usize);
        let buffers = if job.realtime {
            free.try_recv().ok()
        } else {
            match free.recv() {
                Ok(block) => Some(block),
                Err(_) => break,
            }
        };

        match buffers {
            Some((mut left, mut right)) => {
                // Within capacity: no reallocation.
                left.resize(frames, 0.0);
                right.resize(frames, 0.0);
                engine.render(&mut left, &mut right);
                match filled.try_send((left, right)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => overruns += 1,
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            None => {
                engine.render(&mut scratch_l[..frames], &mut scratch_r[..frames]);
                overruns += 1;
            }
        }
        rendered += frames as u64;

        if job.realtime {
            let due = started + Duration::from_secs_f64(rendered as f64 / job.sample_rate as f64);
            if let Some(wait) = due.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
        }
    }

    (engine, overruns)
}

#[derive(Parser, Debug)]
#[command(name = "focus-noise", version, about = "Render entropy-fed pink/brown noise")]
struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initial noise colour (pink or brown)
    #[arg(long)]
    mode: Option<NoiseMode>,

    /// Seconds of audio to render
    #[arg(long)]
    seconds: Option<f64>,

    /// Frames per render call
    #[arg(long)]
    block_size: Option<usize>,

    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Toggle between pink and brown every N seconds of audio
    #[arg(long, value_name = "SECONDS")]
    switch_every: Option<f64>,

    /// Key the entropy pool from a passphrase instead of the OS
    #[arg(long, value_name = "PASSPHRASE")]
    seed: Option<String>,

    /// Write 32-bit float stereo WAV to this path
    #[arg(long, short, value_name = "FILE.wav")]
    output: Option<PathBuf>,

    /// Write a timestamped WAV when no output path is given
    #[arg(long)]
    record: bool,

    /// Pace rendering at the audio rate
    #[arg(long)]
    realtime: bool,

    /// Print Prometheus metrics when done
    #[arg(long)]
    metrics: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("wav output: {0}")]
    Wav(#[from] hound::Error),

    #[error("metrics: {0}")]
    Metrics(#[from] MetricsError),

    #[error("render thread panicked")]
    RenderThread,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Focus Noise v{}", focus_noise::VERSION);

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match &args.seed {
        Some(passphrase) => {
            info!("Using deterministic passphrase entropy source");
            run(EntropyPool::from_passphrase(passphrase), &config, &args)
        }
        None => match EntropyPool::from_os() {
            Ok(pool) => run(pool, &config, &args),
            Err(e) => {
                eprintln!("Failed to key entropy pool: {}", e);
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Render failed: {}", e);
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<FileConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    if let Some(mode) = args.mode {
        config.engine.initial_mode = mode;
    }
    if let Some(seconds) = args.seconds {
        config.render.seconds = seconds;
    }
    if let Some(block_size) = args.block_size {
        config.render.block_size = block_size;
    }
    if let Some(sample_rate) = args.sample_rate {
        config.engine.sample_rate = sample_rate;
    }
    if args.realtime {
        config.render.realtime = true;
    }

    config.validate()?;
    Ok(config)
}

fn output_path(args: &Args) -> Option<PathBuf> {
    if let Some(path) = &args.output {
        return Some(path.clone());
    }
    args.record.then(|| {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        PathBuf::from(format!("noise-{}.wav", stamp))
    })
}

fn run<R: RngCore + CryptoRng>(
    pool: EntropyPool<R>,
    config: &FileConfig,
    args: &Args,
) -> Result<(), CliError> {
    let sample_rate = config.engine.sample_rate;
    let block_size = config.render.block_size;
    let total_frames = (config.render.seconds * sample_rate as f64).round() as u64;
    let realtime = config.render.realtime;

    let (host, render) = link(config.feeder.channel_capacity, REQUEST_QUEUE_CAPACITY);
    let frame = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    let engine = NoiseEngine::new(&config.engine, frame).with_port(render);

    let mut feeder = EntropyFeeder::new(pool, host, &config.feeder);
    let stirrer = feeder.stirrer();
    if !feeder.send_initial_seeds() {
        warn!("Initial seeds not delivered; engine stays on provisional seed");
    }
    feeder.start(Instant::now());

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
            warn!("Ctrl-C handler not installed: {}", e);
        }
    }

    let job = RenderJob {
        total_frames,
        block_size,
        sample_rate,
        realtime,
    };
    let (blocks_tx, blocks_rx) = bounded::<Block>(BLOCK_QUEUE_DEPTH);
    let (free_tx, free_rx) = block_pool(BLOCK_QUEUE_DEPTH, block_size);
    let render_stop = Arc::clone(&stop);
    let render_thread =
        thread::spawn(move || render_loop(engine, &job, &blocks_tx, &free_rx, &render_stop));

    let mut writer = match output_path(args) {
        Some(path) => {
            let spec = hound::WavSpec {
                channels: 2,
                sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            };
            info!("Writing {}", path.display());
            Some(hound::WavWriter::create(&path, spec)?)
        }
        None => None,
    };

    let switch_frames = args
        .switch_every
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| ((s * sample_rate as f64).round() as u64).max(1));
    let mut mode = config.engine.initial_mode;
    let mut next_switch = switch_frames;

    let mut left_stats = StatsAccumulator::new();
    let mut right_stats = StatsAccumulator::new();
    let mut received = 0u64;
    let mut last_tick = Instant::now();

    info!(
        seconds = config.render.seconds,
        sample_rate,
        block_size,
        mode = %mode,
        "Rendering"
    );

    loop {
        let now = Instant::now();
        stirrer.record(AmbientEvent::FrameJitter {
            interval: now.duration_since(last_tick),
        });
        last_tick = now;
        feeder.poll(now);

        let wait = feeder
            .next_deadline()
            .and_then(|due| due.checked_duration_since(now))
            .unwrap_or(feeder.period());

        let (left, right) = match blocks_rx.recv_timeout(wait) {
            Ok(block) => block,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        left_stats.extend(&left);
        right_stats.extend(&right);
        if let Some(w) = writer.as_mut() {
            for (&l, &r) in left.iter().zip(right.iter()) {
                w.write_sample(l)?;
                w.write_sample(r)?;
            }
        }

        received += left.len() as u64;
        // The free list holds every buffer ever allocated, so this fits.
        let _ = free_tx.try_send((left, right));
        if let (Some(at), Some(every)) = (next_switch, switch_frames) {
            if received >= at {
                mode = mode.toggled();
                debug!(mode = %mode, frame = received, "Switching mode");
                feeder.post_mode(mode);
                next_switch = Some(at + every);
            }
        }
    }

    let (engine, overruns) = render_thread.join().map_err(|_| CliError::RenderThread)?;
    if overruns > 0 {
        warn!(overruns, "Blocks dropped: writer fell behind the real-time render");
    }
    feeder.dispose();

    if let Some(w) = writer {
        w.finalize()?;
    }

    if stop.load(Ordering::SeqCst) {
        warn!("Interrupted after {} frames", received);
    }

    let thresholds = &config.thresholds;
    for (channel, acc) in [("left", &left_stats), ("right", &right_stats)] {
        let stats = acc.finish();
        info!(
            channel,
            rms = stats.rms,
            peak = stats.peak,
            mean = stats.mean,
            autocorrelation = stats.autocorrelation,
            "Output statistics"
        );
        if let Err(violation) = thresholds.check(&stats) {
            warn!(channel, "Output check: {}", violation);
        }
    }

    let engine_stats = engine.stats();
    info!(
        "Rendered {} frames: {} batches mixed, {} seed requests, keyed={}",
        engine_stats.frames_rendered,
        engine_stats.batches_mixed,
        engine_stats.seed_requests,
        engine.is_keyed()
    );

    if args.metrics {
        let registry = MetricsRegistry::new()?;
        registry.update(&MetricsSnapshot::from_components(&engine, &feeder));
        print!("{}", registry.encode()?);
    }

    Ok(())
}
