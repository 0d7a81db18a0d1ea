//! Timer- and request-driven entropy feeder.

use crate::config::FeederConfig;
use crate::engine::INITIAL_SEED_WORDS;
use crate::entropy::{ambient_channel, AmbientQueue, AmbientStirrer, EntropyPool};
use crate::protocol::{HostMessage, HostPort, NoiseMode, RenderMessage};
use rand_core::{CryptoRng, OsRng, RngCore};
use std::time::{Duration, Instant};

/// Feeder lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeederState {
    /// No timer armed.
    Stopped,
    /// Timer armed; the next periodic batch is due at `next_due`.
    Running { next_due: Instant },
}

/// Why a batch was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Sent by `start` or the repeating timer.
    Periodic,
    /// Sent in answer to a `NeedSeed` request.
    OnDemand,
}

/// Counters describing feeder activity.
#[derive(Debug, Clone, Default)]
pub struct FeederStats {
    /// Batches sent by `start` and the timer.
    pub periodic_batches: u64,
    /// Batches sent in answer to requests.
    pub on_demand_batches: u64,
    /// `NeedSeed` requests received.
    pub requests_received: u64,
    /// Initial-seed messages sent.
    pub initial_seeds_sent: u64,
    /// Messages the link refused (full or closed).
    pub send_failures: u64,
    /// Ambient words stirred into the pool.
    pub ambient_words: u64,
}

/// Drives an [`EntropyPool`] and forwards batches to the engine.
///
/// The feeder is cooperative: the host calls [`EntropyFeeder::poll`] from
/// its own loop and the repeating timer is just a deadline, so
/// [`EntropyFeeder::stop`] cancels it deterministically.
pub struct EntropyFeeder<R = OsRng> {
    pool: EntropyPool<R>,
    port: Option<HostPort>,
    stirrer: AmbientStirrer,
    ambient: AmbientQueue,
    state: FeederState,
    period: Duration,
    batch_words: usize,
    stats: FeederStats,
}

impl<R: RngCore + CryptoRng> EntropyFeeder<R> {
    /// Creates a stopped feeder.
    pub fn new(pool: EntropyPool<R>, port: HostPort, config: &FeederConfig) -> Self {
        let (stirrer, ambient) = ambient_channel(config.ambient_capacity);
        Self {
            pool,
            port: Some(port),
            stirrer,
            ambient,
            state: FeederState::Stopped,
            period: Duration::from_millis(config.period_ms.max(1)),
            batch_words: config.batch_words.max(1),
            stats: FeederStats::default(),
        }
    }

    /// Returns a stirrer handle for event-handling code.
    pub fn stirrer(&self) -> AmbientStirrer {
        self.stirrer.clone()
    }

    /// Starts the repeating timer.
    ///
    /// Sends one batch immediately. A no-op while already running.
    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            return;
        }
        self.send_batch(Trigger::Periodic);
        self.state = FeederState::Running {
            next_due: now + self.period,
        };
        tracing::debug!(period_ms = self.period.as_millis() as u64, "Entropy feeder started");
    }

    /// Disarms the timer. Idempotent.
    pub fn stop(&mut self) {
        if self.is_running() {
            tracing::debug!("Entropy feeder stopped");
        }
        self.state = FeederState::Stopped;
    }

    /// Stops and releases the link. Later sends are silent no-ops.
    pub fn dispose(&mut self) {
        self.stop();
        if self.port.take().is_some() {
            tracing::debug!("Entropy feeder disposed");
        }
    }

    /// Runs one host tick; returns the number of batches sent.
    ///
    /// Drains ambient words into the pool, answers pending `NeedSeed`
    /// requests, then fires the timer if it is due. A host that fell more
    /// than a period behind gets one batch, not a burst.
    pub fn poll(&mut self, now: Instant) -> usize {
        let stirred = self.ambient.drain_into(&mut self.pool);
        self.stats.ambient_words += stirred as u64;

        let mut sent = 0;
        while let Some(RenderMessage::NeedSeed) = self.next_request() {
            self.stats.requests_received += 1;
            if self.send_batch(Trigger::OnDemand) {
                sent += 1;
            }
        }

        if let FeederState::Running { next_due } = self.state {
            if now >= next_due {
                if self.send_batch(Trigger::Periodic) {
                    sent += 1;
                }
                let mut next = next_due + self.period;
                if next <= now {
                    next = now + self.period;
                }
                self.state = FeederState::Running { next_due: next };
            }
        }

        sent
    }

    /// Sends the one-time `InitialSeeds` message.
    ///
    /// Returns true if the link accepted it.
    pub fn send_initial_seeds(&mut self) -> bool {
        if self.port.is_none() {
            return false;
        }
        let batch = self.pool.next_words(INITIAL_SEED_WORDS);
        let delivered = self.post(HostMessage::InitialSeeds(batch));
        if delivered {
            self.stats.initial_seeds_sent += 1;
        }
        delivered
    }

    /// Requests a colouring mode. Returns true if the link accepted it.
    pub fn post_mode(&mut self, mode: NoiseMode) -> bool {
        self.post(HostMessage::SetMode(mode))
    }

    /// Draws and sends one batch. Returns true if the link accepted it.
    pub fn send_batch(&mut self, trigger: Trigger) -> bool {
        if self.port.is_none() {
            return false;
        }

        let batch = self.pool.next_words(self.batch_words);
        let delivered = self.post(HostMessage::EntropySeeds(batch));
        if delivered {
            match trigger {
                Trigger::Periodic => self.stats.periodic_batches += 1,
                Trigger::OnDemand => self.stats.on_demand_batches += 1,
            }
        }
        delivered
    }

    fn next_request(&self) -> Option<RenderMessage> {
        self.port.as_ref()?.try_recv()
    }

    fn post(&mut self, message: HostMessage) -> bool {
        let Some(port) = &self.port else {
            return false;
        };
        match port.post(message) {
            Ok(()) => true,
            Err(err) => {
                self.stats.send_failures += 1;
                tracing::debug!(error = %err, "Entropy message not delivered");
                false
            }
        }
    }

    /// Deadline of the next periodic batch, if running.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            FeederState::Running { next_due } => Some(next_due),
            FeederState::Stopped => None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FeederState {
        self.state
    }

    /// Returns true while the timer is armed.
    pub fn is_running(&self) -> bool {
        matches!(self.state, FeederState::Running { .. })
    }

    /// Returns true once the link has been released.
    pub fn is_disposed(&self) -> bool {
        self.port.is_none()
    }

    /// Timer period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// The pool being fed from.
    pub fn pool(&self) -> &EntropyPool<R> {
        &self.pool
    }

    /// Ambient words dropped on a full queue.
    pub fn ambient_dropped(&self) -> u64 {
        self.ambient.dropped()
    }

    /// Activity counters.
    pub fn stats(&self) -> &FeederStats {
        &self.stats
    }
}

impl<R> std::fmt::Debug for EntropyFeeder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropyFeeder")
            .field("state", &self.state)
            .field("period", &self.period)
            .field("batch_words", &self.batch_words)
            .field("disposed", &self.port.is_none())
            .finish_non_exhaustive()
    }
}
