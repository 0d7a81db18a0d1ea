//! Ambient event stirring.
//!
//! Event handlers never touch the pool. They reduce each event to one or
//! two words through an [`AmbientStirrer`] handle, which only enqueues;
//! the feeder's periodic tick drains the queue into the pool.

use super::pool::EntropyPool;
use crossbeam_channel::{bounded, Receiver, Sender};
use rand_core::{CryptoRng, RngCore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sub-pixel resolution used when packing coordinates (1/16 px).
const FIXED_POINT_SCALE: f64 = 16.0;

/// An environmental event worth stirring into the pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmbientEvent {
    /// Pointer moved.
    PointerMove {
        /// Horizontal position in pixels.
        x: f64,
        /// Vertical position in pixels.
        y: f64,
    },
    /// Wheel turned.
    Wheel {
        /// Horizontal delta.
        dx: f64,
        /// Vertical delta.
        dy: f64,
    },
    /// Key pressed.
    KeyPress {
        /// Platform key code.
        code: u32,
    },
    /// Viewport scrolled.
    Scroll {
        /// Horizontal scroll offset in pixels.
        x: f64,
        /// Vertical scroll offset in pixels.
        y: f64,
    },
    /// Viewport resized.
    Resize {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// Animation frame observed.
    FrameJitter {
        /// Measured interval since the previous frame.
        interval: Duration,
    },
}

#[inline]
fn fixed(v: f64) -> u32 {
    // Saturating; NaN maps to zero.
    (v * FIXED_POINT_SCALE) as i32 as u32
}

#[inline]
fn pack_pair(a: u32, b: u32) -> u32 {
    ((a & 0xFFFF) << 16) | (b & 0xFFFF)
}

impl AmbientEvent {
    /// Reduces the event to one or two words.
    ///
    /// `stamp` is the sub-millisecond timestamp fragment taken when the
    /// event was recorded.
    pub fn reduce(&self, stamp: u32) -> (u32, Option<u32>) {
        match *self {
            AmbientEvent::PointerMove { x, y } => (pack_pair(fixed(x), fixed(y)), Some(stamp)),
            AmbientEvent::Wheel { dx, dy } => {
                (fixed(dx) ^ fixed(dy).rotate_left(16), Some(stamp))
            }
            AmbientEvent::KeyPress { code } => (code.rotate_left(16) ^ stamp, None),
            AmbientEvent::Scroll { x, y } => (pack_pair(fixed(x), fixed(y)), Some(stamp)),
            AmbientEvent::Resize { width, height } => {
                (pack_pair(width, height) ^ stamp.rotate_left(8), None)
            }
            AmbientEvent::FrameJitter { interval } => {
                (interval.as_nanos() as u32 ^ stamp.rotate_left(16), None)
            }
        }
    }
}

/// Creates a stirrer handle and the queue it feeds.
///
/// `capacity` bounds the queue in words; recording into a full queue
/// drops the word.
pub fn ambient_channel(capacity: usize) -> (AmbientStirrer, AmbientQueue) {
    let (tx, rx) = bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        AmbientStirrer {
            tx,
            epoch: Instant::now(),
            dropped: Arc::clone(&dropped),
        },
        AmbientQueue { rx, dropped },
    )
}

/// Cheap, cloneable handle for event-handling code.
#[derive(Debug, Clone)]
pub struct AmbientStirrer {
    tx: Sender<u32>,
    epoch: Instant,
    dropped: Arc<AtomicU64>,
}

impl AmbientStirrer {
    /// Records an event. Never blocks.
    pub fn record(&self, event: AmbientEvent) {
        let (first, second) = event.reduce(self.stamp());
        self.push(first);
        if let Some(word) = second {
            self.push(word);
        }
    }

    /// Enqueues a raw word. Never blocks.
    pub fn push(&self, word: u32) {
        if self.tx.try_send(word).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Low 32 bits of the nanoseconds since the handle was created.
    fn stamp(&self) -> u32 {
        self.epoch.elapsed().as_nanos() as u32
    }
}

/// Consumer side of the ambient word queue.
#[derive(Debug)]
pub struct AmbientQueue {
    rx: Receiver<u32>,
    dropped: Arc<AtomicU64>,
}

impl AmbientQueue {
    /// Stirs every queued word into `pool`; returns how many.
    pub fn drain_into<R: RngCore + CryptoRng>(&self, pool: &mut EntropyPool<R>) -> usize {
        let mut count = 0;
        for word in self.rx.try_iter() {
            pool.stir(word);
            count += 1;
        }
        count
    }

    /// Words currently waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Words dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    #[test]
    fn test_event_word_counts() {
        let two = [
            AmbientEvent::PointerMove { x: 10.5, y: 20.25 },
            AmbientEvent::Wheel { dx: 0.0, dy: -3.0 },
            AmbientEvent::Scroll { x: 0.0, y: 1200.0 },
        ];
        for event in two {
            assert_eq!(event.reduce(99).1, Some(99));
        }

        let one = [
            AmbientEvent::KeyPress { code: 65 },
            AmbientEvent::Resize { width: 1920, height: 1080 },
            AmbientEvent::FrameJitter { interval: Duration::from_micros(16_667) },
        ];
        for event in one {
            assert_eq!(event.reduce(99).1, None);
        }
    }

    #[test]
    fn test_pointer_packing() {
        let (word, _) = AmbientEvent::PointerMove { x: 1.0, y: 2.0 }.reduce(0);
        assert_eq!(word, (16 << 16) | 32);

        // Sub-pixel motion still changes the word.
        let (nudged, _) = AmbientEvent::PointerMove { x: 1.0625, y: 2.0 }.reduce(0);
        assert_ne!(word, nudged);
    }

    #[test]
    fn test_timestamp_varies_key_word() {
        let key = AmbientEvent::KeyPress { code: 13 };
        assert_ne!(key.reduce(1).0, key.reduce(2).0);
    }

    #[test]
    fn test_non_finite_coordinates_tolerated() {
        let (word, _) = AmbientEvent::PointerMove { x: f64::NAN, y: f64::INFINITY }.reduce(0);
        assert_eq!(word >> 16, 0);
    }

    #[test]
    fn test_queue_drains_into_pool() {
        let (stirrer, queue) = ambient_channel(16);
        let mut pool = EntropyPool::new(ChaCha20Rng::seed_from_u64(1)).unwrap();

        stirrer.record(AmbientEvent::PointerMove { x: 3.0, y: 4.0 });
        stirrer.record(AmbientEvent::KeyPress { code: 32 });
        assert_eq!(queue.len(), 3);

        let before = pool.words_stirred();
        assert_eq!(queue.drain_into(&mut pool), 3);
        assert_eq!(pool.words_stirred(), before + 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_drops() {
        let (stirrer, queue) = ambient_channel(2);
        let clone = stirrer.clone();
        stirrer.push(1);
        clone.push(2);
        clone.push(3);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 1);
    }
}
