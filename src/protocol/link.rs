//! Bounded, non-blocking channel pair between host and render.

use super::{HostMessage, RenderMessage};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use thiserror::Error;

/// Why a message was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PostError {
    /// The peer's queue is at capacity.
    #[error("peer queue is full")]
    Full,
    /// The peer end of the link was dropped.
    #[error("peer has gone away")]
    Closed,
}

impl<T> From<TrySendError<T>> for PostError {
    fn from(err: TrySendError<T>) -> Self {
        match err {
            TrySendError::Full(_) => PostError::Full,
            TrySendError::Disconnected(_) => PostError::Closed,
        }
    }
}

/// Host side of the link: sends seeds and mode changes, receives requests.
#[derive(Debug, Clone)]
pub struct HostPort {
    tx: Sender<HostMessage>,
    rx: Receiver<RenderMessage>,
}

impl HostPort {
    /// Sends without blocking.
    pub fn post(&self, message: HostMessage) -> Result<(), PostError> {
        self.tx.try_send(message).map_err(PostError::from)
    }

    /// Takes the next pending render message, if any.
    pub fn try_recv(&self) -> Option<RenderMessage> {
        self.rx.try_recv().ok()
    }
}

/// Render side of the link. Owned by the engine.
#[derive(Debug)]
pub struct RenderPort {
    rx: Receiver<HostMessage>,
    tx: Sender<RenderMessage>,
}

impl RenderPort {
    /// Takes the next pending host message, if any.
    ///
    /// Disconnection is reported the same as an empty inbox; the engine
    /// keeps rendering on whatever state it has.
    #[inline]
    pub fn try_recv(&self) -> Option<HostMessage> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Sends without blocking.
    #[inline]
    pub fn post(&self, message: RenderMessage) -> Result<(), PostError> {
        self.tx.try_send(message).map_err(PostError::from)
    }
}

/// Creates a linked host/render port pair.
///
/// `to_render` bounds the host to render queue, `to_host` the reverse.
/// Both are clamped to at least one slot.
pub fn link(to_render: usize, to_host: usize) -> (HostPort, RenderPort) {
    let (host_tx, render_rx) = bounded(to_render.max(1));
    let (render_tx, host_rx) = bounded(to_host.max(1));
    (
        HostPort {
            tx: host_tx,
            rx: host_rx,
        },
        RenderPort {
            rx: render_rx,
            tx: render_tx,
        },
    )
}
