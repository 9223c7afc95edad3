//! # Notice Hub
//!
//! User-facing notice fan-out (toasts, banners). Historically this kind of
//! thing ends up as a module-level global; here it is an explicitly
//! constructed service owned by the composition root and injected into
//! whoever needs to publish.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

/// Capacity of each subscriber's queue.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 64;

/// Severity of a notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational, no action needed.
    Info,
    /// An operation completed.
    Success,
    /// Something degraded but recoverable (e.g. a fallback path fired).
    Warning,
    /// A terminal failure the user should see.
    Error,
}

/// A single user-facing notice.
#[derive(Clone, Debug)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Human-readable message.
    pub message: String,
}

impl Notice {
    /// Builds a notice.
    #[must_use]
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Injectable pub/sub hub for notices.
///
/// Publishing never blocks: a subscriber whose queue is full misses the
/// notice (logged), and a dropped subscriber is pruned on the next publish.
pub struct NoticeHub {
    subscribers: Mutex<Vec<Sender<Notice>>>,
}

impl NoticeHub {
    /// Creates a hub with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a subscriber and returns its receiving end.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<Notice> {
        let (tx, rx) = bounded(SUBSCRIBER_QUEUE_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Publishes a notice to every live subscriber.
    pub fn publish(&self, notice: Notice) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(notice.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("notice subscriber queue full, dropping notice");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Number of live subscribers at the last publish.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for NoticeHub {
    fn default() -> Self {
        Self::new()
    }
}
