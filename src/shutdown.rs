//! Process-wide, close-once stop signal.
//!
//! The coordinator holds the only `Sender` of a zero-capacity channel and never
//! sends on it. Dropping that sender disconnects the channel, which wakes every
//! receiver at once, however many Watchers are waiting.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

#[derive(Debug)]
pub struct Shutdown {
    trigger: Mutex<Option<Sender<()>>>,
    signal: ShutdownSignal,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            trigger: Mutex::new(Some(tx)),
            signal: ShutdownSignal { rx },
        }
    }

    /// Handle for a waiter.
    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    /// Closes the signal.
    ///
    /// # Panics
    ///
    /// Closing twice is a programming error and panics.
    pub fn trigger(&self) {
        let sender = self.trigger.lock().take();
        match sender {
            Some(tx) => drop(tx),
            None => panic!("shutdown signal closed twice"),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.trigger.lock().is_none()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Waiting side of [`Shutdown`]. Cheap to clone, one per Watcher.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: Receiver<()>,
}

impl ShutdownSignal {
    /// Channel that becomes disconnected on shutdown, for use in `select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Blocks until shutdown.
    pub fn wait(&self) {
        // Nothing is ever sent, so recv only returns once the sender is gone.
        let _ = self.rx.recv();
    }
}
