use crate::source::DecodeError;

use flume::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

/// State of a cache's background fill.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum FillStatus {
    /// The fill thread is still decoding.
    Filling,
    /// Every block has been decoded and published.
    Complete,
    /// The cache was dropped before the fill finished.
    Cancelled,
    /// The source failed; samples from the failed block onwards will
    /// always read back as silence.
    Failed(Arc<DecodeError>),
}

impl FillStatus {
    /// Returns whether the fill thread has stopped, for any reason.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Filling)
    }
}

/// Progress notifications sent by a cache's fill thread.
///
/// See [`BlockCache::subscribe`].
///
/// [`BlockCache::subscribe`]: crate::BlockCache::subscribe
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum FillEvent {
    /// Block `index` has been published; `decoded` samples are now readable.
    BlockReady {
        /// Index of the newly readable block.
        index: usize,
        /// Total number of readable samples.
        decoded: u64,
    },
    /// Every block has been decoded.
    Complete,
    /// Filling stopped early because the cache was dropped.
    Cancelled,
    /// Filling stopped because the source failed.
    Failed(Arc<DecodeError>),
}

impl FillEvent {
    fn from_final(status: &FillStatus) -> Option<Self> {
        match status {
            FillStatus::Filling => None,
            FillStatus::Complete => Some(Self::Complete),
            FillStatus::Cancelled => Some(Self::Cancelled),
            FillStatus::Failed(e) => Some(Self::Failed(e.clone())),
        }
    }
}

#[derive(Debug)]
struct MonitorState {
    status: FillStatus,
    listeners: Vec<Sender<FillEvent>>,
}

/// Fill status, and the channels listening for changes to it.
///
/// Both live behind one lock so that a listener added after the fill ends
/// still learns how it ended.
#[derive(Debug)]
pub(crate) struct Monitor {
    state: Mutex<MonitorState>,
}

impl Monitor {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MonitorState {
                status: FillStatus::Filling,
                listeners: Vec::new(),
            }),
        }
    }

    pub(crate) fn status(&self) -> FillStatus {
        self.state.lock().status.clone()
    }

    pub(crate) fn subscribe(&self) -> Receiver<FillEvent> {
        let (tx, rx) = flume::unbounded();
        let mut state = self.state.lock();

        if let Some(evt) = FillEvent::from_final(&state.status) {
            // Receiver is held locally, so this cannot fail.
            let _ = tx.send(evt);
        } else {
            state.listeners.push(tx);
        }

        rx
    }

    pub(crate) fn block_ready(&self, index: usize, decoded: u64) {
        let mut state = self.state.lock();
        if state.listeners.is_empty() {
            return;
        }

        let evt = FillEvent::BlockReady { index, decoded };
        state.listeners.retain(|tx| tx.send(evt.clone()).is_ok());
    }

    /// Records the final status and notifies, then drops, every listener.
    pub(crate) fn finish(&self, status: FillStatus) {
        let mut state = self.state.lock();
        let evt = FillEvent::from_final(&status);
        state.status = status;

        if let Some(evt) = evt {
            for tx in state.listeners.drain(..) {
                let _ = tx.send(evt.clone());
            }
        }
    }
}
