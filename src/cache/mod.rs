//! The block cache and its background fill.

mod layout;
mod status;
mod store;
#[cfg(test)]
mod tests;
mod worker;

pub use self::{layout::*, status::*};

use self::store::BlockStore;
use crate::{
    error::CacheError,
    source::{AudioFormat, AudioSource, DecodeError},
    Config,
};

use flume::Receiver;
use std::{
    mem,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{Builder as ThreadBuilder, JoinHandle},
};
use tracing::debug;

/// State shared between a cache, its readers, and its fill thread.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) store: BlockStore,
    /// Samples decoded and published so far.
    ///
    /// Only the fill thread writes this (with `Release`), and only after
    /// publishing every block below the new value.
    pub(crate) decoded: AtomicU64,
    pub(crate) cancelled: AtomicBool,
    pub(crate) monitor: status::Monitor,
}

/// An in-memory cache of an entire decoded audio stream.
///
/// On creation, the cache allocates enough memory for the whole stream and
/// starts a thread which decodes the source into it, in order, one block at
/// a time. Meanwhile, any number of threads may read from the cache with
/// [`fill_buffer`]: reads never block, returning whatever has been decoded
/// so far and silence for the rest.
///
/// Share a cache between threads by wrapping it in an [`Arc`].
///
/// # Dropping
/// Dropping a `BlockCache` stops the fill thread and **blocks** until it has
/// exited. The thread checks for cancellation between blocks, so a drop may
/// stall for as long as the source takes to decode one block.
///
/// [`fill_buffer`]: BlockCache::fill_buffer
#[derive(Debug)]
pub struct BlockCache {
    shared: Arc<Shared>,
    layout: BlockLayout,
    worker: Option<JoinHandle<()>>,
}

impl BlockCache {
    /// Cache `source` in RAM, using the default [`Config`].
    pub fn new<S: AudioSource + 'static>(source: S) -> Result<Self, CacheError> {
        Self::with_config(source, &Config::default())
    }

    /// Cache `source` in RAM.
    ///
    /// Fails with [`CacheError::OutOfMemory`] if the whole stream cannot be
    /// held in memory (or within [`Config::memory_limit`]). In that case no
    /// thread is started and `source` is dropped without having been read.
    pub fn with_config<S: AudioSource + 'static>(
        source: S,
        config: &Config,
    ) -> Result<Self, CacheError> {
        let layout = BlockLayout::new(source.format(), config.block_bits)?;
        let (store, blocks) = BlockStore::allocate(&layout, config.memory_limit)?;

        let shared = Arc::new(Shared {
            store,
            decoded: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            monitor: status::Monitor::new(),
        });

        let worker_shared = shared.clone();
        let source = Box::new(source);
        let worker = ThreadBuilder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker::runner(source, worker_shared, layout, blocks))?;

        debug!(
            samples = layout.format.sample_count,
            blocks = layout.block_count,
            "Started filling block cache."
        );

        Ok(Self {
            shared,
            layout,
            worker: Some(worker),
        })
    }

    /// Copies `count` samples from sample `start` into `buf`.
    ///
    /// Exactly `count * format().frame_bytes()` bytes of `buf` are written.
    /// Samples which have not been decoded yet (or lie past the end of the
    /// stream) are written as zeroes; if the fill thread publishes more data
    /// while this runs, the newly available part may be included. This never
    /// blocks on the fill thread.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than `count` samples.
    pub fn fill_buffer(&self, buf: &mut [u8], start: u64, count: u64) {
        let frame_bytes = self.layout.frame_bytes();
        let byte_len = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(frame_bytes))
            .unwrap_or(usize::MAX);
        let mut out = &mut buf[..byte_len];
        let mut start = start;

        while !out.is_empty() {
            if start >= self.shared.decoded.load(Ordering::Acquire) {
                out.fill(0);
                break;
            }

            let (index, offset) = self.layout.locate(start);
            let Some(block) = self.shared.store.block_at(index) else {
                out.fill(0);
                break;
            };

            let run = (block.len() - offset).min(out.len());
            let (head, tail) = mem::take(&mut out).split_at_mut(run);
            head.copy_from_slice(&block[offset..offset + run]);

            out = tail;
            start += (run / frame_bytes) as u64;
        }
    }

    /// Returns the number of samples decoded so far.
    ///
    /// Every sample below this count will read back as real audio. This
    /// value never decreases.
    #[must_use]
    pub fn decoded_samples(&self) -> u64 {
        self.shared.decoded.load(Ordering::Acquire)
    }

    /// Returns the current state of the background fill.
    #[must_use]
    pub fn status(&self) -> FillStatus {
        self.shared.monitor.status()
    }

    /// Returns whether the whole stream is cached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.decoded_samples() >= self.layout.format.sample_count
    }

    /// Listen for progress on the background fill.
    ///
    /// The channel receives a [`FillEvent::BlockReady`] for each block
    /// published after subscribing, then one final event describing how the
    /// fill ended, then disconnects. If the fill has already ended, only the
    /// final event is sent.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<FillEvent> {
        self.shared.monitor.subscribe()
    }

    /// Returns the format of the cached audio.
    #[must_use]
    pub fn format(&self) -> AudioFormat {
        self.layout.format
    }

    /// Returns how the stream has been divided into blocks.
    #[must_use]
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Returns the number of bytes reserved for cached audio.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.layout.total_bytes
    }
}

impl AudioSource for BlockCache {
    fn format(&self) -> AudioFormat {
        self.layout.format
    }

    fn decode(&mut self, buf: &mut [u8], start: u64, count: u64) -> Result<(), DecodeError> {
        self.fill_buffer(buf, start, count);
        Ok(())
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        self.shared.cancelled.store(true, Ordering::Release);

        if let Some(worker) = self.worker.take() {
            // Decode panics are caught inside the worker.
            let _ = worker.join();
        }
    }
}
