use crate::constants::*;

/// Configuration for a [`BlockCache`].
///
/// [`BlockCache`]: crate::BlockCache
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// Size of each cache block, as a power of two.
    ///
    /// Blocks are the unit of decoding and of publication to readers:
    /// a reader sees nothing of a block until the whole block has been
    /// decoded. Smaller blocks make data available sooner at the cost
    /// of more calls into the source.
    ///
    /// Must lie in `1..=`[`MAX_BLOCK_BITS`]. Defaults to
    /// [`DEFAULT_BLOCK_BITS`] (4 MiB blocks).
    pub block_bits: u8,

    /// Upper bound on the total number of bytes the cache may hold.
    ///
    /// Streams needing more than this fail construction with
    /// [`CacheError::OutOfMemory`], exactly as if the allocator had refused.
    ///
    /// Defaults to `None`, limited only by available memory.
    ///
    /// [`CacheError::OutOfMemory`]: crate::error::CacheError::OutOfMemory
    pub memory_limit: Option<usize>,

    /// Name given to the fill thread.
    ///
    /// Defaults to [`FILL_THREAD_NAME`].
    pub thread_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_bits: DEFAULT_BLOCK_BITS,
            memory_limit: None,
            thread_name: FILL_THREAD_NAME.into(),
        }
    }
}

impl Config {
    /// Sets this `Config`'s block size, as a power of two.
    #[must_use]
    pub fn block_bits(mut self, block_bits: u8) -> Self {
        self.block_bits = block_bits;
        self
    }

    /// Sets this `Config`'s total memory limit.
    #[must_use]
    pub fn memory_limit(mut self, memory_limit: Option<usize>) -> Self {
        self.memory_limit = memory_limit;
        self
    }

    /// Sets this `Config`'s fill thread name.
    #[must_use]
    pub fn thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Returns the size in bytes of one block under this `Config`.
    #[must_use]
    pub fn block_size(&self) -> usize {
        1 << self.block_bits.min(MAX_BLOCK_BITS)
    }
}
