//! Constants affecting cache layout and worker setup.

/// Default size of a cache block, as a power of two.
pub const DEFAULT_BLOCK_BITS: u8 = 22;

/// Default size (in bytes) of one cache block: 4 MiB.
pub const DEFAULT_BLOCK_SIZE: usize = 1 << DEFAULT_BLOCK_BITS;

/// Largest block size accepted by a [`Config`], as a power of two.
///
/// [`Config`]: crate::Config
pub const MAX_BLOCK_BITS: u8 = 30;

/// Default name given to each cache's fill thread.
pub const FILL_THREAD_NAME: &str = "blockcache-fill";

/// Size in bytes of one `f32` sample, as emitted by decoding sources.
pub const F32_SAMPLE_BYTES: usize = std::mem::size_of::<f32>();
