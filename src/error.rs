//! Errors raised while building a [`BlockCache`].
//!
//! [`BlockCache`]: crate::BlockCache

use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    io::Error as IoError,
};

/// Errors encountered when creating a [`BlockCache`].
///
/// None of these are raised once a cache exists: decode failures on the
/// fill thread are reported through [`FillStatus`] instead.
///
/// [`BlockCache`]: crate::BlockCache
/// [`FillStatus`]: crate::FillStatus
#[derive(Debug)]
#[non_exhaustive]
pub enum CacheError {
    /// Not enough memory was available to hold the whole stream.
    ///
    /// `requested` is the total byte count which could not be reserved, or
    /// `None` if that count does not even fit in `usize`. Callers should fall
    /// back to reading from the source directly.
    OutOfMemory {
        /// Total number of bytes the cache tried to reserve.
        requested: Option<usize>,
    },
    /// The source's sample format cannot be laid out into blocks.
    InvalidFormat(FormatError),
    /// The fill thread could not be spawned.
    Spawn(IoError),
}

impl CacheError {
    /// Returns whether this error is an allocation failure.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::OutOfMemory {
                requested: Some(n),
            } => f.write_fmt(format_args!(
                "not enough memory available to cache {n} bytes in RAM"
            )),
            Self::OutOfMemory { requested: None } =>
                f.write_str("not enough memory available to cache in RAM: stream too large"),
            Self::InvalidFormat(e) => f.write_fmt(format_args!("unusable audio format: {e}")),
            Self::Spawn(e) => f.write_fmt(format_args!("failed to spawn fill thread: {e}")),
        }
    }
}

impl StdError for CacheError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::InvalidFormat(e) => Some(e),
            Self::Spawn(e) => Some(e),
            Self::OutOfMemory { .. } => None,
        }
    }
}

impl From<FormatError> for CacheError {
    fn from(val: FormatError) -> Self {
        Self::InvalidFormat(val)
    }
}

impl From<IoError> for CacheError {
    fn from(val: IoError) -> Self {
        Self::Spawn(val)
    }
}

/// Reasons an [`AudioFormat`] cannot be cached.
///
/// [`AudioFormat`]: crate::source::AudioFormat
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormatError {
    /// The source reported zero channels.
    ZeroChannels,
    /// The source reported zero bytes per sample.
    ZeroSampleWidth,
    /// A single sample (across all channels) does not fit in one block.
    SampleLargerThanBlock {
        /// Bytes in one sample across all channels.
        frame_bytes: usize,
        /// Bytes in one cache block.
        block_bytes: usize,
    },
    /// The requested block size is outside the supported range.
    BlockBits(u8),
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::ZeroChannels => f.write_str("source has no channels"),
            Self::ZeroSampleWidth => f.write_str("source has zero-width samples"),
            Self::SampleLargerThanBlock {
                frame_bytes,
                block_bytes,
            } => f.write_fmt(format_args!(
                "a {frame_bytes}B sample does not fit in a {block_bytes}B block"
            )),
            Self::BlockBits(b) => f.write_fmt(format_args!("block size 2^{b} is not supported")),
        }
    }
}

impl StdError for FormatError {}
