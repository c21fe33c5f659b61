//! Decoded-audio sources which a [`BlockCache`] can be filled from.
//!
//! An [`AudioSource`] produces raw interleaved sample bytes for any range of
//! samples it is asked for. Sources are moved onto the cache's fill thread,
//! so they must be [`Send`], but are otherwise only ever called from that
//! one thread.
//!
//! Throughout this crate a *sample* means one sample point across every
//! channel: a stereo 16-bit sample is 4 bytes wide.
//!
//! [`BlockCache`]: crate::BlockCache

mod error;
mod memory;
#[cfg(feature = "symphonia")]
mod decoder;

pub use self::{error::*, memory::*};
#[cfg(feature = "symphonia")]
pub use decoder::*;

/// Fixed properties of the audio produced by an [`AudioSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Total number of samples in the stream.
    pub sample_count: u64,
    /// Width in bytes of one sample of one channel.
    pub bytes_per_sample: usize,
    /// Number of interleaved channels.
    pub channels: usize,
    /// Samples per second.
    pub sample_rate: u32,
    /// Whether samples are IEEE floats rather than signed integers.
    pub float: bool,
}

impl AudioFormat {
    /// Bytes occupied by one sample across all channels.
    ///
    /// Saturates at `usize::MAX` for widths which cannot be addressed.
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.bytes_per_sample.saturating_mul(self.channels)
    }

    /// Bytes needed to hold `count` samples, if that fits in `usize`.
    #[must_use]
    pub fn bytes_for(&self, count: u64) -> Option<usize> {
        usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(self.frame_bytes()))
    }

    /// Bytes needed to hold the whole stream, if that fits in `usize`.
    #[must_use]
    pub fn byte_len(&self) -> Option<usize> {
        self.bytes_for(self.sample_count)
    }
}

/// A provider of decoded, interleaved audio.
pub trait AudioSource: Send {
    /// Returns the format of this source's audio.
    ///
    /// This must not change over the lifetime of the source.
    fn format(&self) -> AudioFormat;

    /// Fills `buf` with `count` samples of audio starting at sample `start`.
    ///
    /// `buf` is exactly `count * format().frame_bytes()` bytes long. This may
    /// block for as long as decoding takes.
    fn decode(&mut self, buf: &mut [u8], start: u64, count: u64) -> Result<(), DecodeError>;
}

impl<T: AudioSource + ?Sized> AudioSource for Box<T> {
    fn format(&self) -> AudioFormat {
        (**self).format()
    }

    fn decode(&mut self, buf: &mut [u8], start: u64, count: u64) -> Result<(), DecodeError> {
        (**self).decode(buf, start, count)
    }
}

pub(crate) fn check_range(format: &AudioFormat, start: u64, count: u64) -> Result<(), DecodeError> {
    match start.checked_add(count) {
        Some(end) if end <= format.sample_count => Ok(()),
        _ => Err(DecodeError::OutOfRange {
            start,
            count,
            total: format.sample_count,
        }),
    }
}
