use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    io::Error as IoError,
};
#[cfg(feature = "symphonia")]
use symphonia::core::errors::Error as SymphError;

/// Errors raised by an [`AudioSource`] while decoding.
///
/// [`AudioSource`]: super::AudioSource
#[non_exhaustive]
#[derive(Debug)]
pub enum DecodeError {
    /// The requested range lies (partly) outside the stream.
    OutOfRange {
        /// First sample requested.
        start: u64,
        /// Number of samples requested.
        count: u64,
        /// Total samples in the stream.
        total: u64,
    },
    /// The source panicked while decoding.
    Panicked,
    /// Reading the underlying media failed.
    Io(IoError),
    /// Symphonia failed to parse the container or decode the default track.
    #[cfg(feature = "symphonia")]
    Symphonia(SymphError),
    /// The media holds no decodable audio track.
    NoTrack,
    /// The track's channel count could not be determined.
    UnknownChannelCount,
    /// The track's length in samples could not be determined.
    UnknownLength,
    /// Any other, source-specific failure.
    Fail(Box<dyn StdError + Send + Sync>),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("failed to decode audio -- ")?;
        match self {
            Self::OutOfRange {
                start,
                count,
                total,
            } => f.write_fmt(format_args!(
                "samples {start}..{} requested from a {total}-sample stream",
                start.saturating_add(*count)
            )),
            Self::Panicked => f.write_str("source panicked"),
            Self::Io(e) => f.write_fmt(format_args!("{e}")),
            #[cfg(feature = "symphonia")]
            Self::Symphonia(e) => f.write_fmt(format_args!("{e}")),
            Self::NoTrack => f.write_str("no audio track found"),
            Self::UnknownChannelCount => f.write_str("channel count could not be determined"),
            Self::UnknownLength => f.write_str("stream length could not be determined"),
            Self::Fail(why) => f.write_fmt(format_args!("{why}")),
        }
    }
}

impl StdError for DecodeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "symphonia")]
            Self::Symphonia(e) => Some(e),
            Self::Fail(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<IoError> for DecodeError {
    fn from(val: IoError) -> Self {
        Self::Io(val)
    }
}

#[cfg(feature = "symphonia")]
impl From<SymphError> for DecodeError {
    fn from(val: SymphError) -> Self {
        Self::Symphonia(val)
    }
}
