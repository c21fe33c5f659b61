#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
//! A RAM cache for decoded audio, filled in the background.
//!
//! A [`BlockCache`] takes ownership of an [`AudioSource`] and immediately starts
//! decoding the whole stream, in order, into fixed-size blocks on a dedicated
//! thread. Any number of threads can read arbitrary sample ranges from the cache
//! at the same time with [`BlockCache::fill_buffer`]: reads never wait for the
//! decoder, returning real audio for whatever has been decoded so far and
//! silence for the rest. This decouples decoding speed from the latency needs
//! of waveform renderers or playback engines.
//!
//! ```no_run
//! use blockcache::{source::SymphoniaSource, BlockCache};
//!
//! let source = SymphoniaSource::open("song.flac")?;
//! let cache = BlockCache::new(source)?;
//!
//! let format = cache.format();
//! let mut buf = vec![0u8; 4_800 * format.frame_bytes()];
//! cache.fill_buffer(&mut buf, 48_000, 4_800);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The cache never converts or resamples audio: bytes read back are exactly
//! those produced by the source. Enable the `"symphonia"` feature (on by
//! default) for [`SymphoniaSource`], which decodes any format [Symphonia]
//! supports into interleaved `f32`s.
//!
//! [`SymphoniaSource`]: source::SymphoniaSource
//! [Symphonia]: https://github.com/pdeljanov/Symphonia

#![warn(clippy::pedantic)]
#![allow(
    // Allowed as they are too pedantic
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
)]

mod cache;
mod config;
pub mod constants;
pub mod error;
pub mod source;

#[cfg(feature = "symphonia")]
pub use symphonia;

pub use crate::{
    cache::{BlockCache, BlockLayout, FillEvent, FillStatus},
    config::Config,
    error::CacheError,
    source::{AudioFormat, AudioSource, DecodeError},
};
