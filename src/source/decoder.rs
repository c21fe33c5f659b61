use super::{check_range, AudioFormat, AudioSource, DecodeError};
use crate::constants::F32_SAMPLE_BYTES;

use byteorder::{ByteOrder, LittleEndian};
use std::{
    ffi::OsStr,
    fs::File,
    io::ErrorKind as IoErrorKind,
    mem,
    path::Path,
};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CodecRegistry, Decoder, DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphError,
    formats::{FormatOptions, FormatReader, SeekMode, SeekTo},
    io::{MediaSource, MediaSourceStream},
    meta::MetadataOptions,
    probe::{Hint, Probe},
};
use tracing::{debug, trace};

/// An [`AudioSource`] which decodes any container and codec known to
/// Symphonia's default registries, or to registries supplied via
/// [`with_registries`].
///
/// Audio is produced as interleaved little-endian `f32`s, in the track's
/// native channel count and sample rate.
///
/// Requests for consecutive ranges (as issued by a [`BlockCache`]'s fill
/// thread) decode straight through the stream. Any other request seeks the
/// underlying format reader first, assuming that track timestamps count
/// samples, as is the case for all of Symphonia's audio formats.
///
/// [`BlockCache`]: crate::BlockCache
/// [`with_registries`]: SymphoniaSource::with_registries
pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    audio_format: AudioFormat,
    /// Sample index which the next decoded float belongs to.
    position: u64,
    /// Interleaved floats from the last packet, not yet handed out.
    pending: Vec<f32>,
    pending_pos: usize,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl SymphoniaSource {
    /// Opens and probes a file, using its extension as a format hint.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(OsStr::to_str) {
            hint.with_extension(ext);
        }

        Self::new(Box::new(file), &hint)
    }

    /// Probes `media` and builds a decoder for its default audio track.
    ///
    /// The track must declare both its channel count and its length in
    /// samples, as the cache must know the size of the whole stream up front.
    pub fn new(media: Box<dyn MediaSource>, hint: &Hint) -> Result<Self, DecodeError> {
        Self::with_registries(
            media,
            hint,
            symphonia::default::get_probe(),
            symphonia::default::get_codecs(),
        )
    }

    /// Probes `media` with a custom set of formats and codecs.
    ///
    /// Use this to decode formats or codecs registered outside Symphonia's
    /// defaults, e.g., by building a [`Probe`] and [`CodecRegistry`] with
    /// [`symphonia::default::register_enabled_formats`] and
    /// [`symphonia::default::register_enabled_codecs`] and then adding
    /// your own.
    pub fn with_registries(
        media: Box<dyn MediaSource>,
        hint: &Hint,
        probe: &Probe,
        codecs: &CodecRegistry,
    ) -> Result<Self, DecodeError> {
        let mss = MediaSourceStream::new(media, Default::default());
        let probed = probe.format(
            hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let format = probed.format;

        let track = format
            .default_track()
            .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .or_else(|| {
                format
                    .tracks()
                    .iter()
                    .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            })
            .ok_or(DecodeError::NoTrack)?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let decoder = codecs.make(&params, &DecoderOptions::default())?;

        let channels = params
            .channels
            .ok_or(DecodeError::UnknownChannelCount)?
            .count();
        let sample_count = params.n_frames.ok_or(DecodeError::UnknownLength)?;

        let audio_format = AudioFormat {
            sample_count,
            bytes_per_sample: F32_SAMPLE_BYTES,
            channels,
            sample_rate: params.sample_rate.unwrap_or_default(),
            float: true,
        };

        debug!(
            track_id,
            sample_count,
            channels,
            sample_rate = audio_format.sample_rate,
            "Opened track for decoding."
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            audio_format,
            position: 0,
            pending: Vec::new(),
            pending_pos: 0,
            sample_buf: None,
        })
    }

    /// Decodes the next packet of the chosen track into `pending`.
    ///
    /// Returns `false` once the stream is exhausted.
    fn next_packet(&mut self) -> Result<bool, DecodeError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(pkt) => pkt,
                Err(SymphError::IoError(e)) if e.kind() == IoErrorKind::UnexpectedEof =>
                    return Ok(false),
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphError::DecodeError(why)) => {
                    debug!("Skipping undecodable packet: {why}");
                    continue;
                },
                Err(e) => return Err(e.into()),
            };

            if decoded.frames() == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            let too_small = self
                .sample_buf
                .as_ref()
                .map_or(true, |b| b.capacity() < decoded.capacity() * spec.channels.count());
            if too_small {
                self.sample_buf = None;
            }

            let sample_buf = self
                .sample_buf
                .get_or_insert_with(|| SampleBuffer::new(duration, spec));
            sample_buf.copy_interleaved_ref(decoded);

            self.pending.clear();
            self.pending.extend_from_slice(sample_buf.samples());
            self.pending_pos = 0;

            return Ok(true);
        }
    }

    fn seek_to(&mut self, sample: u64) -> Result<(), DecodeError> {
        trace!(from = self.position, to = sample, "Seeking.");

        let seeked = self.format.seek(SeekMode::Accurate, SeekTo::TimeStamp {
            ts: sample,
            track_id: self.track_id,
        })?;
        self.decoder.reset();
        self.pending.clear();
        self.pending_pos = 0;

        // Accurate seeks may land before the requested sample, never after.
        let chans = self.audio_format.channels;
        let mut to_skip = sample.saturating_sub(seeked.actual_ts);
        while to_skip > 0 {
            if self.pending_pos == self.pending.len() && !self.next_packet()? {
                break;
            }

            let held = ((self.pending.len() - self.pending_pos) / chans) as u64;
            let skipped = held.min(to_skip);
            self.pending_pos += skipped as usize * chans;
            to_skip -= skipped;
        }

        self.position = sample;

        Ok(())
    }
}

impl AudioSource for SymphoniaSource {
    fn format(&self) -> AudioFormat {
        self.audio_format
    }

    fn decode(&mut self, buf: &mut [u8], start: u64, count: u64) -> Result<(), DecodeError> {
        check_range(&self.audio_format, start, count)?;

        if start != self.position {
            self.seek_to(start)?;
        }

        let byte_len = count as usize * self.audio_format.frame_bytes();
        let mut out = &mut buf[..byte_len];

        while !out.is_empty() {
            if self.pending_pos == self.pending.len() {
                if self.next_packet()? {
                    continue;
                }

                // Stream ended short of its declared length.
                out.fill(0);
                break;
            }

            let floats = (self.pending.len() - self.pending_pos).min(out.len() / F32_SAMPLE_BYTES);
            let (head, tail) = mem::take(&mut out).split_at_mut(floats * F32_SAMPLE_BYTES);
            LittleEndian::write_f32_into(
                &self.pending[self.pending_pos..self.pending_pos + floats],
                head,
            );

            self.pending_pos += floats;
            out = tail;
        }

        self.position = start + count;

        Ok(())
    }
}
