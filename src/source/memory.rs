use super::{check_range, AudioFormat, AudioSource, DecodeError};

/// An [`AudioSource`] over PCM which is already fully decoded in memory.
///
/// This is mainly useful for feeding raw sample data (e.g., from another
/// decoder, or a synthesiser) through APIs which expect a source.
#[derive(Clone, Debug)]
pub struct MemorySource {
    format: AudioFormat,
    data: Vec<u8>,
}

impl MemorySource {
    /// Wrap interleaved sample bytes.
    ///
    /// `format.sample_count` is derived from the length of `data`; any
    /// trailing partial sample is ignored. A sample width of zero, or one too
    /// wide to address, holds no samples.
    #[must_use]
    pub fn new(
        data: Vec<u8>,
        bytes_per_sample: usize,
        channels: usize,
        sample_rate: u32,
        float: bool,
    ) -> Self {
        let sample_count = match bytes_per_sample.checked_mul(channels) {
            Some(0) | None => 0,
            Some(frame_bytes) => (data.len() / frame_bytes) as u64,
        };

        Self {
            format: AudioFormat {
                sample_count,
                bytes_per_sample,
                channels,
                sample_rate,
                float,
            },
            data,
        }
    }

    /// Wrap interleaved `f32` samples.
    #[must_use]
    pub fn from_f32(samples: &[f32], channels: usize, sample_rate: u32) -> Self {
        let data = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        Self::new(data, crate::constants::F32_SAMPLE_BYTES, channels, sample_rate, true)
    }

    /// Returns the wrapped bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl AudioSource for MemorySource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn decode(&mut self, buf: &mut [u8], start: u64, count: u64) -> Result<(), DecodeError> {
        check_range(&self.format, start, count)?;

        let frame_bytes = self.format.frame_bytes();
        let offset = start as usize * frame_bytes;
        let len = count as usize * frame_bytes;
        buf[..len].copy_from_slice(&self.data[offset..offset + len]);

        Ok(())
    }
}
