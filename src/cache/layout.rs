use crate::{
    constants::MAX_BLOCK_BITS,
    error::{CacheError, FormatError},
    source::AudioFormat,
};

/// How a stream is divided into cache blocks.
///
/// Every block but the last holds exactly `samples_per_block` samples; the
/// last holds whatever remains. Blocks are sized to whole samples, so a block
/// may be slightly smaller than the configured block size when the sample
/// width does not divide it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    /// Format of the cached stream.
    pub format: AudioFormat,
    /// Number of samples held by each full block.
    pub samples_per_block: u64,
    /// Number of blocks needed for the whole stream.
    pub block_count: usize,
    /// Total bytes held across every block.
    pub total_bytes: usize,
}

impl BlockLayout {
    /// Plans the blocks needed to cache a stream of `format` using blocks
    /// of `2^block_bits` bytes.
    pub fn new(format: AudioFormat, block_bits: u8) -> Result<Self, CacheError> {
        if block_bits == 0 || block_bits > MAX_BLOCK_BITS {
            return Err(FormatError::BlockBits(block_bits).into());
        }
        if format.channels == 0 {
            return Err(FormatError::ZeroChannels.into());
        }
        if format.bytes_per_sample == 0 {
            return Err(FormatError::ZeroSampleWidth.into());
        }

        let block_bytes = 1usize << block_bits;
        let frame_bytes = format
            .bytes_per_sample
            .checked_mul(format.channels)
            .ok_or(CacheError::OutOfMemory { requested: None })?;
        let samples_per_block = (block_bytes / frame_bytes) as u64;

        if samples_per_block == 0 {
            return Err(FormatError::SampleLargerThanBlock {
                frame_bytes,
                block_bytes,
            }
            .into());
        }

        let total_bytes = format
            .byte_len()
            .ok_or(CacheError::OutOfMemory { requested: None })?;
        let oom = || CacheError::OutOfMemory {
            requested: Some(total_bytes),
        };

        // No allocation may exceed `isize::MAX` bytes.
        if total_bytes > isize::MAX as usize {
            return Err(oom());
        }

        let whole_blocks = format.sample_count / samples_per_block;
        let partial = u64::from(format.sample_count % samples_per_block != 0);
        let block_count = usize::try_from(whole_blocks + partial).map_err(|_| oom())?;

        Ok(Self {
            format,
            samples_per_block,
            block_count,
            total_bytes,
        })
    }

    /// Bytes occupied by one sample across all channels.
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.format.frame_bytes()
    }

    /// First sample held in block `index`.
    #[must_use]
    pub fn block_start(&self, index: usize) -> u64 {
        index as u64 * self.samples_per_block
    }

    /// Number of samples held in block `index`.
    #[must_use]
    pub fn samples_in_block(&self, index: usize) -> u64 {
        self.samples_per_block
            .min(self.format.sample_count.saturating_sub(self.block_start(index)))
    }

    /// Bytes allocated for block `index`.
    #[must_use]
    pub fn block_len(&self, index: usize) -> usize {
        self.samples_in_block(index) as usize * self.frame_bytes()
    }

    /// Splits a sample offset into its block index and byte offset within that block.
    #[must_use]
    pub fn locate(&self, sample: u64) -> (usize, usize) {
        let index = (sample / self.samples_per_block) as usize;
        let offset = (sample % self.samples_per_block) as usize * self.frame_bytes();

        (index, offset)
    }
}
