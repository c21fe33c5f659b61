use super::BlockLayout;
use crate::error::CacheError;

use std::sync::OnceLock;
use tracing::debug;

/// Owned storage for one block, before it is handed to readers.
pub(crate) type Block = Box<[u8]>;

/// Write-once storage for every block of a stream.
///
/// All blocks are allocated up front by [`allocate`], which hands the empty
/// blocks to the caller (the fill thread). Each block then moves into its slot
/// exactly once via [`publish`]: it can never again be written, resized, or
/// moved, so any reference handed out by [`block_at`] stays valid for the
/// store's lifetime.
///
/// [`allocate`]: BlockStore::allocate
/// [`publish`]: BlockStore::publish
/// [`block_at`]: BlockStore::block_at
#[derive(Debug)]
pub(crate) struct BlockStore {
    slots: Box<[OnceLock<Block>]>,
}

impl BlockStore {
    /// Reserves every block `layout` needs.
    ///
    /// Fails with [`CacheError::OutOfMemory`] if the allocator refuses any
    /// block, or if the stream would exceed `limit` bytes.
    pub(crate) fn allocate(
        layout: &BlockLayout,
        limit: Option<usize>,
    ) -> Result<(Self, Vec<Block>), CacheError> {
        let oom = || CacheError::OutOfMemory {
            requested: Some(layout.total_bytes),
        };

        if limit.map_or(false, |limit| layout.total_bytes > limit) {
            return Err(oom());
        }

        let mut slots = Vec::new();
        slots.try_reserve_exact(layout.block_count).map_err(|_| oom())?;
        slots.resize_with(layout.block_count, OnceLock::new);

        let mut blocks = Vec::new();
        blocks.try_reserve_exact(layout.block_count).map_err(|_| oom())?;
        for i in 0..layout.block_count {
            let len = layout.block_len(i);
            let mut block = Vec::new();
            block.try_reserve_exact(len).map_err(|_| oom())?;
            block.resize(len, 0);
            blocks.push(block.into_boxed_slice());
        }

        debug!(
            blocks = layout.block_count,
            bytes = layout.total_bytes,
            "Allocated block store."
        );

        Ok((
            Self {
                slots: slots.into_boxed_slice(),
            },
            blocks,
        ))
    }

    /// Makes a filled block visible to readers.
    ///
    /// Publishing the same index twice is a logic error; the second block is
    /// discarded.
    pub(crate) fn publish(&self, index: usize, block: Block) {
        let res = self.slots[index].set(block);
        debug_assert!(res.is_ok(), "block {index} published twice");
    }

    /// Returns block `index`, if it has been published.
    pub(crate) fn block_at(&self, index: usize) -> Option<&[u8]> {
        self.slots.get(index)?.get().map(AsRef::as_ref)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
