use super::{store::Block, BlockLayout, FillStatus, Shared};
use crate::source::{AudioSource, DecodeError};

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{atomic::Ordering, Arc},
};
use tracing::{instrument, trace, warn};

/// The cache's fill thread: decodes `source` block by block into the store.
///
/// Each block is fully decoded before it is published, and only then is the
/// progress counter advanced past its samples. The cancellation flag is
/// checked before each block; a decode already under way always runs to
/// completion.
#[instrument(skip(source, shared, blocks))]
pub(crate) fn runner<S: AudioSource + ?Sized>(
    mut source: Box<S>,
    shared: Arc<Shared>,
    layout: BlockLayout,
    blocks: Vec<Block>,
) {
    trace!("Fill thread started.");

    let status = fill(&mut *source, &shared, &layout, blocks);

    match &status {
        FillStatus::Failed(e) => warn!(
            decoded = shared.decoded.load(Ordering::Acquire),
            "Fill stopped: {e}"
        ),
        other => trace!("Fill thread finished: {other:?}."),
    }

    shared.monitor.finish(status);
}

fn fill<S: AudioSource + ?Sized>(
    source: &mut S,
    shared: &Shared,
    layout: &BlockLayout,
    blocks: Vec<Block>,
) -> FillStatus {
    for (index, mut block) in blocks.into_iter().enumerate() {
        if shared.cancelled.load(Ordering::Acquire) {
            return FillStatus::Cancelled;
        }

        let start = layout.block_start(index);
        let count = layout.samples_in_block(index);

        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            source.decode(&mut block, start, count)
        }))
        .unwrap_or(Err(DecodeError::Panicked));

        if let Err(e) = res {
            return FillStatus::Failed(Arc::new(e));
        }

        shared.store.publish(index, block);
        let decoded = shared.decoded.fetch_add(count, Ordering::Release) + count;

        trace!(index, decoded, "Published block.");
        shared.monitor.block_ready(index, decoded);
    }

    FillStatus::Complete
}
