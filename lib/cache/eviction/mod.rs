//! Cache eviction policies.

mod forward;

pub use forward::ForwardSweep;

use crate::cache::BlockCache;

/// Decides which cached blocks to drop after a read.
///
/// Kept separate from fetch coordination so the sweep heuristic can be
/// swapped without touching the single-flight logic.
pub trait EvictionPolicy: Send + Sync + 'static {
    /// Sweep `cache` after a read that started at byte offset `boundary`.
    fn sweep(&self, cache: &BlockCache, boundary: u64);
}
