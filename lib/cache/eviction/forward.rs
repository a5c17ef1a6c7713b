//! Forward-only eviction, biased for sequential streaming access.

use super::EvictionPolicy;
use crate::cache::BlockCache;

/// Drops every cached block behind the most recent read position.
///
/// Assumes reads progress monotonically forward (e.g. media playback), so
/// anything behind the current position is permanently discarded. Pessimal
/// for files reread from the start or accessed backward.
#[derive(Debug, Clone, Copy)]
pub struct ForwardSweep {
    /// Sweeps are skipped while fewer than this many blocks are cached,
    /// avoiding eviction overhead for small files and small working sets.
    min_resident: usize,
}

impl ForwardSweep {
    /// Default low-water mark below which no sweep happens.
    pub const DEFAULT_MIN_RESIDENT: usize = 5;

    /// Create a sweep policy with a custom low-water mark.
    #[must_use]
    pub fn new(min_resident: usize) -> Self {
        Self { min_resident }
    }
}

impl Default for ForwardSweep {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_RESIDENT)
    }
}

impl EvictionPolicy for ForwardSweep {
    fn sweep(&self, cache: &BlockCache, boundary: u64) {
        if cache.len() < self.min_resident {
            return;
        }
        cache.evict_before(boundary);
    }
}
