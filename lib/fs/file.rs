//! A single remote file: block-stride reads, read-ahead, and eviction.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use range_client::{RangeError, RangeSource};
use tracing::trace;

use crate::cache::{BlockCache, EvictionPolicy, ForwardSweep};

/// How many blocks past the current read position to prefetch.
const READ_AHEAD_BLOCKS: u64 = 2;

/// A remote object exposed as a readable file.
///
/// Reads are assembled block by block out of the per-file [`BlockCache`];
/// misses fetch whole block-aligned ranges from the [`RangeSource`]. Cheap to
/// clone, so detached read-ahead tasks can hold their own handle.
pub struct RemoteFile<S: RangeSource> {
    inner: Arc<Inner<S>>,
}

impl<S: RangeSource> Clone for RemoteFile<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S> {
    name: String,
    url: String,
    size: u64,
    block_size: u64,
    cache: BlockCache,
    source: S,
    policy: Arc<dyn EvictionPolicy>,
}

impl<S: RangeSource> RemoteFile<S> {
    /// Create a file of known `size`, cached in `block_size`-byte blocks,
    /// swept with the default [`ForwardSweep`] policy.
    pub fn new(name: String, url: String, size: u64, block_size: u64, source: S) -> Self {
        Self::with_policy(
            name,
            url,
            size,
            block_size,
            source,
            Arc::new(ForwardSweep::default()),
        )
    }

    /// Create a file with an explicit eviction policy.
    pub fn with_policy(
        name: String,
        url: String,
        size: u64,
        block_size: u64,
        source: S,
        policy: Arc<dyn EvictionPolicy>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                url,
                size,
                block_size,
                cache: BlockCache::new(),
                source,
                policy,
            }),
        }
    }

    /// The file's name within the mount root.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Total size in bytes, as discovered at assembly time.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.inner.size
    }

    /// Cache block size in bytes.
    #[must_use]
    pub fn block_size(&self) -> u64 {
        self.inner.block_size
    }

    /// The file's block cache, exposed for observation.
    #[must_use]
    pub fn cache(&self) -> &BlockCache {
        &self.inner.cache
    }

    /// Read up to `len` bytes starting at byte `offset`.
    ///
    /// Walks the covered blocks in order, fetching each through the cache,
    /// and returns a contiguous buffer. A read past the true end of the
    /// object comes back short. After the bytes are assembled, read-ahead is
    /// kicked off and the eviction policy sweeps blocks behind `offset`.
    pub async fn read(&self, offset: u64, len: u64) -> Result<Bytes, RangeError> {
        if len == 0 {
            return Ok(Bytes::new());
        }

        let bs = self.inner.block_size;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "read lengths fit in usize on supported 64-bit platforms"
        )]
        let mut out = BytesMut::with_capacity(len as usize);
        let mut copied: u64 = 0;

        while copied < len {
            let pos = offset + copied;
            let block_start = (pos / bs) * bs;
            let block = self.block(block_start).await?;

            #[expect(
                clippy::cast_possible_truncation,
                reason = "in-block positions fit in usize on supported 64-bit platforms"
            )]
            let start_in_block = (pos - block_start) as usize;
            if start_in_block >= block.len() {
                // Short block: we are past the object's true end.
                break;
            }

            #[expect(
                clippy::cast_possible_truncation,
                reason = "in-block lengths fit in usize on supported 64-bit platforms"
            )]
            let want = (len - copied).min(bs - (pos - block_start)) as usize;
            let take = want.min(block.len() - start_in_block);
            out.extend_from_slice(&block[start_in_block..start_in_block + take]);
            copied += take as u64;

            if take < want {
                break;
            }
        }

        if copied > 0 {
            self.spawn_read_ahead(offset + copied - 1);
        }
        self.inner.policy.sweep(&self.inner.cache, offset);

        Ok(out.freeze())
    }

    /// Fetch the block starting at `block_start` through the cache.
    async fn block(&self, block_start: u64) -> Result<Bytes, RangeError> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .cache
            .get_or_fetch(block_start, move || async move {
                inner
                    .source
                    .fetch_range(&inner.url, block_start, inner.block_size)
                    .await
            })
            .await
    }

    /// Prefetch the next [`READ_AHEAD_BLOCKS`] blocks once the read position
    /// is deep enough into its block.
    ///
    /// The one-third threshold keeps scattered small reads from triggering
    /// speculative traffic while still hiding fetch latency on a sequential
    /// scan. Prefetch tasks are detached; their failures only surface as
    /// trace logs, and any real demand for the block retries on its own.
    fn spawn_read_ahead(&self, last_byte: u64) {
        let bs = self.inner.block_size;
        let last_block = (last_byte / bs) * bs;
        if last_byte - last_block + 1 <= bs / 3 {
            return;
        }

        for i in 1..=READ_AHEAD_BLOCKS {
            let target = last_block + i * bs;
            if target >= self.inner.size {
                break;
            }
            let file = self.clone();
            tokio::spawn(async move {
                if let Err(e) = file.block(target).await {
                    trace!(name = %file.inner.name, offset = target, error = %e, "read-ahead fetch failed");
                }
            });
        }
    }
}
