//! Concurrent block cache with single-flight fetch coordination.
//!
//! Maps block-aligned byte offsets to cached blocks. Given an offset and an
//! async fetch, ensures the fetch runs at most once per offset: callers that
//! arrive while a fetch is in flight await the same [`Shared`] future and
//! observe its single outcome, never a partial buffer.
//!
//! A failed fetch removes its entry entirely, so the next caller for that
//! offset retries from scratch.

use std::{future::Future, pin::Pin};

use bytes::Bytes;
use futures::FutureExt as _;
use futures::future::Shared;
use range_client::RangeError;

type SharedFetch = Shared<Pin<Box<dyn Future<Output = Result<Bytes, RangeError>> + Send>>>;

/// Two-state slot: `InFlight` while the block's fetch future is running,
/// promoted to `Ready` once it completes successfully.
enum Slot {
    InFlight(SharedFetch),
    Ready(Bytes),
}

/// Per-file block cache.
///
/// Each file owns exactly one `BlockCache`; it is torn down with the file.
/// Fetches of different offsets proceed in parallel, while concurrent
/// requests for the same offset are coalesced into one remote fetch.
pub struct BlockCache {
    map: scc::HashMap<u64, Slot>,
}

impl Default for BlockCache {
    fn default() -> Self {
        Self {
            map: scc::HashMap::default(),
        }
    }
}

impl BlockCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the block at `offset`, running `fetch` if it is neither resident
    /// nor already being fetched.
    ///
    /// The install is a single atomic get-or-insert on the map entry, so two
    /// racing callers cannot both start a fetch for the same offset. Losers
    /// of the race (and later arrivals) block on the winner's fetch and
    /// receive its outcome.
    pub async fn get_or_fetch<F, Fut>(&self, offset: u64, fetch: F) -> Result<Bytes, RangeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, RangeError>> + Send + 'static,
    {
        // Fast path: block already resident or in flight.
        let existing = self
            .map
            .read_async(&offset, |_, slot| match slot {
                Slot::Ready(block) => Ok(block.clone()),
                Slot::InFlight(shared) => Err(shared.clone()),
            })
            .await;

        match existing {
            Some(Ok(block)) => return Ok(block),
            Some(Err(shared)) => return self.join(offset, shared).await,
            None => {}
        }

        // Slow path: atomic get-or-install. Exactly one caller installs the
        // fetch future; everyone else lands in the occupied arm and joins it.
        let shared = match self.map.entry_async(offset).await {
            scc::hash_map::Entry::Occupied(occ) => match occ.get() {
                Slot::Ready(block) => return Ok(block.clone()),
                Slot::InFlight(shared) => shared.clone(),
            },
            scc::hash_map::Entry::Vacant(vac) => {
                let boxed: Pin<Box<dyn Future<Output = Result<Bytes, RangeError>> + Send>> =
                    Box::pin(fetch());
                let shared = boxed.shared();
                vac.insert_entry(Slot::InFlight(shared.clone()));
                shared
            }
        };

        self.join(offset, shared).await
    }

    /// Await an in-flight fetch; promote the slot on success, remove the
    /// entry on failure so subsequent callers retry from scratch.
    async fn join(&self, offset: u64, shared: SharedFetch) -> Result<Bytes, RangeError> {
        let mut guard = PromoteGuard {
            map: &self.map,
            offset,
            block: None,
        };

        match shared.await {
            Ok(block) => {
                guard.block = Some(block.clone());

                self.map
                    .update_async(&offset, |_, slot| {
                        if matches!(slot, Slot::InFlight(_)) {
                            *slot = Slot::Ready(block.clone());
                        }
                    })
                    .await;

                guard.block = None;
                Ok(block)
            }
            Err(e) => {
                drop(
                    self.map
                        .remove_if_sync(&offset, |slot| matches!(slot, Slot::InFlight(_))),
                );
                Err(e)
            }
        }
    }

    /// Returns `true` if a block (resident or in flight) exists at `offset`.
    pub async fn contains(&self, offset: u64) -> bool {
        self.map.contains_async(&offset).await
    }

    /// Returns `true` if the block at `offset` is resident with data.
    #[must_use]
    pub fn is_ready(&self, offset: u64) -> bool {
        self.map
            .read_sync(&offset, |_, slot| matches!(slot, Slot::Ready(_)))
            .unwrap_or(false)
    }

    /// Number of blocks, resident or in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the cache holds no blocks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Remove every block whose start offset is strictly below `boundary`.
    pub fn evict_before(&self, boundary: u64) {
        self.map.retain_sync(|offset, _| *offset >= boundary);
    }
}

/// Drop guard that synchronously promotes an `InFlight` slot to `Ready` if
/// the joining task is cancelled between the fetch completing and the async
/// promotion running.
///
/// Set `block = None` to defuse after successful promotion.
struct PromoteGuard<'a> {
    map: &'a scc::HashMap<u64, Slot>,
    offset: u64,
    block: Option<Bytes>,
}

impl Drop for PromoteGuard<'_> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            self.map.update_sync(&self.offset, |_, slot| {
                if matches!(slot, Slot::InFlight(_)) {
                    *slot = Slot::Ready(block);
                }
            });
        }
    }
}
