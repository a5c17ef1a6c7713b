//! The collaborator boundary consumed by the filesystem core.

use std::future::Future;

use bytes::Bytes;

use crate::error::RangeError;

/// A source of remote, range-addressable bytes.
///
/// Implemented by [`RangeClient`](crate::RangeClient) for real HTTP objects
/// and by test doubles. `Clone` so each file and each detached read-ahead
/// task can hold its own cheap handle.
pub trait RangeSource: Clone + Send + Sync + 'static {
    /// Resolve the total size in bytes of the object at `url`.
    fn discover_size(&self, url: &str) -> impl Future<Output = Result<u64, RangeError>> + Send;

    /// Fetch `len` bytes starting at byte `offset`.
    ///
    /// May return fewer bytes than requested when the range extends past
    /// the true end of the object.
    fn fetch_range(
        &self,
        url: &str,
        offset: u64,
        len: u64,
    ) -> impl Future<Output = Result<Bytes, RangeError>> + Send;
}
