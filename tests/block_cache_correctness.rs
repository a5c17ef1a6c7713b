//! Correctness tests for the block cache: fetch-once residency, failure
//! cleanup, and boundary-based eviction.
#![allow(clippy::unwrap_used, missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use range_client::RangeError;
use rangefs::cache::BlockCache;

#[tokio::test]
async fn fetch_runs_once_and_caches() {
    let cache = BlockCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let calls = Arc::clone(&calls);
        let block = cache
            .get_or_fetch(0, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from_static(b"block zero"))
            })
            .await
            .unwrap();
        assert_eq!(&block[..], b"block zero");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.is_ready(0));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn failed_fetch_leaves_no_entry() {
    let cache = BlockCache::new();

    let err = cache
        .get_or_fetch(0, || async { Err(RangeError::UnexpectedStatus(500)) })
        .await
        .unwrap_err();
    assert_eq!(err, RangeError::UnexpectedStatus(500));
    assert!(cache.is_empty());
    assert!(!cache.contains(0).await);

    // A later caller retries from scratch and can succeed.
    let block = cache
        .get_or_fetch(0, || async { Ok(Bytes::from_static(b"recovered")) })
        .await
        .unwrap();
    assert_eq!(&block[..], b"recovered");
    assert!(cache.is_ready(0));
}

#[tokio::test]
async fn distinct_offsets_are_independent() {
    let cache = BlockCache::new();

    for offset in [0u64, 1024, 2048, 4096] {
        let block = cache
            .get_or_fetch(offset, move || async move {
                Ok(Bytes::from(offset.to_le_bytes().to_vec()))
            })
            .await
            .unwrap();
        assert_eq!(&block[..], offset.to_le_bytes());
    }

    assert_eq!(cache.len(), 4);
    for offset in [0u64, 1024, 2048, 4096] {
        assert!(cache.is_ready(offset));
    }
}

#[tokio::test]
async fn evict_before_drops_only_older_blocks() {
    let cache = BlockCache::new();
    for offset in (0u64..8192).step_by(1024) {
        cache
            .get_or_fetch(offset, || async { Ok(Bytes::from_static(b"x")) })
            .await
            .unwrap();
    }
    assert_eq!(cache.len(), 8);

    cache.evict_before(4096);

    assert_eq!(cache.len(), 4);
    for offset in (0u64..4096).step_by(1024) {
        assert!(!cache.contains(offset).await);
    }
    for offset in (4096u64..8192).step_by(1024) {
        assert!(cache.is_ready(offset));
    }
}
