#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use range_client::{RangeError, RangeSource};

/// Deterministic non-repeating byte pattern for content checks.
pub fn pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// In-memory [`RangeSource`] with scripted failures, per-range fetch
/// counters, and an optional per-fetch delay.
#[derive(Clone, Default)]
pub struct MockSource {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fetch_counts: Mutex<HashMap<(String, u64), usize>>,
    fetch_failures: Mutex<HashMap<(String, u64), usize>>,
    size_failures: Mutex<HashSet<String>>,
    total_fetches: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&self, url: &str, data: Vec<u8>) {
        self.inner
            .objects
            .lock()
            .unwrap()
            .insert(url.to_owned(), data);
    }

    /// Every subsequent fetch stalls this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock().unwrap() = Some(delay);
    }

    /// The next `count` fetches of the range starting at `offset` fail.
    pub fn fail_next_fetch(&self, url: &str, offset: u64, count: usize) {
        self.inner
            .fetch_failures
            .lock()
            .unwrap()
            .insert((url.to_owned(), offset), count);
    }

    /// All size discovery for `url` fails.
    pub fn fail_size_discovery(&self, url: &str) {
        self.inner
            .size_failures
            .lock()
            .unwrap()
            .insert(url.to_owned());
    }

    /// How many fetches hit the range starting at `offset`.
    pub fn fetch_count(&self, url: &str, offset: u64) -> usize {
        self.inner
            .fetch_counts
            .lock()
            .unwrap()
            .get(&(url.to_owned(), offset))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.inner.total_fetches.load(Ordering::SeqCst)
    }
}

impl RangeSource for MockSource {
    async fn discover_size(&self, url: &str) -> Result<u64, RangeError> {
        if self.inner.size_failures.lock().unwrap().contains(url) {
            return Err(RangeError::UnexpectedStatus(403));
        }
        let objects = self.inner.objects.lock().unwrap();
        let data = objects.get(url).ok_or(RangeError::UnexpectedStatus(404))?;
        Ok(data.len() as u64)
    }

    async fn fetch_range(&self, url: &str, offset: u64, len: u64) -> Result<Bytes, RangeError> {
        let key = (url.to_owned(), offset);
        *self
            .inner
            .fetch_counts
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_insert(0) += 1;
        self.inner.total_fetches.fetch_add(1, Ordering::SeqCst);

        // Copy the delay out so no lock is held across the await.
        let delay = *self.inner.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.inner.fetch_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    if *remaining == 0 {
                        failures.remove(&key);
                    }
                    return Err(RangeError::Transport("injected failure".to_owned()));
                }
            }
        }

        let objects = self.inner.objects.lock().unwrap();
        let data = objects.get(url).ok_or(RangeError::UnexpectedStatus(404))?;
        let size = data.len() as u64;
        if offset >= size {
            return Err(RangeError::UnexpectedStatus(416));
        }
        let end = (offset + len).min(size) as usize;
        Ok(Bytes::copy_from_slice(&data[offset as usize..end]))
    }
}
