use crate::bucket::{log_key, BucketStore};
use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory implementation of BucketStore
///
/// Strings and lists live in two maps behind one mutex; list trimming follows
/// Redis `LTRIM` index rules. Useful for tests, development and single-instance
/// deployments without Redis.
#[derive(Default)]
pub struct InMemoryBucketStore {
    data: Mutex<Data>,
}

#[derive(Default)]
struct Data {
    strings: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
}

impl InMemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bucket documents.
    pub fn bucket_count(&self) -> usize {
        self.data.lock().strings.len()
    }
}

/// Resolve a Redis-style inclusive range against a list of `len` items.
///
/// Returns `None` when the range selects nothing.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

#[async_trait]
impl BucketStore for InMemoryBucketStore {
    async fn create(&self, id: &str, archive: &str) -> Result<(), StoreError> {
        self.data
            .lock()
            .strings
            .insert(id.to_string(), archive.to_string());
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.data.lock().strings.get(id).cloned())
    }

    async fn log_append(&self, id: &str, entry: &str) -> Result<(), StoreError> {
        self.data
            .lock()
            .lists
            .entry(log_key(id))
            .or_default()
            .push(entry.to_string());
        Ok(())
    }

    async fn log_trim(&self, id: &str, start: isize, stop: isize) -> Result<(), StoreError> {
        let key = log_key(id);
        let mut data = self.data.lock();

        let Some(list) = data.lists.get_mut(&key) else {
            return Ok(());
        };

        match resolve_range(list.len(), start, stop) {
            Some((from, to)) => {
                list.truncate(to + 1);
                list.drain(..from);
            }
            None => {
                data.lists.remove(&key);
            }
        }
        Ok(())
    }

    async fn log_range(&self, id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .data
            .lock()
            .lists
            .get(&log_key(id))
            .cloned()
            .unwrap_or_default())
    }
}
