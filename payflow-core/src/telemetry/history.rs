use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Number of entries each history keeps.
pub const HISTORY_CAPACITY: usize = 50;

/// Handle to an entry previously pushed, used to update it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

#[derive(Debug)]
struct Ring<T> {
    capacity: usize,
    next_id: u64,
    entries: VecDeque<(u64, T)>,
}

/// Write half of a bounded history. Not `Clone`: a history has one owner.
#[derive(Debug)]
pub struct HistoryWriter<T> {
    inner: Arc<RwLock<Ring<T>>>,
}

/// Read half of a bounded history.
#[derive(Debug)]
pub struct HistoryReader<T> {
    inner: Arc<RwLock<Ring<T>>>,
}

impl<T> Clone for HistoryReader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Create a history holding at most `capacity` entries. The oldest entry is
/// evicted when a push would exceed it.
pub fn history<T>(capacity: usize) -> (HistoryWriter<T>, HistoryReader<T>) {
    let inner = Arc::new(RwLock::new(Ring {
        capacity: capacity.max(1),
        next_id: 0,
        entries: VecDeque::with_capacity(capacity.max(1)),
    }));
    (
        HistoryWriter {
            inner: Arc::clone(&inner),
        },
        HistoryReader { inner },
    )
}

impl<T> HistoryWriter<T> {
    pub async fn push(&self, entry: T) -> EntryId {
        let mut ring = self.inner.write().await;
        let id = ring.next_id;
        ring.next_id += 1;
        if ring.entries.len() == ring.capacity {
            ring.entries.pop_front();
        }
        ring.entries.push_back((id, entry));
        EntryId(id)
    }

    /// Apply `f` to the entry `id`. Returns `false` if it was already evicted.
    pub async fn update(&self, id: EntryId, f: impl FnOnce(&mut T)) -> bool {
        let mut ring = self.inner.write().await;
        match ring.entries.iter_mut().find(|(entry_id, _)| *entry_id == id.0) {
            Some((_, entry)) => {
                f(entry);
                true
            }
            None => false,
        }
    }
}

impl<T: Clone> HistoryReader<T> {
    /// All entries, oldest first.
    pub async fn snapshot(&self) -> Vec<T> {
        let ring = self.inner.read().await;
        ring.entries.iter().map(|(_, entry)| entry.clone()).collect()
    }

    /// All entries, newest first.
    pub async fn newest_first(&self) -> Vec<T> {
        let ring = self.inner.read().await;
        ring.entries.iter().rev().map(|(_, entry)| entry.clone()).collect()
    }
}

impl<T> HistoryReader<T> {
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let (writer, reader) = history::<u32>(HISTORY_CAPACITY);
        for i in 0..120 {
            writer.push(i).await;
        }
        let entries = reader.snapshot().await;
        assert_eq!(entries.len(), HISTORY_CAPACITY);
        assert_eq!(entries.first(), Some(&70));
        assert_eq!(entries.last(), Some(&119));
        assert_eq!(reader.newest_first().await.first(), Some(&119));
    }

    #[tokio::test]
    async fn test_update_in_place() {
        let (writer, reader) = history::<String>(2);
        let first = writer.push("processing".to_string()).await;
        assert!(writer.update(first, |s| *s = "success".to_string()).await);
        assert_eq!(reader.snapshot().await, vec!["success".to_string()]);

        writer.push("b".to_string()).await;
        writer.push("c".to_string()).await;
        // evicted entries can no longer be updated
        assert!(!writer.update(first, |s| s.clear()).await);
        assert_eq!(reader.len().await, 2);
    }
}
