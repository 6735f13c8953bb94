//! Keyed async mutex serialising summarization per document.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = HashMap<Uuid, Arc<Mutex<()>>>;

/// Per-document exclusive locks.
///
/// Waiters are served in arrival order (tokio's mutex is fair). An entry is
/// dropped from the map once nobody holds or waits for it, including when a
/// waiter is cancelled before it gets the lock.
#[derive(Clone, Default)]
pub struct DocumentLocks {
    entries: Arc<StdMutex<LockMap>>,
}

/// Removes the map entry for `pdf_id` when only the map still references it.
struct EntrySlot {
    pdf_id: Uuid,
    entries: Arc<StdMutex<LockMap>>,
}

impl Drop for EntrySlot {
    fn drop(&mut self) {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if map
            .get(&self.pdf_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            map.remove(&self.pdf_id);
        }
    }
}

/// Held lock for one document; released on drop.
pub struct DocumentGuard {
    // Field order matters: the mutex guard (and its Arc) must drop before the slot.
    _guard: OwnedMutexGuard<()>,
    slot: EntrySlot,
}

impl DocumentGuard {
    pub fn pdf_id(&self) -> Uuid {
        self.slot.pdf_id
    }
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a document.
    ///
    /// Dropping the returned future before it resolves leaves no entry behind.
    pub async fn acquire(&self, pdf_id: Uuid) -> DocumentGuard {
        let entry = {
            let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            // Unheld entries left by earlier holders are pruned here as well.
            map.retain(|_, entry| Arc::strong_count(entry) > 1);
            map.entry(pdf_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        // Declared before the await so it drops after the pending lock future.
        let slot = EntrySlot {
            pdf_id,
            entries: self.entries.clone(),
        };
        let guard = entry.lock_owned().await;
        DocumentGuard {
            _guard: guard,
            slot,
        }
    }

    /// Number of documents with a live lock entry.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
