//! Call order within one (section, status) bucket.
//!
//! Default order is priority rank, ties broken by arrival time. `reorder`
//! pins an entry at an explicit position; pinned entries hold their place
//! until they leave the bucket, while new arrivals are ranked against the
//! unpinned entries only.

use crate::error::{Result, RoundsError};
use crate::types::Priority;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// QueueEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: Uuid,
    pub priority: Priority,
    pub arrived_at: DateTime<Utc>,
    pinned: bool,
}

impl QueueEntry {
    fn key(&self) -> (u8, DateTime<Utc>) {
        (self.priority.rank(), self.arrived_at)
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}

// ---------------------------------------------------------------------------
// CallQueue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CallQueue {
    label: String,
    entries: Vec<QueueEntry>,
}

impl CallQueue {
    /// `label` identifies the bucket in errors, e.g. "light_bath/checked_in".
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: Vec::new(),
        }
    }

    /// Inserts by default ordering: before the first unpinned entry that
    /// ranks after the newcomer. Pinned entries are skipped when comparing,
    /// so a manual placement is never displaced by an arrival.
    pub fn insert(&mut self, id: Uuid, priority: Priority, arrived_at: DateTime<Utc>) {
        if self.contains(id) {
            return;
        }
        let entry = QueueEntry {
            id,
            priority,
            arrived_at,
            pinned: false,
        };
        let at = self
            .entries
            .iter()
            .position(|e| !e.pinned && entry.key() < e.key())
            .unwrap_or(self.entries.len());
        self.entries.insert(at, entry);
    }

    /// Appends at the tail regardless of priority; used when an entry moves
    /// in from another bucket.
    pub fn push_back(&mut self, id: Uuid, priority: Priority, arrived_at: DateTime<Utc>) {
        if self.contains(id) {
            return;
        }
        self.entries.push(QueueEntry {
            id,
            priority,
            arrived_at,
            pinned: false,
        });
    }

    /// Moves one entry to an explicit position and pins it there. The index
    /// is clamped to the queue length.
    pub fn reorder(&mut self, id: Uuid, new_index: usize) -> Result<()> {
        let from = self
            .position(id)
            .ok_or(RoundsError::AttendanceNotFound(id))?;
        let mut entry = self.entries.remove(from);
        entry.pinned = true;
        let at = new_index.min(self.entries.len());
        self.entries.insert(at, entry);
        Ok(())
    }

    /// Removes and returns the head of the queue.
    pub fn dequeue_next(&mut self) -> Result<Uuid> {
        if self.entries.is_empty() {
            return Err(RoundsError::EmptyQueue(self.label.clone()));
        }
        Ok(self.entries.remove(0).id)
    }

    /// Removes an entry wherever it sits. The returned entry is unpinned: a
    /// manual placement lapses once the entry leaves the bucket.
    pub fn remove(&mut self, id: Uuid) -> Option<QueueEntry> {
        let at = self.position(id)?;
        let mut entry = self.entries.remove(at);
        entry.pinned = false;
        Some(entry)
    }

    pub fn peek(&self) -> Option<Uuid> {
        self.entries.first().map(|e| e.id)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
