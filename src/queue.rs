//! Pending render queue, kept sorted by priority

use crate::request::{CompletionCallback, RequestId};
use crate::surface::SharedSurface;

/// A pending render request.
///
/// `target` stays owned by the caller; the pipeline only writes into it once
/// the render completes.
pub struct QueueEntry<P, S> {
    pub id: RequestId,
    pub page: P,
    pub page_number: usize,
    pub target: SharedSurface<S>,
    pub scale: f32,
    /// Higher renders sooner
    pub priority: i32,
    pub callback: CompletionCallback,
}

/// Read-only scheduling snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueStats {
    /// Entries waiting to be dispatched
    pub pending: usize,
    /// Dispatched renders not yet completed
    pub active: usize,
    /// Concurrency cap
    pub max_concurrent: usize,
}

/// Unbounded pending list sorted descending by priority.
///
/// Equal priorities dispatch in insertion order. The stable tie-break is a
/// correctness requirement: sequential scrolling queues runs of
/// equal-priority pages, and reordering them shows up as visual jank.
pub struct RenderQueue<P, S> {
    entries: Vec<QueueEntry<P, S>>,
}

impl<P, S> RenderQueue<P, S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert keeping priority order; equal priorities go after existing ones.
    pub fn push(&mut self, entry: QueueEntry<P, S>) {
        let at = self
            .entries
            .partition_point(|e| e.priority >= entry.priority);
        self.entries.insert(at, entry);
    }

    /// Remove and return the highest-priority entry.
    pub fn pop_front(&mut self) -> Option<QueueEntry<P, S>> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Drain every pending entry, preserving dispatch order.
    pub fn drain_all(&mut self) -> Vec<QueueEntry<P, S>> {
        std::mem::take(&mut self.entries)
    }

    /// Drain entries for one page; other pages keep their relative order.
    pub fn drain_page(&mut self, page_number: usize) -> Vec<QueueEntry<P, S>> {
        let mut drained = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());

        for entry in std::mem::take(&mut self.entries) {
            if entry.page_number == page_number {
                drained.push(entry);
            } else {
                kept.push(entry);
            }
        }

        self.entries = kept;
        drained
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P, S> Default for RenderQueue<P, S> {
    fn default() -> Self {
        Self::new()
    }
}
