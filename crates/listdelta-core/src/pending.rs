#![forbid(unsafe_code)]

//! The per-batch accumulator.
//!
//! [`PendingChangeSet`] is the raw bookkeeping layer: it records section and
//! item changes and applies the suppression rules that keep the resulting
//! plan consistent. It knows nothing about batch phases or the
//! section-deletion policy; [`ChangeSetAggregator`](crate::ChangeSetAggregator)
//! layers those on top.
//!
//! # Invariants
//!
//! 1. No entry of `inserted_items` lies in a section of `inserted_sections`.
//! 2. No entry of `deleted_items` or `updated_items` lies in a section of
//!    `deleted_sections`.
//! 3. `deleted_items` and `updated_items` are disjoint.
//! 4. Each item sequence holds every index at most once, in first-seen order.
//! 5. While `reload_all` is set, every collection is empty and recording is
//!    a no-op.

use std::mem;

use crate::index::{ItemIndex, SectionIndex, SectionSet};

/// Mutable accumulator for one batch of changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChangeSet {
    inserted_sections: SectionSet,
    deleted_sections: SectionSet,
    updated_sections: SectionSet,
    inserted_items: Vec<ItemIndex>,
    deleted_items: Vec<ItemIndex>,
    updated_items: Vec<ItemIndex>,
    reload_all: bool,
}

impl PendingChangeSet {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Reload mode
    // ========================================================================

    /// Whether the batch has fallen back to a full reload.
    #[must_use]
    pub fn reload_all(&self) -> bool {
        self.reload_all
    }

    /// Switch to full-reload mode. Idempotent.
    ///
    /// Recorded changes are dropped: a full reload repaints everything.
    pub fn request_reload(&mut self) {
        self.clear();
        self.reload_all = true;
    }

    /// Drop every recorded change but keep the reload flag.
    pub fn clear(&mut self) {
        self.inserted_sections.clear();
        self.deleted_sections.clear();
        self.updated_sections.clear();
        self.inserted_items.clear();
        self.deleted_items.clear();
        self.updated_items.clear();
    }

    /// Drop every recorded change and the reload flag.
    pub fn reset(&mut self) {
        self.clear();
        self.reload_all = false;
    }

    /// Move the contents out, leaving an empty accumulator behind.
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    // ========================================================================
    // Section-level recording
    // ========================================================================

    /// Record a section insertion (post-batch position).
    ///
    /// Item insertions already recorded for the section are dropped, since
    /// the new section paints all of its items.
    pub fn record_section_inserted(&mut self, section: SectionIndex) -> bool {
        if self.reload_all {
            return false;
        }
        self.inserted_items.retain(|idx| idx.section != section);
        self.inserted_sections.insert(section)
    }

    /// Record a section deletion (pre-batch position) incrementally.
    ///
    /// Item deletions and updates already recorded for the section are
    /// dropped. The aggregator never calls this; it switches to a full
    /// reload instead. It exists for callers driving the accumulator
    /// directly against a surface that handles section deletion reliably.
    pub fn record_section_deleted(&mut self, section: SectionIndex) -> bool {
        if self.reload_all {
            return false;
        }
        self.deleted_items.retain(|idx| idx.section != section);
        self.updated_items.retain(|idx| idx.section != section);
        self.deleted_sections.insert(section)
    }

    /// Record a section content update (pre-batch position).
    pub fn record_section_updated(&mut self, section: SectionIndex) -> bool {
        if self.reload_all {
            return false;
        }
        self.updated_sections.insert(section)
    }

    // ========================================================================
    // Item-level recording
    // ========================================================================

    /// Record an item insertion (post-batch position).
    ///
    /// Suppressed when the item's section is itself newly inserted.
    pub fn record_item_inserted(&mut self, index: ItemIndex) -> bool {
        if self.reload_all || index.in_any(&self.inserted_sections) {
            return false;
        }
        push_unique(&mut self.inserted_items, index)
    }

    /// Record an item deletion (pre-batch position).
    ///
    /// Suppressed when the item's section is being deleted. A pending update
    /// at the same index is withdrawn: the item will not exist to reload.
    pub fn record_item_deleted(&mut self, index: ItemIndex) -> bool {
        if self.reload_all || index.in_any(&self.deleted_sections) {
            return false;
        }
        self.updated_items.retain(|idx| *idx != index);
        push_unique(&mut self.deleted_items, index)
    }

    /// Record an item content update (pre-batch position).
    ///
    /// Suppressed when the item's section is being deleted, when the item
    /// itself is being deleted, or when the update is already recorded.
    pub fn record_item_updated(&mut self, index: ItemIndex) -> bool {
        if self.reload_all
            || index.in_any(&self.deleted_sections)
            || self.deleted_items.contains(&index)
        {
            return false;
        }
        push_unique(&mut self.updated_items, index)
    }

    /// Record an item move.
    ///
    /// A move onto the same position is an in-place update. Any other move is
    /// split into a deletion at `from` and an insertion at `to`, each under
    /// its own suppression rule. Returns `true` if either half was recorded.
    pub fn record_item_moved(&mut self, from: ItemIndex, to: ItemIndex) -> bool {
        if from == to {
            return self.record_item_updated(from);
        }
        let deleted = self.record_item_deleted(from);
        let inserted = self.record_item_inserted(to);
        deleted || inserted
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn inserted_sections(&self) -> &SectionSet {
        &self.inserted_sections
    }

    #[must_use]
    pub fn deleted_sections(&self) -> &SectionSet {
        &self.deleted_sections
    }

    #[must_use]
    pub fn updated_sections(&self) -> &SectionSet {
        &self.updated_sections
    }

    #[must_use]
    pub fn inserted_items(&self) -> &[ItemIndex] {
        &self.inserted_items
    }

    #[must_use]
    pub fn deleted_items(&self) -> &[ItemIndex] {
        &self.deleted_items
    }

    #[must_use]
    pub fn updated_items(&self) -> &[ItemIndex] {
        &self.updated_items
    }

    /// Total number of recorded entries across all six collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inserted_sections.len()
            + self.deleted_sections.len()
            + self.updated_sections.len()
            + self.inserted_items.len()
            + self.deleted_items.len()
            + self.updated_items.len()
    }

    /// Whether nothing is recorded. The reload flag is not considered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split into the six collections, sections first.
    pub(crate) fn into_parts(
        self,
    ) -> (
        SectionSet,
        SectionSet,
        SectionSet,
        Vec<ItemIndex>,
        Vec<ItemIndex>,
        Vec<ItemIndex>,
    ) {
        (
            self.deleted_sections,
            self.inserted_sections,
            self.updated_sections,
            self.deleted_items,
            self.inserted_items,
            self.updated_items,
        )
    }
}

fn push_unique(items: &mut Vec<ItemIndex>, index: ItemIndex) -> bool {
    if items.contains(&index) {
        return false;
    }
    items.push(index);
    true
}
