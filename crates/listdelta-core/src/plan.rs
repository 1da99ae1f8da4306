#![forbid(unsafe_code)]

//! Batch plans: what a surface applies once a batch ends.
//!
//! # Apply order
//!
//! ```text
//!   delete sections ─► insert sections ─► reload sections
//!          │
//!          ▼
//!   delete items ─► insert items ─► reload items
//! ```
//!
//! Sections go before items, and within each tier deletions go before
//! insertions before reloads. Surfaces that validate index consistency per
//! step depend on this order, so it is fixed regardless of the order the
//! events arrived in.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ItemUpdateMode;
use crate::index::{ItemIndex, SectionSet};
use crate::pending::PendingChangeSet;

/// The kind of a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StepKind {
    DeleteSections,
    InsertSections,
    ReloadSections,
    DeleteItems,
    InsertItems,
    ReloadItems,
}

impl StepKind {
    /// Every kind, in apply order.
    pub const APPLY_ORDER: [StepKind; 6] = [
        StepKind::DeleteSections,
        StepKind::InsertSections,
        StepKind::ReloadSections,
        StepKind::DeleteItems,
        StepKind::InsertItems,
        StepKind::ReloadItems,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeleteSections => "delete_sections",
            Self::InsertSections => "insert_sections",
            Self::ReloadSections => "reload_sections",
            Self::DeleteItems => "delete_items",
            Self::InsertItems => "insert_items",
            Self::ReloadItems => "reload_items",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One non-empty step of a [`BatchPlan`], borrowing its indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep<'a> {
    DeleteSections(&'a SectionSet),
    InsertSections(&'a SectionSet),
    ReloadSections(&'a SectionSet),
    DeleteItems(&'a [ItemIndex]),
    InsertItems(&'a [ItemIndex]),
    ReloadItems(&'a [ItemIndex]),
}

impl PlanStep<'_> {
    #[must_use]
    pub fn kind(&self) -> StepKind {
        match self {
            Self::DeleteSections(_) => StepKind::DeleteSections,
            Self::InsertSections(_) => StepKind::InsertSections,
            Self::ReloadSections(_) => StepKind::ReloadSections,
            Self::DeleteItems(_) => StepKind::DeleteItems,
            Self::InsertItems(_) => StepKind::InsertItems,
            Self::ReloadItems(_) => StepKind::ReloadItems,
        }
    }

    /// Number of sections or items the step touches.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::DeleteSections(s) | Self::InsertSections(s) | Self::ReloadSections(s) => s.len(),
            Self::DeleteItems(i) | Self::InsertItems(i) | Self::ReloadItems(i) => i.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable set of operations derived from one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatchPlan {
    deleted_sections: SectionSet,
    inserted_sections: SectionSet,
    reloaded_sections: SectionSet,
    deleted_items: Vec<ItemIndex>,
    inserted_items: Vec<ItemIndex>,
    reloaded_items: Vec<ItemIndex>,
    reconfigure_items: Vec<ItemIndex>,
}

impl BatchPlan {
    /// Build a plan from a drained accumulator.
    ///
    /// In [`ItemUpdateMode::Reconfigure`] the updated items are routed to
    /// [`reconfigure_items`](Self::reconfigure_items) and the reload-items
    /// tier stays empty.
    #[must_use]
    pub fn from_pending(pending: PendingChangeSet, mode: ItemUpdateMode) -> Self {
        let (
            deleted_sections,
            inserted_sections,
            reloaded_sections,
            deleted_items,
            inserted_items,
            updated_items,
        ) = pending.into_parts();

        let (reloaded_items, reconfigure_items) = match mode {
            ItemUpdateMode::Reload => (updated_items, Vec::new()),
            ItemUpdateMode::Reconfigure => (Vec::new(), updated_items),
        };

        Self {
            deleted_sections,
            inserted_sections,
            reloaded_sections,
            deleted_items,
            inserted_items,
            reloaded_items,
            reconfigure_items,
        }
    }

    /// Non-empty steps in apply order.
    pub fn steps(&self) -> impl Iterator<Item = PlanStep<'_>> {
        [
            PlanStep::DeleteSections(&self.deleted_sections),
            PlanStep::InsertSections(&self.inserted_sections),
            PlanStep::ReloadSections(&self.reloaded_sections),
            PlanStep::DeleteItems(&self.deleted_items),
            PlanStep::InsertItems(&self.inserted_items),
            PlanStep::ReloadItems(&self.reloaded_items),
        ]
        .into_iter()
        .filter(|step| !step.is_empty())
    }

    #[must_use]
    pub fn deleted_sections(&self) -> &SectionSet {
        &self.deleted_sections
    }

    #[must_use]
    pub fn inserted_sections(&self) -> &SectionSet {
        &self.inserted_sections
    }

    #[must_use]
    pub fn reloaded_sections(&self) -> &SectionSet {
        &self.reloaded_sections
    }

    #[must_use]
    pub fn deleted_items(&self) -> &[ItemIndex] {
        &self.deleted_items
    }

    #[must_use]
    pub fn inserted_items(&self) -> &[ItemIndex] {
        &self.inserted_items
    }

    #[must_use]
    pub fn reloaded_items(&self) -> &[ItemIndex] {
        &self.reloaded_items
    }

    /// Updated items the adapter reconfigures in place after completion.
    #[must_use]
    pub fn reconfigure_items(&self) -> &[ItemIndex] {
        &self.reconfigure_items
    }

    /// Whether the plan asks nothing of the surface.
    ///
    /// A plan with only reconfigure entries is empty in this sense: the
    /// surface has nothing to animate, only cells to refresh afterwards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps().next().is_none()
    }

    /// Total number of indices across all steps.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.steps().map(|step| step.len()).sum()
    }
}

/// A handle for a batch that is being applied.
///
/// Handed out by [`ChangeSetAggregator::end_batch`](crate::ChangeSetAggregator::end_batch)
/// and consumed by [`complete_batch`](crate::ChangeSetAggregator::complete_batch).
/// It is deliberately not `Clone`: each batch completes exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an applying batch must be completed with its ticket"]
pub struct BatchTicket {
    pub(crate) epoch: u64,
}

impl BatchTicket {
    /// The batch epoch this ticket completes.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Result of ending a batch.
#[derive(Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The incremental path is unsafe; reload the whole surface.
    ///
    /// The aggregator is already back to idle when this is returned.
    ReloadAll,
    /// Apply `plan`, then complete the batch with `ticket`.
    Batch { plan: BatchPlan, ticket: BatchTicket },
}

impl BatchOutcome {
    #[must_use]
    pub fn is_reload(&self) -> bool {
        matches!(self, Self::ReloadAll)
    }

    /// The plan, if this is a batch outcome.
    #[must_use]
    pub fn plan(&self) -> Option<&BatchPlan> {
        match self {
            Self::ReloadAll => None,
            Self::Batch { plan, .. } => Some(plan),
        }
    }

    /// Stable name for logs: `reload_all` or `batch`.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReloadAll => "reload_all",
            Self::Batch { .. } => "batch",
        }
    }
}
