#![forbid(unsafe_code)]

//! Mutation notifications delivered between `begin_batch` and `end_batch`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::index::{ItemIndex, SectionIndex};

/// One mutation notification from the observing component.
///
/// Batch boundaries are not events: they are separate calls on the
/// aggregator because `end_batch` produces a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ChangeEvent {
    /// The observer lost track of the data and wants a full reload.
    ReloadRequested,
    SectionInserted { section: SectionIndex },
    SectionDeleted { section: SectionIndex },
    SectionUpdated { section: SectionIndex },
    ItemInserted { index: ItemIndex },
    ItemDeleted { index: ItemIndex },
    ItemUpdated { index: ItemIndex },
    ItemMoved { from: ItemIndex, to: ItemIndex },
}

impl ChangeEvent {
    /// Stable snake_case name, used in logs and trace files.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ReloadRequested => "reload_requested",
            Self::SectionInserted { .. } => "section_inserted",
            Self::SectionDeleted { .. } => "section_deleted",
            Self::SectionUpdated { .. } => "section_updated",
            Self::ItemInserted { .. } => "item_inserted",
            Self::ItemDeleted { .. } => "item_deleted",
            Self::ItemUpdated { .. } => "item_updated",
            Self::ItemMoved { .. } => "item_moved",
        }
    }

    /// Whether the event addresses a whole section.
    #[must_use]
    pub const fn is_section_level(&self) -> bool {
        matches!(
            self,
            Self::SectionInserted { .. } | Self::SectionDeleted { .. } | Self::SectionUpdated { .. }
        )
    }

    /// Whether processing this event switches the batch to a full reload.
    #[must_use]
    pub const fn forces_reload(&self) -> bool {
        matches!(self, Self::ReloadRequested | Self::SectionDeleted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let idx = ItemIndex::new(0, 0);
        let events = [
            ChangeEvent::ReloadRequested,
            ChangeEvent::SectionInserted { section: 0 },
            ChangeEvent::SectionDeleted { section: 0 },
            ChangeEvent::SectionUpdated { section: 0 },
            ChangeEvent::ItemInserted { index: idx },
            ChangeEvent::ItemDeleted { index: idx },
            ChangeEvent::ItemUpdated { index: idx },
            ChangeEvent::ItemMoved { from: idx, to: idx },
        ];
        let mut kinds: Vec<_> = events.iter().map(ChangeEvent::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), events.len());
    }

    #[test]
    fn only_reload_and_section_delete_force_reload() {
        assert!(ChangeEvent::ReloadRequested.forces_reload());
        assert!(ChangeEvent::SectionDeleted { section: 4 }.forces_reload());
        assert!(!ChangeEvent::SectionInserted { section: 4 }.forces_reload());
        assert!(
            !ChangeEvent::ItemDeleted {
                index: ItemIndex::new(4, 0)
            }
            .forces_reload()
        );
    }

    #[test]
    fn section_level_classification() {
        assert!(ChangeEvent::SectionUpdated { section: 1 }.is_section_level());
        assert!(
            !ChangeEvent::ItemMoved {
                from: ItemIndex::new(0, 1),
                to: ItemIndex::new(1, 0),
            }
            .is_section_level()
        );
    }
}
