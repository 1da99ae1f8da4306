#![forbid(unsafe_code)]

//! Section and item coordinates.
//!
//! Deleted and updated positions are expressed in the pre-batch ordering;
//! inserted positions in the post-batch ordering. The aggregator never
//! translates between the two spaces, it only records what it is told.

use std::collections::BTreeSet;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position of a section within the list.
pub type SectionIndex = usize;

/// Deduplicated set of sections. Iterates in ascending order.
pub type SectionSet = BTreeSet<SectionIndex>;

/// Position of an item: `(section, item)`.
///
/// Equality is structural, so two indices built independently for the same
/// slot compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ItemIndex {
    pub section: SectionIndex,
    pub item: usize,
}

impl ItemIndex {
    /// Create an index for `item` within `section`.
    #[must_use]
    pub const fn new(section: SectionIndex, item: usize) -> Self {
        Self { section, item }
    }

    /// Whether this index lies inside any of `sections`.
    #[must_use]
    pub fn in_any(&self, sections: &SectionSet) -> bool {
        sections.contains(&self.section)
    }
}

impl From<(SectionIndex, usize)> for ItemIndex {
    fn from((section, item): (SectionIndex, usize)) -> Self {
        Self::new(section, item)
    }
}

impl fmt::Display for ItemIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.section, self.item)
    }
}
