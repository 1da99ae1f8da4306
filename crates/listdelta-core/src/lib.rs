#![forbid(unsafe_code)]

//! listdelta core
//!
//! Turns a stream of per-item change notifications into one ordered batch
//! of list/grid updates, or decides that the incremental path is unsafe and
//! asks for a full reload.
//!
//! # Key Components
//!
//! - [`ChangeSetAggregator`] - Batch state machine: begin, events, end, complete
//! - [`PendingChangeSet`] - Raw accumulator with the suppression rules
//! - [`BatchPlan`] - Immutable plan, iterated in apply order via [`BatchPlan::steps`]
//! - [`ChangeEvent`] - Tagged union of mutation notifications
//! - [`ChangeObserver`] - Inbound interface for observing components
//! - [`AggregatorConfig`] - Item update mode and forced-reload fallback
//!
//! # Example
//!
//! ```
//! use listdelta_core::{BatchOutcome, ChangeSetAggregator, ItemIndex};
//!
//! let mut agg = ChangeSetAggregator::default();
//! agg.begin_batch();
//! agg.item_moved(ItemIndex::new(0, 1), ItemIndex::new(1, 0));
//! match agg.end_batch() {
//!     BatchOutcome::Batch { plan, ticket } => {
//!         assert_eq!(plan.deleted_items(), &[ItemIndex::new(0, 1)]);
//!         assert_eq!(plan.inserted_items(), &[ItemIndex::new(1, 0)]);
//!         // ...apply `plan` to the surface, then once it settles:
//!         let _reconfigure = agg.complete_batch(ticket, true);
//!     }
//!     BatchOutcome::ReloadAll => unreachable!(),
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod event;
pub mod index;
pub mod observer;
pub mod pending;
pub mod plan;

pub use aggregator::{AggregatorStats, ChangeSetAggregator, Phase, ReloadReason};
pub use config::{AggregatorConfig, ConfigError, ItemUpdateMode};
pub use error::SequenceError;
pub use event::ChangeEvent;
pub use index::{ItemIndex, SectionIndex, SectionSet};
pub use observer::{ChangeObserver, deliver_batch};
pub use pending::PendingChangeSet;
pub use plan::{BatchOutcome, BatchPlan, BatchTicket, PlanStep, StepKind};
