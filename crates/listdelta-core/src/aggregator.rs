#![forbid(unsafe_code)]

//! The change-set aggregator state machine.
//!
//! # Phases
//!
//! ```text
//!            begin_batch            end_batch (plan)
//!   ┌──────┐ ─────────► ┌──────────────┐ ─────────► ┌──────────┐
//!   │ Idle │            │ Accumulating │            │ Applying │
//!   └──────┘ ◄───────── └──────────────┘            └──────────┘
//!      ▲    end_batch (reload)                            │
//!      └──────────────────────────────────────────────────┘
//!                      complete_batch(ticket)
//! ```
//!
//! A batch that resolves to [`BatchOutcome::ReloadAll`] returns straight to
//! idle: a full reload has no completion to wait for. A batch that resolves
//! to a plan stays in `Applying` until the surface reports completion, and
//! `begin_batch` is rejected until then.
//!
//! # Section deletion
//!
//! Any section deletion switches the batch to a full reload. Incremental
//! section deletion combined with item changes in the same batch is not
//! applied reliably by list surfaces, so the aggregator never emits it. Use
//! [`PendingChangeSet::record_section_deleted`] directly against a surface
//! known to handle it.
//!
//! # Tracing
//!
//! Each `end_batch` runs in a `listdelta.batch` span with `epoch`,
//! `events`, `suppressed`, `outcome` and `duration_us`. Completion runs in a
//! `listdelta.complete` span with `epoch`, `finished` and `reconfigured`.

use std::fmt;

use tracing::{debug, info, info_span, trace};
use web_time::Instant;

use crate::config::AggregatorConfig;
use crate::error::SequenceError;
use crate::event::ChangeEvent;
use crate::index::{ItemIndex, SectionIndex};
use crate::pending::PendingChangeSet;
use crate::plan::{BatchOutcome, BatchPlan, BatchTicket};

/// Lifecycle phase of the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// No batch open. Only `begin_batch` and reload requests are accepted.
    #[default]
    Idle,
    /// Between `begin_batch` and `end_batch`.
    Accumulating,
    /// A plan was handed out and the surface has not completed it yet.
    Applying,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Accumulating => "accumulating",
            Self::Applying => "applying",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a batch fell back to a full reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReloadReason {
    /// The observer asked for it.
    Requested,
    /// A section was deleted.
    SectionDeleted,
    /// [`AggregatorConfig::force_reload`] is set.
    ForcedByConfig,
}

impl ReloadReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "reload_requested",
            Self::SectionDeleted => "section_deleted",
            Self::ForcedByConfig => "forced_by_config",
        }
    }
}

/// Lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Batches ended, whatever their outcome.
    pub batches: u64,
    /// Batches that ended in a full reload.
    pub reloads: u64,
    /// Batches whose completion was reported.
    pub completed: u64,
    /// Mutation events received inside batches.
    pub events: u64,
    /// Events dropped by a suppression or de-duplication rule.
    pub suppressed: u64,
}

/// Aggregates one batch of change notifications at a time into a
/// [`BatchOutcome`].
///
/// The aggregator holds no reference to any surface. It hands out plans and
/// expects to be told when they have been applied.
#[derive(Debug)]
pub struct ChangeSetAggregator {
    config: AggregatorConfig,
    pending: PendingChangeSet,
    phase: Phase,
    /// Epoch of the open or most recent batch. Starts at 0, first batch is 1.
    epoch: u64,
    reload_reason: Option<ReloadReason>,
    batch_events: u64,
    batch_suppressed: u64,
    /// Reconfigure list of the applying batch, handed back on completion.
    in_flight: Vec<ItemIndex>,
    stats: AggregatorStats,
}

impl Default for ChangeSetAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

impl ChangeSetAggregator {
    /// Create an idle aggregator.
    #[must_use]
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            pending: PendingChangeSet::new(),
            phase: Phase::Idle,
            epoch: 0,
            reload_reason: None,
            batch_events: 0,
            batch_suppressed: 0,
            in_flight: Vec::new(),
            stats: AggregatorStats::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Epoch of the open or most recent batch; 0 before the first batch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The accumulator of the open batch.
    #[must_use]
    pub fn pending(&self) -> &PendingChangeSet {
        &self.pending
    }

    /// Whether the open (or next) batch will end in a full reload.
    #[must_use]
    pub fn is_reload_pending(&self) -> bool {
        self.pending.reload_all()
    }

    #[must_use]
    pub fn stats(&self) -> AggregatorStats {
        self.stats
    }

    // ========================================================================
    // Batch boundaries
    // ========================================================================

    /// Open a batch.
    ///
    /// # Panics
    ///
    /// If a batch is accumulating or still applying.
    pub fn begin_batch(&mut self) {
        if let Err(err) = self.try_begin_batch() {
            panic!("{err}");
        }
    }

    /// Open a batch, reporting misuse instead of panicking.
    pub fn try_begin_batch(&mut self) -> Result<(), SequenceError> {
        match self.phase {
            Phase::Idle => {}
            Phase::Accumulating => {
                return Err(SequenceError::AlreadyAccumulating { epoch: self.epoch });
            }
            Phase::Applying => return Err(SequenceError::BatchInFlight { epoch: self.epoch }),
        }

        self.epoch += 1;
        if !self.pending.reload_all() {
            self.pending.clear();
            self.reload_reason = None;
        }
        self.batch_events = 0;
        self.batch_suppressed = 0;
        self.phase = Phase::Accumulating;
        trace!(epoch = self.epoch, "listdelta batch opened");
        Ok(())
    }

    /// Close the batch and decide how to present it.
    ///
    /// # Panics
    ///
    /// If no batch is accumulating.
    pub fn end_batch(&mut self) -> BatchOutcome {
        match self.try_end_batch() {
            Ok(outcome) => outcome,
            Err(err) => panic!("{err}"),
        }
    }

    /// Close the batch, reporting misuse instead of panicking.
    pub fn try_end_batch(&mut self) -> Result<BatchOutcome, SequenceError> {
        if self.phase != Phase::Accumulating {
            return Err(SequenceError::NoActiveBatch {
                operation: "end_batch",
                phase: self.phase,
            });
        }

        let start = Instant::now();
        let span = info_span!(
            "listdelta.batch",
            epoch = self.epoch,
            events = self.batch_events,
            suppressed = self.batch_suppressed,
            outcome = tracing::field::Empty,
            duration_us = tracing::field::Empty
        );
        let _guard = span.enter();

        if self.config.force_reload && !self.pending.reload_all() {
            debug!(
                reason = ReloadReason::ForcedByConfig.as_str(),
                "listdelta falling back to full reload"
            );
            self.reload_reason = Some(ReloadReason::ForcedByConfig);
            self.pending.request_reload();
        }

        let outcome = if self.pending.reload_all() {
            self.pending.reset();
            self.reload_reason = None;
            self.stats.reloads += 1;
            self.phase = Phase::Idle;
            BatchOutcome::ReloadAll
        } else {
            let plan = BatchPlan::from_pending(self.pending.take(), self.config.item_updates);
            self.in_flight = plan.reconfigure_items().to_vec();
            self.phase = Phase::Applying;
            BatchOutcome::Batch {
                plan,
                ticket: BatchTicket { epoch: self.epoch },
            }
        };
        self.stats.batches += 1;

        let duration_us = start.elapsed().as_micros() as u64;
        span.record("outcome", outcome.label());
        span.record("duration_us", duration_us);
        info!(
            operations = outcome.plan().map_or(0, BatchPlan::operation_count),
            "listdelta batch resolved"
        );
        Ok(outcome)
    }

    /// Report that the surface finished applying the batch for `ticket`.
    ///
    /// Returns the items to reconfigure in place: the batch's reconfigure
    /// list if `finished`, nothing otherwise. All batch state is reset
    /// either way and the aggregator returns to idle.
    ///
    /// # Panics
    ///
    /// If no batch is applying or the ticket belongs to another batch.
    pub fn complete_batch(&mut self, ticket: BatchTicket, finished: bool) -> Vec<ItemIndex> {
        match self.try_complete_batch(ticket, finished) {
            Ok(items) => items,
            Err(err) => panic!("{err}"),
        }
    }

    /// Complete a batch, reporting misuse instead of panicking.
    pub fn try_complete_batch(
        &mut self,
        ticket: BatchTicket,
        finished: bool,
    ) -> Result<Vec<ItemIndex>, SequenceError> {
        if self.phase != Phase::Applying {
            return Err(SequenceError::NotApplying { phase: self.phase });
        }
        if ticket.epoch != self.epoch {
            return Err(SequenceError::StaleTicket {
                expected: self.epoch,
                actual: ticket.epoch,
            });
        }

        let reconfigure = std::mem::take(&mut self.in_flight);
        let reconfigure = if finished { reconfigure } else { Vec::new() };
        let _span = info_span!(
            "listdelta.complete",
            epoch = self.epoch,
            finished,
            reconfigured = reconfigure.len()
        )
        .entered();

        self.pending.reset();
        self.reload_reason = None;
        self.stats.completed += 1;
        self.phase = Phase::Idle;
        if !finished {
            debug!("listdelta batch did not finish; skipping in-place reconfigure");
        }
        Ok(reconfigure)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Process one mutation event.
    ///
    /// # Panics
    ///
    /// If no batch is accumulating. This includes reload requests that
    /// arrive between `end_batch` and the next `begin_batch`.
    pub fn handle(&mut self, event: ChangeEvent) {
        if let Err(err) = self.try_handle(event) {
            panic!("{err}");
        }
    }

    /// Process one mutation event, reporting misuse instead of panicking.
    pub fn try_handle(&mut self, event: ChangeEvent) -> Result<(), SequenceError> {
        if self.phase != Phase::Accumulating {
            return Err(SequenceError::NoActiveBatch {
                operation: event.kind(),
                phase: self.phase,
            });
        }

        let ignored = self.pending.reload_all();
        let recorded = match event {
            ChangeEvent::ReloadRequested => {
                self.enter_reload(ReloadReason::Requested);
                true
            }
            ChangeEvent::SectionDeleted { section } => {
                trace!(section, "listdelta section deleted");
                self.enter_reload(ReloadReason::SectionDeleted);
                true
            }
            ChangeEvent::SectionInserted { section } => {
                self.pending.record_section_inserted(section)
            }
            ChangeEvent::SectionUpdated { section } => self.pending.record_section_updated(section),
            ChangeEvent::ItemInserted { index } => self.pending.record_item_inserted(index),
            ChangeEvent::ItemDeleted { index } => self.pending.record_item_deleted(index),
            ChangeEvent::ItemUpdated { index } => self.pending.record_item_updated(index),
            ChangeEvent::ItemMoved { from, to } => self.pending.record_item_moved(from, to),
        };

        self.batch_events += 1;
        self.stats.events += 1;
        if !recorded && !ignored {
            self.batch_suppressed += 1;
            self.stats.suppressed += 1;
            trace!(
                kind = event.kind(),
                section_level = event.is_section_level(),
                ?event,
                "listdelta event suppressed"
            );
        }
        Ok(())
    }

    fn enter_reload(&mut self, reason: ReloadReason) {
        if self.pending.reload_all() {
            return;
        }
        debug!(
            epoch = self.epoch,
            reason = reason.as_str(),
            "listdelta falling back to full reload"
        );
        self.reload_reason = Some(reason);
        self.pending.request_reload();
    }

    /// Why the open batch will reload, if it will.
    #[must_use]
    pub fn reload_reason(&self) -> Option<ReloadReason> {
        self.reload_reason
    }

    // ------------------------------------------------------------------------
    // Per-kind shorthands
    // ------------------------------------------------------------------------

    pub fn reload_requested(&mut self) {
        self.handle(ChangeEvent::ReloadRequested);
    }

    pub fn section_inserted(&mut self, section: SectionIndex) {
        self.handle(ChangeEvent::SectionInserted { section });
    }

    pub fn section_deleted(&mut self, section: SectionIndex) {
        self.handle(ChangeEvent::SectionDeleted { section });
    }

    pub fn section_updated(&mut self, section: SectionIndex) {
        self.handle(ChangeEvent::SectionUpdated { section });
    }

    pub fn item_inserted(&mut self, index: ItemIndex) {
        self.handle(ChangeEvent::ItemInserted { index });
    }

    pub fn item_deleted(&mut self, index: ItemIndex) {
        self.handle(ChangeEvent::ItemDeleted { index });
    }

    pub fn item_updated(&mut self, index: ItemIndex) {
        self.handle(ChangeEvent::ItemUpdated { index });
    }

    pub fn item_moved(&mut self, from: ItemIndex, to: ItemIndex) {
        self.handle(ChangeEvent::ItemMoved { from, to });
    }
}
