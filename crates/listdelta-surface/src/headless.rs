#![forbid(unsafe_code)]

//! In-memory surface that records what it was asked to do.
//!
//! Used by tests and by the replay tool. It keeps a log of [`SurfaceOp`]s
//! and a map of "visible" cells. Cells are keyed by the index they were
//! shown at; applying a plan removes cells at deleted positions but does
//! not shift the survivors.

use std::collections::BTreeMap;

use listdelta_core::{BatchPlan, ItemIndex, PlanStep, SectionIndex, StepKind};

use crate::surface::{Completion, RenderSurface};

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    ReloadAll,
    Sections(StepKind, Vec<SectionIndex>),
    Items(StepKind, Vec<ItemIndex>),
}

/// How [`HeadlessSurface::apply_batch`] reports completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Settle synchronously with `finished = true`.
    #[default]
    Immediate,
    /// Settle synchronously with `finished = false`.
    Interrupted,
    /// Leave the transaction open for the caller to complete.
    Deferred,
}

/// A visible cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessCell {
    pub content: String,
    /// Times the cell was refreshed in place.
    pub configured: u32,
    /// Times the cell was reloaded by a plan step.
    pub reloaded: u32,
}

impl HeadlessCell {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct HeadlessSurface {
    ops: Vec<SurfaceOp>,
    cells: BTreeMap<ItemIndex, HeadlessCell>,
    completion: CompletionMode,
    batches: usize,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_completion(mut self, mode: CompletionMode) -> Self {
        self.completion = mode;
        self
    }

    pub fn set_completion(&mut self, mode: CompletionMode) {
        self.completion = mode;
    }

    /// Put a cell on screen at `index`.
    pub fn show(&mut self, index: ItemIndex, content: impl Into<String>) {
        self.cells.insert(index, HeadlessCell::new(content));
    }

    /// Take the cell at `index` off screen.
    pub fn hide(&mut self, index: ItemIndex) -> Option<HeadlessCell> {
        self.cells.remove(&index)
    }

    pub fn cell(&self, index: ItemIndex) -> Option<&HeadlessCell> {
        self.cells.get(&index)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&ItemIndex, &HeadlessCell)> {
        self.cells.iter()
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Drain the recorded ops.
    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of `apply_batch` calls, empty plans included.
    pub fn batches_applied(&self) -> usize {
        self.batches
    }

    /// Number of full reloads recorded so far.
    pub fn reload_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, SurfaceOp::ReloadAll))
            .count()
    }

    fn apply_step(&mut self, step: PlanStep<'_>) {
        let kind = step.kind();
        match step {
            PlanStep::DeleteSections(sections) => {
                self.cells.retain(|index, _| !sections.contains(&index.section));
                self.ops
                    .push(SurfaceOp::Sections(kind, sections.iter().copied().collect()));
            }
            PlanStep::InsertSections(sections) | PlanStep::ReloadSections(sections) => {
                self.ops
                    .push(SurfaceOp::Sections(kind, sections.iter().copied().collect()));
            }
            PlanStep::DeleteItems(items) => {
                for index in items {
                    self.cells.remove(index);
                }
                self.ops.push(SurfaceOp::Items(kind, items.to_vec()));
            }
            PlanStep::InsertItems(items) => {
                self.ops.push(SurfaceOp::Items(kind, items.to_vec()));
            }
            PlanStep::ReloadItems(items) => {
                for index in items {
                    if let Some(cell) = self.cells.get_mut(index) {
                        cell.reloaded += 1;
                    }
                }
                self.ops.push(SurfaceOp::Items(kind, items.to_vec()));
            }
        }
    }
}

impl RenderSurface for HeadlessSurface {
    type Element = HeadlessCell;

    fn reload_all(&mut self) {
        self.ops.push(SurfaceOp::ReloadAll);
    }

    fn apply_batch(&mut self, plan: &BatchPlan) -> Completion {
        self.batches += 1;
        for step in plan.steps() {
            self.apply_step(step);
        }
        match self.completion {
            CompletionMode::Immediate => Completion::Settled { finished: true },
            CompletionMode::Interrupted => Completion::Settled { finished: false },
            CompletionMode::Deferred => Completion::Deferred,
        }
    }

    fn element_mut(&mut self, index: ItemIndex) -> Option<&mut HeadlessCell> {
        self.cells.get_mut(&index)
    }
}
