#![forbid(unsafe_code)]

//! Outbound interface: the rendering surface.

use listdelta_core::{BatchPlan, ItemIndex};

/// How a surface reports the end of a batch transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The transaction already settled. `finished` is `false` if the surface
    /// cut its animations short.
    Settled { finished: bool },
    /// The transaction is still running. The surface owner must call
    /// [`SurfaceBinding::batch_completed`](crate::SurfaceBinding::batch_completed)
    /// once it settles.
    Deferred,
}

/// A list/grid presentation surface.
///
/// `apply_batch` performs every non-empty step of the plan, in
/// [`BatchPlan::steps`] order, as one visual transaction. Partial
/// application is not supported: a surface that cannot apply a plan should
/// fall back to reloading everything itself. Empty plans must be accepted.
pub trait RenderSurface {
    /// Handle to an on-screen cell.
    type Element;

    /// Discard everything and repaint from the data source.
    fn reload_all(&mut self);

    /// Apply a plan as one transaction.
    fn apply_batch(&mut self, plan: &BatchPlan) -> Completion;

    /// The cell currently showing `index`, if it is on screen.
    fn element_mut(&mut self, index: ItemIndex) -> Option<&mut Self::Element>;
}
