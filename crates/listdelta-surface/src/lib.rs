#![forbid(unsafe_code)]

//! Presentation adapter for listdelta.
//!
//! [`SurfaceBinding`] sits between an observing/fetch component and a
//! list/grid [`RenderSurface`]. It feeds change notifications into a
//! [`ChangeSetAggregator`](listdelta_core::ChangeSetAggregator), applies the
//! resulting plan to the surface, and refreshes updated cells in place once
//! the surface's transaction settles.
//!
//! [`HeadlessSurface`] is an in-memory surface for tests and replay.

pub mod binding;
pub mod headless;
pub mod source;
pub mod surface;

pub use binding::{BindingBuilder, ConfigureItem, SurfaceBinding};
pub use headless::{CompletionMode, HeadlessCell, HeadlessSurface, SurfaceOp};
pub use source::{BindError, FetchError, FetchSource};
pub use surface::{Completion, RenderSurface};
