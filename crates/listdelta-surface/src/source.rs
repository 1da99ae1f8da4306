#![forbid(unsafe_code)]

//! Upstream interface: the observing/fetch component.

use listdelta_core::SequenceError;
use thiserror::Error;

/// Failure of the upstream fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The query was rejected (bad predicate, missing store, ...).
    #[error("fetch rejected: {0}")]
    Rejected(String),
    /// The backing store could not be reached.
    #[error("fetch source unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A component that fetches data and later reports changes to it through a
/// [`ChangeObserver`](listdelta_core::ChangeObserver).
pub trait FetchSource {
    /// Run the initial fetch.
    fn perform_fetch(&mut self) -> Result<(), FetchError>;
}

/// Errors surfaced by [`SurfaceBinding`](crate::SurfaceBinding).
#[derive(Debug, Error)]
pub enum BindError {
    /// The initial fetch failed; the surface was left untouched.
    #[error("initial fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// A batch lifecycle call arrived in the wrong phase.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}
