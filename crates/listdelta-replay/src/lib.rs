#![forbid(unsafe_code)]

//! Replay JSON Lines change traces through a
//! [`ChangeSetAggregator`](listdelta_core::ChangeSetAggregator).
//!
//! Each `end` record prints one JSON object describing the resolved batch.

pub mod cli;
pub mod error;
pub mod replay;
pub mod trace;

pub use cli::{Cli, run, run_from_env, run_to};
pub use error::{ReplayError, Result};
pub use replay::{BatchReport, Replayer, StepReport, replay};
pub use trace::TraceRecord;
