#![forbid(unsafe_code)]

use std::fmt;

use crate::aggregator::Phase;

/// A batch lifecycle call arrived in the wrong phase.
///
/// These are caller bugs. The panicking aggregator methods report them by
/// panicking with this error's message; the `try_*` methods return it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    /// An event or `end_batch` arrived with no batch accumulating.
    NoActiveBatch { operation: &'static str, phase: Phase },
    /// `begin_batch` while the previous batch has not completed.
    BatchInFlight { epoch: u64 },
    /// `begin_batch` twice without an `end_batch` in between.
    AlreadyAccumulating { epoch: u64 },
    /// `complete_batch` while no batch is applying.
    NotApplying { phase: Phase },
    /// `complete_batch` with a ticket from another batch.
    StaleTicket { expected: u64, actual: u64 },
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveBatch { operation, phase } => {
                write!(f, "{operation} called with no active batch (phase: {phase})")
            }
            Self::BatchInFlight { epoch } => {
                write!(f, "begin_batch called before batch {epoch} completed")
            }
            Self::AlreadyAccumulating { epoch } => {
                write!(f, "begin_batch called while batch {epoch} is still accumulating")
            }
            Self::NotApplying { phase } => {
                write!(f, "complete_batch called with no batch applying (phase: {phase})")
            }
            Self::StaleTicket { expected, actual } => {
                write!(
                    f,
                    "complete_batch called with ticket for batch {actual}, expected batch {expected}"
                )
            }
        }
    }
}

impl std::error::Error for SequenceError {}
