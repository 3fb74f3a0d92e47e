//! Status lines handed to the display collaborator after each step.

use std::fmt;

use crate::controller::{SkipReason, StepOutcome};
use crate::error::ApplyError;
use crate::stream::Side;

/// What happened on one side, in a form a UI can render directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub side: Side,
    /// Filter that ran or failed; `None` when nothing was attempted.
    pub filter_name: Option<&'static str>,
    pub success: bool,
    pub error: Option<String>,
}

impl StatusReport {
    pub fn from_result(side: Side, result: &Result<StepOutcome, ApplyError>) -> Self {
        match result {
            Ok(StepOutcome::Applied(applied)) => Self {
                side,
                filter_name: Some(applied.filter_name),
                success: true,
                error: None,
            },
            Ok(StepOutcome::Skipped { .. }) => Self {
                side,
                filter_name: None,
                success: true,
                error: None,
            },
            Err(err @ (ApplyError::Filter { filter, .. } | ApplyError::Panicked { filter })) => Self {
                side,
                filter_name: Some(*filter),
                success: false,
                error: Some(err.to_string()),
            },
            Err(err) => Self {
                side,
                filter_name: None,
                success: false,
                error: Some(err.to_string()),
            },
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.filter_name) {
            (Some(error), _) => write!(f, "{}: {}", self.side, error),
            (None, Some(name)) => write!(f, "{}: {}", self.side, name),
            (None, None) => write!(f, "{}: unchanged", self.side),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyBusy => f.write_str("already processing"),
            SkipReason::Superseded => f.write_str("superseded by a new image"),
        }
    }
}
