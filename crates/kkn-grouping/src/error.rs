//! Engine error types.

use kkn_core::CriteriaError;
use thiserror::Error;

/// Errors that stop a grouping run before any group is formed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("roster is empty")]
    EmptyRoster,

    #[error("no locations available")]
    NoLocations,

    #[error("no students match gender filter `{0}`")]
    NoEligibleStudents(&'static str),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid criteria: {0}")]
    InvalidCriteria(#[from] CriteriaError),

    #[error("group {group} ({size} members) does not fit the remaining quota of any location")]
    InsufficientCapacity { group: u32, size: usize },
}

impl EngineError {
    /// Caller-side input problems, as opposed to capacity exhaustion.
    pub fn is_validation(&self) -> bool {
        !matches!(self, EngineError::InsufficientCapacity { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
