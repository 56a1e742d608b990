//! Domain-specific errors.

use thiserror::Error;

/// Reasons a merge command is unavailable or has nothing to do.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("no aggregation target configured")]
    NoTarget,
    #[error("source is the aggregation target itself")]
    TargetIsSource,
    #[error("'{0}' is not an aggregation document")]
    NotAnAggregation(String),
    #[error("source has no file path")]
    MissingSourcePath,
    #[error("nothing selected to merge")]
    EmptySelection,
    #[error("invalid line specification '{0}'")]
    InvalidLineSpec(String),
}
