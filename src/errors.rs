//! Error types for the object pool

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("maximum retained must be at least 1, got {0}")]
    InvalidMaximumRetained(usize),
}

pub type PoolResult<T> = Result<T, PoolError>;
