//! Core data-model errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("request id must not be empty")]
    EmptyRequestId,

    #[error("invalid pod name: {0}")]
    InvalidPodName(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
