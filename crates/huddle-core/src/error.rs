use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing, expired or unknown credential.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated, but the resolved role does not allow the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Username or email already registered.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    /// Anything the store reported. The surrounding transaction is rolled back.
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
