pub mod audit;
pub mod catalog;
pub mod notify;
pub mod payment;
pub mod repository;
pub mod reservation;
pub mod routing;

/// Result kinds surfaced by the booking core. HTTP or CLI layers map these
/// onto their own status codes.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} {}", what, id))
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::InternalError(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Error type returned by repository and adapter implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
