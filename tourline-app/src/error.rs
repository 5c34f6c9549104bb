use tourline_core::CoreError;

/// Result kinds a caller of `BookingApi` can tell apart.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// Details are logged, callers only see a generic message.
    #[error("Internal error")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::Validation(msg),
            CoreError::NotFound(msg) => AppError::NotFound(msg),
            CoreError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                AppError::Internal(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_keep_their_kind() {
        let err: AppError = CoreError::validation("passenger details required").into();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.to_string(), "passenger details required");

        let err: AppError = CoreError::not_found("reservation", "abc").into();
        assert_eq!(err.code(), "NOT_FOUND");

        let err: AppError = CoreError::internal("connection reset").into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.to_string(), "Internal error");
    }
}
