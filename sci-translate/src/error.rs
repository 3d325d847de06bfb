use thiserror::Error;

/// Message shown for every backend failure, whatever the underlying cause.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An error occurred during translation. Please try again later.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// The request was rejected before any backend call
    #[error("{field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    /// A backend call failed; the cause has already been logged
    #[error("{}", GENERIC_FAILURE_MESSAGE)]
    Backend,
}

impl TranslateError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TranslateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_is_generic() {
        assert_eq!(TranslateError::Backend.to_string(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_input_error_names_field() {
        let err = TranslateError::invalid("text", "Text must be at least 10 characters long.");
        assert_eq!(
            err.to_string(),
            "text: Text must be at least 10 characters long."
        );
        assert!(matches!(err, TranslateError::InvalidInput { field: "text", .. }));
    }
}
