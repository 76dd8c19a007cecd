use thiserror::Error;

/// Core error type for Feather operations
#[derive(Error, Debug)]
pub enum FeatherError {
    /// IO errors from file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt, truncated, or magic-mismatched file. Reading aborts
    /// entirely; no partial table is ever returned.
    #[error("Format error: {0}")]
    Format(String),

    /// A null row was read into a non-nullable target type
    #[error("Null not allowed: {0}")]
    NullNotAllowed(String),

    /// A value cannot be represented in the requested destination type
    #[error("Lossy conversion: {0}")]
    LossyConversion(String),

    /// A category label or code has no counterpart in the requested enum
    #[error("Unresolvable category value: {0}")]
    UnresolvableCategoryValue(String),

    /// The requested output type has no coercion from the column's wire type
    #[error("Unsupported coercion: {0}")]
    UnsupportedCoercion(String),

    /// Typed projection arity or per-column type mismatch, raised at
    /// projection construction
    #[error("Projection shape error: {0}")]
    ProjectionShape(String),

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// UTF-8 decoding errors
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Result type alias for Feather operations
pub type Result<T> = std::result::Result<T, FeatherError>;

impl FeatherError {
    /// Create a new format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        FeatherError::Format(msg.into())
    }

    /// Create a new null-not-allowed error
    pub fn null_not_allowed<S: Into<String>>(msg: S) -> Self {
        FeatherError::NullNotAllowed(msg.into())
    }

    /// Create a new lossy conversion error
    pub fn lossy<S: Into<String>>(msg: S) -> Self {
        FeatherError::LossyConversion(msg.into())
    }

    /// Create a new unresolvable category error
    pub fn unresolvable<S: Into<String>>(msg: S) -> Self {
        FeatherError::UnresolvableCategoryValue(msg.into())
    }

    /// Create a new unsupported coercion error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        FeatherError::UnsupportedCoercion(msg.into())
    }

    /// Create a new projection shape error
    pub fn projection<S: Into<String>>(msg: S) -> Self {
        FeatherError::ProjectionShape(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        FeatherError::InvalidArgument(msg.into())
    }
}

/// Extension trait to add context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, ctx: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<FeatherError>,
{
    fn context<S: Into<String>>(self, ctx: S) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            FeatherError::Format(format!("{}: {}", ctx.into(), base_error))
        })
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            FeatherError::Format(format!("{}: {}", f().into(), base_error))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = FeatherError::format("bad magic");
        assert_eq!(err.to_string(), "Format error: bad magic");

        let err = FeatherError::lossy("300 does not fit in i8");
        assert_eq!(err.to_string(), "Lossy conversion: 300 does not fit in i8");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: FeatherError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(FeatherError::invalid_argument("bad input"))
        }

        let result = failing_operation().context("during footer read");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("during footer read"));
    }

    #[test]
    fn test_error_with_context() {
        fn failing_operation() -> Result<()> {
            Err(FeatherError::format("truncated buffer"))
        }

        let column = "prices";
        let result = failing_operation().with_context(|| format!("decoding column: {}", column));

        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("decoding column: prices"));
    }
}
