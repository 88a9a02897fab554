//! Error types for the sample plugin.

use thiserror::Error;

use statetree_reader::ReaderError;

/// Main error type for the sample plugin.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Registering or reading the state tree failed.
    #[error(transparent)]
    Reader(#[from] ReaderError),

    /// A seed element is not usable.
    #[error("Invalid element: {0}")]
    InvalidElement(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for sample plugin operations.
pub type Result<T> = std::result::Result<T, SampleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use statetree_reader::SchemaPath;

    #[test]
    fn test_reader_error_is_transparent() {
        let path = SchemaPath::root("sample-plugin-state");
        let err = SampleError::from(ReaderError::UnregisteredPath(path));
        assert_eq!(
            err.to_string(),
            "no reader registered at /sample-plugin-state"
        );
    }
}
