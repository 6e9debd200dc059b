use thiserror::Error;

/// Main error type for lsearch operations
#[derive(Error, Debug)]
pub enum LsearchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Corrupt store: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for lsearch operations
pub type Result<T> = std::result::Result<T, LsearchError>;

impl LsearchError {
    /// Every failure reflects caller misuse or a malformed store, so nothing is retried.
    pub fn is_retriable(&self) -> bool {
        false
    }

    /// Map an I/O error raised while decoding a stored span.
    ///
    /// A short read means a length or offset points past the end of the blob.
    pub(crate) fn from_decode_io(err: std::io::Error, what: &str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            LsearchError::Corrupt(format!("{} extends past end of file", what))
        } else {
            LsearchError::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LsearchError::SchemaViolation("missing column in row 0: description".into());
        assert_eq!(
            err.to_string(),
            "Schema violation: missing column in row 0: description"
        );
    }

    #[test]
    fn test_nothing_is_retriable() {
        assert!(!LsearchError::NotFound("x".into()).is_retriable());
        assert!(!LsearchError::Corrupt("x".into()).is_retriable());
    }

    #[test]
    fn test_short_read_is_corrupt() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            LsearchError::from_decode_io(io, "record"),
            LsearchError::Corrupt(_)
        ));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            LsearchError::from_decode_io(io, "record"),
            LsearchError::Io(_)
        ));
    }
}
