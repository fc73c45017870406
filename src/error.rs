//! Error taxonomy shared by every catalog operation.

use thiserror::Error;

/// Errors surfaced by catalog operations.
///
/// Each variant carries enough detail (locale, namespace, key, file) for the
/// caller to retry narrowly. Nothing in the crate retries on its own.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Malformed code or path, or a required field is missing.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown locale, namespace, key, snapshot or changelog entry.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate key or locale.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The operation cannot be carried out on this target.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The external translation model failed or timed out.
    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data in {path}: {source}")]
    Serialization {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    /// Short machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::InvalidArgument(_) => "invalid_argument",
            CatalogError::NotFound(_) => "not_found",
            CatalogError::Conflict(_) => "conflict",
            CatalogError::Unsupported(_) => "unsupported",
            CatalogError::ExternalService(_) => "external_service_error",
            CatalogError::Io { .. } => "io_error",
            CatalogError::Serialization { .. } => "serialization_error",
        }
    }

    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn serialization(
        path: impl AsRef<std::path::Path>,
        source: serde_json::Error,
    ) -> Self {
        CatalogError::Serialization {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CatalogError::InvalidArgument("x".into()).kind(),
            "invalid_argument"
        );
        assert_eq!(CatalogError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(CatalogError::Conflict("x".into()).kind(), "conflict");
        assert_eq!(CatalogError::Unsupported("x".into()).kind(), "unsupported");
        assert_eq!(
            CatalogError::ExternalService("x".into()).kind(),
            "external_service_error"
        );
    }

    #[test]
    fn test_error_display_includes_detail() {
        let err = CatalogError::NotFound("namespace 'Greeting' in locale 'es'".into());
        assert_eq!(
            err.to_string(),
            "not found: namespace 'Greeting' in locale 'es'"
        );
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = CatalogError::io(
            "/tmp/messages/en.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/messages/en.json"));
        assert_eq!(err.kind(), "io_error");
    }
}
