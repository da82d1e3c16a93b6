//! Error taxonomy shared by the transport, folder and upload layers

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A batch was submitted without any files.
    #[error("no files were submitted for upload")]
    EmptyBatch,

    /// The target key already exists and must not be silently overwritten.
    #[error("object already exists: {0}")]
    Conflict(String),

    /// A folder marker with the same key is already present.
    #[error("folder already exists: {0}")]
    AlreadyExists(String),

    /// Buckets are only removed once every object is gone.
    #[error("bucket is not empty: {0}")]
    BucketNotEmpty(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Network or storage failure for a single request.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Map a non-success HTTP status and response body onto the taxonomy.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = if body.is_empty() {
            status.to_string()
        } else {
            format!("{} - {}", status, body)
        };
        match status.as_u16() {
            404 => StoreError::NotFound(detail),
            401 | 403 => StoreError::PermissionDenied(detail),
            409 => StoreError::Conflict(detail),
            _ => StoreError::Transport(detail),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Transport(format!("request timed out: {}", err))
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StoreError;
    use reqwest::StatusCode;

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(matches!(
            StoreError::from_status(StatusCode::NOT_FOUND, ""),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::FORBIDDEN, "nope"),
            StoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::UNAUTHORIZED, ""),
            StoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::CONFLICT, "exists"),
            StoreError::Conflict(_)
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::BAD_GATEWAY, ""),
            StoreError::Transport(_)
        ));
    }

    #[test]
    fn status_detail_includes_body() {
        let err = StoreError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "disk full");
        assert_eq!(
            err.to_string(),
            "transport error: 500 Internal Server Error - disk full"
        );
    }
}
