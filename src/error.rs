//! Error types for a3s-sentinel

use thiserror::Error;

/// Errors that can occur in the sentinel pipeline
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Durable store could not be reached
    #[error("Storage unavailable for collection '{collection}': {reason}")]
    StorageUnavailable {
        collection: String,
        reason: String,
    },

    /// A single subscriber's delivery failed
    #[error("Delivery to subscriber {registration} failed: {reason}")]
    DeliveryFailed {
        registration: u64,
        reason: String,
    },

    /// Inbound connection could not be accepted
    #[error("Failed to accept connection: {0}")]
    AcceptFailed(String),

    /// Subscriber registry is full
    #[error("Subscriber registry at capacity ({limit})")]
    Capacity { limit: usize },

    /// Operation not allowed in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file parse failure
    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl SentinelError {
    /// Build a `StorageUnavailable` error for a collection
    pub fn storage(collection: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable {
            collection: collection.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for sentinel operations
pub type Result<T> = std::result::Result<T, SentinelError>;

impl axum::response::IntoResponse for SentinelError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            SentinelError::StorageUnavailable { .. } | SentinelError::Capacity { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SentinelError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = SentinelError::storage("log", "connection refused");
        assert_eq!(
            err.to_string(),
            "Storage unavailable for collection 'log': connection refused"
        );
    }

    #[test]
    fn test_capacity_error_display() {
        let err = SentinelError::Capacity { limit: 8 };
        assert!(err.to_string().contains("(8)"));
    }
}
