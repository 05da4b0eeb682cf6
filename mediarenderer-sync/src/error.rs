use mediarenderer_api::ApiError;
use thiserror::Error;

/// Errors returned by the sync layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// No protocol client is bound; nothing was sent
    #[error("Client not initialized")]
    NotInitialized,

    /// An argument was rejected locally; nothing was sent
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The protocol client reported a failure, passed through unmodified
    #[error("Remote call failed: {0}")]
    Remote(#[from] ApiError),

    /// A field value could not be interpreted
    #[error("Invalid {field} value '{value}': {reason}")]
    Parse {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// The controller task has terminated
    #[error("Renderer controller is no longer running")]
    ControllerClosed,
}

impl SyncError {
    /// Classify an error raised while building a request, before any I/O
    pub(crate) fn local(error: ApiError) -> Self {
        match error {
            ApiError::InvalidParameter(message) => SyncError::InvalidParameter(message),
            other => SyncError::Remote(other),
        }
    }

    pub(crate) fn parse(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        SyncError::Parse {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
