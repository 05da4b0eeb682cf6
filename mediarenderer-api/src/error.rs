use soap_client::SoapError;
use thiserror::Error;

/// Errors surfaced by a protocol client
///
/// These are the "remote call failures" of the sync layer: they are passed
/// through to callers unmodified and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Network communication error
    ///
    /// Connection refused, timeouts, unreachable device or a non-2xx HTTP
    /// status without a SOAP fault body.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The device answered but the payload could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// SOAP fault returned by device
    #[error("SOAP fault: error code {0}")]
    SoapFault(u16),

    /// Invalid parameter value, rejected before anything is sent
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// UPnP subscription operation failed (SUBSCRIBE, UNSUBSCRIBE or NOTIFY routing)
    #[error("Subscription error: {0}")]
    SubscriptionError(String),
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<SoapError> for ApiError {
    fn from(error: SoapError) -> Self {
        match error {
            SoapError::Network(msg) => ApiError::NetworkError(msg),
            status @ SoapError::Status { .. } => ApiError::NetworkError(status.to_string()),
            SoapError::Parse(msg) => ApiError::ParseError(msg),
            SoapError::Fault(code) => ApiError::SoapFault(code),
        }
    }
}
