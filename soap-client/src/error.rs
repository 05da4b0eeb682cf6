//! Error types for the SOAP and GENA requests

use thiserror::Error;

/// Errors that can occur while talking to a device over HTTP
#[derive(Debug, Error)]
pub enum SoapError {
    /// Transport failure: connection, timeout or unreadable body
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The device answered with a non-success status and no UPnP fault
    #[error("{request} failed: HTTP {status}")]
    Status { request: &'static str, status: u16 },

    /// Response body or headers could not be decoded
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// UPnP error code from a SOAP fault body
    #[error("SOAP fault: error code {0}")]
    Fault(u16),
}

impl SoapError {
    pub(crate) fn from_ureq(request: &'static str, error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(status, _) => SoapError::Status { request, status },
            other => SoapError::Network(other.to_string()),
        }
    }
}
