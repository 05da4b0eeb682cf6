//! Private SOAP client for UPnP device communication
//!
//! This crate provides a minimal SOAP client for talking to UPnP
//! MediaRenderer devices. It also supports UPnP event subscriptions using
//! the GENA SUBSCRIBE/UNSUBSCRIBE methods, including renewal.

mod error;

pub use error::SoapError;

use std::time::Duration;
use xmltree::{Element, XMLNode};

/// Ordered list of `(name, value)` pairs.
///
/// UPnP devices expect action arguments in the order declared by the
/// service description, so arguments are never sorted.
pub type Arguments = Vec<(String, String)>;

/// Response from a UPnP subscription request
#[derive(Debug, Clone)]
pub struct SubscriptionResponse {
    /// Subscription ID returned by the device
    pub sid: String,
    /// Actual timeout granted by the device (in seconds)
    pub timeout_seconds: u32,
}

/// Timeouts applied to every request made by a [`SoapClient`]
#[derive(Debug, Clone)]
pub struct SoapClientConfig {
    /// Default: 5 seconds
    pub connect_timeout: Duration,
    /// Default: 10 seconds
    pub read_timeout: Duration,
}

impl Default for SoapClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
        }
    }
}

/// A minimal SOAP client for UPnP device communication
#[derive(Debug, Clone)]
pub struct SoapClient {
    agent: ureq::Agent,
}

impl SoapClient {
    /// Create a new SOAP client with default configuration
    pub fn new() -> Self {
        Self::with_config(SoapClientConfig::default())
    }

    pub fn with_config(config: SoapClientConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(config.connect_timeout)
                .timeout_read(config.read_timeout)
                .build(),
        }
    }

    /// Invoke `action` on the service at `control_url`.
    ///
    /// Returns the children of the `<{action}Response>` element as ordered
    /// `(name, text)` pairs.
    pub fn call(
        &self,
        control_url: &str,
        service_uri: &str,
        action: &str,
        args: &[(String, String)],
    ) -> Result<Arguments, SoapError> {
        let body = build_envelope(service_uri, action, args);
        let soap_action = format!("\"{}#{}\"", service_uri, action);

        let result = self
            .agent
            .post(control_url)
            .set("Content-Type", "text/xml; charset=\"utf-8\"")
            .set("SOAPACTION", &soap_action)
            .send_string(&body);

        // Devices report UPnP errors as HTTP 500 with a fault body
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let text = response
                    .into_string()
                    .map_err(|e| SoapError::Network(e.to_string()))?;
                return match Element::parse(text.as_bytes()).map(|xml| extract_response(&xml, action)) {
                    Ok(Err(fault @ SoapError::Fault(_))) => Err(fault),
                    _ => Err(SoapError::Status {
                        request: "SOAP",
                        status,
                    }),
                };
            }
            Err(e) => return Err(SoapError::from_ureq("SOAP", e)),
        };

        let xml_text = response
            .into_string()
            .map_err(|e| SoapError::Network(e.to_string()))?;

        let xml = Element::parse(xml_text.as_bytes())
            .map_err(|e| SoapError::Parse(e.to_string()))?;

        extract_response(&xml, action)
    }

    /// Subscribe to UPnP events for a service
    ///
    /// # Arguments
    /// * `event_url` - Absolute event subscription URL of the service
    /// * `callback_url` - URL where events should be sent
    /// * `timeout_seconds` - Requested subscription timeout in seconds
    pub fn subscribe(
        &self,
        event_url: &str,
        callback_url: &str,
        timeout_seconds: u32,
    ) -> Result<SubscriptionResponse, SoapError> {
        let response = self
            .agent
            .request("SUBSCRIBE", event_url)
            .set("CALLBACK", &format!("<{}>", callback_url))
            .set("NT", "upnp:event")
            .set("TIMEOUT", &format!("Second-{}", timeout_seconds))
            .call()
            .map_err(|e| SoapError::from_ureq("SUBSCRIBE", e))?;

        if response.status() != 200 {
            return Err(SoapError::Status {
                request: "SUBSCRIBE",
                status: response.status(),
            });
        }

        let sid = response
            .header("SID")
            .ok_or_else(|| SoapError::Parse("Missing SID header in SUBSCRIBE response".to_string()))?
            .to_string();

        let timeout_seconds = response
            .header("TIMEOUT")
            .and_then(parse_timeout_header)
            .unwrap_or(timeout_seconds);

        Ok(SubscriptionResponse {
            sid,
            timeout_seconds,
        })
    }

    /// Renew the subscription identified by `sid`
    ///
    /// A renewal is a SUBSCRIBE carrying the `SID` header and neither
    /// `CALLBACK` nor `NT`. Returns the timeout granted by the device,
    /// falling back to the requested one when the response has none.
    pub fn renew(&self, event_url: &str, sid: &str, timeout_seconds: u32) -> Result<u32, SoapError> {
        let response = self
            .agent
            .request("SUBSCRIBE", event_url)
            .set("SID", sid)
            .set("TIMEOUT", &format!("Second-{}", timeout_seconds))
            .call()
            .map_err(|e| SoapError::from_ureq("SUBSCRIBE renewal", e))?;

        if response.status() != 200 {
            return Err(SoapError::Status {
                request: "SUBSCRIBE renewal",
                status: response.status(),
            });
        }

        Ok(response
            .header("TIMEOUT")
            .and_then(parse_timeout_header)
            .unwrap_or(timeout_seconds))
    }

    /// Cancel the subscription identified by `sid`
    pub fn unsubscribe(&self, event_url: &str, sid: &str) -> Result<(), SoapError> {
        let response = self
            .agent
            .request("UNSUBSCRIBE", event_url)
            .set("SID", sid)
            .call()
            .map_err(|e| SoapError::from_ureq("UNSUBSCRIBE", e))?;

        if response.status() != 200 {
            return Err(SoapError::Status {
                request: "UNSUBSCRIBE",
                status: response.status(),
            });
        }

        Ok(())
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}

fn build_envelope(service_uri: &str, action: &str, args: &[(String, String)]) -> String {
    let payload: String = args
        .iter()
        .map(|(name, value)| format!("<{name}>{}</{name}>", escape_text(value)))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{action} xmlns:u="{service_uri}">{payload}</u:{action}></s:Body></s:Envelope>"#,
    )
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Parse a "Second-1800" style header value
fn parse_timeout_header(value: &str) -> Option<u32> {
    value.strip_prefix("Second-")?.parse::<u32>().ok()
}

fn extract_response(xml: &Element, action: &str) -> Result<Arguments, SoapError> {
    let body = xml
        .get_child("Body")
        .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

    if let Some(fault) = body.get_child("Fault") {
        let error_code = fault
            .get_child("detail")
            .and_then(|d| d.get_child("UPnPError"))
            .and_then(|e| e.get_child("errorCode"))
            .and_then(|c| c.get_text())
            .and_then(|t| t.trim().parse::<u16>().ok())
            .unwrap_or(500);
        return Err(SoapError::Fault(error_code));
    }

    let response_name = format!("{}Response", action);
    let response = body
        .get_child(response_name.as_str())
        .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))?;

    Ok(response
        .children
        .iter()
        .filter_map(XMLNode::as_element)
        .map(|child| {
            let text = child.get_text().map(|t| t.into_owned()).unwrap_or_default();
            (child.name.clone(), text)
        })
        .collect())
}
