//! Configuration for the UPnP protocol client

use std::collections::HashMap;
use std::time::Duration;

use soap_client::SoapClientConfig;

use crate::Service;

/// Configuration for [`UpnpClient`](crate::UpnpClient)
///
/// The base URL and callback URL come from the embedding application: the
/// former from the device description, the latter from whatever HTTP server
/// receives NOTIFY requests and forwards them to
/// [`UpnpClient::dispatch_notify`](crate::UpnpClient::dispatch_notify).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Device base URL, e.g. `http://192.168.1.20:49152`
    pub base_url: String,

    /// URL advertised in the GENA `CALLBACK` header
    pub callback_url: String,

    /// Requested subscription lifetime
    /// Default: 1800 seconds
    pub subscription_timeout: Duration,

    /// HTTP timeouts for SOAP and GENA requests
    pub soap: SoapClientConfig,

    /// `controlURL`/`eventSubURL` declared in the device description, per
    /// service. Services without an entry use the default paths from
    /// [`Service::info`].
    pub endpoints: HashMap<Service, ServiceEndpoints>,
}

/// Control and event URLs of one service as declared by the device
///
/// Either absolute (`http://...`) or relative to the base URL, the way
/// device descriptions usually list them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub control_url: String,
    pub event_url: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, callback_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            callback_url: callback_url.into(),
            subscription_timeout: Duration::from_secs(1800),
            soap: SoapClientConfig::default(),
            endpoints: HashMap::new(),
        }
    }

    /// Use the URLs from the device description for `service`
    pub fn with_endpoints(
        mut self,
        service: Service,
        control_url: impl Into<String>,
        event_url: impl Into<String>,
    ) -> Self {
        self.endpoints.insert(
            service,
            ServiceEndpoints {
                control_url: control_url.into(),
                event_url: event_url.into(),
            },
        );
        self
    }

    /// Shorter subscriptions and tighter HTTP timeouts, for renderers on flaky links
    pub fn short_lived(base_url: impl Into<String>, callback_url: impl Into<String>) -> Self {
        Self {
            subscription_timeout: Duration::from_secs(300),
            soap: SoapClientConfig {
                connect_timeout: Duration::from_secs(2),
                read_timeout: Duration::from_secs(5),
            },
            ..Self::new(base_url, callback_url)
        }
    }

    pub fn control_url(&self, service: Service) -> String {
        match self.endpoints.get(&service) {
            Some(endpoints) => self.resolve(&endpoints.control_url),
            None => self.resolve(service.info().endpoint),
        }
    }

    pub fn event_url(&self, service: Service) -> String {
        match self.endpoints.get(&service) {
            Some(endpoints) => self.resolve(&endpoints.event_url),
            None => self.resolve(service.info().event_endpoint),
        }
    }

    pub(crate) fn subscription_timeout_secs(&self) -> u32 {
        u32::try_from(self.subscription_timeout.as_secs()).unwrap_or(u32::MAX)
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}
