use serde::{Deserialize, Serialize};
use std::fmt;

/// The UPnP services of a MediaRenderer this bridge talks to
///
/// Each service doubles as an event topic: subscribing to a service delivers
/// its evented state variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    /// AVTransport service - playback control; evented field `TransportState`
    AVTransport,

    /// RenderingControl service - volume and mute; evented fields `Volume`, `Mute`
    RenderingControl,
}

/// Default endpoint paths and URN of a service
///
/// The paths are a fallback for devices whose description URLs were not
/// supplied through [`ClientConfig::with_endpoints`](crate::ClientConfig::with_endpoints).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Control path, relative to the device base URL
    pub endpoint: &'static str,

    /// The UPnP service URI used in SOAP requests
    pub service_uri: &'static str,

    /// Event subscription path, relative to the device base URL
    pub event_endpoint: &'static str,
}

impl Service {
    /// Both services, in the order the controller subscribes to them
    pub const ALL: [Service; 2] = [Service::RenderingControl, Service::AVTransport];

    pub fn name(&self) -> &'static str {
        match self {
            Service::AVTransport => "AVTransport",
            Service::RenderingControl => "RenderingControl",
        }
    }

    pub fn info(&self) -> ServiceInfo {
        match self {
            Service::AVTransport => ServiceInfo {
                endpoint: "MediaRenderer/AVTransport/Control",
                service_uri: "urn:schemas-upnp-org:service:AVTransport:1",
                event_endpoint: "MediaRenderer/AVTransport/Event",
            },
            Service::RenderingControl => ServiceInfo {
                endpoint: "MediaRenderer/RenderingControl/Control",
                service_uri: "urn:schemas-upnp-org:service:RenderingControl:1",
                event_endpoint: "MediaRenderer/RenderingControl/Event",
            },
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
