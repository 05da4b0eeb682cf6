//! The protocol client contract consumed by the sync layer

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{FieldMap, Result, Service};

/// Receives the decoded fields of every event delivered on a subscription
pub type EventHandler = Arc<dyn Fn(FieldMap) + Send + Sync + 'static>;

/// Owned token for an active subscription
///
/// Returned by [`ProtocolClient::subscribe`] and handed back, unchanged, to
/// [`ProtocolClient::unsubscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    topic: Service,
    sid: String,
}

impl SubscriptionHandle {
    pub fn new(topic: Service, sid: impl Into<String>) -> Self {
        Self {
            topic,
            sid: sid.into(),
        }
    }

    pub fn topic(&self) -> Service {
        self.topic
    }

    /// Subscription identifier assigned by the device (or by a fake client)
    pub fn sid(&self) -> &str {
        &self.sid
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.topic, self.sid)
    }
}

/// Capability interface over a device's control and event surfaces
///
/// Every method is a network round trip. Implementations must not retry;
/// errors are reported to the caller as they occurred.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Register `handler` for events published on `topic`
    async fn subscribe(&self, topic: Service, handler: EventHandler) -> Result<SubscriptionHandle>;

    /// Cancel a subscription previously returned by [`subscribe`](Self::subscribe)
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()>;

    /// Invoke `action` on `service` and return the result fields
    async fn call_action(&self, service: Service, action: &str, args: FieldMap) -> Result<FieldMap>;
}
