//! [`ProtocolClient`] implementation over SOAP and GENA
//!
//! The SOAP client is blocking, so every request runs on tokio's blocking
//! pool. Incoming NOTIFY requests are routed by SID to the handler that was
//! registered with the subscription.
//!
//! Subscriptions lapse once the timeout granted by the device runs out.
//! [`UpnpClient::renew_due`] renews every subscription close to expiry and
//! is meant to be called periodically by the embedding application.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use soap_client::SoapClient;

use crate::events::parse_notify;
use crate::{
    ApiError, ClientConfig, EventHandler, FieldMap, ProtocolClient, Result, Service,
    SubscriptionHandle,
};

/// Renew once a subscription has less than this left (or half its lifetime,
/// whichever is shorter)
const RENEWAL_THRESHOLD: Duration = Duration::from_secs(300);

/// How long a NOTIFY for an unknown SID is kept for a subscription still
/// being registered
const HELD_NOTIFY_TTL: Duration = Duration::from_secs(5);
const HELD_NOTIFY_LIMIT: usize = 16;

struct Route {
    topic: Service,
    handler: EventHandler,
    /// Timeout granted by the device on the last SUBSCRIBE
    timeout_seconds: u32,
    expires_at: Instant,
}

impl Route {
    fn needs_renewal(&self, now: Instant) -> bool {
        let lifetime = Duration::from_secs(u64::from(self.timeout_seconds));
        let threshold = RENEWAL_THRESHOLD.min(lifetime / 2);
        self.expires_at.saturating_duration_since(now) <= threshold
    }
}

struct HeldNotify {
    sid: String,
    body: String,
    received_at: Instant,
}

#[derive(Default)]
struct Registry {
    routes: HashMap<String, Route>,
    held: VecDeque<HeldNotify>,
}

/// UPnP client bound to a single renderer
#[derive(Clone)]
pub struct UpnpClient {
    soap: SoapClient,
    config: Arc<ClientConfig>,
    registry: Arc<RwLock<Registry>>,
}

impl UpnpClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            soap: SoapClient::with_config(config.soap.clone()),
            config: Arc::new(config),
            registry: Arc::new(RwLock::new(Registry::default())),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Number of subscriptions with a registered handler
    pub fn active_subscriptions(&self) -> usize {
        self.registry.read().routes.len()
    }

    /// Time left before the device drops the subscription, if it is known
    pub fn expires_in(&self, handle: &SubscriptionHandle) -> Option<Duration> {
        self.registry
            .read()
            .routes
            .get(handle.sid())
            .map(|route| route.expires_at.saturating_duration_since(Instant::now()))
    }

    /// Deliver the body of a NOTIFY request received for `sid`
    ///
    /// Called by the HTTP endpoint advertised as the callback URL. The
    /// handler runs on the caller's thread.
    ///
    /// A device may send its initial NOTIFY before the SUBSCRIBE response has
    /// been processed. A body for an unknown SID is therefore held for a few
    /// seconds and delivered if a subscription with that SID is registered in
    /// the meantime; otherwise it is dropped.
    pub fn dispatch_notify(&self, sid: &str, body: &str) -> Result<()> {
        let route = {
            let mut guard = self.registry.write();
            let registry = &mut *guard;
            match registry.routes.get(sid) {
                Some(route) => Some((route.topic, Arc::clone(&route.handler))),
                None => {
                    hold(&mut registry.held, sid, body, Instant::now());
                    None
                }
            }
        };

        let Some((topic, handler)) = route else {
            tracing::debug!("Holding NOTIFY for unknown SID {}", sid);
            return Ok(());
        };

        let fields = parse_notify(body)?;
        tracing::trace!("NOTIFY {} ({}): {} field(s)", sid, topic, fields.len());
        handler(fields);
        Ok(())
    }

    /// Renew one subscription, returning the newly granted timeout
    pub async fn renew(&self, handle: &SubscriptionHandle) -> Result<u32> {
        if !self.registry.read().routes.contains_key(handle.sid()) {
            return Err(ApiError::SubscriptionError(format!(
                "No subscription for SID {}",
                handle.sid()
            )));
        }

        let soap = self.soap.clone();
        let event_url = self.config.event_url(handle.topic());
        let sid = handle.sid().to_string();
        let requested = self.config.subscription_timeout_secs();

        let granted = blocking(move || {
            soap.renew(&event_url, &sid, requested)
                .map_err(|e| ApiError::SubscriptionError(e.to_string()))
        })
        .await?;

        if let Some(route) = self.registry.write().routes.get_mut(handle.sid()) {
            route.timeout_seconds = granted;
            route.expires_at = Instant::now() + Duration::from_secs(u64::from(granted));
        }

        tracing::debug!("Renewed {} for {}s", handle, granted);
        Ok(granted)
    }

    /// Renew every subscription that is close to expiry
    ///
    /// Failures are returned per subscription; a subscription the device
    /// refuses to renew has to be subscribed again.
    pub async fn renew_due(&self) -> Vec<(SubscriptionHandle, Result<u32>)> {
        let due: Vec<SubscriptionHandle> = {
            let now = Instant::now();
            self.registry
                .read()
                .routes
                .iter()
                .filter(|(_, route)| route.needs_renewal(now))
                .map(|(sid, route)| SubscriptionHandle::new(route.topic, sid.clone()))
                .collect()
        };

        let mut results = Vec::with_capacity(due.len());
        for handle in due {
            let result = self.renew(&handle).await;
            if let Err(e) = &result {
                tracing::warn!("Failed to renew {}: {}", handle, e);
            }
            results.push((handle, result));
        }
        results
    }

    /// Install the route for a new subscription and flush any NOTIFY that
    /// arrived for it first
    fn register(&self, sid: &str, topic: Service, handler: EventHandler, timeout_seconds: u32) {
        let now = Instant::now();
        let early: Vec<String> = {
            let mut registry = self.registry.write();
            registry.routes.insert(
                sid.to_string(),
                Route {
                    topic,
                    handler: Arc::clone(&handler),
                    timeout_seconds,
                    expires_at: now + Duration::from_secs(u64::from(timeout_seconds)),
                },
            );
            take_held(&mut registry.held, sid, now)
        };

        for body in early {
            match parse_notify(&body) {
                Ok(fields) => handler(fields),
                Err(e) => tracing::warn!("Dropping early NOTIFY for {}: {}", sid, e),
            }
        }
    }
}

fn hold(held: &mut VecDeque<HeldNotify>, sid: &str, body: &str, now: Instant) {
    held.retain(|notify| now.duration_since(notify.received_at) < HELD_NOTIFY_TTL);
    if held.len() == HELD_NOTIFY_LIMIT {
        held.pop_front();
    }
    held.push_back(HeldNotify {
        sid: sid.to_string(),
        body: body.to_string(),
        received_at: now,
    });
}

/// Remove and return the fresh bodies held for `sid`, oldest first
fn take_held(held: &mut VecDeque<HeldNotify>, sid: &str, now: Instant) -> Vec<String> {
    let mut bodies = Vec::new();
    held.retain(|notify| {
        if notify.sid != sid {
            return true;
        }
        if now.duration_since(notify.received_at) < HELD_NOTIFY_TTL {
            bodies.push(notify.body.clone());
        }
        false
    });
    bodies
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::NetworkError(format!("Request task failed: {}", e)))?
}

#[async_trait]
impl ProtocolClient for UpnpClient {
    async fn subscribe(&self, topic: Service, handler: EventHandler) -> Result<SubscriptionHandle> {
        let soap = self.soap.clone();
        let event_url = self.config.event_url(topic);
        let callback_url = self.config.callback_url.clone();
        let timeout = self.config.subscription_timeout_secs();

        let response = blocking(move || {
            soap.subscribe(&event_url, &callback_url, timeout)
                .map_err(|e| ApiError::SubscriptionError(e.to_string()))
        })
        .await?;

        tracing::debug!(
            "Subscribed to {} with SID {} ({}s)",
            topic,
            response.sid,
            response.timeout_seconds
        );

        self.register(&response.sid, topic, handler, response.timeout_seconds);

        Ok(SubscriptionHandle::new(topic, response.sid))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        // The route goes first so late NOTIFYs are rejected even if the request fails
        if self.registry.write().routes.remove(handle.sid()).is_none() {
            tracing::warn!("Unsubscribing unknown subscription {}", handle);
        }

        let soap = self.soap.clone();
        let event_url = self.config.event_url(handle.topic());
        let sid = handle.sid().to_string();

        blocking(move || {
            soap.unsubscribe(&event_url, &sid)
                .map_err(|e| ApiError::SubscriptionError(e.to_string()))
        })
        .await
    }

    async fn call_action(&self, service: Service, action: &str, args: FieldMap) -> Result<FieldMap> {
        let soap = self.soap.clone();
        let control_url = self.config.control_url(service);
        let action = action.to_string();

        blocking(move || {
            soap.call(&control_url, service.info().service_uri, &action, args.as_slice())
                .map(FieldMap::from)
                .map_err(ApiError::from)
        })
        .await
    }
}
