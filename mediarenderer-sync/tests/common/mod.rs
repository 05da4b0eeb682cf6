//! Recording protocol client for exercising the controller without a device
//!
//! `FakeClient` records every subscribe, unsubscribe and action call, answers
//! actions from a configurable response table and can hold an action until
//! the test releases it.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mediarenderer_api::{
    ApiError, EventHandler, FieldMap, ProtocolClient, Result, Service, SubscriptionHandle,
};
use mediarenderer_sync::{
    DeviceDescription, DeviceIdentity, LifecycleState, RendererController, RendererHandle,
    RendererState, StateChange,
};
use tokio::sync::Notify;

pub const TIMEOUT: Duration = Duration::from_secs(2);

/// One recorded `call_action`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub service: Service,
    pub action: String,
    pub args: FieldMap,
}

#[derive(Default)]
pub struct FakeClient {
    subscribed: Mutex<Vec<SubscriptionHandle>>,
    unsubscribed: Mutex<Vec<SubscriptionHandle>>,
    calls: Mutex<Vec<RecordedCall>>,
    handlers: Mutex<HashMap<Service, EventHandler>>,
    responses: Mutex<HashMap<String, Result<FieldMap>>>,
    failing_topics: Mutex<HashSet<Service>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    next_sid: AtomicU32,
}

impl FakeClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `action` with the given result fields
    pub fn respond(&self, action: &str, fields: &[(&str, &str)]) {
        self.responses
            .lock()
            .unwrap()
            .insert(action.to_string(), Ok(fields.iter().copied().collect()));
    }

    /// Fail every call to `action` with `error`
    pub fn fail(&self, action: &str, error: ApiError) {
        self.responses
            .lock()
            .unwrap()
            .insert(action.to_string(), Err(error));
    }

    pub fn fail_subscribe(&self, topic: Service) {
        self.failing_topics.lock().unwrap().insert(topic);
    }

    /// Hold calls to `action` until the returned gate is notified
    pub fn gate(&self, action: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(action.to_string(), Arc::clone(&gate));
        gate
    }

    /// Deliver an event to the handler registered for `topic`
    ///
    /// Returns false when nothing is subscribed to the topic.
    pub fn emit(&self, topic: Service, fields: &[(&str, &str)]) -> bool {
        let handler = self.handlers.lock().unwrap().get(&topic).cloned();
        match handler {
            Some(handler) => {
                handler(fields.iter().copied().collect());
                true
            }
            None => false,
        }
    }

    pub fn subscribed(&self) -> Vec<SubscriptionHandle> {
        self.subscribed.lock().unwrap().clone()
    }

    pub fn subscribed_topics(&self) -> Vec<Service> {
        self.subscribed().iter().map(|h| h.topic()).collect()
    }

    pub fn unsubscribed(&self) -> Vec<SubscriptionHandle> {
        self.unsubscribed.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.action).collect()
    }
}

#[async_trait]
impl ProtocolClient for FakeClient {
    async fn subscribe(&self, topic: Service, handler: EventHandler) -> Result<SubscriptionHandle> {
        if self.failing_topics.lock().unwrap().contains(&topic) {
            return Err(ApiError::SubscriptionError(format!("{} refused", topic)));
        }

        let sid = format!("uuid:sub-{}", self.next_sid.fetch_add(1, Ordering::Relaxed));
        let handle = SubscriptionHandle::new(topic, sid);
        self.handlers.lock().unwrap().insert(topic, handler);
        self.subscribed.lock().unwrap().push(handle.clone());
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        self.handlers.lock().unwrap().remove(&handle.topic());
        self.unsubscribed.lock().unwrap().push(handle);
        Ok(())
    }

    async fn call_action(&self, service: Service, action: &str, args: FieldMap) -> Result<FieldMap> {
        self.calls.lock().unwrap().push(RecordedCall {
            service,
            action: action.to_string(),
            args,
        });

        let gate = self.gates.lock().unwrap().get(action).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.responses
            .lock()
            .unwrap()
            .get(action)
            .cloned()
            .unwrap_or_else(|| Ok(FieldMap::new()))
    }
}

pub fn identity() -> DeviceIdentity {
    DeviceIdentity::new(
        "uuid:renderer-1::urn:schemas-upnp-org:device:MediaRenderer:1",
        DeviceDescription {
            friendly_name: Some("Living Room".to_string()),
            ..Default::default()
        },
    )
}

pub fn spawn_with(client: &Arc<FakeClient>) -> RendererHandle {
    RendererController::new(identity())
        .with_client(Arc::clone(client) as Arc<dyn ProtocolClient>)
        .spawn()
}

/// Spawn a controller whose presentation adapter records every change
pub fn spawn_recording(client: &Arc<FakeClient>) -> (RendererHandle, Arc<Mutex<Vec<StateChange>>>) {
    let rendered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&rendered);
    let handle = RendererController::new(identity())
        .with_client(Arc::clone(client) as Arc<dyn ProtocolClient>)
        .with_presentation(move |change: &StateChange| sink.lock().unwrap().push(*change))
        .spawn();
    (handle, rendered)
}

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(TIMEOUT, future)
        .await
        .expect("timed out waiting for the controller")
}

pub async fn wait_for_state(handle: &RendererHandle, predicate: impl FnMut(&RendererState) -> bool) {
    let mut state = handle.watch();
    within(state.wait_for(predicate))
        .await
        .expect("controller dropped its state channel");
}

pub async fn wait_for_lifecycle(handle: &RendererHandle, lifecycle: LifecycleState) {
    let mut rx = handle.watch_lifecycle();
    within(rx.wait_for(|current| *current == lifecycle))
        .await
        .expect("controller dropped its lifecycle channel");
}

/// Poll until `condition` holds; for effects that publish nothing
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    within(async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}
