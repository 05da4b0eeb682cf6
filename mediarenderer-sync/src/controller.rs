//! Lifecycle controller for one renderer
//!
//! A single task owns the state cache, the subscriptions and the lifecycle
//! state. [`RendererHandle`]s talk to it over a command channel; event
//! handlers, reconciliation pulls and action completions report back over a
//! notification channel. Network calls other than subscribe/unsubscribe are
//! spawned so the task keeps draining events while they are in flight.

use std::fmt;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;

use mediarenderer_api::{EventHandler, FieldMap, ProtocolClient, Service, SubscriptionHandle};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;

use crate::cache::{RendererState, StateCache, StateChange};
use crate::config::ControllerConfig;
use crate::error::{Result, SyncError};
use crate::identity::{DeviceDescription, DeviceIdentity};
use crate::invoker::ActionInvoker;
use crate::normalizer::{self, normalize};
use crate::presentation::PresentationAdapter;

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Built, nothing registered yet
    Created,
    /// Subscriptions registered
    Started,
    /// Reconciliation pulls in flight
    Reconciling,
    /// Device present and reconciled
    Active,
    /// Device announced its departure; subscriptions are kept
    Offline,
    /// Subscriptions released; terminal
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Started => "started",
            LifecycleState::Reconciling => "reconciling",
            LifecycleState::Active => "active",
            LifecycleState::Offline => "offline",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A control request coming from the presentation side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Play,
    Pause,
    SetVolume(u8),
    SetMute(bool),
}

impl Intent {
    async fn invoke(self, invoker: &ActionInvoker) -> Result<()> {
        match self {
            Intent::Play => invoker.play().await,
            Intent::Pause => invoker.pause().await,
            Intent::SetVolume(volume) => invoker.set_volume(volume).await,
            Intent::SetMute(muted) => invoker.set_mute(muted).await,
        }
    }

    /// Cache update implied by a successful call
    ///
    /// Only playback is applied on confirmation. Volume and mute wait for the
    /// device to publish the new value.
    fn confirmed_change(self) -> Option<StateChange> {
        match self {
            Intent::Play => Some(StateChange::Playing(true)),
            Intent::Pause => Some(StateChange::Playing(false)),
            Intent::SetVolume(_) | Intent::SetMute(_) => None,
        }
    }
}

/// Commands sent from handles to the controller task
enum Command {
    BindClient {
        client: Arc<dyn ProtocolClient>,
        ack: oneshot::Sender<()>,
    },
    Start(oneshot::Sender<()>),
    Alive(oneshot::Sender<()>),
    Bye(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
    UpdateDescription {
        description: DeviceDescription,
        ack: oneshot::Sender<()>,
    },
    Intent {
        intent: Intent,
        reply: oneshot::Sender<Result<()>>,
    },
    Invoker(oneshot::Sender<ActionInvoker>),
}

/// Result of one reconciliation pull
enum Pull {
    Mute(Result<bool>),
    Volume(Result<u8>),
    TransportState(Result<String>),
}

/// Messages produced off the controller task
enum Notification {
    Event {
        topic: Service,
        fields: FieldMap,
    },
    Pulled(Pull),
    IntentDone {
        intent: Intent,
        result: Result<()>,
        reply: oneshot::Sender<Result<()>>,
    },
}

struct ActiveSubscription {
    /// The client that created the subscription; it also releases it
    client: Arc<dyn ProtocolClient>,
    handle: SubscriptionHandle,
}

/// At most one subscription per topic
#[derive(Default)]
struct Subscriptions {
    rendering_control: Option<ActiveSubscription>,
    av_transport: Option<ActiveSubscription>,
}

impl Subscriptions {
    fn slot(&mut self, topic: Service) -> &mut Option<ActiveSubscription> {
        match topic {
            Service::RenderingControl => &mut self.rendering_control,
            Service::AVTransport => &mut self.av_transport,
        }
    }
}

/// Builder for a renderer controller
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use mediarenderer_api::{ClientConfig, UpnpClient};
/// use mediarenderer_sync::{DeviceDescription, DeviceIdentity, RendererController};
///
/// let identity = DeviceIdentity::new(usn, DeviceDescription::default());
/// let handle = RendererController::new(identity)
///     .with_client(Arc::new(UpnpClient::new(config)))
///     .with_presentation(|change: &mediarenderer_sync::StateChange| {
///         println!("{:?}", change);
///     })
///     .spawn();
///
/// handle.start().await?;
/// handle.on_alive().await?;
/// handle.request_play().await?;
/// ```
pub struct RendererController {
    identity: DeviceIdentity,
    config: ControllerConfig,
    client: Option<Arc<dyn ProtocolClient>>,
    adapter: Option<Box<dyn PresentationAdapter>>,
}

impl RendererController {
    pub fn new(identity: DeviceIdentity) -> Self {
        Self {
            identity,
            config: ControllerConfig::default(),
            client: None,
            adapter: None,
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind the protocol client up front; see also [`RendererHandle::bind_client`]
    pub fn with_client(mut self, client: Arc<dyn ProtocolClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_presentation(mut self, adapter: impl PresentationAdapter) -> Self {
        self.adapter = Some(Box::new(adapter));
        self
    }

    /// Spawn the controller task and return a handle to it
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn spawn(self) -> RendererHandle {
        let (command_tx, command_rx) = mpsc::channel(self.config.buffer_size());
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(RendererState::default());
        let (lifecycle_tx, lifecycle_rx) = watch::channel(LifecycleState::Created);
        let (identity_tx, identity_rx) = watch::channel(self.identity);

        let span = tracing::info_span!("renderer", device = %identity_tx.borrow().display_name());

        let worker = Worker {
            config: self.config,
            invoker: self.client.map(ActionInvoker::new).unwrap_or_default(),
            adapter: self.adapter,
            cache: StateCache::new(),
            subscriptions: Subscriptions::default(),
            lifecycle: LifecycleState::Created,
            outstanding_pulls: 0,
            notify_tx,
            state_tx,
            lifecycle_tx,
            identity_tx,
        };

        tokio::spawn(worker.run(command_rx, notify_rx).instrument(span));

        RendererHandle {
            commands: command_tx,
            state: state_rx,
            lifecycle: lifecycle_rx,
            identity: identity_rx,
        }
    }
}

/// State owned by the controller task
struct Worker {
    config: ControllerConfig,
    invoker: ActionInvoker,
    adapter: Option<Box<dyn PresentationAdapter>>,
    cache: StateCache,
    subscriptions: Subscriptions,
    lifecycle: LifecycleState,
    outstanding_pulls: usize,
    notify_tx: mpsc::UnboundedSender<Notification>,
    state_tx: watch::Sender<RendererState>,
    lifecycle_tx: watch::Sender<LifecycleState>,
    identity_tx: watch::Sender<DeviceIdentity>,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut notifications: mpsc::UnboundedReceiver<Notification>,
    ) {
        tracing::debug!("Renderer controller started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).await.is_break() {
                            break;
                        }
                    }
                    None => {
                        tracing::debug!("All handles dropped, stopping renderer controller");
                        self.stop().await;
                        break;
                    }
                },

                // The task holds a sender itself, so this never yields None
                Some(notification) = notifications.recv() => {
                    self.handle_notification(notification);
                }
            }
        }

        tracing::debug!("Renderer controller shut down");
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::BindClient { client, ack } => {
                tracing::debug!("Protocol client bound");
                self.invoker = ActionInvoker::new(client);
                let _ = ack.send(());
            }
            Command::Start(ack) => {
                self.start().await;
                let _ = ack.send(());
            }
            Command::Alive(ack) => {
                self.on_alive();
                let _ = ack.send(());
            }
            Command::Bye(ack) => {
                self.on_bye();
                let _ = ack.send(());
            }
            Command::UpdateDescription { description, ack } => {
                self.identity_tx
                    .send_modify(|identity| identity.update_description(description));
                let _ = ack.send(());
            }
            Command::Intent { intent, reply } => self.dispatch_intent(intent, reply),
            Command::Invoker(reply) => {
                let _ = reply.send(self.invoker.clone());
            }
            Command::Stop(ack) => {
                self.stop().await;
                let _ = ack.send(());
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    fn handle_notification(&mut self, notification: Notification) {
        match notification {
            Notification::Event { topic, fields } => {
                tracing::debug!("Event on {}: {} field(s)", topic, fields.len());
                for change in normalize(topic, &fields) {
                    self.commit(change);
                }
            }
            Notification::Pulled(pull) => self.apply_pull(pull),
            Notification::IntentDone {
                intent,
                result,
                reply,
            } => {
                match &result {
                    Ok(()) => {
                        if let Some(change) = intent.confirmed_change() {
                            self.commit(change);
                        }
                    }
                    Err(e) => tracing::warn!("{:?} failed: {}", intent, e),
                }
                let _ = reply.send(result);
            }
        }
    }

    async fn start(&mut self) {
        let client = match self.invoker.client() {
            Ok(client) => Some(Arc::clone(client)),
            Err(_) => {
                tracing::warn!("Starting without a protocol client; no subscriptions registered");
                None
            }
        };

        if let Some(client) = client {
            for topic in Service::ALL {
                if self.subscriptions.slot(topic).is_some() {
                    tracing::debug!("Already subscribed to {}", topic);
                    continue;
                }

                match client.subscribe(topic, self.event_handler(topic)).await {
                    Ok(handle) => {
                        tracing::debug!("Subscribed to {} ({})", topic, handle.sid());
                        *self.subscriptions.slot(topic) = Some(ActiveSubscription {
                            client: Arc::clone(&client),
                            handle,
                        });
                    }
                    Err(e) => tracing::warn!("Failed to subscribe to {}: {}", topic, e),
                }
            }
        }

        if self.lifecycle == LifecycleState::Created {
            self.set_lifecycle(LifecycleState::Started);
        }

        if self.config.reconcile_on_start {
            self.reconcile();
        }
    }

    fn on_alive(&mut self) {
        match self.lifecycle {
            LifecycleState::Created => {
                tracing::debug!("Ignoring alive announcement before start");
            }
            LifecycleState::Stopped => {}
            _ => self.reconcile(),
        }
    }

    fn on_bye(&mut self) {
        match self.lifecycle {
            LifecycleState::Created | LifecycleState::Stopped => {
                tracing::debug!("Ignoring bye announcement in {} state", self.lifecycle);
            }
            _ => {
                self.commit(StateChange::Playing(false));
                self.set_lifecycle(LifecycleState::Offline);
            }
        }
    }

    async fn stop(&mut self) {
        if self.lifecycle == LifecycleState::Stopped {
            return;
        }

        for topic in Service::ALL {
            if let Some(subscription) = self.subscriptions.slot(topic).take() {
                let ActiveSubscription { client, handle } = subscription;
                tracing::debug!("Unsubscribing from {}", handle);
                if let Err(e) = client.unsubscribe(handle).await {
                    tracing::warn!("Failed to unsubscribe from {}: {}", topic, e);
                }
            }
        }

        self.set_lifecycle(LifecycleState::Stopped);
    }

    /// Pull mute, volume and transport state in parallel
    fn reconcile(&mut self) {
        tracing::debug!("Reconciling renderer state");
        self.set_lifecycle(LifecycleState::Reconciling);
        self.outstanding_pulls += 3;

        let invoker = self.invoker.clone();
        self.spawn_pull(async move { Pull::Mute(invoker.get_mute().await) });

        let invoker = self.invoker.clone();
        self.spawn_pull(async move { Pull::Volume(invoker.get_volume().await) });

        let invoker = self.invoker.clone();
        self.spawn_pull(async move { Pull::TransportState(invoker.get_transport_state().await) });
    }

    fn spawn_pull<F>(&self, pull: F)
    where
        F: Future<Output = Pull> + Send + 'static,
    {
        let notify_tx = self.notify_tx.clone();
        tokio::spawn(async move {
            let _ = notify_tx.send(Notification::Pulled(pull.await));
        });
    }

    fn apply_pull(&mut self, pull: Pull) {
        match pull {
            Pull::Mute(Ok(muted)) => self.commit(StateChange::Mute(muted)),
            Pull::Volume(Ok(volume)) => self.commit(StateChange::Volume(volume)),
            Pull::TransportState(Ok(state)) => {
                tracing::info!("Playback state changed: {}", state);
                self.commit(StateChange::Playing(normalizer::is_playing(&state)));
            }
            Pull::Mute(Err(e)) => tracing::warn!("Failed to get mute: {}", e),
            Pull::Volume(Err(e)) => tracing::warn!("Failed to get volume: {}", e),
            Pull::TransportState(Err(e)) => tracing::warn!("Failed to get transport state: {}", e),
        }

        self.outstanding_pulls = self.outstanding_pulls.saturating_sub(1);
        if self.outstanding_pulls == 0 && self.lifecycle == LifecycleState::Reconciling {
            self.set_lifecycle(LifecycleState::Active);
        }
    }

    fn dispatch_intent(&self, intent: Intent, reply: oneshot::Sender<Result<()>>) {
        if !self.invoker.is_bound() {
            let _ = reply.send(Err(SyncError::NotInitialized));
            return;
        }

        let invoker = self.invoker.clone();
        let notify_tx = self.notify_tx.clone();
        tokio::spawn(async move {
            let result = intent.invoke(&invoker).await;
            let done = Notification::IntentDone {
                intent,
                result,
                reply,
            };
            // Controller gone: answer the caller directly
            if let Err(mpsc::error::SendError(Notification::IntentDone { result, reply, .. })) =
                notify_tx.send(done)
            {
                let _ = reply.send(result);
            }
        });
    }

    fn event_handler(&self, topic: Service) -> EventHandler {
        let notify_tx = self.notify_tx.clone();
        Arc::new(move |fields: FieldMap| {
            let _ = notify_tx.send(Notification::Event { topic, fields });
        })
    }

    /// Apply a confirmed change and notify every observer
    fn commit(&mut self, change: StateChange) {
        tracing::debug!("Applying {:?}", change);
        self.cache.apply(change);
        self.state_tx.send_replace(self.cache.snapshot());
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.render(&change);
        }
    }

    fn set_lifecycle(&mut self, lifecycle: LifecycleState) {
        if self.lifecycle != lifecycle {
            tracing::debug!("Lifecycle {} -> {}", self.lifecycle, lifecycle);
        }
        self.lifecycle = lifecycle;
        self.lifecycle_tx.send_replace(lifecycle);
    }
}

/// Cloneable handle to a running renderer controller
///
/// Reads are served from the last published snapshot and never wait on the
/// controller task. Everything else is a message to the task.
#[derive(Clone)]
pub struct RendererHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<RendererState>,
    lifecycle: watch::Receiver<LifecycleState>,
    identity: watch::Receiver<DeviceIdentity>,
}

impl RendererHandle {
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| SyncError::ControllerClosed)?;
        rx.await.map_err(|_| SyncError::ControllerClosed)
    }

    async fn intent(&self, intent: Intent) -> Result<()> {
        self.request(|reply| Command::Intent { intent, reply }).await?
    }

    async fn invoker(&self) -> Result<ActionInvoker> {
        self.request(Command::Invoker).await
    }

    /// Bind or replace the protocol client
    ///
    /// Existing subscriptions stay with the client that created them.
    pub async fn bind_client(&self, client: Arc<dyn ProtocolClient>) -> Result<()> {
        self.request(|ack| Command::BindClient { client, ack }).await
    }

    /// Register the RenderingControl and AVTransport subscriptions
    ///
    /// Topics that already have a subscription are skipped. Subscription
    /// failures are logged, not returned.
    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await
    }

    /// The device announced itself: pull mute, volume and transport state
    ///
    /// Returns once the pulls are issued; each result lands in the cache as it
    /// arrives.
    pub async fn on_alive(&self) -> Result<()> {
        self.request(Command::Alive).await
    }

    /// The device announced its departure: mark it as not playing
    pub async fn on_bye(&self) -> Result<()> {
        self.request(Command::Bye).await
    }

    /// Release the subscriptions and shut the controller down
    ///
    /// Safe to call more than once and before [`start`](Self::start).
    pub async fn stop(&self) -> Result<()> {
        match self.request(Command::Stop).await {
            Err(SyncError::ControllerClosed) => Ok(()),
            other => other,
        }
    }

    /// Merge re-supplied description fields into the device identity
    pub async fn update_description(&self, description: DeviceDescription) -> Result<()> {
        self.request(|ack| Command::UpdateDescription { description, ack })
            .await
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().is_playing
    }

    pub fn volume(&self) -> u8 {
        self.state.borrow().volume
    }

    pub fn mute(&self) -> bool {
        self.state.borrow().mute
    }

    pub fn state(&self) -> RendererState {
        *self.state.borrow()
    }

    /// Receiver notified on every applied change, including repeats
    pub fn watch(&self) -> watch::Receiver<RendererState> {
        self.state.clone()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        *self.lifecycle.borrow()
    }

    pub fn watch_lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.clone()
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity.borrow().clone()
    }

    /// Send Play; on success the cache is marked as playing
    pub async fn request_play(&self) -> Result<()> {
        self.intent(Intent::Play).await
    }

    /// Send Pause; on success the cache is marked as not playing
    pub async fn request_pause(&self) -> Result<()> {
        self.intent(Intent::Pause).await
    }

    /// Send SetVolume; the cache follows the next RenderingControl event
    pub async fn request_set_volume(&self, volume: u8) -> Result<()> {
        self.intent(Intent::SetVolume(volume)).await
    }

    /// Send SetMute; the cache follows the next RenderingControl event
    pub async fn request_set_mute(&self, muted: bool) -> Result<()> {
        self.intent(Intent::SetMute(muted)).await
    }

    /// Query the device's mute state without touching the cache
    pub async fn fetch_mute(&self) -> Result<bool> {
        self.invoker().await?.get_mute().await
    }

    /// Query the device's volume without touching the cache
    pub async fn fetch_volume(&self) -> Result<u8> {
        self.invoker().await?.get_volume().await
    }

    /// Query the raw transport state without touching the cache
    pub async fn fetch_transport_state(&self) -> Result<String> {
        self.invoker().await?.get_transport_state().await
    }
}
