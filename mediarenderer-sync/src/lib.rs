//! State synchronization between a UPnP MediaRenderer and an accessory model
//!
//! One [`RendererController`] per device keeps a cached view of
//! `is_playing`, `volume` and `mute` in step with the device through three
//! channels:
//!
//! - push events from the RenderingControl and AVTransport subscriptions
//! - a reconciliation pull whenever the device announces itself
//! - confirmed play/pause actions issued by the presentation side
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mediarenderer_api::{ClientConfig, UpnpClient};
//! use mediarenderer_sync::{DeviceDescription, DeviceIdentity, RendererController};
//!
//! let client = Arc::new(UpnpClient::new(ClientConfig::new(base_url, callback_url)));
//! let handle = RendererController::new(DeviceIdentity::new(usn, DeviceDescription::default()))
//!     .with_client(client)
//!     .spawn();
//!
//! handle.start().await?;
//! handle.on_alive().await?;
//!
//! let mut state = handle.watch();
//! while state.changed().await.is_ok() {
//!     println!("{:?}", *state.borrow());
//! }
//! ```

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod identity;
pub mod invoker;
pub mod logging;
pub mod normalizer;
pub mod presentation;

pub use cache::{RendererState, StateCache, StateChange};
pub use config::ControllerConfig;
pub use controller::{Intent, LifecycleState, RendererController, RendererHandle};
pub use error::{Result, SyncError};
pub use identity::{DeviceDescription, DeviceIdentity};
pub use invoker::ActionInvoker;
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use normalizer::normalize;
pub use presentation::PresentationAdapter;

// Re-export the protocol surface so embedders need a single dependency
pub use mediarenderer_api::{ApiError, FieldMap, ProtocolClient, Service, SubscriptionHandle};
