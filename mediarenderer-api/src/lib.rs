//! Protocol surface of a UPnP MediaRenderer
//!
//! This crate defines the [`ProtocolClient`] contract the sync layer is
//! written against, the exact actions it invokes, and [`UpnpClient`], an
//! implementation over the private `soap-client` crate.
//!
//! ```rust,ignore
//! use mediarenderer_api::{actions, ClientConfig, ProtocolClient, UpnpClient};
//!
//! let client = UpnpClient::new(ClientConfig::new(
//!     "http://192.168.1.20:49152",
//!     "http://192.168.1.2:3400/notify",
//! ));
//!
//! let action = actions::get_volume();
//! let result = client.call_action(action.service, action.name, action.args).await?;
//! println!("volume: {:?}", result.get(actions::CURRENT_VOLUME));
//! ```

pub mod actions;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod fields;
pub mod service;
pub mod upnp;

pub use actions::Action;
pub use client::{EventHandler, ProtocolClient, SubscriptionHandle};
pub use config::{ClientConfig, ServiceEndpoints};
pub use error::{ApiError, Result};
pub use fields::FieldMap;
pub use service::{Service, ServiceInfo};
pub use upnp::UpnpClient;
