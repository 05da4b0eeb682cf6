//! Outbound control actions
//!
//! Every operation is a single `call_action` round trip. The invoker never
//! touches the state cache: deciding what a confirmed result means for the
//! cache is the controller's job.

use std::sync::Arc;

use mediarenderer_api::actions::{self, Action};
use mediarenderer_api::{FieldMap, ProtocolClient};

use crate::error::{Result, SyncError};
use crate::normalizer::{parse_mute, parse_volume};

/// Wraps the (optional) protocol client bound to a renderer
#[derive(Clone, Default)]
pub struct ActionInvoker {
    client: Option<Arc<dyn ProtocolClient>>,
}

impl ActionInvoker {
    pub fn new(client: Arc<dyn ProtocolClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// An invoker with no client; every call fails with `NotInitialized`
    pub fn unbound() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.client.is_some()
    }

    pub(crate) fn client(&self) -> Result<&Arc<dyn ProtocolClient>> {
        self.client.as_ref().ok_or(SyncError::NotInitialized)
    }

    async fn invoke(&self, action: Action) -> Result<FieldMap> {
        let client = self.client()?;
        tracing::debug!("Invoking {}#{}", action.service, action.name);
        Ok(client
            .call_action(action.service, action.name, action.args)
            .await?)
    }

    pub async fn play(&self) -> Result<()> {
        self.invoke(actions::play()).await.map(drop)
    }

    pub async fn pause(&self) -> Result<()> {
        self.invoke(actions::pause()).await.map(drop)
    }

    /// Raw `CurrentTransportState` reported by the device
    pub async fn get_transport_state(&self) -> Result<String> {
        let result = self.invoke(actions::get_transport_info()).await?;
        result
            .get(actions::CURRENT_TRANSPORT_STATE)
            .map(str::to_string)
            .ok_or_else(|| {
                SyncError::parse(actions::CURRENT_TRANSPORT_STATE, "", "missing from response")
            })
    }

    pub async fn get_mute(&self) -> Result<bool> {
        let result = self.invoke(actions::get_mute()).await?;
        let raw = result
            .get(actions::CURRENT_MUTE)
            .ok_or_else(|| SyncError::parse(actions::CURRENT_MUTE, "", "missing from response"))?;
        Ok(parse_mute(raw))
    }

    pub async fn get_volume(&self) -> Result<u8> {
        let result = self.invoke(actions::get_volume()).await?;
        let raw = result.get(actions::CURRENT_VOLUME).ok_or_else(|| {
            SyncError::parse(actions::CURRENT_VOLUME, "", "missing from response")
        })?;
        parse_volume(raw)
    }

    /// Fire-and-forget as far as the cache goes: the next event carries the value
    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        self.invoke(actions::set_mute(muted)).await.map(drop)
    }

    /// Fire-and-forget as far as the cache goes: the next event carries the value
    pub async fn set_volume(&self, volume: u8) -> Result<()> {
        self.client()?;
        let action = actions::set_volume(volume).map_err(SyncError::local)?;
        self.invoke(action).await.map(drop)
    }
}
