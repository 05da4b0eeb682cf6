//! The control actions the bridge invokes, with their exact wire arguments
//!
//! `InstanceID` is always `0` and `Channel` is always `Master`; renderers
//! reject requests that deviate from their declared argument lists, so these
//! are constants rather than parameters.

use crate::{ApiError, FieldMap, Result, Service};

pub const INSTANCE_ID: &str = "0";
pub const MASTER_CHANNEL: &str = "Master";

/// Result field of `GetTransportInfo`
pub const CURRENT_TRANSPORT_STATE: &str = "CurrentTransportState";
/// Result field of `GetMute`
pub const CURRENT_MUTE: &str = "CurrentMute";
/// Result field of `GetVolume`
pub const CURRENT_VOLUME: &str = "CurrentVolume";

/// A fully-built action invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub service: Service,
    pub name: &'static str,
    pub args: FieldMap,
}

impl Action {
    fn transport(name: &'static str) -> Self {
        Self {
            service: Service::AVTransport,
            name,
            args: FieldMap::new().with("InstanceID", INSTANCE_ID),
        }
    }

    fn rendering(name: &'static str) -> Self {
        Self {
            service: Service::RenderingControl,
            name,
            args: FieldMap::new()
                .with("InstanceID", INSTANCE_ID)
                .with("Channel", MASTER_CHANNEL),
        }
    }
}

pub fn play() -> Action {
    let mut action = Action::transport("Play");
    action.args.insert("Speed", "1");
    action
}

pub fn pause() -> Action {
    Action::transport("Pause")
}

pub fn get_transport_info() -> Action {
    Action::transport("GetTransportInfo")
}

pub fn get_mute() -> Action {
    Action::rendering("GetMute")
}

pub fn get_volume() -> Action {
    Action::rendering("GetVolume")
}

pub fn set_mute(muted: bool) -> Action {
    let mut action = Action::rendering("SetMute");
    action.args.insert("DesiredMute", if muted { "1" } else { "0" });
    action
}

/// Build a `SetVolume` action, rejecting values above 100 before anything is sent
pub fn set_volume(volume: u8) -> Result<Action> {
    if volume > 100 {
        return Err(ApiError::InvalidParameter(format!(
            "Parameter 'desired_volume' value {} is out of range [0, 100]",
            volume
        )));
    }

    let mut action = Action::rendering("SetVolume");
    action.args.insert("DesiredVolume", volume.to_string());
    Ok(action)
}
