//! Event normalizer - converts raw event fields to typed state changes
//!
//! Events carry only the variables that changed, as strings. Each recognized
//! field is parsed on its own: a malformed value is logged and skipped while
//! the rest of the event still applies.

use mediarenderer_api::{FieldMap, Service};

use crate::cache::StateChange;
use crate::error::{Result, SyncError};

pub const VOLUME: &str = "Volume";
pub const MUTE: &str = "Mute";
pub const TRANSPORT_STATE: &str = "TransportState";

/// The only transport state modeled as playing
pub const PLAYING: &str = "PLAYING";

/// Decode one event received on `topic`
pub fn normalize(topic: Service, fields: &FieldMap) -> Vec<StateChange> {
    match topic {
        Service::RenderingControl => normalize_rendering_control(fields),
        Service::AVTransport => normalize_transport(fields),
    }
}

fn normalize_rendering_control(fields: &FieldMap) -> Vec<StateChange> {
    let mut changes = Vec::new();

    // Empty values carry no information, same as an absent field
    if let Some(raw) = fields.get(VOLUME).filter(|v| !v.is_empty()) {
        match parse_volume(raw) {
            Ok(volume) => changes.push(StateChange::Volume(volume)),
            Err(e) => tracing::warn!("Skipping event field: {}", e),
        }
    }

    if let Some(raw) = fields.get(MUTE).filter(|v| !v.is_empty()) {
        changes.push(StateChange::Mute(parse_mute(raw)));
    }

    changes
}

fn normalize_transport(fields: &FieldMap) -> Vec<StateChange> {
    match fields.get(TRANSPORT_STATE) {
        Some(state) => {
            tracing::info!("Playback state changed: {}", state);
            vec![StateChange::Playing(is_playing(state))]
        }
        None => vec![],
    }
}

/// Parse an absolute volume; anything but an integer in 0-100 is rejected
pub fn parse_volume(raw: &str) -> Result<u8> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SyncError::parse(VOLUME, raw, "not an integer"))?;

    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or_else(|| SyncError::parse(VOLUME, raw, "out of range [0, 100]"))
}

/// Coerce to an integer first, then to a boolean: nonzero is `true`
///
/// Integer coercion reads an optional sign, an optional `0x`/`0X` hex prefix
/// and the leading digits of that radix, ignoring whatever follows. A value
/// without leading digits has no numeric value and is therefore `false`; in
/// particular `"true"` and a bare `"0x"` are not muted.
pub fn parse_mute(raw: &str) -> bool {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    let (digits, radix) = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (unsigned, 10),
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());

    digits[..end].bytes().any(|b| b != b'0')
}

/// Case-sensitive: only the exact string `PLAYING` counts
pub fn is_playing(transport_state: &str) -> bool {
    transport_state == PLAYING
}
