//! The authoritative in-process view of renderer state

use serde::{Deserialize, Serialize};

/// A single confirmed field update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    Playing(bool),
    Volume(u8),
    Mute(bool),
}

/// Snapshot of the cached fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererState {
    pub is_playing: bool,
    /// 0-100
    pub volume: u8,
    pub mute: bool,
}

/// Cache of confirmed values
///
/// Only the controller task holds one. Fields are independent: applying a
/// change touches exactly one field and never inspects the others, so updates
/// from different sources can land in any order.
#[derive(Debug, Default)]
pub struct StateCache {
    state: RendererState,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a change unconditionally; no change suppression
    pub fn apply(&mut self, change: StateChange) {
        match change {
            StateChange::Playing(playing) => self.state.is_playing = playing,
            StateChange::Volume(volume) => self.state.volume = volume,
            StateChange::Mute(muted) => self.state.mute = muted,
        }
    }

    pub fn snapshot(&self) -> RendererState {
        self.state
    }
}
