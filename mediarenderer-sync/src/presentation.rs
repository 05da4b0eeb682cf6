//! Render side of the presentation contract
//!
//! The presentation layer reads state through
//! [`RendererHandle`](crate::RendererHandle) and forwards intents through it.
//! To be told about updates it either watches the state channel or installs
//! a [`PresentationAdapter`].

use crate::cache::StateChange;

/// Receives every confirmed state change, in the order it was applied
///
/// Called from the controller task: implementations must return quickly and
/// must not block. A change is delivered each time it is applied, even if
/// the value did not differ from the cached one.
pub trait PresentationAdapter: Send + 'static {
    fn render(&mut self, change: &StateChange);
}

impl<F> PresentationAdapter for F
where
    F: FnMut(&StateChange) + Send + 'static,
{
    fn render(&mut self, change: &StateChange) {
        self(change)
    }
}
