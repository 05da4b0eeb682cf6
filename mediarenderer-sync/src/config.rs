//! Configuration types for the renderer controller

/// Configuration for a [`RendererController`](crate::RendererController)
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Capacity of the command channel between handles and the controller task
    /// Default: 32
    pub command_buffer_size: usize,

    /// Run a reconciliation right after a successful `start()`
    ///
    /// For renderers that are already known to be reachable when the
    /// controller starts and will not announce themselves again.
    /// Default: false
    pub reconcile_on_start: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 32,
            reconcile_on_start: false,
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reconcile_on_start(mut self, enabled: bool) -> Self {
        self.reconcile_on_start = enabled;
        self
    }

    pub(crate) fn buffer_size(&self) -> usize {
        // tokio panics on a zero-capacity channel
        self.command_buffer_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::new();
        assert_eq!(config.command_buffer_size, 32);
        assert!(!config.reconcile_on_start);
        assert!(config.with_reconcile_on_start(true).reconcile_on_start);
    }

    #[test]
    fn test_zero_buffer_is_clamped() {
        let config = ControllerConfig {
            command_buffer_size: 0,
            ..Default::default()
        };
        assert_eq!(config.buffer_size(), 1);
    }
}
