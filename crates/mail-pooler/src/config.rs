use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use throttle_window::{ThrottleHook, WindowCounter};

/// Throttling policy for a dispatch pooler.
///
/// A `max_send` of zero (or below) or a zero `wait` disables throttling
/// and sends pass straight through to the transport.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct PoolerConfig {
    /// Number of sends permitted within each window.
    #[serde(default)]
    pub max_send: i64,

    /// Length of the window.
    #[serde(default, with = "humantime_serde")]
    pub wait: Duration,

    #[serde(skip)]
    pub on_throttle: Option<ThrottleHook>,
}

impl std::fmt::Debug for PoolerConfig {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("PoolerConfig")
            .field("max_send", &self.max_send)
            .field("wait", &self.wait)
            .field("has_hook", &self.on_throttle.is_some())
            .finish()
    }
}

impl PoolerConfig {
    /// Register the hook fired on every wait-for-window event and on
    /// explicit resets. The hook cannot come from deserialized data, so
    /// it is attached here after parsing the policy.
    pub fn set_throttle_hook<F>(&mut self, hook: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_throttle = Some(Arc::new(hook));
    }

    pub fn throttle_hook(&self) -> Option<ThrottleHook> {
        self.on_throttle.clone()
    }

    /// Build the admission counter described by this policy.
    pub fn window(&self) -> WindowCounter {
        let counter = WindowCounter::new(self.max_send, self.wait);
        match self.throttle_hook() {
            Some(hook) => counter.with_hook(hook),
            None => counter,
        }
    }
}
