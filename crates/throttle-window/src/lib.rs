//! This crate implements a fixed-window admission throttle for outbound
//! senders: at most `limit` operations are admitted per window of `period`,
//! and once the quota is spent the caller waits until the window closes.
//! The state is in-memory and instance-scoped; senders that need separate
//! quotas duplicate the counter rather than share it.
use std::sync::Arc;
use thiserror::Error;

mod window;

pub use window::WindowCounter;

/// Fired whenever a sender is made to wait for the next window, and on
/// explicit resets. Runs synchronously inside the admission critical
/// section, so it must be fast and non-blocking.
pub type ThrottleHook = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

#[derive(Error, Debug)]
pub enum ThrottleError {
    /// The caller's cancellation token fired before or during the
    /// admission wait.
    #[error("cancelled while waiting for the send window")]
    Cancelled,
    /// Error returned by the registered throttle hook.
    #[error(transparent)]
    Hook(#[from] anyhow::Error),
}
