use crate::{ThrottleError, ThrottleHook};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default)]
struct WindowState {
    remaining: i64,
    started: Option<Instant>,
}

/// Counts sends within a fixed window and makes callers wait once the
/// window's quota is used up.
///
/// Every admission decision, including the wait itself, runs under one
/// async mutex: at most one caller is ever sleeping for the window to
/// close, and the rest queue on the lock instead of all waking at the
/// window boundary and racing for the fresh quota. No fairness is
/// guaranteed beyond what the mutex provides.
pub struct WindowCounter {
    limit: i64,
    period: Duration,
    on_throttle: Option<ThrottleHook>,
    state: Mutex<WindowState>,
}

impl std::fmt::Debug for WindowCounter {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("WindowCounter")
            .field("limit", &self.limit)
            .field("period", &self.period)
            .field("has_hook", &self.on_throttle.is_some())
            .finish()
    }
}

impl WindowCounter {
    /// Build a counter admitting `limit` sends per `period`. A zero or
    /// negative `limit`, or a zero `period`, disables throttling and
    /// every admission passes straight through.
    pub fn new(limit: i64, period: Duration) -> Self {
        Self {
            limit,
            period,
            on_throttle: None,
            state: Mutex::new(WindowState::default()),
        }
    }

    /// Register the throttle hook.
    pub fn with_hook(mut self, hook: ThrottleHook) -> Self {
        self.on_throttle = Some(hook);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0 && !self.period.is_zero()
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Admit one send, waiting out the remainder of the window if the
    /// quota is already spent.
    ///
    /// A slot consumed by waiting is not refunded: when the wait ends in
    /// cancellation the next window still starts with one slot gone.
    /// Callers with cancellation-heavy workloads need to account for
    /// that when reasoning about effective throughput.
    pub async fn admit(&self, cancel: &CancellationToken) -> Result<(), ThrottleError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let mut state = self.state.lock().await;

        if cancel.is_cancelled() {
            return Err(ThrottleError::Cancelled);
        }

        let now = Instant::now();
        match state.started {
            None => state.remaining = self.limit,
            Some(started) if now.duration_since(started) > self.period => {
                state.remaining = self.limit;
                state.started = None;
            }
            Some(_) => {}
        }

        if state.remaining > 0 {
            state.remaining -= 1;
            state.started = Some(now);
            return Ok(());
        }

        // Quota spent: wait for the window to close. The lock stays held
        // so later callers line up behind this one.
        let started = state
            .started
            .expect("exhausted quota implies an active window");
        let wait = self.period.saturating_sub(now.duration_since(started));
        tracing::trace!("send window exhausted, waiting {wait:?}");

        let cancelled = tokio::select! {
            _ = tokio::time::sleep(wait) => cancel.is_cancelled(),
            _ = cancel.cancelled() => true,
        };

        // The wait opens the next window with one slot consumed, whether
        // or not the waiting caller is still there to use it.
        state.remaining = self.limit - 1;
        state.started = Some(Instant::now());

        if cancelled {
            return Err(ThrottleError::Cancelled);
        }

        if let Some(hook) = &self.on_throttle {
            hook()?;
        }

        Ok(())
    }

    /// Restore the full quota and clear the active window. The hook
    /// fires unless throttling is disabled, in which case this is a
    /// no-op.
    pub async fn reset(&self) -> Result<(), ThrottleError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let mut state = self.state.lock().await;
        state.remaining = self.limit;
        state.started = None;

        if let Some(hook) = &self.on_throttle {
            hook()?;
        }

        Ok(())
    }

    /// Produce an independent counter with the same policy. The current
    /// remaining quota carries over, but the copy has no active window
    /// and its own lock; admissions on one never block the other.
    pub async fn duplicate(&self) -> Self {
        let state = self.state.lock().await;
        Self {
            limit: self.limit,
            period: self.period,
            on_throttle: self.on_throttle.clone(),
            state: Mutex::new(WindowState {
                remaining: state.remaining,
                started: None,
            }),
        }
    }
}
