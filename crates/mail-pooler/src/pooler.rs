use crate::{PoolerConfig, TlsOptions, Transport};
use thiserror::Error;
use throttle_window::{ThrottleError, WindowCounter};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum PoolerError {
    /// No transport has been configured, or it has been closed.
    #[error("transport parameters are empty: no client configured")]
    NotConfigured,
    #[error(transparent)]
    Throttle(#[from] ThrottleError),
    /// Surfaced verbatim from the transport.
    #[error(transparent)]
    Transport(anyhow::Error),
}

impl PoolerError {
    /// True when the error came from the caller's own cancellation token
    /// rather than from the transport or the throttle hook.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Throttle(ThrottleError::Cancelled))
    }
}

struct Inner<T: Transport> {
    transport: Option<T>,
    config: Option<T::Config>,
    tls: Option<TlsOptions>,
}

/// Rate-limited dispatch pooler: every send is admitted by a
/// [`WindowCounter`] before it reaches the transport.
///
/// A pooler is safe to share across tasks; sends serialize on the
/// transport after admission. Workers that want their own connection and
/// quota take a [`Pooler::duplicate`] instead of sharing one instance.
pub struct Pooler<T: Transport> {
    window: WindowCounter,
    inner: Mutex<Inner<T>>,
}

impl<T: Transport> Pooler<T> {
    /// Build a pooler over an optional existing transport handle.
    /// Without one, quota operations still work but send and check fail
    /// until [`Pooler::update_config`] installs a handle.
    pub fn new(config: &PoolerConfig, transport: Option<T>) -> Self {
        Self {
            window: config.window(),
            inner: Mutex::new(Inner {
                transport,
                config: None,
                tls: None,
            }),
        }
    }

    /// Deliver one message, waiting for window admission first. A
    /// cancellation or hook error from admission is returned without
    /// touching the transport.
    pub async fn send(
        &self,
        cancel: &CancellationToken,
        from: &str,
        recipients: &[String],
        data: &[u8],
    ) -> Result<(), PoolerError> {
        self.window.admit(cancel).await?;

        let mut inner = self.inner.lock().await;
        match inner.transport.as_mut() {
            Some(transport) => transport
                .send(cancel, from, recipients, data)
                .await
                .map_err(PoolerError::Transport),
            None => Err(PoolerError::NotConfigured),
        }
    }

    /// Probe the transport for liveness. Health checks do not consume
    /// send quota.
    pub async fn check(&self, cancel: &CancellationToken) -> Result<(), PoolerError> {
        let mut inner = self.inner.lock().await;
        match inner.transport.as_mut() {
            Some(transport) => transport
                .check(cancel)
                .await
                .map_err(PoolerError::Transport),
            None => Err(PoolerError::NotConfigured),
        }
    }

    /// Hand out an independent duplicate of the underlying handle for
    /// direct use outside the pooler's throttling.
    pub async fn client(&self) -> Result<T, PoolerError> {
        let inner = self.inner.lock().await;
        inner
            .transport
            .as_ref()
            .map(Transport::duplicate)
            .ok_or(PoolerError::NotConfigured)
    }

    /// Restore the full send quota immediately.
    pub async fn reset(&self) -> Result<(), PoolerError> {
        Ok(self.window.reset().await?)
    }

    /// Produce an independent pooler: the same throttling policy with
    /// the remaining quota carried over and no active window, and a
    /// duplicated transport handle so the two never share a connection.
    /// Mirrors the source's configured/unconfigured state at call time.
    pub async fn duplicate(&self) -> Self {
        let window = self.window.duplicate().await;
        let inner = self.inner.lock().await;
        Self {
            window,
            inner: Mutex::new(Inner {
                transport: inner.transport.as_ref().map(Transport::duplicate),
                config: inner.config.clone(),
                tls: inner.tls.clone(),
            }),
        }
    }

    /// Install fresh connection parameters, building a new handle and
    /// closing any previous one so its connection is not leaked.
    pub async fn update_config(&self, config: T::Config, tls: Option<TlsOptions>) {
        let mut inner = self.inner.lock().await;
        if let Some(mut previous) = inner.transport.take() {
            if let Err(err) = previous.close().await {
                tracing::debug!("error closing replaced transport: {err:#}");
            }
        }
        inner.transport = Some(T::configure(&config, tls.as_ref()));
        inner.config = Some(config);
        inner.tls = tls;
    }

    /// Release the transport handle. Best-effort and idempotent: close
    /// failures are logged, never surfaced, and calling this on an
    /// already-closed pooler does nothing.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(mut transport) = inner.transport.take() {
            if let Err(err) = transport.close().await {
                tracing::debug!("error closing transport: {err:#}");
            }
        }
    }
}
