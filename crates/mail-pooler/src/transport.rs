use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Optional TLS material handed to [`Transport::configure`].
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Skip certificate verification.
    pub insecure: bool,
    /// Verify the certificate against this name instead of the
    /// connection hostname.
    pub alt_name: Option<String>,
}

/// The outbound capability a [`crate::Pooler`] dispatches through.
///
/// Anything that can deliver a message from a sender to a set of
/// recipients fits: an SMTP client, an HTTP-based relay, a queue
/// publisher. The pooler never interprets transport errors; they surface
/// to its caller verbatim.
#[async_trait]
pub trait Transport: Send + Sized + 'static {
    /// Opaque connection parameters used to build a fresh handle.
    /// The pooler records them for duplication but never reads them.
    type Config: Clone + Send + Sync;

    /// Build a handle from connection parameters. Handles are lazy: no
    /// I/O happens until the first send or check.
    fn configure(config: &Self::Config, tls: Option<&TlsOptions>) -> Self;

    /// Deliver one message.
    async fn send(
        &mut self,
        cancel: &CancellationToken,
        from: &str,
        recipients: &[String],
        data: &[u8],
    ) -> anyhow::Result<()>;

    /// Probe the underlying connection for liveness.
    async fn check(&mut self, cancel: &CancellationToken) -> anyhow::Result<()>;

    /// Produce an independent handle with the same parameters. The copy
    /// must not share connection-level state with its origin.
    fn duplicate(&self) -> Self;

    /// Release any live connection held by this handle.
    async fn close(&mut self) -> anyhow::Result<()>;
}
