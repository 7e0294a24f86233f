//! An in-memory [`Transport`] that records what it would have delivered.
//! It stands in for a real SMTP client in tests and anywhere deliveries
//! should be captured instead of leaving the process.
use crate::{TlsOptions, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One message accepted by a [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub from: String,
    pub recipients: Vec<String>,
    pub data: Vec<u8>,
}

/// The shared far end of a set of [`MemoryTransport`] handles, playing
/// the role of the server: duplicated handles keep appending to the same
/// sink, just as separate SMTP connections land on the same host.
#[derive(Clone, Default)]
pub struct MemorySink {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    refuse: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.deliveries.lock().len()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    /// Make subsequent sends fail, for exercising error pass-through.
    pub fn set_refusing(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

pub struct MemoryTransport {
    sink: MemorySink,
    connected: bool,
}

impl MemoryTransport {
    pub fn new(sink: MemorySink) -> Self {
        Self {
            sink,
            connected: false,
        }
    }

    /// True once a send or check has "dialed" and close has not been
    /// called since.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    type Config = MemorySink;

    fn configure(config: &Self::Config, _tls: Option<&TlsOptions>) -> Self {
        Self::new(config.clone())
    }

    async fn send(
        &mut self,
        _cancel: &CancellationToken,
        from: &str,
        recipients: &[String],
        data: &[u8],
    ) -> anyhow::Result<()> {
        if self.sink.refuse.load(Ordering::SeqCst) {
            anyhow::bail!("delivery refused by sink");
        }
        self.connected = true;
        self.sink.deliveries.lock().push(Delivery {
            from: from.to_string(),
            recipients: recipients.to_vec(),
            data: data.to_vec(),
        });
        Ok(())
    }

    async fn check(&mut self, _cancel: &CancellationToken) -> anyhow::Result<()> {
        self.connected = true;
        Ok(())
    }

    fn duplicate(&self) -> Self {
        // Fresh "connection" on the same sink
        Self::new(self.sink.clone())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn duplicate_shares_the_sink_but_not_the_connection() {
        let sink = MemorySink::new();
        let mut transport = MemoryTransport::new(sink.clone());
        let cancel = CancellationToken::new();

        transport.check(&cancel).await.unwrap();
        assert!(transport.is_connected());

        let copy = transport.duplicate();
        assert!(!copy.is_connected());

        transport
            .send(&cancel, "a@test.com", &["b@test.com".to_string()], b"hi")
            .await
            .unwrap();
        k9::assert_equal!(sink.count(), 1);

        transport.close().await.unwrap();
        assert!(!transport.is_connected());
    }
}
