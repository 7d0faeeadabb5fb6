//! Byte-record stream abstraction (§6). The actual broker (Kafka or
//! otherwise) is out of scope (§1 Non-goals); this crate only needs a
//! `Send`-able producer/consumer pair workers can be driven from, so tests
//! and the bundled binary both use a bounded `tokio::sync::mpsc` channel
//! standing in for the broker connection.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// A consumer of raw input records (the transaction stream, §6).
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn next(&mut self) -> Option<String>;
}

/// A producer for one of the three output streams (§6): `enriched`,
/// `features`, or `alerts`. Acks/idempotence/compression are properties of
/// the real broker client this trait stands in for; here, a send failure
/// (receiver dropped) is the only failure mode, surfaced as `Err`.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn send(&self, payload: String) -> Result<(), RecordSinkError>;
}

#[derive(Debug, thiserror::Error)]
#[error("sink channel closed")]
pub struct RecordSinkError;

pub struct ChannelSource {
    receiver: mpsc::Receiver<String>,
}

impl ChannelSource {
    pub fn new(receiver: mpsc::Receiver<String>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl RecordSource for ChannelSource {
    async fn next(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

#[derive(Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<String>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self { sender }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl RecordSink for ChannelSink {
    async fn send(&self, payload: String) -> Result<(), RecordSinkError> {
        self.sender.send(payload).await.map_err(|_| RecordSinkError)
    }
}
