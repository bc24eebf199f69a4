//! In-process adapters for tests and local experiments.
//!
//! [`TestAdapter::pair`] returns an adapter plus a [`TestHandle`] that plays
//! the chat service: push messages in, read what the bot sent back out.
//!
//! ```rust,ignore
//! let (adapter, mut handle) = TestAdapter::pair();
//! handle.push(Message::to_bot("ping").with_from("alice"));
//! let reply = handle.next_reply().await.unwrap();
//! assert_eq!(reply.text, "PONG!");
//! ```

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::adapter::{Receiver, Sender};
use crate::error::{AdapterError, AdapterResult};
use crate::message::Message;

/// Channel-backed adapter.
///
/// The inbound stream ends once the paired [`TestHandle`] is dropped or
/// [`TestHandle::close`] is called.
pub struct TestAdapter {
    name: String,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Message>>,
    outbound: mpsc::UnboundedSender<Message>,
    text_only: bool,
}

/// The chat-service side of a [`TestAdapter`].
pub struct TestHandle {
    inbound: Option<mpsc::UnboundedSender<Message>>,
    outbound: mpsc::UnboundedReceiver<Message>,
}

impl TestAdapter {
    /// Creates a connected adapter and handle.
    pub fn pair() -> (Self, TestHandle) {
        Self::named("test")
    }

    /// Creates a connected adapter with a custom name.
    pub fn named(name: impl Into<String>) -> (Self, TestHandle) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let adapter = Self {
            name: name.into(),
            inbound: tokio::sync::Mutex::new(in_rx),
            outbound: out_tx,
            text_only: false,
        };
        let handle = TestHandle {
            inbound: Some(in_tx),
            outbound: out_rx,
        };
        (adapter, handle)
    }

    /// Marks the adapter as only able to render plain text.
    pub fn text_only(mut self) -> Self {
        self.text_only = true;
        self
    }
}

#[async_trait]
impl Sender for TestAdapter {
    async fn send(&self, message: Message) -> AdapterResult<()> {
        self.outbound
            .send(message)
            .map_err(|_| AdapterError::closed(self.name.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_text_only(&self) -> bool {
        self.text_only
    }
}

#[async_trait]
impl Receiver for TestAdapter {
    async fn receive(&self) -> Option<Message> {
        self.inbound.lock().await.recv().await
    }
}

impl TestHandle {
    /// Delivers a message to the bot. Ignored after [`close`](Self::close).
    pub fn push(&self, message: Message) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(message);
        }
    }

    /// Ends the inbound stream.
    pub fn close(&mut self) {
        self.inbound = None;
    }

    /// Waits up to one second for the next outbound message.
    pub async fn next_reply(&mut self) -> Option<Message> {
        self.next_reply_within(Duration::from_secs(1)).await
    }

    /// Waits up to `timeout` for the next outbound message.
    pub async fn next_reply_within(&mut self, timeout: Duration) -> Option<Message> {
        tokio::time::timeout(timeout, self.outbound.recv())
            .await
            .ok()
            .flatten()
    }

    /// Drains every outbound message sent so far.
    pub fn replies(&mut self) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(m) = self.outbound.try_recv() {
            out.push(m);
        }
        out
    }
}

/// A [`Sender`] that keeps every message it is given.
#[derive(Debug, Default)]
pub struct RecordingSender {
    messages: Mutex<Vec<Message>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the messages sent so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages.lock().iter().map(|m| m.text.clone()).collect()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

#[async_trait]
impl Sender for RecordingSender {
    async fn send(&self, message: Message) -> AdapterResult<()> {
        self.messages.lock().push(message);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
