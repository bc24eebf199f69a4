//! Per-dispatch reply channel handed to every handler.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::adapter::{NullSender, Sender};
use crate::error::AdapterResult;
use crate::message::Message;

/// Lets a handler reply without knowing which adapter it is talking to.
///
/// A writer holds the [`Sender`] to deliver through, a template [`Message`]
/// supplying the default destination, and the adapter name used to label
/// log output.
///
/// Every [`write`](Self::write) produces one outbound message. Handlers that
/// want a single consolidated reply should build the text first and write it
/// once.
///
/// Writers are cheap to clone. A task that runs concurrently with others
/// must own its writer; clone it or call [`copy`](Self::copy) before handing
/// it over.
#[derive(Clone)]
pub struct ResponseWriter {
    sender: Arc<dyn Sender>,
    template: Message,
    adapter: String,
}

impl ResponseWriter {
    /// Creates a writer delivering through `sender` with the given template.
    pub fn new(sender: Arc<dyn Sender>, template: Message, adapter: impl Into<String>) -> Self {
        Self {
            sender,
            template,
            adapter: adapter.into(),
        }
    }

    /// Creates a writer whose writes answer `message`.
    ///
    /// The template is `message.reply("")`, so writes go back to the sender
    /// of the inbound message on the same channel.
    pub fn for_message(sender: Arc<dyn Sender>, message: &Message) -> Self {
        let adapter = sender.name().to_string();
        let mut template = message.reply("");
        template.store = None;
        Self::new(sender, template, adapter)
    }

    /// Creates a writer that discards everything.
    pub fn null(template: Message) -> Self {
        Self::new(Arc::new(NullSender), template, "null")
    }

    /// Sends `bytes` as the text of the template message.
    ///
    /// Invalid UTF-8 is replaced rather than rejected. Returns the number of
    /// bytes consumed.
    pub async fn write(&mut self, bytes: &[u8]) -> AdapterResult<usize> {
        let text = String::from_utf8_lossy(bytes).into_owned();
        self.write_str(text).await?;
        Ok(bytes.len())
    }

    /// Sends `text` as the text of the template message.
    pub async fn write_str(&mut self, text: impl Into<String>) -> AdapterResult<()> {
        let mut message = self.template.clone();
        message.text = text.into();
        self.send(message).await
    }

    /// Sends an arbitrary message through this writer's sender.
    pub async fn send(&self, message: Message) -> AdapterResult<()> {
        trace!(
            adapter = %self.adapter,
            to = %message.to,
            channel = %message.channel,
            "Sending message"
        );
        self.sender.send(message).await
    }

    /// Redirects subsequent writes to `channel`.
    pub fn set_channel(&mut self, channel: impl Into<String>) {
        self.template.channel = channel.into();
    }

    /// Redirects subsequent writes to `to`.
    pub fn set_to(&mut self, to: impl Into<String>) {
        self.template.to = to.into();
    }

    /// Delivers subsequent sends through a different adapter.
    pub fn set_sender(&mut self, sender: Arc<dyn Sender>) {
        self.adapter = sender.name().to_string();
        self.sender = sender;
    }

    /// Returns a writer sharing this sender with an empty template.
    pub fn copy(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            template: Message::default(),
            adapter: self.adapter.clone(),
        }
    }

    /// Name of the adapter this writer delivers through.
    pub fn adapter(&self) -> &str {
        &self.adapter
    }

    pub fn template(&self) -> &Message {
        &self.template
    }

    pub fn sender(&self) -> &Arc<dyn Sender> {
        &self.sender
    }

    /// Whether the underlying adapter only renders plain text.
    pub fn is_text_only(&self) -> bool {
        self.sender.is_text_only()
    }
}

impl fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("adapter", &self.adapter)
            .field("to", &self.template.to)
            .field("channel", &self.template.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSender;

    #[tokio::test]
    async fn test_write_uses_template() {
        let sender = Arc::new(RecordingSender::new());
        let inbound = Message::to_bot("ping")
            .with_from("alice")
            .with_to("bot")
            .with_channel("#ops");
        let mut w = ResponseWriter::for_message(sender.clone(), &inbound);

        let n = w.write(b"PONG!").await.unwrap();
        assert_eq!(n, 5);

        let sent = sender.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "PONG!");
        assert_eq!(sent[0].to, "alice");
        assert_eq!(sent[0].channel, "#ops");
    }

    #[tokio::test]
    async fn test_each_write_is_one_message() {
        let sender = Arc::new(RecordingSender::new());
        let mut w = ResponseWriter::new(sender.clone(), Message::default(), "test");

        w.write_str("one").await.unwrap();
        w.write_str("two").await.unwrap();

        let texts: Vec<_> = sender.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, ["one", "two"]);
    }

    #[tokio::test]
    async fn test_set_channel_and_to() {
        let sender = Arc::new(RecordingSender::new());
        let mut w = ResponseWriter::new(sender.clone(), Message::default(), "test");
        w.set_channel("#random");
        w.set_to("bob");
        w.write_str("hey").await.unwrap();

        let sent = sender.messages();
        assert_eq!(sent[0].channel, "#random");
        assert_eq!(sent[0].to, "bob");
    }

    #[tokio::test]
    async fn test_copy_resets_template() {
        let sender = Arc::new(RecordingSender::new());
        let inbound = Message::new("x").with_from("alice").with_channel("#a");
        let w = ResponseWriter::for_message(sender.clone(), &inbound);

        let mut c = w.copy();
        assert!(c.template().to.is_empty());
        c.set_channel("#b");
        assert_eq!(w.template().channel, "#a");

        c.write_str("from copy").await.unwrap();
        assert_eq!(sender.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_set_sender_redirects() {
        let first = Arc::new(RecordingSender::new());
        let second = Arc::new(RecordingSender::new());
        let mut w = ResponseWriter::new(first.clone(), Message::default(), "first");

        w.set_sender(second.clone());
        w.write_str("moved").await.unwrap();

        assert!(first.messages().is_empty());
        assert_eq!(second.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_null_writer_discards() {
        let mut w = ResponseWriter::null(Message::default());
        tokio_test::assert_ok!(w.write_str("nothing").await);
        assert_eq!(w.adapter(), "null");
    }
}
