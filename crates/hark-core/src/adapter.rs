//! Contracts implemented by chat back-ends.
//!
//! An adapter is a thin protocol translator: it turns back-end events into
//! [`Message`]s ([`Receiver`]) and delivers outbound messages ([`Sender`]).
//! Anything implementing both traits is an [`Adapter`].
//!
//! ```rust,ignore
//! struct Console;
//!
//! #[async_trait]
//! impl Sender for Console {
//!     async fn send(&self, message: Message) -> AdapterResult<()> {
//!         println!("{}", message.text);
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AdapterResult;
use crate::message::Message;

/// Delivers outbound messages to a chat back-end.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Sends one message.
    async fn send(&self, message: Message) -> AdapterResult<()>;

    /// Name used to label log lines and response writers.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Whether the back-end can only render plain text.
    ///
    /// Handlers may use this to flatten attachments before sending.
    fn is_text_only(&self) -> bool {
        false
    }
}

/// Yields inbound messages from a chat back-end.
#[async_trait]
pub trait Receiver: Send + Sync {
    /// Waits for the next message. `None` means the stream has ended and
    /// nothing more will be received from this adapter.
    async fn receive(&self) -> Option<Message>;
}

/// A full chat back-end: both halves of the conversation.
pub trait Adapter: Sender + Receiver {
    /// Views this adapter as its sending half.
    fn as_sender(self: Arc<Self>) -> Arc<dyn Sender>;
}

impl<T: Sender + Receiver + 'static> Adapter for T {
    fn as_sender(self: Arc<Self>) -> Arc<dyn Sender> {
        self
    }
}

/// Shared adapter handle.
pub type BoxedAdapter = Arc<dyn Adapter>;

/// A sender that drops everything it is given.
///
/// Backs writers that have nowhere to go, such as help rendering into a
/// buffer or webhooks fired before an adapter is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSender;

#[async_trait]
impl Sender for NullSender {
    async fn send(&self, _message: Message) -> AdapterResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}
