//! # Hark Core
//!
//! Building blocks shared by every part of the hark chat-bot framework.
//!
//! - **Messages**: the normalized [`Message`] and its rich [`Attachment`]s.
//! - **Adapters**: the [`Sender`]/[`Receiver`] contracts a chat back-end implements.
//! - **Replies**: [`ResponseWriter`], the per-dispatch handle handlers write to.
//! - **Storage**: the [`Storer`] contract, in-memory and prefixed stores,
//!   [`Scope`]s and the scope-searching [`PropertyStore`].
//! - **Testing**: [`testing::TestAdapter`] and [`testing::RecordingSender`].
//!
//! ```text
//! ┌─────────┐  Message   ┌─────┐  ResponseWriter  ┌─────────┐
//! │ Adapter │──────────▶ │ Mux │ ───────────────▶ │ Handler │
//! └─────────┘            └─────┘                  └─────────┘
//!      ▲                                               │
//!      └──────────────────── send ─────────────────────┘
//! ```

pub mod adapter;
pub mod error;
pub mod message;
pub mod response;
pub mod store;
pub mod testing;

pub use adapter::{Adapter, BoxedAdapter, NullSender, Receiver, Sender};
pub use error::{AdapterError, AdapterResult, StoreError, StoreResult};
pub use message::{Attachment, AttachmentField, Message};
pub use response::ResponseWriter;
pub use store::{
    MemoryStore, PrefixedStore, PropertyStore, Scope, Storer, key_to_path, path, path_to_key,
    prefixed, scoped,
};
