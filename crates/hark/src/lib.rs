//! # Hark
//!
//! A framework for chat bots that listen to a conversation and answer when
//! spoken to.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐     ┌─────┐     ┌──────────────────────────────┐
//! │ Adapters │────▶│ Mux │────▶│ raw handlers   (every message) │
//! │  (chat)  │     │     │────▶│ commands       (to the bot)    │
//! └──────────┘     └─────┘────▶│ hears handlers (regex match)   │
//!       ▲                      └──────────────────────────────┘
//!       └──────────── ResponseWriter ◀──────────┘
//! ```
//!
//! - **Adapters** connect a chat service: they receive [`Message`]s and send
//!   replies.
//! - The **Mux** routes each message to raw handlers, to the command tree
//!   when the message is addressed to the bot, and to regex-matched hears
//!   handlers.
//! - **Commands** resolve by unique prefix, parse flags with clap and nest
//!   sub-commands; `help`, `alias` and `ping` come built in.
//! - **Properties** are kept per handler in a [`PropertyStore`], scoped to a
//!   user in a channel, a user, a channel, or globally.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hark::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HarkRuntime::new()?;
//!     runtime.mux().add_command(command("hello", "Say hello", |mut inv| async move {
//!         let who = inv.message.from.clone();
//!         inv.reply(format!("hello, {who}")).await?;
//!         Ok(Outcome::Handled)
//!     }))?;
//!     runtime.add_adapter(Arc::new(MyAdapter::connect().await?));
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use hark_core as core;
pub use hark_framework as framework;
pub use hark_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use hark::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use hark_runtime::{Bot, HarkConfig, HarkRuntime};

    // Routing and handlers
    pub use hark_framework::{
        BackgroundHandler, BoxError, Describe, Handler, HandlerResult, HearsHandler, Mux, Outcome,
        Registration, WebHookHandler, background_fn, handler_fn, hears_fn, webhook_fn,
    };

    // Commands
    pub use hark_framework::{
        Command, CommandError, CommandHandler, CommandMessage, CommandSet, Commander, Invocation,
        ScopeFlags, command, ping,
    };

    // Messages, adapters and storage
    pub use hark_core::{
        Adapter, Attachment, BoxedAdapter, Message, PropertyStore, Receiver, ResponseWriter, Scope,
        Sender, Storer,
    };

    pub use tokio_util::sync::CancellationToken;
}
