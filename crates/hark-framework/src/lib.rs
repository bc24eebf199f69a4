//! # Hark Framework
//!
//! Message routing for hark bots.
//!
//! This layer provides:
//! - [`Mux`], the router deciding which handlers see each message
//! - Handler capabilities ([`Handler`], [`HearsHandler`], [`BackgroundHandler`],
//!   [`WebHookHandler`]) and closure wrappers for each
//! - Command trees with prefix resolution, clap flag parsing and sub-commands
//! - Built-in `help`, `ping` and `alias` commands
//!
//! Handlers return [`HandlerResult`]: an [`Outcome`] steering the router, or
//! an error the router reports back to the sender.

pub mod alias;
pub mod command;
pub mod error;
pub mod handler;
pub mod help;
pub mod mux;
pub mod ping;
pub mod task;
pub mod webhook;

pub use alias::{ALIAS_PREFIX, Alias, alias_command};
pub use command::{
    Command, CommandHandler, CommandMessage, CommandSet, Commander, Invocation, ScopeFlags,
    command,
};
pub use error::{
    BoxError, CommandError, HandlerResult, MuxError, MuxResult, Outcome, as_command_error,
};
pub use handler::{
    BackgroundFn, BackgroundHandler, Describe, Handler, HandlerFn, HearsFn, HearsHandler, Helper,
    background_fn, handler_fn, hears_fn,
};
pub use help::HelpCommand;
pub use mux::{Mux, Registration};
pub use ping::ping;
pub use task::spawn_guarded;
pub use webhook::{WebHookFn, WebHookHandler, webhook_fn};
