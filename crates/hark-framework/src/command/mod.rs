//! Command trees: CLI-style handlers for messages addressed to the bot.
//!
//! A message's text is split shell-style into arguments. The first argument
//! selects a command from a [`CommandSet`], by exact name or unambiguous
//! prefix; the command parses its flags with clap and either handles the
//! message or returns [`Outcome::NextCommand`](crate::Outcome::NextCommand)
//! to hand the remaining arguments to one of its sub-commands.
//!
//! ```rust,ignore
//! let set = CommandSet::new();
//! set.add_command(command("ping", "Check the bot is alive", |mut inv| async move {
//!     inv.reply("PONG!").await?;
//!     Ok(Outcome::Handled)
//! }))?;
//! ```

mod message;
mod node;
mod scope;
mod set;
mod split;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use hark_core::ResponseWriter;

use crate::error::HandlerResult;
use crate::handler::Describe;

pub use message::CommandMessage;
pub use node::{Command, CommandHandler, Invocation, RunFn, command};
pub use scope::ScopeFlags;
pub use set::CommandSet;
pub use split::{SplitError, quote, shell_split};

/// A node in a command tree.
///
/// [`describe`](Describe::describe) supplies the name the command is
/// registered under and the one-line description shown in listings.
#[async_trait]
pub trait Commander: Describe + Send + Sync {
    /// Runs the command.
    ///
    /// Flag definitions added to `m` are fresh for this call. Return
    /// [`Outcome::NextCommand`](crate::Outcome::NextCommand) to continue
    /// with [`subcommands`](Self::subcommands).
    async fn command(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: &mut CommandMessage,
    ) -> HandlerResult;

    /// The commands one level below this one, if any.
    fn subcommands(&self) -> Option<CommandSet> {
        None
    }
}
