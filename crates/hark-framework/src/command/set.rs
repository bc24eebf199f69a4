use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hark_core::{Message, ResponseWriter, prefixed};

use super::Commander;
use super::message::CommandMessage;
use crate::error::{BoxError, CommandError, HandlerResult, Outcome, as_command_error};
use crate::handler::{Describe, Handler};

/// Name pinned to the top of command listings.
const HELP: &str = "help";

/// The commands available at one level of a command tree.
///
/// A set is a shared handle: clones see the same commands. Commands are
/// resolved by exact name or by an unambiguous prefix of it.
#[derive(Clone, Default)]
pub struct CommandSet {
    commands: Arc<RwLock<BTreeMap<String, Arc<dyn Commander>>>>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `command` under the name it describes itself with.
    pub fn add(&self, command: Arc<dyn Commander>) -> Result<(), CommandError> {
        let (name, _) = command.describe();
        let mut commands = self.commands.write();
        if commands.contains_key(&name) {
            return Err(CommandError::Duplicate(name));
        }
        debug!(command = %name, "Registered command");
        commands.insert(name, command);
        Ok(())
    }

    /// Registers an owned command.
    pub fn add_command<C: Commander + 'static>(&self, command: C) -> Result<(), CommandError> {
        self.add(Arc::new(command))
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn Commander>> {
        self.commands.write().remove(name)
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Command names in listing order.
    pub fn names(&self) -> Vec<String> {
        self.list().into_iter().map(|(name, _)| name).collect()
    }

    /// Commands sorted alphabetically, with `help` first.
    pub fn list(&self) -> Vec<(String, Arc<dyn Commander>)> {
        let commands = self.commands.read();
        let mut listed: Vec<_> = commands
            .iter()
            .map(|(name, c)| (name.clone(), Arc::clone(c)))
            .collect();
        if let Some(pos) = listed.iter().position(|(name, _)| name == HELP) {
            let help = listed.remove(pos);
            listed.insert(0, help);
        }
        listed
    }

    /// Resolves the first argument of `m` to a command.
    ///
    /// An exact name wins over longer names it is a prefix of. Otherwise the
    /// argument must be a prefix of exactly one name.
    pub fn next_command(&self, m: &mut CommandMessage) -> Result<Arc<dyn Commander>, CommandError> {
        let args = m.args()?;
        let commands = self.commands.read();

        let Some(wanted) = args.first() else {
            return Err(CommandError::MissingSubCommand {
                available: self.names_of(&commands),
            });
        };

        let mut exact = Vec::new();
        let mut by_prefix = Vec::new();
        for (name, command) in commands.iter() {
            if name.starts_with(wanted.as_str()) {
                by_prefix.push((name, command));
            }
            if name == wanted {
                exact.push((name, command));
            }
        }

        match (exact.as_slice(), by_prefix.as_slice()) {
            ([], []) => Err(CommandError::UnknownCommand {
                wanted: wanted.clone(),
                available: self.names_of(&commands),
            }),
            ([_, _, ..], _) => Err(CommandError::MultipleExact {
                wanted: wanted.clone(),
            }),
            ([(_, command)], _) | ([], [(_, command)]) => Ok(Arc::clone(command)),
            ([], candidates) => Err(CommandError::Ambiguous {
                wanted: wanted.clone(),
                candidates: candidates.iter().map(|(name, _)| (*name).clone()).collect(),
            }),
        }
    }

    fn names_of(&self, commands: &BTreeMap<String, Arc<dyn Commander>>) -> Vec<String> {
        let mut names: Vec<String> = commands.keys().cloned().collect();
        if let Some(pos) = names.iter().position(|n| n == HELP) {
            let help = names.remove(pos);
            names.insert(0, help);
        }
        names
    }

    /// Resolves and runs the command named by the first argument of `m`,
    /// descending into sub-commands while commands ask for it.
    ///
    /// The store of `m`, if any, is narrowed to the resolved command's name
    /// before it runs, so sibling commands never share keys.
    pub fn command<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        w: &'a mut ResponseWriter,
        m: &'a mut CommandMessage,
    ) -> BoxFuture<'a, HandlerResult> {
        async move {
            let command = self.next_command(m)?;
            let (name, description) = command.describe();
            let subcommands = command.subcommands();

            // Each level of the tree gets its own property namespace.
            if let Some(store) = m.store.take() {
                m.store = Some(prefixed(store, [name.clone()]));
            }

            m.reset_flags(&name, &description, subcommands.as_ref().map(Self::summary));
            debug!(command = %name, "Running command");

            let outcome = command.command(cancel, w, m).await?;
            if !m.usage().is_empty() {
                return Err(CommandError::Usage(m.usage().to_string()).into());
            }

            match outcome {
                Outcome::NextCommand => match subcommands {
                    Some(set) if !set.is_empty() => set.command(cancel, w, m).await,
                    _ => Err(CommandError::NoSubCommands { command: name }.into()),
                },
                other => Ok(other),
            }
        }
        .boxed()
    }

    /// One line per command: `  name - description`, padded to align.
    pub fn summary(&self) -> String {
        let listed = self.list();
        let described: Vec<_> = listed.iter().map(|(_, c)| c.describe()).collect();
        let width = described.iter().map(|(n, _)| n.len()).max().unwrap_or(0);

        let mut out = String::from("Commands:\n");
        for (name, description) in described {
            out.push_str(&format!("  {name:<width$} - {description}\n"));
        }
        out
    }

    /// Help for the commands named by the arguments of `m`, or a summary of
    /// the whole set when there are none.
    ///
    /// A specific command is asked for its help by running it with `-h`
    /// appended, against a writer that discards output.
    pub async fn help(
        &self,
        cancel: &CancellationToken,
        m: &mut CommandMessage,
    ) -> Result<String, BoxError> {
        let mut args = m.args()?.to_vec();
        if args.is_empty() {
            return Ok(self.summary());
        }

        args.push("-h".to_string());
        let mut probe = m.copy();
        probe.set_args(args);
        let mut sink = ResponseWriter::null(Message::default());

        match self.command(cancel, &mut sink, &mut probe).await {
            Err(err) => match as_command_error(&err) {
                Some(CommandError::Usage(text)) => Ok(text.clone()),
                _ => Err(err),
            },
            Ok(_) => Ok(format!("no help available for {}", m.args()?.join(" "))),
        }
    }
}

impl Describe for CommandSet {
    fn describe(&self) -> (String, String) {
        ("commands".to_string(), "Runs commands addressed to the bot".to_string())
    }
}

#[async_trait]
impl Handler for CommandSet {
    async fn process_message(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: Message,
    ) -> HandlerResult {
        let mut m = CommandMessage::new(m);
        self.command(cancel, w, &mut m).await
    }
}
