use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Arg, ArgMatches};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use hark_core::{AdapterResult, Message, ResponseWriter};

use super::message::CommandMessage;
use super::set::CommandSet;
use super::Commander;
use crate::error::{CommandError, HandlerResult, Outcome};
use crate::handler::Describe;

/// Boxed body of a [`Command`].
pub type RunFn = Arc<dyn Fn(Invocation) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Everything a command body gets to work with.
///
/// The writer and message are owned copies, so the body may move them into
/// other tasks.
pub struct Invocation {
    pub cancel: CancellationToken,
    pub writer: ResponseWriter,
    pub message: Message,
    /// Positional arguments left after flag parsing.
    pub args: Vec<String>,
    pub matches: ArgMatches,
}

impl Invocation {
    /// Whether boolean flag `id` was given.
    pub fn flag(&self, id: &str) -> bool {
        self.value::<bool>(id).unwrap_or(false)
    }

    /// Typed value of argument `id`, if it was defined and given.
    pub fn value<T>(&self, id: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.matches.try_get_one::<T>(id).ok().flatten().cloned()
    }

    /// Writes `text` back to where the command came from.
    pub async fn reply(&mut self, text: impl Into<String>) -> AdapterResult<()> {
        self.writer.write_str(text).await
    }
}

/// One node of a command tree.
///
/// Nodes are rebuilt by their setup function on every dispatch, so flag
/// definitions never leak between invocations.
///
/// ```rust,ignore
/// let deploy = CommandHandler::new(|| {
///     Command::new("deploy <service>")
///         .short("Deploy a service")
///         .flag(Arg::new("force").short('f').action(ArgAction::SetTrue))
///         .run(|mut inv| async move {
///             let force = inv.flag("force");
///             inv.reply(format!("deploying {:?} (force: {force})", inv.args)).await?;
///             Ok(Outcome::SkipHears)
///         })
/// });
/// ```
#[derive(Default)]
pub struct Command {
    usage: String,
    short: String,
    long: String,
    flags: Vec<Arg>,
    persistent_flags: Vec<Arg>,
    run: Option<RunFn>,
    subcommands: Vec<Arc<dyn Commander>>,
}

impl Command {
    /// Creates a node. The first word of `usage` is the command name.
    pub fn new(usage: impl Into<String>) -> Self {
        Self {
            usage: usage.into(),
            ..Default::default()
        }
    }

    /// One-line description shown in command listings.
    pub fn short(mut self, short: impl Into<String>) -> Self {
        self.short = short.into();
        self
    }

    /// Full description shown by `-h`.
    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = long.into();
        self
    }

    pub fn flag(mut self, arg: Arg) -> Self {
        self.flags.push(arg);
        self
    }

    /// A flag this node and all of its sub-commands accept.
    pub fn persistent_flag(mut self, arg: Arg) -> Self {
        self.persistent_flags.push(arg);
        self
    }

    pub fn run<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.run_boxed(Arc::new(move |inv| f(inv).boxed()))
    }

    pub fn run_boxed(mut self, run: RunFn) -> Self {
        self.run = Some(run);
        self
    }

    pub fn subcommand(mut self, command: impl Commander + 'static) -> Self {
        self.subcommands.push(Arc::new(command));
        self
    }

    pub fn name(&self) -> &str {
        self.usage.split_whitespace().next().unwrap_or_default()
    }
}

/// A [`Commander`] that builds its [`Command`] node afresh for every message.
#[derive(Clone)]
pub struct CommandHandler {
    setup: Arc<dyn Fn() -> Command + Send + Sync>,
}

impl CommandHandler {
    pub fn new<F>(setup: F) -> Self
    where
        F: Fn() -> Command + Send + Sync + 'static,
    {
        Self {
            setup: Arc::new(setup),
        }
    }

    fn build(&self) -> Command {
        (self.setup)()
    }
}

/// Shorthand for a flagless command with a body.
///
/// ```rust,ignore
/// let ping = command("ping", "Check the bot is alive", |mut inv| async move {
///     inv.reply("PONG!").await?;
///     Ok(Outcome::Handled)
/// });
/// ```
pub fn command<F, Fut>(name: &str, short: &str, f: F) -> CommandHandler
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let run: RunFn = Arc::new(move |inv| f(inv).boxed());
    let (name, short) = (name.to_string(), short.to_string());
    CommandHandler::new(move || {
        Command::new(name.clone())
            .short(short.clone())
            .run_boxed(Arc::clone(&run))
    })
}

impl Describe for CommandHandler {
    fn describe(&self) -> (String, String) {
        let node = self.build();
        (node.name().to_string(), node.short)
    }
}

#[async_trait]
impl Commander for CommandHandler {
    async fn command(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: &mut CommandMessage,
    ) -> HandlerResult {
        let node = self.build();

        if !node.long.is_empty() {
            let long = node.long.clone();
            m.configure(|c| c.long_about(long));
        }
        if node.usage.trim() != node.name() {
            let usage = node.usage.clone();
            m.configure(|c| c.override_usage(usage));
        }
        for arg in node.flags {
            m.arg(arg);
        }
        for arg in node.persistent_flags {
            m.persistent_arg(arg);
        }

        m.parse()?;

        let Some(run) = node.run else {
            if node.subcommands.is_empty() {
                return Err(CommandError::Usage(m.render_help()).into());
            }
            return Ok(Outcome::NextCommand);
        };

        let invocation = Invocation {
            cancel: cancel.clone(),
            writer: w.clone(),
            message: m.message().copy(),
            args: m.args()?.to_vec(),
            matches: m.matches().cloned().unwrap_or_default(),
        };
        run(invocation).await
    }

    fn subcommands(&self) -> Option<CommandSet> {
        let node = self.build();
        if node.subcommands.is_empty() {
            return None;
        }

        let name = node.name().to_string();
        let set = CommandSet::new();
        for sub in node.subcommands {
            if let Err(e) = set.add(sub) {
                warn!(command = %name, error = %e, "Skipping sub-command");
            }
        }
        Some(set)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use clap::ArgAction;
    use hark_core::testing::RecordingSender;

    use super::*;

    fn writer() -> (Arc<RecordingSender>, ResponseWriter) {
        let sender = Arc::new(RecordingSender::new());
        let w = ResponseWriter::new(sender.clone(), Message::default(), "test");
        (sender, w)
    }

    #[test]
    fn test_describe_uses_first_word() {
        let h = CommandHandler::new(|| Command::new("deploy <service>").short("Deploy things"));
        assert_eq!(
            h.describe(),
            ("deploy".to_string(), "Deploy things".to_string())
        );
    }

    #[tokio::test]
    async fn test_run_receives_flags_and_args() {
        let h = CommandHandler::new(|| {
            Command::new("echo")
                .flag(Arg::new("upper").short('u').action(ArgAction::SetTrue))
                .run(|mut inv| async move {
                    let text = inv.args.join(" ");
                    let text = if inv.flag("upper") {
                        text.to_uppercase()
                    } else {
                        text
                    };
                    inv.reply(text).await?;
                    Ok(Outcome::SkipHears)
                })
        });

        let (sender, mut w) = writer();
        let mut m = CommandMessage::new(Message::to_bot("echo -u hello there"));
        let outcome = h
            .command(&CancellationToken::new(), &mut w, &mut m)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::SkipHears);
        assert_eq!(sender.texts(), ["HELLO THERE"]);
    }

    #[tokio::test]
    async fn test_flags_are_fresh_per_dispatch() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let h = CommandHandler::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Command::new("t")
                .flag(Arg::new("x").short('x').action(ArgAction::SetTrue))
                .run(|mut inv| async move {
                    let x = inv.flag("x");
                    inv.reply(x.to_string()).await?;
                    Ok(Outcome::Handled)
                })
        });

        let (sender, mut w) = writer();
        let cancel = CancellationToken::new();
        for text in ["t -x", "t"] {
            let mut m = CommandMessage::new(Message::to_bot(text));
            h.command(&cancel, &mut w, &mut m).await.unwrap();
        }

        assert_eq!(sender.texts(), ["true", "false"]);
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_run_with_subcommands_delegates() {
        let h = CommandHandler::new(|| {
            Command::new("admin").subcommand(command("status", "", |_| async { Ok(Outcome::Handled) }))
        });

        let (_sender, mut w) = writer();
        let mut m = CommandMessage::new(Message::to_bot("admin status"));
        let outcome = h
            .command(&CancellationToken::new(), &mut w, &mut m)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::NextCommand);
        assert_eq!(m.args().unwrap(), ["status"]);
        assert_eq!(h.subcommands().map(|s| s.len()), Some(1));
    }

    #[tokio::test]
    async fn test_no_run_no_subcommands_is_usage() {
        let h = CommandHandler::new(|| Command::new("empty").short("Does nothing"));
        let (_sender, mut w) = writer();
        let mut m = CommandMessage::new(Message::to_bot("empty"));
        let err = h
            .command(&CancellationToken::new(), &mut w, &mut m)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommandError>(),
            Some(CommandError::Usage(_))
        ));
    }
}
