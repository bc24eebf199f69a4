use std::ops::{Deref, DerefMut};

use clap::{Arg, ArgAction, ArgMatches};

use hark_core::Message;

use super::split::shell_split;
use crate::error::CommandError;

/// Id of the catch-all positional that collects non-flag arguments.
const ARGS: &str = "args";

/// A [`Message`] being processed as a command line.
///
/// The text is split into arguments the first time they are needed and the
/// result is cached; [`parse`](Self::parse) consumes the command name and
/// flags and leaves the positional arguments behind, ready for the next
/// level of sub-command resolution.
///
/// Flag definitions are per invocation: the command layer resets them every
/// time a command is resolved.
///
/// ```rust,ignore
/// m.flag("a", "reply with an attachment");
/// m.option("name", "who to greet");
/// m.parse()?;
/// if m.get_flag("a") { /* ... */ }
/// let who = m.get_string("name").unwrap_or_default();
/// ```
#[derive(Debug)]
pub struct CommandMessage {
    message: Message,
    args: Option<Vec<String>>,
    flags: clap::Command,
    matches: Option<ArgMatches>,
    inherited: Vec<Arg>,
    usage: String,
}

impl CommandMessage {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            args: None,
            flags: clap::Command::new("command"),
            matches: None,
            inherited: Vec::new(),
            usage: String::new(),
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    /// Returns the current arguments, splitting the text on first use.
    pub fn args(&mut self) -> Result<&[String], CommandError> {
        if self.args.is_none() {
            self.args = Some(shell_split(&self.message.text)?);
        }
        Ok(self.args.as_deref().unwrap_or(&[]))
    }

    /// Replaces the arguments without touching the message text.
    pub fn set_args(&mut self, args: Vec<String>) {
        self.args = Some(args);
    }

    /// Starts a fresh flag set for the command `name`.
    ///
    /// Inherited (persistent) flags survive the reset.
    pub(crate) fn reset_flags(&mut self, name: &str, about: &str, after_help: Option<String>) {
        let mut flags = clap::Command::new(name.to_string()).bin_name(name.to_string());
        if !about.is_empty() {
            flags = flags.about(about.to_string());
        }
        if let Some(text) = after_help {
            flags = flags.after_help(text);
        }
        self.flags = flags;
        self.matches = None;
        self.usage.clear();
    }

    /// Adjusts the flag set, e.g. to set a long description or usage line.
    pub fn configure(&mut self, f: impl FnOnce(clap::Command) -> clap::Command) -> &mut Self {
        let flags = std::mem::take(&mut self.flags);
        self.flags = f(flags);
        self
    }

    /// Adds an arbitrary clap argument to the flag set.
    pub fn arg(&mut self, arg: Arg) -> &mut Self {
        self.configure(|c| c.arg(arg))
    }

    /// Adds an argument that also applies to sub-commands resolved after this one.
    pub fn persistent_arg(&mut self, arg: Arg) -> &mut Self {
        self.inherited.push(arg.clone());
        self.arg(arg)
    }

    /// Adds a boolean flag. Single-letter names get a short form too.
    pub fn flag(&mut self, name: &str, help: &str) -> &mut Self {
        self.arg(named(name).help(help.to_string()).action(ArgAction::SetTrue))
    }

    /// Adds a string-valued option.
    pub fn option(&mut self, name: &str, help: &str) -> &mut Self {
        self.arg(named(name).help(help.to_string()).action(ArgAction::Set))
    }

    /// Parses flags out of the arguments.
    ///
    /// The first argument is the command name and is dropped. On success the
    /// remaining positional arguments replace [`args`](Self::args). A help
    /// request or a bad flag yields [`CommandError::Usage`] with the rendered
    /// text, which is also kept in [`usage`](Self::usage).
    pub fn parse(&mut self) -> Result<(), CommandError> {
        let args = self.args()?.to_vec();

        let mut flags = std::mem::take(&mut self.flags).disable_version_flag(true);
        if !flags.get_arguments().any(|a| a.get_id() == ARGS) {
            flags = flags.arg(
                Arg::new(ARGS)
                    .num_args(1..)
                    .trailing_var_arg(true)
                    .value_name("ARGS"),
            );
        }
        for arg in &self.inherited {
            if !flags.get_arguments().any(|a| a.get_id() == arg.get_id()) {
                flags = flags.arg(arg.clone());
            }
        }

        let argv = std::iter::once(flags.get_name().to_string()).chain(args.into_iter().skip(1));
        let parsed = flags.try_get_matches_from_mut(argv);
        self.flags = flags;

        match parsed {
            Ok(matches) => {
                let rest = matches
                    .get_many::<String>(ARGS)
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default();
                self.args = Some(rest);
                self.matches = Some(matches);
                Ok(())
            }
            Err(err) => {
                let text = err.to_string();
                self.usage.push_str(&text);
                Err(CommandError::Usage(text))
            }
        }
    }

    /// Flag values from the last successful [`parse`](Self::parse).
    pub fn matches(&self) -> Option<&ArgMatches> {
        self.matches.as_ref()
    }

    /// Whether boolean flag `id` was given.
    pub fn get_flag(&self, id: &str) -> bool {
        self.get_one::<bool>(id).unwrap_or(false)
    }

    pub fn get_string(&self, id: &str) -> Option<String> {
        self.get_one::<String>(id)
    }

    /// Typed value of argument `id`, if it was defined and given.
    pub fn get_one<T>(&self, id: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.matches
            .as_ref()
            .and_then(|m| m.try_get_one::<T>(id).ok().flatten().cloned())
    }

    /// Usage or error text produced by flag parsing, empty if none.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Renders the help text of the current flag set.
    pub fn render_help(&mut self) -> String {
        self.flags.render_help().to_string()
    }

    /// Copies the message for a new command line, dropping cached state.
    pub fn copy(&self) -> Self {
        Self::new(self.message.copy())
    }
}

/// An argument named `name`, reachable as `--name` and, for single-letter
/// names, `-n`.
fn named(name: &str) -> Arg {
    let arg = Arg::new(name.to_string()).long(name.to_string());
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => arg.short(c),
        _ => arg,
    }
}

impl Deref for CommandMessage {
    type Target = Message;

    fn deref(&self) -> &Message {
        &self.message
    }
}

impl DerefMut for CommandMessage {
    fn deref_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl From<Message> for CommandMessage {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(text: &str) -> CommandMessage {
        let mut m = CommandMessage::new(Message::to_bot(text));
        m.reset_flags("test", "a test command", None);
        m
    }

    #[test]
    fn test_args_are_cached() {
        let mut m = cmd("a b c");
        assert_eq!(m.args().unwrap(), ["a", "b", "c"]);
        m.text = "changed".into();
        assert_eq!(m.args().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn test_bad_quotes() {
        let mut m = cmd(r#"say "hi"#);
        assert!(matches!(m.args(), Err(CommandError::BadCli(_))));
    }

    #[test]
    fn test_parse_flags_and_positionals() {
        let mut m = cmd("test -a --name bob one two");
        m.flag("a", "use an attachment");
        m.option("name", "who");
        m.parse().unwrap();

        assert!(m.get_flag("a"));
        assert_eq!(m.get_string("name").as_deref(), Some("bob"));
        assert_eq!(m.args().unwrap(), ["one", "two"]);
    }

    #[test]
    fn test_flags_after_first_positional_are_kept() {
        let mut m = cmd("test sub -x --y");
        m.flag("a", "unused");
        m.parse().unwrap();
        assert!(!m.get_flag("a"));
        assert_eq!(m.args().unwrap(), ["sub", "-x", "--y"]);
    }

    #[test]
    fn test_parse_no_positionals() {
        let mut m = cmd("test");
        m.parse().unwrap();
        assert!(m.args().unwrap().is_empty());
    }

    #[test]
    fn test_help_is_usage() {
        let mut m = cmd("test -h");
        m.flag("a", "use an attachment");
        let err = m.parse().unwrap_err();
        let CommandError::Usage(text) = err else {
            panic!("expected usage, got {err:?}");
        };
        assert!(text.contains("a test command"));
        assert!(text.contains("use an attachment"));
        assert_eq!(m.usage(), text);
    }

    #[test]
    fn test_unknown_flag_is_usage() {
        let mut m = cmd("test --bogus");
        let err = m.parse().unwrap_err();
        assert!(matches!(err, CommandError::Usage(ref t) if t.contains("--bogus")));
    }

    #[test]
    fn test_inherited_flags_survive_reset() {
        let mut m = cmd("test -v sub");
        m.persistent_arg(named("v").action(ArgAction::SetTrue));
        m.parse().unwrap();
        assert!(m.get_flag("v"));

        m.reset_flags("sub", "", None);
        m.set_args(vec!["sub".into(), "-v".into()]);
        m.parse().unwrap();
        assert!(m.get_flag("v"));
    }

    #[test]
    fn test_get_undefined_is_none() {
        let mut m = cmd("test");
        m.parse().unwrap();
        assert!(!m.get_flag("missing"));
        assert_eq!(m.get_string("missing"), None);
    }
}
