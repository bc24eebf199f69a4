//! Outcomes and errors produced while dispatching a message.

use thiserror::Error;

pub use tower::BoxError;

use crate::command::SplitError;

/// How a handler finished, when it did not fail.
///
/// These are control signals for the router and the command layer. They are
/// never shown to the person who sent the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Outcome {
    /// The message was processed; dispatch continues as normal.
    #[default]
    Handled,
    /// The message was fully handled; pattern ("hears") handlers must not run.
    SkipHears,
    /// Resolve the remaining arguments against this command's sub-commands.
    NextCommand,
}

/// Result returned by every handler.
///
/// Any error other than [`CommandError::Usage`] is reported to the sender as
/// `error, <message>`.
pub type HandlerResult = Result<Outcome, BoxError>;

/// Failures raised while resolving or running commands.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// No command matched the first argument.
    #[error("unknown command '{wanted}'")]
    UnknownCommand {
        wanted: String,
        /// Names that were available at this level.
        available: Vec<String>,
    },

    /// Several commands start with the given argument and none equals it.
    #[error("ambiguous command '{wanted}': {}", .candidates.join(", "))]
    Ambiguous {
        wanted: String,
        candidates: Vec<String>,
    },

    /// More than one command has exactly the requested name.
    #[error("multiple exact matches for '{wanted}'")]
    MultipleExact { wanted: String },

    /// The arguments ran out where a sub-command name was expected.
    #[error("required sub-command missing: {}", .available.join(", "))]
    MissingSubCommand { available: Vec<String> },

    /// A command asked for its sub-commands but has none.
    #[error("command '{command}' has no sub-commands")]
    NoSubCommands { command: String },

    /// The message text could not be split into arguments.
    #[error("could not process as command line: {0}")]
    BadCli(#[from] SplitError),

    /// Pre-formatted help or usage text, shown to the user as is.
    #[error("{0}")]
    Usage(String),

    /// A command with this name is already registered.
    #[error("duplicate command '{0}'")]
    Duplicate(String),

    /// The arguments were understood but are not acceptable.
    #[error("{0}")]
    Invalid(String),
}

impl CommandError {
    /// Creates an invalid-arguments error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn is_unknown_command(&self) -> bool {
        matches!(self, Self::UnknownCommand { .. })
    }
}

/// Failures raised while registering handlers with a [`Mux`](crate::Mux).
#[derive(Debug, Clone, Error)]
pub enum MuxError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// A webhook with this name is already registered.
    #[error("duplicate webhook '{0}'")]
    DuplicateWebHook(String),

    /// A webhook name that cannot be used as a URL path segment.
    #[error("invalid webhook name '{0}'")]
    InvalidWebHookName(String),
}

/// Result type for registration.
pub type MuxResult<T> = Result<T, MuxError>;

/// Returns the [`CommandError`] inside a boxed handler error, if that is what it is.
pub fn as_command_error(err: &BoxError) -> Option<&CommandError> {
    err.downcast_ref::<CommandError>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = CommandError::Ambiguous {
            wanted: "a".into(),
            candidates: vec!["ab".into(), "ac".into()],
        };
        assert_eq!(e.to_string(), "ambiguous command 'a': ab, ac");

        let e = CommandError::MissingSubCommand {
            available: vec!["help".into(), "ping".into()],
        };
        assert_eq!(e.to_string(), "required sub-command missing: help, ping");
    }

    #[test]
    fn test_downcast_from_box() {
        let boxed: BoxError = Box::new(CommandError::Usage("usage: x".into()));
        assert!(matches!(
            as_command_error(&boxed),
            Some(CommandError::Usage(text)) if text == "usage: x"
        ));

        let other: BoxError = "plain".into();
        assert!(as_command_error(&other).is_none());
    }
}
