use clap::{Arg, ArgAction, ArgMatches};

use hark_core::Scope;

use super::message::CommandMessage;
use crate::error::CommandError;

const GLOBAL: &str = "global";
const CHANNEL: &str = "channel";
const USER: &str = "user";
const CHANNEL_USER: &str = "cu";

/// The `-g`, `-c`, `-u` and `-cu` flags that pick a [`Scope`].
///
/// `-cu` is accepted both as the long flag `--cu` and as the cluster of
/// `-c` and `-u`.
pub struct ScopeFlags;

impl ScopeFlags {
    /// The flag definitions, for use with [`Command::flag`](super::Command::flag).
    pub fn args() -> [Arg; 4] {
        [
            Arg::new(GLOBAL)
                .short('g')
                .long(GLOBAL)
                .help("global scope")
                .action(ArgAction::SetTrue),
            Arg::new(CHANNEL)
                .short('c')
                .long(CHANNEL)
                .help("channel scope")
                .action(ArgAction::SetTrue),
            Arg::new(USER)
                .short('u')
                .long(USER)
                .help("user scope")
                .action(ArgAction::SetTrue),
            Arg::new(CHANNEL_USER)
                .long(CHANNEL_USER)
                .help("channel+user scope")
                .action(ArgAction::SetTrue),
        ]
    }

    /// Adds the scope flags to `m`.
    pub fn register(m: &mut CommandMessage) {
        for arg in Self::args() {
            m.arg(arg);
        }
    }

    /// Reads the scope chosen on the command line of a parsed `m`.
    pub fn resolve(m: &CommandMessage, default: Scope) -> Result<Scope, CommandError> {
        match m.matches() {
            Some(matches) => Self::from_matches(matches, default),
            None => Ok(default),
        }
    }

    /// Picks the scope from parsed flags; `default` when none was given.
    pub fn from_matches(matches: &ArgMatches, default: Scope) -> Result<Scope, CommandError> {
        let set = |id: &str| matches.try_get_one::<bool>(id).ok().flatten().copied().unwrap_or(false);
        let (g, c, u, cu) = (set(GLOBAL), set(CHANNEL), set(USER), set(CHANNEL_USER));

        match (g, c, u, cu) {
            (false, false, false, false) => Ok(default),
            (true, false, false, false) => Ok(Scope::Global),
            (false, true, false, false) => Ok(Scope::Channel),
            (false, false, true, false) => Ok(Scope::User),
            (false, true, true, _) | (false, false, false, true) => Ok(Scope::ChannelUser),
            _ => Err(CommandError::invalid(
                "specify exactly one of -g, -c, -cu or -u",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use hark_core::Message;

    use super::*;

    fn scope_of(text: &str) -> Result<Scope, CommandError> {
        let mut m = CommandMessage::new(Message::to_bot(text));
        m.reset_flags("set", "", None);
        ScopeFlags::register(&mut m);
        m.parse()?;
        ScopeFlags::resolve(&m, Scope::ChannelUser)
    }

    #[test]
    fn test_single_flags() {
        assert_eq!(scope_of("set -g k v").unwrap(), Scope::Global);
        assert_eq!(scope_of("set -c k v").unwrap(), Scope::Channel);
        assert_eq!(scope_of("set --user k v").unwrap(), Scope::User);
    }

    #[test]
    fn test_channel_user_forms() {
        assert_eq!(scope_of("set -cu k v").unwrap(), Scope::ChannelUser);
        assert_eq!(scope_of("set --cu k v").unwrap(), Scope::ChannelUser);
        assert_eq!(scope_of("set -c -u k v").unwrap(), Scope::ChannelUser);
    }

    #[test]
    fn test_default_when_absent() {
        assert_eq!(scope_of("set k v").unwrap(), Scope::ChannelUser);

        let m = CommandMessage::new(Message::to_bot("set"));
        assert_eq!(ScopeFlags::resolve(&m, Scope::Global).unwrap(), Scope::Global);
    }

    #[test]
    fn test_conflicting_flags() {
        for text in ["set -g -c k", "set -g -u k", "set -g --cu k", "set -gcu k"] {
            assert!(
                matches!(scope_of(text), Err(CommandError::Invalid(_))),
                "{text} should be rejected"
            );
        }
    }
}
