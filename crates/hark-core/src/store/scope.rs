//! Namespaces for stored properties.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Storer, prefixed};

/// How widely a stored property applies.
///
/// Variants are ordered from least to most specific (after `Unknown`);
/// lookups walk [`Scope::ORDER`], most specific first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Unknown,
    Global,
    Channel,
    User,
    ChannelUser,
}

impl Scope {
    /// Lookup order, most specific first.
    pub const ORDER: [Scope; 4] = [
        Scope::ChannelUser,
        Scope::User,
        Scope::Channel,
        Scope::Global,
    ];

    /// Storage prefix for this scope and the given channel and user.
    ///
    /// Identifiers are quoted so that no two distinct inputs produce the
    /// same key.
    pub fn key(self, channel: &str, user: &str) -> String {
        match self {
            Scope::Global => "global".to_string(),
            Scope::Channel => format!("channel({channel:?})"),
            Scope::User => format!("user({user:?})"),
            Scope::ChannelUser => format!("channelUser({channel:?},{user:?})"),
            Scope::Unknown => "unknown".to_string(),
        }
    }

    /// Human-readable description, suitable for finishing a sentence such as
    /// "Aliases ...".
    pub fn describe(self, channel: &str, user: &str) -> String {
        match self {
            Scope::Global => "set globally".to_string(),
            Scope::Channel => format!("for channel {channel}"),
            Scope::User => format!("for user {user}"),
            Scope::ChannelUser => format!("for user {user} in channel {channel}"),
            Scope::Unknown => "in an unknown scope".to_string(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Global => "Global",
            Scope::Channel => "Channel",
            Scope::User => "User",
            Scope::ChannelUser => "Channel+User",
            Scope::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" | "g" => Ok(Scope::Global),
            "channel" | "c" => Ok(Scope::Channel),
            "user" | "u" => Ok(Scope::User),
            "channel+user" | "channeluser" | "cu" => Ok(Scope::ChannelUser),
            other => Err(format!("unknown scope '{other}'")),
        }
    }
}

/// Returns a view of `store` restricted to one scope.
pub fn scoped(store: Arc<dyn Storer>, scope: Scope, channel: &str, user: &str) -> Arc<dyn Storer> {
    prefixed(store, [scope.key(channel, user)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, path};

    #[test]
    fn test_order_is_most_specific_first() {
        assert_eq!(Scope::ORDER[0], Scope::ChannelUser);
        assert_eq!(Scope::ORDER[3], Scope::Global);
        assert!(Scope::Unknown < Scope::Global);
        assert!(Scope::User < Scope::ChannelUser);
    }

    #[test]
    fn test_keys() {
        assert_eq!(Scope::Global.key("#c", "u"), "global");
        assert_eq!(Scope::Channel.key("#c", "u"), r##"channel("#c")"##);
        assert_eq!(Scope::User.key("#c", "u"), r#"user("u")"#);
        assert_eq!(
            Scope::ChannelUser.key("#c", "u"),
            r##"channelUser("#c","u")"##
        );
    }

    #[test]
    fn test_channel_user_keys_do_not_collide() {
        assert_ne!(
            Scope::ChannelUser.key("a,b", "c"),
            Scope::ChannelUser.key("a", "b,c")
        );
        assert_ne!(
            Scope::ChannelUser.key("a\",\"b", "c"),
            Scope::ChannelUser.key("a", "b\",\"c")
        );
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(Scope::ChannelUser.to_string(), "Channel+User");
        assert_eq!("cu".parse::<Scope>().unwrap(), Scope::ChannelUser);
        assert_eq!("Global".parse::<Scope>().unwrap(), Scope::Global);
        assert!("planet".parse::<Scope>().is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(Scope::Global.describe("#c", "u"), "set globally");
        assert_eq!(
            Scope::ChannelUser.describe("#c", "u"),
            "for user u in channel #c"
        );
    }

    #[tokio::test]
    async fn test_scoped_store_prefix() {
        let base: Arc<dyn Storer> = Arc::new(MemoryStore::new());
        let s = scoped(Arc::clone(&base), Scope::Channel, "#ops", "alice");
        s.set(&path(&["k"]), "v").await.unwrap();

        let stored = base
            .get(&path(&[r##"channel("#ops")"##, "k"]))
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some("v"));
    }
}
