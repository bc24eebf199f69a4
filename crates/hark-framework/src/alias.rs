//! User-defined command aliases.
//!
//! [`Alias`] wraps the to-bot handler. When the wrapped handler reports an
//! unknown command, the first word of the message is looked up as an alias
//! in the property store and, if found, replaced by its expansion before the
//! message is dispatched once more.
//!
//! Aliases are managed with the `alias` command:
//!
//! ```text
//! alias                     list aliases in every scope
//! alias -g                  list global aliases
//! alias d deploy --force    define `d` for you in this channel
//! alias -g d deploy         define `d` for everyone
//! alias d                   show what `d` expands to
//! alias -d -g d             remove the global `d`
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use clap::{Arg, ArgAction};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hark_core::{Message, PropertyStore, ResponseWriter, Scope, Storer};

use crate::command::{Command, CommandHandler, CommandSet, Invocation, ScopeFlags, quote};
use crate::error::{CommandError, HandlerResult, Outcome, as_command_error};
use crate::handler::{Describe, Handler};

/// Default store prefix for alias definitions.
pub const ALIAS_PREFIX: &str = "aliases";

/// A to-bot handler that expands aliases on unknown commands.
pub struct Alias {
    up: Arc<dyn Handler>,
    store: Arc<dyn Storer>,
}

impl Alias {
    /// Wraps `up`, keeping definitions in `store`, and adds the `alias`
    /// command to `commands`.
    pub fn new(
        up: Arc<dyn Handler>,
        commands: &CommandSet,
        store: Arc<dyn Storer>,
    ) -> Result<Self, CommandError> {
        commands.add_command(alias_command(Arc::clone(&store)))?;
        Ok(Self { up, store })
    }
}

/// Splits off the first whitespace-separated word of `text`.
fn first_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim_start()),
        None => (text, ""),
    }
}

impl Describe for Alias {
    fn describe(&self) -> (String, String) {
        self.up.describe()
    }
}

#[async_trait]
impl Handler for Alias {
    async fn process_message(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: Message,
    ) -> HandlerResult {
        let err = match self.up.process_message(cancel, w, m.copy()).await {
            Err(err) if as_command_error(&err).is_some_and(CommandError::is_unknown_command) => err,
            other => return other,
        };

        let (name, rest) = first_word(&m.text);
        let (name, rest) = (name.to_string(), rest.to_string());
        let props = PropertyStore::for_message(Arc::clone(&self.store), &m);
        let Some(expansion) = props.get(&name).await? else {
            return Err(err);
        };

        debug!(alias = %name, expansion = %expansion, "Expanding alias");
        let mut expanded = m;
        expanded.text = if rest.is_empty() {
            expansion
        } else {
            format!("{expansion} {rest}")
        };
        self.up.process_message(cancel, w, expanded).await
    }
}

/// The `alias` command, storing definitions in `store`.
pub fn alias_command(store: Arc<dyn Storer>) -> CommandHandler {
    CommandHandler::new(move || {
        let store = Arc::clone(&store);
        let mut node = Command::new("alias [name [expansion...]]")
            .short("Manage aliases")
            .long(
                "With no arguments, lists aliases. With a name, shows its expansion. \
                 With a name and an expansion, defines an alias, for you in this \
                 channel unless a scope is given.",
            )
            .flag(
                Arg::new("delete")
                    .short('d')
                    .long("delete")
                    .help("delete the named alias")
                    .action(ArgAction::SetTrue),
            );
        for arg in ScopeFlags::args() {
            node = node.flag(arg);
        }
        node.run(move |inv| manage(Arc::clone(&store), inv))
    })
}

async fn manage(store: Arc<dyn Storer>, mut inv: Invocation) -> HandlerResult {
    let props = PropertyStore::for_message(store, &inv.message);
    let chosen = ScopeFlags::from_matches(&inv.matches, Scope::Unknown)?;
    let scope = match chosen {
        Scope::Unknown => Scope::ChannelUser,
        s => s,
    };
    let args = std::mem::take(&mut inv.args);

    let text = match (inv.flag("delete"), args.as_slice()) {
        (true, [name]) => {
            props.unset(scope, name).await?;
            format!("Alias {name} removed ({})", props.describe(scope))
        }
        (true, _) => return Err(CommandError::invalid("-d takes exactly one alias name").into()),
        (false, []) => {
            let scopes = match chosen {
                Scope::Unknown => Scope::ORDER.to_vec(),
                s => vec![s],
            };
            let mut sections = Vec::new();
            for scope in scopes {
                sections.push(listing(&props, scope).await?);
            }
            sections.join("\n")
        }
        (false, [name]) => {
            let found = match chosen {
                Scope::Unknown => props.lookup_all(name).await?,
                s => props
                    .get_in_scope(s, name)
                    .await?
                    .map(|value| vec![(s, value)])
                    .unwrap_or_default(),
            };
            if found.is_empty() {
                format!("No alias {name}")
            } else {
                found
                    .into_iter()
                    .map(|(scope, value)| format!("{name} -> {value} ({})", props.describe(scope)))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        (false, [name, expansion @ ..]) => {
            let expansion = expansion
                .iter()
                .map(|arg| quote(arg))
                .collect::<Vec<_>>()
                .join(" ");
            props.set(scope, name, &expansion).await?;
            format!("Alias {name} -> {expansion} ({})", props.describe(scope))
        }
    };

    inv.reply(text).await?;
    Ok(Outcome::SkipHears)
}

async fn listing(props: &PropertyStore, scope: Scope) -> Result<String, hark_core::StoreError> {
    let entries = props.list(scope).await?;
    if entries.is_empty() {
        return Ok(format!("No aliases {}", props.describe(scope)));
    }
    let mut out = format!("Aliases {}:", props.describe(scope));
    for (name, expansion) in entries {
        out.push_str(&format!("\n  {name} -> {expansion}"));
    }
    Ok(out)
}
