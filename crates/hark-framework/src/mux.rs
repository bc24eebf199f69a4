//! The message router.
//!
//! A [`Mux`] owns every handler registration and decides, for each inbound
//! message, which handlers run and in what order:
//!
//! 1. every raw handler, each as its own task;
//! 2. the to-bot handler (normally the command set), if the message was
//!    addressed to the bot;
//! 3. every hears handler whose pattern matches, unless step 2 said
//!    [`Outcome::SkipHears`].
//!
//! Whatever error is left over is written back as `error, <message>`.
//!
//! ```rust,ignore
//! let mux = Arc::new(Mux::new("bot", "A helpful bot"));
//! mux.add_command(ping())?;
//! mux.add_hears(hears_fn("tableflip", "", Regex::new("tableflip")?, flip));
//! mux.enable_help()?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::extract::Request;
use axum::routing::any;
use parking_lot::RwLock;
use regex::Regex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, warn};
use url::Url;

use hark_core::{MemoryStore, Message, ResponseWriter, Sender, Storer, prefixed};

use crate::command::{CommandMessage, CommandSet, Commander};
use crate::error::{
    BoxError, CommandError, HandlerResult, MuxError, MuxResult, Outcome, as_command_error,
};
use crate::handler::{
    BackgroundHandler, Describe, Handler, HearsHandler, Helper, submatches,
};
use crate::help::HelpCommand;
use crate::task::spawn_guarded;
use crate::webhook::WebHookHandler;

// ============================================================================
// Registration
// ============================================================================

/// The roles a set of handlers play, for [`Mux::register`].
///
/// One value may play several roles; pass clones of the same `Arc`:
///
/// ```rust,ignore
/// let karma = Arc::new(Karma::default());
/// mux.register(
///     Registration::new()
///         .hears(karma.clone())
///         .command(karma.clone())
///         .background(karma),
/// )?;
/// ```
#[derive(Default)]
pub struct Registration {
    raw: Vec<Arc<dyn Handler>>,
    hears: Vec<Arc<dyn HearsHandler>>,
    background: Vec<Arc<dyn BackgroundHandler>>,
    webhooks: Vec<Arc<dyn WebHookHandler>>,
    commands: Vec<Arc<dyn Commander>>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(mut self, handler: Arc<dyn Handler>) -> Self {
        self.raw.push(handler);
        self
    }

    pub fn hears(mut self, handler: Arc<dyn HearsHandler>) -> Self {
        self.hears.push(handler);
        self
    }

    pub fn background(mut self, handler: Arc<dyn BackgroundHandler>) -> Self {
        self.background.push(handler);
        self
    }

    pub fn webhook(mut self, handler: Arc<dyn WebHookHandler>) -> Self {
        self.webhooks.push(handler);
        self
    }

    pub fn command(mut self, command: Arc<dyn Commander>) -> Self {
        self.commands.push(command);
        self
    }
}

// ============================================================================
// Mux
// ============================================================================

/// Hears handlers sharing one pattern.
struct HearsEntry {
    pattern: Regex,
    handlers: Vec<Arc<dyn HearsHandler>>,
}

struct Registry {
    to_bot: Arc<dyn Handler>,
    raw: Vec<Arc<dyn Handler>>,
    background: Vec<Arc<dyn BackgroundHandler>>,
    /// In order of first registration of each pattern.
    hears: Vec<HearsEntry>,
    webhooks: BTreeMap<String, Arc<dyn WebHookHandler>>,
    base_url: Option<Url>,
}

/// Routes messages to raw, to-bot, hears and background handlers.
///
/// Registries sit behind one reader/writer lock; dispatch only takes the
/// read side, and never holds it across an `.await`.
pub struct Mux {
    name: String,
    description: String,
    store: Arc<dyn Storer>,
    commands: CommandSet,
    registry: RwLock<Registry>,
}

impl Mux {
    /// Creates a router whose to-bot handler is its own command set.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let commands = CommandSet::new();
        let to_bot: Arc<dyn Handler> = Arc::new(commands.clone());

        Self {
            name: name.into(),
            description: description.into(),
            store: Arc::new(MemoryStore::new()),
            commands,
            registry: RwLock::new(Registry {
                to_bot,
                raw: Vec::new(),
                background: Vec::new(),
                hears: Vec::new(),
                webhooks: BTreeMap::new(),
                base_url: None,
            }),
        }
    }

    /// Uses `store` for properties of messages that arrive without one.
    pub fn with_store(mut self, store: Arc<dyn Storer>) -> Self {
        self.store = store;
        self
    }

    /// Sets the URL webhooks are published under.
    pub fn with_base_url(self, base: Url) -> Self {
        self.set_url(base);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command set consulted by the default to-bot handler.
    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    pub fn store(&self) -> &Arc<dyn Storer> {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers every handler in `registration`, in the roles it names.
    pub fn register(&self, registration: Registration) -> MuxResult<()> {
        for command in registration.commands {
            self.commands.add(command)?;
        }
        for webhook in registration.webhooks {
            self.insert_webhook(webhook)?;
        }

        let mut reg = self.registry.write();
        for handler in registration.raw {
            debug!(mux = %self.name, handler = %handler.describe().0, "Registered raw handler");
            reg.raw.push(handler);
        }
        for handler in registration.background {
            debug!(mux = %self.name, handler = %handler.describe().0, "Registered background handler");
            reg.background.push(handler);
        }
        for handler in registration.hears {
            Self::insert_hears(&mut reg, handler);
        }
        Ok(())
    }

    pub fn add_raw(&self, handler: impl Handler + 'static) {
        self.registry.write().raw.push(Arc::new(handler));
    }

    pub fn add_hears(&self, handler: impl HearsHandler + 'static) {
        Self::insert_hears(&mut self.registry.write(), Arc::new(handler));
    }

    pub fn add_background(&self, handler: impl BackgroundHandler + 'static) {
        self.registry.write().background.push(Arc::new(handler));
    }

    pub fn add_webhook(&self, handler: impl WebHookHandler + 'static) -> MuxResult<()> {
        self.insert_webhook(Arc::new(handler))
    }

    pub fn add_command(&self, command: impl Commander + 'static) -> MuxResult<()> {
        Ok(self.commands.add_command(command)?)
    }

    /// Replaces the handler for messages addressed to the bot.
    pub fn set_to_bot(&self, handler: Arc<dyn Handler>) {
        debug!(mux = %self.name, handler = %handler.describe().0, "Set to-bot handler");
        self.registry.write().to_bot = handler;
    }

    /// Adds the `help` command, answering from this router.
    pub fn enable_help(self: &Arc<Self>) -> MuxResult<()> {
        let helper: Arc<dyn Helper> = Arc::clone(self) as Arc<dyn Helper>;
        self.add_command(HelpCommand::new(Arc::downgrade(&helper)))
    }

    fn insert_hears(reg: &mut Registry, handler: Arc<dyn HearsHandler>) {
        let pattern = handler.hears().clone();
        debug!(handler = %handler.describe().0, pattern = %pattern, "Registered hears handler");
        match reg
            .hears
            .iter_mut()
            .find(|e| e.pattern.as_str() == pattern.as_str())
        {
            Some(entry) => entry.handlers.push(handler),
            None => reg.hears.push(HearsEntry {
                pattern,
                handlers: vec![handler],
            }),
        }
    }

    fn insert_webhook(&self, handler: Arc<dyn WebHookHandler>) -> MuxResult<()> {
        let (name, _) = handler.describe();
        if !is_route_segment(&name) {
            return Err(MuxError::InvalidWebHookName(name));
        }
        let mut reg = self.registry.write();
        if reg.webhooks.contains_key(&name) {
            return Err(MuxError::DuplicateWebHook(name));
        }
        if let Some(base) = &reg.base_url {
            handler.set_url(hook_url(base, &self.name, &name));
        }
        debug!(mux = %self.name, webhook = %name, "Registered webhook");
        reg.webhooks.insert(name, handler);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Webhooks
    // ------------------------------------------------------------------------

    /// The URL of this router, `<base>/<name>/`, once a base is set.
    pub fn url(&self) -> Option<Url> {
        let base = self.registry.read().base_url.clone()?;
        let mut url = base.clone();
        url.set_path(&format!("{}/{}/", base.path().trim_end_matches('/'), self.name));
        Some(url)
    }

    /// Moves this router, and every webhook, under a new base URL.
    pub fn set_url(&self, base: Url) {
        let mut reg = self.registry.write();
        for (name, hook) in &reg.webhooks {
            hook.set_url(hook_url(&base, &self.name, name));
        }
        reg.base_url = Some(base);
    }

    /// Hands every webhook the chat adapter to reply through.
    pub fn set_adapter(&self, sender: Arc<dyn Sender>) {
        let hooks: Vec<_> = self.registry.read().webhooks.values().cloned().collect();
        for hook in hooks {
            hook.set_adapter(Arc::clone(&sender));
        }
    }

    /// An HTTP router serving every webhook at `/<mux>/<name>` and below.
    pub fn router(&self) -> Router {
        let hooks: Vec<_> = self
            .registry
            .read()
            .webhooks
            .iter()
            .map(|(name, hook)| (name.clone(), Arc::clone(hook)))
            .collect();

        let mut router = Router::new();
        for (name, hook) in hooks {
            let serve = move |req: Request| {
                let hook = Arc::clone(&hook);
                async move { hook.serve_http(req).await }
            };
            let base = format!("/{}/{}", self.name, name);
            router = router
                .route(&base, any(serve.clone()))
                .route(&format!("{base}/"), any(serve.clone()))
                .route(&format!("{base}/{{*rest}}"), any(serve));
        }
        router
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Starts every background handler with its own copy of `w`.
    ///
    /// The handlers run until `cancel` fires.
    pub fn start_background(
        &self,
        cancel: &CancellationToken,
        w: &ResponseWriter,
    ) -> Vec<JoinHandle<Option<()>>> {
        let handlers = self.registry.read().background.clone();
        handlers
            .into_iter()
            .map(|handler| {
                let (name, _) = handler.describe();
                debug!(mux = %self.name, handler = %name, "Starting background handler");
                let cancel = cancel.clone();
                let w = w.copy();
                spawn_guarded("background", name, async move {
                    handler.start_background(cancel, w).await
                })
            })
            .collect()
    }

    /// A copy of `m` whose store is scoped to `handler`.
    fn message_for(&self, m: &Message, handler: &str) -> Message {
        let mut copy = m.copy();
        let base = m
            .store
            .clone()
            .unwrap_or_else(|| prefixed(Arc::clone(&self.store), [self.name.clone()]));
        copy.store = Some(prefixed(base, [handler.to_string()]));
        copy
    }

    async fn dispatch(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: Message,
    ) -> HandlerResult {
        let (raw, to_bot, hears) = {
            let reg = self.registry.read();
            let hears: Vec<_> = reg
                .hears
                .iter()
                .map(|e| (e.pattern.clone(), e.handlers.clone()))
                .collect();
            (reg.raw.clone(), Arc::clone(&reg.to_bot), hears)
        };

        for handler in raw {
            let (name, _) = handler.describe();
            let cancel = cancel.clone();
            let mut w = w.clone();
            let m = self.message_for(&m, &name);
            spawn_guarded("raw", name.clone(), async move {
                if let Err(e) = handler.process_message(&cancel, &mut w, m).await {
                    warn!(handler = %name, error = %e, "Raw handler failed");
                }
            });
        }

        let mut residual: Option<BoxError> = None;

        if m.to_bot && !m.text.trim().is_empty() {
            let (name, _) = to_bot.describe();
            debug!(handler = %name, "Dispatching to bot");
            match to_bot.process_message(cancel, w, self.message_for(&m, &name)).await {
                Ok(Outcome::SkipHears) => {
                    debug!(handler = %name, "Skipping hears");
                    return Ok(Outcome::Handled);
                }
                Ok(_) => {}
                Err(err) => {
                    if let Some(CommandError::Usage(text)) = as_command_error(&err) {
                        w.write_str(text.clone()).await?;
                        return Ok(Outcome::Handled);
                    }
                    residual = Some(err);
                }
            }
        }

        let mut heard = false;
        for (pattern, handlers) in hears {
            let groups = submatches(&pattern, &m.text);
            if groups.is_empty() {
                continue;
            }
            heard = true;

            for handler in handlers {
                let (name, _) = handler.describe();
                debug!(handler = %name, pattern = %pattern, "Pattern matched");
                let mut hw = w.clone();
                let copy = self.message_for(&m, &name);
                if let Err(err) = handler.heard(cancel, &mut hw, copy, groups.clone()).await {
                    warn!(handler = %name, error = %err, "Hears handler failed");
                    residual = Some(err);
                }
            }
        }

        match residual {
            Some(err)
                if heard && as_command_error(&err).is_some_and(CommandError::is_unknown_command) =>
            {
                debug!("Unknown command answered by a hears handler");
                Ok(Outcome::Handled)
            }
            Some(err) => {
                w.write_str(format!("error, {err}")).await?;
                Err(err)
            }
            None => Ok(Outcome::Handled),
        }
    }

    /// Help text: an overview of every handler, or the usage of the command
    /// named by the arguments of `m`.
    pub async fn help(
        &self,
        cancel: &CancellationToken,
        m: &mut CommandMessage,
    ) -> Result<String, BoxError> {
        if !m.args()?.is_empty() {
            return self.commands.help(cancel, m).await;
        }

        let mut out = String::new();
        if !self.description.is_empty() {
            out.push_str(&self.description);
            out.push_str("\n\n");
        }
        if !self.commands.is_empty() {
            out.push_str(&self.commands.summary());
        }

        let reg = self.registry.read();
        let mut hears = Vec::new();
        for entry in &reg.hears {
            for handler in &entry.handlers {
                let (name, desc) = handler.describe();
                hears.push(format!("{name} `{}` - {desc}", entry.pattern.as_str()));
            }
        }
        section(&mut out, "Hears", hears);
        section(
            &mut out,
            "Background",
            reg.background.iter().map(|h| described(h.describe())).collect(),
        );
        section(
            &mut out,
            "Raw",
            reg.raw.iter().map(|h| described(h.describe())).collect(),
        );
        section(
            &mut out,
            "Webhooks",
            reg.webhooks
                .values()
                .map(|h| {
                    let (name, desc) = h.describe();
                    match h.url() {
                        Some(url) => format!("{name} ({url}) - {desc}"),
                        None => format!("{name} - {desc}"),
                    }
                })
                .collect(),
        );
        Ok(out)
    }
}

fn hook_url(base: &Url, mux: &str, name: &str) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("{}/{mux}/{name}/", base.path().trim_end_matches('/')));
    url
}

/// Whether `name` can sit in a router path as a literal segment.
fn is_route_segment(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

fn described((name, desc): (String, String)) -> String {
    format!("{name} - {desc}")
}

fn section(out: &mut String, title: &str, lines: Vec<String>) {
    if lines.is_empty() {
        return;
    }
    out.push_str(title);
    out.push_str(":\n");
    for line in lines {
        out.push_str("  ");
        out.push_str(&line);
        out.push('\n');
    }
}

impl Describe for Mux {
    fn describe(&self) -> (String, String) {
        (self.name.clone(), self.description.clone())
    }
}

#[async_trait]
impl Handler for Mux {
    async fn process_message(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: Message,
    ) -> HandlerResult {
        let span = debug_span!("dispatch", mux = %self.name, from = %m.from, to_bot = m.to_bot);
        self.dispatch(cancel, w, m).instrument(span).await
    }
}

#[async_trait]
impl Helper for Mux {
    async fn help(
        &self,
        cancel: &CancellationToken,
        m: &mut CommandMessage,
    ) -> Result<String, BoxError> {
        Mux::help(self, cancel, m).await
    }
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = self.registry.read();
        f.debug_struct("Mux")
            .field("name", &self.name)
            .field("commands", &self.commands.names())
            .field("raw", &reg.raw.len())
            .field("hears", &reg.hears.len())
            .field("background", &reg.background.len())
            .field("webhooks", &reg.webhooks.keys().collect::<Vec<_>>())
            .finish()
    }
}
