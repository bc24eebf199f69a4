//! Runtime orchestration for hark bots.
//!
//! [`HarkRuntime`] builds the router from configuration, holds the chat
//! adapters, and runs the dispatch loop next to the optional webhook HTTP
//! listener until a shutdown signal arrives.
//!
//! ```rust,ignore
//! let runtime = HarkRuntime::new()?;
//! runtime.mux().add_command(ping())?;
//! runtime.add_adapter(Arc::new(MyAdapter::connect().await?));
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

use hark_core::{BoxedAdapter, MemoryStore, Storer, prefixed};
use hark_framework::{Alias, Handler, Mux};

use crate::bot::Bot;
use crate::config::{ConfigError, ConfigLoader, HarkConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// The top-level runtime: one router, any number of adapters.
pub struct HarkRuntime {
    config: HarkConfig,
    mux: Arc<Mux>,
    adapters: Mutex<Vec<BoxedAdapter>>,
    cancel: CancellationToken,
}

impl HarkRuntime {
    /// Loads configuration from the default locations and builds a runtime.
    pub fn new() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds a runtime from already loaded configuration, keeping
    /// properties in memory.
    pub fn from_config(config: HarkConfig) -> RuntimeResult<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Builds a runtime whose handlers keep their properties in `store`.
    pub fn with_store(config: HarkConfig, store: Arc<dyn Storer>) -> RuntimeResult<Self> {
        config.validate()?;
        logging::init_from_config(&config.logging);

        let base_url = Url::parse(&config.webhook.base_url)
            .map_err(|e| ConfigError::invalid_url(&config.webhook.base_url, e.to_string()))?;
        let mux = Arc::new(
            Mux::new(config.bot.name.clone(), config.bot.description.clone())
                .with_store(Arc::clone(&store))
                .with_base_url(base_url),
        );

        if config.bot.help {
            mux.enable_help()?;
        }
        if config.bot.aliases {
            let up: Arc<dyn Handler> = Arc::new(mux.commands().clone());
            let aliases = prefixed(store, [config.bot.alias_prefix.clone()]);
            let alias = Alias::new(up, mux.commands(), aliases)?;
            mux.set_to_bot(Arc::new(alias));
        }

        info!(
            bot = %config.bot.name,
            help = config.bot.help,
            aliases = config.bot.aliases,
            webhooks = config.webhook.enabled,
            "Runtime created"
        );

        Ok(Self {
            config,
            mux,
            adapters: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &HarkConfig {
        &self.config
    }

    /// The router. Register handlers here before calling [`run`](Self::run).
    pub fn mux(&self) -> &Arc<Mux> {
        &self.mux
    }

    /// Adds a chat adapter. The first one added is the primary adapter.
    pub fn add_adapter(&self, adapter: BoxedAdapter) {
        info!(adapter = %adapter.name(), "Adapter added");
        self.adapters.lock().push(adapter);
    }

    /// Stops a running runtime.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs until Ctrl+C, SIGTERM, [`shutdown`](Self::shutdown), or every
    /// adapter has closed.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("hark is running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes, [`shutdown`](Self::shutdown) is
    /// called, or every adapter has closed.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let adapters = self.adapters.lock().clone();
        if adapters.is_empty() {
            return Err(RuntimeError::NoAdapters);
        }

        let cancel = self.cancel.child_token();
        let server = if self.config.webhook.enabled {
            Some(self.serve_webhooks(cancel.clone()).await?)
        } else {
            None
        };

        let bot = Bot::new(Arc::clone(&self.mux));
        let mut serving = pin!(bot.listen_and_serve(cancel.clone(), adapters));
        let finished = tokio::select! {
            result = &mut serving => Some(result),
            () = shutdown => None,
        };
        let result = match finished {
            Some(result) => result,
            None => {
                info!("Shutting down");
                cancel.cancel();
                serving.await
            }
        };

        cancel.cancel();
        if let Some(server) = server {
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Webhook server failed"),
                Err(e) => error!(error = %e, "Webhook server task failed"),
            }
        }
        info!("hark stopped");
        result
    }

    /// Binds the webhook listener and serves the router's webhooks until
    /// `cancel` fires.
    async fn serve_webhooks(
        &self,
        cancel: CancellationToken,
    ) -> RuntimeResult<JoinHandle<std::io::Result<()>>> {
        let addr: SocketAddr = self
            .config
            .webhook
            .listen
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                ConfigError::invalid_address(&self.config.webhook.listen, e.to_string())
            })?;
        let listener = TcpListener::bind(addr).await?;
        let router = self.mux.router();
        info!(
            addr = %listener.local_addr()?,
            url = %self.mux.url().map(|u| u.to_string()).unwrap_or_default(),
            "Serving webhooks"
        );

        Ok(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
        }))
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to register SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            () = ctrl_c => info!("Received Ctrl+C"),
            () = terminate => info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        info!("Received Ctrl+C");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builds a [`HarkRuntime`] from layered configuration.
///
/// ```rust,ignore
/// let runtime = HarkRuntime::builder()
///     .config_file("deploy/hark.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    store: Option<Arc<dyn Storer>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            store: None,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration set in code. See [`ConfigLoader::merge`].
    pub fn merge(mut self, config: HarkConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Keeps handler properties in `store` instead of memory.
    pub fn store(mut self, store: Arc<dyn Storer>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> RuntimeResult<HarkRuntime> {
        let config = self.config_loader.load()?;
        match self.store {
            Some(store) => HarkRuntime::with_store(config, store),
            None => HarkRuntime::from_config(config),
        }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hark_core::Message;
    use hark_core::testing::TestAdapter;
    use hark_framework::ping;

    use super::*;
    use crate::config::BotConfig;

    fn runtime() -> HarkRuntime {
        let runtime = HarkRuntime::from_config(HarkConfig::default()).unwrap();
        runtime.mux().add_command(ping()).unwrap();
        runtime
    }

    #[tokio::test]
    async fn test_no_adapters() {
        let result = runtime().run_until(async {}).await;
        assert!(matches!(result, Err(RuntimeError::NoAdapters)));
    }

    #[tokio::test]
    async fn test_help_and_alias_are_registered() {
        let runtime = runtime();
        let names = runtime.mux().commands().names();
        assert!(names.contains(&"help".to_string()));
        assert!(names.contains(&"alias".to_string()));
    }

    #[tokio::test]
    async fn test_builtins_can_be_disabled() {
        let config = HarkConfig {
            bot: BotConfig {
                help: false,
                aliases: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let runtime = HarkRuntime::from_config(config).unwrap();
        assert!(runtime.mux().commands().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = HarkConfig::default();
        config.bot.name = String::new();
        assert!(matches!(
            HarkRuntime::from_config(config),
            Err(RuntimeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_runs_until_adapters_close() {
        let runtime = runtime();
        let (adapter, mut handle) = TestAdapter::pair();
        runtime.add_adapter(Arc::new(adapter));

        let serving = runtime.run_until(std::future::pending());
        let client = async {
            handle.push(Message::to_bot("alias -g pp ping").with_from("alice"));
            let defined = handle.next_reply().await.unwrap();
            assert_eq!(defined.text, "Alias pp -> ping (set globally)");

            handle.push(Message::to_bot("pp").with_from("bob"));
            assert_eq!(handle.next_reply().await.unwrap().text, "PONG!");
            handle.close();
        };

        let (result, ()) = tokio::join!(serving, client);
        tokio_test::assert_ok!(result);
    }

    #[tokio::test]
    async fn test_shutdown_future_stops_runtime() {
        let runtime = runtime();
        let (adapter, _handle) = TestAdapter::pair();
        runtime.add_adapter(Arc::new(adapter));

        let stop = tokio::time::sleep(Duration::from_millis(20));
        let result = tokio::time::timeout(Duration::from_secs(1), runtime.run_until(stop)).await;
        tokio_test::assert_ok!(result.unwrap());
    }

    #[tokio::test]
    async fn test_shutdown_handle() {
        let runtime = Arc::new(runtime());
        let (adapter, _handle) = TestAdapter::pair();
        runtime.add_adapter(Arc::new(adapter));

        let serving = {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move { runtime.run_until(std::future::pending()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        runtime.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(1), serving).await;
        tokio_test::assert_ok!(result.unwrap().unwrap());
    }
}
