//! HTTP endpoints that can talk back through the bot's chat adapter.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::warn;
use url::Url;

use hark_core::{Message, ResponseWriter, Sender};

use crate::handler::Describe;

/// A handler reachable over HTTP.
///
/// The [`Mux`](crate::Mux) assigns each webhook its URL, derived from the
/// mux name and the handler name, and hands it the primary chat adapter so
/// requests can produce chat messages.
#[async_trait]
pub trait WebHookHandler: Describe + Send + Sync {
    /// The public URL of this hook, once assigned.
    fn url(&self) -> Option<Url>;

    fn set_url(&self, url: Url);

    /// Sets the chat adapter replies are delivered through.
    fn set_adapter(&self, sender: Arc<dyn Sender>);

    async fn serve_http(&self, req: Request) -> Response;
}

type WebHookCallback = Arc<dyn Fn(ResponseWriter, Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// A [`WebHookHandler`] backed by a closure. See [`webhook_fn`].
pub struct WebHookFn {
    name: String,
    description: String,
    url: RwLock<Option<Url>>,
    sender: RwLock<Option<Arc<dyn Sender>>>,
    f: WebHookCallback,
}

/// Wraps a closure as a [`WebHookHandler`].
///
/// The closure gets a writer bound to the bot's primary adapter; set its
/// channel or recipient before writing.
///
/// ```rust,ignore
/// let notify = webhook_fn("notify", "Posts to #ops", |mut w, req| async move {
///     let body = axum::body::to_bytes(req.into_body(), 64 * 1024).await.unwrap_or_default();
///     w.set_channel("#ops");
///     let _ = w.write(&body).await;
///     StatusCode::NO_CONTENT.into_response()
/// });
/// ```
pub fn webhook_fn<F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> WebHookFn
where
    F: Fn(ResponseWriter, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    WebHookFn {
        name: name.into(),
        description: description.into(),
        url: RwLock::new(None),
        sender: RwLock::new(None),
        f: Arc::new(move |w, req| f(w, req).boxed()),
    }
}

impl Describe for WebHookFn {
    fn describe(&self) -> (String, String) {
        (self.name.clone(), self.description.clone())
    }
}

#[async_trait]
impl WebHookHandler for WebHookFn {
    fn url(&self) -> Option<Url> {
        self.url.read().clone()
    }

    fn set_url(&self, url: Url) {
        *self.url.write() = Some(url);
    }

    fn set_adapter(&self, sender: Arc<dyn Sender>) {
        *self.sender.write() = Some(sender);
    }

    async fn serve_http(&self, req: Request) -> Response {
        let sender = self.sender.read().clone();
        let w = match sender {
            Some(sender) => {
                let adapter = sender.name().to_string();
                ResponseWriter::new(sender, Message::default(), adapter)
            }
            None => {
                warn!(webhook = %self.name, "No adapter set, output is discarded");
                ResponseWriter::null(Message::default())
            }
        };
        (self.f)(w, req).await
    }
}
