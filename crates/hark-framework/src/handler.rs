//! Handler capabilities and function wrappers.
//!
//! A handler plays one or more roles in a [`Mux`](crate::Mux), declared
//! explicitly when it is registered:
//!
//! | role | trait | runs |
//! |---|---|---|
//! | raw | [`Handler`] | on every message, concurrently |
//! | to-bot | [`Handler`] | on messages addressed to the bot |
//! | hears | [`HearsHandler`] | when its pattern matches the text |
//! | background | [`BackgroundHandler`] | once, for the life of the bot |
//! | command | [`Commander`](crate::Commander) | when the first argument names it |
//!
//! Closures become handlers through [`handler_fn`], [`hears_fn`] and
//! [`background_fn`]:
//!
//! ```rust,ignore
//! let tableflip = hears_fn(
//!     "tableflip",
//!     "Flips tables",
//!     Regex::new(r"tableflip")?,
//!     |_cancel, mut w, _m, _groups| async move {
//!         w.write_str("(╯°□°）╯︵ ┻━┻").await?;
//!         Ok(Outcome::Handled)
//!     },
//! );
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use hark_core::{Message, ResponseWriter};

use crate::command::CommandMessage;
use crate::error::{BoxError, HandlerResult};

// ============================================================================
// Capabilities
// ============================================================================

/// Name and one-line description, used for help output and registry keys.
pub trait Describe {
    fn describe(&self) -> (String, String);
}

/// Processes whole messages. Used for raw and to-bot handlers.
#[async_trait]
pub trait Handler: Describe + Send + Sync {
    async fn process_message(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: Message,
    ) -> HandlerResult;
}

/// Runs when its regular expression matches the message text.
#[async_trait]
pub trait HearsHandler: Describe + Send + Sync {
    fn hears(&self) -> &Regex;

    /// Called once per message with every match of [`hears`](Self::hears).
    ///
    /// Each entry of `submatches` is one match: the whole match followed by
    /// its capture groups, with unmatched groups as empty strings.
    async fn heard(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: Message,
        submatches: Vec<Vec<String>>,
    ) -> HandlerResult;
}

/// Long-running task started once when the bot starts.
///
/// Implementations should return promptly once `cancel` fires.
#[async_trait]
pub trait BackgroundHandler: Describe + Send + Sync {
    async fn start_background(&self, cancel: CancellationToken, w: ResponseWriter);
}

/// Something that can produce help text for a command line.
#[async_trait]
pub trait Helper: Send + Sync {
    async fn help(
        &self,
        cancel: &CancellationToken,
        m: &mut CommandMessage,
    ) -> Result<String, BoxError>;
}

/// Every match of `re` in `text`, as rows of whole match plus groups.
pub fn submatches(re: &Regex, text: &str) -> Vec<Vec<String>> {
    re.captures_iter(text)
        .map(|caps| {
            caps.iter()
                .map(|g| g.map(|g| g.as_str().to_string()).unwrap_or_default())
                .collect()
        })
        .collect()
}

// ============================================================================
// Function wrappers
// ============================================================================

type MessageCallback =
    Arc<dyn Fn(CancellationToken, ResponseWriter, Message) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

type HearsCallback = Arc<
    dyn Fn(CancellationToken, ResponseWriter, Message, Vec<Vec<String>>) -> BoxFuture<'static, HandlerResult>
        + Send
        + Sync,
>;

type BackgroundCallback =
    Arc<dyn Fn(CancellationToken, ResponseWriter) -> BoxFuture<'static, ()> + Send + Sync>;

/// A [`Handler`] backed by a closure. See [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn {
    name: String,
    description: String,
    f: MessageCallback,
}

/// Wraps a closure as a [`Handler`].
///
/// The closure receives owned copies of the token, writer and message, so
/// its future may outlive the dispatch that started it.
pub fn handler_fn<F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> HandlerFn
where
    F: Fn(CancellationToken, ResponseWriter, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn {
        name: name.into(),
        description: description.into(),
        f: Arc::new(move |cancel, w, m| f(cancel, w, m).boxed()),
    }
}

impl Describe for HandlerFn {
    fn describe(&self) -> (String, String) {
        (self.name.clone(), self.description.clone())
    }
}

#[async_trait]
impl Handler for HandlerFn {
    async fn process_message(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: Message,
    ) -> HandlerResult {
        (self.f)(cancel.clone(), w.clone(), m).await
    }
}

/// A [`HearsHandler`] backed by a closure. See [`hears_fn`].
#[derive(Clone)]
pub struct HearsFn {
    name: String,
    description: String,
    pattern: Regex,
    f: HearsCallback,
}

/// Wraps a closure as a [`HearsHandler`] listening for `pattern`.
pub fn hears_fn<F, Fut>(
    name: impl Into<String>,
    description: impl Into<String>,
    pattern: Regex,
    f: F,
) -> HearsFn
where
    F: Fn(CancellationToken, ResponseWriter, Message, Vec<Vec<String>>) -> Fut
        + Send
        + Sync
        + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HearsFn {
        name: name.into(),
        description: description.into(),
        pattern,
        f: Arc::new(move |cancel, w, m, groups| f(cancel, w, m, groups).boxed()),
    }
}

impl Describe for HearsFn {
    fn describe(&self) -> (String, String) {
        (self.name.clone(), self.description.clone())
    }
}

#[async_trait]
impl HearsHandler for HearsFn {
    fn hears(&self) -> &Regex {
        &self.pattern
    }

    async fn heard(
        &self,
        cancel: &CancellationToken,
        w: &mut ResponseWriter,
        m: Message,
        submatches: Vec<Vec<String>>,
    ) -> HandlerResult {
        (self.f)(cancel.clone(), w.clone(), m, submatches).await
    }
}

/// A [`BackgroundHandler`] backed by a closure. See [`background_fn`].
#[derive(Clone)]
pub struct BackgroundFn {
    name: String,
    description: String,
    f: BackgroundCallback,
}

/// Wraps a closure as a [`BackgroundHandler`].
pub fn background_fn<F, Fut>(
    name: impl Into<String>,
    description: impl Into<String>,
    f: F,
) -> BackgroundFn
where
    F: Fn(CancellationToken, ResponseWriter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    BackgroundFn {
        name: name.into(),
        description: description.into(),
        f: Arc::new(move |cancel, w| f(cancel, w).boxed()),
    }
}

impl Describe for BackgroundFn {
    fn describe(&self) -> (String, String) {
        (self.name.clone(), self.description.clone())
    }
}

#[async_trait]
impl BackgroundHandler for BackgroundFn {
    async fn start_background(&self, cancel: CancellationToken, w: ResponseWriter) {
        (self.f)(cancel, w).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hark_core::testing::RecordingSender;

    use super::*;
    use crate::error::Outcome;

    #[test]
    fn test_submatches_fill_unmatched_groups() {
        let re = Regex::new(r"(\d+)(x)?").unwrap();
        assert_eq!(
            submatches(&re, "12x and 7"),
            vec![vec!["12x", "12", "x"], vec!["7", "7", ""]]
        );
        assert!(submatches(&re, "none").is_empty());
    }

    #[tokio::test]
    async fn test_handler_fn_replies() {
        let h = handler_fn("echo", "Echoes text", |_cancel, mut w, m: Message| async move {
            w.write_str(m.text.to_uppercase()).await?;
            Ok(Outcome::Handled)
        });
        assert_eq!(h.describe().0, "echo");

        let sender = Arc::new(RecordingSender::new());
        let mut w = ResponseWriter::new(sender.clone(), Message::default(), "test");
        h.process_message(&CancellationToken::new(), &mut w, Message::new("hi"))
            .await
            .unwrap();
        assert_eq!(sender.texts(), ["HI"]);
    }

    #[tokio::test]
    async fn test_hears_fn_gets_groups() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let h = hears_fn(
            "count",
            "",
            Regex::new(r"n=(\d)").unwrap(),
            move |_cancel, _w, _m, groups: Vec<Vec<String>>| {
                let counter = Arc::clone(&counter);
                async move {
                    for row in groups {
                        counter.fetch_add(row[1].parse::<usize>()?, Ordering::SeqCst);
                    }
                    Ok::<_, BoxError>(Outcome::Handled)
                }
            },
        );

        let groups = submatches(h.hears(), "n=2 n=3");
        let mut w = ResponseWriter::null(Message::default());
        h.heard(&CancellationToken::new(), &mut w, Message::new("n=2 n=3"), groups)
            .await
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_background_fn_stops_on_cancel() {
        let h = background_fn("ticker", "Waits for shutdown", |cancel: CancellationToken, _w| async move {
            cancel.cancelled().await;
        });
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                h.start_background(cancel, ResponseWriter::null(Message::default()))
                    .await
            }
        });
        cancel.cancel();
        tokio_test::assert_ok!(task.await);
    }
}
