//! The dispatch loop tying adapters to a router.
//!
//! ```text
//! adapter A ──receive──┐
//! adapter B ──receive──┼──▶ queue ──▶ one task per message ──▶ Mux
//! adapter C ──receive──┘
//! ```
//!
//! Each adapter is read by its own task; each message is routed in its own
//! task, with a [`ResponseWriter`] that answers through the adapter the
//! message came from. A panic in any of those tasks is logged and contained.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hark_core::{BoxedAdapter, Message, ResponseWriter, Sender};
use hark_framework::{Handler, Mux, spawn_guarded};

use crate::error::{RuntimeError, RuntimeResult};

/// Feeds messages from a set of adapters through a [`Mux`].
pub struct Bot {
    mux: Arc<Mux>,
}

impl Bot {
    pub fn new(mux: Arc<Mux>) -> Self {
        Self { mux }
    }

    pub fn mux(&self) -> &Arc<Mux> {
        &self.mux
    }

    /// Serves `adapters` until all of them have ended or `cancel` fires.
    ///
    /// The first adapter is the primary one: background handlers and
    /// webhooks write through it. Messages already being routed when the
    /// adapters end are allowed to finish; background handlers are then
    /// cancelled and awaited.
    pub async fn listen_and_serve(
        &self,
        cancel: CancellationToken,
        adapters: Vec<BoxedAdapter>,
    ) -> RuntimeResult<()> {
        let Some(primary) = adapters.first() else {
            return Err(RuntimeError::NoAdapters);
        };
        let cancel = cancel.child_token();

        let primary_name = primary.name().to_string();
        let primary: Arc<dyn Sender> = Arc::clone(primary).as_sender();
        self.mux.set_adapter(Arc::clone(&primary));
        let background_writer = ResponseWriter::new(primary, Message::default(), &primary_name);
        let background = self.mux.start_background(&cancel, &background_writer);

        let (tx, mut rx) = mpsc::unbounded_channel();
        for adapter in adapters {
            let name = adapter.name().to_string();
            info!(mux = %self.mux.name(), adapter = %name, "Listening");
            spawn_guarded("receive", name, receive(adapter, tx.clone(), cancel.clone()));
        }
        drop(tx);

        let mut in_flight: Vec<JoinHandle<Option<()>>> = Vec::new();
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => None,
                next = rx.recv() => next,
            };
            let Some((sender, message)) = next else {
                break;
            };
            in_flight.retain(|task| !task.is_finished());
            in_flight.push(self.dispatch(&cancel, sender, message));
        }

        debug!(mux = %self.mux.name(), pending = in_flight.len(), "Draining dispatches");
        for task in in_flight {
            let _ = task.await;
        }
        cancel.cancel();
        for task in background {
            let _ = task.await;
        }
        info!(mux = %self.mux.name(), "Stopped");
        Ok(())
    }

    fn dispatch(
        &self,
        cancel: &CancellationToken,
        sender: Arc<dyn Sender>,
        message: Message,
    ) -> JoinHandle<Option<()>> {
        let mux = Arc::clone(&self.mux);
        let cancel = cancel.clone();
        let mut w = ResponseWriter::for_message(sender, &message);
        spawn_guarded("dispatch", self.mux.name().to_string(), async move {
            if let Err(err) = mux.process_message(&cancel, &mut w, message).await {
                debug!(mux = %mux.name(), error = %err, "Message not handled");
            }
        })
    }
}

/// Forwards everything `adapter` receives to `tx`, tagged with the sender
/// to reply through.
async fn receive(
    adapter: BoxedAdapter,
    tx: mpsc::UnboundedSender<(Arc<dyn Sender>, Message)>,
    cancel: CancellationToken,
) {
    let name = adapter.name().to_string();
    let sender = Arc::clone(&adapter).as_sender();
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return,
            next = adapter.receive() => next,
        };
        let Some(message) = next else {
            info!(adapter = %name, "Adapter closed");
            return;
        };
        debug!(adapter = %name, from = %message.from, channel = %message.channel, "Received message");
        if tx.send((Arc::clone(&sender), message)).is_err() {
            warn!(adapter = %name, "Dispatch loop gone, dropping message");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hark_core::testing::TestAdapter;
    use hark_framework::{Outcome, background_fn, handler_fn, ping};

    use super::*;

    fn bot() -> Bot {
        let mux = Mux::new("bot", "");
        mux.add_command(ping()).unwrap();
        Bot::new(Arc::new(mux))
    }

    #[tokio::test]
    async fn test_replies_through_source_adapter() {
        let (a, mut a_handle) = TestAdapter::named("a");
        let (b, mut b_handle) = TestAdapter::named("b");
        let adapters: Vec<BoxedAdapter> = vec![Arc::new(a), Arc::new(b)];

        let bot = bot();
        let serve = tokio::spawn(async move {
            bot.listen_and_serve(CancellationToken::new(), adapters).await
        });

        b_handle.push(Message::to_bot("ping").with_from("bob").with_channel("#b"));
        let reply = b_handle.next_reply().await.unwrap();
        assert_eq!(reply.text, "PONG!");
        assert_eq!(reply.channel, "#b");
        assert!(a_handle.replies().is_empty());

        a_handle.close();
        b_handle.close();
        tokio_test::assert_ok!(serve.await.unwrap());
    }

    #[tokio::test]
    async fn test_no_adapters() {
        let result = bot()
            .listen_and_serve(CancellationToken::new(), Vec::new())
            .await;
        assert!(matches!(result, Err(RuntimeError::NoAdapters)));
    }

    #[tokio::test]
    async fn test_cancel_stops_loop() {
        let (adapter, _handle) = TestAdapter::pair();
        let cancel = CancellationToken::new();
        let bot = bot();

        let serve = {
            let cancel = cancel.clone();
            tokio::spawn(async move { bot.listen_and_serve(cancel, vec![Arc::new(adapter)]).await })
        };
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), serve).await;
        tokio_test::assert_ok!(result.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_background_writes_to_primary_and_stops() {
        let (adapter, mut handle) = TestAdapter::pair();
        let mux = Mux::new("bot", "");
        mux.add_background(background_fn("hello", "", |cancel, mut w| async move {
            w.set_channel("#general");
            let _ = w.write_str("hello").await;
            cancel.cancelled().await;
        }));
        let bot = Bot::new(Arc::new(mux));

        let serve = tokio::spawn(async move {
            bot.listen_and_serve(CancellationToken::new(), vec![Arc::new(adapter)])
                .await
        });

        let greeting = handle.next_reply().await.unwrap();
        assert_eq!(greeting.text, "hello");
        assert_eq!(greeting.channel, "#general");

        handle.close();
        let result = tokio::time::timeout(Duration::from_secs(1), serve).await;
        tokio_test::assert_ok!(result.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_stop_loop() {
        let (adapter, mut handle) = TestAdapter::pair();
        let mux = Mux::new("bot", "");
        mux.add_command(ping()).unwrap();
        mux.add_raw(handler_fn("boom", "", |_cancel, _w, m: Message| async move {
            if m.text == "boom" {
                panic!("raw handler exploded");
            }
            Ok(Outcome::Handled)
        }));
        let bot = Bot::new(Arc::new(mux));

        let serve = tokio::spawn(async move {
            bot.listen_and_serve(CancellationToken::new(), vec![Arc::new(adapter)])
                .await
        });

        handle.push(Message::new("boom"));
        handle.push(Message::to_bot("ping"));
        assert_eq!(handle.next_reply().await.unwrap().text, "PONG!");

        handle.close();
        tokio_test::assert_ok!(serve.await.unwrap());
    }
}
