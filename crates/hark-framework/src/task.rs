//! Spawning handler work as isolated tasks.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::error;

/// Spawns `fut` on the current runtime, catching any panic it raises.
///
/// A panic is logged with the handler `kind` and `name` and otherwise
/// swallowed, so one broken handler cannot take down the dispatcher. The
/// returned handle yields `None` if the task panicked.
pub fn spawn_guarded<F>(kind: &'static str, name: String, fut: F) -> JoinHandle<Option<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(async move {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(output) => Some(output),
            Err(panic) => {
                error!(
                    kind,
                    handler = %name,
                    panic = %panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                None
            }
        }
    })
}

/// Best-effort text of a panic payload.
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_output_is_returned() {
        let handle = spawn_guarded("raw", "ok".into(), async { 42 });
        assert_eq!(handle.await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let handle = spawn_guarded("raw", "boom".into(), async {
            panic!("boom");
        });
        assert_eq!(handle.await.unwrap(), None::<()>);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
