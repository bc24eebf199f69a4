//! Scope-aware property lookups for one channel and user.

use std::sync::Arc;

use tracing::trace;

use super::{Scope, Storer, scoped};
use crate::error::{StoreError, StoreResult};
use crate::message::Message;

/// A view over a [`Storer`] for one channel/user pair.
///
/// Values set at a narrower scope shadow the same key at broader scopes:
/// [`get`](Self::get) walks [`Scope::ORDER`] and returns the first hit.
///
/// ```rust,ignore
/// let props = PropertyStore::for_message(store, &message);
/// props.set(Scope::Global, "greeting", "hello").await?;
/// props.set(Scope::ChannelUser, "greeting", "yo").await?;
/// assert_eq!(props.get("greeting").await?.as_deref(), Some("yo"));
/// ```
#[derive(Clone)]
pub struct PropertyStore {
    store: Arc<dyn Storer>,
    channel: String,
    user: String,
}

impl PropertyStore {
    pub fn new(store: Arc<dyn Storer>, channel: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            store,
            channel: channel.into(),
            user: user.into(),
        }
    }

    /// Properties for the channel and sender of `message`.
    pub fn for_message(store: Arc<dyn Storer>, message: &Message) -> Self {
        Self::new(store, message.channel.clone(), message.from.clone())
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Describes `scope` for this channel and user, e.g. "for channel #ops".
    pub fn describe(&self, scope: Scope) -> String {
        scope.describe(&self.channel, &self.user)
    }

    fn in_scope(&self, scope: Scope) -> Arc<dyn Storer> {
        scoped(Arc::clone(&self.store), scope, &self.channel, &self.user)
    }

    fn writable(scope: Scope) -> StoreResult<()> {
        if scope == Scope::Unknown {
            return Err(StoreError::UnknownScope);
        }
        Ok(())
    }

    pub async fn set(&self, scope: Scope, key: &str, value: &str) -> StoreResult<()> {
        Self::writable(scope)?;
        trace!(scope = %scope, key, "Setting property");
        self.in_scope(scope).set(&[key.to_string()], value).await
    }

    pub async fn unset(&self, scope: Scope, key: &str) -> StoreResult<()> {
        Self::writable(scope)?;
        trace!(scope = %scope, key, "Unsetting property");
        self.in_scope(scope).unset(&[key.to_string()]).await
    }

    /// Returns the most specific value stored for `key`.
    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.get_with_scope(key).await?.map(|(_, v)| v))
    }

    /// Like [`get`](Self::get), also reporting which scope supplied the value.
    pub async fn get_with_scope(&self, key: &str) -> StoreResult<Option<(Scope, String)>> {
        for scope in Scope::ORDER {
            if let Some(value) = self.get_in_scope(scope, key).await? {
                return Ok(Some((scope, value)));
            }
        }
        Ok(None)
    }

    /// Returns the value stored for `key` in exactly `scope`.
    pub async fn get_in_scope(&self, scope: Scope, key: &str) -> StoreResult<Option<String>> {
        if scope == Scope::Unknown {
            return Ok(None);
        }
        self.in_scope(scope).get(&[key.to_string()]).await
    }

    /// Returns every scope holding a value for `key`, most specific first.
    pub async fn lookup_all(&self, key: &str) -> StoreResult<Vec<(Scope, String)>> {
        let mut found = Vec::new();
        for scope in Scope::ORDER {
            if let Some(value) = self.get_in_scope(scope, key).await? {
                found.push((scope, value));
            }
        }
        Ok(found)
    }

    /// Lists the keys and values stored directly in `scope`, in key order.
    pub async fn list(&self, scope: Scope) -> StoreResult<Vec<(String, String)>> {
        if scope == Scope::Unknown {
            return Ok(Vec::new());
        }
        let view = self.in_scope(scope);
        let mut out = Vec::new();
        for path in view.list(&[]).await? {
            if let [key] = path.as_slice()
                && let Some(value) = view.get(&path).await?
            {
                out.push((key.clone(), value));
            }
        }
        Ok(out)
    }
}
