//! Store decorator that pins every path under a fixed prefix.

use std::sync::Arc;

use async_trait::async_trait;

use super::Storer;
use crate::error::StoreResult;

/// Wraps a [`Storer`] so all paths live below `prefix`.
///
/// Listing returns paths relative to the prefix, so the wrapped view behaves
/// like a store of its own.
pub struct PrefixedStore {
    inner: Arc<dyn Storer>,
    prefix: Vec<String>,
}

impl PrefixedStore {
    pub fn new(inner: Arc<dyn Storer>, prefix: Vec<String>) -> Self {
        Self { inner, prefix }
    }

    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    fn full(&self, path: &[String]) -> Vec<String> {
        let mut full = Vec::with_capacity(self.prefix.len() + path.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(path);
        full
    }
}

/// Shorthand for an `Arc`-wrapped [`PrefixedStore`].
pub fn prefixed<I, S>(inner: Arc<dyn Storer>, prefix: I) -> Arc<dyn Storer>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Arc::new(PrefixedStore::new(
        inner,
        prefix.into_iter().map(Into::into).collect(),
    ))
}

#[async_trait]
impl Storer for PrefixedStore {
    async fn get(&self, path: &[String]) -> StoreResult<Option<String>> {
        self.inner.get(&self.full(path)).await
    }

    async fn list(&self, path: &[String]) -> StoreResult<Vec<Vec<String>>> {
        self.inner.list(&self.full(path)).await
    }

    async fn set(&self, path: &[String], value: &str) -> StoreResult<()> {
        self.inner.set(&self.full(path), value).await
    }

    async fn unset(&self, path: &[String]) -> StoreResult<()> {
        self.inner.unset(&self.full(path)).await
    }
}
