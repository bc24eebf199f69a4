//! Key/value storage used by the property layer.
//!
//! [`Storer`] is the minimal contract a backend implements. Paths are
//! ordered segment lists; [`path_to_key`] turns them into flat keys by
//! percent-encoding every segment, so a segment can never forge a separator.
//!
//! Decorators build on top of any backend:
//! - [`PrefixedStore`] pins every path under a fixed prefix.
//! - [`scoped`] pins every path under a [`Scope`] key.
//! - [`PropertyStore`] searches scopes most-specific first.

mod memory;
mod prefix;
mod property;
mod scope;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::{StoreError, StoreResult};

pub use memory::MemoryStore;
pub use prefix::{PrefixedStore, prefixed};
pub use property::PropertyStore;
pub use scope::{Scope, scoped};

/// Minimal key/value backend.
///
/// Concurrency guarantees are up to the implementation; the framework only
/// promises well-formed, collision-free paths.
#[async_trait]
pub trait Storer: Send + Sync {
    /// Returns the value at `path`, or `None` if nothing is stored there.
    async fn get(&self, path: &[String]) -> StoreResult<Option<String>>;

    /// Lists the paths stored below `path`, relative to it.
    async fn list(&self, path: &[String]) -> StoreResult<Vec<Vec<String>>>;

    async fn set(&self, path: &[String], value: &str) -> StoreResult<()>;

    /// Removes the value at `path`. Removing a missing value is not an error.
    async fn unset(&self, path: &[String]) -> StoreResult<()>;
}

/// Bytes escaped inside a path segment. Everything except RFC 3986
/// unreserved characters, which keeps `/` free to act as the separator.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const SEPARATOR: char = '/';

/// Builds an owned path from string slices.
pub fn path(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| (*s).to_string()).collect()
}

/// Encodes a path as a single flat key.
pub fn path_to_key(path: &[String]) -> String {
    path.iter()
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decodes a key produced by [`path_to_key`].
pub fn key_to_path(key: &str) -> StoreResult<Vec<String>> {
    if key.is_empty() {
        return Ok(Vec::new());
    }
    key.split(SEPARATOR)
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .map(|s| s.into_owned())
                .map_err(|_| StoreError::MalformedKey(key.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_to_key_escapes_separators() {
        assert_eq!(path_to_key(&path(&["a", "b"])), "a/b");
        assert_eq!(path_to_key(&path(&["a/b"])), "a%2Fb");
        assert_ne!(
            path_to_key(&path(&["a/b"])),
            path_to_key(&path(&["a", "b"]))
        );
    }

    #[test]
    fn test_key_to_path_inverts_encoding() {
        let p = path(&["channel(\"#ops\")", "deploy now", "50%"]);
        let key = path_to_key(&p);
        assert!(!key.contains(' '));
        assert_eq!(key_to_path(&key).unwrap(), p);
    }

    #[test]
    fn test_key_to_path_empty() {
        assert!(key_to_path("").unwrap().is_empty());
    }

    #[test]
    fn test_key_to_path_rejects_bad_utf8() {
        assert!(matches!(
            key_to_path("%FF"),
            Err(StoreError::MalformedKey(_))
        ));
    }
}
