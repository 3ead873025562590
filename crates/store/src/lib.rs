//! Abstract interface for unit-local durable state.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

/// Marker trait for `Store` errors
pub trait StoreError: Debug + Error + Send + Sync + 'static {}

/// A flat key-value store holding the state a unit keeps between hook
/// invocations.
///
/// Keys are plain names without path separators. Values are opaque bytes;
/// callers pick the encoding. Implementations must make a completed `put`
/// visible to every later `get`, including one made by a fresh process.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// The error type for store operations.
    type Error: StoreError;

    /// Deletes a key. Deleting a missing key is not an error.
    async fn del<K: Into<String> + Send>(&self, key: K) -> Result<(), Self::Error>;

    /// Retrieves the value stored under a key, if any.
    async fn get<K: Into<String> + Send>(&self, key: K) -> Result<Option<Bytes>, Self::Error>;

    /// Lists every key currently stored.
    async fn keys(&self) -> Result<Vec<String>, Self::Error>;

    /// Stores a value, replacing any previous one.
    async fn put<K: Into<String> + Send>(&self, key: K, bytes: Bytes) -> Result<(), Self::Error>;
}
