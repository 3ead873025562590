use bytes::Bytes;
use mongo_store::Store;

use crate::{Error, Notification};

const DEFERRED_KEY: &str = "deferred";

/// Notifications waiting for redelivery, kept in unit state between
/// invocations.
#[derive(Clone, Debug)]
pub struct DeferredQueue<S> {
    store: S,
}

impl<S> DeferredQueue<S>
where
    S: Store,
{
    /// Creates a queue backed by `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The queued notifications, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be read or decoded.
    pub async fn load(&self) -> Result<Vec<Notification>, Error> {
        self.store
            .get(DEFERRED_KEY)
            .await
            .map_err(|e| Error::Store(e.to_string()))?
            .map_or_else(
                || Ok(Vec::new()),
                |bytes| {
                    serde_json::from_slice(&bytes)
                        .map_err(|e| Error::Decode("deferred notifications", e))
                },
            )
    }

    /// Replace the queue contents.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be written.
    pub async fn save(&self, notifications: &[Notification]) -> Result<(), Error> {
        if notifications.is_empty() {
            return self
                .store
                .del(DEFERRED_KEY)
                .await
                .map_err(|e| Error::Store(e.to_string()));
        }

        let encoded = serde_json::to_vec(notifications)
            .map_err(|e| Error::Encode("deferred notifications", e))?;

        self.store
            .put(DEFERRED_KEY, Bytes::from(encoded))
            .await
            .map_err(|e| Error::Store(e.to_string()))
    }
}
