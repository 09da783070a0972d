//! Ingestion and confirm/decline handling for pending photo strips.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use photostrip_core::{CollageError, Composer};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::*;
use crate::sink::ImageSink;
use crate::store::ImageStore;

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Per-session async locks.
///
/// Reading a session's images, composing them, delivering the collage and
/// clearing the session happen under one lock, and ingestion takes the same
/// lock, so two confirms can never compose the same images twice. An entry
/// lives only while some task holds or waits for it.
#[derive(Clone, Default)]
struct SessionLocks {
    inner: LockTable,
}

impl SessionLocks {
    async fn acquire(&self, session: &str) -> SessionGuard {
        let lock = {
            let mut locks = self.inner.lock().expect("session lock table poisoned");
            locks.entry(session.to_string()).or_default().clone()
        };
        SessionGuard {
            guard: Some(lock.lock_owned().await),
            session: session.to_string(),
            table: self.inner.clone(),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().expect("session lock table poisoned").len()
    }
}

/// Holds a session lock and removes its table entry once nobody else wants it.
struct SessionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    session: String,
    table: LockTable,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the entry under the table lock, so a count of one
        // means only the table still refers to it.
        let mut locks = self.table.lock().expect("session lock table poisoned");
        if locks
            .get(&self.session)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.session);
        }
    }
}

/// Run store work that decodes images off the async workers.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Internal(format!("blocking task failed: {}", e)))?
}

/// Ties the pending image store, the composer and the image sink together.
#[derive(Clone)]
pub struct CollageService {
    store: ImageStore,
    composer: Composer,
    sink: Arc<ImageSink>,
    locks: SessionLocks,
}

impl CollageService {
    pub fn new(store: ImageStore, composer: Composer, sink: ImageSink) -> Self {
        Self {
            store,
            composer,
            sink: Arc::new(sink),
            locks: SessionLocks::default(),
        }
    }

    /// Open the on-disk store and the configured sink.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = ImageStore::open(config.store_path())?;
        store.migrate()?;
        let sink = ImageSink::from_config(config)?;
        tracing::info!(
            "Collages are {}px, delivered via {}",
            config.side_length,
            sink.backend().as_str()
        );
        Ok(Self::new(store, config.composer(), sink))
    }

    pub fn sink(&self) -> &ImageSink {
        &self.sink
    }

    /// Accept an image for `session`. Undecodable bytes are rejected and leave
    /// the session untouched.
    pub async fn ingest(&self, session: &str, bytes: &[u8]) -> Result<StoredImage> {
        let _guard = self.locks.acquire(session).await;
        let (store, key, bytes) = (self.store.clone(), session.to_string(), bytes.to_vec());
        let stored = blocking(move || store.add(&key, &bytes)).await?;
        tracing::info!(
            "Stored image {} for session {} ({}x{}, rank {})",
            stored.id,
            session,
            stored.width,
            stored.height,
            stored.rank
        );
        Ok(stored)
    }

    pub fn pending(&self, session: &str) -> Result<Vec<StoredImage>> {
        self.store.pending(session)
    }

    pub fn source(&self, id: Uuid) -> Result<EncodedImage> {
        self.store.fetch_encoded(id)
    }

    /// Apply the user's confirm/decline signal to `session`.
    pub async fn decide(&self, session: &str, confirm: bool) -> Result<Decision> {
        if confirm {
            self.confirm(session).await.map(Decision::Composed)
        } else {
            self.decline(session).await
        }
    }

    /// Compose the session's images, deliver the collage and clear the session.
    ///
    /// On any failure the pending images stay in place.
    pub async fn confirm(&self, session: &str) -> Result<Delivery> {
        let _guard = self.locks.acquire(session).await;

        let (store, key) = (self.store.clone(), session.to_string());
        let images = blocking(move || store.list_ordered(&key)).await?;
        if images.is_empty() {
            tracing::info!("Nothing to compose for session {}", session);
            return Err(CollageError::EmptyInput.into());
        }
        let image_count = images.len();

        let composer = self.composer.clone();
        let png = tokio::task::spawn_blocking(move || composer.compose(&images)?.to_png())
            .await
            .map_err(|e| Error::Internal(format!("composition task failed: {}", e)))?
            .map_err(|e| {
                if let CollageError::InvariantViolation(_) = e {
                    tracing::error!("Collage for session {} is corrupt: {}", session, e);
                }
                Error::from(e)
            })?;

        let id = Uuid::new_v4();
        let url = self
            .sink
            .deliver(&format!("collage-{}.png", id), png)
            .await?;

        let cleared = self.store.clear(session)?;
        tracing::info!(
            "Delivered collage {} of {} images for session {} ({} cleared)",
            id,
            image_count,
            session,
            cleared
        );

        Ok(Delivery {
            id,
            url,
            image_count,
            side_length: self.composer.side(),
            created_at: Utc::now(),
        })
    }

    /// Drop the session's pending images without composing.
    pub async fn decline(&self, session: &str) -> Result<Decision> {
        let _guard = self.locks.acquire(session).await;
        let discarded = self.store.clear(session)?;
        tracing::info!("Discarded {} images for session {}", discarded, session);
        Ok(Decision::Declined { discarded })
    }
}
