//! Async wrapper around [`CardWatch`] for use in async runtimes (Tokio, etc.).
//!
//! Runs every operation on the blocking thread pool via
//! [`tokio::task::spawn_blocking`]. The mutex also serializes writers, so
//! two concurrent additions of the same card cannot both miss each other.
//!
//! # Example
//!
//! ```no_run
//! use cardwatch::AsyncCardWatch;
//!
//! #[tokio::main]
//! async fn main() {
//!     let watch = AsyncCardWatch::builder().in_memory(true).build().await.unwrap();
//!     let cards = watch.cards_for_profile("default").await.unwrap();
//!     let total = watch.run(|w| w.cards().count()).await.unwrap();
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config;
use crate::error::{CardWatchError, Result};
use crate::models::{CardView, SourcePayload};
use crate::CardWatch;

// ---------------------------------------------------------------------------
// AsyncCardWatchBuilder
// ---------------------------------------------------------------------------

/// Builder for an [`AsyncCardWatch`] instance.
pub struct AsyncCardWatchBuilder {
    database_path: Option<PathBuf>,
    in_memory: bool,
    cache_ttl: Duration,
}

impl Default for AsyncCardWatchBuilder {
    fn default() -> Self {
        Self {
            database_path: None,
            in_memory: false,
            cache_ttl: config::DEFAULT_CACHE_TTL,
        }
    }
}

impl AsyncCardWatchBuilder {
    pub fn database_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Open the database on the blocking thread pool.
    pub async fn build(self) -> Result<AsyncCardWatch> {
        tokio::task::spawn_blocking(move || {
            let mut builder = CardWatch::builder()
                .in_memory(self.in_memory)
                .cache_ttl(self.cache_ttl);
            if let Some(path) = self.database_path {
                builder = builder.database_path(path);
            }
            let watch = builder.build()?;
            Ok(AsyncCardWatch {
                inner: Arc::new(Mutex::new(watch)),
            })
        })
        .await
        .map_err(|e| CardWatchError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// AsyncCardWatch
// ---------------------------------------------------------------------------

/// Async wrapper around [`CardWatch`].
///
/// The underlying [`CardWatch`] sits behind a [`Mutex`] since it uses
/// `RefCell` internally. Cloning shares the same instance.
#[derive(Clone)]
pub struct AsyncCardWatch {
    inner: Arc<Mutex<CardWatch>>,
}

impl AsyncCardWatch {
    pub fn builder() -> AsyncCardWatchBuilder {
        AsyncCardWatchBuilder::default()
    }

    /// Run a sync operation on the blocking thread pool.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use cardwatch::AsyncCardWatch;
    /// # async fn example() -> cardwatch::Result<()> {
    /// # let watch = AsyncCardWatch::builder().build().await?;
    /// let merged = watch.run(|w| w.watchlist().unmerge("some-card-id")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&CardWatch) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let watch = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = watch
                .lock()
                .map_err(|_| CardWatchError::InvalidArgument("CardWatch lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| CardWatchError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Async form of [`WatchlistQuery::add_card`](crate::queries::WatchlistQuery::add_card).
    pub async fn add_card(&self, profile: &str, url: &str, payload: SourcePayload) -> Result<CardView> {
        let profile = profile.to_string();
        let url = url.to_string();
        self.run(move |w| w.watchlist().add_card(&profile, &url, &payload))
            .await
    }

    pub async fn cards_for_profile(&self, profile: &str) -> Result<Vec<CardView>> {
        let profile = profile.to_string();
        self.run(move |w| w.watchlist().cards_for_profile(&profile))
            .await
    }

    pub async fn delete_card(&self, card_id: &str, profile: &str) -> Result<()> {
        let card_id = card_id.to_string();
        let profile = profile.to_string();
        self.run(move |w| w.watchlist().delete_card(&card_id, &profile))
            .await
    }

    pub async fn unmerge(&self, card_id: &str) -> Result<bool> {
        let card_id = card_id.to_string();
        self.run(move |w| w.watchlist().unmerge(&card_id)).await
    }
}
