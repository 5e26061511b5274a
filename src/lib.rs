//! Trading card price watchlist with cross-marketplace card matching.
//!
//! Cards scraped from TCGplayer and PriceCharting are reduced to a
//! `(name, number)` identity, matched against stored cards with a fuzzy name
//! cascade, and merged so one card carries prices from both marketplaces.
//! Everything is stored in-process in DuckDB.
//!
//! # Quick start
//!
//! ```no_run
//! use cardwatch::models::{SourcePayload, SourceType};
//! use cardwatch::CardWatch;
//!
//! let watch = CardWatch::builder().in_memory(true).build().unwrap();
//!
//! let payload = SourcePayload {
//!     source_type: Some(SourceType::TcgPlayer),
//!     name: Some("Gardevoir ex - 245/198 - SV01: Scarlet & Violet".into()),
//!     market_price: Some(10.50),
//!     ..Default::default()
//! };
//! let url = "https://www.tcgplayer.com/product/497655/pokemon-sv01-gardevoir-ex-245-198";
//! let card = watch.watchlist().add_card("default", url, &payload).unwrap();
//! assert_eq!(card.number, "245");
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod matching;
pub mod models;
pub mod queries;
pub mod sql_builder;

#[cfg(feature = "async")]
pub use async_client::AsyncCardWatch;
pub use cache::ViewCache;
pub use connection::Connection;
pub use error::{CardWatchError, Result};
pub use sql_builder::SqlBuilder;

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

// ---------------------------------------------------------------------------
// CardWatchBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`CardWatch`] instance.
///
/// Use [`CardWatch::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](CardWatchBuilder::build).
#[derive(Debug, Clone)]
pub struct CardWatchBuilder {
    database_path: Option<PathBuf>,
    in_memory: bool,
    cache_ttl: Duration,
}

impl Default for CardWatchBuilder {
    fn default() -> Self {
        Self {
            database_path: None,
            in_memory: false,
            cache_ttl: config::DEFAULT_CACHE_TTL,
        }
    }
}

impl CardWatchBuilder {
    /// Set the DuckDB database file.
    ///
    /// If not set, `cardwatch/cardwatch.duckdb` under the platform data
    /// directory is used (e.g. `~/.local/share` on Linux).
    pub fn database_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep everything in memory. Overrides [`database_path`](Self::database_path).
    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// How long a rendered watchlist is served from cache.
    ///
    /// Defaults to 5 minutes.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Open the database and create the schema if needed.
    pub fn build(self) -> Result<CardWatch> {
        let conn = if self.in_memory {
            Connection::open_in_memory()?
        } else {
            let path = self
                .database_path
                .unwrap_or_else(config::default_database_path);
            Connection::open(path)?
        };
        info!(path = ?conn.path(), ttl = ?self.cache_ttl, "card watch opened");
        Ok(CardWatch {
            conn,
            cache: RefCell::new(ViewCache::new(self.cache_ttl)),
        })
    }
}

// ---------------------------------------------------------------------------
// CardWatch
// ---------------------------------------------------------------------------

/// The main entry point.
///
/// Owns the [`Connection`] and the watchlist [`ViewCache`], and hands out
/// lightweight borrowing query wrappers.
pub struct CardWatch {
    conn: Connection,
    cache: RefCell<ViewCache>,
}

impl CardWatch {
    /// Create a new builder.
    pub fn builder() -> CardWatchBuilder {
        CardWatchBuilder::default()
    }

    // -- Query accessors ---------------------------------------------------

    /// Access stored card aggregates directly.
    pub fn cards(&self) -> queries::cards::CardQuery<'_> {
        queries::cards::CardQuery::new(&self.conn)
    }

    /// Access the per-profile watchlist workflows.
    pub fn watchlist(&self) -> queries::watchlist::WatchlistQuery<'_> {
        queries::watchlist::WatchlistQuery::new(&self.conn, &self.cache)
    }

    // -- Utility -------------------------------------------------------------

    /// Drop every cached watchlist view.
    pub fn invalidate_cache(&self) {
        self.cache.borrow_mut().invalidate_all();
    }

    /// Return a reference to the underlying [`Connection`] for advanced usage.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for CardWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.cache.borrow();
        let location = match self.conn.path() {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        };
        write!(
            f,
            "CardWatch(database={}, cached_profiles={}, cache_ttl={:?})",
            location,
            cache.len(),
            cache.ttl
        )
    }
}
