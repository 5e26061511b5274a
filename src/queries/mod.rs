//! Query modules for the watchlist store.
//!
//! Each module provides a query struct that borrows from a
//! [`Connection`](crate::connection::Connection) and exposes methods
//! returning `Result<T>` with typed models.

pub mod cards;
pub mod watchlist;

pub use cards::CardQuery;
pub use watchlist::{PriceFetcher, WatchlistQuery};
