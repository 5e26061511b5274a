//! The card matching core: extraction, similarity, merge and unmerge.
//!
//! Everything here is pure computation over plain values. Persistence,
//! scraping and transactions belong to the callers in [`crate::queries`].

pub mod extract;
pub mod merge;
pub mod similarity;
pub mod unmerge;

pub use extract::{extract, fold_digits, parse_listing_url, parse_title, ListingSlug, TitleMatch, TitlePattern};
pub use merge::{merge_or_create, refresh_source, MergeOutcome};
pub use similarity::{core_name, normalize_name, normalize_number, same};
pub use unmerge::{unmerge, SplitCard};
