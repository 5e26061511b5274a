use std::path::PathBuf;
use std::time::Duration;

pub const TCGPLAYER_HOST: &str = "tcgplayer.com";
pub const PRICECHARTING_HOST: &str = "pricecharting.com";

pub const DEFAULT_CURRENCY: &str = "USD";

/// How long a profile's rendered watchlist stays in the view cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Tokens dropped from a normalized name to get its "core" name.
///
/// Site, language and rarity qualifiers plus filler words that one
/// marketplace puts in titles and the other leaves out.
pub const NAME_STOPLIST: &[&str] = &[
    "pokemon",
    "japanese",
    "english",
    "korean",
    "chinese",
    "ex",
    "gx",
    "promo",
    "holo",
    "reverse",
    "full",
    "art",
    "of",
    "the",
    "change",
    "transformation",
    "card",
    "-",
    "&",
];

/// Set codes that show up as bare trailing tokens in marketplace titles.
pub const KNOWN_SET_CODES: &[&str] = &[
    "sv1", "sv1a", "sv1s", "sv1v", "sv2", "sv2a", "sv2d", "sv2p", "sv3", "sv3a", "sv4", "sv4a",
    "sv4k", "sv4m", "sv5", "sv5a", "sv5k", "sv5m", "sv6", "sv6a", "sv7", "sv7a", "sv8", "sv8a",
    "sv9", "sv9a", "sv10", "sv11b", "sv11w", "svp", "svi", "pal", "obf", "mew", "par", "paf",
    "tef", "twm", "sfa", "scr", "ssp", "pre", "jtg", "dri", "s12a", "s11a", "s10a", "s8b", "sm12a",
];

/// Platform data directory for the watchlist database.
///
/// Falls back to a relative `.cardwatch` directory when the platform has no
/// data directory (e.g. minimal containers).
pub fn default_database_path() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("cardwatch").join("cardwatch.duckdb")
    } else {
        PathBuf::from(".cardwatch").join("cardwatch.duckdb")
    }
}
