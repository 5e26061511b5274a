//! Identity extraction from marketplace titles and listing URLs.
//!
//! The two marketplaces title the same card differently:
//!
//! - TCGplayer: `"Gardevoir ex - 348/190 - SV4a: Shiny Treasure ex (SV4a)"`
//! - PriceCharting: `"Gardevoir ex #348 Pokemon Japanese Shiny Treasure ex"`
//!
//! Each site gets its own ordered pattern chain, and both end in a
//! "first digit run" last resort. Numbers parsed from titles are unreliable,
//! so a number hint taken from the listing URL always wins.
//!
//! Card numbers are ASCII digit strings. Full-width digits, common in
//! Japanese titles, are folded to ASCII first; other digit scripts are not
//! numbers here.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{CardWatchError, Result};
use crate::models::{CardIdentity, SourceType};

static DASH_WITH_SET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*-\s*([0-9]+)\s*/\s*[0-9]+\s*-\s*(.+)$").unwrap());

static DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*-\s*([0-9]+)\s*/\s*[0-9]+").unwrap());

static HASH_WITH_SET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*#([0-9]+)\s+(\S.*)$").unwrap());

static HASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*#([0-9]+)").unwrap());

static TRAILING_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s+([0-9]+)\s+([0-9]+)\s*$").unwrap());

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

static TCGPLAYER_PRODUCT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/product/[0-9]+/([^/?#]+)").unwrap());

static PRICECHARTING_GAME_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/game/[^/]+/([^/?#]+)").unwrap());

static LAST_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/([^/?#]+)/?(?:[?#].*)?$").unwrap());

static SLUG_NUMBER_PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"-([0-9]+)-([0-9]+)$").unwrap());

static SLUG_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-([0-9]+)$").unwrap());

// ---------------------------------------------------------------------------
// Title patterns
// ---------------------------------------------------------------------------

/// Which title shape produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitlePattern {
    /// `Name - 112/101 - Set`
    DashWithSet,
    /// `Name - 112/101`
    Dash,
    /// `Name #112 Set`
    HashWithSet,
    /// `Name #112`
    Hash,
    /// `Name 080 073`
    TrailingPair,
    /// First digit run anywhere; the whole title is the name.
    DigitRun,
}

/// A title broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleMatch {
    pub name: String,
    pub number: String,
    pub set: Option<String>,
    pub pattern: TitlePattern,
}

fn pattern_chain(source: SourceType) -> &'static [TitlePattern] {
    match source {
        SourceType::TcgPlayer => &[
            TitlePattern::DashWithSet,
            TitlePattern::Dash,
            TitlePattern::Hash,
            TitlePattern::TrailingPair,
            TitlePattern::DigitRun,
        ],
        SourceType::PriceCharting => &[
            TitlePattern::HashWithSet,
            TitlePattern::Hash,
            TitlePattern::Dash,
            TitlePattern::DigitRun,
        ],
    }
}

fn apply(pattern: TitlePattern, title: &str) -> Option<TitleMatch> {
    let (re, has_set): (&Regex, bool) = match pattern {
        TitlePattern::DashWithSet => (&DASH_WITH_SET, true),
        TitlePattern::Dash => (&DASH, false),
        TitlePattern::HashWithSet => (&HASH_WITH_SET, true),
        TitlePattern::Hash => (&HASH, false),
        TitlePattern::TrailingPair => (&TRAILING_PAIR, false),
        TitlePattern::DigitRun => {
            let digits = DIGIT_RUN.find(title)?;
            return Some(TitleMatch {
                name: title.to_string(),
                number: digits.as_str().to_string(),
                set: None,
                pattern,
            });
        }
    };

    let caps = re.captures(title)?;
    let name = clean_name(caps.get(1)?.as_str());
    if name.is_empty() {
        return None;
    }
    Some(TitleMatch {
        name,
        number: caps.get(2)?.as_str().to_string(),
        set: if has_set {
            caps.get(3).map(|m| m.as_str().trim().to_string())
        } else {
            None
        },
        pattern,
    })
}

/// Run the source's pattern chain over a title and return the first match.
pub fn parse_title(title: &str, source: SourceType) -> Option<TitleMatch> {
    let title = collapse_whitespace(&fold_digits(title));
    if title.is_empty() {
        return None;
    }
    pattern_chain(source)
        .iter()
        .find_map(|pattern| apply(*pattern, &title))
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

/// Extract a [`CardIdentity`] from a scraped title.
///
/// `number_hint` (usually from [`parse_listing_url`]) overrides whatever
/// number the title yields. A digit-free title is accepted only when a
/// usable hint is supplied, in which case the whole title is the name.
///
/// # Errors
///
/// [`CardWatchError::UnsupportedSource`] when the URL belongs to neither
/// marketplace, [`CardWatchError::Extraction`] when nothing can be extracted.
pub fn extract(raw_name: &str, source_url: &str, number_hint: Option<&str>) -> Result<CardIdentity> {
    let source = SourceType::from_url(source_url)
        .ok_or_else(|| CardWatchError::UnsupportedSource(source_url.to_string()))?;

    let hint = number_hint
        .map(|h| fold_digits(h.trim()))
        .filter(|h| !h.is_empty())
        .and_then(|h| {
            if h.chars().all(|c| c.is_ascii_digit()) {
                Some(h)
            } else {
                warn!(hint = %h, "ignoring non-numeric card number hint");
                None
            }
        });
    let hint = hint.as_deref();

    let identity = match (parse_title(raw_name, source), hint) {
        (Some(m), hint) => {
            debug!(
                pattern = ?m.pattern,
                name = %m.name,
                number = %m.number,
                source = %source,
                "parsed card title"
            );
            CardIdentity::new(m.name, hint.unwrap_or(&m.number))
        }
        (None, Some(hint)) => {
            let name = clean_name(&collapse_whitespace(raw_name));
            if name.is_empty() {
                return Err(CardWatchError::Extraction(source_url.to_string()));
            }
            CardIdentity::new(name, hint)
        }
        (None, None) => return Err(CardWatchError::Extraction(source_url.to_string())),
    };

    Ok(identity)
}

// ---------------------------------------------------------------------------
// Listing URLs
// ---------------------------------------------------------------------------

/// Name and number hint recovered from a listing URL's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSlug {
    pub source: SourceType,
    /// Slug with dashes turned into spaces, e.g. `"tatsugiri 112"`.
    pub name: String,
    pub number_hint: Option<String>,
}

/// Parse the product slug out of a marketplace listing URL.
///
/// Number hints follow the marketplaces' slug conventions:
/// `tatsugiri-112` gives `112`, `tatsugiri-112101` gives `112` (a six-digit
/// suffix is number and set total run together), and `magikarp-080-073`
/// gives `080`.
pub fn parse_listing_url(url: &str) -> Option<ListingSlug> {
    let source = SourceType::from_url(url)?;

    let primary = match source {
        SourceType::TcgPlayer => TCGPLAYER_PRODUCT_PATH.captures(url),
        SourceType::PriceCharting => PRICECHARTING_GAME_PATH.captures(url),
    };
    let (segment, split_six_digits) = match primary.and_then(|c| c.get(1)) {
        Some(m) => (m.as_str(), source == SourceType::TcgPlayer),
        None => (LAST_SEGMENT.captures(url)?.get(1)?.as_str(), true),
    };

    let decoded = urlencoding::decode(segment)
        .map(|s| fold_digits(&s))
        .unwrap_or_else(|_| segment.to_string());

    Some(ListingSlug {
        source,
        name: collapse_whitespace(&decoded.replace('-', " ")),
        number_hint: slug_number(&decoded, split_six_digits),
    })
}

fn slug_number(slug: &str, split_six_digits: bool) -> Option<String> {
    if let Some(caps) = SLUG_NUMBER_PAIR.captures(slug) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    let digits = SLUG_NUMBER.captures(slug)?.get(1)?.as_str();
    // ASCII-only captures, so byte length is digit count.
    if split_six_digits && digits.len() == 6 {
        Some(digits[..3].to_string())
    } else {
        Some(digits.to_string())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fold full-width digits (`０`-`９`) to ASCII, leaving everything else alone.
pub fn fold_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{FF10}'..='\u{FF19}' => char::from(b'0' + (c as u32 - 0xFF10) as u8),
            _ => c,
        })
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_name(s: &str) -> String {
    s.trim()
        .trim_end_matches(|c: char| c == '-' || c == ':' || c == ',' || c.is_whitespace())
        .trim()
        .to_string()
}
