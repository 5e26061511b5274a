//! Decides whether two identities name the same physical card.
//!
//! The card number is the strict filter; names only have to agree loosely.
//! The name rules are a containment cascade tuned for recall, and they are
//! neither symmetric nor transitive: the last rule strips the *second*
//! identity's raw number from its name, so zero-padded numbers embedded in
//! one title can match in one argument order only.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::{KNOWN_SET_CODES, NAME_STOPLIST};
use crate::models::CardIdentity;

static SET_CODE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(sv|sm|s)[0-9]{1,2}[a-z]?$").unwrap());

/// Lowercase, collapse internal whitespace, trim.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip leading zeros; an all-zero or empty number becomes `"0"`.
pub fn normalize_number(number: &str) -> &str {
    let trimmed = number.trim().trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

/// Normalized name without site, language, set-code and filler tokens.
pub fn core_name(normalized: &str) -> String {
    normalized
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| "()[]{}:;,.!\"'".contains(c)))
        .filter(|t| !t.is_empty() && !is_noise(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_noise(token: &str) -> bool {
    NAME_STOPLIST.contains(&token) || KNOWN_SET_CODES.contains(&token) || SET_CODE_SHAPE.is_match(token)
}

/// Substring test where an empty needle never matches.
fn contains(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.contains(needle)
}

/// Whether `a` and `b` refer to the same physical card.
///
/// Different numbers (after zero-stripping) never match. Otherwise the
/// names match when equal after normalization, or when any of these hold:
///
/// 1. the core names are equal and non-empty;
/// 2. one normalized name contains the other's core name;
/// 3. one core name contains the other;
/// 4. one normalized name contains the other;
/// 5. `b`'s core name with `b`'s own number removed is contained in, or
///    contains, `a`'s core name.
pub fn same(a: &CardIdentity, b: &CardIdentity) -> bool {
    if normalize_number(&a.number) != normalize_number(&b.number) {
        return false;
    }

    let a_norm = normalize_name(&a.name);
    let b_norm = normalize_name(&b.name);
    if a_norm == b_norm {
        return true;
    }

    let a_core = core_name(&a_norm);
    let b_core = core_name(&b_norm);

    let matched = (!a_core.is_empty() && a_core == b_core)
        || contains(&a_norm, &b_core)
        || contains(&b_norm, &a_core)
        || contains(&a_core, &b_core)
        || contains(&b_core, &a_core)
        || contains(&a_norm, &b_norm)
        || contains(&b_norm, &a_norm)
        || core_without_number_matches(&a_core, &b_core, &b.number);

    debug!(
        a = %a_norm,
        b = %b_norm,
        a_core = %a_core,
        b_core = %b_core,
        matched,
        "compared card names"
    );
    matched
}

fn core_without_number_matches(a_core: &str, b_core: &str, b_number: &str) -> bool {
    let number = b_number.trim();
    if number.is_empty() || !b_core.contains(number) {
        return false;
    }
    let stripped = normalize_name(&b_core.replace(number, " "));
    contains(a_core, &stripped) || contains(&stripped, a_core)
}
