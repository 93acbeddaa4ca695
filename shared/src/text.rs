//! Text normalization used when reading values out of portal pages.

use regex::Regex;
use std::sync::LazyLock;

// Everything from the first "advogado:"/"advogada:" onwards is counsel, not the party.
static COUNSEL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)advogad[oa]:.*").expect("valid counsel pattern"));

static PARTY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\(parte\s+\w+\):\s*)+").expect("valid party prefix pattern")
});

/// Collapses every whitespace run into a single space and trims the ends.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive substring test. Handles accented characters.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Reduces a party cell to the party's name.
///
/// Drops a trailing counsel listing, any leading `(parte ...):` role prefix
/// and collapses whitespace. Applying it twice gives the same result as
/// applying it once.
pub fn clean_respondent_name(raw: &str) -> String {
    let without_counsel = COUNSEL_SUFFIX.replace(raw, "");
    let without_prefix = PARTY_PREFIX.replace(&without_counsel, "");
    normalize_ws(&without_prefix)
}
