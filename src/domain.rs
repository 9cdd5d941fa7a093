//! Domain validation and key extraction
//!
//! Base-domain extraction is a last-two-labels heuristic; multi-label public
//! suffixes such as `co.uk` are not special-cased.

use regex::Regex;
use std::sync::LazyLock;

/// Hostname grammar: 1-63 char alphanumeric/hyphen labels that do not start or
/// end with a hyphen, followed by an alphabetic TLD of at least two letters.
#[allow(clippy::unwrap_used)]
static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}$").unwrap()
});

/// Dotted-quad IPv4 address
#[allow(clippy::unwrap_used)]
static IPV4_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
    )
    .unwrap()
});

/// Substrings that mark placeholder or local names; matched anywhere in the domain
pub const BLOCKLIST: &[&str] = &[
    "example.com",
    "example.org",
    "test.com",
    "localhost",
    "localdomain",
    "invalid",
];

/// Lowercase and trim a raw line into the form the validator checks
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Whether `raw` is a plausible public hostname
///
/// The input is trimmed and lowercased before checking. Rejects empty input,
/// IPv4 literals, anything outside the hostname grammar, and any string
/// containing a [`BLOCKLIST`] entry.
pub fn is_valid_domain(raw: &str) -> bool {
    let domain = normalize(raw);

    if domain.is_empty() {
        return false;
    }

    if IPV4_REGEX.is_match(&domain) {
        return false;
    }

    if !DOMAIN_REGEX.is_match(&domain) {
        return false;
    }

    !BLOCKLIST.iter().any(|pattern| domain.contains(pattern))
}

/// Final dot-separated label, or `""` for single-label input
pub fn extract_tld(domain: &str) -> &str {
    match domain.rsplit_once('.') {
        Some((_, tld)) => tld,
        None => "",
    }
}

/// Last two dot-separated labels joined by `.`
///
/// Single-label input is returned unchanged.
pub fn extract_base_domain(domain: &str) -> &str {
    let mut dots = domain.rmatch_indices('.');
    match (dots.next(), dots.next()) {
        (Some(_), Some((second, _))) => &domain[second + 1..],
        _ => domain,
    }
}
