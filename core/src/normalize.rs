//! Canonical comparison keys for URLs and titles.
//!
//! Both normalizers are idempotent: feeding a key back in returns it
//! unchanged, so keys can be stored and compared across scans.

const SCHEMES: [&str; 2] = ["http://", "https://"];

/// Reduce a URL to its comparison key.
///
/// Lower-cases, then strips a leading `http://`/`https://`, a leading
/// `www.`, a trailing `/` and surrounding whitespace. Stripping repeats
/// until nothing changes, which keeps inputs such as `a.com//` or
/// `http://https://a.com` idempotent.
pub fn normalize_url(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    let mut current = lowered.as_str();

    loop {
        let mut next = current.trim();
        for scheme in SCHEMES {
            if let Some(rest) = next.strip_prefix(scheme) {
                next = rest;
                break;
            }
        }
        next = next.strip_prefix("www.").unwrap_or(next);
        next = next.strip_suffix('/').unwrap_or(next);
        next = next.trim();

        if next.len() == current.len() {
            break;
        }
        current = next;
    }

    current.to_string()
}

/// Reduce a title to its comparison key: trimmed, inner whitespace runs
/// collapsed to one space, lower-cased.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Search queries share the title normalization
pub fn normalize_query(query: &str) -> String {
    normalize_title(query)
}
