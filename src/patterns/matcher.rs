// patterns/matcher.rs
//! Segment-wise wildcard matching.
//!
//! Patterns are matched one path segment at a time, so a wildcard never
//! crosses a `/` boundary.

use super::cache;

/// Returns `true` if the segment contains a wildcard
pub fn is_wildcard(segment: &str) -> bool {
    segment.contains('*') || segment.contains('?')
}

/// Checks whether a single name matches a glob segment
///
/// Matching is case-sensitive. `*` matches any run of characters including
/// the empty run, `?` matches exactly one character.
///
/// # Examples
///
/// ```
/// use headhunt::patterns::matcher::is_match;
///
/// assert!(is_match("branches", "branches"));
/// assert!(is_match("foo123", "foo*"));
/// assert!(!is_match("foo12", "foo?"));
/// ```
pub fn is_match(value: &str, glob: &str) -> bool {
    if !is_wildcard(glob) {
        return value == glob;
    }
    match cache::get_or_compile_segment(glob) {
        Ok(re) => re.is_match(value),
        Err(e) => {
            tracing::warn!("Unusable glob segment {:?}: {}", glob, e);
            false
        }
    }
}

/// Returns `true` if `value` literally starts with `prefix`
pub fn starts_with<S: AsRef<str>, P: AsRef<str>>(value: &[S], prefix: &[P]) -> bool {
    value.len() >= prefix.len()
        && value
            .iter()
            .zip(prefix)
            .all(|(v, p)| v.as_ref() == p.as_ref())
}

/// Returns `true` if the first `prefix.len()` segments of `value` match the wildcard prefix
///
/// A `value` shorter than the prefix never matches.
pub fn wildcard_starts_with<S: AsRef<str>, P: AsRef<str>>(value: &[S], prefix: &[P]) -> bool {
    value.len() >= prefix.len()
        && value
            .iter()
            .zip(prefix)
            .all(|(v, p)| is_match(v.as_ref(), p.as_ref()))
}

/// Returns `true` if `value` wildcard-starts-with any of the prefixes
pub fn wildcard_starts_with_any<'a, S, P, I>(value: &[S], prefixes: I) -> bool
where
    S: AsRef<str>,
    P: AsRef<[String]> + 'a,
    I: IntoIterator<Item = &'a P>,
{
    prefixes
        .into_iter()
        .any(|p| wildcard_starts_with(value, p.as_ref()))
}

/// Index of the first wildcard segment at or after `start`, or the length if none
pub fn index_of_next_wildcard<S: AsRef<str>>(segments: &[S], start: usize) -> usize {
    segments
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, s)| is_wildcard(s.as_ref()))
        .map(|(i, _)| i)
        .unwrap_or_else(|| segments.len().max(start))
}
