// patterns/mod.rs
pub mod cache;
pub mod group;
pub mod matcher;

use crate::error::CrawlError;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;

/// Includes used when none are configured
pub const DEFAULT_INCLUDES: &str = "trunk,branches/*,tags/*,sandbox/*";

/// Excludes used when none are configured
pub const DEFAULT_EXCLUDES: &str = "";

/// A path pattern split into `/`-delimited segments
///
/// Ordering is segment-wise: a pattern sorts before any longer pattern it is
/// a prefix of, otherwise the first differing segment decides.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathPattern(Vec<String>);

impl PathPattern {
    /// Splits a pattern string on `/`, dropping trailing empty segments
    pub fn parse(pattern: &str) -> Self {
        let mut segments: Vec<String> = pattern.split('/').map(str::to_string).collect();
        while segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }
        Self(segments)
    }

    /// Returns the segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl Deref for PathPattern {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl AsRef<[String]> for PathPattern {
    fn as_ref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for PathPattern {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[String]> for PathPattern {
    fn from(segments: &[String]) -> Self {
        Self(segments.to_vec())
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Splits a comma separated list of includes/excludes into a sorted set
///
/// Tokens are trimmed, empty tokens are dropped and duplicates collapse.
pub fn split_cludes(cludes: &str) -> BTreeSet<String> {
    cludes
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sorted, de-duplicated set of path patterns
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternSet {
    patterns: BTreeSet<PathPattern>,
}

impl PatternSet {
    /// Parses a comma separated pattern list
    ///
    /// # Errors
    ///
    /// Returns `CrawlError::InvalidPattern` if a wildcard segment cannot be compiled
    pub fn parse(cludes: &str) -> Result<Self, CrawlError> {
        let mut patterns = BTreeSet::new();
        for clude in split_cludes(cludes) {
            let pattern = PathPattern::parse(&clude);
            if pattern.is_empty() {
                continue;
            }
            for segment in pattern.iter().filter(|s| matcher::is_wildcard(s)) {
                cache::get_or_compile_segment(segment)
                    .map_err(|e| CrawlError::InvalidPattern(format!("{clude}: {e}")))?;
            }
            patterns.insert(pattern);
        }
        Ok(Self { patterns })
    }

    /// Parses includes, falling back to [`DEFAULT_INCLUDES`] when blank
    pub fn includes(cludes: &str) -> Result<Self, CrawlError> {
        if cludes.trim().is_empty() {
            Self::parse(DEFAULT_INCLUDES)
        } else {
            Self::parse(cludes)
        }
    }

    /// Parses excludes; blank input means nothing is excluded
    pub fn excludes(cludes: &str) -> Result<Self, CrawlError> {
        if cludes.trim().is_empty() {
            Self::parse(DEFAULT_EXCLUDES)
        } else {
            Self::parse(cludes)
        }
    }

    pub fn as_set(&self) -> &BTreeSet<PathPattern> {
        &self.patterns
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathPattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns `true` if `path` falls under any pattern of the set
    pub fn covers<S: AsRef<str>>(&self, path: &[S]) -> bool {
        matcher::wildcard_starts_with_any(path, &self.patterns)
    }
}

impl<'a> IntoIterator for &'a PatternSet {
    type Item = &'a PathPattern;
    type IntoIter = std::collections::btree_set::Iter<'a, PathPattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}

impl FromIterator<PathPattern> for PatternSet {
    fn from_iter<T: IntoIterator<Item = PathPattern>>(iter: T) -> Self {
        Self {
            patterns: iter.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }
}
