// patterns/group.rs
//! Prefix grouping of include patterns.
//!
//! Each group returned by [`group_paths`] corresponds to one remote directory
//! listing, so merging groups that look inside the same directory (for
//! example `branches/*` and `branches/stable`) avoids listing it twice.

use super::matcher::{index_of_next_wildcard, starts_with};
use super::PathPattern;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Patterns grouped under literal prefixes
pub type PatternGroups = BTreeMap<PathPattern, BTreeSet<PathPattern>>;

/// Retains the patterns that literally start with `prefix` and are strictly longer than it
pub fn filter_paths<'a, I>(patterns: I, prefix: &[String]) -> BTreeSet<PathPattern>
where
    I: IntoIterator<Item = &'a PathPattern>,
{
    patterns
        .into_iter()
        .filter(|p| p.len() > prefix.len() && starts_with(p, prefix))
        .cloned()
        .collect()
}

/// Groups patterns by the literal prefixes they share beyond `prefix`
///
/// Every key literally extends `prefix` and is strictly longer than it,
/// every member of a group literally starts with its key, and the groups
/// partition the filtered input exactly. After the merge pass no two keys
/// share the same segment at position `prefix.len()`.
pub fn group_paths(patterns: &BTreeSet<PathPattern>, prefix: &[String]) -> PatternGroups {
    let mut pool = filter_paths(patterns, prefix);
    let mut result = PatternGroups::new();

    loop {
        // longest literal run wins, ties go to the first in sorted order
        let mut longest: Option<(&PathPattern, usize)> = None;
        for pattern in &pool {
            let index = index_of_next_wildcard(pattern, prefix.len());
            if longest.map_or(true, |(_, best)| index > best) {
                longest = Some((pattern, index));
            }
        }
        let Some((pattern, index)) = longest else {
            break;
        };

        let cut = index.max(prefix.len() + 1);
        let key = PathPattern::from(&pattern[..cut]);
        let group: BTreeSet<PathPattern> = pool
            .iter()
            .filter(|p| starts_with(p, &key))
            .cloned()
            .collect();
        pool.retain(|p| !group.contains(p));
        result.insert(key, group);
    }

    while let Some(value) = optimization_point(result.keys(), prefix.len()) {
        let mut merged_key = prefix.to_vec();
        merged_key.push(value);
        let merged_key = PathPattern::from(merged_key);

        let mut merged = BTreeSet::new();
        result.retain(|key, group| {
            if starts_with(key, &merged_key) {
                merged.append(group);
                false
            } else {
                true
            }
        });
        result.insert(merged_key, merged);
    }

    result
}

/// Finds a segment value shared at `prefix_len` by more than one key
///
/// Returns `None` when every key has a distinct value at that position.
pub fn optimization_point<'a, I>(keys: I, prefix_len: usize) -> Option<String>
where
    I: IntoIterator<Item = &'a PathPattern>,
{
    let mut seen = HashSet::new();
    for key in keys {
        let Some(value) = key.get(prefix_len) else {
            continue;
        };
        if !seen.insert(value.as_str()) {
            return Some(value.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> BTreeSet<PathPattern> {
        patterns.iter().map(|p| PathPattern::parse(p)).collect()
    }

    fn pat(p: &str) -> PathPattern {
        PathPattern::parse(p)
    }

    fn prefix(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn assert_partition(input: &BTreeSet<PathPattern>, prefix: &[String], groups: &PatternGroups) {
        let filtered = filter_paths(input, prefix);
        let mut seen = BTreeSet::new();
        for (key, group) in groups {
            assert!(key.len() > prefix.len(), "key {key} not longer than prefix");
            assert!(starts_with(key, prefix), "key {key} does not extend prefix");
            for member in group {
                assert!(starts_with(member, key), "{member} does not start with {key}");
                assert!(seen.insert(member.clone()), "{member} in two groups");
            }
        }
        assert_eq!(seen, filtered);

        let mut values = HashSet::new();
        for key in groups.keys() {
            assert!(values.insert(key[prefix.len()].clone()));
        }
    }

    #[test]
    fn test_default_includes_at_root() {
        let input = set(&["trunk", "branches/*", "tags/*", "sandbox/*"]);
        let groups = group_paths(&input, &[]);
        assert_partition(&input, &[], &groups);

        let keys: Vec<String> = groups.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["branches", "sandbox", "tags", "trunk"]);
    }

    #[test]
    fn test_shared_directory_is_merged() {
        let input = set(&["branches/*", "branches/stable", "branches/stable/x"]);
        let groups = group_paths(&input, &[]);
        assert_partition(&input, &[], &groups);

        assert_eq!(groups.len(), 1);
        let group = &groups[&pat("branches")];
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_nested_prefix() {
        let input = set(&["branches/*", "branches/team/*", "trunk", "tags/*"]);
        let p = prefix(&["branches"]);
        let groups = group_paths(&input, &p);
        assert_partition(&input, &p, &groups);

        assert_eq!(groups.len(), 2);
        assert!(groups[&pat("branches/*")].contains(&pat("branches/*")));
        assert!(groups[&pat("branches/team")].contains(&pat("branches/team/*")));
    }

    #[test]
    fn test_prefix_itself_is_not_grouped() {
        let input = set(&["trunk", "trunk/*"]);
        let p = prefix(&["trunk"]);
        let groups = group_paths(&input, &p);
        assert_partition(&input, &p, &groups);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&pat("trunk/*")], set(&["trunk/*"]));
    }

    #[test]
    fn test_literal_runs_merge_under_common_segment() {
        let input = set(&["a/b/c/*", "a/b/d", "a/e/*", "f?/x"]);
        let groups = group_paths(&input, &[]);
        assert_partition(&input, &[], &groups);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&pat("a")].len(), 3);
        assert_eq!(groups[&pat("f?")], set(&["f?/x"]));
    }

    #[test]
    fn test_optimization_point() {
        let distinct = set(&["a/x", "b/y", "c"]);
        assert_eq!(optimization_point(&distinct, 0), None);

        let repeated = set(&["a/x", "a/y", "c"]);
        assert_eq!(optimization_point(&repeated, 0), Some("a".to_string()));

        let short = set(&["a"]);
        assert_eq!(optimization_point(&short, 1), None);
    }
}
