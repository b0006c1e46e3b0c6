// tests/patterns.rs
use headhunt::patterns::group::{group_paths, optimization_point};
use headhunt::patterns::matcher::{
    index_of_next_wildcard, is_match, wildcard_starts_with, wildcard_starts_with_any,
};
use headhunt::patterns::{split_cludes, PathPattern, PatternSet};
use std::collections::BTreeSet;

fn segs(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_segment_matching() {
    assert!(is_match("branches", "branches"));
    assert!(is_match("foo123", "foo*"));
    assert!(is_match("foo", "foo*"));
    assert!(is_match("foo1", "foo?"));
    assert!(!is_match("foo12", "foo?"));
    assert!(!is_match("Branches", "branches"));
    assert!(is_match("release-1.0", "release-?.*"));
    assert!(!is_match("release+1x0", "release-?.*"));
}

#[test]
fn test_wildcard_prefixes() {
    let branches = PathPattern::parse("branches/*");
    assert!(wildcard_starts_with(&segs(&["branches", "foo"]), branches.segments()));
    assert!(wildcard_starts_with(&segs(&["branches", "foo", "src"]), branches.segments()));
    assert!(!wildcard_starts_with(&segs(&["trunk"]), branches.segments()));
    assert!(!wildcard_starts_with(&segs(&["branches"]), branches.segments()));

    let all = [PathPattern::parse("trunk"), branches];
    assert!(wildcard_starts_with_any(&segs(&["trunk"]), &all));
    assert!(!wildcard_starts_with_any(&segs(&["tags", "v1"]), &all));
}

#[test]
fn test_next_wildcard_index() {
    assert_eq!(index_of_next_wildcard(&segs(&["a", "b", "*", "c"]), 0), 2);
    assert_eq!(index_of_next_wildcard(&segs(&["a", "b", "*", "c"]), 3), 4);
    assert_eq!(index_of_next_wildcard(&segs(&["a", "b"]), 0), 2);
}

#[test]
fn test_split_cludes() {
    let expected: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    assert_eq!(split_cludes("a, b ,,c"), expected);
    assert_eq!(split_cludes("c,a,b,a"), expected);
    assert!(split_cludes(" , ").is_empty());
}

#[test]
fn test_pattern_order() {
    let a = PathPattern::parse("a");
    let ab = PathPattern::parse("a/b");
    let ac = PathPattern::parse("a/c");
    let b = PathPattern::parse("b");
    assert!(a < ab);
    assert!(ab < ac);
    assert!(ac < b);
}

#[test]
fn test_default_includes() {
    let includes = PatternSet::includes("  ").unwrap();
    let rendered: Vec<String> = includes.iter().map(|p| p.to_string()).collect();
    assert_eq!(rendered, vec!["branches/*", "sandbox/*", "tags/*", "trunk"]);
    assert!(PatternSet::excludes("").unwrap().is_empty());
}

#[test]
fn test_grouping_partitions_input() {
    let includes = PatternSet::parse(
        "trunk,branches/*,branches/stable,tags/*,teams/*/branches/*,teams/core/trunk",
    )
    .unwrap();

    for prefix in [segs(&[]), segs(&["teams"]), segs(&["teams", "*"])] {
        let groups = group_paths(includes.as_set(), &prefix);
        let mut members = BTreeSet::new();
        for (key, group) in &groups {
            assert!(key.len() > prefix.len());
            assert!(key.starts_with(&prefix));
            for pattern in group {
                assert!(pattern.starts_with(key));
                assert!(members.insert(pattern.clone()), "{pattern} grouped twice");
            }
        }
        let expected: BTreeSet<PathPattern> = includes
            .iter()
            .filter(|p| p.len() > prefix.len() && p.starts_with(&prefix))
            .cloned()
            .collect();
        assert_eq!(members, expected);
        assert_eq!(optimization_point(groups.keys(), prefix.len()), None);
    }
}

#[test]
fn test_shared_directory_listed_once() {
    let includes = PatternSet::parse("branches/*,branches/stable,branches/team/*").unwrap();
    let groups = group_paths(includes.as_set(), &[]);
    assert_eq!(groups.len(), 1);
    let (key, group) = groups.iter().next().unwrap();
    assert_eq!(key.to_string(), "branches");
    assert_eq!(group.len(), 3);
}

#[test]
fn test_invalid_pattern_reported() {
    let long = format!("{}*", "x".repeat(2000));
    assert!(PatternSet::parse(&long).is_err());
}
