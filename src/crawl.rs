// crawl.rs
//! Revision-pinned head discovery.
//!
//! The crawl starts at the remote base at the latest revision. Every child
//! directory is then listed at the last-changed revision its parent reported
//! for it, so each subtree is read from one consistent point in time even if
//! the repository is being committed to during the crawl.

use crate::criteria::{Criteria, Probe};
use crate::error::CrawlError;
use crate::observer::{CandidateHead, Observer};
use crate::patterns::group::group_paths;
use crate::patterns::matcher::{is_match, wildcard_starts_with};
use crate::patterns::PatternSet;
use crate::repository::{join_path, ChildEntry, NodeKind, RepositoryView, Revision};
use camino::Utf8Path;
use std::collections::HashSet;
use tracing::{debug, info};

/// Whether a crawl should keep going
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The observer is done; unwind without further remote calls
    Stop,
}

/// One crawl over one session
pub struct Crawler<'a> {
    repository: &'a dyn RepositoryView,
    base_path: &'a Utf8Path,
    includes: &'a PatternSet,
    excludes: &'a PatternSet,
    criteria: Option<&'a dyn Criteria>,
    seen: HashSet<String>,
}

impl<'a> Crawler<'a> {
    pub fn new(
        repository: &'a dyn RepositoryView,
        base_path: &'a Utf8Path,
        includes: &'a PatternSet,
        excludes: &'a PatternSet,
    ) -> Self {
        Self {
            repository,
            base_path,
            includes,
            excludes,
            criteria: None,
            seen: HashSet::new(),
        }
    }

    pub fn with_criteria(mut self, criteria: Option<&'a dyn Criteria>) -> Self {
        self.criteria = criteria;
        self
    }

    /// Crawls from the remote base at the latest revision
    pub fn crawl(&mut self, observer: &mut dyn Observer) -> Result<Flow, CrawlError> {
        self.fetch(Revision::Latest, &[], &[], observer)
    }

    /// Lists `real_path` at `revision` and emits or descends into matching children
    ///
    /// `match_prefix` is the pattern prefix that led here and `real_path` the
    /// directory names it matched; both have the same length.
    ///
    /// # Errors
    ///
    /// Any remote failure aborts the crawl. A directory that is missing at
    /// the pinned revision yields nothing.
    pub fn fetch(
        &mut self,
        revision: Revision,
        match_prefix: &[String],
        real_path: &[String],
        observer: &mut dyn Observer,
    ) -> Result<Flow, CrawlError> {
        debug_assert_eq!(match_prefix.len(), real_path.len());
        debug_assert!(wildcard_starts_with(real_path, match_prefix));

        if !observer.is_observing() {
            return Ok(Flow::Stop);
        }

        let path = join_path(self.base_path, real_path);
        debug!("Checking directory {}@{}", path, revision);
        let node = self.repository.get_node(&path, revision)?;
        if node.kind != NodeKind::Dir {
            return Ok(Flow::Continue);
        }
        let Some(mut children) = node.children else {
            return Ok(Flow::Continue);
        };
        children.retain(|c| c.kind == NodeKind::Dir);
        children.sort_by(|a, b| {
            b.revision
                .cmp(&a.revision)
                .then_with(|| a.name.cmp(&b.name))
        });

        let groups = group_paths(self.includes.as_set(), match_prefix);
        // one descent per (segment, child) pair
        let mut descended: HashSet<(&str, &str)> = HashSet::new();
        for pattern in groups.values().flatten() {
            let wanted = &pattern[match_prefix.len()];
            for child in children.iter().filter(|c| is_match(&c.name, wanted)) {
                let child_match = appended(match_prefix, wanted);
                let child_real = appended(real_path, &child.name);
                if self.excludes.covers(&child_real) {
                    debug!("Excluded {}", child_real.join("/"));
                    continue;
                }

                let flow = if pattern.segments() == child_match.as_slice() {
                    self.consider(&child_real, child, observer)?
                } else if !descended.insert((wanted.as_str(), child.name.as_str())) {
                    continue;
                } else {
                    self.fetch(
                        Revision::At(child.revision),
                        &child_match,
                        &child_real,
                        observer,
                    )?
                };
                if flow == Flow::Stop {
                    return Ok(Flow::Stop);
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Runs the criteria on a fully matched directory and emits it if accepted
    fn consider(
        &mut self,
        real_path: &[String],
        child: &ChildEntry,
        observer: &mut dyn Observer,
    ) -> Result<Flow, CrawlError> {
        let name = real_path.join("/");
        if !self.seen.insert(name.clone()) {
            return Ok(Flow::Continue);
        }

        let root = join_path(self.base_path, real_path);
        info!("Checking candidate branch {}@{}", root, child.revision);
        let accepted = match self.criteria {
            None => true,
            Some(criteria) => criteria.is_head(&Probe::new(
                self.repository,
                root,
                name.clone(),
                child.revision,
                child.last_modified,
            ))?,
        };
        if !accepted {
            debug!("Does not meet criteria");
            return Ok(Flow::Continue);
        }

        debug!("Met criteria");
        observer.observe(CandidateHead {
            name,
            revision: child.revision,
            last_modified: child.last_modified,
        });
        if observer.is_observing() {
            Ok(Flow::Continue)
        } else {
            Ok(Flow::Stop)
        }
    }
}

fn appended(segments: &[String], next: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(segments.len() + 1);
    out.extend_from_slice(segments);
    out.push(next.to_string());
    out
}

/// Looks up the current revision of one named head
///
/// # Errors
///
/// Returns `CrawlError::NotFound` if nothing exists at `name`
pub fn resolve_head(
    repository: &dyn RepositoryView,
    base_path: &Utf8Path,
    name: &str,
) -> Result<u64, CrawlError> {
    let path = base_path.join(name.trim_matches('/'));
    let node = repository.get_node(&path, Revision::Latest)?;
    if node.kind == NodeKind::None {
        return Err(CrawlError::NotFound(path));
    }
    Ok(node.revision)
}
