// observer.rs
use std::time::SystemTime;

/// A directory accepted as a head, with the revision it was seen at
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateHead {
    /// Path relative to the remote base, `/`-separated
    pub name: String,
    pub revision: u64,
    pub last_modified: SystemTime,
}

/// Receives heads from a crawl
///
/// The crawl polls [`Observer::is_observing`] after every emission and before
/// every directory listing, and stops as soon as it returns `false`.
pub trait Observer {
    fn observe(&mut self, head: CandidateHead);

    fn is_observing(&self) -> bool {
        true
    }
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn observe(&mut self, head: CandidateHead) {
        (**self).observe(head)
    }

    fn is_observing(&self) -> bool {
        (**self).is_observing()
    }
}

/// Observer that keeps the heads it receives
#[derive(Clone, Debug, Default)]
pub struct HeadCollector {
    heads: Vec<CandidateHead>,
    limit: Option<usize>,
    target: Option<String>,
}

impl HeadCollector {
    /// Collects every head
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the crawl once `limit` heads were collected
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Looks for one head by name and stops once it is found
    pub fn for_head(name: impl Into<String>) -> Self {
        Self {
            target: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn heads(&self) -> &[CandidateHead] {
        &self.heads
    }

    pub fn into_heads(self) -> Vec<CandidateHead> {
        self.heads
    }
}

impl Observer for HeadCollector {
    fn observe(&mut self, head: CandidateHead) {
        if let Some(target) = &self.target {
            if *target != head.name {
                return;
            }
        }
        self.heads.push(head);
    }

    fn is_observing(&self) -> bool {
        if self.target.is_some() {
            return self.heads.is_empty();
        }
        self.limit.map_or(true, |limit| self.heads.len() < limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(name: &str) -> CandidateHead {
        CandidateHead {
            name: name.to_string(),
            revision: 1,
            last_modified: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_limit() {
        let mut c = HeadCollector::with_limit(2);
        c.observe(head("a"));
        assert!(c.is_observing());
        c.observe(head("b"));
        assert!(!c.is_observing());
    }

    #[test]
    fn test_single_head() {
        let mut c = HeadCollector::for_head("branches/dev");
        c.observe(head("trunk"));
        assert!(c.is_observing());
        assert!(c.heads().is_empty());
        c.observe(head("branches/dev"));
        assert!(!c.is_observing());
        assert_eq!(c.into_heads(), vec![head("branches/dev")]);
    }
}
