// criteria.rs
use crate::error::CrawlError;
use crate::repository::{NodeKind, RepositoryView, Revision};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::time::SystemTime;

/// A candidate directory offered to acceptance criteria
///
/// Existence checks are answered by the crawl's session, at the candidate's
/// own revision.
pub struct Probe<'a> {
    repository: &'a dyn RepositoryView,
    root: Utf8PathBuf,
    name: String,
    revision: u64,
    last_modified: SystemTime,
}

impl<'a> Probe<'a> {
    pub fn new(
        repository: &'a dyn RepositoryView,
        root: Utf8PathBuf,
        name: String,
        revision: u64,
        last_modified: SystemTime,
    ) -> Self {
        Self {
            repository,
            root,
            name,
            revision,
            last_modified,
        }
    }

    /// Head name, relative to the remote base
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Repository path of the candidate directory
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Checks whether `path`, relative to the candidate, exists at the candidate's revision
    ///
    /// # Errors
    ///
    /// Propagates remote access failures
    pub fn exists(&self, path: &str) -> Result<bool, CrawlError> {
        let target = self.root.join(path.trim_start_matches('/'));
        let kind = self
            .repository
            .check_path(&target, Revision::At(self.revision))?;
        Ok(kind != NodeKind::None)
    }
}

impl fmt::Debug for Probe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("root", &self.root)
            .field("name", &self.name)
            .field("revision", &self.revision)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

/// Decides whether a candidate directory is a head
pub trait Criteria: Send + Sync {
    fn is_head(&self, probe: &Probe<'_>) -> Result<bool, CrawlError>;
}

/// Criteria backed by a closure, see [`from_fn`]
pub struct FnCriteria<F>(F);

/// Wraps a closure as [`Criteria`]
///
/// # Examples
///
/// ```
/// use headhunt::criteria::{from_fn, Probe};
///
/// let no_tmp = from_fn(|probe: &Probe<'_>| Ok(!probe.name().ends_with("-tmp")));
/// # let _ = no_tmp;
/// ```
pub fn from_fn<F>(f: F) -> FnCriteria<F>
where
    F: Fn(&Probe<'_>) -> Result<bool, CrawlError> + Send + Sync,
{
    FnCriteria(f)
}

impl<F> Criteria for FnCriteria<F>
where
    F: Fn(&Probe<'_>) -> Result<bool, CrawlError> + Send + Sync,
{
    fn is_head(&self, probe: &Probe<'_>) -> Result<bool, CrawlError> {
        (self.0)(probe)
    }
}

/// Declarative acceptance criteria
///
/// Timestamp bounds are checked first since they need no remote calls.
#[derive(Clone, Debug, Default)]
pub struct HeadCriteria {
    /// Paths that must all exist below the candidate
    pub required: Vec<String>,

    /// When non-empty, at least one of these paths must exist
    pub any_of: Vec<String>,

    /// Last modified after this time
    pub modified_after: Option<SystemTime>,

    /// Last modified before this time
    pub modified_before: Option<SystemTime>,
}

impl HeadCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a path to exist below the candidate
    pub fn require(mut self, path: impl Into<String>) -> Self {
        self.required.push(path.into());
        self
    }

    /// Adds a path to the "at least one of" list
    pub fn any_of(mut self, path: impl Into<String>) -> Self {
        self.any_of.push(path.into());
        self
    }

    pub fn modified_after(mut self, t: SystemTime) -> Self {
        self.modified_after = Some(t);
        self
    }

    pub fn modified_before(mut self, t: SystemTime) -> Self {
        self.modified_before = Some(t);
        self
    }
}

impl Criteria for HeadCriteria {
    fn is_head(&self, probe: &Probe<'_>) -> Result<bool, CrawlError> {
        let mtime = probe.last_modified();
        if let Some(after) = self.modified_after {
            if mtime < after {
                return Ok(false);
            }
        }
        if let Some(before) = self.modified_before {
            if mtime > before {
                return Ok(false);
            }
        }

        for path in &self.required {
            if !probe.exists(path)? {
                return Ok(false);
            }
        }

        if self.any_of.is_empty() {
            return Ok(true);
        }
        for path in &self.any_of {
            if probe.exists(path)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Connector, MemoryRepository};
    use std::time::Duration;

    fn fixture() -> (MemoryRepository, SystemTime) {
        let repo = MemoryRepository::new("criteria");
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000);
        repo.commit_at(when, |txn| {
            txn.add_file("trunk/Jenkinsfile")?;
            txn.add_file("trunk/src/main.rs")
        })
        .unwrap();
        (repo, when)
    }

    fn probe<'a>(session: &'a dyn RepositoryView, when: SystemTime) -> Probe<'a> {
        Probe::new(session, Utf8PathBuf::from("trunk"), "trunk".into(), 1, when)
    }

    #[test]
    fn test_probe_exists() {
        let (repo, when) = fixture();
        let session = repo.open("memory:///", None).unwrap();
        let p = probe(&session, when);
        assert!(p.exists("Jenkinsfile").unwrap());
        assert!(p.exists("/src/main.rs").unwrap());
        assert!(!p.exists("pom.xml").unwrap());
    }

    #[test]
    fn test_required_and_any_of() {
        let (repo, when) = fixture();
        let session = repo.open("memory:///", None).unwrap();
        let p = probe(&session, when);

        assert!(HeadCriteria::new().is_head(&p).unwrap());
        assert!(HeadCriteria::new().require("Jenkinsfile").is_head(&p).unwrap());
        assert!(!HeadCriteria::new()
            .require("Jenkinsfile")
            .require("pom.xml")
            .is_head(&p)
            .unwrap());
        assert!(HeadCriteria::new()
            .any_of("pom.xml")
            .any_of("src")
            .is_head(&p)
            .unwrap());
        assert!(!HeadCriteria::new().any_of("pom.xml").is_head(&p).unwrap());
    }

    #[test]
    fn test_time_bounds() {
        let (repo, when) = fixture();
        let session = repo.open("memory:///", None).unwrap();
        let p = probe(&session, when);

        let later = when + Duration::from_secs(1);
        let earlier = when - Duration::from_secs(1);
        assert!(!HeadCriteria::new().modified_after(later).is_head(&p).unwrap());
        assert!(HeadCriteria::new().modified_after(earlier).is_head(&p).unwrap());
        assert!(!HeadCriteria::new().modified_before(earlier).is_head(&p).unwrap());
    }

    #[test]
    fn test_probe_errors_propagate() {
        let (repo, when) = fixture();
        repo.fail_path("trunk/Jenkinsfile");
        let session = repo.open("memory:///", None).unwrap();
        let p = probe(&session, when);
        assert!(HeadCriteria::new().require("Jenkinsfile").is_head(&p).is_err());
    }

    #[test]
    fn test_from_fn() {
        let (repo, when) = fixture();
        let session = repo.open("memory:///", None).unwrap();
        let p = probe(&session, when);
        let named = from_fn(|probe: &Probe<'_>| Ok(probe.name() == "trunk"));
        assert!(named.is_head(&p).unwrap());
    }
}
