// repository/memory.rs
//! In-process revisioned tree store.
//!
//! Every commit produces a new immutable snapshot. Nodes touched by the
//! commit are copied and stamped with the new revision; untouched subtrees
//! are shared with earlier snapshots through `Arc`. Reads never take the
//! commit lock, so crawls can run while other threads commit.

use super::{ChildEntry, Connector, NodeEntry, NodeKind, RepositoryView, Revision};
use crate::error::CrawlError;
use camino::{Utf8Path, Utf8PathBuf};
use dashmap::{DashMap, DashSet};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

const URL_SCHEME: &str = "memory://";

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    revision: u64,
    last_modified: SystemTime,
    children: BTreeMap<String, Arc<Node>>,
}

impl Node {
    fn new(kind: NodeKind, revision: u64, last_modified: SystemTime) -> Self {
        Self {
            kind,
            revision,
            last_modified,
            children: BTreeMap::new(),
        }
    }

    fn touch(&mut self, revision: u64, last_modified: SystemTime) {
        self.revision = revision;
        self.last_modified = last_modified;
    }

    fn lookup(&self, segments: &[&str]) -> Option<&Node> {
        let mut node = self;
        for segment in segments {
            node = node.children.get(*segment)?;
        }
        Some(node)
    }

    fn to_child_entry(&self, name: &str) -> ChildEntry {
        ChildEntry {
            name: name.to_string(),
            kind: self.kind,
            revision: self.revision,
            last_modified: self.last_modified,
        }
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}

fn normalize(path: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(split(path).join("/"))
}

struct Inner {
    uuid: String,
    snapshots: DashMap<u64, Arc<Node>>,
    latest: AtomicU64,
    commit_lock: Mutex<()>,
    failures: DashSet<Utf8PathBuf>,
    listings: Mutex<Vec<Utf8PathBuf>>,
    open_sessions: AtomicUsize,
}

/// A revisioned directory tree held in memory
///
/// Cloning is cheap and every clone refers to the same repository.
///
/// # Examples
///
/// ```
/// use headhunt::repository::MemoryRepository;
///
/// let repo = MemoryRepository::new("example");
/// let rev = repo
///     .commit(|txn| {
///         txn.mkdir("trunk")?;
///         txn.mkdir("branches/dev")
///     })
///     .unwrap();
/// assert_eq!(rev, 1);
/// ```
#[derive(Clone)]
pub struct MemoryRepository {
    inner: Arc<Inner>,
}

impl fmt::Debug for MemoryRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRepository")
            .field("uuid", &self.inner.uuid)
            .field("latest", &self.latest_revision())
            .finish_non_exhaustive()
    }
}

impl MemoryRepository {
    /// Creates a repository whose revision 0 is an empty root directory
    pub fn new(uuid: impl Into<String>) -> Self {
        let snapshots = DashMap::new();
        snapshots.insert(
            0,
            Arc::new(Node::new(NodeKind::Dir, 0, SystemTime::UNIX_EPOCH)),
        );
        Self {
            inner: Arc::new(Inner {
                uuid: uuid.into(),
                snapshots,
                latest: AtomicU64::new(0),
                commit_lock: Mutex::new(()),
                failures: DashSet::new(),
                listings: Mutex::new(Vec::new()),
                open_sessions: AtomicUsize::new(0),
            }),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.inner.uuid
    }

    pub fn latest_revision(&self) -> u64 {
        self.inner.latest.load(Ordering::Acquire)
    }

    /// Applies a transaction stamped with the current time
    pub fn commit<F>(&self, f: F) -> Result<u64, CrawlError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), CrawlError>,
    {
        self.commit_at(SystemTime::now(), f)
    }

    /// Applies a transaction and returns the new revision
    ///
    /// If `f` fails nothing is committed.
    pub fn commit_at<F>(&self, timestamp: SystemTime, f: F) -> Result<u64, CrawlError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), CrawlError>,
    {
        let _guard = self
            .inner
            .commit_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (base_revision, base) = self.snapshot(Revision::Latest)?;
        let mut txn = Transaction {
            root: (*base).clone(),
            base,
            revision: base_revision + 1,
            timestamp,
        };
        f(&mut txn)?;

        let revision = txn.revision;
        self.inner.snapshots.insert(revision, Arc::new(txn.root));
        self.inner.latest.store(revision, Ordering::Release);
        debug!(revision, "Committed revision");
        Ok(revision)
    }

    /// Imports a local directory tree under `target` in a single commit
    pub fn import(&self, dir: impl AsRef<Path>, target: &str) -> Result<u64, CrawlError> {
        let dir = dir.as_ref();
        let target = normalize(target);
        let mut entries = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let Some(relative) = Utf8Path::from_path(relative) else {
                warn!("Skipping non UTF-8 path {}", entry.path().display());
                continue;
            };
            let mut path = target.clone();
            for component in relative.iter() {
                path.push(component);
            }
            entries.push((path, entry.file_type().is_dir()));
        }

        self.commit(|txn| {
            if !target.as_str().is_empty() {
                txn.mkdir(target.as_str())?;
            }
            for (path, is_dir) in &entries {
                if *is_dir {
                    txn.mkdir(path.as_str())?;
                } else {
                    txn.add_file(path.as_str())?;
                }
            }
            Ok(())
        })
    }

    /// Makes every read of `path` fail with `RemoteAccess`
    pub fn fail_path(&self, path: &str) {
        self.inner.failures.insert(normalize(path));
    }

    pub fn clear_failures(&self) {
        self.inner.failures.clear();
    }

    /// Number of `get_node` calls served since creation or the last reset
    pub fn listing_count(&self) -> usize {
        self.listings().len()
    }

    /// Paths read through `get_node`, in call order
    pub fn listed_paths(&self) -> Vec<Utf8PathBuf> {
        self.listings().clone()
    }

    pub fn reset_accounting(&self) {
        self.listings().clear();
    }

    /// Sessions opened and not yet dropped
    pub fn open_sessions(&self) -> usize {
        self.inner.open_sessions.load(Ordering::SeqCst)
    }

    fn listings(&self) -> std::sync::MutexGuard<'_, Vec<Utf8PathBuf>> {
        self.inner
            .listings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, revision: Revision) -> Result<(u64, Arc<Node>), CrawlError> {
        let latest = self.latest_revision();
        let number = match revision {
            Revision::Latest => latest,
            Revision::At(n) if n <= latest => n,
            Revision::At(n) => return Err(CrawlError::NoSuchRevision(n)),
        };
        self.inner
            .snapshots
            .get(&number)
            .map(|s| (number, Arc::clone(s.value())))
            .ok_or(CrawlError::NoSuchRevision(number))
    }

    fn check_failure(&self, path: &Utf8Path) -> Result<(), CrawlError> {
        if self.inner.failures.contains(&normalize(path.as_str())) {
            return Err(CrawlError::RemoteAccess(format!(
                "connection reset while reading {path}"
            )));
        }
        Ok(())
    }

    fn read_node(&self, path: &Utf8Path, revision: Revision) -> Result<NodeEntry, CrawlError> {
        self.check_failure(path)?;
        let (number, root) = self.snapshot(revision)?;
        let entry = match root.lookup(&split(path.as_str())) {
            None => NodeEntry::none(number),
            Some(node) => NodeEntry {
                kind: node.kind,
                revision: node.revision,
                children: (node.kind == NodeKind::Dir).then(|| {
                    node.children
                        .iter()
                        .map(|(name, child)| child.to_child_entry(name))
                        .collect()
                }),
            },
        };
        Ok(entry)
    }

    fn read_kind(&self, path: &Utf8Path, revision: Revision) -> Result<NodeKind, CrawlError> {
        self.check_failure(path)?;
        let (_, root) = self.snapshot(revision)?;
        Ok(root
            .lookup(&split(path.as_str()))
            .map_or(NodeKind::None, |node| node.kind))
    }
}

impl Connector for MemoryRepository {
    type Session = MemorySession;

    /// Opens `memory:///<path>`; the path becomes the session's base
    fn open(
        &self,
        remote_base: &str,
        _credentials_id: Option<&str>,
    ) -> Result<MemorySession, CrawlError> {
        let Some(rest) = remote_base.strip_prefix(URL_SCHEME) else {
            return Err(CrawlError::InvalidUrl(remote_base.to_string()));
        };
        let path = rest.split_once('/').map_or("", |(_, path)| path);
        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            repository: self.clone(),
            base: normalize(path),
        })
    }
}

/// A session on a [`MemoryRepository`]
#[derive(Debug)]
pub struct MemorySession {
    repository: MemoryRepository,
    base: Utf8PathBuf,
}

impl RepositoryView for MemorySession {
    fn relative_path(&self) -> &Utf8Path {
        &self.base
    }

    fn get_node(&self, path: &Utf8Path, revision: Revision) -> Result<NodeEntry, CrawlError> {
        self.repository.listings().push(path.to_path_buf());
        self.repository.read_node(path, revision)
    }

    fn check_path(&self, path: &Utf8Path, revision: Revision) -> Result<NodeKind, CrawlError> {
        self.repository.read_kind(path, revision)
    }

    fn uuid(&self) -> Result<String, CrawlError> {
        Ok(self.repository.inner.uuid.clone())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.repository
            .inner
            .open_sessions
            .fetch_sub(1, Ordering::SeqCst);
    }
}

/// Pending changes of one commit
pub struct Transaction {
    root: Node,
    base: Arc<Node>,
    revision: u64,
    timestamp: SystemTime,
}

impl Transaction {
    /// Creates a directory and any missing parents
    ///
    /// An existing directory is left untouched.
    pub fn mkdir(&mut self, path: &str) -> Result<(), CrawlError> {
        let segments = split(path);
        let Some((name, parents)) = segments.split_last() else {
            return Ok(());
        };
        if let Some(existing) = self.root.lookup(&segments) {
            return match existing.kind {
                NodeKind::Dir => Ok(()),
                _ => Err(CrawlError::Conflict(format!(
                    "{path} exists and is not a directory"
                ))),
            };
        }
        let (revision, timestamp) = (self.revision, self.timestamp);
        let dir = self.parent_mut(parents, true)?;
        dir.children.insert(
            (*name).to_string(),
            Arc::new(Node::new(NodeKind::Dir, revision, timestamp)),
        );
        Ok(())
    }

    /// Adds a file, or marks an existing file as modified
    pub fn add_file(&mut self, path: &str) -> Result<(), CrawlError> {
        let segments = split(path);
        let Some((name, parents)) = segments.split_last() else {
            return Err(CrawlError::Conflict("the root is a directory".to_string()));
        };
        let (revision, timestamp) = (self.revision, self.timestamp);
        let dir = self.parent_mut(parents, true)?;
        match dir.children.entry((*name).to_string()) {
            Entry::Occupied(e) if e.get().kind == NodeKind::Dir => Err(CrawlError::Conflict(
                format!("{path} exists and is a directory"),
            )),
            Entry::Occupied(mut e) => {
                Arc::make_mut(e.get_mut()).touch(revision, timestamp);
                Ok(())
            }
            Entry::Vacant(e) => {
                e.insert(Arc::new(Node::new(NodeKind::File, revision, timestamp)));
                Ok(())
            }
        }
    }

    /// Copies a subtree as it was in the revision this transaction is based on
    pub fn copy(&mut self, from: &str, to: &str) -> Result<(), CrawlError> {
        let source = self
            .base
            .lookup(&split(from))
            .ok_or_else(|| CrawlError::NotFound(normalize(from)))?;
        let mut copied = source.clone();

        let segments = split(to);
        let Some((name, parents)) = segments.split_last() else {
            return Err(CrawlError::Conflict("cannot copy onto the root".to_string()));
        };
        let (revision, timestamp) = (self.revision, self.timestamp);
        copied.touch(revision, timestamp);
        let dir = self.parent_mut(parents, true)?;
        match dir.children.entry((*name).to_string()) {
            Entry::Occupied(_) => Err(CrawlError::Conflict(format!("{to} already exists"))),
            Entry::Vacant(e) => {
                e.insert(Arc::new(copied));
                Ok(())
            }
        }
    }

    /// Removes a file or a whole directory
    pub fn delete(&mut self, path: &str) -> Result<(), CrawlError> {
        let segments = split(path);
        let Some((name, parents)) = segments.split_last() else {
            return Err(CrawlError::Conflict("cannot delete the root".to_string()));
        };
        if self.root.lookup(&segments).is_none() {
            return Err(CrawlError::NotFound(normalize(path)));
        }
        let dir = self.parent_mut(parents, false)?;
        dir.children.remove(*name);
        Ok(())
    }

    /// Walks to a directory, copying and stamping every node on the way
    fn parent_mut(&mut self, segments: &[&str], create: bool) -> Result<&mut Node, CrawlError> {
        let (revision, timestamp) = (self.revision, self.timestamp);
        let mut node = &mut self.root;
        node.touch(revision, timestamp);
        for (depth, segment) in segments.iter().enumerate() {
            if node.kind != NodeKind::Dir {
                return Err(CrawlError::Conflict(format!(
                    "{} is not a directory",
                    segments[..depth].join("/")
                )));
            }
            let child = match node.children.entry((*segment).to_string()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) if create => {
                    e.insert(Arc::new(Node::new(NodeKind::Dir, revision, timestamp)))
                }
                Entry::Vacant(_) => {
                    return Err(CrawlError::NotFound(Utf8PathBuf::from(
                        segments[..=depth].join("/"),
                    )))
                }
            };
            node = Arc::make_mut(child);
            node.touch(revision, timestamp);
        }
        if node.kind != NodeKind::Dir {
            return Err(CrawlError::Conflict(format!(
                "{} is not a directory",
                segments.join("/")
            )));
        }
        Ok(node)
    }
}
