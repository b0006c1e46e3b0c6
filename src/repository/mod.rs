// repository/mod.rs
//! Remote repository abstraction.
//!
//! A [`Connector`] opens scoped sessions; a session is a [`RepositoryView`]
//! that lists directories and checks paths "as of" a revision. Sessions are
//! closed when dropped.

pub mod memory;

use crate::error::CrawlError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::time::SystemTime;

pub use memory::{MemoryRepository, MemorySession, Transaction};

/// Revision a read is pinned to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Revision {
    /// Whatever is newest when the read happens
    #[default]
    Latest,
    /// An exact revision number
    At(u64),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Latest => f.write_str("HEAD"),
            Revision::At(n) => write!(f, "{n}"),
        }
    }
}

impl From<u64> for Revision {
    fn from(n: u64) -> Self {
        Revision::At(n)
    }
}

/// Kind of a node in the remote tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Nothing at that path
    None,
    File,
    Dir,
}

/// One entry of a directory listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub kind: NodeKind,
    /// Last revision in which this entry or anything below it changed
    pub revision: u64,
    pub last_modified: SystemTime,
}

/// Result of reading one path at one revision
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeEntry {
    pub kind: NodeKind,
    /// Last-changed revision of the node, or the revision read for absent nodes
    pub revision: u64,
    /// Directory children; `None` unless `kind` is `Dir`
    pub children: Option<Vec<ChildEntry>>,
}

impl NodeEntry {
    /// An entry for a path with nothing at it
    pub fn none(revision: u64) -> Self {
        Self {
            kind: NodeKind::None,
            revision,
            children: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Dir
    }
}

/// Read access to a revision-versioned tree
pub trait RepositoryView {
    /// Path of the session's remote base inside the repository
    fn relative_path(&self) -> &Utf8Path;

    /// Reads a node and, for directories, its children
    ///
    /// A missing path is not an error; it comes back with `NodeKind::None`.
    fn get_node(&self, path: &Utf8Path, revision: Revision) -> Result<NodeEntry, CrawlError>;

    /// Reports what kind of node exists at a path
    fn check_path(&self, path: &Utf8Path, revision: Revision) -> Result<NodeKind, CrawlError>;

    /// Repository identity
    fn uuid(&self) -> Result<String, CrawlError>;
}

/// Opens sessions against a remote repository
pub trait Connector {
    type Session: RepositoryView;

    /// Opens a session rooted at `remote_base`
    ///
    /// Credential lookup is the connector's business; the id is passed through.
    fn open(
        &self,
        remote_base: &str,
        credentials_id: Option<&str>,
    ) -> Result<Self::Session, CrawlError>;
}

/// Joins segments onto a base path
pub fn join_path<S: AsRef<str>>(base: &Utf8Path, segments: &[S]) -> Utf8PathBuf {
    let mut path = base.to_path_buf();
    for segment in segments {
        path.push(segment.as_ref());
    }
    path
}
