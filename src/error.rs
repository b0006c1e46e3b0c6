// error.rs
use camino::Utf8PathBuf;
use thiserror::Error;

/// Error types for crawl operations
///
/// This enum represents everything that can go wrong while talking to a
/// repository, parsing patterns or running a crawl.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// Transport or authentication failure while listing or probing
    #[error("Remote access error: {0}")]
    RemoteAccess(String),

    /// A path vanished or never existed
    #[error("Not found: {0}")]
    NotFound(Utf8PathBuf),

    /// A revision newer than the repository's latest was requested
    #[error("No such revision: {0}")]
    NoSuchRevision(u64),

    /// Remote base URL is malformed or uses an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid include/exclude pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// A repository transaction could not be applied
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Glob segment too long to compile
    #[error("Regex pattern too complex or long")]
    RegexTooComplex,

    /// Error walking a local tree during import
    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// Other unspecified errors
    #[error("Other error: {0}")]
    Other(String),
}

impl CrawlError {
    /// True for errors raised by the remote side rather than local input
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            CrawlError::RemoteAccess(_) | CrawlError::NoSuchRevision(_) | CrawlError::Timeout
        )
    }
}
