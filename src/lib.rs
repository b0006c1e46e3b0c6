// lib.rs
#![forbid(unsafe_code)]

#[cfg(feature = "async")]
pub mod async_crawl;
pub mod crawl;
pub mod criteria;
pub mod error;
pub mod observer;
pub mod options;
pub mod patterns;
pub mod repository;

pub use crate::criteria::{Criteria, HeadCriteria, Probe};
pub use crate::error::CrawlError;
pub use crate::observer::{CandidateHead, HeadCollector, Observer};
pub use crate::options::{CrawlOptions, CrawlOptionsBuilder};
pub use crate::patterns::{PathPattern, PatternSet};
pub use crate::repository::{Connector, MemoryRepository, RepositoryView, Revision};

use crate::crawl::{resolve_head, Crawler};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{info, warn};

/// Main facade for the HeadHunt library
///
/// Discovers heads below a remote base using the configured include and
/// exclude patterns. Every call opens its own session and releases it before
/// returning.
///
/// # Examples
///
/// ```
/// use headhunt::{CrawlOptionsBuilder, HeadHunt, MemoryRepository};
///
/// let repo = MemoryRepository::new("demo");
/// repo.commit(|txn| {
///     txn.mkdir("trunk")?;
///     txn.mkdir("branches/feature-x")
/// })
/// .unwrap();
///
/// let options = CrawlOptionsBuilder::new()
///     .remote_base("memory:///")
///     .includes("trunk,branches/*")
///     .build();
/// let heads = HeadHunt::new(repo, options).collect().unwrap();
/// assert_eq!(heads.len(), 2);
/// ```
pub struct HeadHunt<C: Connector> {
    connector: C,
    options: CrawlOptions,
    criteria: Option<Arc<dyn Criteria>>,
    uuid: OnceCell<String>,
}

impl<C: Connector> HeadHunt<C> {
    pub fn new(connector: C, options: CrawlOptions) -> Self {
        Self {
            connector,
            options,
            criteria: None,
            uuid: OnceCell::new(),
        }
    }

    /// Only directories accepted by `criteria` are reported as heads
    pub fn with_criteria(mut self, criteria: impl Criteria + 'static) -> Self {
        self.criteria = Some(Arc::new(criteria));
        self
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn open_session(&self) -> Result<C::Session, CrawlError> {
        self.options.validate()?;
        info!("Opening connection to {}", self.options.remote_base);
        self.connector.open(
            &self.options.remote_base,
            self.options.credentials_id.as_deref(),
        )
    }

    /// Crawls the remote base and reports every head to `observer`
    ///
    /// The crawl stops early once the observer is no longer observing.
    ///
    /// # Errors
    ///
    /// Any remote failure aborts the crawl. Heads already observed stay with
    /// the observer.
    pub fn fetch(&self, observer: &mut dyn Observer) -> Result<(), CrawlError> {
        let result = self.crawl(observer);
        if let Err(e) = &result {
            warn!(
                "Could not fetch heads from {}: {}",
                self.options.remote_base, e
            );
        }
        result
    }

    fn crawl(&self, observer: &mut dyn Observer) -> Result<(), CrawlError> {
        let includes = self.options.include_patterns()?;
        let excludes = self.options.exclude_patterns()?;
        let session = self.open_session()?;
        Crawler::new(&session, session.relative_path(), &includes, &excludes)
            .with_criteria(self.criteria.as_deref())
            .crawl(observer)?;
        Ok(())
    }

    /// Collects every head into a vector
    pub fn collect(&self) -> Result<Vec<CandidateHead>, CrawlError> {
        let mut collector = HeadCollector::new();
        self.fetch(&mut collector)?;
        Ok(collector.into_heads())
    }

    /// Current revision of the head at `name`, relative to the remote base
    ///
    /// # Errors
    ///
    /// Returns `CrawlError::NotFound` if nothing exists at `name`
    pub fn resolve(&self, name: &str) -> Result<u64, CrawlError> {
        let session = self.open_session()?;
        resolve_head(&session, session.relative_path(), name)
    }

    /// Repository UUID, looked up once and cached
    pub fn uuid(&self) -> Result<&str, CrawlError> {
        self.uuid
            .get_or_try_init(|| {
                let session = self.open_session()?;
                session.uuid()
            })
            .map(String::as_str)
            .map_err(|e| {
                warn!(
                    "Could not read repository UUID from {}: {}",
                    self.options.remote_base, e
                );
                e
            })
    }
}

#[cfg(feature = "async")]
impl<C> HeadHunt<C>
where
    C: Connector + Send + Sync + 'static,
{
    /// Streams heads as the crawl finds them
    ///
    /// The crawl runs on a blocking worker; dropping the stream stops it at
    /// the next check.
    pub fn stream(
        self: Arc<Self>,
    ) -> impl futures::Stream<Item = Result<CandidateHead, CrawlError>> {
        crate::async_crawl::crawl_stream(self)
    }
}
