// options.rs
use crate::error::CrawlError;
use crate::patterns::{PatternSet, DEFAULT_EXCLUDES, DEFAULT_INCLUDES};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?|svn(\+[a-z0-9]+)?|file|memory)://.+$").expect("URL pattern is valid")
});

/// Configuration for a head source
///
/// Controls where the repository lives and which directories qualify as heads.
#[derive(Clone, Debug)]
pub struct CrawlOptions {
    /// Base URL of the project, always ending with `/`
    pub remote_base: String,

    /// Credentials handed to the connector, if any
    pub credentials_id: Option<String>,

    /// Comma separated include patterns
    pub includes: String,

    /// Comma separated exclude patterns
    pub excludes: String,

    /// Longest wait for the next streamed head (async only)
    pub timeout: Option<Duration>,

    /// Heads buffered between the crawl worker and a stream consumer
    pub channel_capacity: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            remote_base: String::new(),
            credentials_id: None,
            includes: DEFAULT_INCLUDES.to_string(),
            excludes: DEFAULT_EXCLUDES.to_string(),
            timeout: None,
            channel_capacity: 64,
        }
    }
}

impl CrawlOptions {
    /// Parsed include patterns, defaulted when blank
    pub fn include_patterns(&self) -> Result<PatternSet, CrawlError> {
        PatternSet::includes(&self.includes)
    }

    /// Parsed exclude patterns
    pub fn exclude_patterns(&self) -> Result<PatternSet, CrawlError> {
        PatternSet::excludes(&self.excludes)
    }

    /// Checks the remote base and buffer settings
    ///
    /// # Errors
    ///
    /// Returns `CrawlError::InvalidUrl` for an unsupported or malformed URL
    pub fn validate(&self) -> Result<(), CrawlError> {
        if !URL_PATTERN.is_match(&self.remote_base) {
            return Err(CrawlError::InvalidUrl(self.remote_base.clone()));
        }
        if self.channel_capacity == 0 {
            return Err(CrawlError::Other(
                "channel capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for CrawlOptions for fluent configuration
pub struct CrawlOptionsBuilder(CrawlOptions);

impl Default for CrawlOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlOptionsBuilder {
    /// Creates a new builder with default options
    pub fn new() -> Self {
        Self(CrawlOptions::default())
    }

    /// Sets the remote base URL; exactly one trailing `/` is kept
    pub fn remote_base(mut self, url: impl AsRef<str>) -> Self {
        let url = url.as_ref().trim();
        let url = url.strip_suffix('/').unwrap_or(url);
        self.0.remote_base = format!("{url}/");
        self
    }

    pub fn credentials_id(mut self, id: impl Into<String>) -> Self {
        self.0.credentials_id = Some(id.into());
        self
    }

    /// Sets the include patterns; blank input keeps the defaults
    pub fn includes(mut self, includes: impl Into<String>) -> Self {
        let includes = includes.into();
        self.0.includes = if includes.trim().is_empty() {
            DEFAULT_INCLUDES.to_string()
        } else {
            includes
        };
        self
    }

    /// Sets the exclude patterns; blank input excludes nothing
    pub fn excludes(mut self, excludes: impl Into<String>) -> Self {
        let excludes = excludes.into();
        self.0.excludes = if excludes.trim().is_empty() {
            DEFAULT_EXCLUDES.to_string()
        } else {
            excludes
        };
        self
    }

    /// Sets the per-item timeout for streamed crawls
    pub fn timeout(mut self, t: Duration) -> Self {
        self.0.timeout = Some(t);
        self
    }

    pub fn channel_capacity(mut self, v: usize) -> Self {
        self.0.channel_capacity = v;
        self
    }

    /// Builds the final CrawlOptions instance
    pub fn build(self) -> CrawlOptions {
        self.0
    }
}
