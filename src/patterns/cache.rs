// patterns/cache.rs
use crate::error::CrawlError;
use lru::LruCache;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    num::NonZeroUsize,
    sync::{Mutex, PoisonError},
};

// Limit cache size to prevent uncontrolled memory growth
const MAX_CACHE_SIZE: usize = 1000;
const MAX_SEGMENT_LEN: usize = 1000;

/// Metrics for cache performance monitoring
#[derive(Clone, Debug, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheMetrics {
    /// Calculates the cache hit ratio
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// LRU cache of compiled glob segments
struct SegmentCache {
    cache: Mutex<LruCache<String, Regex>>,
    metrics: Mutex<CacheMetrics>,
}

impl SegmentCache {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            metrics: Mutex::new(CacheMetrics::default()),
        }
    }

    fn get(&self, key: &str) -> Option<Regex> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);

        match cache.get(key) {
            Some(re) => {
                metrics.hits += 1;
                Some(re.clone())
            }
            None => {
                metrics.misses += 1;
                None
            }
        }
    }

    fn put(&self, key: String, value: Regex) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);

        cache.put(key, value);
        metrics.size = cache.len();
    }

    fn metrics(&self) -> CacheMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

static SEGMENT_CACHE: Lazy<SegmentCache> = Lazy::new(|| {
    SegmentCache::new(NonZeroUsize::new(MAX_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN))
});

/// Translates one glob segment into an anchored regex source
///
/// Only `*` (any run, possibly empty) and `?` (exactly one character) are
/// special; everything else matches literally.
pub fn segment_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push_str("^(?s:");
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    out.push_str(")$");
    out
}

/// Retrieves the compiled matcher for a glob segment, compiling and caching it on a miss
///
/// # Errors
///
/// Returns `CrawlError::RegexTooComplex` for segments over the length guard
pub fn get_or_compile_segment(glob: &str) -> Result<Regex, CrawlError> {
    if glob.len() > MAX_SEGMENT_LEN {
        return Err(CrawlError::RegexTooComplex);
    }

    if let Some(cached) = SEGMENT_CACHE.get(glob) {
        return Ok(cached);
    }

    let re = Regex::new(&segment_to_regex(glob))?;
    SEGMENT_CACHE.put(glob.to_string(), re.clone());
    Ok(re)
}

/// Returns metrics for the segment cache
pub fn cache_metrics() -> CacheMetrics {
    SEGMENT_CACHE.metrics()
}
