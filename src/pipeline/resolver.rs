use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::cache::ResolutionCache;
use super::extract::extract_timestamp;
use crate::app::ports::{FetchFailure, HttpClientPort};
use crate::observability::metrics;
use crate::types::Cell;

/// Result of resolving one normalized URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The final URL carried a valid capture timestamp
    Resolved(NaiveDateTime),
    /// The request landed, but the final URL has no usable timestamp
    PatternMissing { final_url: String },
    /// The request itself failed
    FetchFailed(FetchFailure),
}

impl ResolutionOutcome {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            ResolutionOutcome::Resolved(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// Trim whitespace and drop at most one leading `@`.
///
/// Returns `None` for non-text cells and blank strings.
pub fn normalize_url(cell: &Cell) -> Option<String> {
    let trimmed = cell.as_text()?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = trimmed.strip_prefix('@').unwrap_or(trimmed);
    Some(url.to_string())
}

/// Turns photo link cells into capture timestamps by following redirects,
/// memoizing every outcome for the lifetime of the resolver.
pub struct RedirectResolver {
    http: Arc<dyn HttpClientPort>,
    cache: ResolutionCache,
    fetches: u64,
}

impl RedirectResolver {
    pub fn new(http: Arc<dyn HttpClientPort>) -> Self {
        Self::with_cache(http, ResolutionCache::new())
    }

    pub fn with_cache(http: Arc<dyn HttpClientPort>, cache: ResolutionCache) -> Self {
        Self { http, cache, fetches: 0 }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Number of network fetches performed so far
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    pub async fn resolve(&mut self, cell: &Cell) -> Option<NaiveDateTime> {
        self.resolve_outcome(cell).await.and_then(|o| o.timestamp())
    }

    /// Full outcome for a cell; `None` when the cell holds no URL at all,
    /// in which case nothing is fetched or cached.
    pub async fn resolve_outcome(&mut self, cell: &Cell) -> Option<ResolutionOutcome> {
        let url = normalize_url(cell)?;

        if let Some(cached) = self.cache.get(&url) {
            metrics::resolver::cache_hit();
            return Some(cached.clone());
        }

        let outcome = self.fetch(&url).await;
        self.cache.insert(url, outcome.clone());
        Some(outcome)
    }

    async fn fetch(&mut self, url: &str) -> ResolutionOutcome {
        self.fetches += 1;
        let started = Instant::now();
        let result = self.http.final_url(url).await;
        metrics::resolver::fetch_duration(started.elapsed().as_secs_f64());

        match result {
            Ok(final_url) => match extract_timestamp(&final_url) {
                Some(ts) => {
                    debug!(%url, %final_url, timestamp = %ts, "Resolved photo timestamp");
                    metrics::resolver::resolved();
                    ResolutionOutcome::Resolved(ts)
                }
                None => {
                    debug!(%url, %final_url, "No timestamp in final URL");
                    metrics::resolver::pattern_missing();
                    ResolutionOutcome::PatternMissing { final_url }
                }
            },
            Err(failure) => {
                warn!(%url, error = %failure, transient = failure.is_transient(), "Failed to resolve photo URL");
                metrics::resolver::fetch_failed(failure.kind());
                ResolutionOutcome::FetchFailed(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeHttp {
        redirects: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeHttp {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                redirects: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClientPort for FakeHttp {
        async fn final_url(&self, url: &str) -> Result<String, FetchFailure> {
            self.calls.lock().unwrap().push(url.to_string());
            self.redirects
                .get(url)
                .cloned()
                .ok_or_else(|| FetchFailure::Connect("unreachable".into()))
        }
    }

    fn setup(pairs: &[(&str, &str)]) -> (Arc<FakeHttp>, RedirectResolver) {
        let http = Arc::new(FakeHttp::new(pairs));
        let resolver = RedirectResolver::new(http.clone());
        (http, resolver)
    }

    #[test]
    fn normalization_trims_and_strips_one_at() {
        assert_eq!(normalize_url(&Cell::from("  @https://x/y  ")), Some("https://x/y".into()));
        assert_eq!(normalize_url(&Cell::from("https://x/y")), Some("https://x/y".into()));
        assert_eq!(normalize_url(&Cell::from("@@https://x/y")), Some("@https://x/y".into()));
        assert_eq!(normalize_url(&Cell::from("   ")), None);
        assert_eq!(normalize_url(&Cell::Empty), None);
        assert_eq!(normalize_url(&Cell::Int(45964825)), None);
    }

    #[tokio::test]
    async fn resolves_timestamp_from_final_url() {
        let (http, mut resolver) =
            setup(&[("https://x/1", "https://cdn/saved-20240101_100000.jpg")]);
        let ts = resolver.resolve(&Cell::from("https://x/1")).await;
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        assert_eq!(ts, Some(expected));
        assert_eq!(http.calls(), vec!["https://x/1"]);
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let (http, mut resolver) =
            setup(&[("https://x/y", "https://cdn/saved-20240101_100000.jpg")]);
        let first = resolver.resolve(&Cell::from("  @https://x/y  ")).await;
        let second = resolver.resolve(&Cell::from("https://x/y")).await;
        assert_eq!(first, second);
        assert_eq!(http.calls().len(), 1);
        assert_eq!(resolver.fetches(), 1);
        assert_eq!(resolver.cache().hits(), 1);
    }

    #[tokio::test]
    async fn failures_are_cached_and_not_retried() {
        let (http, mut resolver) = setup(&[]);
        let cell = Cell::from("https://down/1");
        assert_eq!(resolver.resolve(&cell).await, None);
        let outcome = resolver.resolve_outcome(&cell).await.unwrap();
        assert!(matches!(outcome, ResolutionOutcome::FetchFailed(FetchFailure::Connect(_))));
        assert_eq!(http.calls().len(), 1);
    }

    #[tokio::test]
    async fn landing_without_marker_is_pattern_missing() {
        let (_http, mut resolver) = setup(&[("https://x/2", "https://cdn/photo.jpg")]);
        let outcome = resolver.resolve_outcome(&Cell::from("https://x/2")).await.unwrap();
        assert_eq!(
            outcome,
            ResolutionOutcome::PatternMissing { final_url: "https://cdn/photo.jpg".into() }
        );
        assert_eq!(outcome.timestamp(), None);
    }

    #[tokio::test]
    async fn blank_and_non_text_cells_skip_network_and_cache() {
        let (http, mut resolver) = setup(&[]);
        assert_eq!(resolver.resolve(&Cell::from("  ")).await, None);
        assert_eq!(resolver.resolve(&Cell::Float(1.5)).await, None);
        assert_eq!(resolver.resolve(&Cell::Empty).await, None);
        assert!(http.calls().is_empty());
        assert!(resolver.cache().is_empty());
    }
}
