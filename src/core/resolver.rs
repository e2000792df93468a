use crate::adapters::fallback::FallbackTable;
use crate::adapters::geocoding::HttpGeocoder;
use crate::adapters::sqlite_store::SqliteAirportStore;
use crate::config::ResolverConfig;
use crate::core::cache::EngineState;
use crate::core::normalizer::{get_cache_key, normalize_query};
use crate::core::scoring::select_best_match;
use crate::core::tiers::{ApiTier, FallbackTier, ResolutionTier, StoreTier};
use crate::domain::model::{AirportInfo, BatchItem, LookupOptions, LookupResult, Source, Stats};
use crate::domain::ports::{AirportStore, GeocodingProvider};
use crate::utils::error::{ResolverError, Result};
use crate::utils::validation::{validate_range, Validate};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

pub const MAX_BATCH_SIZE: usize = 50;
pub const MAX_RESULTS_LIMIT: usize = 50;
pub const DEFAULT_CACHE_SIZE: usize = 1000;
pub const DEFAULT_CANDIDATE_LIMIT: usize = 20;

impl Validate for LookupOptions {
    fn validate(&self) -> Result<()> {
        validate_range("maxResults", self.max_results, 1, MAX_RESULTS_LIMIT)
            .map_err(|e| ResolverError::invalid_input(e.to_string()))
    }
}

/// Parse caller-supplied JSON options; `null` means defaults.
pub fn options_from_json(value: &Value) -> Result<LookupOptions> {
    if value.is_null() {
        return Ok(LookupOptions::default());
    }
    let options: LookupOptions = serde_json::from_value(value.clone())
        .map_err(|e| ResolverError::invalid_input(format!("malformed options: {}", e)))?;
    options.validate()?;
    Ok(options)
}

/// Resolves free-form place text to an airport or metro-area code by
/// probing memory, then each configured tier in order.
pub struct Resolver {
    tiers: Vec<Box<dyn ResolutionTier>>,
    store: Option<Arc<dyn AirportStore>>,
    state: Mutex<EngineState>,
    defaults: LookupOptions,
}

pub struct ResolverBuilder {
    store: Option<Arc<dyn AirportStore>>,
    geocoder: Option<Arc<dyn GeocodingProvider>>,
    fallback: Option<FallbackTable>,
    cache_size: usize,
    candidate_limit: usize,
    defaults: LookupOptions,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self {
            store: None,
            geocoder: None,
            fallback: Some(FallbackTable::new()),
            cache_size: DEFAULT_CACHE_SIZE,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            defaults: LookupOptions::default(),
        }
    }
}

impl ResolverBuilder {
    pub fn store(mut self, store: Arc<dyn AirportStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn geocoder(mut self, geocoder: Arc<dyn GeocodingProvider>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn without_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    pub fn cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn candidate_limit(mut self, candidate_limit: usize) -> Self {
        self.candidate_limit = candidate_limit;
        self
    }

    pub fn default_options(mut self, defaults: LookupOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn build(self) -> Resolver {
        let mut tiers: Vec<Box<dyn ResolutionTier>> = Vec::new();
        if let Some(store) = &self.store {
            tiers.push(Box::new(StoreTier::new(store.clone(), self.candidate_limit)));
        }
        if let Some(geocoder) = self.geocoder {
            tiers.push(Box::new(ApiTier::new(geocoder)));
        }
        if let Some(table) = self.fallback {
            tiers.push(Box::new(FallbackTier::new(table)));
        }

        Resolver {
            tiers,
            store: self.store,
            state: Mutex::new(EngineState::new(self.cache_size)),
            defaults: self.defaults,
        }
    }
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// Connect the SQLite store and, when enabled, the HTTP geocoder.
    pub async fn from_config(config: &ResolverConfig) -> Result<Self> {
        config.validate()?;

        let store = SqliteAirportStore::connect(&config.database).await?;
        let mut builder = Resolver::builder()
            .store(Arc::new(store))
            .cache_size(config.cache.max_size)
            .candidate_limit(config.database.candidate_limit)
            .default_options(config.lookup.to_options());

        if config.geocoding.enabled {
            builder = builder.geocoder(Arc::new(HttpGeocoder::new(&config.geocoding)?));
        }

        tracing::info!(
            "Resolver ready (cache size {}, geocoding {})",
            config.cache.max_size,
            if config.geocoding.enabled { "on" } else { "off" }
        );
        Ok(builder.build())
    }

    pub fn default_options(&self) -> LookupOptions {
        self.defaults
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        // counters stay usable even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn lookup(&self, query: &str, options: LookupOptions) -> Result<LookupResult> {
        options.validate()?;
        if query.trim().is_empty() {
            return Err(ResolverError::invalid_input("query must be a non-empty string"));
        }

        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Err(ResolverError::invalid_input("query must be a non-empty string"));
        }
        let key = get_cache_key(&normalized, options.prefer_metro);

        let cached = {
            let mut state = self.state();
            let hit = state.cache.get(&key).map(LookupResult::served_from_memory);
            if hit.is_some() {
                state.counters.record_hit(Source::Memory);
            }
            hit
        };
        if let Some(result) = cached {
            tracing::debug!("Memory hit for '{}' -> {}", key, result.iata_code);
            return Ok(result);
        }

        for tier in &self.tiers {
            if !tier.applies(&options) {
                tracing::debug!("Skipping {} tier for '{}'", tier.source(), normalized);
                continue;
            }

            let candidates = match tier.probe(&normalized, &options).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!("{} tier failed for '{}': {}", tier.source(), normalized, e);
                    self.state().counters.errors += 1;
                    continue;
                }
            };

            tracing::debug!(
                "{} tier returned {} candidate(s) for '{}'",
                tier.source(),
                candidates.len(),
                normalized
            );

            let Some(mut best) = select_best_match(candidates, query, options.max_results) else {
                continue;
            };

            let source = tier.source();
            best.source = source;
            best.origin = source;
            for alternative in &mut best.alternatives {
                alternative.source = source;
                alternative.origin = source;
            }

            {
                let mut state = self.state();
                state.counters.record_hit(source);
                state.cache.put(key.clone(), best.clone());
            }

            self.persist(&key, query, &best).await;

            tracing::info!(
                "Resolved '{}' -> {} ({:?}, confidence {:.2}, via {})",
                query,
                best.iata_code,
                best.kind,
                best.confidence,
                source
            );
            return Ok(best);
        }

        self.state().counters.misses += 1;
        tracing::info!("No match for '{}'", query);
        Err(ResolverError::NotFound {
            query: query.to_string(),
        })
    }

    async fn persist(&self, key: &str, query: &str, result: &LookupResult) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.record_lookup(key, query, result).await {
            tracing::warn!("Failed to persist lookup '{}': {}", key, e);
            self.state().counters.errors += 1;
        }
    }

    /// JSON entry point: rejects `null`, numbers and other non-string queries.
    pub async fn lookup_value(&self, query: &Value, options: LookupOptions) -> Result<LookupResult> {
        match query {
            Value::String(text) => self.lookup(text, options).await,
            Value::Null => Err(ResolverError::invalid_input("query is required")),
            other => Err(ResolverError::invalid_input(format!(
                "query must be a string, got {}",
                json_type_name(other)
            ))),
        }
    }

    pub async fn resolve_airport_code(&self, query: &str) -> Result<String> {
        self.lookup(query, self.defaults)
            .await
            .map(|result| result.iata_code)
    }

    /// Collapses every failure, including not-found, into `None`.
    pub async fn get_airport_info(&self, query: &str) -> Option<AirportInfo> {
        match self.lookup(query, self.defaults).await {
            Ok(result) => Some(AirportInfo::from(&result)),
            Err(e) => {
                tracing::debug!("get_airport_info('{}') failed: {}", query, e);
                None
            }
        }
    }

    pub async fn can_resolve(&self, query: &str) -> bool {
        self.lookup(query, self.defaults).await.is_ok()
    }

    /// Independent lookups; one failing item never aborts the batch.
    pub async fn batch_lookup(&self, queries: &[Value], options: LookupOptions) -> Result<Vec<BatchItem>> {
        options.validate()?;
        if queries.len() > MAX_BATCH_SIZE {
            return Err(ResolverError::invalid_input(format!(
                "batch accepts at most {} queries, got {}",
                MAX_BATCH_SIZE,
                queries.len()
            )));
        }

        let lookups = queries.iter().map(|query| async move {
            match self.lookup_value(query, options).await {
                Ok(result) => BatchItem {
                    query: query.clone(),
                    success: true,
                    result: Some(result),
                    error: None,
                },
                Err(e) => BatchItem {
                    query: query.clone(),
                    success: false,
                    result: None,
                    error: Some(e.to_string()),
                },
            }
        });

        let items = futures::future::join_all(lookups).await;
        let failed = items.iter().filter(|item| !item.success).count();
        tracing::info!("Batch lookup: {} queries, {} failed", items.len(), failed);
        Ok(items)
    }

    pub fn clear_cache(&self) {
        let mut state = self.state();
        let dropped = state.cache.size();
        state.cache.clear();
        tracing::info!("Cleared memory cache ({} entries)", dropped);
    }

    pub async fn clear_db_cache(&self, older_than_days: u32) -> Result<u64> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let removed = store.purge_lookup_cache(older_than_days).await?;
        tracing::info!(
            "Removed {} persisted lookups older than {} days",
            removed,
            older_than_days
        );
        Ok(removed)
    }

    pub fn get_stats(&self) -> Stats {
        self.state().snapshot()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ResultKind;
    use crate::utils::error::ErrorCategory;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn airport(code: &str, confidence: f64) -> LookupResult {
        LookupResult {
            kind: ResultKind::Airport,
            iata_code: code.to_string(),
            name: format!("{} International", code),
            city: "Testville".to_string(),
            country: "Testland".to_string(),
            country_code: "TL".to_string(),
            latitude: Some(1.0),
            longitude: Some(2.0),
            timezone: None,
            airport_codes: vec![],
            passenger_count: None,
            confidence,
            alternatives: vec![],
            source: Source::Db,
            origin: Source::Db,
        }
    }

    /// Store resolving "TST" exactly and "testville" fuzzily; anything
    /// containing "boom" fails.
    #[derive(Default)]
    struct FakeStore {
        probes: AtomicUsize,
        recorded: AtomicUsize,
        purged: AtomicUsize,
    }

    #[async_trait]
    impl AirportStore for FakeStore {
        async fn find_by_code(&self, code: &str, _prefer_metro: bool) -> Result<Vec<LookupResult>> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(if code == "TST" { vec![airport("TST", 1.0)] } else { vec![] })
        }

        async fn fuzzy_search(&self, query: &str, _prefer_metro: bool, _limit: usize) -> Result<Vec<LookupResult>> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if query.contains("boom") {
                return Err(ResolverError::upstream("db", "connection reset"));
            }
            Ok(if query == "testville" {
                vec![airport("TSA", 0.95), airport("TSB", 0.93), airport("TSC", 0.5)]
            } else {
                vec![]
            })
        }

        async fn record_lookup(&self, _key: &str, _query: &str, _result: &LookupResult) -> Result<()> {
            self.recorded.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn purge_lookup_cache(&self, _older_than_days: u32) -> Result<u64> {
            self.purged.fetch_add(1, Ordering::SeqCst);
            Ok(3)
        }
    }

    struct FakeGeocoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GeocodingProvider for FakeGeocoder {
        async fn search(&self, query: &str, _prefer_metro: bool, _limit: usize) -> Result<Vec<LookupResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query == "remoteville" {
                let mut result = airport("RMT", 0.8);
                result.source = Source::Api;
                Ok(vec![result])
            } else {
                Err(ResolverError::upstream("api", "timeout"))
            }
        }
    }

    fn resolver_with(store: Arc<FakeStore>, geocoder: Arc<FakeGeocoder>) -> Resolver {
        Resolver::builder()
            .store(store)
            .geocoder(geocoder)
            .cache_size(10)
            .build()
    }

    fn fakes() -> (Arc<FakeStore>, Arc<FakeGeocoder>) {
        (
            Arc::new(FakeStore::default()),
            Arc::new(FakeGeocoder {
                calls: AtomicUsize::new(0),
            }),
        )
    }

    #[tokio::test]
    async fn test_exact_code_then_memory_hit() {
        let (store, geocoder) = fakes();
        let resolver = resolver_with(store.clone(), geocoder);

        let first = resolver.lookup("tst", LookupOptions::default()).await.unwrap();
        assert_eq!(first.iata_code, "TST");
        assert_eq!(first.confidence, 1.0);
        assert_eq!(first.source, Source::Db);

        let second = resolver.lookup("  TST ", LookupOptions::default()).await.unwrap();
        assert_eq!(second.confidence, 1.0);
        assert_eq!(second.source, Source::Memory);
        assert_eq!(second.origin, Source::Db);

        let stats = resolver.get_stats();
        assert_eq!(stats.hits.db, 1);
        assert_eq!(stats.hits.memory, 1);
        assert_eq!(stats.cache_size, 1);
        assert_eq!(store.recorded.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fuzzy_results_carry_alternatives() {
        let (store, geocoder) = fakes();
        let resolver = resolver_with(store, geocoder);

        let result = resolver.lookup("Testville", LookupOptions::default()).await.unwrap();
        assert_eq!(result.iata_code, "TSA");
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.alternatives[0].iata_code, "TSB");
    }

    #[tokio::test]
    async fn test_store_error_falls_through_to_fallback() {
        let (store, geocoder) = fakes();
        let resolver = resolver_with(store, geocoder.clone());

        // "boom paris" fails in the store and the provider, then misses the table
        let err = resolver.lookup("boom paris", LookupOptions::default()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.to_string().contains("boom paris"));

        let stats = resolver.get_stats();
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_api_tier_used_when_store_empty() {
        let (store, geocoder) = fakes();
        let resolver = resolver_with(store, geocoder);

        let result = resolver.lookup("remoteville", LookupOptions::default()).await.unwrap();
        assert_eq!(result.iata_code, "RMT");
        assert_eq!(result.source, Source::Api);
        assert_eq!(resolver.get_stats().hits.api, 1);
    }

    #[tokio::test]
    async fn test_exact_only_skips_provider() {
        let (store, geocoder) = fakes();
        let resolver = resolver_with(store, geocoder.clone());
        let options = LookupOptions {
            fuzzy: false,
            ..LookupOptions::default()
        };

        let result = resolver.lookup("Toronto", options).await.unwrap();
        assert_eq!(result.iata_code, "YTO");
        assert_eq!(result.source, Source::Fallback);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.get_stats().hits.fallback, 1);
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let (store, geocoder) = fakes();
        let resolver = resolver_with(store.clone(), geocoder);

        for query in [json!(""), json!(null), json!(123), json!(["jfk"])] {
            let err = resolver
                .lookup_value(&query, LookupOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Input, "query {}", query);
        }

        let bad_options = LookupOptions {
            max_results: 0,
            ..LookupOptions::default()
        };
        let err = resolver.lookup("tst", bad_options).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(store.probes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_options_from_json() {
        let options = options_from_json(&json!({"preferMetro": false, "maxResults": 3})).unwrap();
        assert!(!options.prefer_metro);
        assert!(options.fuzzy);
        assert_eq!(options.max_results, 3);

        assert_eq!(options_from_json(&Value::Null).unwrap(), LookupOptions::default());
        assert!(options_from_json(&json!({"maxResults": "many"})).is_err());
        assert!(options_from_json(&json!({"maxResults": 500})).is_err());
        assert!(options_from_json(&json!({"colour": "blue"})).is_err());
    }

    #[tokio::test]
    async fn test_narrow_operations() {
        let (store, geocoder) = fakes();
        let resolver = resolver_with(store, geocoder);

        assert_eq!(resolver.resolve_airport_code("TST").await.unwrap(), "TST");
        assert!(resolver.resolve_airport_code("nowhere at all").await.is_err());

        let info = resolver.get_airport_info("TST").await.unwrap();
        assert_eq!(info.code, "TST");
        assert_eq!(info.city, "Testville");
        assert!(resolver.get_airport_info("nowhere at all").await.is_none());
        assert!(resolver.get_airport_info("").await.is_none());

        assert!(resolver.can_resolve("paris").await);
        assert!(!resolver.can_resolve("nowhere at all").await);
    }

    #[tokio::test]
    async fn test_clear_cache_and_db_cache() {
        let (store, geocoder) = fakes();
        let resolver = resolver_with(store.clone(), geocoder);

        resolver.lookup("TST", LookupOptions::default()).await.unwrap();
        assert_eq!(resolver.get_stats().cache_size, 1);
        resolver.clear_cache();
        assert_eq!(resolver.get_stats().cache_size, 0);

        assert_eq!(resolver.clear_db_cache(30).await.unwrap(), 3);
        assert_eq!(store.purged.load(Ordering::SeqCst), 1);

        let bare = Resolver::builder().build();
        assert_eq!(bare.clear_db_cache(30).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_bounded_across_lookups() {
        let resolver = Resolver::builder().cache_size(3).build();
        for city in ["paris", "london", "tokyo", "rome", "milan", "seoul"] {
            resolver.lookup(city, LookupOptions::default()).await.unwrap();
            assert!(resolver.get_stats().cache_size <= 3);
        }
        assert_eq!(resolver.get_stats().cache_size, 3);
    }

    #[tokio::test]
    async fn test_zero_cache_size_serves_every_lookup_from_tiers() {
        let resolver = Resolver::builder().cache_size(0).build();
        let first = resolver.lookup("paris", LookupOptions::default()).await.unwrap();
        let second = resolver.lookup("paris", LookupOptions::default()).await.unwrap();

        assert_eq!(first.source, Source::Fallback);
        assert_eq!(second.source, Source::Fallback);
        let stats = resolver.get_stats();
        assert_eq!(stats.cache_size, 0);
        assert_eq!(stats.hits.memory, 0);
        assert_eq!(stats.hits.fallback, 2);
    }

    #[tokio::test]
    async fn test_batch_with_malformed_item() {
        let (store, geocoder) = fakes();
        let resolver = resolver_with(store, geocoder);
        let queries = vec![json!("TST"), json!(42), json!("paris"), json!("nowhere at all")];

        let items = resolver.batch_lookup(&queries, LookupOptions::default()).await.unwrap();
        assert_eq!(items.len(), 4);
        assert!(items[0].success);
        assert!(!items[1].success);
        assert!(items[1].error.as_ref().unwrap().contains("Invalid input"));
        assert!(items[2].success);
        assert!(!items[3].success);
    }

    #[tokio::test]
    async fn test_batch_size_limit() {
        let resolver = Resolver::builder().build();
        let queries = vec![json!("paris"); MAX_BATCH_SIZE + 1];
        let err = resolver.batch_lookup(&queries, LookupOptions::default()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Input);
    }

    #[tokio::test]
    async fn test_hit_rate_tracks_hits_and_misses() {
        let resolver = Resolver::builder().build();
        resolver.lookup("paris", LookupOptions::default()).await.unwrap();
        resolver.lookup("paris", LookupOptions::default()).await.unwrap();
        resolver.lookup("london", LookupOptions::default()).await.unwrap();
        let _ = resolver.lookup("UnknownCityXYZ123", LookupOptions::default()).await;

        let stats = resolver.get_stats();
        assert_eq!(stats.hits.total(), 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, "75.00%");
    }
}
