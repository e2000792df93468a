use crate::adapters::fallback::FallbackTable;
use crate::core::normalizer::as_iata_code;
use crate::domain::model::{LookupOptions, LookupResult, Source};
use crate::domain::ports::{AirportStore, GeocodingProvider};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One non-memory resolution source, probed in order by the resolver.
#[async_trait]
pub trait ResolutionTier: Send + Sync {
    fn source(&self) -> Source;

    /// Whether this tier takes part in a lookup with these options.
    fn applies(&self, _options: &LookupOptions) -> bool {
        true
    }

    /// Candidates for an already-normalized query. An empty list passes
    /// the query on to the next tier.
    async fn probe(&self, normalized: &str, options: &LookupOptions) -> Result<Vec<LookupResult>>;
}

pub struct StoreTier {
    store: Arc<dyn AirportStore>,
    candidate_limit: usize,
}

impl StoreTier {
    pub fn new(store: Arc<dyn AirportStore>, candidate_limit: usize) -> Self {
        Self {
            store,
            candidate_limit: candidate_limit.max(1),
        }
    }
}

#[async_trait]
impl ResolutionTier for StoreTier {
    fn source(&self) -> Source {
        Source::Db
    }

    async fn probe(&self, normalized: &str, options: &LookupOptions) -> Result<Vec<LookupResult>> {
        if let Some(code) = as_iata_code(normalized) {
            let exact = self.store.find_by_code(&code, options.prefer_metro).await?;
            if !exact.is_empty() {
                return Ok(exact);
            }
        }

        if !options.fuzzy {
            return Ok(Vec::new());
        }

        self.store
            .fuzzy_search(normalized, options.prefer_metro, self.candidate_limit)
            .await
    }
}

pub struct ApiTier {
    provider: Arc<dyn GeocodingProvider>,
}

impl ApiTier {
    pub fn new(provider: Arc<dyn GeocodingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ResolutionTier for ApiTier {
    fn source(&self) -> Source {
        Source::Api
    }

    // exact-only requests that missed the store skip the provider
    fn applies(&self, options: &LookupOptions) -> bool {
        options.fuzzy
    }

    async fn probe(&self, normalized: &str, options: &LookupOptions) -> Result<Vec<LookupResult>> {
        self.provider
            .search(normalized, options.prefer_metro, options.max_results + 1)
            .await
    }
}

pub struct FallbackTier {
    table: FallbackTable,
}

impl FallbackTier {
    pub fn new(table: FallbackTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl ResolutionTier for FallbackTier {
    fn source(&self) -> Source {
        Source::Fallback
    }

    async fn probe(&self, normalized: &str, options: &LookupOptions) -> Result<Vec<LookupResult>> {
        Ok(self
            .table
            .lookup(normalized, options.prefer_metro)
            .into_iter()
            .collect())
    }
}
