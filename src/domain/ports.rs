use crate::domain::model::LookupResult;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Relational store holding airports, metro areas, aliases and the
/// persisted lookup cache.
#[async_trait]
pub trait AirportStore: Send + Sync {
    /// Probe airports and metro areas by IATA code. Confidence is 1.0.
    async fn find_by_code(&self, code: &str, prefer_metro: bool) -> Result<Vec<LookupResult>>;

    /// Similarity search over airport name/city, aliases and (when
    /// `prefer_metro`) metro names.
    async fn fuzzy_search(
        &self,
        query: &str,
        prefer_metro: bool,
        limit: usize,
    ) -> Result<Vec<LookupResult>>;

    async fn record_lookup(&self, cache_key: &str, query: &str, result: &LookupResult)
        -> Result<()>;

    /// Remove persisted lookups older than the cutoff; returns rows removed.
    async fn purge_lookup_cache(&self, older_than_days: u32) -> Result<u64>;
}

/// Third-party airport/city search API.
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    async fn search(&self, query: &str, prefer_metro: bool, limit: usize)
        -> Result<Vec<LookupResult>>;
}
