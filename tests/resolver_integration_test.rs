use airport_resolver::adapters::seed;
use airport_resolver::config::{DatabaseConfig, GeocodingConfig};
use airport_resolver::{
    HttpGeocoder, LookupOptions, Resolver, ResolverError, ResultKind, Source, SqliteAirportStore,
};
use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;

const AIRPORTS_CSV: &str = "\
iata_code,icao_code,name,city,country,country_code,latitude,longitude,timezone,airport_type,is_active,passenger_count
JFK,KJFK,John F. Kennedy International Airport,New York,United States,US,40.6413,-73.7781,America/New_York,large,true,62000000
LGA,KLGA,LaGuardia Airport,New York,United States,US,40.7769,-73.874,America/New_York,large,true,32000000
EWR,KEWR,Newark Liberty International Airport,Newark,United States,US,40.6895,-74.1745,America/New_York,large,true,49000000
YYZ,CYYZ,Toronto Pearson International Airport,Toronto,Canada,CA,43.6777,-79.6248,America/Toronto,large,true,50000000
YTZ,CYTZ,Billy Bishop Toronto City Airport,Toronto,Canada,CA,43.6275,-79.3962,America/Toronto,medium,true,2800000
";

const METROS_CSV: &str = "\
iata_code,name,country,country_code,latitude,longitude,primary_airport,airport_codes
NYC,New York,United States,US,40.7128,-74.006,JFK,JFK|EWR|LGA
YTO,Toronto,Canada,CA,43.6532,-79.3832,YYZ,YYZ|YTZ
";

const ALIASES_CSV: &str = "\
airport_code,alias,alias_type,match_weight
JFK,Kennedy,common_name,0.95
YYZ,Pearson,common_name,0.9
";

async fn seeded_store() -> Result<Arc<SqliteAirportStore>> {
    let store = SqliteAirportStore::connect(&DatabaseConfig::default()).await?;
    seed::import_airports(&store, AIRPORTS_CSV.as_bytes()).await?;
    seed::import_metros(&store, METROS_CSV.as_bytes()).await?;
    seed::import_aliases(&store, ALIASES_CSV.as_bytes()).await?;
    Ok(Arc::new(store))
}

fn geocoder(server: &MockServer) -> Result<Arc<HttpGeocoder>> {
    let config = GeocodingConfig {
        enabled: true,
        endpoint: Some(server.url("/v1/locations")),
        api_key: None,
        timeout_seconds: 2,
        default_confidence: 0.6,
    };
    Ok(Arc::new(HttpGeocoder::new(&config)?))
}

async fn full_stack(server: &MockServer) -> Result<(Resolver, Arc<SqliteAirportStore>)> {
    let store = seeded_store().await?;
    let resolver = Resolver::builder()
        .store(store.clone())
        .geocoder(geocoder(server)?)
        .cache_size(100)
        .build();
    Ok((resolver, store))
}

#[tokio::test]
async fn test_exact_code_then_memory() -> Result<()> {
    let server = MockServer::start();
    let (resolver, store) = full_stack(&server).await?;

    let first = resolver.lookup("JFK", LookupOptions::default()).await?;
    assert_eq!(first.iata_code, "JFK");
    assert_eq!(first.kind, ResultKind::Airport);
    assert_eq!(first.confidence, 1.0);
    assert_eq!(first.source, Source::Db);

    let second = resolver.lookup("jfk airport", LookupOptions::default()).await?;
    assert_eq!(second.iata_code, "JFK");
    assert_eq!(second.confidence, 1.0);
    assert_eq!(second.source, Source::Memory);
    assert_eq!(second.origin, Source::Db);

    let persisted: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lookup_cache WHERE iata_code = 'JFK'")
        .fetch_one(store.pool())
        .await?;
    assert_eq!(persisted, 1);

    let stats = resolver.get_stats();
    assert_eq!(stats.hits.db, 1);
    assert_eq!(stats.hits.memory, 1);
    assert_eq!(stats.hit_rate, "100.00%");
    Ok(())
}

#[tokio::test]
async fn test_city_name_prefers_metro_with_alternatives() -> Result<()> {
    let server = MockServer::start();
    let (resolver, _store) = full_stack(&server).await?;

    let result = resolver.lookup("New York City", LookupOptions::default()).await?;
    assert_eq!(result.iata_code, "NYC");
    assert_eq!(result.kind, ResultKind::Metro);
    assert_eq!(result.airport_codes, vec!["JFK", "EWR", "LGA"]);
    assert!(result.confidence <= 1.0);

    let typo = resolver.lookup("Torontoo", LookupOptions::default()).await?;
    assert_eq!(typo.iata_code, "YTO");
    assert!(typo.alternatives.iter().any(|alt| alt.iata_code == "YYZ"));
    assert!(typo.alternatives.iter().all(|alt| alt.iata_code != "YTO"));
    Ok(())
}

#[tokio::test]
async fn test_airport_preference_uses_separate_cache_key() -> Result<()> {
    let server = MockServer::start();
    let (resolver, _store) = full_stack(&server).await?;

    let metro = resolver.lookup("Toronto", LookupOptions::default()).await?;
    let airport_options = LookupOptions {
        prefer_metro: false,
        ..LookupOptions::default()
    };
    let airport = resolver.lookup("Toronto", airport_options).await?;

    assert_eq!(metro.iata_code, "YTO");
    assert_eq!(airport.kind, ResultKind::Airport);
    // busier airport wins the tie between two exact city matches
    assert_eq!(airport.iata_code, "YYZ");
    assert_eq!(airport.source, Source::Db);
    assert_eq!(resolver.get_stats().cache_size, 2);
    Ok(())
}

#[tokio::test]
async fn test_provider_used_when_store_has_nothing() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/locations")
            .query_param("keyword", "reykjavik");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "data": [{
                    "subType": "AIRPORT",
                    "iataCode": "KEF",
                    "name": "KEFLAVIK INTL",
                    "address": {"cityName": "REYKJAVIK", "countryName": "ICELAND", "countryCode": "IS"},
                    "geoCode": {"latitude": 63.985, "longitude": -22.6056},
                    "relevance": 0.88
                }]
            }));
    });

    let (resolver, _store) = full_stack(&server).await?;
    let result = resolver.lookup("Reykjavik", LookupOptions::default()).await?;

    api_mock.assert();
    assert_eq!(result.iata_code, "KEF");
    assert_eq!(result.city, "Reykjavik");
    assert_eq!(result.source, Source::Api);
    assert_eq!(resolver.get_stats().hits.api, 1);
    Ok(())
}

#[tokio::test]
async fn test_provider_failure_falls_back_to_static_table() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/v1/locations").query_param("keyword", "paris");
        then.status(500);
    });

    let (resolver, _store) = full_stack(&server).await?;
    let result = resolver.lookup("Paris", LookupOptions::default()).await?;

    api_mock.assert();
    assert_eq!(result.iata_code, "PAR");
    assert_eq!(result.source, Source::Fallback);

    let stats = resolver.get_stats();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.hits.fallback, 1);
    Ok(())
}

#[tokio::test]
async fn test_not_found_embeds_original_query() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/locations");
        then.status(200).json_body(json!({"data": []}));
    });

    let (resolver, _store) = full_stack(&server).await?;
    let err = resolver
        .lookup("  UnknownCityXYZ123 ", LookupOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolverError::NotFound { .. }));
    assert!(err.to_string().contains("UnknownCityXYZ123"));
    assert_eq!(resolver.get_stats().misses, 1);
    assert_eq!(resolver.get_stats().hit_rate, "0.00%");
    assert!(!resolver.can_resolve("UnknownCityXYZ123").await);
    assert!(resolver.get_airport_info("UnknownCityXYZ123").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_exact_only_request_skips_provider() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/v1/locations");
        then.status(200).json_body(json!({"data": []}));
    });

    let (resolver, _store) = full_stack(&server).await?;
    let options = LookupOptions {
        fuzzy: false,
        ..LookupOptions::default()
    };
    let result = resolver.lookup("London", options).await?;

    api_mock.assert_hits(0);
    assert_eq!(result.iata_code, "LON");
    assert_eq!(result.source, Source::Fallback);
    Ok(())
}

#[tokio::test]
async fn test_clear_db_cache_removes_stale_rows() -> Result<()> {
    let server = MockServer::start();
    let (resolver, store) = full_stack(&server).await?;

    resolver.lookup("JFK", LookupOptions::default()).await?;
    resolver.lookup("YYZ", LookupOptions::default()).await?;
    assert_eq!(resolver.clear_db_cache(30).await?, 0);

    sqlx::query("UPDATE lookup_cache SET created_at = created_at - 31 * 86400 WHERE iata_code = 'JFK'")
        .execute(store.pool())
        .await?;
    assert_eq!(resolver.clear_db_cache(30).await?, 1);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lookup_cache")
        .fetch_one(store.pool())
        .await?;
    assert_eq!(remaining, 1);

    // the memory cache is untouched by a store purge
    assert_eq!(resolver.get_stats().cache_size, 2);
    resolver.clear_cache();
    assert_eq!(resolver.get_stats().cache_size, 0);
    Ok(())
}

#[tokio::test]
async fn test_batch_lookup_isolates_failures() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/locations");
        then.status(200).json_body(json!({"data": []}));
    });

    let (resolver, _store) = full_stack(&server).await?;
    let queries = vec![json!("JFK"), json!(123), json!("Toronto"), json!("UnknownCityXYZ123")];
    let items = resolver.batch_lookup(&queries, LookupOptions::default()).await?;

    assert_eq!(items.len(), 4);
    assert!(items[0].success);
    assert_eq!(items[0].result.as_ref().unwrap().iata_code, "JFK");
    assert!(!items[1].success);
    assert!(items[1].error.as_ref().unwrap().starts_with("Invalid input"));
    assert!(items[2].success);
    assert!(!items[3].success);
    assert_eq!(items.iter().filter(|item| !item.success).count(), 2);
    Ok(())
}
