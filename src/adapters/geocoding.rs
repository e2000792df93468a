use crate::config::GeocodingConfig;
use crate::core::scoring::calculate_confidence;
use crate::domain::model::{LookupResult, ResultKind, Source};
use crate::domain::ports::GeocodingProvider;
use crate::utils::error::{ResolverError, Result};
use crate::utils::validation::validate_required_field;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct LocationResponse {
    #[serde(default)]
    data: Vec<Location>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    sub_type: String,
    iata_code: String,
    name: String,
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    geo_code: Option<GeoCode>,
    #[serde(default)]
    time_zone: Option<String>,
    /// Provider relevance, either in [0, 1] or as a percentage.
    #[serde(default)]
    relevance: Option<f64>,
    /// Member airports for city entries, when the provider lists them.
    #[serde(default)]
    airports: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Address {
    #[serde(default)]
    city_name: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeoCode {
    latitude: f64,
    longitude: f64,
}

pub struct HttpGeocoder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    default_confidence: f64,
}

impl HttpGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let endpoint = validate_required_field("geocoding.endpoint", &config.endpoint)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            default_confidence: config.default_confidence,
        })
    }

    fn confidence_for(&self, relevance: Option<f64>) -> f64 {
        let raw = match relevance {
            Some(score) if score > 1.0 => (score / 100.0).min(1.0),
            Some(score) => score,
            None => self.default_confidence,
        };
        calculate_confidence(raw)
    }

    fn to_result(&self, location: Location) -> Option<LookupResult> {
        let code = location.iata_code.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        let kind = match location.sub_type.to_ascii_uppercase().as_str() {
            "AIRPORT" => ResultKind::Airport,
            "CITY" => ResultKind::Metro,
            _ => return None,
        };

        let address = location.address.unwrap_or_default();
        let name = title_case(&location.name);
        let city = address.city_name.as_deref().map(title_case).unwrap_or_else(|| name.clone());

        // a city code is usable for search even without a member list
        let airport_codes = match kind {
            ResultKind::Metro if location.airports.is_empty() => vec![code.clone()],
            ResultKind::Metro => location.airports.iter().map(|c| c.to_ascii_uppercase()).collect(),
            ResultKind::Airport => Vec::new(),
        };

        Some(LookupResult {
            kind,
            iata_code: code,
            name,
            city,
            country: address.country_name.as_deref().map(title_case).unwrap_or_default(),
            country_code: address.country_code.unwrap_or_default().to_ascii_uppercase(),
            latitude: location.geo_code.as_ref().map(|g| g.latitude),
            longitude: location.geo_code.as_ref().map(|g| g.longitude),
            timezone: location.time_zone,
            airport_codes,
            passenger_count: None,
            confidence: self.confidence_for(location.relevance),
            alternatives: Vec::new(),
            source: Source::Api,
            origin: Source::Api,
        })
    }
}

#[async_trait]
impl GeocodingProvider for HttpGeocoder {
    async fn search(&self, query: &str, prefer_metro: bool, limit: usize) -> Result<Vec<LookupResult>> {
        tracing::debug!("Geocoding request for '{}' to {}", query, self.endpoint);

        let limit = limit.max(1).to_string();
        let mut request = self.client.get(&self.endpoint).query(&[
            ("keyword", query),
            ("subType", "AIRPORT,CITY"),
            ("limit", limit.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolverError::upstream("api", e))?;

        tracing::debug!("Geocoding response status: {}", response.status());
        if !response.status().is_success() {
            return Err(ResolverError::upstream(
                "api",
                format!("provider returned status {}", response.status()),
            ));
        }

        let payload: LocationResponse = response
            .json()
            .await
            .map_err(|e| ResolverError::upstream("api", format!("malformed payload: {}", e)))?;

        let mut results: Vec<LookupResult> = payload
            .data
            .into_iter()
            .filter_map(|location| self.to_result(location))
            .collect();

        if !prefer_metro && results.iter().any(|r| r.kind == ResultKind::Airport) {
            results.retain(|r| r.kind == ResultKind::Airport);
        }

        Ok(results)
    }
}

/// Providers often return names in upper case ("TORONTO").
fn title_case(text: &str) -> String {
    if text.chars().any(|c| c.is_lowercase()) {
        return text.trim().to_string();
    }
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
