use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AirportType {
    Large,
    Medium,
    Small,
}

impl AirportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Large => "large",
            Self::Medium => "medium",
            Self::Small => "small",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "large" | "large_airport" => Some(Self::Large),
            "medium" | "medium_airport" => Some(Self::Medium),
            "small" | "small_airport" => Some(Self::Small),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub iata_code: String,
    pub icao_code: Option<String>,
    pub name: String,
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
    pub airport_type: AirportType,
    pub is_active: bool,
    pub passenger_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetroArea {
    pub iata_code: String,
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Member airports in display order.
    pub airport_codes: Vec<String>,
    pub primary_airport: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportAlias {
    pub airport_code: String,
    pub alias: String,
    pub alias_type: String,
    /// In (0, 1]; scales the similarity of a match against this alias.
    pub match_weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Airport,
    Metro,
}

/// The resolution tier a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Memory,
    Db,
    Api,
    Fallback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Db => "db",
            Self::Api => "api",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub kind: ResultKind,
    pub iata_code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    /// Member airports for metro results; empty for airports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub airport_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenger_count: Option<i64>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<LookupResult>,
    /// Tier that served this response (`memory` on a cache hit).
    pub source: Source,
    /// Tier that originally acquired the match.
    pub origin: Source,
}

impl LookupResult {
    pub fn from_airport(airport: &Airport, confidence: f64, source: Source) -> Self {
        Self {
            kind: ResultKind::Airport,
            iata_code: airport.iata_code.clone(),
            name: airport.name.clone(),
            city: airport.city.clone(),
            country: airport.country.clone(),
            country_code: airport.country_code.clone(),
            latitude: Some(airport.latitude),
            longitude: Some(airport.longitude),
            timezone: airport.timezone.clone(),
            airport_codes: Vec::new(),
            passenger_count: airport.passenger_count,
            confidence: confidence.clamp(0.0, 1.0),
            alternatives: Vec::new(),
            source,
            origin: source,
        }
    }

    /// `timezone` is taken from the primary member when the caller has it.
    pub fn from_metro(
        metro: &MetroArea,
        timezone: Option<String>,
        confidence: f64,
        source: Source,
    ) -> Self {
        let mut airport_codes = metro.airport_codes.clone();
        if airport_codes.is_empty() {
            airport_codes.push(metro.primary_airport.clone());
        }

        Self {
            kind: ResultKind::Metro,
            iata_code: metro.iata_code.clone(),
            name: metro.name.clone(),
            city: metro.name.clone(),
            country: metro.country.clone(),
            country_code: metro.country_code.clone(),
            latitude: Some(metro.latitude),
            longitude: Some(metro.longitude),
            timezone,
            airport_codes,
            passenger_count: None,
            confidence: confidence.clamp(0.0, 1.0),
            alternatives: Vec::new(),
            source,
            origin: source,
        }
    }

    pub fn is_metro(&self) -> bool {
        self.kind == ResultKind::Metro
    }

    /// Copy of this result as served from the memory cache.
    pub fn served_from_memory(&self) -> Self {
        Self {
            source: Source::Memory,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LookupOptions {
    pub prefer_metro: bool,
    pub fuzzy: bool,
    pub max_results: usize,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            prefer_metro: true,
            fuzzy: true,
            max_results: 5,
        }
    }
}

/// Simplified shape returned by `Resolver::get_airport_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportInfo {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
}

impl From<&LookupResult> for AirportInfo {
    fn from(result: &LookupResult) -> Self {
        Self {
            code: result.iata_code.clone(),
            name: result.name.clone(),
            city: result.city.clone(),
            country: result.country.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub query: serde_json::Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<LookupResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierHits {
    pub memory: u64,
    pub db: u64,
    pub api: u64,
    pub fallback: u64,
}

impl TierHits {
    pub fn total(&self) -> u64 {
        self.memory + self.db + self.api + self.fallback
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub hits: TierHits,
    pub misses: u64,
    pub errors: u64,
    pub cache_size: usize,
    /// Percentage string, e.g. "87.50%".
    pub hit_rate: String,
}
