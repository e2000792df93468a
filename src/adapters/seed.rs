//! CSV import of reference data into the SQLite store.
//!
//! Airports: `iata_code,icao_code,name,city,country,country_code,latitude,longitude,timezone,airport_type,is_active,passenger_count`
//! Metros:   `iata_code,name,country,country_code,latitude,longitude,primary_airport,airport_codes` (members separated by `|`)
//! Aliases:  `airport_code,alias,alias_type,match_weight`

use crate::adapters::sqlite_store::{insert_alias, upsert_airport, upsert_metro, SqliteAirportStore};
use crate::domain::model::{Airport, AirportAlias, AirportType, MetroArea};
use crate::utils::error::{ResolverError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct AirportRecord {
    iata_code: String,
    icao_code: Option<String>,
    name: String,
    city: String,
    country: String,
    country_code: String,
    latitude: f64,
    longitude: f64,
    timezone: Option<String>,
    airport_type: Option<String>,
    is_active: Option<bool>,
    passenger_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MetroRecord {
    iata_code: String,
    name: String,
    country: String,
    country_code: String,
    latitude: f64,
    longitude: f64,
    primary_airport: String,
    #[serde(default)]
    airport_codes: String,
}

#[derive(Debug, Deserialize)]
struct AliasRecord {
    airport_code: String,
    alias: String,
    alias_type: Option<String>,
    match_weight: Option<f64>,
}

fn check_code(field: &str, code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ResolverError::invalid_input(format!(
            "{} '{}' is not a 3-letter IATA code",
            field, code
        )));
    }
    Ok(code)
}

impl TryFrom<AirportRecord> for Airport {
    type Error = ResolverError;

    fn try_from(record: AirportRecord) -> Result<Self> {
        let airport_type = match record.airport_type.as_deref() {
            None | Some("") => AirportType::Medium,
            Some(raw) => AirportType::parse(raw).ok_or_else(|| {
                ResolverError::invalid_input(format!("unknown airport_type '{}'", raw))
            })?,
        };

        Ok(Airport {
            iata_code: check_code("iata_code", &record.iata_code)?,
            icao_code: record.icao_code.filter(|c| !c.is_empty()),
            name: record.name,
            city: record.city,
            country: record.country,
            country_code: record.country_code.to_ascii_uppercase(),
            latitude: record.latitude,
            longitude: record.longitude,
            timezone: record.timezone.filter(|tz| !tz.is_empty()),
            airport_type,
            is_active: record.is_active.unwrap_or(true),
            passenger_count: record.passenger_count,
        })
    }
}

pub async fn import_airports<R: Read>(store: &SqliteAirportStore, reader: R) -> Result<usize> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut tx = store.pool().begin().await?;
    let mut count = 0;

    for record in csv_reader.deserialize::<AirportRecord>() {
        let airport = Airport::try_from(record?)?;
        upsert_airport(&mut tx, &airport).await?;
        count += 1;
    }

    tx.commit().await?;
    tracing::info!("Imported {} airports", count);
    Ok(count)
}

pub async fn import_metros<R: Read>(store: &SqliteAirportStore, reader: R) -> Result<usize> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut tx = store.pool().begin().await?;
    let mut count = 0;

    for record in csv_reader.deserialize::<MetroRecord>() {
        let record = record?;
        let airport_codes = record
            .airport_codes
            .split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| check_code("airport_codes", c))
            .collect::<Result<Vec<_>>>()?;

        let metro = MetroArea {
            iata_code: check_code("iata_code", &record.iata_code)?,
            name: record.name,
            country: record.country,
            country_code: record.country_code.to_ascii_uppercase(),
            latitude: record.latitude,
            longitude: record.longitude,
            airport_codes,
            primary_airport: check_code("primary_airport", &record.primary_airport)?,
        };
        upsert_metro(&mut tx, &metro).await?;
        count += 1;
    }

    tx.commit().await?;
    tracing::info!("Imported {} metro areas", count);
    Ok(count)
}

pub async fn import_aliases<R: Read>(store: &SqliteAirportStore, reader: R) -> Result<usize> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut tx = store.pool().begin().await?;
    let mut count = 0;

    for record in csv_reader.deserialize::<AliasRecord>() {
        let record = record?;
        let alias = AirportAlias {
            airport_code: check_code("airport_code", &record.airport_code)?,
            alias: record.alias,
            alias_type: record
                .alias_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "common_name".to_string()),
            match_weight: record.match_weight.unwrap_or(1.0),
        };
        insert_alias(&mut tx, &alias).await?;
        count += 1;
    }

    tx.commit().await?;
    tracing::info!("Imported {} aliases", count);
    Ok(count)
}
