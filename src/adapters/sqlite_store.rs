//! Airport / metro / alias store on SQLite.
//!
//! Exact probes go straight to the primary keys. Fuzzy probes pre-filter
//! rows in SQL (substring or same initial) and score them with
//! `scoring::similarity`; the database does no ranking of its own.

use crate::config::DatabaseConfig;
use crate::core::scoring::{calculate_confidence, similarity, METRO_BONUS};
use crate::domain::model::{
    Airport, AirportAlias, AirportType, LookupResult, MetroArea, Source,
};
use crate::domain::ports::AirportStore;
use crate::utils::error::{ResolverError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS airports (
        iata_code TEXT PRIMARY KEY,
        icao_code TEXT,
        name TEXT NOT NULL,
        city TEXT NOT NULL,
        country TEXT NOT NULL,
        country_code TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        timezone TEXT,
        airport_type TEXT NOT NULL DEFAULT 'medium',
        is_active INTEGER NOT NULL DEFAULT 1,
        passenger_count INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metro_areas (
        iata_code TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        country TEXT NOT NULL,
        country_code TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        primary_airport TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metro_area_airports (
        metro_code TEXT NOT NULL,
        airport_code TEXT NOT NULL,
        position INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (metro_code, airport_code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS airport_aliases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        airport_code TEXT NOT NULL,
        alias TEXT NOT NULL,
        alias_type TEXT NOT NULL DEFAULT 'common_name',
        match_weight REAL NOT NULL DEFAULT 1.0,
        UNIQUE (airport_code, alias)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lookup_cache (
        cache_key TEXT PRIMARY KEY,
        query TEXT NOT NULL,
        iata_code TEXT NOT NULL,
        source TEXT NOT NULL,
        result_json TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_lookup_cache_created_at ON lookup_cache (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_metro_members_airport ON metro_area_airports (airport_code)",
];

const AIRPORT_COLUMNS: &str = "a.iata_code, a.icao_code, a.name, a.city, a.country, \
     a.country_code, a.latitude, a.longitude, a.timezone, a.airport_type, a.is_active, \
     a.passenger_count";

const METRO_COLUMNS: &str = "m.iata_code, m.name, m.country, m.country_code, m.latitude, \
     m.longitude, m.primary_airport, \
     (SELECT p.timezone FROM airports p WHERE p.iata_code = m.primary_airport) AS timezone";

pub struct SqliteAirportStore {
    pool: SqlitePool,
    query_timeout: Duration,
    min_similarity: f64,
}

impl SqliteAirportStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        // every connection to :memory: is its own database
        let in_memory = config.url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { config.max_connections })
            .acquire_timeout(Duration::from_millis(config.query_timeout_ms));
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        let store = Self::from_pool(pool)
            .with_query_timeout(Duration::from_millis(config.query_timeout_ms))
            .with_min_similarity(config.min_similarity);

        if config.create_schema {
            store.create_schema().await?;
        }

        tracing::info!("Connected airport store at {}", config.url);
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            query_timeout: Duration::from_millis(2000),
            min_similarity: 0.75,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn create_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Bound a store call by the query timeout and report failures as upstream.
    async fn timed<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ResolverError::upstream("db", format!("{}: {}", operation, e))),
            Err(_) => Err(ResolverError::upstream(
                "db",
                format!("{} timed out after {:?}", operation, self.query_timeout),
            )),
        }
    }

    async fn fetch_airport(&self, code: &str) -> Result<Option<Airport>> {
        let sql = format!(
            "SELECT {} FROM airports a WHERE a.iata_code = ? AND a.is_active = 1",
            AIRPORT_COLUMNS
        );
        let row = self
            .timed(
                "airport by code",
                sqlx::query(&sql).bind(code).fetch_optional(&self.pool),
            )
            .await?;
        row.as_ref().map(airport_from_row).transpose()
    }

    async fn fetch_metro(&self, code: &str) -> Result<Option<(MetroArea, Option<String>)>> {
        let sql = format!("SELECT {} FROM metro_areas m WHERE m.iata_code = ?", METRO_COLUMNS);
        let row = self
            .timed(
                "metro by code",
                sqlx::query(&sql).bind(code).fetch_optional(&self.pool),
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let (mut metro, timezone) = metro_from_row(&row)?;
        let mut members = self.fetch_members(&[metro.iata_code.clone()]).await?;
        metro.airport_codes = members.remove(&metro.iata_code).unwrap_or_default();
        Ok(Some((metro, timezone)))
    }

    /// Ordered member codes keyed by metro code.
    async fn fetch_members(&self, metro_codes: &[String]) -> Result<HashMap<String, Vec<String>>> {
        let mut members: HashMap<String, Vec<String>> = HashMap::new();
        if metro_codes.is_empty() {
            return Ok(members);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT metro_code, airport_code FROM metro_area_airports WHERE metro_code IN (",
        );
        let mut separated = builder.separated(", ");
        for code in metro_codes {
            separated.push_bind(code);
        }
        separated.push_unseparated(") ORDER BY metro_code, position");

        let rows = self
            .timed("metro members", builder.build().fetch_all(&self.pool))
            .await?;
        for row in rows {
            let metro: String = row.try_get("metro_code")?;
            let airport: String = row.try_get("airport_code")?;
            members.entry(metro).or_default().push(airport);
        }
        Ok(members)
    }

    /// Metro areas containing any of the given airports, with the member
    /// that linked them.
    async fn fetch_parent_metros(
        &self,
        airport_codes: &[String],
    ) -> Result<Vec<(MetroArea, Option<String>, String)>> {
        if airport_codes.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {}, mm.airport_code AS member_code FROM metro_area_airports mm \
             JOIN metro_areas m ON m.iata_code = mm.metro_code WHERE mm.airport_code IN (",
            METRO_COLUMNS
        ));
        let mut separated = builder.separated(", ");
        for code in airport_codes {
            separated.push_bind(code);
        }
        separated.push_unseparated(")");

        let rows = self
            .timed("parent metros", builder.build().fetch_all(&self.pool))
            .await?;
        rows.iter()
            .map(|row| {
                let (metro, timezone) = metro_from_row(row)?;
                let member: String = row.try_get("member_code")?;
                Ok((metro, timezone, member))
            })
            .collect()
    }

    /// Best raw similarity per active airport across name, city and aliases.
    async fn score_airports(&self, query: &str) -> Result<HashMap<String, (Airport, f64)>> {
        let pattern = like_pattern(query);
        let initial: String = query.chars().take(1).collect();
        let mut best: HashMap<String, (Airport, f64)> = HashMap::new();

        let sql = format!(
            "SELECT {} FROM airports a WHERE a.is_active = 1 AND ( \
                lower(a.city) LIKE ?1 ESCAPE '\\' OR lower(a.name) LIKE ?1 ESCAPE '\\' \
                OR substr(lower(a.city), 1, 1) = ?2 OR substr(lower(a.name), 1, 1) = ?2)",
            AIRPORT_COLUMNS
        );
        let rows = self
            .timed(
                "airport fuzzy scan",
                sqlx::query(&sql)
                    .bind(&pattern)
                    .bind(&initial)
                    .fetch_all(&self.pool),
            )
            .await?;
        for row in &rows {
            let airport = airport_from_row(row)?;
            let score = similarity(query, &airport.city).max(similarity(query, &airport.name));
            keep_best(&mut best, airport, score);
        }

        let sql = format!(
            "SELECT {}, al.alias, al.alias_type, al.match_weight FROM airport_aliases al \
             JOIN airports a ON a.iata_code = al.airport_code WHERE a.is_active = 1 AND ( \
                lower(al.alias) LIKE ?1 ESCAPE '\\' OR substr(lower(al.alias), 1, 1) = ?2)",
            AIRPORT_COLUMNS
        );
        let rows = self
            .timed(
                "alias fuzzy scan",
                sqlx::query(&sql)
                    .bind(&pattern)
                    .bind(&initial)
                    .fetch_all(&self.pool),
            )
            .await?;
        for row in &rows {
            let airport = airport_from_row(row)?;
            let alias = AirportAlias {
                airport_code: airport.iata_code.clone(),
                alias: row.try_get("alias")?,
                alias_type: row.try_get("alias_type")?,
                match_weight: row.try_get("match_weight")?,
            };
            let score = similarity(query, &alias.alias) * alias.match_weight.clamp(0.0, 1.0);
            keep_best(&mut best, airport, score);
        }

        best.retain(|_, (_, score)| *score >= self.min_similarity);
        Ok(best)
    }

    async fn score_metro_names(&self, query: &str) -> Result<Vec<(MetroArea, Option<String>, f64)>> {
        let pattern = like_pattern(query);
        let initial: String = query.chars().take(1).collect();
        let sql = format!(
            "SELECT {} FROM metro_areas m WHERE lower(m.name) LIKE ?1 ESCAPE '\\' OR substr(lower(m.name), 1, 1) = ?2",
            METRO_COLUMNS
        );
        let rows = self
            .timed(
                "metro fuzzy scan",
                sqlx::query(&sql)
                    .bind(&pattern)
                    .bind(&initial)
                    .fetch_all(&self.pool),
            )
            .await?;

        let mut scored = Vec::new();
        for row in &rows {
            let (metro, timezone) = metro_from_row(row)?;
            let score = similarity(query, &metro.name);
            if score >= self.min_similarity {
                scored.push((metro, timezone, score));
            }
        }
        Ok(scored)
    }
}

/// Substring pattern for `LIKE ... ESCAPE '\'` with the query's own
/// wildcards taken literally.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn keep_best(best: &mut HashMap<String, (Airport, f64)>, airport: Airport, score: f64) {
    match best.get_mut(&airport.iata_code) {
        Some(entry) if entry.1 >= score => {}
        Some(entry) => entry.1 = score,
        None => {
            best.insert(airport.iata_code.clone(), (airport, score));
        }
    }
}

fn airport_from_row(row: &SqliteRow) -> Result<Airport> {
    let airport_type: String = row.try_get("airport_type")?;
    Ok(Airport {
        iata_code: row.try_get("iata_code")?,
        icao_code: row.try_get("icao_code")?,
        name: row.try_get("name")?,
        city: row.try_get("city")?,
        country: row.try_get("country")?,
        country_code: row.try_get("country_code")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        timezone: row.try_get("timezone")?,
        airport_type: AirportType::parse(&airport_type).unwrap_or(AirportType::Medium),
        is_active: row.try_get("is_active")?,
        passenger_count: row.try_get("passenger_count")?,
    })
}

fn metro_from_row(row: &SqliteRow) -> Result<(MetroArea, Option<String>)> {
    let metro = MetroArea {
        iata_code: row.try_get("iata_code")?,
        name: row.try_get("name")?,
        country: row.try_get("country")?,
        country_code: row.try_get("country_code")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        airport_codes: Vec::new(),
        primary_airport: row.try_get("primary_airport")?,
    };
    Ok((metro, row.try_get("timezone")?))
}

#[async_trait]
impl AirportStore for SqliteAirportStore {
    async fn find_by_code(&self, code: &str, prefer_metro: bool) -> Result<Vec<LookupResult>> {
        let code = code.to_ascii_uppercase();
        let airport = self.fetch_airport(&code).await?;
        let metro = self.fetch_metro(&code).await?;

        // a metro sharing its code with an airport wins only under metro preference
        let result = match (airport, metro) {
            (Some(_), Some((metro, tz))) if prefer_metro => {
                LookupResult::from_metro(&metro, tz, 1.0, Source::Db)
            }
            (Some(airport), _) => LookupResult::from_airport(&airport, 1.0, Source::Db),
            (None, Some((metro, tz))) => LookupResult::from_metro(&metro, tz, 1.0, Source::Db),
            (None, None) => return Ok(Vec::new()),
        };
        Ok(vec![result])
    }

    async fn fuzzy_search(
        &self,
        query: &str,
        prefer_metro: bool,
        limit: usize,
    ) -> Result<Vec<LookupResult>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let airports = self.score_airports(&query).await?;
        let mut candidates: Vec<LookupResult> = airports
            .values()
            .map(|(airport, score)| {
                LookupResult::from_airport(airport, calculate_confidence(*score), Source::Db)
            })
            .collect();

        if prefer_metro {
            // metro raw score: best of its own name and any matched member
            let mut metros: HashMap<String, (MetroArea, Option<String>, f64)> = HashMap::new();
            for (metro, tz, score) in self.score_metro_names(&query).await? {
                metros.insert(metro.iata_code.clone(), (metro, tz, score));
            }

            let codes: Vec<String> = airports.keys().cloned().collect();
            for (metro, tz, member) in self.fetch_parent_metros(&codes).await? {
                let member_score = airports.get(&member).map(|(_, s)| *s).unwrap_or(0.0);
                match metros.get_mut(&metro.iata_code) {
                    Some(entry) => entry.2 = entry.2.max(member_score),
                    None => {
                        metros.insert(metro.iata_code.clone(), (metro, tz, member_score));
                    }
                }
            }

            let metro_codes: Vec<String> = metros.keys().cloned().collect();
            let mut members = self.fetch_members(&metro_codes).await?;
            for (code, (mut metro, tz, score)) in metros {
                metro.airport_codes = members.remove(&code).unwrap_or_default();
                let confidence = calculate_confidence(score + METRO_BONUS);
                candidates.push(LookupResult::from_metro(&metro, tz, confidence, Source::Db));
            }
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(limit.max(1));

        tracing::debug!("Fuzzy store search '{}' -> {} candidate(s)", query, candidates.len());
        Ok(candidates)
    }

    async fn record_lookup(&self, cache_key: &str, query: &str, result: &LookupResult) -> Result<()> {
        let payload = serde_json::to_string(result)?;
        let now = chrono::Utc::now().timestamp();

        self.timed(
            "record lookup",
            sqlx::query(
                r#"
                INSERT INTO lookup_cache (cache_key, query, iata_code, source, result_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(cache_key) DO UPDATE SET
                    query = excluded.query,
                    iata_code = excluded.iata_code,
                    source = excluded.source,
                    result_json = excluded.result_json,
                    created_at = excluded.created_at
                "#,
            )
            .bind(cache_key)
            .bind(query)
            .bind(&result.iata_code)
            .bind(result.origin.as_str())
            .bind(payload)
            .bind(now)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn purge_lookup_cache(&self, older_than_days: u32) -> Result<u64> {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(older_than_days));

        let done = self
            .timed(
                "purge lookup cache",
                sqlx::query("DELETE FROM lookup_cache WHERE created_at < ?")
                    .bind(cutoff.timestamp())
                    .execute(&self.pool),
            )
            .await?;
        Ok(done.rows_affected())
    }
}

pub async fn upsert_airport(conn: &mut SqliteConnection, airport: &Airport) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO airports (iata_code, icao_code, name, city, country, country_code,
                              latitude, longitude, timezone, airport_type, is_active, passenger_count)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(iata_code) DO UPDATE SET
            icao_code = excluded.icao_code, name = excluded.name, city = excluded.city,
            country = excluded.country, country_code = excluded.country_code,
            latitude = excluded.latitude, longitude = excluded.longitude,
            timezone = excluded.timezone, airport_type = excluded.airport_type,
            is_active = excluded.is_active, passenger_count = excluded.passenger_count
        "#,
    )
    .bind(airport.iata_code.to_ascii_uppercase())
    .bind(&airport.icao_code)
    .bind(&airport.name)
    .bind(&airport.city)
    .bind(&airport.country)
    .bind(&airport.country_code)
    .bind(airport.latitude)
    .bind(airport.longitude)
    .bind(&airport.timezone)
    .bind(airport.airport_type.as_str())
    .bind(airport.is_active)
    .bind(airport.passenger_count)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Replaces the metro row and its member list.
pub async fn upsert_metro(conn: &mut SqliteConnection, metro: &MetroArea) -> Result<()> {
    let code = metro.iata_code.to_ascii_uppercase();
    sqlx::query(
        r#"
        INSERT INTO metro_areas (iata_code, name, country, country_code, latitude, longitude, primary_airport)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(iata_code) DO UPDATE SET
            name = excluded.name, country = excluded.country, country_code = excluded.country_code,
            latitude = excluded.latitude, longitude = excluded.longitude,
            primary_airport = excluded.primary_airport
        "#,
    )
    .bind(&code)
    .bind(&metro.name)
    .bind(&metro.country)
    .bind(&metro.country_code)
    .bind(metro.latitude)
    .bind(metro.longitude)
    .bind(metro.primary_airport.to_ascii_uppercase())
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM metro_area_airports WHERE metro_code = ?")
        .bind(&code)
        .execute(&mut *conn)
        .await?;

    let mut members = vec![metro.primary_airport.to_ascii_uppercase()];
    for member in &metro.airport_codes {
        let member = member.to_ascii_uppercase();
        if !members.contains(&member) {
            members.push(member);
        }
    }
    for (position, member) in members.iter().enumerate() {
        sqlx::query(
            "INSERT INTO metro_area_airports (metro_code, airport_code, position) VALUES (?, ?, ?)",
        )
        .bind(&code)
        .bind(member)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn insert_alias(conn: &mut SqliteConnection, alias: &AirportAlias) -> Result<()> {
    if !(alias.match_weight > 0.0 && alias.match_weight <= 1.0) {
        return Err(ResolverError::invalid_input(format!(
            "alias '{}' has match weight {} outside (0, 1]",
            alias.alias, alias.match_weight
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO airport_aliases (airport_code, alias, alias_type, match_weight)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(airport_code, alias) DO UPDATE SET
            alias_type = excluded.alias_type, match_weight = excluded.match_weight
        "#,
    )
    .bind(alias.airport_code.to_ascii_uppercase())
    .bind(&alias.alias)
    .bind(&alias.alias_type)
    .bind(alias.match_weight)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
