pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use adapters::{fallback::FallbackTable, geocoding::HttpGeocoder, sqlite_store::SqliteAirportStore};
pub use config::ResolverConfig;
pub use core::normalizer::normalize_query;
pub use core::resolver::Resolver;
pub use domain::model::{AirportInfo, BatchItem, LookupOptions, LookupResult, ResultKind, Source, Stats};
pub use utils::error::{ResolverError, Result};
