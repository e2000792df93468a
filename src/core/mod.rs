pub mod cache;
pub mod normalizer;
pub mod resolver;
pub mod scoring;
pub mod tiers;

pub use crate::domain::model::{LookupOptions, LookupResult, ResultKind, Source, Stats};
pub use crate::domain::ports::{AirportStore, GeocodingProvider};
pub use crate::utils::error::Result;
