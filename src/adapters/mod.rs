// Adapters layer: concrete implementations for external systems (store, http provider, static data).

pub mod fallback;
pub mod geocoding;
pub mod seed;
pub mod sqlite_store;
