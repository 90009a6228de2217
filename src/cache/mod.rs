//! Cache
//!
//! Este módulo contiene el cache en memoria del backend remoto.

pub mod cache_config;
pub mod ttl_cache;

pub use cache_config::CacheConfig;
pub use ttl_cache::{CacheStats, TtlCache};
