//! Cache en memoria con expiración
//!
//! Lectura a través del cache para el backend remoto: cada entrada vive
//! `ttl` y se descarta completa cuando el backend lo pide.

use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::CacheConfig;

/// Datos en cache con metadatos
#[derive(Debug, Clone)]
struct CachedEntry<V> {
    value: V,
    created_at: Instant,
    last_accessed: Instant,
}

/// Estadísticas del cache
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries_created: u64,
    pub entries_expired: u64,
    pub entries_evicted: u64,
}

pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CachedEntry<V>>>,
    config: CacheConfig,
    stats: RwLock<CacheStats>,
}

impl<V: Clone + Send + Sync> TtlCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().await;
        let mut stats = self.stats.write().await;

        let Some(entry) = entries.get_mut(key) else {
            stats.misses += 1;
            return None;
        };
        if entry.created_at.elapsed() > self.config.ttl() {
            entries.remove(key);
            stats.entries_expired += 1;
            stats.misses += 1;
            debug!("Cache miss (expirado) para {}", key);
            return None;
        }
        entry.last_accessed = Instant::now();
        stats.hits += 1;
        Some(entry.value.clone())
    }

    pub async fn set(&self, key: &str, value: V) {
        let mut entries = self.entries.write().await;
        let mut stats = self.stats.write().await;

        if !entries.contains_key(key) && entries.len() >= self.config.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                stats.entries_evicted += 1;
                debug!("Entrada LRU eliminada: {}", oldest);
            }
        }

        let now = Instant::now();
        entries.insert(
            key.to_string(),
            CachedEntry {
                value,
                created_at: now,
                last_accessed: now,
            },
        );
        stats.entries_created += 1;
    }

    /// Limpiar todo el cache
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        if !entries.is_empty() {
            info!("🧹 Cache limpiado ({} entradas)", entries.len());
        }
        entries.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        *self.stats.read().await
    }

    pub async fn size(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl_seconds: u64, max_entries: usize) -> CacheConfig {
        CacheConfig { ttl_seconds, max_entries }
    }

    #[tokio::test]
    async fn test_cache_basic_operations() {
        let cache = TtlCache::new(config(60, 10));
        assert!(cache.get("ots").await.is_none());

        cache.set("ots", vec![1001_i64]).await;
        assert_eq!(cache.get("ots").await, Some(vec![1001]));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries_created, 1);

        cache.clear().await;
        assert_eq!(cache.size().await, 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_expires() {
        let cache = TtlCache::new(config(0, 10));
        cache.set("ots", 1).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(cache.get("ots").await.is_none());
        assert_eq!(cache.stats().await.entries_expired, 1);
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let cache = TtlCache::new(config(60, 2));
        cache.set("a", 1).await;
        cache.set("b", 2).await;
        cache.get("a").await;
        cache.set("c", 3).await;

        assert_eq!(cache.get("a").await, Some(1));
        assert!(cache.get("b").await.is_none());
        assert_eq!(cache.stats().await.entries_evicted, 1);
    }
}
