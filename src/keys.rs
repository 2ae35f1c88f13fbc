use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use crate::error::ServiceError;

/// Strategy for choosing which credential to use for a service call.
///
/// Selection happens once per call, with no sticky affinity and no
/// per-key quota tracking.
pub trait KeySelector: Send + Sync {
    /// Pick an index into a pool of `len` credentials (`len >= 1`).
    /// Indices are taken modulo the pool size.
    fn select(&self, len: usize) -> usize;
}

/// Uniform random selection. The default strategy.
#[derive(Debug, Default)]
pub struct UniformRandom;

impl KeySelector for UniformRandom {
    fn select(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Deterministic rotation through the pool. Useful in tests and for
/// spreading calls evenly across keys.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl KeySelector for RoundRobin {
    fn select(&self, len: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % len
    }
}

/// Immutable pool of API credentials with a pluggable selection
/// strategy.
///
/// A pool is resolved once at client construction; an empty pool is a
/// construction-time error so missing credentials are reported before
/// any run starts rather than per item.
pub struct KeyPool {
    keys: Vec<String>,
    selector: Box<dyn KeySelector>,
}

impl KeyPool {
    /// Build a pool from explicit keys. Blank entries are dropped.
    pub fn new(keys: Vec<String>) -> Result<Self, ServiceError> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return Err(ServiceError::Auth(
                "No API credentials configured".to_string(),
            ));
        }
        Ok(Self {
            keys,
            selector: Box::new(UniformRandom),
        })
    }

    /// Build a pool from a comma-joined credential blob, the format
    /// the settings screen stores.
    pub fn from_blob(blob: &str) -> Result<Self, ServiceError> {
        Self::new(blob.split(',').map(|k| k.to_string()).collect())
    }

    /// Replace the selection strategy.
    pub fn with_selector(mut self, selector: impl KeySelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolve a credential for one call.
    pub fn pick(&self) -> &str {
        let idx = self.selector.select(self.keys.len()) % self.keys.len();
        &self.keys[idx]
    }
}

impl std::fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print credential material
        f.debug_struct("KeyPool")
            .field("keys", &format!("<{} redacted>", self.keys.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_blob_parsing() {
        let pool = KeyPool::from_blob("key-a, key-b ,,key-c").unwrap();
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(KeyPool::new(vec![]).is_err());
        assert!(KeyPool::from_blob("").is_err());
        assert!(KeyPool::from_blob(" , ,").is_err());
    }

    #[test]
    fn test_single_key_always_picked() {
        let pool = KeyPool::from_blob("only-key").unwrap();
        for _ in 0..10 {
            assert_eq!(pool.pick(), "only-key");
        }
    }

    #[test]
    fn test_uniform_random_stays_in_range() {
        let pool = KeyPool::from_blob("a,b,c").unwrap();
        for _ in 0..100 {
            let key = pool.pick();
            assert!(["a", "b", "c"].contains(&key));
        }
    }

    #[test]
    fn test_round_robin_cycles() {
        let pool = KeyPool::from_blob("a,b,c")
            .unwrap()
            .with_selector(RoundRobin::default());
        let picked: Vec<&str> = (0..6).map(|_| pool.pick()).collect();
        assert_eq!(picked, vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn test_debug_redacts_keys() {
        let pool = KeyPool::from_blob("secret-key-1,secret-key-2").unwrap();
        let debug = format!("{:?}", pool);
        assert!(!debug.contains("secret-key-1"));
        assert!(debug.contains("2 redacted"));
    }
}
