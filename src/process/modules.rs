//! Module list caching

use crate::core::types::{MemoryResult, ModuleInfo};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default lifetime of a cached module list
pub const DEFAULT_MODULE_TTL: Duration = Duration::from_secs(5);

/// Caches a module list for a fixed time-to-live
#[derive(Debug)]
pub struct ModuleCache {
    ttl: Duration,
    entry: Mutex<Option<(Instant, Vec<ModuleInfo>)>>,
}

impl ModuleCache {
    pub fn new(ttl: Duration) -> Self {
        ModuleCache {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Returns the cached list, refreshing it with `fetch` once it expired
    pub fn get_or_refresh<F>(&self, fetch: F) -> MemoryResult<Vec<ModuleInfo>>
    where
        F: FnOnce() -> MemoryResult<Vec<ModuleInfo>>,
    {
        let mut entry = self.entry.lock();

        if let Some((fetched_at, modules)) = entry.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(modules.clone());
            }
        }

        let modules = fetch()?;
        debug!(count = modules.len(), "refreshed module list");
        *entry = Some((Instant::now(), modules.clone()));
        Ok(modules)
    }

    /// Drops the cached list so the next call fetches again
    pub fn invalidate(&self) {
        *self.entry.lock() = None;
    }
}

impl Default for ModuleCache {
    fn default() -> Self {
        ModuleCache::new(DEFAULT_MODULE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Address, MemoryError};
    use std::cell::Cell;

    fn sample() -> Vec<ModuleInfo> {
        vec![ModuleInfo::new("game.exe", Address::new(0x140000000), 0x1000)]
    }

    #[test]
    fn test_cache_hit() {
        let cache = ModuleCache::new(Duration::from_secs(60));
        let calls = Cell::new(0);

        for _ in 0..3 {
            let modules = cache
                .get_or_refresh(|| {
                    calls.set(calls.get() + 1);
                    Ok(sample())
                })
                .unwrap();
            assert_eq!(modules.len(), 1);
        }
        assert_eq!(calls.get(), 1);

        cache.invalidate();
        cache.get_or_refresh(|| {
            calls.set(calls.get() + 1);
            Ok(sample())
        })
        .unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_zero_ttl_always_refreshes() {
        let cache = ModuleCache::new(Duration::ZERO);
        let calls = Cell::new(0);
        for _ in 0..2 {
            cache
                .get_or_refresh(|| {
                    calls.set(calls.get() + 1);
                    Ok(sample())
                })
                .unwrap();
        }
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_fetch_error_not_cached() {
        let cache = ModuleCache::default();
        let result = cache.get_or_refresh(|| Err(MemoryError::WindowsApi("denied".to_string())));
        assert!(result.is_err());
        assert_eq!(cache.get_or_refresh(|| Ok(sample())).unwrap().len(), 1);
    }
}
