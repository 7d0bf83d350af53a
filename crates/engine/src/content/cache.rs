//! Per-builder-key source cache with single-flight loading

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tracing::warn;

use chargen_domain::{BuilderKey, SourceData};

use crate::ports::{SourceLoadError, SourceLoaderPort};

type SourceFuture = Shared<BoxFuture<'static, Result<Arc<SourceData>, SourceLoadError>>>;

/// Caches rules content per builder key.
///
/// Concurrent fetches of a not-yet-loaded key all await the same in-flight
/// future instead of issuing duplicate loads. A failed load propagates to
/// every waiter and is evicted, so the next fetch retries.
pub struct SourceCache {
    loader: Arc<dyn SourceLoaderPort>,
    entries: DashMap<BuilderKey, SourceFuture>,
}

impl SourceCache {
    pub fn new(loader: Arc<dyn SourceLoaderPort>) -> Self {
        Self {
            loader,
            entries: DashMap::new(),
        }
    }

    pub async fn fetch(&self, builder_key: &BuilderKey) -> Result<Arc<SourceData>, SourceLoadError> {
        let fut = match self.entries.entry(builder_key.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let loader = Arc::clone(&self.loader);
                let key = builder_key.clone();
                let fut = async move { loader.fetch(&key).await.map(Arc::new) }
                    .boxed()
                    .shared();
                entry.insert(fut.clone());
                fut
            }
        };

        let result = fut.clone().await;
        if let Err(e) = &result {
            warn!(builder = %builder_key, error = %e, "source load failed; not cached");
            // Evict only our own failed future, in case a retry already
            // replaced it.
            self.entries
                .remove_if(builder_key, |_, cached| fut.ptr_eq(cached));
        }
        result
    }

    /// Whether content for this key is loaded or in flight.
    pub fn contains(&self, builder_key: &BuilderKey) -> bool {
        self.entries.contains_key(builder_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts fetches and optionally fails the first one.
    struct ScriptedLoader {
        calls: AtomicUsize,
        fail_first: bool,
    }

    impl ScriptedLoader {
        fn new(fail_first: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_first,
            })
        }
    }

    #[async_trait]
    impl SourceLoaderPort for ScriptedLoader {
        async fn fetch(&self, builder_key: &BuilderKey) -> Result<SourceData, SourceLoadError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            // Stay in flight long enough for a second fetch to join.
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && call == 0 {
                return Err(SourceLoadError::Io("disk on fire".to_string()));
            }
            Ok(SourceData::new(json!({"builder": builder_key.as_str()})))
        }
    }

    #[tokio::test]
    async fn concurrent_fetches_share_one_load() {
        let loader = ScriptedLoader::new(false);
        let cache = SourceCache::new(loader.clone());
        let key = BuilderKey::new("swordsman");

        let (a, b) = tokio::join!(cache.fetch(&key), cache.fetch(&key));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_load_is_cached() {
        let loader = ScriptedLoader::new(false);
        let cache = SourceCache::new(loader.clone());
        let key = BuilderKey::new("swordsman");

        let first = cache.fetch(&key).await.unwrap();
        let second = cache.fetch(&key).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let loader = ScriptedLoader::new(true);
        let cache = SourceCache::new(loader.clone());
        let key = BuilderKey::new("swordsman");

        assert!(cache.fetch(&key).await.is_err());
        assert!(!cache.contains(&key));

        assert!(cache.fetch(&key).await.is_ok());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_propagates_to_every_waiter() {
        let loader = ScriptedLoader::new(true);
        let cache = SourceCache::new(loader.clone());
        let key = BuilderKey::new("swordsman");

        let (a, b) = tokio::join!(cache.fetch(&key), cache.fetch(&key));
        assert!(a.is_err() && b.is_err());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }
}
