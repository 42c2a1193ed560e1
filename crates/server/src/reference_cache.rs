use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use zam_core::reference::ReferenceSnapshot;
use zam_db::ReferenceRepository;

/// Reference data for the lifetime of the process.
///
/// The first successful, non-empty read from the store is frozen. Until then
/// every caller gets the built-in seed and the next request tries the store
/// again.
pub struct ReferenceCache {
    repository: Arc<dyn ReferenceRepository>,
    frozen: OnceCell<Arc<ReferenceSnapshot>>,
    builtin: Arc<ReferenceSnapshot>,
}

impl ReferenceCache {
    pub fn new(repository: Arc<dyn ReferenceRepository>) -> Self {
        Self {
            repository,
            frozen: OnceCell::new(),
            builtin: Arc::new(ReferenceSnapshot::builtin()),
        }
    }

    pub async fn snapshot(&self) -> Arc<ReferenceSnapshot> {
        if let Some(snapshot) = self.frozen.get() {
            return Arc::clone(snapshot);
        }

        match self.repository.snapshot().await {
            Ok(snapshot) if !snapshot.is_empty() => {
                let snapshot = Arc::new(snapshot);
                if self.frozen.set(Arc::clone(&snapshot)).is_ok() {
                    info!(
                        event_name = "reference.cache.frozen",
                        industries = snapshot.industries.len(),
                        comparables = snapshot.comparables.len(),
                        "reference data loaded from store"
                    );
                }
                self.frozen.get().cloned().unwrap_or(snapshot)
            }
            Ok(_) => {
                warn!(
                    event_name = "reference.cache.store_empty",
                    "reference store is empty, serving built-in seed"
                );
                Arc::clone(&self.builtin)
            }
            Err(error) => {
                warn!(
                    event_name = "reference.cache.store_unavailable",
                    error = %error,
                    "reference store unavailable, serving built-in seed"
                );
                Arc::clone(&self.builtin)
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.initialized()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use zam_core::reference::{ReferenceSnapshot, ReferenceSource};
    use zam_db::{
        connect_with_settings, migrations, InMemoryReferenceRepository, ReferenceSeed,
        SqlReferenceRepository,
    };

    use super::ReferenceCache;

    #[tokio::test]
    async fn seeded_store_is_frozen_after_first_read() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        ReferenceSeed::load(&pool).await.expect("seed");
        let cache = ReferenceCache::new(Arc::new(SqlReferenceRepository::new(pool.clone())));

        let first = cache.snapshot().await;
        assert_eq!(first.source, ReferenceSource::Store);
        assert!(cache.is_frozen());

        sqlx::query("DELETE FROM comparable_company").execute(&pool).await.expect("delete");
        let second = cache.snapshot().await;
        assert_eq!(second.comparables.len(), 5);
        pool.close().await;
    }

    #[tokio::test]
    async fn empty_store_serves_builtin_without_freezing() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let cache = ReferenceCache::new(Arc::new(SqlReferenceRepository::new(pool.clone())));

        let fallback = cache.snapshot().await;
        assert_eq!(fallback.source, ReferenceSource::BuiltinSeed);
        assert!(!cache.is_frozen());

        ReferenceSeed::load(&pool).await.expect("seed");
        let loaded = cache.snapshot().await;
        assert_eq!(loaded.source, ReferenceSource::Store);
        assert!(cache.is_frozen());
        pool.close().await;
    }

    #[tokio::test]
    async fn unreachable_store_falls_back_to_builtin() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        pool.close().await;
        let cache = ReferenceCache::new(Arc::new(SqlReferenceRepository::new(pool)));

        let snapshot = cache.snapshot().await;

        assert_eq!(snapshot.source, ReferenceSource::BuiltinSeed);
        assert!(snapshot.industry_benchmark("saas_vertical").is_some());
    }

    #[tokio::test]
    async fn in_memory_repository_snapshot_is_served_as_is() {
        let custom = ReferenceSnapshot { industries: Vec::new(), ..ReferenceSnapshot::builtin() };
        let cache = ReferenceCache::new(Arc::new(InMemoryReferenceRepository::new(custom)));

        let snapshot = cache.snapshot().await;

        assert!(snapshot.industries.is_empty());
        assert!(!snapshot.constants.is_empty());
    }
}
