use std::collections::HashMap;

use tokio::sync::RwLock;

use zam_core::domain::analysis::{Analysis, AnalysisId, DeviceId};
use zam_core::domain::reference::{ComparableCompany, ConstantList, IndustryBenchmark};
use zam_core::reference::ReferenceSnapshot;

use super::{AnalysisRepository, DeleteOutcome, ReferenceRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryAnalysisRepository {
    analyses: RwLock<HashMap<String, Analysis>>,
}

#[async_trait::async_trait]
impl AnalysisRepository for InMemoryAnalysisRepository {
    async fn list_for_device(&self, device_id: &DeviceId) -> Result<Vec<Analysis>, RepositoryError> {
        let analyses = self.analyses.read().await;
        let mut owned: Vec<Analysis> =
            analyses.values().filter(|analysis| &analysis.device_id == device_id).cloned().collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.0.cmp(&a.id.0)));
        Ok(owned)
    }

    async fn insert(&self, analysis: Analysis) -> Result<Analysis, RepositoryError> {
        let mut analyses = self.analyses.write().await;
        analyses.insert(analysis.id.0.clone(), analysis.clone());
        Ok(analysis)
    }

    async fn delete_owned(
        &self,
        id: &AnalysisId,
        device_id: &DeviceId,
    ) -> Result<DeleteOutcome, RepositoryError> {
        let mut analyses = self.analyses.write().await;
        let owned = analyses.get(&id.0).is_some_and(|analysis| &analysis.device_id == device_id);
        if !owned {
            return Ok(DeleteOutcome::NotFound);
        }
        analyses.remove(&id.0);
        Ok(DeleteOutcome::Deleted)
    }
}

/// Serves a fixed snapshot; the built-in seed by default.
pub struct InMemoryReferenceRepository {
    snapshot: ReferenceSnapshot,
}

impl InMemoryReferenceRepository {
    pub fn new(snapshot: ReferenceSnapshot) -> Self {
        Self { snapshot }
    }
}

impl Default for InMemoryReferenceRepository {
    fn default() -> Self {
        Self::new(ReferenceSnapshot::builtin())
    }
}

#[async_trait::async_trait]
impl ReferenceRepository for InMemoryReferenceRepository {
    async fn list_industries(&self) -> Result<Vec<IndustryBenchmark>, RepositoryError> {
        Ok(self.snapshot.industries.clone())
    }

    async fn list_comparables(
        &self,
        industry: Option<&str>,
    ) -> Result<Vec<ComparableCompany>, RepositoryError> {
        Ok(self.snapshot.comparables_for(industry))
    }

    async fn list_constants(&self) -> Result<Vec<ConstantList>, RepositoryError> {
        Ok(self.snapshot.constants.clone())
    }

    async fn snapshot(&self) -> Result<ReferenceSnapshot, RepositoryError> {
        Ok(self.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use zam_core::domain::analysis::{DeviceId, NewAnalysis};
    use zam_core::reference::ReferenceSource;

    use crate::repositories::{
        AnalysisRepository, DeleteOutcome, InMemoryAnalysisRepository,
        InMemoryReferenceRepository, ReferenceRepository,
    };

    fn draft(name: &str) -> NewAnalysis {
        NewAnalysis {
            product_name: name.to_string(),
            inputs: Default::default(),
            metrics: Default::default(),
            assumptions: None,
            ai_analysis: None,
            logic_steps: Vec::new(),
        }
    }

    #[tokio::test]
    async fn in_memory_analyses_follow_device_scoping() {
        let repo = InMemoryAnalysisRepository::default();
        let alice = DeviceId::parse("alice-device").expect("device");
        let bob = DeviceId::parse("bob-device").expect("device");
        let now = Utc::now();

        let first = repo.insert(draft("First").into_analysis(alice.clone(), now)).await.expect("insert");
        let second = repo
            .insert(draft("Second").into_analysis(alice.clone(), now + Duration::seconds(1)))
            .await
            .expect("insert");

        let listed = repo.list_for_device(&alice).await.expect("list");
        assert_eq!(listed, vec![second.clone(), first.clone()]);
        assert!(repo.list_for_device(&bob).await.expect("list").is_empty());

        assert_eq!(repo.delete_owned(&first.id, &bob).await.expect("delete"), DeleteOutcome::NotFound);
        assert_eq!(repo.delete_owned(&first.id, &alice).await.expect("delete"), DeleteOutcome::Deleted);
        assert_eq!(repo.list_for_device(&alice).await.expect("list"), vec![second]);
    }

    #[tokio::test]
    async fn in_memory_reference_defaults_to_builtin_seed() {
        let repo = InMemoryReferenceRepository::default();

        let snapshot = repo.snapshot().await.expect("snapshot");

        assert_eq!(snapshot.source, ReferenceSource::BuiltinSeed);
        assert_eq!(repo.list_industries().await.expect("industries").len(), 5);
        assert_eq!(repo.list_comparables(Some("ecommerce")).await.expect("comparables").len(), 1);
    }
}
