use async_trait::async_trait;
use thiserror::Error;

use zam_core::domain::analysis::{Analysis, AnalysisId, DeviceId};
use zam_core::domain::reference::{ComparableCompany, ConstantList, IndustryBenchmark};
use zam_core::reference::ReferenceSnapshot;

pub mod analysis;
pub mod memory;
pub mod reference;

pub use analysis::SqlAnalysisRepository;
pub use memory::{InMemoryAnalysisRepository, InMemoryReferenceRepository};
pub use reference::SqlReferenceRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Either the id is unknown or it belongs to another device; callers
    /// cannot tell which.
    NotFound,
}

/// Saved analyses, always scoped to the device that created them.
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    /// Newest first.
    async fn list_for_device(&self, device_id: &DeviceId) -> Result<Vec<Analysis>, RepositoryError>;

    async fn insert(&self, analysis: Analysis) -> Result<Analysis, RepositoryError>;

    async fn delete_owned(
        &self,
        id: &AnalysisId,
        device_id: &DeviceId,
    ) -> Result<DeleteOutcome, RepositoryError>;
}

#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn list_industries(&self) -> Result<Vec<IndustryBenchmark>, RepositoryError>;

    async fn list_comparables(
        &self,
        industry: Option<&str>,
    ) -> Result<Vec<ComparableCompany>, RepositoryError>;

    async fn list_constants(&self) -> Result<Vec<ConstantList>, RepositoryError>;

    async fn snapshot(&self) -> Result<ReferenceSnapshot, RepositoryError> {
        let industries = self.list_industries().await?;
        let comparables = self.list_comparables(None).await?;
        let constants = self.list_constants().await?;
        Ok(ReferenceSnapshot::from_store(industries, comparables, constants))
    }
}
