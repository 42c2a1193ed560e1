pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{ReferenceSeed, SeedResult, VerificationResult};
pub use repositories::{
    AnalysisRepository, DeleteOutcome, InMemoryAnalysisRepository, InMemoryReferenceRepository,
    ReferenceRepository, RepositoryError, SqlAnalysisRepository, SqlReferenceRepository,
};
