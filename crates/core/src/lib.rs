pub mod config;
pub mod domain;
pub mod errors;
pub mod reference;
pub mod sizing;

pub use domain::analysis::{Analysis, AnalysisId, DeviceId, NewAnalysis};
pub use domain::estimation::{Assumptions, EstimationResult, MarketMetrics, ReconciledEstimate};
pub use domain::narrative::{NarrativeResult, SanityCheck, SuggestedAssumptions};
pub use domain::reference::{
    BenchmarkMetrics, CompanyMetrics, ComparableCompany, ConstantList, EnumOption,
    IndustryBenchmark,
};
pub use domain::wizard::{CustomerType, Geography, MarketContext, PricingModel, WizardInput};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use reference::{ReferenceSnapshot, ReferenceSource};
pub use sizing::{estimate, reconcile, SizingConstants, TopDownEstimator};
