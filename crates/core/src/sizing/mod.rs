//! Top-down market sizing.
//!
//! `estimator` turns wizard answers into a baseline TAM/SAM/SOM with a
//! human-readable derivation trail; `reconcile` folds model-suggested
//! assumptions back in and recomputes the figures. Both are pure.

pub mod estimator;
pub mod format;
pub mod reconcile;

pub use estimator::{estimate, SizingConstants, TopDownEstimator, GEO_FACTORS};
pub use format::{format_currency, group_thousands};
pub use reconcile::{reconcile, AI_REFINED_STEP};
