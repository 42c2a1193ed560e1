pub mod analysis;
pub mod estimation;
pub mod narrative;
pub mod reference;
pub mod wizard;
