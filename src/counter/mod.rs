//! Per-country visit counter persisted as JSON

pub mod models;
pub mod store;

pub use models::{VisitCounts, VisitOutcome};
pub use store::CounterStore;
