//! Operational-efficiency analytics for a delivery fleet.
//!
//! Deliveries are joined with the vehicle registry, enriched with per-row
//! metrics, and reduced to headline KPIs, a monthly trend, and per-city and
//! per-vehicle breakdowns for whatever city/month selection is active.
pub mod breakdown;
pub mod config;
pub mod derive;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod loader;
pub mod output;
pub mod session;
pub mod trend;
pub mod types;
pub mod util;

#[cfg(test)]
mod testutil;

pub use error::PipelineError;
pub use filter::Selection;
pub use session::{build_dashboard, Session};
pub use types::{Dashboard, EnrichedRecord, KpiName, KpiSet, MonthlyBucket};
