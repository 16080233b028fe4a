//! Normalization statistics and spatial error metrics for multi-file
//! physics simulation datasets.
//!
//! * [`stats`] streams a dataset's files once and combines per-file moments
//!   into one (mean, std) pair per field, written to `stats.yaml`.
//! * [`metrics`] reduces prediction/target errors over the trailing spatial
//!   axes of a field.

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod stats;

pub use config::{StatsConfig, WELL_DATASETS};
pub use data::loader::{FieldFile, FieldSource, WellDataset};
pub use data::model::{Order, WellMetadata};
pub use error::{Error, Result};
pub use metrics::{Metric, MetricOptions, NormMode};
pub use stats::{compute_statistics, GlobalStatistic, StatisticsAggregator, StatsFile};
