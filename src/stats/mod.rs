/// Dataset statistics: per-file moments folded into global (mean, std).
///
/// Flow:
/// ```text
///   FieldSource ──► one file at a time
///        │
///        ▼
///   ┌──────────────┐
///   │ MomentRecord │  (count, mean, var) per field and order
///   └──────────────┘
///        │
///        ▼
///   ┌─────────────────┐
///   │ WeightedMixture │  all records of one field
///   └─────────────────┘
///        │  mixture moments
///        ▼
///   ┌──────────────────┐
///   │ GlobalStatistic  │ ──► StatsFile (stats.yaml, create-if-absent)
///   └──────────────────┘
/// ```

pub mod aggregator;
pub mod file;
pub mod moments;

pub use aggregator::{compute_statistics, StatisticsAggregator};
pub use file::StatsFile;
pub use moments::{GlobalStatistic, MomentRecord, WeightedMixture};
