use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::{debug, info};

use super::file::StatsFile;
use super::moments::{MomentRecord, WeightedMixture};
use crate::config::StatsConfig;
use crate::data::loader::{FieldFile, FieldSource, WellDataset};
use crate::data::model::Order;
use crate::error::{Error, Result};

/// Field names present at each order of one file.
type FileSchema = BTreeMap<Order, BTreeSet<String>>;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Compute the statistics of the dataset in `train_dir` and write them to
/// `stats_path`.
///
/// Nothing is written unless every file was read and every field passed the
/// standard-deviation floor. An existing `stats_path` is never overwritten.
pub fn compute_statistics(
    train_dir: &Path,
    stats_path: &Path,
    config: &StatsConfig,
) -> Result<StatsFile> {
    ensure_absent(stats_path)?;

    let dataset = WellDataset::open(train_dir)?;
    let aggregator = StatisticsAggregator::new(config.clone());
    let stats = aggregator.aggregate(&dataset)?;

    for (field, stat) in stats.fields() {
        debug!("{field}: statistics shape {:?}", stat.mean.shape());
    }
    stats.write_new(stats_path)?;
    info!(
        "Wrote statistics of {} fields to {}",
        stats.len(),
        stats_path.display()
    );
    Ok(stats)
}

fn ensure_absent(path: &Path) -> Result<()> {
    // Fast-fail only: the final write is create-if-absent on its own.
    match path.try_exists() {
        Ok(true) => Err(Error::AlreadyExists(path.to_path_buf())),
        Ok(false) => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

// ---------------------------------------------------------------------------
// StatisticsAggregator
// ---------------------------------------------------------------------------

/// Streams a dataset's files once and folds every field into global statistics.
#[derive(Debug, Clone, Default)]
pub struct StatisticsAggregator {
    config: StatsConfig,
}

impl StatisticsAggregator {
    pub fn new(config: StatsConfig) -> Self {
        Self { config }
    }

    /// Accumulate and combine, without touching the filesystem for output.
    pub fn aggregate<S: FieldSource>(&self, source: &S) -> Result<StatsFile> {
        let mixtures = self.accumulate(source)?;
        self.combine(&mixtures)
    }

    /// Per-field moment records across every file and order.
    pub fn accumulate<S: FieldSource>(&self, source: &S) -> Result<BTreeMap<String, WeightedMixture>> {
        let paths = source.file_paths();
        if paths.is_empty() {
            return Err(Error::Schema("dataset has no files".into()));
        }

        let mut expected: Option<FileSchema> = None;
        let mut mixtures: BTreeMap<String, WeightedMixture> = BTreeMap::new();

        for path in paths {
            debug!("Reading {}", path.display());
            let mut file = source.open(path)?;

            let schema = read_schema(&mut file)?;
            match &expected {
                None => expected = Some(schema.clone()),
                Some(first) if *first != schema => {
                    return Err(schema_mismatch(path, first, &schema));
                }
                Some(_) => {}
            }

            for (order, names) in &schema {
                for name in names {
                    let data = file.read_field(*order, name)?;
                    let record = MomentRecord::of_field(data.view(), *order).map_err(|e| {
                        Error::Schema(format!("{}: field '{name}' at {order}: {e}", path.display()))
                    })?;
                    debug!(
                        "{name} ({order}): shape {:?}, count {}",
                        data.shape(),
                        record.count
                    );

                    mixtures
                        .entry(name.clone())
                        .or_default()
                        .push(record)
                        .map_err(|e| Error::Schema(format!("field '{name}': {e}")))?;
                }
            }
        }

        Ok(mixtures)
    }

    /// Fold each field's records into one (mean, std) pair.
    pub fn combine(&self, mixtures: &BTreeMap<String, WeightedMixture>) -> Result<StatsFile> {
        let mut stats = StatsFile::default();
        for (field, mixture) in mixtures {
            let stat = mixture.combine()?;
            stat.ensure_above(field, self.config.std_floor)?;
            debug!(
                "{field}: {} observations, {} samples",
                mixture.len(),
                mixture.total_count()
            );
            stats.insert(field.clone(), stat);
        }
        Ok(stats)
    }
}

fn read_schema<F: FieldFile>(file: &mut F) -> Result<FileSchema> {
    let mut schema = FileSchema::new();
    for order in Order::ALL {
        let names: BTreeSet<String> = file.field_names(order)?.into_iter().collect();
        if !names.is_empty() {
            schema.insert(order, names);
        }
    }
    Ok(schema)
}

fn schema_mismatch(path: &Path, expected: &FileSchema, found: &FileSchema) -> Error {
    let empty = BTreeSet::new();
    let mut problems = Vec::new();
    for order in Order::ALL {
        let want = expected.get(&order).unwrap_or(&empty);
        let got = found.get(&order).unwrap_or(&empty);
        for missing in want.difference(got) {
            problems.push(format!("missing '{missing}' at {order}"));
        }
        for extra in got.difference(want) {
            problems.push(format!("unexpected '{extra}' at {order}"));
        }
    }
    Error::Schema(format!(
        "{} does not match the first file: {}",
        path.display(),
        problems.join(", ")
    ))
}
