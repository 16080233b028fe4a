use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use well_stats::{compute_statistics, StatsConfig, WELL_DATASETS};

#[derive(Parser)]
#[command(name = "well-stats")]
#[command(about = "Compute per-field normalization statistics for every dataset under a root directory", long_about = None)]
struct Cli {
    /// Directory holding one subdirectory per dataset.
    the_well_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = StatsConfig::default();

    for dataset in WELL_DATASETS {
        let dataset_dir = cli.the_well_dir.join(dataset);
        let train_dir = config.train_dir(&dataset_dir);
        let stats_path = config.stats_path(&dataset_dir);

        info!("Computing statistics of {dataset}");
        let stats = compute_statistics(&train_dir, &stats_path, &config)
            .with_context(|| format!("computing statistics of {dataset}"))?;
        info!("{dataset}: {} fields", stats.len());
    }
    Ok(())
}
