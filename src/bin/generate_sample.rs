use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use well_stats::data::synthetic::{write_sample_dataset, SampleLayout};

/// Write a small synthetic dataset in the `<dataset>/data/train/*.npz` layout.
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Dataset directory to create.
    #[arg(long, default_value = "sample_dataset")]
    out: PathBuf,
    #[arg(long, default_value_t = 4)]
    files: usize,
    #[arg(long, default_value_t = 8)]
    steps: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Also write a constant `mask` field (statistics will reject it).
    #[arg(long, default_value_t = false)]
    constant_mask: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let layout = SampleLayout {
        n_files: args.files,
        n_steps: args.steps,
        seed: args.seed,
        constant_mask: args.constant_mask,
        ..SampleLayout::default()
    };
    let paths = write_sample_dataset(&args.out, &layout)
        .with_context(|| format!("writing sample dataset to {}", args.out.display()))?;

    println!(
        "Wrote {} trajectories ({} steps, {}x{}) to {}",
        paths.len(),
        layout.n_steps,
        layout.resolution[0],
        layout.resolution[1],
        args.out.display()
    );
    Ok(())
}
