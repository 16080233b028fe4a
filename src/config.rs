use std::path::{Path, PathBuf};

/// Datasets processed by the `well-stats` binary, in processing order.
pub const WELL_DATASETS: &[&str] = &[
    "acoustic_scattering_discontinuous",
    "acoustic_scattering_inclusions",
    "acoustic_scattering_maze",
    "active_matter",
    "convective_envelope_rsg",
    "euler_multi_quadrants_openBC",
    "euler_multi_quadrants_periodicBC",
    "gray_scott_reaction_diffusion",
    "helmholtz_staircase",
    "MHD_256",
    "MHD_64",
    "planetswe",
    "post_neutron_star_merger",
    "rayleigh_benard",
    "rayleigh_benard_uniform",
    "rayleigh_taylor_instability",
    "shear_flow",
    "supernova_explosion_128",
    "supernova_explosion_64",
    "turbulence_gravity_cooling",
    "turbulent_radiative_layer_2D",
    "turbulent_radiative_layer_3D",
    "viscoelastic_instability",
];

/// Standard deviations at or below this are treated as degenerate.
pub const DEFAULT_STD_FLOOR: f64 = 1e-4;

/// Knobs for one statistics run.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsConfig {
    /// Minimum acceptable combined standard deviation.
    pub std_floor: f64,
    /// Location of the training files relative to a dataset directory.
    pub train_subdir: PathBuf,
    /// Name of the statistics file inside a dataset directory.
    pub stats_filename: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            std_floor: DEFAULT_STD_FLOOR,
            train_subdir: PathBuf::from("data").join("train"),
            stats_filename: "stats.yaml".to_string(),
        }
    }
}

impl StatsConfig {
    /// `<dataset_dir>/data/train`
    pub fn train_dir(&self, dataset_dir: &Path) -> PathBuf {
        dataset_dir.join(&self.train_subdir)
    }

    /// `<dataset_dir>/stats.yaml`
    pub fn stats_path(&self, dataset_dir: &Path) -> PathBuf {
        dataset_dir.join(&self.stats_filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_follow_dataset_layout() {
        let config = StatsConfig::default();
        let dir = Path::new("/well/shear_flow");
        assert_eq!(config.train_dir(dir), Path::new("/well/shear_flow/data/train"));
        assert_eq!(config.stats_path(dir), Path::new("/well/shear_flow/stats.yaml"));
        assert_eq!(config.std_floor, 1e-4);
    }

    #[test]
    fn dataset_names_are_unique() {
        let mut names: Vec<&str> = WELL_DATASETS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), WELL_DATASETS.len());
    }
}
