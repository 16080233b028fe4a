use std::f64::consts::PI;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::{arr0, concatenate, Array, Array4, Array5, ArrayD, Axis};
use ndarray_npy::NpzWriter;

use super::loader::{FieldFile, NpzFieldFile};
use super::model::Order;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Sample dataset layout
// ---------------------------------------------------------------------------

/// Shape and contents of a synthetic 2-D dataset.
///
/// Every file holds one trajectory with:
/// * `t0_fields/density`  `[time, x, y]` stored as f32
/// * `t0_fields/pressure` `[time, x, y]`
/// * `t1_fields/velocity` `[time, x, y, 2]`
/// * `t2_fields/stress`   `[time, x, y, 2, 2]`
/// * `t0_fields/mask`     constant, only when `constant_mask` is set
#[derive(Debug, Clone, PartialEq)]
pub struct SampleLayout {
    pub n_files: usize,
    pub n_steps: usize,
    pub resolution: [usize; 2],
    pub seed: u64,
    pub constant_mask: bool,
}

impl Default for SampleLayout {
    fn default() -> Self {
        Self {
            n_files: 4,
            n_steps: 8,
            resolution: [16, 16],
            seed: 42,
            constant_mask: false,
        }
    }
}

/// Write `<dataset_dir>/data/train/traj_NNN.npz` files and return their paths.
pub fn write_sample_dataset(dataset_dir: &Path, layout: &SampleLayout) -> Result<Vec<PathBuf>> {
    let train_dir = dataset_dir.join("data").join("train");
    std::fs::create_dir_all(&train_dir).map_err(|e| Error::io(&train_dir, e))?;

    let mut rng = SimpleRng::new(layout.seed);
    let mut paths = Vec::with_capacity(layout.n_files);
    for i in 0..layout.n_files {
        let path = train_dir.join(format!("traj_{i:03}.npz"));
        write_trajectory(&path, layout, &mut rng)?;
        debug!("Wrote {}", path.display());
        paths.push(path);
    }
    Ok(paths)
}

fn write_trajectory(path: &Path, layout: &SampleLayout, rng: &mut SimpleRng) -> Result<()> {
    let [nx, ny] = layout.resolution;
    let nt = layout.n_steps;

    // Each trajectory gets its own amplitude so files differ in scale.
    let amplitude = 0.5 + rng.next_f64() * 2.0;
    let phase = rng.next_f64() * 2.0 * PI;
    let wave = |t: usize, x: usize, y: usize| {
        let (t, x, y) = (t as f64 / nt as f64, x as f64 / nx as f64, y as f64 / ny as f64);
        (2.0 * PI * (x + t) + phase).sin() * (2.0 * PI * y).cos()
    };

    let density = Array::from_shape_fn((nt, nx, ny), |(t, x, y)| {
        (1.0 + 0.2 * amplitude * wave(t, x, y) + rng.gauss(0.0, 0.01)) as f32
    });
    let pressure = Array::from_shape_fn((nt, nx, ny), |(t, x, y)| {
        amplitude * wave(t, x, y) + rng.gauss(0.0, 0.05)
    });
    let velocity: Array4<f64> = Array::from_shape_fn((nt, nx, ny, 2), |(t, x, y, c)| {
        let base = if c == 0 { wave(t, x, y) } else { -wave(t, y, x) };
        amplitude * base + rng.gauss(0.0, 0.1)
    });
    let stress: Array5<f64> = Array::from_shape_fn((nt, nx, ny, 2, 2), |(t, x, y, i, j)| {
        let diagonal = if i == j { 1.0 } else { 0.25 };
        diagonal * velocity[(t, x, y, i)] * velocity[(t, x, y, j)] + rng.gauss(0.0, 0.02)
    });

    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut npz = NpzWriter::new(file);
    let write_err = |source| Error::NpzWrite {
        path: path.to_path_buf(),
        source,
    };

    let t0 = Order::Value.group_key();
    let t1 = Order::FirstDerivative.group_key();
    let t2 = Order::SecondDerivative.group_key();
    npz.add_array(format!("{t0}/density"), &density).map_err(write_err)?;
    npz.add_array(format!("{t0}/pressure"), &pressure).map_err(write_err)?;
    npz.add_array(format!("{t1}/velocity"), &velocity).map_err(write_err)?;
    npz.add_array(format!("{t2}/stress"), &stress).map_err(write_err)?;
    if layout.constant_mask {
        let mask: ArrayD<f64> = Array::ones((nt, nx, ny)).into_dyn();
        npz.add_array(format!("{t0}/mask"), &mask).map_err(write_err)?;
    }
    npz.add_array("n_spatial_dims", &arr0(2i64)).map_err(write_err)?;
    npz.finish().map_err(write_err)?;
    Ok(())
}

/// Concatenation of one field across every file along the leading axis,
/// used to check statistics against the pooled data.
pub fn pooled_field(paths: &[PathBuf], order: Order, name: &str) -> Result<ArrayD<f64>> {
    let mut parts = Vec::with_capacity(paths.len());
    for path in paths {
        parts.push(NpzFieldFile::open(path)?.read_field(order, name)?);
    }
    let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| Error::Shape(e.to_string()))
}

// ---------------------------------------------------------------------------
// SimpleRng – seeded Gaussian noise
// ---------------------------------------------------------------------------

/// xoshiro256** seeded through a linear congruential expansion.
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut state = [0u64; 4];
        let mut x = seed;
        for slot in &mut state {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            *slot = x;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let s = &mut self.state;
        let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = s[1] << 17;
        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(45);
        result
    }

    /// Uniform in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(f64::MIN_POSITIVE);
        let u2 = self.next_f64();
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}
