use ndarray::{ArrayBase, ArrayD, ArrayViewD, Axis, CowArray, Data, IxDyn};

use super::NormMode;
use crate::data::model::WellMetadata;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Metrics
//
// Inputs are `[..., channel, *spatial]` with `meta.n_spatial_dims` trailing
// spatial axes. Only those axes are reduced.
// ---------------------------------------------------------------------------

/// Mean squared error.
pub fn mse(x: ArrayViewD<'_, f64>, y: ArrayViewD<'_, f64>, meta: &WellMetadata) -> Result<ArrayD<f64>> {
    check_shapes(&x, &y, meta)?;
    let squared = (&x - &y).mapv(|d| d * d);
    spatial_mean(&squared, meta.n_spatial_dims)
}

/// Mean squared error normalized by the target's spatial second moment
/// (`NormMode::Norm`) or spatial variance (`NormMode::Std`).
pub fn nmse(
    x: ArrayViewD<'_, f64>,
    y: ArrayViewD<'_, f64>,
    meta: &WellMetadata,
    eps: f64,
    norm_mode: NormMode,
) -> Result<ArrayD<f64>> {
    check_shapes(&x, &y, meta)?;
    let n = meta.n_spatial_dims;
    let norm = match norm_mode {
        NormMode::Norm => spatial_mean(&y.mapv(|v| v * v), n)?,
        NormMode::Std => spatial_sample_var(&y, n)?,
    };
    Ok(mse(x, y, meta)? / (norm + eps))
}

/// Root mean squared error.
pub fn rmse(x: ArrayViewD<'_, f64>, y: ArrayViewD<'_, f64>, meta: &WellMetadata) -> Result<ArrayD<f64>> {
    Ok(mse(x, y, meta)?.mapv(f64::sqrt))
}

pub fn nrmse(
    x: ArrayViewD<'_, f64>,
    y: ArrayViewD<'_, f64>,
    meta: &WellMetadata,
    eps: f64,
    norm_mode: NormMode,
) -> Result<ArrayD<f64>> {
    Ok(nmse(x, y, meta, eps, norm_mode)?.mapv(f64::sqrt))
}

/// Variance-scaled mean squared error.
pub fn vmse(x: ArrayViewD<'_, f64>, y: ArrayViewD<'_, f64>, meta: &WellMetadata, eps: f64) -> Result<ArrayD<f64>> {
    nmse(x, y, meta, eps, NormMode::Std)
}

pub fn vrmse(x: ArrayViewD<'_, f64>, y: ArrayViewD<'_, f64>, meta: &WellMetadata, eps: f64) -> Result<ArrayD<f64>> {
    nrmse(x, y, meta, eps, NormMode::Std)
}

/// Largest absolute error over all spatial points.
pub fn linf(x: ArrayViewD<'_, f64>, y: ArrayViewD<'_, f64>, meta: &WellMetadata) -> Result<ArrayD<f64>> {
    check_shapes(&x, &y, meta)?;
    let abs = (&x - &y).mapv(f64::abs);
    let flat = flatten_spatial(&abs, meta.n_spatial_dims)?;
    let last = Axis(flat.ndim() - 1);
    // NaN wins, like a NaN-propagating max.
    Ok(flat.fold_axis(last, 0.0, |max, &v| if v > *max || v.is_nan() { v } else { *max }))
}

// ---------------------------------------------------------------------------
// Reduction helpers
// ---------------------------------------------------------------------------

fn check_shapes(x: &ArrayViewD<'_, f64>, y: &ArrayViewD<'_, f64>, meta: &WellMetadata) -> Result<()> {
    if x.shape() != y.shape() {
        return Err(Error::Shape(format!(
            "prediction {:?} and target {:?} differ",
            x.shape(),
            y.shape()
        )));
    }
    if meta.n_spatial_dims > x.ndim() {
        return Err(Error::Shape(format!(
            "{} spatial dims requested for a {}-d array",
            meta.n_spatial_dims,
            x.ndim()
        )));
    }
    Ok(())
}

/// Merge the trailing `n_spatial_dims` axes into one last axis.
fn flatten_spatial<S>(a: &ArrayBase<S, IxDyn>, n_spatial_dims: usize) -> Result<CowArray<'_, f64, IxDyn>>
where
    S: Data<Elem = f64>,
{
    let (lead, spatial) = a.shape().split_at(a.ndim() - n_spatial_dims);
    let points: usize = spatial.iter().product();
    if points == 0 {
        return Err(Error::Shape(format!("empty spatial extent {spatial:?}")));
    }

    let mut shape = lead.to_vec();
    shape.push(points);
    a.to_shape(shape).map_err(|e| Error::Shape(e.to_string()))
}

fn spatial_mean<S>(a: &ArrayBase<S, IxDyn>, n_spatial_dims: usize) -> Result<ArrayD<f64>>
where
    S: Data<Elem = f64>,
{
    let flat = flatten_spatial(a, n_spatial_dims)?;
    flat.mean_axis(Axis(flat.ndim() - 1))
        .ok_or_else(|| Error::Shape("empty spatial extent".into()))
}

/// Bessel-corrected variance; a single spatial point has zero variance.
fn spatial_sample_var<S>(a: &ArrayBase<S, IxDyn>, n_spatial_dims: usize) -> Result<ArrayD<f64>>
where
    S: Data<Elem = f64>,
{
    let flat = flatten_spatial(a, n_spatial_dims)?;
    let last = Axis(flat.ndim() - 1);
    let ddof = if flat.len_of(last) > 1 { 1.0 } else { 0.0 };
    Ok(flat.var_axis(last, ddof))
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array, IxDyn};

    fn meta(n: usize) -> WellMetadata {
        WellMetadata::new("test", n)
    }

    fn field(shape: &[usize], phase: f64) -> ArrayD<f64> {
        let mut i = 0.0_f64;
        Array::from_shape_simple_fn(IxDyn(shape), || {
            i += 1.0;
            (i * 0.7 + phase).sin() * 3.0 + 0.5
        })
    }

    #[test]
    fn time_and_channel_axes_are_kept() {
        // [batch, time, channel, x, y, z]
        let x = field(&[2, 3, 4, 5, 6, 2], 0.0);
        let y = field(&[2, 3, 4, 5, 6, 2], 1.0);
        let m = meta(3);

        assert_eq!(mse(x.view(), y.view(), &m).unwrap().shape(), &[2, 3, 4]);
        assert_eq!(linf(x.view(), y.view(), &m).unwrap().shape(), &[2, 3, 4]);
        assert_eq!(
            nmse(x.view(), y.view(), &m, 1e-7, NormMode::Std).unwrap().shape(),
            &[2, 3, 4]
        );
    }

    #[test]
    fn mse_averages_each_channel_separately() {
        // [batch=1, channel=2, x=2]
        let x = array![[[1.0, 3.0], [0.0, 0.0]]].into_dyn();
        let y = array![[[0.0, 0.0], [2.0, 2.0]]].into_dyn();
        let out = mse(x.view(), y.view(), &meta(1)).unwrap();
        assert_eq!(out, array![[5.0, 4.0]].into_dyn());
    }

    #[test]
    fn std_mode_uses_sample_variance() {
        let y = array![[1.0, 2.0, 3.0, 4.0]].into_dyn();
        let x = y.mapv(|v| v + 1.0);
        let out = nmse(x.view(), y.view(), &meta(1), 0.0, NormMode::Std).unwrap();
        // MSE = 1, sample variance of 1..4 = 5/3.
        assert_abs_diff_eq!(out[[0]], 3.0 / 5.0, epsilon = 1e-12);

        let norm = nmse(x.view(), y.view(), &meta(1), 0.0, NormMode::Norm).unwrap();
        assert_abs_diff_eq!(norm[[0]], 1.0 / 7.5, epsilon = 1e-12);
    }

    #[test]
    fn single_point_variance_is_zero() {
        let y = array![[2.0]].into_dyn();
        let x = array![[3.0]].into_dyn();
        let out = vmse(x.view(), y.view(), &meta(1), 1e-7).unwrap();
        assert_abs_diff_eq!(out[[0]], 1e7, epsilon = 1e-3);
    }

    #[test]
    fn zero_spatial_dims_is_pointwise() {
        let x = array![[1.0, -2.0]].into_dyn();
        let y = array![[0.0, 1.0]].into_dyn();
        assert_eq!(mse(x.view(), y.view(), &meta(0)).unwrap(), array![[1.0, 9.0]].into_dyn());
        assert_eq!(linf(x.view(), y.view(), &meta(0)).unwrap(), array![[1.0, 3.0]].into_dyn());
    }

    #[test]
    fn linf_takes_the_largest_error() {
        let x = array![[[[0.0, 5.0], [1.0, -7.0]]]].into_dyn();
        let y = Array::zeros(IxDyn(&[1, 1, 2, 2]));
        assert_eq!(linf(x.view(), y.view(), &meta(2)).unwrap(), array![[7.0]].into_dyn());
    }

    #[test]
    fn shape_errors() {
        let x = field(&[1, 2, 3], 0.0);
        let y = field(&[1, 3, 2], 0.0);
        assert!(matches!(mse(x.view(), y.view(), &meta(1)), Err(Error::Shape(_))));
        assert!(matches!(mse(x.view(), x.view(), &meta(4)), Err(Error::Shape(_))));

        let empty = Array::zeros(IxDyn(&[1, 2, 0]));
        assert!(matches!(linf(empty.view(), empty.view(), &meta(1)), Err(Error::Shape(_))));
    }
}
