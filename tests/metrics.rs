use approx::assert_abs_diff_eq;
use ndarray::{Array, ArrayD, IxDyn};

use well_stats::{Error, Metric, MetricOptions, NormMode, WellMetadata};

fn field(shape: &[usize], seed: f64) -> ArrayD<f64> {
    let mut i = 0.0_f64;
    Array::from_shape_simple_fn(IxDyn(shape), || {
        i += 1.0;
        (i * 1.3 + seed).sin() * 2.0 + (i * 0.11).cos()
    })
}

fn meta_2d() -> WellMetadata {
    WellMetadata::new("turbulent_radiative_layer_2D", 2)
}

#[test]
fn identical_fields_have_zero_error() {
    let x = field(&[2, 3, 8, 8], 0.0);
    let options = MetricOptions::default();
    for metric in Metric::ALL {
        let out = metric.eval(x.view(), x.view(), &meta_2d(), &options).unwrap();
        assert!(out.iter().all(|v| *v == 0.0), "{metric}: {out}");
    }
}

#[test]
fn every_metric_keeps_batch_and_channel() {
    let x = field(&[4, 3, 8, 6], 0.0);
    let y = field(&[4, 3, 8, 6], 2.0);
    let options = MetricOptions::default();
    for metric in Metric::ALL {
        let out = metric.eval(x.view(), y.view(), &meta_2d(), &options).unwrap();
        assert_eq!(out.shape(), &[4, 3], "{metric}");
        assert!(out.iter().all(|v| *v >= 0.0), "{metric}");
    }
}

#[test]
fn root_metrics_are_exact_square_roots() {
    let x = field(&[2, 2, 5, 5], 0.3);
    let y = field(&[2, 2, 5, 5], 1.7);
    let meta = meta_2d();

    for mode in [NormMode::Norm, NormMode::Std] {
        let options = MetricOptions {
            norm_mode: mode,
            ..MetricOptions::default()
        };
        let nmse = Metric::Nmse.eval(x.view(), y.view(), &meta, &options).unwrap();
        let nrmse = Metric::Nrmse.eval(x.view(), y.view(), &meta, &options).unwrap();
        assert_eq!(nrmse, nmse.mapv(f64::sqrt));
    }

    let options = MetricOptions::default();
    let vmse = Metric::Vmse.eval(x.view(), y.view(), &meta, &options).unwrap();
    let vrmse = Metric::Vrmse.eval(x.view(), y.view(), &meta, &options).unwrap();
    assert_eq!(vrmse, vmse.mapv(f64::sqrt));

    let mse = Metric::Mse.eval(x.view(), y.view(), &meta, &options).unwrap();
    let rmse = Metric::Rmse.eval(x.view(), y.view(), &meta, &options).unwrap();
    assert_eq!(rmse, mse.mapv(f64::sqrt));

    let std_options = MetricOptions::default().with_norm_mode("std").unwrap();
    let nmse_std = Metric::Nmse.eval(x.view(), y.view(), &meta, &std_options).unwrap();
    assert_eq!(vmse, nmse_std);
}

#[test]
fn ones_against_zeros() {
    let x = Array::<f64, _>::ones(IxDyn(&[1, 1, 2, 2]));
    let y = Array::<f64, _>::zeros(IxDyn(&[1, 1, 2, 2]));
    let meta = meta_2d();
    let options = MetricOptions::default();

    let mse = Metric::Mse.eval(x.view(), y.view(), &meta, &options).unwrap();
    assert_eq!(mse.shape(), &[1, 1]);
    assert_eq!(mse[[0, 0]], 1.0);

    let nmse = Metric::Nmse.eval(x.view(), y.view(), &meta, &options).unwrap();
    assert_abs_diff_eq!(nmse[[0, 0]], 1e7, epsilon = 1e-3);

    let linf = Metric::LInfinity.eval(x.view(), y.view(), &meta, &options).unwrap();
    assert_eq!(linf[[0, 0]], 1.0);
}

#[test]
fn normalization_uses_the_target_only() {
    let x = field(&[1, 1, 6, 6], 0.0);
    let y = field(&[1, 1, 6, 6], 0.9).mapv(|v| 3.0 * v);
    let meta = meta_2d();
    let options = MetricOptions::default();

    let mse_xy = Metric::Mse.eval(x.view(), y.view(), &meta, &options).unwrap();
    let mse_yx = Metric::Mse.eval(y.view(), x.view(), &meta, &options).unwrap();
    assert_eq!(mse_xy, mse_yx);

    let nmse_xy = Metric::Nmse.eval(x.view(), y.view(), &meta, &options).unwrap();
    let nmse_yx = Metric::Nmse.eval(y.view(), x.view(), &meta, &options).unwrap();
    assert_ne!(nmse_xy, nmse_yx);
}

#[test]
fn unknown_norm_mode_is_rejected() {
    let err = MetricOptions::default().with_norm_mode("bogus").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn dispatch_by_name() {
    let x = field(&[2, 1, 4, 4], 0.0);
    let y = field(&[2, 1, 4, 4], 0.5);
    let meta = meta_2d();
    let options = MetricOptions::default();

    let by_name = Metric::from_name("vrmse")
        .unwrap()
        .eval(x.view(), y.view(), &meta, &options)
        .unwrap();
    let direct = well_stats::metrics::spatial::vrmse(x.view(), y.view(), &meta, options.eps).unwrap();
    assert_eq!(by_name, direct);
}
