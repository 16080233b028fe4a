use ndarray::{stack, Array1, ArrayD, ArrayView1, ArrayViewD, Axis};

use crate::data::model::Order;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// MomentRecord – moments of one field array
// ---------------------------------------------------------------------------

/// Population moments of one field array at one order.
///
/// The array is reduced over every axis except its trailing `o` axes, so
/// `mean` and `variance` have the shape of those trailing axes.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentRecord {
    /// Number of samples reduced into each element of `mean`.
    pub count: u64,
    pub mean: ArrayD<f64>,
    /// Population variance (divided by `count`, not `count - 1`).
    pub variance: ArrayD<f64>,
}

impl MomentRecord {
    pub fn of_field(data: ArrayViewD<'_, f64>, order: Order) -> Result<Self> {
        let kept = order.index();
        if data.ndim() < kept {
            return Err(Error::Schema(format!(
                "a {}-d array cannot hold a field at order {order}",
                data.ndim()
            )));
        }

        let (reduced, trailing) = data.shape().split_at(data.ndim() - kept);
        let count: usize = reduced.iter().product();
        if count == 0 {
            return Err(Error::Schema(format!(
                "empty population for array of shape {:?}",
                data.shape()
            )));
        }
        let inner: usize = trailing.iter().product();
        let trailing = trailing.to_vec();

        let flat = data
            .to_shape((count, inner))
            .map_err(|e| Error::Shape(e.to_string()))?;
        let mean = flat
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::Shape("cannot average an empty axis".into()))?;
        let variance = flat.var_axis(Axis(0), 0.0);

        Ok(Self {
            count: count as u64,
            mean: mean
                .into_shape_with_order(trailing.clone())
                .map_err(|e| Error::Shape(e.to_string()))?,
            variance: variance
                .into_shape_with_order(trailing)
                .map_err(|e| Error::Shape(e.to_string()))?,
        })
    }
}

// ---------------------------------------------------------------------------
// WeightedMixture – all observations of one field
// ---------------------------------------------------------------------------

/// Moment records of one field across every (file, order) observation.
#[derive(Debug, Clone, Default)]
pub struct WeightedMixture {
    records: Vec<MomentRecord>,
}

impl WeightedMixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one observation. Every record must share the first one's shape.
    pub fn push(&mut self, record: MomentRecord) -> Result<()> {
        if let Some(first) = self.records.first() {
            if first.mean.shape() != record.mean.shape() {
                return Err(Error::Schema(format!(
                    "moment shape {:?} does not match earlier shape {:?}",
                    record.mean.shape(),
                    first.mean.shape()
                )));
            }
        }
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_count(&self) -> u64 {
        self.records.iter().map(|r| r.count).sum()
    }

    /// `count / total_count` per record.
    pub fn weights(&self) -> Array1<f64> {
        let total = self.total_count() as f64;
        self.records.iter().map(|r| r.count as f64 / total).collect()
    }

    /// Combine the observations with the mixture-moment identity:
    ///
    /// ```text
    /// mean = Σ wᵢ μᵢ
    /// var  = Σ wᵢ (σᵢ² + μᵢ²) − mean²
    /// ```
    pub fn combine(&self) -> Result<GlobalStatistic> {
        let first = self
            .records
            .first()
            .ok_or_else(|| Error::Schema("no observations to combine".into()))?;
        let shape = first.mean.shape().to_vec();

        let means = self.stacked(|r| &r.mean)?;
        let variances = self.stacked(|r| &r.variance)?;
        let weights = self.weights();

        let first_moment = weights.dot(&means);
        let second_moment = weights.dot(&(variances + means.mapv(|m| m * m)));

        // Rounding can leave tiny negative variances; NaN passes through.
        let std = (second_moment - first_moment.mapv(|m| m * m))
            .mapv(|v| if v < 0.0 { 0.0 } else { v.sqrt() });

        Ok(GlobalStatistic {
            mean: first_moment
                .into_shape_with_order(shape.clone())
                .map_err(|e| Error::Shape(e.to_string()))?,
            std: std
                .into_shape_with_order(shape)
                .map_err(|e| Error::Shape(e.to_string()))?,
        })
    }

    /// `[observation, element]` matrix of one moment across all records.
    fn stacked<F>(&self, moment: F) -> Result<ndarray::Array2<f64>>
    where
        F: Fn(&MomentRecord) -> &ArrayD<f64>,
    {
        let rows: Vec<ArrayView1<'_, f64>> = self
            .records
            .iter()
            .map(|r| {
                let m = moment(r);
                m.view()
                    .into_shape_with_order(m.len())
                    .map_err(|e| Error::Shape(e.to_string()))
            })
            .collect::<Result<_>>()?;
        stack(Axis(0), &rows).map_err(|e| Error::Shape(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// GlobalStatistic – final per-field statistics
// ---------------------------------------------------------------------------

/// Dataset-wide mean and standard deviation of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalStatistic {
    pub mean: ArrayD<f64>,
    pub std: ArrayD<f64>,
}

impl GlobalStatistic {
    /// Fail unless every standard deviation exceeds `floor`.
    pub fn ensure_above(&self, field: &str, floor: f64) -> Result<()> {
        let min_std = self
            .std
            .iter()
            .copied()
            .filter(|s| !(*s > floor))
            .reduce(|min, s| if min.is_nan() || s < min { s } else { min });

        match min_std {
            Some(min_std) => Err(Error::DegenerateStatistics {
                field: field.to_string(),
                min_std,
                floor,
            }),
            None => Ok(()),
        }
    }

    /// `(data - mean) / std`, broadcasting over the trailing axes of `data`.
    pub fn normalize(&self, data: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        let (mean, std) = self.broadcast_to(data.shape())?;
        Ok((&data - &mean) / &std)
    }

    /// Inverse of [`GlobalStatistic::normalize`].
    pub fn denormalize(&self, data: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> {
        let (mean, std) = self.broadcast_to(data.shape())?;
        Ok(&data * &std + &mean)
    }

    fn broadcast_to(&self, shape: &[usize]) -> Result<(ArrayViewD<'_, f64>, ArrayViewD<'_, f64>)> {
        let incompatible = || {
            Error::Shape(format!(
                "statistics of shape {:?} do not broadcast to {shape:?}",
                self.mean.shape()
            ))
        };
        let mean = self.mean.broadcast(shape).ok_or_else(incompatible)?;
        let std = self.std.broadcast(shape).ok_or_else(incompatible)?;
        Ok((mean, std))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array, IxDyn};

    #[test]
    fn order_zero_reduces_every_axis() {
        let data = array![[1.0, 2.0], [3.0, 4.0]].into_dyn();
        let record = MomentRecord::of_field(data.view(), Order::Value).unwrap();
        assert_eq!(record.count, 4);
        assert_eq!(record.mean.ndim(), 0);
        assert_eq!(record.mean[IxDyn(&[])], 2.5);
        assert_eq!(record.variance[IxDyn(&[])], 1.25);
    }

    #[test]
    fn order_one_keeps_trailing_axis() {
        // [time, x, component]
        let data = Array::from_shape_fn((2, 3, 2), |(t, x, c)| {
            if c == 0 { (t * 3 + x) as f64 } else { 10.0 }
        })
        .into_dyn();
        let record = MomentRecord::of_field(data.view(), Order::FirstDerivative).unwrap();
        assert_eq!(record.count, 6);
        assert_eq!(record.mean.shape(), &[2]);
        assert_abs_diff_eq!(record.mean[[0]], 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(record.mean[[1]], 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(record.variance[[0]], 35.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(record.variance[[1]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rank_below_order_is_a_schema_error() {
        let data = Array::from_elem(IxDyn(&[4]), 1.0);
        let err = MomentRecord::of_field(data.view(), Order::SecondDerivative).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn combine_matches_pooled_moments() {
        let a = array![1.0, 2.0, 3.0].into_dyn();
        let b = array![10.0, 20.0].into_dyn();
        let pooled = array![1.0_f64, 2.0, 3.0, 10.0, 20.0];

        let mut mixture = WeightedMixture::new();
        mixture.push(MomentRecord::of_field(a.view(), Order::Value).unwrap()).unwrap();
        mixture.push(MomentRecord::of_field(b.view(), Order::Value).unwrap()).unwrap();

        assert_abs_diff_eq!(mixture.weights().sum(), 1.0, epsilon = 1e-12);

        let stat = mixture.combine().unwrap();
        let mean = pooled.mean().unwrap();
        let std = pooled.var(0.0).sqrt();
        assert_abs_diff_eq!(stat.mean[IxDyn(&[])], mean, epsilon = 1e-12);
        assert_abs_diff_eq!(stat.std[IxDyn(&[])], std, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_record_shapes_are_rejected() {
        let mut mixture = WeightedMixture::new();
        let scalar = array![1.0, 2.0].into_dyn();
        let vector = array![[1.0, 2.0], [3.0, 4.0]].into_dyn();
        mixture
            .push(MomentRecord::of_field(scalar.view(), Order::Value).unwrap())
            .unwrap();
        let err = mixture
            .push(MomentRecord::of_field(vector.view(), Order::FirstDerivative).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn ensure_above_reports_degenerate_field() {
        let stat = GlobalStatistic {
            mean: array![0.0, 0.0].into_dyn(),
            std: array![1.0, 1e-6].into_dyn(),
        };
        match stat.ensure_above("mask", 1e-4) {
            Err(Error::DegenerateStatistics { field, min_std, .. }) => {
                assert_eq!(field, "mask");
                assert_eq!(min_std, 1e-6);
            }
            other => panic!("expected degenerate error, got {other:?}"),
        }

        let nan = GlobalStatistic {
            mean: array![0.0].into_dyn(),
            std: array![f64::NAN].into_dyn(),
        };
        assert!(nan.ensure_above("nan", 1e-4).is_err());
    }

    #[test]
    fn normalize_broadcasts_over_trailing_axes() {
        let stat = GlobalStatistic {
            mean: array![1.0, -1.0].into_dyn(),
            std: array![2.0, 0.5].into_dyn(),
        };
        let data = array![[3.0, -1.5], [1.0, 0.0]].into_dyn();
        let normalized = stat.normalize(data.view()).unwrap();
        assert_eq!(normalized, array![[1.0, -1.0], [0.0, 2.0]].into_dyn());

        let restored = stat.denormalize(normalized.view()).unwrap();
        assert_eq!(restored, data);

        let wrong = Array::zeros(IxDyn(&[2, 3]));
        assert!(matches!(stat.normalize(wrong.view()), Err(Error::Shape(_))));
    }
}
