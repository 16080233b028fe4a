/// Spatial error metrics between a prediction and a reference field.
///
/// Every metric shares one call shape, `(prediction, target, metadata,
/// options)`, so callers can dispatch by name through [`Metric::from_name`].

pub mod spatial;

use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayD, ArrayViewD};

use crate::data::model::WellMetadata;
use crate::error::{Error, Result};

/// Default `eps` added to normalization denominators.
pub const DEFAULT_EPS: f64 = 1e-7;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How NMSE-style metrics scale the squared error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormMode {
    /// Divide by the target's spatial mean square.
    #[default]
    Norm,
    /// Divide by the target's spatial variance.
    Std,
}

impl FromStr for NormMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "norm" => Ok(NormMode::Norm),
            "std" => Ok(NormMode::Std),
            other => Err(Error::InvalidArgument(format!("invalid norm_mode: {other}"))),
        }
    }
}

impl fmt::Display for NormMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormMode::Norm => write!(f, "norm"),
            NormMode::Std => write!(f, "std"),
        }
    }
}

/// Extra arguments accepted by the normalized metrics; ignored by the others.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricOptions {
    pub eps: f64,
    pub norm_mode: NormMode,
}

impl Default for MetricOptions {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            norm_mode: NormMode::Norm,
        }
    }
}

impl MetricOptions {
    /// Set the normalization mode from its name (`"norm"` or `"std"`).
    pub fn with_norm_mode(mut self, mode: &str) -> Result<Self> {
        self.norm_mode = mode.parse()?;
        Ok(self)
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }
}

// ---------------------------------------------------------------------------
// Metric registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Mse,
    Nmse,
    Rmse,
    Nrmse,
    Vmse,
    Vrmse,
    LInfinity,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Mse,
        Metric::Nmse,
        Metric::Rmse,
        Metric::Nrmse,
        Metric::Vmse,
        Metric::Vrmse,
        Metric::LInfinity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Mse => "MSE",
            Metric::Nmse => "NMSE",
            Metric::Rmse => "RMSE",
            Metric::Nrmse => "NRMSE",
            Metric::Vmse => "VMSE",
            Metric::Vrmse => "VRMSE",
            Metric::LInfinity => "LInfinity",
        }
    }

    /// Case-insensitive lookup; `linf` is accepted for [`Metric::LInfinity`].
    pub fn from_name(name: &str) -> Result<Self> {
        if name.eq_ignore_ascii_case("linf") {
            return Ok(Metric::LInfinity);
        }
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown metric: {name}")))
    }

    /// Reduce the trailing spatial axes of `x` against `y`.
    ///
    /// `VMSE`/`VRMSE` always normalize by variance; `options.norm_mode` only
    /// affects `NMSE`/`NRMSE`.
    pub fn eval(
        self,
        x: ArrayViewD<'_, f64>,
        y: ArrayViewD<'_, f64>,
        meta: &WellMetadata,
        options: &MetricOptions,
    ) -> Result<ArrayD<f64>> {
        let MetricOptions { eps, norm_mode } = *options;
        match self {
            Metric::Mse => spatial::mse(x, y, meta),
            Metric::Nmse => spatial::nmse(x, y, meta, eps, norm_mode),
            Metric::Rmse => spatial::rmse(x, y, meta),
            Metric::Nrmse => spatial::nrmse(x, y, meta, eps, norm_mode),
            Metric::Vmse => spatial::vmse(x, y, meta, eps),
            Metric::Vrmse => spatial::vrmse(x, y, meta, eps),
            Metric::LInfinity => spatial::linf(x, y, meta),
        }
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Metric::from_name(s)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
