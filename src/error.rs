use std::path::PathBuf;

use ndarray_npy::{ReadNpzError, WriteNpzError};
use thiserror::Error;

/// Everything that can go wrong while computing statistics or metrics.
///
/// Every variant is fatal to the dataset being processed; nothing is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// The statistics file already exists and would be overwritten.
    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),

    /// Fields, orders or shapes are inconsistent across the dataset's files.
    #[error("schema error: {0}")]
    Schema(String),

    /// A combined standard deviation fell below the configured floor.
    #[error("the standard deviation of the '{field}' field is abnormally low (min {min_std:e} <= {floor:e})")]
    DegenerateStatistics { field: String, min_std: f64, floor: f64 },

    /// An option value was not recognised.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Array shapes do not satisfy a metric's or a statistic's contract.
    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read npz {}: {source}", path.display())]
    NpzRead {
        path: PathBuf,
        #[source]
        source: ReadNpzError,
    },

    #[error("failed to write npz {}: {source}", path.display())]
    NpzWrite {
        path: PathBuf,
        #[source]
        source: WriteNpzError,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
