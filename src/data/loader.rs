use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::{ArrayD, Ix0, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpyError, ReadNpzError};

use super::model::{Order, WellMetadata};
use crate::error::{Error, Result};

const NPY_SUFFIX: &str = ".npy";
const N_SPATIAL_DIMS_ENTRY: &str = "n_spatial_dims";

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// One opened dataset file exposing named field arrays grouped by order.
pub trait FieldFile {
    /// Names of the fields stored at `order`, sorted.
    fn field_names(&mut self, order: Order) -> Result<Vec<String>>;

    /// Read a whole field array, converted to `f64`.
    fn read_field(&mut self, order: Order, name: &str) -> Result<ArrayD<f64>>;
}

/// A dataset made of several files, read without any normalization applied.
pub trait FieldSource {
    type File: FieldFile;

    /// Paths of the dataset's files, in processing order.
    fn file_paths(&self) -> &[PathBuf];

    fn open(&self, path: &Path) -> Result<Self::File>;
}

// ---------------------------------------------------------------------------
// WellDataset – a directory of .npz files
// ---------------------------------------------------------------------------

/// A directory of `.npz` files, each holding `t{o}_fields/<field>.npy` entries.
#[derive(Debug, Clone)]
pub struct WellDataset {
    train_dir: PathBuf,
    files: Vec<PathBuf>,
}

impl WellDataset {
    /// Enumerate the `.npz` files of `train_dir`, sorted by path.
    pub fn open(train_dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(train_dir).map_err(|e| Error::io(train_dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io(train_dir, e))?.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_ascii_lowercase();

            if path.is_file() && ext == "npz" {
                files.push(path);
            } else {
                debug!("Skipping {}", path.display());
            }
        }
        files.sort();

        debug!("Found {} files in {}", files.len(), train_dir.display());
        Ok(Self {
            train_dir: train_dir.to_path_buf(),
            files,
        })
    }

    /// Dataset name, taken from the `<name>/data/train` layout.
    pub fn name(&self) -> String {
        self.train_dir
            .ancestors()
            .nth(2)
            .and_then(|p| p.file_name())
            .or_else(|| self.train_dir.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Describe the dataset from its first file.
    pub fn metadata(&self) -> Result<WellMetadata> {
        let first = self
            .files
            .first()
            .ok_or_else(|| Error::Schema(format!("{} has no files", self.train_dir.display())))?;
        let mut file = self.open(first)?;

        let n_spatial_dims = file.n_spatial_dims()?.ok_or_else(|| {
            Error::Schema(format!(
                "{} has no '{N_SPATIAL_DIMS_ENTRY}' entry",
                first.display()
            ))
        })?;

        let mut meta = WellMetadata::new(self.name(), n_spatial_dims);
        for order in Order::ALL {
            let names = file.field_names(order)?;
            if !names.is_empty() {
                meta.field_names.insert(order, names);
            }
        }
        Ok(meta)
    }
}

impl FieldSource for WellDataset {
    type File = NpzFieldFile;

    fn file_paths(&self) -> &[PathBuf] {
        &self.files
    }

    fn open(&self, path: &Path) -> Result<NpzFieldFile> {
        NpzFieldFile::open(path)
    }
}

// ---------------------------------------------------------------------------
// NpzFieldFile
// ---------------------------------------------------------------------------

/// An opened `.npz` file. Entry names are indexed once on open.
pub struct NpzFieldFile {
    path: PathBuf,
    reader: NpzReader<File>,
    /// order → field name → raw zip entry name
    entries: BTreeMap<Order, BTreeMap<String, String>>,
    n_spatial_dims_entry: Option<String>,
}

impl NpzFieldFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = NpzReader::new(file).map_err(|source| Error::NpzRead {
            path: path.to_path_buf(),
            source,
        })?;
        let names = reader.names().map_err(|source| Error::NpzRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut entries: BTreeMap<Order, BTreeMap<String, String>> = BTreeMap::new();
        let mut n_spatial_dims_entry = None;
        for raw in names {
            if strip_npy(&raw) == N_SPATIAL_DIMS_ENTRY {
                n_spatial_dims_entry = Some(raw);
                continue;
            }
            let grouped = strip_npy(&raw).split_once('/').and_then(|(group, field)| {
                let order = Order::ALL.into_iter().find(|o| o.group_key() == group)?;
                (!field.is_empty() && !field.contains('/')).then_some((order, field))
            });
            match grouped {
                Some((order, field)) => {
                    entries
                        .entry(order)
                        .or_default()
                        .insert(field.to_string(), raw.clone());
                }
                None => debug!("Ignoring entry '{raw}' in {}", path.display()),
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            entries,
            n_spatial_dims_entry,
        })
    }

    /// Value of the optional scalar `n_spatial_dims` entry.
    pub fn n_spatial_dims(&mut self) -> Result<Option<usize>> {
        let Some(name) = self.n_spatial_dims_entry.clone() else {
            return Ok(None);
        };
        let value = self
            .reader
            .by_name::<OwnedRepr<i64>, Ix0>(&name)
            .map_err(|source| self.read_error(source))?
            .into_scalar();

        usize::try_from(value).map(Some).map_err(|_| {
            Error::Schema(format!(
                "{}: negative n_spatial_dims {value}",
                self.path.display()
            ))
        })
    }

    fn read_error(&self, source: ReadNpzError) -> Error {
        Error::NpzRead {
            path: self.path.clone(),
            source,
        }
    }
}

impl FieldFile for NpzFieldFile {
    fn field_names(&mut self, order: Order) -> Result<Vec<String>> {
        Ok(self
            .entries
            .get(&order)
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read_field(&mut self, order: Order, name: &str) -> Result<ArrayD<f64>> {
        let raw = self
            .entries
            .get(&order)
            .and_then(|fields| fields.get(name))
            .cloned()
            .ok_or_else(|| {
                Error::Schema(format!(
                    "{}: no field '{name}' in {}",
                    self.path.display(),
                    order.group_key()
                ))
            })?;

        // Stored as f64 or f32; anything else is rejected.
        match self.reader.by_name::<OwnedRepr<f64>, IxDyn>(&raw) {
            Ok(array) => Ok(array),
            Err(ReadNpzError::Npy(ReadNpyError::WrongDescriptor(_))) => {
                let array = self
                    .reader
                    .by_name::<OwnedRepr<f32>, IxDyn>(&raw)
                    .map_err(|source| self.read_error(source))?;
                Ok(array.mapv(f64::from))
            }
            Err(source) => Err(self.read_error(source)),
        }
    }
}

fn strip_npy(name: &str) -> &str {
    name.strip_suffix(NPY_SUFFIX).unwrap_or(name)
}
