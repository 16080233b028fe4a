use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::moments::GlobalStatistic;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// StatsFile – field → (mean, std)
// ---------------------------------------------------------------------------

/// Statistics of every field of one dataset.
///
/// Persisted as YAML with two top-level keys:
///
/// ```yaml
/// mean:
///   pressure: 1.25
///   velocity: [0.1, -0.3]
/// std:
///   pressure: 0.5
///   velocity: [1.2, 0.9]
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsFile {
    fields: BTreeMap<String, GlobalStatistic>,
}

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
struct StatsDocument {
    mean: BTreeMap<String, NestedList>,
    std: BTreeMap<String, NestedList>,
}

impl StatsFile {
    pub fn insert(&mut self, field: String, stat: GlobalStatistic) {
        self.fields.insert(field, stat);
    }

    pub fn get(&self, field: &str) -> Option<&GlobalStatistic> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &GlobalStatistic)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_yaml(&self) -> Result<String> {
        let doc = StatsDocument {
            mean: self
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), NestedList::from_array(v.mean.view())))
                .collect(),
            std: self
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), NestedList::from_array(v.std.view())))
                .collect(),
        };
        Ok(serde_yaml::to_string(&doc)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let doc: StatsDocument = serde_yaml::from_str(text)?;
        if !doc.mean.keys().eq(doc.std.keys()) {
            return Err(Error::Schema(
                "'mean' and 'std' list different fields".into(),
            ));
        }

        let mut fields = BTreeMap::new();
        for ((field, mean), (_, std)) in doc.mean.into_iter().zip(doc.std) {
            let stat = GlobalStatistic {
                mean: mean.into_array()?,
                std: std.into_array()?,
            };
            if stat.mean.shape() != stat.std.shape() {
                return Err(Error::Schema(format!(
                    "field '{field}': mean shape {:?} differs from std shape {:?}",
                    stat.mean.shape(),
                    stat.std.shape()
                )));
            }
            fields.insert(field, stat);
        }
        Ok(Self { fields })
    }

    /// Write to `path`, which must not exist yet.
    ///
    /// A pre-existing file or a concurrent writer that got there first
    /// yields [`Error::AlreadyExists`]. A failed write leaves no file.
    pub fn write_new(&self, path: &Path) -> Result<()> {
        let text = self.to_yaml()?;
        write_exclusive(path, |out| out.write_all(text.as_bytes()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&text)
    }
}

/// Fill a temporary sibling of `path`, then link it into place only if
/// `path` is still free. The temporary file is removed on every error path.
fn write_exclusive<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    // Temporary files start out owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| Error::io(tmp.path(), e))?;
    }
    write(tmp.as_file_mut())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| Error::io(path, e))?;

    tmp.persist_noclobber(path).map_err(|e| match e.error.kind() {
        ErrorKind::AlreadyExists => Error::AlreadyExists(path.to_path_buf()),
        _ => Error::io(path, e.error),
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// NestedList – arrays as plain nested lists
// ---------------------------------------------------------------------------

/// A 0-d array is a bare number, an n-d array a list of (n-1)-d arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum NestedList {
    Scalar(f64),
    List(Vec<NestedList>),
}

impl NestedList {
    fn from_array(view: ArrayViewD<'_, f64>) -> Self {
        if view.ndim() == 0 {
            NestedList::Scalar(view.iter().copied().next().unwrap_or(f64::NAN))
        } else {
            NestedList::List(view.outer_iter().map(NestedList::from_array).collect())
        }
    }

    fn into_array(self) -> Result<ArrayD<f64>> {
        let mut shape = Vec::new();
        let mut values = Vec::new();
        self.flatten_into(0, &mut shape, &mut values)?;
        ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| Error::Shape(e.to_string()))
    }

    /// Depth-first flatten; the first path down fixes the shape.
    fn flatten_into(&self, depth: usize, shape: &mut Vec<usize>, values: &mut Vec<f64>) -> Result<()> {
        match self {
            NestedList::Scalar(v) => {
                if depth != shape.len() {
                    return Err(ragged());
                }
                values.push(*v);
            }
            NestedList::List(items) => {
                if depth == shape.len() {
                    if !values.is_empty() {
                        return Err(ragged());
                    }
                    shape.push(items.len());
                } else if shape[depth] != items.len() {
                    return Err(ragged());
                }
                for item in items {
                    item.flatten_into(depth + 1, shape, values)?;
                }
            }
        }
        Ok(())
    }
}

fn ragged() -> Error {
    Error::Schema("statistics are not a rectangular nested list".into())
}
