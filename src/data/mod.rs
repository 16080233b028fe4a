/// Data layer: dataset model, file access and synthetic datasets.
///
/// Architecture:
/// ```text
///  <dataset>/data/train/*.npz
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  WellDataset / NpzFieldFile → f64 field arrays
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model   │  Order, WellMetadata
///   └──────────┘
/// ```
///
/// `synthetic` writes datasets in the same layout for demos and tests.

pub mod loader;
pub mod model;
pub mod synthetic;
