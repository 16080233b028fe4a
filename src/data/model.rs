use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Order – which time-derivative of a field an array holds
// ---------------------------------------------------------------------------

/// Time-derivative order of a stored field array.
///
/// An array at order `o` carries `o` trailing axes that are kept (not reduced)
/// when computing its statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Order {
    /// Raw field value.
    Value,
    /// First time-derivative.
    FirstDerivative,
    /// Second time-derivative.
    SecondDerivative,
}

impl Order {
    /// All orders, in file-processing order.
    pub const ALL: [Order; 3] = [Order::Value, Order::FirstDerivative, Order::SecondDerivative];

    /// Numeric order `o` (0, 1 or 2).
    pub fn index(self) -> usize {
        match self {
            Order::Value => 0,
            Order::FirstDerivative => 1,
            Order::SecondDerivative => 2,
        }
    }

    /// Name of the group holding the fields of this order, e.g. `t1_fields`.
    pub fn group_key(self) -> String {
        format!("t{}_fields", self.index())
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.index())
    }
}

// ---------------------------------------------------------------------------
// WellMetadata – read-only geometry descriptor
// ---------------------------------------------------------------------------

/// Geometry and schema of one dataset, as seen by metrics and loaders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellMetadata {
    pub dataset_name: String,
    /// Number of trailing spatial axes of every field array.
    pub n_spatial_dims: usize,
    /// Field names recorded at each order (empty when built by hand).
    pub field_names: BTreeMap<Order, Vec<String>>,
}

impl WellMetadata {
    pub fn new(dataset_name: impl Into<String>, n_spatial_dims: usize) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            n_spatial_dims,
            field_names: BTreeMap::new(),
        }
    }

    /// Total number of distinct field names across all orders.
    pub fn n_fields(&self) -> usize {
        let mut names: Vec<&String> = self.field_names.values().flatten().collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_keys_match_order_index() {
        let keys: Vec<String> = Order::ALL.iter().map(|o| o.group_key()).collect();
        assert_eq!(keys, ["t0_fields", "t1_fields", "t2_fields"]);
        assert_eq!(Order::SecondDerivative.to_string(), "t2");
    }

    #[test]
    fn n_fields_counts_names_once() {
        let mut meta = WellMetadata::new("shear_flow", 2);
        meta.field_names
            .insert(Order::Value, vec!["pressure".into(), "tracer".into()]);
        meta.field_names
            .insert(Order::FirstDerivative, vec!["velocity".into(), "tracer".into()]);
        assert_eq!(meta.n_fields(), 3);
    }
}
