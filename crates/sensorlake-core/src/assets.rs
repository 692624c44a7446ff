//! Asset catalog: where each plant's sensor directories live in the lake.
//!
//! Sensors are grouped under assets (plants, installations); the catalog maps
//! `(storage name, asset)` to the directory holding that asset's sensor
//! subdirectories, along with the reader kind that understands the layout.
//! Catalog construction from config files is out of scope here; callers and
//! tests build it directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::storage::DataLakeStorage;

/// One catalog entry: the lake directory for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPathSpec {
    /// Name of the reader kind that understands this directory layout.
    pub reader: String,
    /// Base directory of the storage area, as a lake path.
    pub base_path: String,
    /// Asset directory relative to `base_path`.
    pub relative_path: String,
}

impl AssetPathSpec {
    /// Create a spec from its three components.
    pub fn new(
        reader: impl Into<String>,
        base_path: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Self {
        AssetPathSpec {
            reader: reader.into(),
            base_path: base_path.into(),
            relative_path: relative_path.into(),
        }
    }

    /// The absolute lake path of this asset's directory.
    pub fn full_path(&self, storage: &DataLakeStorage) -> String {
        storage.join(&self.base_path, &self.relative_path)
    }
}

/// In-memory mapping from `(storage name, asset)` to [`AssetPathSpec`].
///
/// Asset names are matched case-insensitively; they come from
/// operator-entered tag lists with inconsistent casing.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    paths: HashMap<(String, String), AssetPathSpec>,
}

impl AssetCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        AssetCatalog::default()
    }

    /// Register `spec` for `asset` under `storage_name`, replacing any
    /// previous entry.
    pub fn insert(
        &mut self,
        storage_name: impl Into<String>,
        asset: &str,
        spec: AssetPathSpec,
    ) -> &mut Self {
        self.paths.insert((storage_name.into(), asset.to_lowercase()), spec);
        self
    }

    /// Look up the entry for `asset` under `storage_name`.
    pub fn get_path(&self, storage_name: &str, asset: &str) -> Option<&AssetPathSpec> {
        self.paths.get(&(storage_name.to_string(), asset.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_path_joins_base_and_relative() {
        let storage = DataLakeStorage::local("/lake");
        let spec = AssetPathSpec::new("time_series_reader", "raw/plant-a", "sensordata");
        assert_eq!(spec.full_path(&storage), "raw/plant-a/sensordata");
    }

    #[test]
    fn lookup_is_case_insensitive_on_asset() {
        let mut catalog = AssetCatalog::new();
        catalog.insert("local", "Plant-A", AssetPathSpec::new("time_series_reader", "raw", "a"));

        assert!(catalog.get_path("local", "plant-a").is_some());
        assert!(catalog.get_path("local", "PLANT-A").is_some());
        assert!(catalog.get_path("other", "plant-a").is_none());
        assert!(catalog.get_path("local", "plant-b").is_none());
    }
}
