//! Dataset table schema: `calosim_dataset_v1`.
//!
//! ## Columns
//!
//! | Column               | Arrow Type | Description                              |
//! |----------------------|------------|------------------------------------------|
//! | `particle_type`      | `Utf8`     | True species (`photon`, `charged_pion`…) |
//! | `particle_code`      | `Int32`    | Stable integer code of the species       |
//! | `initial_energy`     | `Float64`  | Regression label (GeV)                   |
//! | `ecal_layer_<i>`     | `Float64`  | Deposit in ECAL layer `i` (GeV)          |
//! | `hcal_layer_<j>`     | `Float64`  | Deposit in HCAL layer `j` (GeV)          |
//! | `<derived feature>`  | `Float64`  | One column per feature-set entry         |
//!
//! ## Parquet key-value metadata
//!
//! | Key                      | Value                                   |
//! |--------------------------|-----------------------------------------|
//! | `calosim.schema_version` | `"calosim_dataset_v1"`                  |
//! | `calosim.feature_set`    | `basic_v1` / `extended_v1`              |
//! | `calosim.geometry_hash`  | SHA-256 of the resolved geometry        |
//! | `calosim.geometry`       | Geometry spec (JSON)                    |
//! | `calosim.run`            | Run metadata (JSON), when available     |

use calo_core::Section;
use calo_geometry::GeometryModel;
use calo_sim::FeatureSet;
use serde::Serialize;

/// Schema version string embedded in Parquet key-value metadata.
pub const DATASET_SCHEMA_V1: &str = "calosim_dataset_v1";

/// Metadata key for the schema version.
pub const META_KEY_SCHEMA_VERSION: &str = "calosim.schema_version";

/// Metadata key for the feature-set name.
pub const META_KEY_FEATURE_SET: &str = "calosim.feature_set";

/// Metadata key for the geometry hash.
pub const META_KEY_GEOMETRY_HASH: &str = "calosim.geometry_hash";

/// Metadata key for the geometry spec (JSON).
pub const META_KEY_GEOMETRY: &str = "calosim.geometry";

/// Metadata key for the run metadata (JSON).
pub const META_KEY_RUN: &str = "calosim.run";

/// Species name column.
pub const PARTICLE_TYPE_COLUMN: &str = "particle_type";

/// Species code column.
pub const PARTICLE_CODE_COLUMN: &str = "particle_code";

/// Label column.
pub const LABEL_COLUMN: &str = "initial_energy";

/// Column name of layer `index` in `section`.
pub fn layer_column(section: Section, index: usize) -> String {
    format!("{}_layer_{index}", section.as_str())
}

/// Fixed column layout of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSchema {
    /// Feature set used for derived columns.
    pub feature_set: FeatureSet,
    /// ECAL layer count.
    pub n_ecal: usize,
    /// HCAL layer count.
    pub n_hcal: usize,
    /// Geometry hash.
    pub geometry_hash: String,
}

impl DatasetSchema {
    /// Schema for `geometry` with `feature_set`.
    pub fn new(geometry: &GeometryModel, feature_set: FeatureSet) -> Self {
        Self {
            feature_set,
            n_ecal: geometry.section_len(Section::Ecal),
            n_hcal: geometry.section_len(Section::Hcal),
            geometry_hash: geometry.hash().to_string(),
        }
    }

    /// Total layer count.
    pub fn n_layers(&self) -> usize {
        self.n_ecal + self.n_hcal
    }

    /// Per-layer column names, ECAL then HCAL.
    pub fn layer_columns(&self) -> Vec<String> {
        (0..self.n_ecal)
            .map(|i| layer_column(Section::Ecal, i))
            .chain((0..self.n_hcal).map(|j| layer_column(Section::Hcal, j)))
            .collect()
    }

    /// Derived feature names, in column order.
    pub fn derived_columns(&self) -> &'static [&'static str] {
        self.feature_set.names()
    }

    /// Regression feature columns: per-layer deposits then derived features.
    pub fn feature_columns(&self) -> Vec<String> {
        let mut cols = self.layer_columns();
        cols.extend(self.derived_columns().iter().map(|s| s.to_string()));
        cols
    }

    /// All columns in table order.
    pub fn column_names(&self) -> Vec<String> {
        let mut cols =
            vec![PARTICLE_TYPE_COLUMN.to_string(), PARTICLE_CODE_COLUMN.to_string(), LABEL_COLUMN.to_string()];
        cols.extend(self.feature_columns());
        cols
    }
}
