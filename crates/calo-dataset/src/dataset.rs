//! Aggregation of event records into a fixed-schema dataset.

use calo_core::{Error, Result, Section};
use calo_geometry::{GeometryModel, GeometrySpec};
use calo_sim::{EventRecord, FeatureSet, RunMetadata};

use crate::schema::DatasetSchema;

/// Validated, fixed-schema collection of events.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: DatasetSchema,
    geometry: GeometrySpec,
    records: Vec<EventRecord>,
    run: Option<RunMetadata>,
}

impl Dataset {
    /// Column layout.
    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    /// Geometry the events were simulated in.
    pub fn geometry(&self) -> &GeometrySpec {
        &self.geometry
    }

    /// Records in event order.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Run metadata, when attached.
    pub fn run_metadata(&self) -> Option<&RunMetadata> {
        self.run.as_ref()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Feature row of one record: per-layer deposits then derived features.
    pub fn feature_row(&self, record: &EventRecord) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.schema.n_layers() + self.schema.derived_columns().len());
        row.extend_from_slice(record.profile().per_layer_energy());
        row.extend(
            self.schema
                .derived_columns()
                .iter()
                .map(|name| record.feature(name).unwrap_or(f64::NAN)),
        );
        row
    }

    /// `(features, labels)` for a regression model; the label is the incident energy.
    pub fn features_and_labels(&self) -> (Vec<Vec<f64>>, Vec<f64>) {
        self.records
            .iter()
            .map(|r| (self.feature_row(r), r.initial_energy()))
            .unzip()
    }
}

/// Assembles a [`Dataset`] from simulated records.
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder {
    feature_set: FeatureSet,
    run: Option<RunMetadata>,
}

impl DatasetBuilder {
    /// Builder expecting `feature_set` on every record.
    pub fn new(feature_set: FeatureSet) -> Self {
        Self { feature_set, run: None }
    }

    /// Attach run metadata.
    pub fn with_run_metadata(mut self, run: RunMetadata) -> Self {
        self.run = Some(run);
        self
    }

    /// Validate `records` against `geometry` and the feature set.
    ///
    /// # Errors
    /// - [`Error::Validation`] if `records` is empty or holds a non-finite value
    /// - [`Error::SchemaMismatch`] if a record's layer split or feature names differ
    pub fn finalize(self, records: Vec<EventRecord>, geometry: &GeometryModel) -> Result<Dataset> {
        if records.is_empty() {
            return Err(Error::Validation("cannot build a dataset from zero records".into()));
        }

        let schema = DatasetSchema::new(geometry, self.feature_set);
        let expected: Vec<&str> = {
            let mut names = schema.derived_columns().to_vec();
            names.sort_unstable();
            names
        };

        for r in &records {
            let id = r.event_id();
            let p = r.profile();
            if p.len() != schema.n_layers() || p.n_ecal() != schema.n_ecal {
                return Err(Error::SchemaMismatch(format!(
                    "event {id}: {} ECAL + {} HCAL layers, geometry has {} + {}",
                    p.n_ecal(),
                    p.n_hcal(),
                    schema.n_ecal,
                    schema.n_hcal
                )));
            }
            // BTreeMap keys iterate sorted.
            if !r.derived_features().keys().map(String::as_str).eq(expected.iter().copied()) {
                let got: Vec<&str> = r.derived_features().keys().map(String::as_str).collect();
                return Err(Error::SchemaMismatch(format!(
                    "event {id}: features {got:?} do not match feature set {} {:?}",
                    self.feature_set,
                    schema.derived_columns()
                )));
            }
            if !r.initial_energy().is_finite() {
                return Err(Error::Validation(format!("event {id}: non-finite label")));
            }
            if let Some((name, v)) = r.derived_features().iter().find(|(_, v)| !v.is_finite()) {
                return Err(Error::Validation(format!("event {id}: feature {name} = {v}")));
            }
        }

        let geometry_spec = GeometrySpec::from_layers(
            geometry.layer_specs(Section::Ecal),
            geometry.layer_specs(Section::Hcal),
        );
        let geometry_spec = match geometry.name() {
            Some(name) => geometry_spec.with_name(name),
            None => geometry_spec,
        };

        tracing::info!(
            rows = records.len(),
            features = schema.feature_columns().len(),
            feature_set = %self.feature_set,
            "dataset finalized"
        );

        Ok(Dataset { schema, geometry: geometry_spec, records, run: self.run })
    }
}
