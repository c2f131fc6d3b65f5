//! Arrow export of a [`Dataset`].

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use calo_core::{Error, Result};

use crate::dataset::Dataset;
use crate::schema::{
    DATASET_SCHEMA_V1, LABEL_COLUMN, META_KEY_FEATURE_SET, META_KEY_GEOMETRY,
    META_KEY_GEOMETRY_HASH, META_KEY_RUN, META_KEY_SCHEMA_VERSION, PARTICLE_CODE_COLUMN,
    PARTICLE_TYPE_COLUMN,
};

/// Schema-level key-value metadata of `dataset`.
pub fn dataset_metadata(dataset: &Dataset) -> Result<HashMap<String, String>> {
    let schema = dataset.schema();
    let geometry_json = serde_json::to_string(dataset.geometry())
        .map_err(|e| Error::Validation(format!("failed to serialize geometry metadata: {e}")))?;

    let mut metadata = HashMap::from([
        (META_KEY_SCHEMA_VERSION.to_string(), DATASET_SCHEMA_V1.to_string()),
        (META_KEY_FEATURE_SET.to_string(), schema.feature_set.as_str().to_string()),
        (META_KEY_GEOMETRY_HASH.to_string(), schema.geometry_hash.clone()),
        (META_KEY_GEOMETRY.to_string(), geometry_json),
    ]);
    if let Some(run) = dataset.run_metadata() {
        let run_json = serde_json::to_string(run)
            .map_err(|e| Error::Validation(format!("failed to serialize run metadata: {e}")))?;
        metadata.insert(META_KEY_RUN.to_string(), run_json);
    }
    Ok(metadata)
}

/// Build an Arrow [`RecordBatch`] with one row per event.
pub fn dataset_to_record_batch(dataset: &Dataset) -> Result<RecordBatch> {
    let schema = dataset.schema();
    let records = dataset.records();

    let mut fields = vec![
        Field::new(PARTICLE_TYPE_COLUMN, DataType::Utf8, false),
        Field::new(PARTICLE_CODE_COLUMN, DataType::Int32, false),
        Field::new(LABEL_COLUMN, DataType::Float64, false),
    ];
    fields.extend(schema.feature_columns().iter().map(|n| Field::new(n, DataType::Float64, false)));

    let arrow_schema = Arc::new(Schema::new(fields).with_metadata(dataset_metadata(dataset)?));

    let types: Vec<&str> = records.iter().map(|r| r.particle_type().as_str()).collect();
    let codes: Vec<i32> = records.iter().map(|r| r.particle_type().code()).collect();
    let labels: Vec<f64> = records.iter().map(|r| r.initial_energy()).collect();

    let mut arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(types)),
        Arc::new(Int32Array::from(codes)),
        Arc::new(Float64Array::from(labels)),
    ];

    for layer in 0..schema.n_layers() {
        let col: Vec<f64> = records.iter().map(|r| r.profile().per_layer_energy()[layer]).collect();
        arrays.push(Arc::new(Float64Array::from(col)));
    }
    for name in schema.derived_columns() {
        let col: Vec<f64> = records.iter().map(|r| r.feature(name).unwrap_or(f64::NAN)).collect();
        arrays.push(Arc::new(Float64Array::from(col)));
    }

    RecordBatch::try_new(arrow_schema, arrays)
        .map_err(|e| Error::Validation(format!("failed to build RecordBatch: {e}")))
}
