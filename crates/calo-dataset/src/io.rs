//! Parquet write and read-back of datasets.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arrow::array::{Array, Float64Array, StringArray};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use calo_geometry::GeometrySpec;
use calo_sim::{FeatureSet, RunMetadata};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::dataset::Dataset;
use crate::schema::{
    DATASET_SCHEMA_V1, LABEL_COLUMN, META_KEY_FEATURE_SET, META_KEY_GEOMETRY,
    META_KEY_GEOMETRY_HASH, META_KEY_RUN, META_KEY_SCHEMA_VERSION, PARTICLE_TYPE_COLUMN,
};
use crate::table::dataset_to_record_batch;

/// Error type for dataset file operations.
#[derive(Debug, thiserror::Error)]
pub enum DatasetIoError {
    #[error("Parquet read/write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] calo_core::Error),

    #[error("missing metadata key: {0}")]
    MissingMetadata(&'static str),

    #[error("unsupported schema version '{0}' (expected {DATASET_SCHEMA_V1})")]
    SchemaVersion(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("column '{column}' has wrong type: expected {expected}")]
    ColumnType { column: String, expected: &'static str },
}

fn default_compression() -> Compression {
    Compression::SNAPPY
}

fn writer_properties() -> WriterProperties {
    WriterProperties::builder().set_compression(default_compression()).build()
}

/// Sibling path used while a file is being written.
///
/// Unique per process and per call, so concurrent writers to one target never
/// share a temporary file.
fn temp_path(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let nonce = NEXT.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}.{nonce}.tmp", std::process::id()))
}

/// Serialize `dataset` to Parquet bytes in memory.
pub fn write_parquet_bytes(dataset: &Dataset) -> Result<Vec<u8>, DatasetIoError> {
    let batch = dataset_to_record_batch(dataset)?;
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(writer_properties()))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buf)
}

/// Write `dataset` to `path`.
///
/// The file is written to a hidden sibling and renamed into place once
/// complete; on failure no file is left at `path`.
pub fn write_parquet(dataset: &Dataset, path: &Path) -> Result<(), DatasetIoError> {
    let batch = dataset_to_record_batch(dataset)?;
    let tmp = temp_path(path);

    let result = (|| -> Result<(), DatasetIoError> {
        let file = File::create(&tmp)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(writer_properties()))?;
        writer.write(&batch)?;
        writer.close()?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    tracing::info!(path = %path.display(), rows = dataset.len(), "dataset written");
    Ok(())
}

/// Dataset read back from Parquet, in the form a regression model consumes.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    /// Feature set recorded in the file.
    pub feature_set: FeatureSet,
    /// Geometry hash recorded in the file.
    pub geometry_hash: String,
    /// Geometry spec recorded in the file.
    pub geometry: GeometrySpec,
    /// Run metadata, if present.
    pub run: Option<RunMetadata>,
    /// Feature column names (per-layer deposits then derived features).
    pub feature_names: Vec<String>,
    /// One feature row per event.
    pub features: Vec<Vec<f64>>,
    /// Incident energies (GeV).
    pub labels: Vec<f64>,
    /// Particle type names.
    pub particle_types: Vec<String>,
}

impl LoadedDataset {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the file held no rows.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Read a dataset file written by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<LoadedDataset, DatasetIoError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    // Capture the Arrow schema (with key-value metadata) before building the reader.
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let batches: Result<Vec<_>, _> = reader.collect();
    from_record_batches(&schema, &batches?)
}

/// Read a dataset from in-memory Parquet bytes.
pub fn read_parquet_bytes(data: &[u8]) -> Result<LoadedDataset, DatasetIoError> {
    let buf = bytes::Bytes::copy_from_slice(data);
    let builder = ParquetRecordBatchReaderBuilder::try_new(buf)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let batches: Result<Vec<_>, _> = reader.collect();
    from_record_batches(&schema, &batches?)
}

fn meta<'a>(schema: &'a Schema, key: &'static str) -> Result<&'a str, DatasetIoError> {
    schema.metadata().get(key).map(String::as_str).ok_or(DatasetIoError::MissingMetadata(key))
}

fn f64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, DatasetIoError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DatasetIoError::MissingColumn(name.to_string()))?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| DatasetIoError::ColumnType { column: name.to_string(), expected: "Float64" })
}

fn check_no_nulls(name: &str, col: &dyn Array) -> Result<(), DatasetIoError> {
    if col.null_count() > 0 {
        return Err(calo_core::Error::Validation(format!("column '{name}' has missing values")).into());
    }
    Ok(())
}

/// Validate metadata and extract feature/label vectors from record batches.
pub fn from_record_batches(
    schema: &Arc<Schema>,
    batches: &[RecordBatch],
) -> Result<LoadedDataset, DatasetIoError> {
    let version = meta(schema, META_KEY_SCHEMA_VERSION)?;
    if version != DATASET_SCHEMA_V1 {
        return Err(DatasetIoError::SchemaVersion(version.to_string()));
    }
    let feature_set: FeatureSet = meta(schema, META_KEY_FEATURE_SET)?.parse()?;
    let geometry_hash = meta(schema, META_KEY_GEOMETRY_HASH)?.to_string();
    let geometry: GeometrySpec = serde_json::from_str(meta(schema, META_KEY_GEOMETRY)?)?;
    let run = match schema.metadata().get(META_KEY_RUN) {
        Some(json) => Some(serde_json::from_str::<RunMetadata>(json)?),
        None => None,
    };

    let model = geometry.build()?;
    if model.hash() != geometry_hash {
        return Err(calo_core::Error::SchemaMismatch(format!(
            "geometry hash {geometry_hash} does not match embedded geometry ({})",
            model.hash()
        ))
        .into());
    }
    let feature_names = crate::schema::DatasetSchema::new(&model, feature_set).feature_columns();

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut particle_types = Vec::new();

    for batch in batches {
        let label_col = f64_column(batch, LABEL_COLUMN)?;
        check_no_nulls(LABEL_COLUMN, label_col)?;
        let type_col = batch
            .column_by_name(PARTICLE_TYPE_COLUMN)
            .ok_or_else(|| DatasetIoError::MissingColumn(PARTICLE_TYPE_COLUMN.to_string()))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| DatasetIoError::ColumnType {
                column: PARTICLE_TYPE_COLUMN.to_string(),
                expected: "Utf8",
            })?;
        check_no_nulls(PARTICLE_TYPE_COLUMN, type_col)?;

        let cols = feature_names
            .iter()
            .map(|name| {
                let col = f64_column(batch, name)?;
                check_no_nulls(name, col)?;
                Ok(col)
            })
            .collect::<Result<Vec<_>, DatasetIoError>>()?;

        for row in 0..batch.num_rows() {
            features.push(cols.iter().map(|c| c.value(row)).collect());
        }
        labels.extend(label_col.values().iter().copied());
        particle_types.extend((0..type_col.len()).map(|i| type_col.value(i).to_string()));
    }

    Ok(LoadedDataset {
        feature_set,
        geometry_hash,
        geometry,
        run,
        feature_names,
        features,
        labels,
        particle_types,
    })
}
