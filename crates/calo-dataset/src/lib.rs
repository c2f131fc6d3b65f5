//! Dataset assembly and columnar I/O for CaloSim.
//!
//! [`DatasetBuilder::finalize`] checks that every record shares the layer
//! layout of the geometry and the names of one versioned feature set, then
//! the dataset can be exported as an Arrow batch or a Parquet file carrying
//! the geometry and run metadata.

pub mod dataset;
pub mod io;
pub mod schema;
pub mod table;

pub use dataset::{Dataset, DatasetBuilder};
pub use io::{
    DatasetIoError, LoadedDataset, read_parquet, read_parquet_bytes, write_parquet,
    write_parquet_bytes,
};
pub use schema::DatasetSchema;
pub use table::dataset_to_record_batch;
