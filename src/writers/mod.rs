pub mod manifest;
pub mod parquet_writer;

pub use manifest::{FieldEntry, RunManifest, SiteEntry};
pub use parquet_writer::{FieldCell, ParquetFieldWriter, ParquetFileInfo};
