use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::models::InterpolatedField;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use crate::utils::filename::field_output_path;

/// One grid cell as stored on disk. `value` is `None` for undefined cells.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCell {
    pub row: u32,
    pub col: u32,
    pub longitude: f64,
    pub latitude: f64,
    pub value: Option<f64>,
}

/// Writes interpolated fields as long-format Parquet, one file per field.
pub struct ParquetFieldWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetFieldWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write every field under `output_dir`, named by its output stem. Returns the
    /// written paths in field order.
    pub fn write_fields(
        &self,
        fields: &[InterpolatedField],
        output_dir: &Path,
        prefix: &str,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(output_dir)?;

        fields
            .par_iter()
            .map(|field| {
                let path = field_output_path(output_dir, &field.output_stem(prefix));
                self.write_field(field, &path)?;
                Ok(path)
            })
            .collect()
    }

    /// Provenance goes into the schema metadata so the file is self-describing.
    pub fn write_field(&self, field: &InterpolatedField, path: &Path) -> Result<()> {
        let schema = self.create_schema(field);
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let (_, n_cols) = field.values.dim();
        let flat: Vec<(usize, f64)> = field.values.iter().copied().enumerate().collect();
        for chunk in flat.chunks(self.row_group_size) {
            let batch = self.cells_to_batch(field, chunk, n_cols, schema.clone())?;
            writer.write(&batch)?;
        }

        writer.close()?;
        debug!(
            "Wrote {} cells of {} to {}",
            flat.len(),
            field.bucket_label,
            path.display()
        );
        Ok(())
    }

    fn create_schema(&self, field: &InterpolatedField) -> Arc<Schema> {
        let fields = vec![
            Field::new("row", DataType::UInt32, false),
            Field::new("col", DataType::UInt32, false),
            Field::new("longitude", DataType::Float64, false),
            Field::new("latitude", DataType::Float64, false),
            Field::new("value", DataType::Float64, true),
        ];

        let mut metadata = HashMap::from([
            ("metric".to_string(), field.metric.key().to_string()),
            ("units".to_string(), field.metric.units().to_string()),
            ("bucket_label".to_string(), field.bucket_label.clone()),
            ("period".to_string(), field.period_key.clone()),
            ("station_count".to_string(), field.station_count.to_string()),
            ("mean_value".to_string(), field.mean_value.to_string()),
        ]);
        if let Some(speed) = field.mean_wind_speed {
            metadata.insert("mean_wind_speed".to_string(), speed.to_string());
        }

        Arc::new(Schema::new(fields).with_metadata(metadata))
    }

    /// `cells` holds row-major flat indices with their values
    fn cells_to_batch(
        &self,
        field: &InterpolatedField,
        cells: &[(usize, f64)],
        n_cols: usize,
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let longitudes = field.grid.longitudes();
        let latitudes = field.grid.latitudes();

        let rows: Vec<u32> = cells.iter().map(|(i, _)| (i / n_cols) as u32).collect();
        let cols: Vec<u32> = cells.iter().map(|(i, _)| (i % n_cols) as u32).collect();
        let lons: Vec<f64> = cells.iter().map(|(i, _)| longitudes[i % n_cols]).collect();
        let lats: Vec<f64> = cells.iter().map(|(i, _)| latitudes[i / n_cols]).collect();
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|(_, v)| if v.is_nan() { None } else { Some(*v) })
            .collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(UInt32Array::from(rows)),
                Arc::new(UInt32Array::from(cols)),
                Arc::new(Float64Array::from(lons)),
                Arc::new(Float64Array::from(lats)),
                Arc::new(Float64Array::from(values)),
            ],
        )?;

        Ok(batch)
    }

    /// Read up to `limit` cells from the start of a field file
    pub fn read_sample_cells(&self, path: &Path, limit: usize) -> Result<Vec<FieldCell>> {
        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut cells = Vec::new();
        for batch_result in parquet_reader {
            if cells.len() >= limit {
                break;
            }
            let batch = batch_result?;

            let rows = column::<UInt32Array>(&batch, 0, "row")?;
            let cols = column::<UInt32Array>(&batch, 1, "col")?;
            let lons = column::<Float64Array>(&batch, 2, "longitude")?;
            let lats = column::<Float64Array>(&batch, 3, "latitude")?;
            let values = column::<Float64Array>(&batch, 4, "value")?;

            let take = batch.num_rows().min(limit - cells.len());
            for i in 0..take {
                cells.push(FieldCell {
                    row: rows.value(i),
                    col: cols.value(i),
                    longitude: lons.value(i),
                    latitude: lats.value(i),
                    value: values.is_valid(i).then(|| values.value(i)),
                });
            }
        }

        Ok(cells)
    }

    /// Provenance stored with a field file
    pub fn read_field_metadata(&self, path: &Path) -> Result<HashMap<String, String>> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        Ok(builder.schema().metadata().clone())
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();
        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            metadata.row_group(0).column(0).compression()
        } else {
            self.compression
        };

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression,
        })
    }
}

impl Default for ParquetFieldWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn column<'b, T: 'static>(batch: &'b RecordBatch, index: usize, name: &str) -> Result<&'b T> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column type", name)))
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };
        format!(
            "Parquet File Summary:\n\
            - Total cells: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg cells per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BucketKey, DiurnalPeriod, Grid, Metric, SiteValue};
    use ndarray::array;
    use tempfile::{NamedTempFile, TempDir};

    fn field() -> InterpolatedField {
        let grid = Arc::new(Grid::from_axes(vec![120.0, 120.1, 120.2], vec![22.5, 22.6]).unwrap());
        InterpolatedField::new(
            Metric::Pm25,
            BucketKey::Year(2020),
            "2020".to_string(),
            &DiurnalPeriod::builtin("noon").unwrap(),
            array![[1.0, 2.0, f64::NAN], [4.0, 5.0, 6.0]],
            grid,
            vec![SiteValue::new("A", 22.5, 120.0, 3.5)],
        )
        .unwrap()
    }

    #[test]
    fn test_write_and_sample_field() -> Result<()> {
        let writer = ParquetFieldWriter::new().with_row_group_size(4);
        let temp_file = NamedTempFile::new().unwrap();
        writer.write_field(&field(), temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 6);
        assert_eq!(info.row_group_sizes, vec![4, 2]);

        let cells = writer.read_sample_cells(temp_file.path(), 10)?;
        assert_eq!(cells.len(), 6);
        assert_eq!(
            cells[2],
            FieldCell {
                row: 0,
                col: 2,
                longitude: 120.2,
                latitude: 22.5,
                value: None,
            }
        );
        assert_eq!(cells[4].value, Some(5.0));
        assert_eq!(cells[4].latitude, 22.6);

        let sample = writer.read_sample_cells(temp_file.path(), 3)?;
        assert_eq!(sample.len(), 3);

        let metadata = writer.read_field_metadata(temp_file.path())?;
        assert_eq!(metadata["metric"], "pm25");
        assert_eq!(metadata["period"], "noon");
        assert_eq!(metadata["station_count"], "1");
        Ok(())
    }

    #[test]
    fn test_write_fields_uses_output_stems() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let paths = ParquetFieldWriter::new().write_fields(&[field()], dir.path(), "kaohsiung")?;

        assert_eq!(paths.len(), 1);
        assert_eq!(
            paths[0].file_name().unwrap().to_str().unwrap(),
            "kaohsiung_pm25_2020_noon.parquet"
        );
        assert!(paths[0].exists());
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let compressions = ["snappy", "gzip", "lz4", "zstd", "none"];

        for compression in &compressions {
            let writer = ParquetFieldWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new().unwrap();
            let result = writer.write_field(&field(), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetFieldWriter::new().with_compression("brotli9").is_err());
        Ok(())
    }
}
