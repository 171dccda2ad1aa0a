//! Parquet file reader and writer
use super::ChannelFile;
use crate::channel_data::{Accumulate, ChannelData};
use crate::errors::PersistenceError;
use crate::geometry::Point3;
use crate::image::ReconstructedImage;
use arrow::array::{
    Array, ArrayRef, Float64Array, Float64Builder, ListArray, ListBuilder, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Pixels per record batch when writing images
const PIXELS_PER_BATCH: usize = 64 * 1024;

// ---------- Schema Creation ----------

/// Create channel data schema: one row per element
fn create_channel_schema() -> Schema {
    let samples = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
    Schema::new(vec![
        Field::new("element_x", DataType::Float64, false),
        Field::new("element_y", DataType::Float64, false),
        Field::new("element_z", DataType::Float64, false),
        Field::new("sampling_rate", DataType::Float64, false),
        Field::new("start_time", DataType::Float64, false),
        Field::new("samples", samples, false),
    ])
}

/// Create image schema: one row per pixel
fn create_image_schema(complex: bool) -> Schema {
    let mut fields = vec![
        Field::new("depth_index", DataType::UInt32, false),
        Field::new("lateral_index", DataType::UInt32, false),
        Field::new("elevation_index", DataType::UInt32, false),
        Field::new("x", DataType::Float64, false),
        Field::new("y", DataType::Float64, false),
        Field::new("z", DataType::Float64, false),
        Field::new("value", DataType::Float64, false),
    ];
    if complex {
        fields.push(Field::new("value_im", DataType::Float64, false));
    }
    Schema::new(fields)
}

fn new_arrow_writer(file_path: &Path, schema: Arc<Schema>) -> Result<ArrowWriter<File>, PersistenceError> {
    let file = File::create(file_path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    Ok(ArrowWriter::try_new(file, schema, Some(props))?)
}

// ---------- Channel data ----------

/// Write channel data and element positions as a single record batch.
pub(super) fn write_channel_file(path: &Path, file: &ChannelFile) -> Result<(), PersistenceError> {
    let data = &file.channel_data;
    let num_elements = data.num_elements();

    let mut samples_builder = ListBuilder::new(Float64Builder::new());
    for channel in data.samples().outer_iter() {
        for &sample in channel.iter() {
            samples_builder.values().append_value(sample);
        }
        samples_builder.append(true);
    }

    let column = |f: fn(&Point3) -> f64| {
        Arc::new(Float64Array::from_iter_values(file.elements.iter().map(f))) as ArrayRef
    };
    let arrays = vec![
        column(|e| e.x),
        column(|e| e.y),
        column(|e| e.z),
        Arc::new(Float64Array::from(vec![data.sampling_rate(); num_elements])) as ArrayRef,
        Arc::new(Float64Array::from(vec![data.start_time(); num_elements])) as ArrayRef,
        Arc::new(samples_builder.finish()) as ArrayRef,
    ];

    let schema = Arc::new(create_channel_schema());
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    let mut writer = new_arrow_writer(path, schema)?;
    writer.write(&batch)?;
    writer.close()?;
    log::debug!("Wrote {} channels to {}", num_elements, path.display());
    Ok(())
}

/// Read channel data written by [`write_channel_file`] or any file with the same
/// columns. `start_time` is optional and defaults to 0.
pub(super) fn read_channel_file(path: &Path) -> Result<ChannelFile, PersistenceError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut elements = Vec::new();
    let mut channels = Vec::new();
    let mut sampling_rate = None;
    let mut start_time = None;

    for batch in reader {
        let batch = batch?;
        let xs = float_column(&batch, "element_x")?;
        let ys = float_column(&batch, "element_y")?;
        let zs = float_column(&batch, "element_z")?;
        let rates = float_column(&batch, "sampling_rate")?;
        let starts = optional_float_column(&batch, "start_time")?;
        let samples = list_column(&batch, "samples")?;

        for (name, column) in [
            ("element_x", xs),
            ("element_y", ys),
            ("element_z", zs),
            ("sampling_rate", rates),
        ] {
            reject_nulls(name, column)?;
        }
        if let Some(starts) = starts {
            reject_nulls("start_time", starts)?;
        }
        reject_nulls("samples", samples)?;

        for row in 0..batch.num_rows() {
            elements.push(Point3::new(xs.value(row), ys.value(row), zs.value(row)));
            same_for_all_channels("sampling_rate", &mut sampling_rate, rates.value(row))?;
            if let Some(starts) = starts {
                same_for_all_channels("start_time", &mut start_time, starts.value(row))?;
            }

            let channel = samples.value(row);
            let channel = channel
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| {
                    PersistenceError::Schema("samples must be a list of Float64".into())
                })?;
            if channel.null_count() > 0 {
                return Err(PersistenceError::Schema(format!(
                    "channel {} has {} missing samples",
                    elements.len() - 1,
                    channel.null_count()
                )));
            }
            channels.push(channel.values().to_vec());
        }
    }

    let sampling_rate = sampling_rate
        .ok_or_else(|| PersistenceError::Schema("file contains no channels".into()))?;
    let channel_data = ChannelData::from_channels(channels, sampling_rate)?
        .with_start_time(start_time.unwrap_or(0.0));

    Ok(ChannelFile {
        channel_data,
        elements,
    })
}

/// Records `value` for the first channel and checks that later channels agree.
fn same_for_all_channels(
    name: &str,
    first: &mut Option<f64>,
    value: f64,
) -> Result<(), PersistenceError> {
    match *first {
        None => {
            *first = Some(value);
            Ok(())
        }
        Some(expected) if expected != value => Err(PersistenceError::Schema(format!(
            "{} differs between channels: {} vs {}",
            name, expected, value
        ))),
        Some(_) => Ok(()),
    }
}

fn reject_nulls(name: &str, column: &dyn Array) -> Result<(), PersistenceError> {
    if column.null_count() > 0 {
        return Err(PersistenceError::Schema(format!(
            "column '{}' has {} missing values",
            name,
            column.null_count()
        )));
    }
    Ok(())
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, PersistenceError> {
    optional_float_column(batch, name)?
        .ok_or_else(|| PersistenceError::Schema(format!("missing column '{}'", name)))
}

fn optional_float_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<Option<&'a Float64Array>, PersistenceError> {
    match batch.column_by_name(name) {
        None => Ok(None),
        Some(column) => column
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(Some)
            .ok_or_else(|| PersistenceError::Schema(format!("column '{}' must be Float64", name))),
    }
}

fn list_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ListArray, PersistenceError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PersistenceError::Schema(format!("missing column '{}'", name)))?
        .as_any()
        .downcast_ref::<ListArray>()
        .ok_or_else(|| PersistenceError::Schema(format!("column '{}' must be a list", name)))
}

// ---------- Images ----------

/// Column buffers for one batch of image pixels
#[derive(Default)]
struct PixelColumns {
    depth_index: Vec<u32>,
    lateral_index: Vec<u32>,
    elevation_index: Vec<u32>,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    value: Vec<f64>,
    value_im: Vec<f64>,
}

impl PixelColumns {
    fn len(&self) -> usize {
        self.value.len()
    }

    fn into_arrays(self, complex: bool) -> Vec<ArrayRef> {
        let mut arrays: Vec<ArrayRef> = vec![
            Arc::new(UInt32Array::from(self.depth_index)),
            Arc::new(UInt32Array::from(self.lateral_index)),
            Arc::new(UInt32Array::from(self.elevation_index)),
            Arc::new(Float64Array::from(self.x)),
            Arc::new(Float64Array::from(self.y)),
            Arc::new(Float64Array::from(self.z)),
            Arc::new(Float64Array::from(self.value)),
        ];
        if complex {
            arrays.push(Arc::new(Float64Array::from(self.value_im)));
        }
        arrays
    }
}

/// A batch writer to write reconstructed images to a Parquet file in long format.
pub struct ImageBatchWriter {
    writer: Option<ArrowWriter<File>>,
    schema: Arc<Schema>,
    complex: bool,
    rows_written: u64,
}

impl ImageBatchWriter {
    pub fn new(file_path: PathBuf, complex: bool) -> Result<Self, PersistenceError> {
        let schema = Arc::new(create_image_schema(complex));
        let writer = new_arrow_writer(&file_path, schema.clone())?;
        Ok(Self {
            writer: Some(writer),
            schema,
            complex,
            rows_written: 0,
        })
    }

    /// Write a record batch
    fn write(&mut self, columns: PixelColumns) -> Result<(), PersistenceError> {
        let rows = columns.len() as u64;
        let batch = RecordBatch::try_new(self.schema.clone(), columns.into_arrays(self.complex))?;
        if let Some(writer) = &mut self.writer {
            writer.write(&batch)?;
            self.rows_written += rows;
            Ok(())
        } else {
            Err(PersistenceError::Schema("Writer has been finalized".into()))
        }
    }

    /// Add all pixels of an image, split into batches of at most
    /// [`PIXELS_PER_BATCH`] rows.
    pub fn add_image<A: Accumulate>(
        &mut self,
        image: &ReconstructedImage<A>,
    ) -> Result<(), PersistenceError> {
        if A::IS_COMPLEX != self.complex {
            return Err(PersistenceError::Schema(format!(
                "image is {}, file expects {} values",
                if A::IS_COMPLEX { "complex" } else { "real" },
                if self.complex { "complex" } else { "real" }
            )));
        }

        let grid = image.grid();
        let mut columns = PixelColumns::default();
        for (coord, value) in image.pixels() {
            let position = grid.position_unchecked(coord);
            columns.depth_index.push(coord.z as u32);
            columns.lateral_index.push(coord.x as u32);
            columns.elevation_index.push(coord.y as u32);
            columns.x.push(position.x);
            columns.y.push(position.y);
            columns.z.push(position.z);
            columns.value.push(value.re());
            if self.complex {
                columns.value_im.push(value.im());
            }

            if columns.len() == PIXELS_PER_BATCH {
                self.write(std::mem::take(&mut columns))?;
            }
        }
        if !columns.value.is_empty() {
            self.write(columns)?;
        }
        Ok(())
    }

    /// Finalize the writer by taking ownership and closing it.
    ///
    /// Returns the number of rows written.
    pub fn finalize(&mut self) -> Result<u64, PersistenceError> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| PersistenceError::Schema("Writer already finalized".into()))?;
        writer.close()?;
        log::debug!("Finalized image file with {} rows", self.rows_written);
        Ok(self.rows_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dasbeam-parquet-{}-{}.parquet", std::process::id(), name))
    }

    fn samples_column(channels: &[Vec<Option<f64>>]) -> ArrayRef {
        let mut builder = ListBuilder::new(Float64Builder::new());
        for channel in channels {
            for &sample in channel {
                builder.values().append_option(sample);
            }
            builder.append(true);
        }
        Arc::new(builder.finish())
    }

    fn floats(values: &[f64]) -> ArrayRef {
        Arc::new(Float64Array::from(values.to_vec()))
    }

    /// Writes a two-channel file with the given per-row columns and reads it back.
    fn write_and_read(
        name: &str,
        mut columns: Vec<(&str, ArrayRef)>,
    ) -> Result<ChannelFile, PersistenceError> {
        let path = temp_path(name);
        columns.extend([
            ("element_x", floats(&[-0.5e-3, 0.5e-3])),
            ("element_y", floats(&[0.0, 0.0])),
            ("element_z", floats(&[0.0, 0.0])),
        ]);
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let mut writer = new_arrow_writer(&path, batch.schema()).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let result = read_channel_file(&path);
        std::fs::remove_file(&path).unwrap();
        result
    }

    fn two_channels() -> ArrayRef {
        samples_column(&[
            vec![Some(1.0), Some(2.0), Some(3.0)],
            vec![Some(4.0), Some(5.0), Some(6.0)],
        ])
    }

    #[test]
    fn test_start_time_column_is_optional() {
        let file = write_and_read(
            "no-start-time",
            vec![
                ("sampling_rate", floats(&[20e6, 20e6])),
                ("samples", two_channels()),
            ],
        )
        .unwrap();
        assert_eq!(file.channel_data.start_time(), 0.0);
        assert_eq!(file.channel_data.sampling_rate(), 20e6);
        assert_eq!(file.channel_data.channel(1)[2], 6.0);
        assert_eq!(file.elements.len(), 2);
    }

    #[test]
    fn test_sampling_rate_must_agree() {
        let result = write_and_read(
            "rate-mismatch",
            vec![
                ("sampling_rate", floats(&[20e6, 40e6])),
                ("samples", two_channels()),
            ],
        );
        assert!(matches!(result, Err(PersistenceError::Schema(_))));
    }

    #[test]
    fn test_start_time_must_agree() {
        let result = write_and_read(
            "start-mismatch",
            vec![
                ("sampling_rate", floats(&[20e6, 20e6])),
                ("start_time", floats(&[0.0, 1e-6])),
                ("samples", two_channels()),
            ],
        );
        assert!(matches!(result, Err(PersistenceError::Schema(_))));

        let file = write_and_read(
            "start-agree",
            vec![
                ("sampling_rate", floats(&[20e6, 20e6])),
                ("start_time", floats(&[1e-6, 1e-6])),
                ("samples", two_channels()),
            ],
        )
        .unwrap();
        assert_eq!(file.channel_data.start_time(), 1e-6);
    }

    #[test]
    fn test_missing_samples_are_rejected() {
        let result = write_and_read(
            "null-sample",
            vec![
                ("sampling_rate", floats(&[20e6, 20e6])),
                (
                    "samples",
                    samples_column(&[
                        vec![Some(1.0), None, Some(3.0)],
                        vec![Some(4.0), Some(5.0), Some(6.0)],
                    ]),
                ),
            ],
        );
        assert!(matches!(result, Err(PersistenceError::Schema(_))));
    }

    #[test]
    fn test_missing_sampling_rate_is_rejected() {
        let rates: ArrayRef = Arc::new(Float64Array::from(vec![Some(20e6), None]));
        let result = write_and_read(
            "null-rate",
            vec![("sampling_rate", rates), ("samples", two_channels())],
        );
        assert!(matches!(result, Err(PersistenceError::Schema(_))));
    }
}
