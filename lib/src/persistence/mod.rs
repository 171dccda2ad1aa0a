use crate::channel_data::{Accumulate, ChannelData};
use crate::errors::PersistenceError;
use crate::geometry::Point3;
use crate::image::ReconstructedImage;
use std::path::{Path, PathBuf};

mod parquet;

/// File formats supported for reading channel data and writing images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Apache Parquet file
    Parquet,
}

/// Channel data recording together with the element positions it was recorded with.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFile {
    pub channel_data: ChannelData<f64>,
    /// Element positions, row `i` of the channel data belongs to element `i`
    pub elements: Vec<Point3>,
}

/// Read a channel data recording from `path`.
///
/// Fails if the file cannot be read, does not follow the expected layout, or holds
/// channel data that can't be beamformed (ragged channels, invalid sampling rate).
pub fn read_channel_data(path: &Path, file_type: FileType) -> Result<ChannelFile, PersistenceError> {
    log::debug!("Reading channel data from {}", path.display());
    let file = match file_type {
        FileType::Parquet => parquet::read_channel_file(path)?,
    };
    log::info!(
        "Read {} channels x {} samples at {} Hz from {}",
        file.channel_data.num_elements(),
        file.channel_data.num_samples(),
        file.channel_data.sampling_rate(),
        path.display()
    );
    Ok(file)
}

/// Write a channel data recording to `path`, overwriting any existing file.
pub fn write_channel_data(
    path: &Path,
    file_type: FileType,
    file: &ChannelFile,
) -> Result<(), PersistenceError> {
    if file.elements.len() != file.channel_data.num_elements() {
        return Err(PersistenceError::Schema(format!(
            "{} element positions for {} channels",
            file.elements.len(),
            file.channel_data.num_elements()
        )));
    }
    match file_type {
        FileType::Parquet => parquet::write_channel_file(path, file),
    }
}

/// A writer for reconstructed images
pub enum ImageWriter {
    Parquet(parquet::ImageBatchWriter),
}

impl ImageWriter {
    /// Create a new image writer.
    ///
    /// # Arguments
    ///
    /// * `file_path` - The file to write to
    /// * `file_type` - Format of the file
    /// * `complex` - Whether the images to write hold complex pixel values
    pub fn new(
        file_path: PathBuf,
        file_type: FileType,
        complex: bool,
    ) -> Result<Self, PersistenceError> {
        let writer = match file_type {
            FileType::Parquet => Self::Parquet(parquet::ImageBatchWriter::new(file_path, complex)?),
        };
        Ok(writer)
    }

    /// Append all pixels of `image` to the file
    pub fn write<A: Accumulate>(
        &mut self,
        image: &ReconstructedImage<A>,
    ) -> Result<(), PersistenceError> {
        match self {
            ImageWriter::Parquet(writer) => writer.add_image(image),
        }
    }

    /// Finalize the file writes, i.e. clear all buffers and make sure
    /// the data is actually written to file.
    ///
    /// Returns the number of pixel rows written.
    pub fn finalize(&mut self) -> Result<u64, PersistenceError> {
        match self {
            ImageWriter::Parquet(writer) => writer.finalize(),
        }
    }
}

impl std::str::FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parquet" => Ok(FileType::Parquet),
            _ => Err(format!("Invalid file type: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconstructionConfig;
    use crate::geometry::{Geometry, PixelGrid};
    use crate::reconstruct::reconstruct;
    use ndarray::array;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dasbeam-{}-{}.parquet", std::process::id(), name))
    }

    #[test]
    fn test_file_type_from_str() {
        assert_eq!("Parquet".parse::<FileType>(), Ok(FileType::Parquet));
        assert!("csv".parse::<FileType>().is_err());
    }

    #[test]
    fn test_channel_file_survives_write_and_read() {
        let path = temp_path("channels");
        let channel_data = ChannelData::new(array![[0.0, 1.0, 0.5], [2.0, -1.0, 0.25]], 20e6)
            .unwrap()
            .with_start_time(1e-6);
        let file = ChannelFile {
            channel_data,
            elements: vec![Point3::new(-0.5e-3, 0.0, 0.0), Point3::new(0.5e-3, 0.0, 0.0)],
        };

        write_channel_data(&path, FileType::Parquet, &file).unwrap();
        let read = read_channel_data(&path, FileType::Parquet).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(read, file);
    }

    #[test]
    fn test_element_count_must_match_channels() {
        let file = ChannelFile {
            channel_data: ChannelData::new(array![[0.0, 1.0]], 1e6).unwrap(),
            elements: vec![Point3::default(); 2],
        };
        let result = write_channel_data(&temp_path("mismatch"), FileType::Parquet, &file);
        assert!(matches!(result, Err(PersistenceError::Schema(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = read_channel_data(&temp_path("does-not-exist"), FileType::Parquet);
        assert!(matches!(result, Err(PersistenceError::Io(_))));
    }

    #[test]
    fn test_image_writer_counts_pixels() {
        let path = temp_path("image");
        let elements = Geometry::linear_array(4, 1e-3);
        let config = ReconstructionConfig::new(1.0, 8, 0.008).unwrap();
        let grid = PixelGrid::under_elements(&config, &elements).unwrap();
        let geometry = Geometry::new(elements, grid).unwrap();
        let channel_data = ChannelData::new(ndarray::Array2::<f64>::ones((4, 64)), 10e6).unwrap();
        let image = reconstruct(&channel_data, &geometry, &config).unwrap();

        let mut writer = ImageWriter::new(path.clone(), FileType::Parquet, false).unwrap();
        writer.write(&image).unwrap();
        let rows = writer.finalize().unwrap();
        assert!(writer.finalize().is_err());
        std::fs::remove_file(&path).unwrap();

        assert_eq!(rows, 8 * 4);
    }

    #[test]
    fn test_image_writer_rejects_mismatched_value_type() {
        let path = temp_path("complex-image");
        let config = ReconstructionConfig::new(1.0, 2, 0.002).unwrap();
        let elements = Geometry::linear_array(2, 1e-3);
        let grid = PixelGrid::under_elements(&config, &elements).unwrap();
        let geometry = Geometry::new(elements, grid).unwrap();
        let channel_data = ChannelData::new(ndarray::Array2::<f64>::ones((2, 16)), 10e6).unwrap();
        let image = reconstruct(&channel_data, &geometry, &config).unwrap();

        let mut writer = ImageWriter::new(path.clone(), FileType::Parquet, true).unwrap();
        assert!(matches!(writer.write(&image), Err(PersistenceError::Schema(_))));
        writer.finalize().unwrap();
        std::fs::remove_file(&path).unwrap();
    }
}
