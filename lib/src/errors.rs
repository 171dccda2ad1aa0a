//! Error types used by this lib.
use thiserror::Error;

use crate::geometry::PixelCoord;

/// Invalid reconstruction parameters, detected before any pixel is computed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("f-number must be positive and finite, got {0}")]
    InvalidFNumber(f64),
    #[error("Number of depth pixels must be at least 1, got {0}")]
    InvalidPixelCount(usize),
    #[error("Imaging depth must be positive and finite, got {0} m")]
    InvalidImagingDepth(f64),
    #[error("Number of worker threads must be at least 1")]
    InvalidThreadCount,
    #[error("Invalid lateral pixel axis: {0}")]
    InvalidLateralAxis(String),
    #[error("Invalid apodization: {0}")]
    InvalidApodization(String),
    #[error("Invalid interpolation: {0}")]
    InvalidInterpolation(String),
    #[error(
        "Pixel grid ({grid_px_z} px over {grid_depth} m) was not built from this configuration \
         ({config_px_z} px over {config_depth} m)"
    )]
    GridMismatch {
        grid_px_z: usize,
        grid_depth: f64,
        config_px_z: usize,
        config_depth: f64,
    },
}

/// Failed queries against the array/pixel geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Element index {index} out of range (array has {num_elements} elements)")]
    ElementIndex { index: usize, num_elements: usize },
    #[error("Pixel coordinate {coord:?} out of range for grid of shape {shape:?}")]
    PixelIndex { coord: PixelCoord, shape: Vec<usize> },
    #[error("Transducer array needs at least one element")]
    NoElements,
    #[error("Element {index} has a non-finite position")]
    NonFinitePosition { index: usize },
}

/// A fractional sample index fell outside of the recorded time window.
///
/// The accumulator recovers from this by zero-filling; it never reaches the caller
/// of a reconstruction.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("Fractional sample index {index} outside of [0, {last}]")]
pub struct OutOfRange {
    pub index: f64,
    pub last: usize,
}

/// Fatal errors of a reconstruction call. No partial image is returned with any of them.
#[derive(Debug, Error)]
pub enum BeamformError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Channel data has {channels} channels but the array has {elements} elements")]
    GeometryMismatch { channels: usize, elements: usize },
    #[error("{quantity} must be positive and finite, got {value}")]
    Domain { quantity: &'static str, value: f64 },
    #[error("Invalid channel data: {0}")]
    InvalidChannelData(String),
    #[error("Reconstruction was cancelled")]
    Cancelled,
    #[error("A reconstruction worker thread panicked")]
    WorkerPanicked,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[cfg(feature = "parquet")]
    #[error("Error in parquet file handling: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[cfg(feature = "parquet")]
    #[error("Error in arrow record handling: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("Unexpected file layout: {0}")]
    Schema(String),
    #[error("Loaded data is not usable for beamforming: {0}")]
    Beamform(#[from] BeamformError),
    #[error("IO error in file persistence: {0}")]
    Io(#[from] std::io::Error),
}
