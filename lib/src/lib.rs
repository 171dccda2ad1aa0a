mod aperture;
mod apodization;
mod channel_data;
mod config;
mod delay;
mod errors;
mod geometry;
mod image;
mod interpolation;
#[cfg(feature = "parquet")]
mod persistence;
mod reconstruct;

// Public re-export
pub use crate::aperture::{active_elements, aperture_width, ActiveAperture};
pub use crate::apodization::Apodization;
pub use crate::channel_data::{Accumulate, ChannelData, Sample};
pub use crate::config::{ReconstructionConfig, DEFAULT_SOUND_SPEED};
pub use crate::delay::{DelayCalculator, DelayModel, PixelDelays};
pub use crate::errors::{
    BeamformError, ConfigurationError, GeometryError, OutOfRange, PersistenceError,
};
pub use crate::geometry::{Geometry, LateralAxis, PixelCoord, PixelGrid, Point3};
pub use crate::image::ReconstructedImage;
pub use crate::interpolation::Interpolation;
pub use crate::reconstruct::{reconstruct, Beamformer};

#[cfg(feature = "parquet")]
pub use crate::persistence::{
    read_channel_data, write_channel_data, ChannelFile, FileType, ImageWriter,
};
