//! Reconstruction parameters.

use crate::apodization::Apodization;
use crate::delay::DelayModel;
use crate::errors::ConfigurationError;
use crate::interpolation::Interpolation;

/// Default speed of sound in soft tissue [m/s]
pub const DEFAULT_SOUND_SPEED: f64 = 1540.0;

/// Scalar parameters of a delay-and-sum reconstruction.
///
/// The three mandatory parameters are validated on construction; the optional ones
/// come with defaults and are checked again when a reconstruction starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionConfig {
    f_number: f64,
    num_px_z: usize,
    imaging_depth: f64,
    sound_speed: f64,
    apodization: Apodization,
    interpolation: Interpolation,
    delay_model: DelayModel,
    num_threads: Option<usize>,
}

impl ReconstructionConfig {
    /// Create a new configuration.
    ///
    /// # Arguments
    /// * `f_number` - Ratio of pixel depth to receive aperture width (> 0)
    /// * `num_px_z` - Number of pixels along the depth axis (>= 1)
    /// * `imaging_depth` - Depth covered by the image in metres (> 0)
    pub fn new(
        f_number: f64,
        num_px_z: usize,
        imaging_depth: f64,
    ) -> Result<Self, ConfigurationError> {
        let config = Self {
            f_number,
            num_px_z,
            imaging_depth,
            sound_speed: DEFAULT_SOUND_SPEED,
            apodization: Apodization::default(),
            interpolation: Interpolation::default(),
            delay_model: DelayModel::default(),
            num_threads: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Speed of sound in the medium [m/s].
    pub fn with_sound_speed(mut self, sound_speed: f64) -> Self {
        self.sound_speed = sound_speed;
        self
    }

    pub fn with_apodization(mut self, apodization: Apodization) -> Self {
        self.apodization = apodization;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_delay_model(mut self, delay_model: DelayModel) -> Self {
        self.delay_model = delay_model;
        self
    }

    /// Fix the number of worker threads. Defaults to the available parallelism.
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Checks all parameters except the sound speed, which is a domain error
    /// raised by the delay calculator.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.f_number.is_finite() && self.f_number > 0.0) {
            return Err(ConfigurationError::InvalidFNumber(self.f_number));
        }
        if self.num_px_z < 1 {
            return Err(ConfigurationError::InvalidPixelCount(self.num_px_z));
        }
        if !(self.imaging_depth.is_finite() && self.imaging_depth > 0.0) {
            return Err(ConfigurationError::InvalidImagingDepth(self.imaging_depth));
        }
        if self.num_threads == Some(0) {
            return Err(ConfigurationError::InvalidThreadCount);
        }
        self.apodization.validate()
    }

    pub fn f_number(&self) -> f64 {
        self.f_number
    }

    pub fn num_px_z(&self) -> usize {
        self.num_px_z
    }

    pub fn imaging_depth(&self) -> f64 {
        self.imaging_depth
    }

    pub fn sound_speed(&self) -> f64 {
        self.sound_speed
    }

    pub fn apodization(&self) -> &Apodization {
        &self.apodization
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn delay_model(&self) -> DelayModel {
        self.delay_model
    }

    /// Number of worker threads to use for a reconstruction.
    pub fn num_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config_has_defaults() {
        let config = ReconstructionConfig::new(1.5, 256, 0.04).unwrap();
        assert_eq!(config.f_number(), 1.5);
        assert_eq!(config.num_px_z(), 256);
        assert_eq!(config.imaging_depth(), 0.04);
        assert_eq!(config.sound_speed(), DEFAULT_SOUND_SPEED);
        assert_eq!(config.apodization(), &Apodization::Hann);
        assert_eq!(config.interpolation(), Interpolation::Linear);
        assert_eq!(config.delay_model(), DelayModel::ReceiveOnly);
        assert!(config.num_threads() >= 1);
    }

    #[test]
    fn test_invalid_parameters_fail_fast() {
        assert_eq!(
            ReconstructionConfig::new(0.0, 10, 0.01),
            Err(ConfigurationError::InvalidFNumber(0.0))
        );
        assert_eq!(
            ReconstructionConfig::new(-1.0, 10, 0.01),
            Err(ConfigurationError::InvalidFNumber(-1.0))
        );
        assert!(matches!(
            ReconstructionConfig::new(f64::NAN, 10, 0.01),
            Err(ConfigurationError::InvalidFNumber(_))
        ));
        assert_eq!(
            ReconstructionConfig::new(1.0, 0, 0.01),
            Err(ConfigurationError::InvalidPixelCount(0))
        );
        assert_eq!(
            ReconstructionConfig::new(1.0, 10, 0.0),
            Err(ConfigurationError::InvalidImagingDepth(0.0))
        );
        assert!(ReconstructionConfig::new(1.0, 10, f64::INFINITY).is_err());
    }

    #[test]
    fn test_optional_parameters_are_validated() {
        let config = ReconstructionConfig::new(1.0, 10, 0.01)
            .unwrap()
            .with_num_threads(0);
        assert_eq!(config.validate(), Err(ConfigurationError::InvalidThreadCount));

        let config = ReconstructionConfig::new(1.0, 10, 0.01)
            .unwrap()
            .with_apodization(Apodization::Tukey { alpha: 2.0 });
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidApodization(_))
        ));

        let config = ReconstructionConfig::new(1.0, 10, 0.01)
            .unwrap()
            .with_num_threads(3);
        assert_eq!(config.num_threads(), 3);
    }
}
