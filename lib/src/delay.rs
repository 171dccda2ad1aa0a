//! Time-of-flight delays between pixels and array elements.

use crate::errors::BeamformError;
use crate::geometry::Point3;

/// Which acoustic path a pixel delay accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DelayModel {
    /// Receive path only: pixel to element.
    #[default]
    ReceiveOnly,
    /// Transmit path from `transmit_origin` to the pixel, plus the receive path.
    RoundTrip { transmit_origin: Point3 },
}

/// Converts pixel/element geometry into fractional sample indices.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayCalculator {
    slowness: f64,
    sampling_rate: f64,
    start_time: f64,
    model: DelayModel,
}

impl DelayCalculator {
    /// # Arguments
    /// * `sound_speed` - Speed of sound [m/s], must be positive
    /// * `sampling_rate` - Sampling rate of the channel data [Hz], must be positive
    /// * `start_time` - Time of the first recorded sample [s], must be finite
    /// * `model` - One-way or round-trip delays
    pub fn new(
        sound_speed: f64,
        sampling_rate: f64,
        start_time: f64,
        model: DelayModel,
    ) -> Result<Self, BeamformError> {
        if !(sound_speed.is_finite() && sound_speed > 0.0) {
            return Err(BeamformError::Domain {
                quantity: "Sound speed",
                value: sound_speed,
            });
        }
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(BeamformError::Domain {
                quantity: "Sampling rate",
                value: sampling_rate,
            });
        }

        if !start_time.is_finite() {
            return Err(BeamformError::Domain {
                quantity: "Start time",
                value: start_time,
            });
        }

        Ok(Self {
            slowness: sound_speed.recip(),
            sampling_rate,
            start_time,
            model,
        })
    }

    /// Time of flight [s] for the acoustic path to `element` through `pixel`.
    pub fn time_of_flight(&self, pixel: &Point3, element: &Point3) -> f64 {
        self.for_pixel(*pixel).time_of_flight(element)
    }

    /// Converts a time of flight into an index into the channel time series.
    #[inline]
    pub fn to_fractional_index(&self, seconds: f64) -> f64 {
        (seconds - self.start_time) * self.sampling_rate
    }

    /// Delays for a single pixel, with the transmit leg computed once.
    #[inline]
    pub fn for_pixel(&self, pixel: Point3) -> PixelDelays<'_> {
        let transmit_seconds = match self.model {
            DelayModel::ReceiveOnly => 0.0,
            DelayModel::RoundTrip { transmit_origin } => {
                pixel.distance(&transmit_origin) * self.slowness
            }
        };
        PixelDelays {
            calculator: self,
            pixel,
            transmit_seconds,
        }
    }
}

/// Per-pixel view of a [`DelayCalculator`].
#[derive(Debug, Clone, Copy)]
pub struct PixelDelays<'a> {
    calculator: &'a DelayCalculator,
    pixel: Point3,
    transmit_seconds: f64,
}

impl PixelDelays<'_> {
    #[inline]
    pub fn time_of_flight(&self, element: &Point3) -> f64 {
        self.transmit_seconds + self.pixel.distance(element) * self.calculator.slowness
    }

    #[inline]
    pub fn fractional_index(&self, element: &Point3) -> f64 {
        self.calculator
            .to_fractional_index(self.time_of_flight(element))
    }
}
