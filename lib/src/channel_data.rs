//! Channel data: the per-element time series recorded by the transducer array.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, Sub};

use ndarray::{Array2, ArrayView1};
use num_complex::{Complex32, Complex64};

use crate::errors::BeamformError;

/// Numeric type a pixel value is accumulated in.
///
/// Always at least double precision, so that summing many weighted samples does not
/// introduce a bias from a narrow accumulator.
pub trait Accumulate:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + AddAssign
    + 'static
{
    /// Whether values carry an imaginary part
    const IS_COMPLEX: bool;

    fn zero() -> Self;

    /// Real part
    fn re(self) -> f64;

    /// Imaginary part (0 for real values)
    fn im(self) -> f64;

    /// Absolute value / modulus
    fn magnitude(self) -> f64;
}

impl Accumulate for f64 {
    const IS_COMPLEX: bool = false;

    fn zero() -> Self {
        0.0
    }

    fn re(self) -> f64 {
        self
    }

    fn im(self) -> f64 {
        0.0
    }

    fn magnitude(self) -> f64 {
        self.abs()
    }
}

impl Accumulate for Complex64 {
    const IS_COMPLEX: bool = true;

    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn re(self) -> f64 {
        self.re
    }

    fn im(self) -> f64 {
        self.im
    }

    fn magnitude(self) -> f64 {
        self.norm()
    }
}

/// A recorded sample: real RF data or complex (IQ / analytic) data, single or double
/// precision.
pub trait Sample: Copy + Debug + Send + Sync + 'static {
    /// Type the sample is widened to before interpolation and summation
    type Acc: Accumulate;

    fn widen(self) -> Self::Acc;
}

impl Sample for f32 {
    type Acc = f64;

    #[inline]
    fn widen(self) -> f64 {
        self as f64
    }
}

impl Sample for f64 {
    type Acc = f64;

    #[inline]
    fn widen(self) -> f64 {
        self
    }
}

impl Sample for Complex32 {
    type Acc = Complex64;

    #[inline]
    fn widen(self) -> Complex64 {
        Complex64::new(self.re as f64, self.im as f64)
    }
}

impl Sample for Complex64 {
    type Acc = Complex64;

    #[inline]
    fn widen(self) -> Complex64 {
        self
    }
}

/// Per-element time series of equal length, sampled at a common rate.
///
/// Samples are stored as a `(num_elements, num_samples)` array; row `i` belongs to
/// element `i` of the array geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelData<S> {
    samples: Array2<S>,
    sampling_rate: f64,
    start_time: f64,
}

impl<S: Sample> ChannelData<S> {
    /// Wrap a `(num_elements, num_samples)` array recorded at `sampling_rate` Hz.
    pub fn new(samples: Array2<S>, sampling_rate: f64) -> Result<Self, BeamformError> {
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(BeamformError::Domain {
                quantity: "Sampling rate",
                value: sampling_rate,
            });
        }
        let (num_elements, num_samples) = samples.dim();
        if num_elements == 0 || num_samples == 0 {
            return Err(BeamformError::InvalidChannelData(format!(
                "need at least one element and one sample, got shape ({}, {})",
                num_elements, num_samples
            )));
        }

        Ok(Self {
            samples,
            sampling_rate,
            start_time: 0.0,
        })
    }

    /// Build channel data from one vector per element.
    ///
    /// Fails if the channels differ in length.
    pub fn from_channels(channels: Vec<Vec<S>>, sampling_rate: f64) -> Result<Self, BeamformError> {
        let num_elements = channels.len();
        let num_samples = channels.first().map_or(0, Vec::len);
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != num_samples)
        {
            return Err(BeamformError::InvalidChannelData(format!(
                "channel {} has {} samples, expected {}",
                index,
                channel.len(),
                num_samples
            )));
        }

        let flat: Vec<S> = channels.into_iter().flatten().collect();
        let samples = Array2::from_shape_vec((num_elements, num_samples), flat)
            .map_err(|e| BeamformError::InvalidChannelData(e.to_string()))?;
        Self::new(samples, sampling_rate)
    }

    /// Time [s] of the first sample relative to the emission (default 0).
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn num_elements(&self) -> usize {
        self.samples.nrows()
    }

    pub fn num_samples(&self) -> usize {
        self.samples.ncols()
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Time series of element `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    #[inline]
    pub fn channel(&self, index: usize) -> ArrayView1<'_, S> {
        self.samples.row(index)
    }

    pub fn samples(&self) -> &Array2<S> {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_channels() {
        let data = ChannelData::from_channels(vec![vec![1.0f32, 2.0, 3.0], vec![4.0, 5.0, 6.0]], 1e6)
            .unwrap();
        assert_eq!(data.num_elements(), 2);
        assert_eq!(data.num_samples(), 3);
        assert_eq!(data.channel(1)[2], 6.0);
        assert_eq!(data.start_time(), 0.0);
    }

    #[test]
    fn test_ragged_channels_are_rejected() {
        let result = ChannelData::from_channels(vec![vec![1.0, 2.0], vec![3.0]], 1e6);
        assert!(matches!(result, Err(BeamformError::InvalidChannelData(_))));
    }

    #[test]
    fn test_empty_or_bad_rate_is_rejected() {
        let empty = Array2::<f64>::zeros((0, 10));
        assert!(matches!(
            ChannelData::new(empty, 1e6),
            Err(BeamformError::InvalidChannelData(_))
        ));
        assert!(matches!(
            ChannelData::new(array![[1.0, 2.0]], 0.0),
            Err(BeamformError::Domain { .. })
        ));
    }

    #[test]
    fn test_widening() {
        assert_eq!(0.5f32.widen(), 0.5f64);
        let c = Complex32::new(1.5, -2.0).widen();
        assert_eq!(c, Complex64::new(1.5, -2.0));
        assert_eq!(c.magnitude(), 2.5);
        assert!(<Complex64 as Accumulate>::IS_COMPLEX);
        assert!(!<f64 as Accumulate>::IS_COMPLEX);
    }
}
