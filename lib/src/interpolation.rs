//! Fractional-delay sample interpolation.
//!
//! Samples are fetched at non-integer indices of a channel's time series. Indices
//! outside of `[0, len - 1]` are out of range; the reconstruction treats them as a zero
//! contribution (zero-fill), which avoids artifacts at the image borders.

use ndarray::ArrayView1;

use crate::channel_data::{Accumulate, Sample};
use crate::errors::{ConfigurationError, OutOfRange};

/// Interpolation kernel used to read a channel at a fractional index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Linear interpolation between the two neighbouring samples
    #[default]
    Linear,
    /// Catmull-Rom cubic through the four neighbouring samples
    Cubic,
}

impl Interpolation {
    /// Value of `series` at fractional index `t`, or [`OutOfRange`] if `t` is not
    /// inside the recorded window.
    pub fn try_sample<S: Sample>(
        &self,
        series: ArrayView1<'_, S>,
        t: f64,
    ) -> Result<S::Acc, OutOfRange> {
        let len = series.len();
        let last = len.saturating_sub(1);
        if len == 0 || !t.is_finite() || t < 0.0 || t > last as f64 {
            return Err(OutOfRange { index: t, last });
        }

        let i = t.floor() as usize;
        let frac = t - i as f64;
        if i >= last || frac == 0.0 {
            return Ok(series[i].widen());
        }

        let value = match self {
            Interpolation::Linear => {
                let s0 = series[i].widen();
                let s1 = series[i + 1].widen();
                s0 + (s1 - s0) * frac
            }
            Interpolation::Cubic => {
                let p0 = series[i.saturating_sub(1)].widen();
                let p1 = series[i].widen();
                let p2 = series[i + 1].widen();
                let p3 = series[(i + 2).min(last)].widen();
                catmull_rom(p0, p1, p2, p3, frac)
            }
        };
        Ok(value)
    }

    /// Value of `series` at fractional index `t`, zero if out of range.
    #[inline]
    pub fn sample<S: Sample>(&self, series: ArrayView1<'_, S>, t: f64) -> S::Acc {
        self.try_sample(series, t)
            .unwrap_or_else(|_| <S::Acc as Accumulate>::zero())
    }
}

/// Catmull-Rom spline between `p1` and `p2` at `f` in `[0, 1)`.
#[inline]
fn catmull_rom<A: Accumulate>(p0: A, p1: A, p2: A, p3: A, f: f64) -> A {
    let a = p1 * 2.0;
    let b = p2 - p0;
    let c = p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3;
    let d = (p1 - p2) * 3.0 + p3 - p0;
    (a + (b + (c + d * f) * f) * f) * 0.5
}

impl std::str::FromStr for Interpolation {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(Interpolation::Linear),
            "cubic" => Ok(Interpolation::Cubic),
            _ => Err(ConfigurationError::InvalidInterpolation(format!(
                "unknown interpolation: {}",
                s
            ))),
        }
    }
}
