//! Receive apodization windows.
//!
//! Windows are evaluated at an element's normalized position `u` within the current
//! aperture, `u = 0` being the aperture centre and `|u| = 0.5` its edges. All windows
//! are symmetric except [`Apodization::Custom`], which is sampled as given.

use std::f64::consts::PI;

use crate::aperture::ActiveAperture;
use crate::errors::ConfigurationError;

/// Apodization window applied across the active aperture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Apodization {
    /// Uniform weighting
    Rectangular,
    /// Raised cosine, zero at the aperture edges
    #[default]
    Hann,
    /// Raised cosine on a pedestal of 0.08
    Hamming,
    /// Flat top over `1 - alpha` of the aperture with cosine tapers at both edges
    Tukey { alpha: f64 },
    /// Weight table spanning the aperture from edge to edge, linearly interpolated
    Custom(Vec<f64>),
}

impl Apodization {
    /// Checks the window parameters.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Apodization::Tukey { alpha } if !(0.0..=1.0).contains(alpha) => {
                Err(ConfigurationError::InvalidApodization(format!(
                    "Tukey alpha must be within [0, 1], got {}",
                    alpha
                )))
            }
            Apodization::Custom(table) if table.is_empty() => Err(
                ConfigurationError::InvalidApodization("custom weight table is empty".into()),
            ),
            Apodization::Custom(table) if table.iter().any(|w| !(0.0..=1.0).contains(w)) => {
                Err(ConfigurationError::InvalidApodization(
                    "custom weights must be within [0, 1]".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Window value at normalized aperture position `u`; 0 outside of `[-0.5, 0.5]`.
    pub fn weight(&self, u: f64) -> f64 {
        if !(-0.5..=0.5).contains(&u) {
            return 0.0;
        }
        match self {
            Apodization::Rectangular => 1.0,
            Apodization::Hann => 0.5 * (1.0 + (2.0 * PI * u).cos()),
            Apodization::Hamming => 0.54 + 0.46 * (2.0 * PI * u).cos(),
            Apodization::Tukey { alpha } => tukey(u, *alpha),
            Apodization::Custom(table) => sample_table(table, u),
        }
    }

    /// Weights of all elements of `aperture`, in aperture order.
    ///
    /// A single-element aperture always gets weight 1. If the window is zero for
    /// every element (e.g. Hann with all elements on the aperture edges), the element
    /// closest to the aperture centre gets weight 1 so the pixel is still lit.
    pub fn weights(&self, aperture: &ActiveAperture) -> Vec<f64> {
        let mut weights = vec![1.0; aperture.len()];
        self.fill(aperture.positions(), &mut weights);
        weights
    }

    /// Writes the window weights into `aperture`, see [`Self::weights`].
    pub fn apply(&self, aperture: &mut ActiveAperture) {
        if matches!(self, Apodization::Rectangular) {
            // weights are already 1 after selection
            return;
        }
        let (positions, weights) = aperture.positions_and_weights_mut();
        self.fill(positions, weights);
    }

    fn fill(&self, positions: &[f64], weights: &mut [f64]) {
        if positions.len() == 1 {
            weights[0] = 1.0;
            return;
        }
        for (w, &u) in weights.iter_mut().zip(positions) {
            *w = self.weight(u);
        }
        if weights.iter().all(|&w| w == 0.0) {
            if let Some(center) = closest_to_center(positions) {
                weights[center] = 1.0;
            }
        }
    }
}

/// Index of the position with the smallest `|u|`; the first one wins ties.
fn closest_to_center(positions: &[f64]) -> Option<usize> {
    positions
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &u)| match best {
            Some((_, best_u)) if best_u <= u.abs() => best,
            _ => Some((i, u.abs())),
        })
        .map(|(i, _)| i)
}

fn tukey(u: f64, alpha: f64) -> f64 {
    let r = 2.0 * u.abs();
    if alpha <= 0.0 || r <= 1.0 - alpha {
        1.0
    } else {
        0.5 * (1.0 + (PI * (r - 1.0 + alpha) / alpha).cos())
    }
}

fn sample_table(table: &[f64], u: f64) -> f64 {
    match table {
        [] => 0.0,
        [w] => *w,
        _ => {
            let t = (u + 0.5) * (table.len() - 1) as f64;
            let i = (t.floor() as usize).min(table.len() - 2);
            let frac = t - i as f64;
            table[i] * (1.0 - frac) + table[i + 1] * frac
        }
    }
}

impl std::str::FromStr for Apodization {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rectangular" | "rect" | "boxcar" => Ok(Apodization::Rectangular),
            "hann" | "hanning" => Ok(Apodization::Hann),
            "hamming" => Ok(Apodization::Hamming),
            "tukey" => Ok(Apodization::Tukey { alpha: 0.5 }),
            _ => Err(ConfigurationError::InvalidApodization(format!(
                "unknown window: {}",
                s
            ))),
        }
    }
}
