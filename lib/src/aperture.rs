//! Dynamic receive aperture selection.
//!
//! The receive aperture of a pixel is `depth / f_number` wide and centred on the
//! pixel's projection onto the array plane. Shallow pixels thus use few elements
//! and deep pixels many, keeping the f-number (and roughly the lateral resolution)
//! constant with depth until the aperture is limited by the physical array.

use crate::geometry::Point3;

/// Aperture width for a pixel at `depth` (0 for pixels on or above the array).
#[inline]
pub fn aperture_width(depth: f64, f_number: f64) -> f64 {
    if depth > 0.0 {
        depth / f_number
    } else {
        0.0
    }
}

/// Elements taking part in the reconstruction of one pixel.
///
/// Besides the element indices this holds each element's normalized position in the
/// aperture (signed lateral offset divided by the aperture width, so within
/// `[-0.5, 0.5]`) and its apodization weight. Weights are not normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveAperture {
    indices: Vec<usize>,
    positions: Vec<f64>,
    weights: Vec<f64>,
    width: f64,
}

impl ActiveAperture {
    /// Empty aperture with room for `num_elements` elements.
    pub fn with_capacity(num_elements: usize) -> Self {
        Self {
            indices: Vec::with_capacity(num_elements),
            positions: Vec::with_capacity(num_elements),
            weights: Vec::with_capacity(num_elements),
            width: 0.0,
        }
    }

    /// Selects the active elements for `pixel`, replacing the previous selection.
    ///
    /// Weights are reset to 1 and are expected to be filled in by an apodization
    /// afterwards.
    ///
    /// Edge cases:
    /// - an aperture wider than the array selects every element;
    /// - a pixel at depth 0 selects the single laterally nearest element;
    /// - an aperture containing no element (narrower than the pitch, or a pixel
    ///   beside the array) also falls back to the single nearest element.
    pub fn select(&mut self, pixel: &Point3, f_number: f64, elements: &[Point3]) {
        self.indices.clear();
        self.positions.clear();
        self.width = aperture_width(pixel.z, f_number);

        if self.width > 0.0 {
            let half_width = self.width / 2.0;
            for (index, element) in elements.iter().enumerate() {
                let offset = signed_lateral_offset(pixel, element);
                if offset.abs() <= half_width {
                    self.indices.push(index);
                    self.positions.push(offset / self.width);
                }
            }
        }

        if self.indices.is_empty() {
            if let Some(index) = nearest_element(pixel, elements) {
                self.indices.push(index);
                self.positions.push(0.0);
            }
        }

        self.weights.clear();
        self.weights.resize(self.indices.len(), 1.0);
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Normalized element positions, aligned with [`Self::indices`]
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Apodization weights, aligned with [`Self::indices`]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub(crate) fn positions_and_weights_mut(&mut self) -> (&[f64], &mut [f64]) {
        (&self.positions, &mut self.weights)
    }

    /// Nominal aperture width [m] (before clamping to the array).
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterator over `(element index, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.weights.iter().copied())
    }
}

/// Active receive aperture of `pixel` for an array made of `elements`.
///
/// Pure function of the geometry and the f-number; no channel data is involved.
pub fn active_elements(pixel: &Point3, f_number: f64, elements: &[Point3]) -> ActiveAperture {
    let mut aperture = ActiveAperture::with_capacity(elements.len());
    aperture.select(pixel, f_number, elements);
    aperture
}

/// Lateral distance between element and pixel, negative for elements at smaller `x`.
#[inline]
fn signed_lateral_offset(pixel: &Point3, element: &Point3) -> f64 {
    let distance = element.lateral_distance(pixel);
    if element.x < pixel.x {
        -distance
    } else {
        distance
    }
}

/// Laterally closest element; the lowest index wins ties.
fn nearest_element(pixel: &Point3, elements: &[Point3]) -> Option<usize> {
    elements
        .iter()
        .enumerate()
        .map(|(index, element)| (index, element.lateral_distance(pixel)))
        .fold(None, |best: Option<(usize, f64)>, (index, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((index, distance)),
        })
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn linear_array() -> Vec<Point3> {
        // 16 elements, 0.3 mm pitch: array spans 4.5 mm
        Geometry::linear_array(16, 0.3e-3)
    }

    #[test]
    fn test_aperture_width() {
        assert_eq!(aperture_width(0.02, 2.0), 0.01);
        assert_eq!(aperture_width(0.0, 2.0), 0.0);
        assert_eq!(aperture_width(-0.001, 2.0), 0.0);
    }

    #[test]
    fn test_width_monotonic_in_depth_and_f_number() {
        let depths: Vec<f64> = (0..50).map(|i| i as f64 * 0.5e-3).collect();
        for f_number in [0.5, 1.0, 1.7, 3.0] {
            for pair in depths.windows(2) {
                assert!(aperture_width(pair[1], f_number) >= aperture_width(pair[0], f_number));
            }
        }

        let elements = linear_array();
        let f_numbers = [0.5, 0.8, 1.0, 1.5, 2.0, 4.0, 8.0];
        for &depth in &depths {
            let pixel = Point3::new(0.0, 0.0, depth);
            let counts: Vec<usize> = f_numbers
                .iter()
                .map(|&f| active_elements(&pixel, f, &elements).len())
                .collect();
            assert!(
                counts.windows(2).all(|c| c[1] <= c[0]),
                "element count should not grow with f-number: {:?}",
                counts
            );
        }

        for &f_number in &f_numbers {
            let counts: Vec<usize> = depths
                .iter()
                .map(|&d| active_elements(&Point3::new(0.0, 0.0, d), f_number, &elements).len())
                .collect();
            assert!(
                counts.windows(2).all(|c| c[1] >= c[0]),
                "element count should not shrink with depth: {:?}",
                counts
            );
        }
    }

    #[test]
    fn test_zero_depth_selects_single_nearest_element() {
        let elements = linear_array();
        let pixel = Point3::new(0.5e-3, 0.0, 0.0);
        let aperture = active_elements(&pixel, 1.0, &elements);
        assert_eq!(aperture.len(), 1);
        // element 9 sits at +0.45 mm
        assert_eq!(aperture.indices(), &[9]);
        assert_eq!(aperture.positions(), &[0.0]);
    }

    #[test]
    fn test_wide_aperture_clamps_to_array() {
        let elements = linear_array();
        let pixel = Point3::new(0.0, 0.0, 0.05);
        let aperture = active_elements(&pixel, 1.0, &elements);
        assert_eq!(aperture.len(), elements.len());
        assert!(aperture.positions().iter().all(|p| p.abs() <= 0.5));
    }

    #[test]
    fn test_aperture_is_centered_on_pixel() {
        let elements = linear_array();
        // 1.5 mm wide aperture under element 3 (x = -1.35 mm) covers elements 1..=5
        let pixel = Point3::new(elements[3].x, 0.0, 1.5e-3);
        let aperture = active_elements(&pixel, 1.0, &elements);
        assert_eq!(aperture.indices(), &[1, 2, 3, 4, 5]);
        assert!((aperture.positions()[0] + 0.4).abs() < 1e-9);
        assert!(aperture.positions()[2].abs() < 1e-12);
        assert!((aperture.positions()[4] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_never_empty_beside_the_array() {
        let elements = linear_array();
        let pixel = Point3::new(0.02, 0.0, 1e-3);
        let aperture = active_elements(&pixel, 1.0, &elements);
        assert_eq!(aperture.indices(), &[15]);
    }

    #[test]
    fn test_select_reuses_buffers() {
        let elements = linear_array();
        let mut aperture = ActiveAperture::with_capacity(elements.len());
        aperture.select(&Point3::new(0.0, 0.0, 0.05), 1.0, &elements);
        assert_eq!(aperture.len(), 16);
        aperture.select(&Point3::new(0.0, 0.0, 0.0), 1.0, &elements);
        assert_eq!(aperture.len(), 1);
        assert_eq!(aperture.weights(), &[1.0]);
    }
}
