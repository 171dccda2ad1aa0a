//! Transducer and imaging grid geometry.
//!
//! Coordinates are in metres. The array face lies in the `z = 0` plane, `x` is the
//! lateral (azimuth) axis, `y` the elevation axis and `z` the depth axis pointing into
//! the medium. Pixel depths therefore double as their distance below the array.

use crate::config::ReconstructionConfig;
use crate::errors::{ConfigurationError, GeometryError};

/// Two element coordinates closer than this are treated as the same grid line.
const COORDINATE_TOLERANCE: f64 = 1e-12;

/// A point in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(&self, other: &Point3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance to `other` projected into the array plane (ignoring depth).
    #[inline]
    pub fn lateral_distance(&self, other: &Point3) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Discrete pixel coordinate: depth index plus lateral (`x`) and elevation (`y`) index.
///
/// For 2D grids the elevation index is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelCoord {
    pub z: usize,
    pub x: usize,
    pub y: usize,
}

impl PixelCoord {
    pub const fn new(z: usize, x: usize, y: usize) -> Self {
        Self { z, x, y }
    }
}

/// Description of one lateral axis of the pixel grid.
#[derive(Debug, Clone, PartialEq)]
pub enum LateralAxis {
    /// Explicit, strictly increasing coordinate list
    Explicit(Vec<f64>),
    /// `count` coordinates starting at `start`, `spacing` apart
    Uniform {
        start: f64,
        spacing: f64,
        count: usize,
    },
}

impl LateralAxis {
    /// Uniform axis of `count` pixels spanning `[-extent / 2, extent / 2]`.
    pub fn centered(extent: f64, count: usize) -> Self {
        let spacing = if count > 1 {
            extent / (count - 1) as f64
        } else {
            1.0
        };
        let start = if count > 1 { -extent / 2.0 } else { 0.0 };
        LateralAxis::Uniform {
            start,
            spacing,
            count,
        }
    }

    fn into_coordinates(self) -> Result<Vec<f64>, ConfigurationError> {
        let coordinates = match self {
            LateralAxis::Explicit(coordinates) => coordinates,
            LateralAxis::Uniform {
                start,
                spacing,
                count,
            } => {
                if !(spacing.is_finite() && spacing > 0.0) {
                    return Err(ConfigurationError::InvalidLateralAxis(format!(
                        "spacing must be positive, got {}",
                        spacing
                    )));
                }
                (0..count).map(|i| start + i as f64 * spacing).collect()
            }
        };

        if coordinates.is_empty() {
            return Err(ConfigurationError::InvalidLateralAxis(
                "axis needs at least one pixel".into(),
            ));
        }
        if coordinates.iter().any(|c| !c.is_finite()) {
            return Err(ConfigurationError::InvalidLateralAxis(
                "coordinates must be finite".into(),
            ));
        }
        if coordinates.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ConfigurationError::InvalidLateralAxis(
                "coordinates must be strictly increasing".into(),
            ));
        }
        Ok(coordinates)
    }
}

/// The imaging grid: depth axis from the reconstruction config plus one or two
/// lateral axes.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    num_px_z: usize,
    imaging_depth: f64,
    x: Vec<f64>,
    y: Option<Vec<f64>>,
}

impl PixelGrid {
    /// Creates a 2D grid (depth x lateral) for `config`.
    pub fn new(config: &ReconstructionConfig, x: LateralAxis) -> Result<Self, ConfigurationError> {
        Ok(Self {
            num_px_z: config.num_px_z(),
            imaging_depth: config.imaging_depth(),
            x: x.into_coordinates()?,
            y: None,
        })
    }

    /// Adds an elevation axis, turning the grid into a 3D volume.
    pub fn with_elevation(mut self, y: LateralAxis) -> Result<Self, ConfigurationError> {
        self.y = Some(y.into_coordinates()?);
        Ok(self)
    }

    /// Grid with one lateral column under every distinct element `x` position.
    ///
    /// If the elements also spread along `y` (a matrix array), one elevation row is
    /// placed under every distinct element `y` position and the grid becomes 3D.
    pub fn under_elements(
        config: &ReconstructionConfig,
        elements: &[Point3],
    ) -> Result<Self, ConfigurationError> {
        let xs = distinct_sorted(elements.iter().map(|e| e.x));
        let ys = distinct_sorted(elements.iter().map(|e| e.y));

        let grid = Self::new(config, LateralAxis::Explicit(xs))?;
        if ys.len() > 1 {
            grid.with_elevation(LateralAxis::Explicit(ys))
        } else {
            Ok(grid)
        }
    }

    pub fn num_px_z(&self) -> usize {
        self.num_px_z
    }

    pub fn num_px_x(&self) -> usize {
        self.x.len()
    }

    /// Number of elevation pixels (1 for 2D grids).
    pub fn num_px_y(&self) -> usize {
        self.y.as_ref().map_or(1, Vec::len)
    }

    pub fn imaging_depth(&self) -> f64 {
        self.imaging_depth
    }

    pub fn is_volume(&self) -> bool {
        self.y.is_some()
    }

    /// Depth spacing between two pixel rows.
    pub fn depth_spacing(&self) -> f64 {
        self.imaging_depth / self.num_px_z as f64
    }

    /// Depth of pixel row `z`.
    #[inline]
    pub fn depth(&self, z: usize) -> f64 {
        z as f64 * self.depth_spacing()
    }

    pub fn lateral_coordinates(&self) -> &[f64] {
        &self.x
    }

    pub fn elevation_coordinates(&self) -> Option<&[f64]> {
        self.y.as_deref()
    }

    /// Shape of the image produced on this grid: `[z, x]` or `[z, x, y]`.
    pub fn shape(&self) -> Vec<usize> {
        match &self.y {
            Some(y) => vec![self.num_px_z, self.x.len(), y.len()],
            None => vec![self.num_px_z, self.x.len()],
        }
    }

    pub fn num_pixels(&self) -> usize {
        self.num_px_z * self.num_px_x() * self.num_px_y()
    }

    pub fn contains(&self, coord: PixelCoord) -> bool {
        coord.z < self.num_px_z && coord.x < self.num_px_x() && coord.y < self.num_px_y()
    }

    /// Position of a pixel known to be inside the grid.
    #[inline]
    pub(crate) fn position_unchecked(&self, coord: PixelCoord) -> Point3 {
        let y = self.y.as_ref().map_or(0.0, |y| y[coord.y]);
        Point3::new(self.x[coord.x], y, self.depth(coord.z))
    }

    /// Position of a pixel, failing if `coord` is outside of the grid.
    pub fn position(&self, coord: PixelCoord) -> Result<Point3, GeometryError> {
        if !self.contains(coord) {
            return Err(GeometryError::PixelIndex {
                coord,
                shape: self.shape(),
            });
        }
        Ok(self.position_unchecked(coord))
    }
}

/// Element positions plus the pixel grid of one reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    elements: Vec<Point3>,
    grid: PixelGrid,
}

impl Geometry {
    pub fn new(elements: Vec<Point3>, grid: PixelGrid) -> Result<Self, GeometryError> {
        if elements.is_empty() {
            return Err(GeometryError::NoElements);
        }
        if let Some(index) = elements.iter().position(|e| !e.is_finite()) {
            return Err(GeometryError::NonFinitePosition { index });
        }
        Ok(Self { elements, grid })
    }

    /// Element positions of a linear array along `x`, centred on the origin.
    ///
    /// `pitch` is the centre-to-centre distance (element width plus kerf).
    pub fn linear_array(num_elements: usize, pitch: f64) -> Vec<Point3> {
        let center = (num_elements as f64 - 1.0) / 2.0;
        (0..num_elements)
            .map(|i| Point3::new((i as f64 - center) * pitch, 0.0, 0.0))
            .collect()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn elements(&self) -> &[Point3] {
        &self.elements
    }

    pub fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    pub fn element_position(&self, index: usize) -> Result<Point3, GeometryError> {
        self.elements
            .get(index)
            .copied()
            .ok_or(GeometryError::ElementIndex {
                index,
                num_elements: self.elements.len(),
            })
    }

    pub fn pixel_position(&self, coord: PixelCoord) -> Result<Point3, GeometryError> {
        self.grid.position(coord)
    }
}

/// Sorted coordinates with near-duplicates collapsed.
fn distinct_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() <= COORDINATE_TOLERANCE);
    values
}
