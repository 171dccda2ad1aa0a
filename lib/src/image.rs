//! Reconstructed image returned by the beamformer.

use ndarray::{Array3, ArrayD, Axis, IxDyn};

use crate::channel_data::Accumulate;
use crate::geometry::{PixelCoord, PixelGrid, Point3};

/// Beamformed pixel values on a [`PixelGrid`].
///
/// The array is shaped `(num_px_z, num_px_x)` for 2D grids and
/// `(num_px_z, num_px_x, num_px_y)` for volumes.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedImage<A> {
    data: ArrayD<A>,
    grid: PixelGrid,
}

impl<A: Accumulate> ReconstructedImage<A> {
    /// Wraps a `(z, x, y)` volume, dropping the elevation axis for 2D grids.
    pub(crate) fn from_volume(volume: Array3<A>, grid: PixelGrid) -> Self {
        let data = if grid.is_volume() {
            volume.into_dyn()
        } else {
            volume.index_axis_move(Axis(2), 0).into_dyn()
        };
        Self { data, grid }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn data(&self) -> &ArrayD<A> {
        &self.data
    }

    /// Hands the pixel array over to the caller.
    pub fn into_data(self) -> ArrayD<A> {
        self.data
    }

    pub fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    /// Value at `coord`, `None` outside of the grid.
    pub fn get(&self, coord: PixelCoord) -> Option<A> {
        if !self.grid.contains(coord) {
            return None;
        }
        let value = if self.grid.is_volume() {
            self.data[IxDyn(&[coord.z, coord.x, coord.y])]
        } else {
            self.data[IxDyn(&[coord.z, coord.x])]
        };
        Some(value)
    }

    /// Physical position of the pixel at `coord`.
    pub fn position(&self, coord: PixelCoord) -> Option<Point3> {
        self.grid.position(coord).ok()
    }

    /// Iterates over all pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (PixelCoord, A)> + '_ {
        let volume = self.grid.is_volume();
        self.data.indexed_iter().map(move |(index, &value)| {
            let y = if volume { index[2] } else { 0 };
            (PixelCoord::new(index[0], index[1], y), value)
        })
    }

    /// Coordinate of the pixel with the largest magnitude (first one on ties).
    pub fn peak(&self) -> Option<(PixelCoord, A)> {
        self.pixels().fold(None, |best, (coord, value)| match best {
            Some((_, best_value)) if A::magnitude(best_value) >= value.magnitude() => best,
            _ => Some((coord, value)),
        })
    }
}
