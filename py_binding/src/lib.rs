use dasbeam_lib::{
    reconstruct, Apodization, ChannelData, Geometry, Interpolation, PixelGrid, Point3,
    ReconstructionConfig, DEFAULT_SOUND_SPEED,
};
use ndarray::ArrayView2;
use numpy::{IntoPyArray, PyArrayDyn, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<PyValueError, _>(e.to_string())
}

/// Element positions from an `(n, 1..=3)` array of x, y, z columns in metres.
///
/// Missing columns are 0.
fn to_points(positions: ArrayView2<'_, f64>) -> PyResult<Vec<Point3>> {
    if !(1..=3).contains(&positions.ncols()) {
        return Err(value_error(format!(
            "element_positions must have 1 to 3 columns (x, y, z), got {}",
            positions.ncols()
        )));
    }
    Ok(positions
        .outer_iter()
        .map(|row| {
            let column = |i: usize| row.get(i).copied().unwrap_or(0.0);
            Point3::new(column(0), column(1), column(2))
        })
        .collect())
}

/// Delay-and-sum beamformer
///
/// Holds the array geometry and reconstruction settings so that many frames
/// recorded with the same array can be reconstructed without repeating the setup.
/// The image has one lateral column under every distinct element position.
#[pyclass]
pub struct DasBeamformer {
    geometry: Geometry,
    config: ReconstructionConfig,
}

#[pymethods]
impl DasBeamformer {
    /// Create a new beamformer
    ///
    /// # Arguments
    /// * `element_positions` - `(num_elements, 3)` array of element x, y, z in metres
    /// * `f_number` - Receive f-number
    /// * `num_px_z` - Number of pixels along the depth axis
    /// * `imaging_depth` - Depth of the image in metres
    /// * `sound_speed` - Speed of sound in m/s
    /// * `apodization` - Receive window name, e.g. "hann" or "rectangular"
    /// * `interpolation` - "linear" or "cubic"
    /// * `num_threads` - Worker threads, defaults to the available parallelism
    #[new]
    #[pyo3(signature = (element_positions, f_number, num_px_z, imaging_depth, sound_speed=DEFAULT_SOUND_SPEED, apodization="hann", interpolation="linear", num_threads=None))]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        element_positions: PyReadonlyArray2<'_, f64>,
        f_number: f64,
        num_px_z: usize,
        imaging_depth: f64,
        sound_speed: f64,
        apodization: &str,
        interpolation: &str,
        num_threads: Option<usize>,
    ) -> PyResult<Self> {
        let apodization: Apodization = apodization.parse().map_err(value_error)?;
        let interpolation: Interpolation = interpolation.parse().map_err(value_error)?;

        let mut config = ReconstructionConfig::new(f_number, num_px_z, imaging_depth)
            .map_err(value_error)?
            .with_sound_speed(sound_speed)
            .with_apodization(apodization)
            .with_interpolation(interpolation);
        if let Some(num_threads) = num_threads {
            config = config.with_num_threads(num_threads);
        }
        config.validate().map_err(value_error)?;

        let elements = to_points(element_positions.as_array())?;
        let grid = PixelGrid::under_elements(&config, &elements).map_err(value_error)?;
        let geometry = Geometry::new(elements, grid).map_err(value_error)?;

        Ok(DasBeamformer { geometry, config })
    }

    /// Reconstructs one frame
    ///
    /// The GIL is released while the image is computed.
    ///
    /// # Arguments
    /// * `channel_data` - `(num_elements, num_samples)` array of recorded samples
    /// * `sampling_rate` - Sampling rate in Hz
    /// * `start_time` - Time of the first sample relative to the emission in seconds
    #[pyo3(signature = (channel_data, sampling_rate, start_time=0.0))]
    pub fn reconstruct<'py>(
        &self,
        py: Python<'py>,
        channel_data: PyReadonlyArray2<'py, f64>,
        sampling_rate: f64,
        start_time: f64,
    ) -> PyResult<Bound<'py, PyArrayDyn<f64>>> {
        let channel_data = ChannelData::new(channel_data.as_array().to_owned(), sampling_rate)
            .map_err(value_error)?
            .with_start_time(start_time);

        let image = py
            .allow_threads(|| reconstruct(&channel_data, &self.geometry, &self.config))
            .map_err(value_error)?;
        Ok(image.into_data().into_pyarray(py))
    }

    /// Shape of the reconstructed images, `(z, x)` or `(z, x, y)`
    #[getter]
    pub fn shape(&self) -> Vec<usize> {
        self.geometry.grid().shape()
    }

    /// Depth of every pixel row in metres
    #[getter]
    pub fn depths(&self) -> Vec<f64> {
        let grid = self.geometry.grid();
        (0..grid.num_px_z()).map(|z| grid.depth(z)).collect()
    }

    /// Lateral position of every pixel column in metres
    #[getter]
    pub fn lateral_positions(&self) -> Vec<f64> {
        self.geometry.grid().lateral_coordinates().to_vec()
    }
}

#[pymodule]
fn dasbeam<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    /**
     * Delay-and-sum reconstruction of a single frame.
     *
     * Returns a `(num_px_z, num_px_x)` array, or `(num_px_z, num_px_x, num_px_y)`
     * for matrix arrays.
     *
     * # Parameters
     * * `channel_data` - `(num_elements, num_samples)` array of recorded samples
     * * `element_positions` - `(num_elements, 3)` array of element x, y, z in metres
     * * `sampling_rate` - Sampling rate in Hz
     * * `f_number` - Receive f-number
     * * `num_px_z` - Number of pixels along the depth axis
     * * `imaging_depth` - Depth of the image in metres
     */
    #[allow(clippy::too_many_arguments)]
    #[pyfn(m)]
    #[pyo3(signature = (channel_data, element_positions, sampling_rate, f_number, num_px_z, imaging_depth, sound_speed=DEFAULT_SOUND_SPEED, apodization="hann"))]
    fn beamform<'py>(
        py: Python<'py>,
        channel_data: PyReadonlyArray2<'py, f64>,
        element_positions: PyReadonlyArray2<'py, f64>,
        sampling_rate: f64,
        f_number: f64,
        num_px_z: usize,
        imaging_depth: f64,
        sound_speed: f64,
        apodization: &str,
    ) -> PyResult<Bound<'py, PyArrayDyn<f64>>> {
        let beamformer = DasBeamformer::new(
            element_positions,
            f_number,
            num_px_z,
            imaging_depth,
            sound_speed,
            apodization,
            "linear",
            None,
        )?;
        beamformer.reconstruct(py, channel_data, sampling_rate, 0.0)
    }

    m.add_class::<DasBeamformer>()?;
    m.add("DEFAULT_SOUND_SPEED", DEFAULT_SOUND_SPEED)?;
    Ok(())
}
