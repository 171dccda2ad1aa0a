//! Delay-and-sum reconstruction.
//!
//! For every pixel, the active receive aperture is selected, its elements are
//! apodized, each element's channel is read at the pixel's time of flight and the
//! weighted samples are summed into the pixel value.
//!
//! Pixels are independent. Depth rows of the output array are handed out as disjoint
//! mutable views through a work queue to a pool of scoped worker threads, so no
//! locking is needed on the output and the result does not depend on scheduling.

use crossbeam_channel::{bounded, Receiver};
use ndarray::{Array3, ArrayViewMut2};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::aperture::ActiveAperture;
use crate::channel_data::{Accumulate, ChannelData, Sample};
use crate::config::ReconstructionConfig;
use crate::delay::DelayCalculator;
use crate::errors::{BeamformError, ConfigurationError};
use crate::geometry::{Geometry, PixelCoord};
use crate::image::ReconstructedImage;

/// A depth row of the output, tagged with its depth index.
type RowJob<'a, A> = (usize, ArrayViewMut2<'a, A>);

/// Validated inputs of one reconstruction.
///
/// All checks happen in [`Beamformer::new`]; once constructed, a reconstruction can
/// only fail by cancellation.
#[derive(Debug)]
pub struct Beamformer<'a, S> {
    channel_data: &'a ChannelData<S>,
    geometry: &'a Geometry,
    config: &'a ReconstructionConfig,
    delays: DelayCalculator,
}

impl<'a, S: Sample> Beamformer<'a, S> {
    pub fn new(
        channel_data: &'a ChannelData<S>,
        geometry: &'a Geometry,
        config: &'a ReconstructionConfig,
    ) -> Result<Self, BeamformError> {
        config.validate()?;

        let grid = geometry.grid();
        if grid.num_px_z() != config.num_px_z() || grid.imaging_depth() != config.imaging_depth()
        {
            return Err(ConfigurationError::GridMismatch {
                grid_px_z: grid.num_px_z(),
                grid_depth: grid.imaging_depth(),
                config_px_z: config.num_px_z(),
                config_depth: config.imaging_depth(),
            }
            .into());
        }

        if channel_data.num_elements() != geometry.num_elements() {
            return Err(BeamformError::GeometryMismatch {
                channels: channel_data.num_elements(),
                elements: geometry.num_elements(),
            });
        }

        let delays = DelayCalculator::new(
            config.sound_speed(),
            channel_data.sampling_rate(),
            channel_data.start_time(),
            config.delay_model(),
        )?;

        Ok(Self {
            channel_data,
            geometry,
            config,
            delays,
        })
    }

    /// Reconstructs the full image.
    pub fn reconstruct(&self) -> Result<ReconstructedImage<S::Acc>, BeamformError> {
        self.reconstruct_with_cancel(&AtomicBool::new(false))
    }

    /// Reconstructs the full image, checking `cancel` before every depth row.
    ///
    /// Once `cancel` is set, workers stop picking up rows and
    /// [`BeamformError::Cancelled`] is returned; the partially computed image is
    /// discarded.
    pub fn reconstruct_with_cancel(
        &self,
        cancel: &AtomicBool,
    ) -> Result<ReconstructedImage<S::Acc>, BeamformError> {
        let grid = self.geometry.grid();
        let shape = (grid.num_px_z(), grid.num_px_x(), grid.num_px_y());
        let num_workers = self.config.num_threads().min(grid.num_px_z()).max(1);

        log::debug!(
            "Beamforming {} pixels ({:?}) from {} channels x {} samples on {} threads",
            grid.num_pixels(),
            grid.shape(),
            self.channel_data.num_elements(),
            self.channel_data.num_samples(),
            num_workers
        );

        let mut volume = Array3::<S::Acc>::from_elem(shape, <S::Acc as Accumulate>::zero());

        thread::scope(|scope| {
            let (tx, rx) = bounded::<RowJob<'_, S::Acc>>(shape.0);

            let workers: Vec<_> = (0..num_workers)
                .map(|_| {
                    let rx = rx.clone();
                    scope.spawn(move || self.run_worker(rx, cancel))
                })
                .collect();
            drop(rx);

            for job in volume.outer_iter_mut().enumerate() {
                if tx.send(job).is_err() {
                    // every worker has quit early
                    break;
                }
            }
            drop(tx);

            let mut outcome = Ok(());
            for worker in workers {
                match worker.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        if outcome.is_ok() {
                            outcome = Err(e);
                        }
                    }
                    Err(e) => {
                        log::error!("Couldn't join beamforming worker. Error: {:?}", e);
                        outcome = Err(BeamformError::WorkerPanicked);
                    }
                }
            }
            outcome
        })?;

        if cancel.load(Ordering::SeqCst) {
            return Err(BeamformError::Cancelled);
        }

        log::debug!("Beamforming completed");
        Ok(ReconstructedImage::from_volume(volume, grid.clone()))
    }

    /// Beamforms depth rows received from `rx` until the queue is drained.
    fn run_worker(
        &self,
        rx: Receiver<RowJob<'_, S::Acc>>,
        cancel: &AtomicBool,
    ) -> Result<(), BeamformError> {
        let mut aperture = ActiveAperture::with_capacity(self.geometry.num_elements());

        while let Ok((z, mut row)) = rx.recv() {
            if cancel.load(Ordering::Relaxed) {
                log::trace!("Cancellation requested; worker stops before row {}", z);
                return Err(BeamformError::Cancelled);
            }
            for ((x, y), pixel) in row.indexed_iter_mut() {
                *pixel = self.beamform_pixel(PixelCoord::new(z, x, y), &mut aperture);
            }
        }
        Ok(())
    }

    /// Delay-and-sum value of a single pixel.
    ///
    /// `aperture` is a scratch buffer reused across pixels.
    fn beamform_pixel(&self, coord: PixelCoord, aperture: &mut ActiveAperture) -> S::Acc {
        let elements = self.geometry.elements();
        let pixel = self.geometry.grid().position_unchecked(coord);

        aperture.select(&pixel, self.config.f_number(), elements);
        self.config.apodization().apply(aperture);

        let delays = self.delays.for_pixel(pixel);
        let interpolation = self.config.interpolation();

        let mut acc = <S::Acc as Accumulate>::zero();
        for (index, weight) in aperture.iter() {
            if weight == 0.0 {
                continue;
            }
            let t = delays.fractional_index(&elements[index]);
            acc += interpolation.sample(self.channel_data.channel(index), t) * weight;
        }
        acc
    }
}

/// Delay-and-sum reconstruction of `channel_data` on the pixel grid of `geometry`.
///
/// Validates everything up front: configuration errors, a channel/element count
/// mismatch or a non-positive sound speed fail before any pixel is computed.
pub fn reconstruct<S: Sample>(
    channel_data: &ChannelData<S>,
    geometry: &Geometry,
    config: &ReconstructionConfig,
) -> Result<ReconstructedImage<S::Acc>, BeamformError> {
    Beamformer::new(channel_data, geometry, config)?.reconstruct()
}
