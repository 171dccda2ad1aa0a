use dasbeam_lib::{
    read_channel_data, BeamformError, Beamformer, ChannelFile, Geometry, ImageWriter,
    PersistenceError, PixelGrid, ReconstructionConfig,
};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;

use crate::cli::{BeamformArgs, InfoArgs};

pub fn run_beamform(args: BeamformArgs) -> Result<(), PersistenceError> {
    let BeamformArgs {
        input,
        f_number,
        num_px_z,
        imaging_depth,
        sound_speed,
        apodization,
        interpolation,
        threads,
        output,
        format,
        print,
    } = args;

    // Set up the `cancel` flag for a graceful stop
    let cancel = Arc::new(AtomicBool::new(false));
    let c = Arc::clone(&cancel);

    // Set up CTRL+C handler to stop the reconstruction between depth rows
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Interrupted, stopping reconstruction...");
        c.store(true, Ordering::SeqCst);
    }) {
        log::warn!("Couldn't set Ctrl-C handler. Error: {:?}", e);
    }

    let ChannelFile {
        channel_data,
        elements,
    } = read_channel_data(&input, format)?;

    let mut config = ReconstructionConfig::new(f_number, num_px_z, imaging_depth)
        .map_err(BeamformError::from)?
        .with_sound_speed(sound_speed)
        .with_apodization(apodization)
        .with_interpolation(interpolation);
    if let Some(threads) = threads {
        config = config.with_num_threads(threads);
    }

    // One image column under every element, as the recording's array dictates
    let grid = PixelGrid::under_elements(&config, &elements).map_err(BeamformError::from)?;
    let geometry = Geometry::new(elements, grid).map_err(BeamformError::from)?;
    let beamformer = Beamformer::new(&channel_data, &geometry, &config)?;

    log::info!(
        "Beamforming {:?} pixels with f-number {} over {} m",
        geometry.grid().shape(),
        f_number,
        imaging_depth
    );
    let start = Instant::now();
    let image = beamformer.reconstruct_with_cancel(&cancel)?;
    log::info!("Reconstruction took {:.2?}", start.elapsed());

    if let Some((coord, value)) = image.peak() {
        if let Some(position) = image.position(coord) {
            log::info!(
                "Peak {:.4e} at pixel ({}, {}, {}), x = {:.2} mm, y = {:.2} mm, z = {:.2} mm",
                value,
                coord.z,
                coord.x,
                coord.y,
                position.x * 1e3,
                position.y * 1e3,
                position.z * 1e3
            );
        }
    }

    if print {
        println!("Image {:?}:\n{:.4e}", image.shape(), image.data());
    }

    if let Some(file_path) = output {
        let mut writer = ImageWriter::new(file_path.clone(), format, false)?;
        writer.write(&image)?;
        let rows = writer.finalize()?;
        log::info!("Wrote {} pixels to {}", rows, file_path.display());
    }

    Ok(())
}

pub fn run_info(args: InfoArgs) -> Result<(), PersistenceError> {
    let ChannelFile {
        channel_data,
        elements,
    } = read_channel_data(&args.input, args.format)?;

    let duration = channel_data.num_samples() as f64 / channel_data.sampling_rate();
    let (x_min, x_max) = elements
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(e.x), hi.max(e.x))
        });

    println!("File:            {}", args.input.display());
    println!("Elements:        {}", channel_data.num_elements());
    println!("Samples:         {}", channel_data.num_samples());
    println!("Sampling rate:   {} Hz", channel_data.sampling_rate());
    println!("Start time:      {} s", channel_data.start_time());
    println!("Record length:   {:.3} us", duration * 1e6);
    println!("Array extent x:  {:.2} mm .. {:.2} mm", x_min * 1e3, x_max * 1e3);
    println!(
        "Recorded depth:  {:.2} mm (one-way at {} m/s)",
        (channel_data.start_time() + duration) * args.sound_speed * 1e3,
        args.sound_speed
    );

    Ok(())
}
