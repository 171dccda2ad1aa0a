use dasbeam_lib::{Apodization, FileType, Interpolation, DEFAULT_SOUND_SPEED};
use clap::{Parser, Subcommand};
use simplelog::LevelFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Log level for output (error, warn, info, debug, trace)
    #[arg(global = true, long, default_value = "info")]
    pub loglevel: LevelFilter,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconstruct an image from recorded channel data
    Beamform(BeamformArgs),

    /// Print the dimensions of a channel data file
    Info(InfoArgs),
}

#[derive(Parser)]
pub struct BeamformArgs {
    /// Channel data file with element positions
    #[arg(short, long)]
    pub input: PathBuf,

    /// Receive f-number (imaging depth over aperture width)
    #[arg(long)]
    pub f_number: f64,

    /// Number of pixels along the depth axis
    #[arg(long)]
    pub num_px_z: usize,

    /// Imaging depth in metres
    #[arg(long)]
    pub imaging_depth: f64,

    /// Speed of sound in m/s
    #[arg(long, default_value_t = DEFAULT_SOUND_SPEED)]
    pub sound_speed: f64,

    /// Receive apodization window, e.g., 'hann', 'hamming', 'tukey' or 'rectangular'
    #[arg(long, default_value = "hann")]
    pub apodization: Apodization,

    /// Fractional delay interpolation, 'linear' or 'cubic'
    #[arg(long, default_value = "linear")]
    pub interpolation: Interpolation,

    /// Number of worker threads. Defaults to the available parallelism
    #[arg(long)]
    pub threads: Option<usize>,

    /// Output file for the reconstructed image
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Specify file format of input and output, e.g., 'parquet'
    #[arg(long, default_value = "parquet")]
    pub format: FileType,

    /// Whether to print the reconstructed image
    #[arg(long, default_value = "false")]
    pub print: bool,
}

#[derive(Parser)]
pub struct InfoArgs {
    /// Channel data file with element positions
    #[arg(short, long)]
    pub input: PathBuf,

    /// Specify file format, e.g., 'parquet'
    #[arg(long, default_value = "parquet")]
    pub format: FileType,

    /// Speed of sound in m/s, used to report the recorded depth range
    #[arg(long, default_value_t = DEFAULT_SOUND_SPEED)]
    pub sound_speed: f64,
}
