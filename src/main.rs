//! A CLI tool for decoding a DICOM series or multi-frame file into a volume
//! and reporting its geometry.
use std::path::PathBuf;

use clap::Parser;
use dicom_volume_reader::{DecodeOptions, DicomFileSource, VolumeLoader};
use tracing::{Level, error, warn};

/// Decode DICOM files into one volume
#[derive(Debug, Parser)]
struct App {
    /// DICOM files in stacking order, or one directory of .dcm files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Write the middle slice to this 8-bit image file
    #[arg(short = 'o', long = "out")]
    output: Option<PathBuf>,

    /// Row 0 of each slice is the bottom of the image; do not flip
    #[arg(long = "lower-left")]
    lower_left: bool,

    /// Spacing between the slices of a series
    #[arg(short = 'z', long = "z-spacing")]
    z_spacing: Option<f64>,

    /// Decode the slices one after the other
    #[arg(long = "sequential")]
    sequential: bool,

    /// Print more information about the volume
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let App {
        files,
        output,
        lower_left,
        z_spacing,
        sequential,
        verbose,
    } = App::parse();

    if let Err(e) = tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    ) {
        eprintln!("[ERROR] Could not set up global logging subscriber: {e}");
    }

    let mut options = DecodeOptions::new()
        .with_file_lower_left(lower_left)
        .with_parallel(!sequential);
    if let Some(z_spacing) = z_spacing {
        options = options.with_z_spacing(z_spacing);
    }

    let result = match files.as_slice() {
        [dir] if dir.is_dir() => VolumeLoader::load_from_directory(dir, &options),
        _ => VolumeLoader::load_from_file_paths(&files, &options),
    };
    let outcome = result.unwrap_or_else(|e| {
        error!("{e}");
        std::process::exit(-1);
    });

    let volume = &outcome.volume;
    let geometry = volume.geometry();
    let (depth, height, width) = volume.dim();
    println!(
        "{width}x{height}x{depth} volume, {} x{}",
        volume.scalar_type(),
        volume.samples_per_pixel()
    );
    println!("Spacing: {:?}", geometry.spacing);
    println!("Origin: {:?}", geometry.origin);
    println!(
        "Direction: row {:?}, column {:?}, normal {:?}",
        geometry.row_direction(),
        geometry.column_direction(),
        geometry.slice_normal()
    );
    if verbose {
        println!("Image position: {:?}", geometry.image_position);
        println!("Image orientation: {:?}", geometry.image_orientation);
        println!("Image format: {:?}", volume.image_format());
        println!("Shift/scale: {} / {}", volume.shift(), volume.scale());
        println!("Lossy: {}", volume.is_lossy());
    }
    for failure in &outcome.failures {
        warn!("{failure}");
    }

    let Some(output) = output else {
        return;
    };

    let first = match files.as_slice() {
        [dir] if dir.is_dir() => None,
        _ => files.first().map(DicomFileSource::new),
    };
    let window = first
        .and_then(|source| source.read_properties().ok())
        .and_then(|properties| properties.default_window());

    let image = volume
        .slice_to_image(depth / 2, window)
        .unwrap_or_else(|| {
            error!("Could not render slice {} as an image", depth / 2);
            std::process::exit(-2);
        });

    image.save(&output).unwrap_or_else(|e| {
        error!("{e}");
        std::process::exit(-3);
    });

    if verbose {
        println!("Image saved to {}", output.display());
    }
}
