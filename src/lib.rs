//! # DICOM-volume-reader library
//!
//! This crate decodes a DICOM series, or a single multi-frame DICOM file,
//! into one volume with a single scalar type, a single memory layout and
//! its physical geometry.
//!
//! Slices of a series may disagree on bit depth, signedness and rescale
//! slope/intercept. The reader picks one scalar type able to hold every
//! rescaled slice, decodes each slice into it and stacks the slices in the
//! order given. Planar pixel data is interleaved and the rows of every slice
//! are flipped so that row 0 is the top of the image, unless the caller asks
//! for lower-left addressing. A slice of a series that cannot be read is
//! zero-filled and reported instead of failing the whole volume.
//!
//! If the environment supports it the slices of a series are decoded in
//! parallel using rayon.
//!
//! DICOM files are assumed to have the following attributes:
//!  - Files of a series are given in stacking order (no sorting is done)
//!  - Every file of a series has one frame
//!  - Z spacing of a series comes from the first file or from the caller
//!
//! # Examples
//!
//! ## Reading multiple DICOM files into a volume
//!
//! Read all DICOM files from the dicom/ directory, stacked by file name,
//! then save the slice at the center of the volume.
//!
//! ```no_run
//! # use dicom_volume_reader::{DecodeOptions, VolumeLoader};
//! let outcome = VolumeLoader::load_from_directory("dicom", &DecodeOptions::new())
//!     .expect("should have loaded files from directory");
//! for failure in &outcome.failures {
//!     eprintln!("{failure}");
//! }
//! let volume = outcome.volume;
//! let image = volume
//!     .slice_to_image(volume.dim().0 / 2, None)
//!     .expect("should have returned image at center of volume");
//! image.save("result.png").expect("should have saved image");
//! ```
//!
//! ## Decoding in two steps
//!
//! The geometry and scalar type can be resolved before any pixel data is
//! read, for example to allocate downstream storage.
//!
//! ```no_run
//! # use dicom_volume_reader::{DecodeOptions, DicomFileSource, VolumeLoader};
//! let sources: Vec<_> = ["a.dcm", "b.dcm", "c.dcm"]
//!     .iter()
//!     .map(DicomFileSource::new)
//!     .collect();
//! let options = DecodeOptions::new().with_z_spacing(1.5);
//! let geometry = VolumeLoader::resolve_geometry(&sources, &options)?;
//! println!("{} {:?}", geometry.scalar_type, geometry.dim());
//! let outcome = VolumeLoader::decode_volume(&sources, &geometry, &options, |p| {
//!     println!("{:.0}%", p * 100.0)
//! })?;
//! println!("failed slices: {:?}", outcome.failed_slices());
//! # Ok::<(), dicom_volume_reader::VolumeError>(())
//! ```

pub mod color;
pub mod dicom_source;
pub mod enums;
pub mod error;
pub mod flip;
pub mod geometry;
pub mod metadata;
mod options;
pub mod pixel_format;
pub mod pixel_type;
pub mod slice_decoder;
pub mod source;
pub mod volume;
pub mod volume_loader;

pub use dicom_source::DicomFileSource;
pub use enums::{ImageFormat, PhotometricInterpretation, PlanarConfiguration, ScalarType};
pub use error::{SourceError, VolumeError};
pub use geometry::{GeometryResolver, VolumeGeometry};
pub use metadata::{MedicalImageProperties, WindowPreset};
pub use options::DecodeOptions;
pub use pixel_format::{PixelFormat, RescaleParams};
pub use pixel_type::PixelTypeUnifier;
pub use slice_decoder::SliceDecoder;
pub use source::{Dimensions, InMemorySlice, ParsedSlice, SliceHeader, SliceSource};
pub use volume::{DecodedVolume, VoxelScalar};
pub use volume_loader::{DecodeOutcome, SliceFailure, VolumeLoader};
