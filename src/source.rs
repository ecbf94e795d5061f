//! Interface to the format parser
//!
//! The volume reader never touches file bytes itself. Each slice of a series
//! is a [`SliceSource`] which can report its [`SliceHeader`] cheaply and hand
//! out its native pixel samples as a [`ParsedSlice`].

use crate::color::RawPalette;
use crate::enums::{PhotometricInterpretation, PlanarConfiguration};
use crate::error::SourceError;
use crate::pixel_format::{PixelFormat, RescaleParams};

/// Image size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub cols: u32,
    pub rows: u32,
    pub frames: u32,
}

impl Dimensions {
    pub fn new(cols: u32, rows: u32, frames: u32) -> Self {
        Self { cols, rows, frames }
    }

    /// Whether the source holds more than one frame
    pub fn is_3d(&self) -> bool {
        self.frames > 1
    }
}

/// Everything the reader needs to know about a slice before decoding it
#[derive(Debug, Clone, PartialEq)]
pub struct SliceHeader {
    pub pixel_format: PixelFormat,
    pub rescale: RescaleParams,
    pub planar_configuration: PlanarConfiguration,
    pub photometric: PhotometricInterpretation,
    pub dimensions: Dimensions,
    /// Column spacing, row spacing and slice spacing
    pub spacing: Option<[f64; 3]>,
    /// Image Position (Patient)
    pub origin: Option<[f64; 3]>,
    /// Row direction followed by column direction
    pub direction_cosines: Option<[f64; 6]>,
    pub is_lossy: bool,
}

impl SliceHeader {
    /// A single-frame MONOCHROME2 header with no geometry
    pub fn new(pixel_format: PixelFormat, dimensions: Dimensions) -> Self {
        Self {
            pixel_format,
            rescale: RescaleParams::IDENTITY,
            planar_configuration: PlanarConfiguration::Interleaved,
            photometric: PhotometricInterpretation::Monochrome2,
            dimensions,
            spacing: None,
            origin: None,
            direction_cosines: None,
            is_lossy: false,
        }
    }

    /// Length in bytes of the native pixel buffer, `None` if the pixel
    /// format is not supported
    pub fn buffer_length(&self) -> Option<usize> {
        let native = self.pixel_format.scalar_type()?;
        let row = native.bytes_per_row(
            self.dimensions.cols as usize,
            usize::from(self.pixel_format.samples_per_pixel),
        )?;
        row.checked_mul(self.dimensions.rows as usize)?
            .checked_mul(self.dimensions.frames.max(1) as usize)
    }
}

/// A parsed slice with its native pixel data
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSlice {
    pub header: SliceHeader,
    pub palette: Option<RawPalette>,
    /// Native samples in host byte order, planar configuration as stored
    pub pixel_data: Vec<u8>,
}

/// One slice of a series, as provided by the format parser
pub trait SliceSource: Sync {
    /// Name used in logs and diagnostics
    fn name(&self) -> String;

    /// Read the attributes describing the slice, without its pixel data
    fn read_header(&self) -> Result<SliceHeader, SourceError>;

    /// Read the slice including its pixel data
    fn read_slice(&self) -> Result<ParsedSlice, SourceError>;
}

impl<S: SliceSource + ?Sized> SliceSource for &S {
    fn name(&self) -> String {
        (**self).name()
    }

    fn read_header(&self) -> Result<SliceHeader, SourceError> {
        (**self).read_header()
    }

    fn read_slice(&self) -> Result<ParsedSlice, SourceError> {
        (**self).read_slice()
    }
}

/// A slice already held in memory
#[derive(Debug, Clone)]
pub struct InMemorySlice {
    name: String,
    slice: ParsedSlice,
    corrupt_pixel_data: bool,
}

impl InMemorySlice {
    pub fn new(name: impl Into<String>, header: SliceHeader, pixel_data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            slice: ParsedSlice {
                header,
                palette: None,
                pixel_data,
            },
            corrupt_pixel_data: false,
        }
    }

    pub fn with_palette(mut self, palette: RawPalette) -> Self {
        self.slice.palette = Some(palette);
        self
    }

    /// Mark the pixel data as unreadable: the header still parses but
    /// reading the slice fails
    pub fn with_corrupt_pixel_data(mut self) -> Self {
        self.corrupt_pixel_data = true;
        self
    }

    pub fn header(&self) -> &SliceHeader {
        &self.slice.header
    }
}

impl SliceSource for InMemorySlice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn read_header(&self) -> Result<SliceHeader, SourceError> {
        Ok(self.slice.header.clone())
    }

    fn read_slice(&self) -> Result<ParsedSlice, SourceError> {
        if self.corrupt_pixel_data {
            return Err(SourceError::MissingAttribute("Pixel Data"));
        }
        Ok(self.slice.clone())
    }
}
