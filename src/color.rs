//! Photometric classification and default display lookups

use crate::enums::{ImageFormat, PhotometricInterpretation};
use crate::error::VolumeError;
use crate::pixel_format::PixelFormat;

/// Palette color lookup table as stored by the parser
///
/// Channel values are the raw table entries, one per index.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPalette {
    /// First stored pixel value mapped by the table
    pub first_mapped: i64,
    /// Bits per table entry (8 or 16)
    pub bits: u16,
    pub red: Vec<u16>,
    pub green: Vec<u16>,
    pub blue: Vec<u16>,
}

/// RGBA lookup table indexed by stored value
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    bits: u16,
    table: Vec<[u16; 4]>,
}

impl LookupTable {
    /// Expand a palette to a full table: 256 entries for 8-bit palettes and
    /// 65536 entries for 16-bit palettes.
    ///
    /// Values below the first mapped value take the first entry, values past
    /// the end of the palette take the last one.
    pub fn from_palette(palette: &RawPalette) -> Option<Self> {
        let len = palette.red.len();
        if len == 0 || palette.green.len() != len || palette.blue.len() != len {
            return None;
        }
        let (size, opaque) = match palette.bits {
            8 => (1usize << 8, u16::from(u8::MAX)),
            16 => (1usize << 16, u16::MAX),
            _ => return None,
        };

        let last = len as i64 - 1;
        let table = (0..size as i64)
            .map(|value| {
                let index = (value - palette.first_mapped).clamp(0, last) as usize;
                [
                    palette.red[index],
                    palette.green[index],
                    palette.blue[index],
                    opaque,
                ]
            })
            .collect();

        Some(Self {
            bits: palette.bits,
            table,
        })
    }

    pub fn bit_depth(&self) -> u16 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Scalar range covered by the table
    pub fn range(&self) -> (u32, u32) {
        (0, (self.table.len() as u32).saturating_sub(1))
    }

    pub fn get(&self, value: usize) -> Option<[u16; 4]> {
        self.table.get(value).copied()
    }
}

/// Window/level display mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowLevel {
    pub window: f64,
    pub level: f64,
    pub inverse_video: bool,
}

impl WindowLevel {
    /// Window spanning the whole native range, inverted (MONOCHROME1)
    pub fn inverse_from_format(format: &PixelFormat) -> Self {
        let (min, max) = (format.min() as f64, format.max() as f64);
        Self {
            window: max - min,
            level: 0.5 * (max + min),
            inverse_video: true,
        }
    }
}

/// Lookup attached to the decoded pixels as side-channel metadata
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayLookup {
    Palette(LookupTable),
    WindowLevel(WindowLevel),
}

/// Result of classifying a slice's photometric interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapping {
    pub image_format: ImageFormat,
    pub lookup: Option<DisplayLookup>,
}

impl ColorMapping {
    fn plain(image_format: ImageFormat) -> Self {
        Self {
            image_format,
            lookup: None,
        }
    }
}

/// Map a photometric interpretation to an [`ImageFormat`], building the
/// default palette table or inverse window/level where one applies.
pub fn classify(
    photometric: &PhotometricInterpretation,
    format: &PixelFormat,
    palette: Option<&RawPalette>,
) -> Result<ColorMapping, VolumeError> {
    let mapping = match photometric {
        PhotometricInterpretation::Monochrome2 => ColorMapping::plain(ImageFormat::Luminance),
        PhotometricInterpretation::Monochrome1 => ColorMapping {
            image_format: ImageFormat::InverseLuminance,
            lookup: Some(DisplayLookup::WindowLevel(WindowLevel::inverse_from_format(
                format,
            ))),
        },
        PhotometricInterpretation::PaletteColor => {
            let table = palette.and_then(LookupTable::from_palette).ok_or_else(|| {
                VolumeError::UnsupportedColorSpace(format!(
                    "{photometric} without a usable lookup table"
                ))
            })?;
            ColorMapping {
                image_format: ImageFormat::LookupTable,
                lookup: Some(DisplayLookup::Palette(table)),
            }
        }
        PhotometricInterpretation::Rgb
        | PhotometricInterpretation::YbrRct
        | PhotometricInterpretation::YbrIct => ColorMapping::plain(ImageFormat::Rgb),
        PhotometricInterpretation::YbrFull | PhotometricInterpretation::YbrFull422 => {
            ColorMapping::plain(ImageFormat::Ybr)
        }
        PhotometricInterpretation::Cmyk => ColorMapping::plain(ImageFormat::Cmyk),
        PhotometricInterpretation::Argb => ColorMapping::plain(ImageFormat::Rgba),
        PhotometricInterpretation::Unknown(name) => {
            return Err(VolumeError::UnsupportedColorSpace(name.clone()));
        }
    };
    Ok(mapping)
}
