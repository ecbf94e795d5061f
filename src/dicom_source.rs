//! [`SliceSource`] backed by DICOM files read with dicom-rs

use crate::color::RawPalette;
use crate::enums::{PhotometricInterpretation, PlanarConfiguration};
use crate::error::SourceError;
use crate::metadata::MedicalImageProperties;
use crate::pixel_format::{PixelFormat, RescaleParams};
use crate::source::{Dimensions, ParsedSlice, SliceHeader, SliceSource};

use dicom::core::Tag;
use dicom::core::value::Value;
use dicom::object::{FileDicomObject, InMemDicomObject, OpenFileOptions, open_file};
use dicom::pixeldata::PixelDecoder;
use dicom_dictionary_std::tags;
use std::path::{Path, PathBuf};
use tracing::trace;

/// One DICOM file of a series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DicomFileSource {
    path: PathBuf,
}

impl DicomFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file parses as a DICOM image
    pub fn can_read(&self) -> bool {
        self.read_header().is_ok()
    }

    /// Read the descriptive attributes of the file
    pub fn read_properties(&self) -> Result<MedicalImageProperties, SourceError> {
        let obj = self.open_header()?;
        Ok(MedicalImageProperties::from_object(&obj))
    }

    fn open_header(&self) -> Result<FileDicomObject<InMemDicomObject>, SourceError> {
        Ok(OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(&self.path)?)
    }
}

impl SliceSource for DicomFileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn read_header(&self) -> Result<SliceHeader, SourceError> {
        let obj = self.open_header()?;
        header_from_object(&obj)
    }

    fn read_slice(&self) -> Result<ParsedSlice, SourceError> {
        let obj = open_file(&self.path)?;
        let mut header = header_from_object(&obj)?;

        let element = obj
            .get(tags::PIXEL_DATA)
            .ok_or(SourceError::MissingAttribute("Pixel Data"))?;
        let encapsulated = matches!(element.value(), Value::PixelSequence { .. });

        let decoded = obj.decode_pixel_data()?;
        if encapsulated {
            // codecs hand out interleaved samples
            header.planar_configuration = PlanarConfiguration::Interleaved;
        }
        trace!(
            "Read {} bytes of pixel data from {}",
            decoded.data().len(),
            self.path.display()
        );

        let mut pixel_data = decoded.data().to_vec();
        header.pixel_format.clean_unused_bits(&mut pixel_data);

        Ok(ParsedSlice {
            palette: palette_from_object(&obj),
            header,
            pixel_data,
        })
    }
}

/// Collect the attributes describing the pixel data of an object
pub fn header_from_object(obj: &InMemDicomObject) -> Result<SliceHeader, SourceError> {
    let cols = uint32(obj, tags::COLUMNS).ok_or(SourceError::MissingAttribute("Columns"))?;
    let rows = uint32(obj, tags::ROWS).ok_or(SourceError::MissingAttribute("Rows"))?;
    let frames = uint32(obj, tags::NUMBER_OF_FRAMES).unwrap_or(1).max(1);

    let bits_allocated = uint16(obj, tags::BITS_ALLOCATED)
        .ok_or(SourceError::MissingAttribute("Bits Allocated"))?;
    let pixel_format = PixelFormat::new(
        uint16(obj, tags::SAMPLES_PER_PIXEL).unwrap_or(1),
        bits_allocated,
        uint16(obj, tags::BITS_STORED).unwrap_or(bits_allocated),
        uint16(obj, tags::PIXEL_REPRESENTATION) == Some(1),
    );

    let rescale = RescaleParams::new(
        float64(obj, tags::RESCALE_SLOPE).unwrap_or(1.0),
        float64(obj, tags::RESCALE_INTERCEPT).unwrap_or(0.0),
    );

    let photometric = string(obj, tags::PHOTOMETRIC_INTERPRETATION)
        .and_then(|s| s.parse::<PhotometricInterpretation>().ok())
        .unwrap_or(PhotometricInterpretation::Monochrome2);

    let spacing = floats(obj, tags::PIXEL_SPACING)
        .or_else(|| floats(obj, tags::IMAGER_PIXEL_SPACING))
        .filter(|ps| ps.len() >= 2)
        .map(|ps| {
            let z = float64(obj, tags::SPACING_BETWEEN_SLICES)
                .or_else(|| float64(obj, tags::SLICE_THICKNESS))
                .filter(|z| *z > 0.0)
                .unwrap_or(1.0);
            // Pixel Spacing is row spacing first
            [ps[1], ps[0], z]
        });

    let origin = floats(obj, tags::IMAGE_POSITION_PATIENT)
        .filter(|p| p.len() >= 3)
        .map(|p| [p[0], p[1], p[2]]);
    let direction_cosines = floats(obj, tags::IMAGE_ORIENTATION_PATIENT)
        .and_then(|o| o.get(..6).and_then(|o| <[f64; 6]>::try_from(o).ok()));

    Ok(SliceHeader {
        pixel_format,
        rescale,
        planar_configuration: uint16(obj, tags::PLANAR_CONFIGURATION)
            .map(PlanarConfiguration::from_value)
            .unwrap_or_default(),
        photometric,
        dimensions: Dimensions::new(cols, rows, frames),
        spacing,
        origin,
        direction_cosines,
        is_lossy: string(obj, tags::LOSSY_IMAGE_COMPRESSION).is_some_and(|s| s == "01"),
    })
}

/// Read the palette color lookup tables, if all three are present
pub fn palette_from_object(obj: &InMemDicomObject) -> Option<RawPalette> {
    let descriptor = obj
        .get(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR)?
        .to_multi_int::<i64>()
        .ok()?;
    let [entries, first_mapped, bits] = descriptor.get(..3)? else {
        return None;
    };
    let entries = if *entries == 0 { 1 << 16 } else { *entries as usize };
    let bits = u16::try_from(*bits).ok()?;

    let channel = |tag: Tag| {
        let bytes = obj.get(tag)?.to_bytes().ok()?;
        lut_entries(&bytes, entries, bits)
    };

    Some(RawPalette {
        first_mapped: *first_mapped,
        bits,
        red: channel(tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA)?,
        green: channel(tags::GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA)?,
        blue: channel(tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA)?,
    })
}

/// Decode lookup table data, stored either as one word per entry or, for
/// 8-bit tables, packed one byte per entry
fn lut_entries(bytes: &[u8], entries: usize, bits: u16) -> Option<Vec<u16>> {
    if bits == 8 && bytes.len() == entries {
        return Some(bytes.iter().map(|&b| u16::from(b)).collect());
    }
    let words: Vec<u16> = bytes
        .chunks_exact(2)
        .take(entries)
        .map(|b| u16::from_ne_bytes([b[0], b[1]]))
        .collect();
    if words.len() != entries {
        return None;
    }
    if bits == 8 && words.iter().any(|&w| w > 0xFF) {
        return Some(words.into_iter().map(|w| w >> 8).collect());
    }
    Some(words)
}

fn uint16(obj: &InMemDicomObject, tag: Tag) -> Option<u16> {
    obj.get(tag)?.to_int::<u16>().ok()
}

fn uint32(obj: &InMemDicomObject, tag: Tag) -> Option<u32> {
    obj.get(tag)?.to_int::<u32>().ok()
}

pub(crate) fn float64(obj: &InMemDicomObject, tag: Tag) -> Option<f64> {
    obj.get(tag)?.to_float64().ok()
}

pub(crate) fn floats(obj: &InMemDicomObject, tag: Tag) -> Option<Vec<f64>> {
    obj.get(tag)?.to_multi_float64().ok()
}

/// String value with padding removed, `None` when empty
pub(crate) fn string(obj: &InMemDicomObject, tag: Tag) -> Option<String> {
    let value = obj.get(tag)?.to_str().ok()?;
    let value = value.trim_matches(['\0', ' ']);
    (!value.is_empty()).then(|| value.to_string())
}
