use crate::enums::ScalarType;
use thiserror::Error;

/// Errors raised while reading a single source through its parser
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Pixel data error: {0}")]
    PixelData(#[from] dicom::pixeldata::Error),

    #[error("Missing or invalid {0} attribute")]
    MissingAttribute(&'static str),

    #[error("Unsupported pixel format: {bits_allocated} bits allocated")]
    UnsupportedPixelFormat { bits_allocated: u16 },

    #[error("Pixel data has {actual} bytes, expected {expected}")]
    PixelDataLength { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("No sources to decode")]
    NoSources,

    #[error("Could not parse {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: SourceError,
    },

    #[error("Could not read slice {index} ({name}): {source}")]
    SliceRead {
        index: usize,
        name: String,
        #[source]
        source: SourceError,
    },

    #[error("Unsupported scalar type {target} for pixel format {native}")]
    UnsupportedScalarType {
        native: ScalarType,
        target: ScalarType,
    },

    #[error("Unsupported pixel format with {bits_allocated} bits allocated")]
    UnsupportedPixelFormat { bits_allocated: u16 },

    #[error("Unsupported photometric interpretation: {0}")]
    UnsupportedColorSpace(String),

    #[error("Rescaling requires one sample per pixel, found {0}")]
    MultiSampleRescale(u16),

    #[error("Multi-frame source {0} cannot be part of a multi-file series")]
    MultiFrameSeries(String),

    #[error("Geometry inconsistency: {0}")]
    GeometryInconsistency(String),
}

impl VolumeError {
    /// Index of the slice the error refers to, if any
    pub fn slice_index(&self) -> Option<usize> {
        match self {
            VolumeError::SliceRead { index, .. } => Some(*index),
            _ => None,
        }
    }
}
