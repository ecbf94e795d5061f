use crate::color::{ColorMapping, classify};
use crate::enums::{PlanarConfiguration, ScalarType};
use crate::error::{SourceError, VolumeError};
use crate::pixel_format::{RescaleParams, rescale_samples};
use crate::source::{ParsedSlice, SliceSource};
use tracing::{trace, warn};

/// Outcome of decoding one slice
#[derive(Debug)]
pub struct DecodedSlice {
    pub bytes_written: usize,
    /// Planar configuration as stored in the source, before interleaving
    pub planar_configuration: PlanarConfiguration,
    pub rescale: RescaleParams,
    pub is_lossy: bool,
    /// Colour classification; an error here does not invalidate the pixels
    pub color: Result<ColorMapping, VolumeError>,
}

/// Decodes slices into caller-owned buffers of one scalar type
#[derive(Debug, Clone, Copy)]
pub struct SliceDecoder {
    target: ScalarType,
}

impl SliceDecoder {
    pub fn new(target: ScalarType) -> Self {
        Self { target }
    }

    pub fn target(&self) -> ScalarType {
        self.target
    }

    /// Read slice `index` from `source` and decode it into `out`
    ///
    /// # Errors
    ///
    /// [`VolumeError::SliceRead`] when the source cannot be read; rescale and
    /// layout errors are returned as is
    pub fn decode<S: SliceSource + ?Sized>(
        &self,
        index: usize,
        source: &S,
        out: &mut [u8],
    ) -> Result<DecodedSlice, VolumeError> {
        let slice_read = |source_error: SourceError| VolumeError::SliceRead {
            index,
            name: source.name(),
            source: source_error,
        };

        let mut slice = source.read_slice().map_err(slice_read)?;
        trace!("Decoding slice {index} ({})", source.name());
        normalize_pixel_data(&mut slice).map_err(slice_read)?;
        self.decode_normalized(slice, out)
    }

    fn decode_normalized(
        &self,
        slice: ParsedSlice,
        out: &mut [u8],
    ) -> Result<DecodedSlice, VolumeError> {
        let ParsedSlice {
            header,
            palette,
            pixel_data,
        } = slice;
        let format = header.pixel_format;
        let samples_per_pixel = usize::from(format.samples_per_pixel);
        let native = format.scalar_type().ok_or(VolumeError::UnsupportedPixelFormat {
            bits_allocated: format.bits_allocated,
        })?;

        // 12-bit samples already sit in 16-bit words and only need a copy
        let same_container =
            format.bits_allocated == 12 && native.bytes_per_sample() == self.target.bytes_per_sample();
        let needs_rescale =
            !header.rescale.is_identity() || (native != self.target && !same_container);

        let bytes_written = if needs_rescale {
            if samples_per_pixel != 1 {
                return Err(VolumeError::MultiSampleRescale(format.samples_per_pixel));
            }
            rescale_samples(native, self.target, &header.rescale, &pixel_data, out)?
        } else {
            let available = out.len();
            let target = out.get_mut(..pixel_data.len()).ok_or_else(|| {
                VolumeError::GeometryInconsistency(format!(
                    "slice has {} bytes but only {available} are available",
                    pixel_data.len()
                ))
            })?;
            target.copy_from_slice(&pixel_data);
            pixel_data.len()
        };

        let color = classify(&header.photometric, &format, palette.as_ref());
        if let Err(e) = &color {
            warn!("{e}");
        }

        Ok(DecodedSlice {
            bytes_written,
            planar_configuration: header.planar_configuration,
            rescale: header.rescale,
            is_lossy: header.is_lossy,
            color,
        })
    }
}

/// Check the native buffer length and bring planar data to interleaved
/// order. The header keeps the planar configuration as stored.
fn normalize_pixel_data(slice: &mut ParsedSlice) -> Result<(), SourceError> {
    let header = &slice.header;
    let format = header.pixel_format;
    let (Some(native), Some(expected)) = (format.scalar_type(), header.buffer_length()) else {
        return Err(SourceError::UnsupportedPixelFormat {
            bits_allocated: format.bits_allocated,
        });
    };

    if slice.pixel_data.len() < expected {
        return Err(SourceError::PixelDataLength {
            expected,
            actual: slice.pixel_data.len(),
        });
    }
    // odd-length pixel data carries a padding byte
    slice.pixel_data.truncate(expected);

    let samples_per_pixel = usize::from(format.samples_per_pixel);
    if header.planar_configuration == PlanarConfiguration::Planar && samples_per_pixel > 1 {
        if let Some(sample_size) = native.bytes_per_sample() {
            slice.pixel_data = interleave_planes(
                &slice.pixel_data,
                samples_per_pixel,
                sample_size,
                header.dimensions.frames.max(1) as usize,
            );
        }
    }
    Ok(())
}

/// Convert planar-by-component frames to interleaved samples
fn interleave_planes(data: &[u8], samples: usize, sample_size: usize, frames: usize) -> Vec<u8> {
    let frame_len = data.len() / frames;
    let plane_len = frame_len / samples;
    let mut interleaved = Vec::with_capacity(data.len());
    for frame in data.chunks_exact(frame_len) {
        for pixel in (0..plane_len).step_by(sample_size) {
            for plane in frame.chunks_exact(plane_len) {
                interleaved.extend_from_slice(&plane[pixel..pixel + sample_size]);
            }
        }
    }
    interleaved
}
