use crate::color::ColorMapping;
use crate::dicom_source::DicomFileSource;
use crate::error::{SourceError, VolumeError};
use crate::flip::flip_rows_in_place;
use crate::geometry::{GeometryResolver, VolumeGeometry};
use crate::options::DecodeOptions;
use crate::pixel_type::PixelTypeUnifier;
use crate::slice_decoder::{DecodedSlice, SliceDecoder};
use crate::source::SliceSource;
use crate::volume::{DecodedVolume, SliceAttributes};

use rayon::prelude::*;
use std::{fs, path::Path, sync::Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A slice of a series that could not be decoded and was zero-filled
#[derive(Debug, Error)]
#[error("Slice {index} ({name}) was zero-filled: {error}")]
pub struct SliceFailure {
    pub index: usize,
    pub name: String,
    #[source]
    pub error: VolumeError,
}

/// A decoded volume and the slices that had to be zero-filled
#[derive(Debug)]
pub struct DecodeOutcome {
    pub volume: DecodedVolume,
    pub failures: Vec<SliceFailure>,
}

impl DecodeOutcome {
    /// Whether every slice was decoded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_slices(&self) -> Vec<usize> {
        self.failures.iter().map(|failure| failure.index).collect()
    }
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Resolve the geometry and scalar type of a volume
    ///
    /// # Arguments
    ///
    /// * `sources` - One multi-frame source, or the slices of a series in
    ///   the order they are stacked
    /// * `options` - Decoding options
    ///
    /// # Errors
    ///
    /// Returns error if a header cannot be read, the pixel format is not
    /// supported or a multi-frame source is part of a series
    pub fn resolve_geometry<S: SliceSource>(
        sources: &[S],
        options: &DecodeOptions,
    ) -> Result<VolumeGeometry, VolumeError> {
        let first = sources.first().ok_or(VolumeError::NoSources)?;
        let header = first.read_header().map_err(|source| VolumeError::Parse {
            name: first.name(),
            source,
        })?;

        let scalar_type = if sources.len() == 1 {
            PixelTypeUnifier::for_slice(&header.pixel_format, &header.rescale)?
        } else {
            if header.dimensions.is_3d() {
                return Err(VolumeError::MultiFrameSeries(first.name()));
            }
            PixelTypeUnifier::for_series(sources)?
        };

        GeometryResolver::resolve(&header, sources.len(), scalar_type, options)
    }

    /// Decode every slice into one buffer laid out by `geometry`
    ///
    /// A slice of a series that fails to decode is zero-filled and reported
    /// in [`DecodeOutcome::failures`]. A single source that fails aborts the
    /// decode. `progress` receives a non-decreasing fraction in `[0, 1]`
    /// after each slice.
    ///
    /// # Errors
    ///
    /// Returns error if the single source fails or the buffer does not match
    /// the geometry
    pub fn decode_volume<S: SliceSource>(
        sources: &[S],
        geometry: &VolumeGeometry,
        options: &DecodeOptions,
        progress: impl FnMut(f64) + Send,
    ) -> Result<DecodeOutcome, VolumeError> {
        if sources.is_empty() {
            return Err(VolumeError::NoSources);
        }
        let single = sources.len() == 1;
        if !single && geometry.slices() != sources.len() {
            return Err(VolumeError::GeometryInconsistency(format!(
                "geometry has {} slices for {} sources",
                geometry.slices(),
                sources.len()
            )));
        }

        let buffer_len = geometry.buffer_len()?;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(buffer_len).map_err(|e| {
            VolumeError::GeometryInconsistency(format!("cannot allocate {buffer_len} bytes: {e}"))
        })?;
        buffer.resize(buffer_len, 0);
        let chunk_len = if single {
            buffer.len()
        } else {
            geometry.bytes_per_slice()?
        };
        if chunk_len == 0 {
            return Err(VolumeError::GeometryInconsistency(
                "volume has no bytes".to_string(),
            ));
        }

        let decoder = SliceDecoder::new(geometry.scalar_type);
        let last = sources.len() - 1;
        let progress = Mutex::new((0usize, progress));

        let decode_slice = |(index, (source, chunk)): (usize, (&S, &mut [u8]))| {
            let result = decoder
                .decode(index, source, chunk)
                .and_then(|decoded| Self::check_length(decoded, chunk.len()));
            if result.is_err() {
                chunk.fill(0);
            }
            if let Ok(mut state) = progress.lock() {
                state.0 += 1;
                let fraction = if last == 0 {
                    1.0
                } else {
                    (state.0 - 1) as f64 / last as f64
                };
                (state.1)(fraction);
            }
            result
        };

        let results: Vec<Result<DecodedSlice, VolumeError>> = if options.parallel && !single {
            sources
                .par_iter()
                .zip(buffer.par_chunks_mut(chunk_len))
                .enumerate()
                .map(decode_slice)
                .collect()
        } else {
            sources
                .iter()
                .zip(buffer.chunks_mut(chunk_len))
                .enumerate()
                .map(decode_slice)
                .collect()
        };

        let mut attributes = SliceAttributes {
            rescale: geometry.rescale,
            ..SliceAttributes::default()
        };
        let mut failures = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(decoded) => Self::record(&mut attributes, decoded),
                Err(error) if single => return Err(Self::abort(error)),
                Err(error) => {
                    let name = sources[index].name();
                    warn!("Zero-filling slice {index} ({name}): {error}");
                    failures.push(SliceFailure { index, name, error });
                }
            }
        }

        if !geometry.file_lower_left {
            debug!("Flipping {} rows of {} slices", geometry.rows(), geometry.slices());
            flip_rows_in_place(
                &mut buffer,
                geometry.bytes_per_row()?,
                geometry.rows(),
                geometry.slices(),
            )?;
        }

        info!(
            "Decoded {} of {} slices as {}",
            sources.len() - failures.len(),
            sources.len(),
            geometry.scalar_type
        );

        Ok(DecodeOutcome {
            volume: DecodedVolume::new(geometry.clone(), buffer, attributes),
            failures,
        })
    }

    /// Resolve the geometry of `sources` and decode them
    pub fn load<S: SliceSource>(
        sources: &[S],
        options: &DecodeOptions,
    ) -> Result<DecodeOutcome, VolumeError> {
        let geometry = Self::resolve_geometry(sources, options)?;
        Self::decode_volume(sources, &geometry, options, |_| {})
    }

    /// Load a volume from file paths, stacked in the given order
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        options: &DecodeOptions,
    ) -> Result<DecodeOutcome, VolumeError> {
        let sources: Vec<_> = paths.iter().map(DicomFileSource::new).collect();
        Self::load(&sources, options)
    }

    /// Load a volume from a directory containing .dcm files, stacked by file
    /// name
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        options: &DecodeOptions,
    ) -> Result<DecodeOutcome, VolumeError> {
        let path = path.as_ref();
        let mut paths: Vec<_> = fs::read_dir(path)
            .map_err(|e| VolumeError::Parse {
                name: path.display().to_string(),
                source: SourceError::Io(e),
            })?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeError::NoSources);
        }
        paths.sort();

        Self::load_from_file_paths(&paths, options)
    }

    /// Whether `path` can be read as a DICOM image
    pub fn can_read(path: impl AsRef<Path>) -> bool {
        DicomFileSource::new(path).can_read()
    }

    fn check_length(decoded: DecodedSlice, expected: usize) -> Result<DecodedSlice, VolumeError> {
        if decoded.bytes_written != expected {
            return Err(VolumeError::GeometryInconsistency(format!(
                "slice decoded to {} bytes, expected {expected}",
                decoded.bytes_written
            )));
        }
        Ok(decoded)
    }

    /// Keep the attributes of the last decoded slice
    fn record(attributes: &mut SliceAttributes, decoded: DecodedSlice) {
        attributes.is_lossy |= decoded.is_lossy;
        attributes.rescale = decoded.rescale;
        attributes.planar_configuration = decoded.planar_configuration;
        (attributes.image_format, attributes.lookup) = match decoded.color {
            Ok(ColorMapping {
                image_format,
                lookup,
            }) => (Some(image_format), lookup),
            Err(_) => (None, None),
        };
    }

    fn abort(error: VolumeError) -> VolumeError {
        match error {
            VolumeError::SliceRead { name, source, .. } => VolumeError::Parse { name, source },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{ImageFormat, PlanarConfiguration, ScalarType};
    use crate::pixel_format::{PixelFormat, RescaleParams};
    use crate::source::{Dimensions, InMemorySlice, SliceHeader};
    use assert_matches::assert_matches;

    fn u16_slice(name: &str, cols: u32, values: &[u16]) -> InMemorySlice {
        let rows = values.len() as u32 / cols;
        let header =
            SliceHeader::new(PixelFormat::new(1, 16, 16, false), Dimensions::new(cols, rows, 1));
        InMemorySlice::new(name, header, bytemuck::cast_slice(values).to_vec())
    }

    fn lower_left() -> DecodeOptions {
        DecodeOptions::new().with_file_lower_left(true)
    }

    #[test]
    fn series_is_stacked_in_order() {
        let sources = vec![
            u16_slice("a", 2, &[1, 2, 3, 4]),
            u16_slice("b", 2, &[5, 6, 7, 8]),
        ];
        let outcome = VolumeLoader::load(&sources, &lower_left()).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.volume.dim(), (2, 2, 2));
        assert_eq!(
            outcome.volume.to_vec::<u16>().unwrap(),
            vec![1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn default_options_flip_rows() {
        let sources = vec![u16_slice("a", 2, &[1, 2, 3, 4, 5, 6])];
        let outcome = VolumeLoader::load(&sources, &DecodeOptions::new()).unwrap();
        assert_eq!(outcome.volume.to_vec::<u16>().unwrap(), vec![5, 6, 3, 4, 1, 2]);
    }

    #[test]
    fn failed_slice_is_zero_filled() {
        let sources = vec![
            u16_slice("a", 2, &[1, 2]),
            u16_slice("b", 2, &[3, 4]).with_corrupt_pixel_data(),
            u16_slice("c", 2, &[5, 6]),
        ];
        let outcome = VolumeLoader::load(&sources, &lower_left()).unwrap();
        assert_eq!(outcome.failed_slices(), vec![1]);
        assert_eq!(outcome.failures[0].name, "b");
        assert_eq!(outcome.volume.to_vec::<u16>().unwrap(), vec![1, 2, 0, 0, 5, 6]);
    }

    #[test]
    fn mismatched_slice_is_zero_filled() {
        let sources = vec![
            u16_slice("a", 2, &[1, 2]),
            u16_slice("b", 3, &[3, 4, 5]),
        ];
        let outcome = VolumeLoader::load(&sources, &lower_left()).unwrap();
        assert_eq!(outcome.failed_slices(), vec![1]);
        assert_matches!(
            outcome.failures[0].error,
            VolumeError::GeometryInconsistency(_)
        );
        assert_eq!(outcome.volume.to_vec::<u16>().unwrap(), vec![1, 2, 0, 0]);
    }

    #[test]
    fn single_source_failure_aborts() {
        let sources = vec![u16_slice("only", 2, &[1, 2]).with_corrupt_pixel_data()];
        let result = VolumeLoader::load(&sources, &lower_left());
        assert_matches!(result, Err(VolumeError::Parse { name, .. }) if name == "only");
    }

    #[test]
    fn multi_frame_source_is_decoded_whole() {
        let header =
            SliceHeader::new(PixelFormat::new(1, 8, 8, false), Dimensions::new(2, 2, 3));
        let sources = vec![InMemorySlice::new("frames", header, (1..=12).collect())];
        let outcome = VolumeLoader::load(&sources, &DecodeOptions::new()).unwrap();
        assert_eq!(outcome.volume.dim(), (3, 2, 2));
        assert_eq!(
            outcome.volume.data(),
            &[3, 4, 1, 2, 7, 8, 5, 6, 11, 12, 9, 10]
        );
    }

    #[test]
    fn multi_frame_source_in_series_is_rejected() {
        let header =
            SliceHeader::new(PixelFormat::new(1, 8, 8, false), Dimensions::new(1, 1, 2));
        let sources = vec![
            InMemorySlice::new("frames", header.clone(), vec![0; 2]),
            InMemorySlice::new("more", header, vec![0; 2]),
        ];
        assert_matches!(
            VolumeLoader::resolve_geometry(&sources, &DecodeOptions::new()),
            Err(VolumeError::MultiFrameSeries(name)) if name == "frames"
        );
    }

    #[test]
    fn rescaled_series_reports_last_slice_attributes() {
        let mut header =
            SliceHeader::new(PixelFormat::new(1, 16, 16, false), Dimensions::new(1, 1, 1));
        header.rescale = RescaleParams::new(0.5, 0.0);
        let first = InMemorySlice::new("a", header.clone(), bytemuck::cast_slice(&[10u16]).to_vec());
        header.rescale = RescaleParams::new(2.0, -1.0);
        header.is_lossy = true;
        let second = InMemorySlice::new("b", header, bytemuck::cast_slice(&[10u16]).to_vec());

        let outcome = VolumeLoader::load(&[first, second], &lower_left()).unwrap();
        let volume = &outcome.volume;
        assert_eq!(volume.scalar_type(), ScalarType::Float64);
        assert_eq!(volume.to_vec::<f64>().unwrap(), vec![5.0, 19.0]);
        assert_eq!(volume.scale(), 2.0);
        assert_eq!(volume.shift(), -1.0);
        assert!(volume.is_lossy());
        assert_eq!(volume.image_format(), Some(ImageFormat::Luminance));
        assert_eq!(volume.planar_configuration(), PlanarConfiguration::Interleaved);
    }

    #[test]
    fn progress_is_monotonic() {
        let sources: Vec<_> = (0..5u16)
            .map(|i| u16_slice(&i.to_string(), 1, &[i]))
            .collect();
        let geometry = VolumeLoader::resolve_geometry(&sources, &lower_left()).unwrap();
        let mut seen = Vec::new();
        VolumeLoader::decode_volume(&sources, &geometry, &lower_left(), |p| seen.push(p)).unwrap();
        assert_eq!(seen.len(), 5);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.first(), Some(&0.0));
        assert_eq!(seen.last(), Some(&1.0));
    }

    #[test]
    fn empty_request_is_rejected() {
        let sources: Vec<InMemorySlice> = Vec::new();
        assert_matches!(
            VolumeLoader::load(&sources, &DecodeOptions::new()),
            Err(VolumeError::NoSources)
        );
    }
}
