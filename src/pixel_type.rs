use crate::enums::ScalarType;
use crate::error::VolumeError;
use crate::pixel_format::{PixelFormat, RescaleParams, rescaled_scalar_type};
use crate::source::SliceSource;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Decides the one scalar type a whole series is decoded into
pub struct PixelTypeUnifier;

impl PixelTypeUnifier {
    /// Scalar type for a single slice: the type its rescale requires
    pub fn for_slice(format: &PixelFormat, rescale: &RescaleParams) -> Result<ScalarType, VolumeError> {
        rescaled_scalar_type(format, rescale).ok_or(VolumeError::UnsupportedPixelFormat {
            bits_allocated: format.bits_allocated,
        })
    }

    /// Scalar type for a series, scanning the header of every source
    ///
    /// # Errors
    ///
    /// Fails as a whole if any source cannot be parsed
    pub fn for_series<S: SliceSource>(sources: &[S]) -> Result<ScalarType, VolumeError> {
        let mut candidates = BTreeSet::new();
        for source in sources {
            let header = source.read_header().map_err(|e| {
                warn!("Could not read {} while choosing pixel type", source.name());
                VolumeError::Parse {
                    name: source.name(),
                    source: e,
                }
            })?;
            candidates.insert(Self::for_slice(&header.pixel_format, &header.rescale)?);
        }
        Self::merge(candidates).ok_or(VolumeError::NoSources)
    }

    /// Merge per-slice scalar types into one
    ///
    /// Distinct types always promote to FLOAT64: integer types of different
    /// signedness are not treated as comparable.
    pub fn merge(types: impl IntoIterator<Item = ScalarType>) -> Option<ScalarType> {
        let candidates: BTreeSet<ScalarType> = types.into_iter().collect();
        let unified = match candidates.len() {
            0 => None,
            1 => candidates.first().copied(),
            _ if candidates.contains(&ScalarType::Float64) => Some(ScalarType::Float64),
            _ => {
                warn!(
                    "Series mixes pixel types {:?}, promoting to {}; this may not be optimal",
                    candidates,
                    ScalarType::Float64
                );
                Some(ScalarType::Float64)
            }
        };
        if let Some(unified) = unified {
            debug!("Unified pixel type: {unified}");
        }
        unified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Dimensions, InMemorySlice, SliceHeader};
    use assert_matches::assert_matches;

    fn source(name: &str, format: PixelFormat, rescale: RescaleParams) -> InMemorySlice {
        let mut header = SliceHeader::new(format, Dimensions::new(1, 1, 1));
        header.rescale = rescale;
        InMemorySlice::new(name, header, vec![0; 4])
    }

    #[test]
    fn uniform_series_keeps_its_type() {
        let sources = vec![
            source("a", PixelFormat::new(1, 16, 12, false), RescaleParams::IDENTITY),
            source("b", PixelFormat::new(1, 16, 12, false), RescaleParams::IDENTITY),
        ];
        assert_eq!(PixelTypeUnifier::for_series(&sources).unwrap(), ScalarType::Uint16);
    }

    #[test]
    fn mixed_signedness_promotes_to_float64() {
        let sources = vec![
            source("a", PixelFormat::new(1, 16, 16, false), RescaleParams::IDENTITY),
            source("b", PixelFormat::new(1, 16, 16, true), RescaleParams::IDENTITY),
        ];
        assert_eq!(PixelTypeUnifier::for_series(&sources).unwrap(), ScalarType::Float64);
    }

    #[test]
    fn merge_is_order_independent() {
        let types = [ScalarType::Uint8, ScalarType::Int16, ScalarType::Uint8];
        let forward = PixelTypeUnifier::merge(types);
        let backward = PixelTypeUnifier::merge(types.into_iter().rev());
        assert_eq!(forward, backward);
        assert_eq!(forward, Some(ScalarType::Float64));
        assert_eq!(PixelTypeUnifier::merge([ScalarType::Int16; 3]), Some(ScalarType::Int16));
        assert_eq!(PixelTypeUnifier::merge(Vec::<ScalarType>::new()), None);
    }

    #[test]
    fn unreadable_source_fails_the_scan() {
        struct Broken;
        impl SliceSource for Broken {
            fn name(&self) -> String {
                "broken".to_string()
            }
            fn read_header(&self) -> Result<crate::source::SliceHeader, crate::error::SourceError> {
                Err(crate::error::SourceError::MissingAttribute("Rows"))
            }
            fn read_slice(&self) -> Result<crate::source::ParsedSlice, crate::error::SourceError> {
                Err(crate::error::SourceError::MissingAttribute("Rows"))
            }
        }
        assert_matches!(
            PixelTypeUnifier::for_series(&[Broken, Broken]),
            Err(VolumeError::Parse { name, .. }) if name == "broken"
        );
    }

    #[test]
    fn unsupported_format_is_reported() {
        let result = PixelTypeUnifier::for_slice(
            &PixelFormat::new(1, 24, 24, false),
            &RescaleParams::IDENTITY,
        );
        assert_matches!(result, Err(VolumeError::UnsupportedPixelFormat { bits_allocated: 24 }));
    }
}
