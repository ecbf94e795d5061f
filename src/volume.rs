use crate::color::DisplayLookup;
use crate::enums::{ImageFormat, PlanarConfiguration, ScalarType};
use crate::geometry::VolumeGeometry;
use crate::pixel_format::{RescaleParams, samples_as_f64};

use image::ImageBuffer;
use image::Luma;
use ndarray::Array4;
use rayon::prelude::*;

/// Rust types a decoded buffer can be viewed as
pub trait VoxelScalar: bytemuck::Pod {
    /// Scalar types stored with this Rust type
    const SCALAR_TYPES: &'static [ScalarType];
}

macro_rules! voxel_scalar {
    ($($t:ty => [$($st:ident),+]),* $(,)?) => {
        $(
            impl VoxelScalar for $t {
                const SCALAR_TYPES: &'static [ScalarType] = &[$(ScalarType::$st),+];
            }
        )*
    };
}

voxel_scalar!(
    u8 => [Uint8, SingleBit],
    i8 => [Int8],
    u16 => [Uint16, Uint12],
    i16 => [Int16, Int12],
    u32 => [Uint32],
    i32 => [Int32],
    f32 => [Float32],
    f64 => [Float64],
);

/// A decoded volume: one scalar type, interleaved samples, slices outermost
#[derive(Debug, Clone)]
pub struct DecodedVolume {
    geometry: VolumeGeometry,
    data: Vec<u8>,
    image_format: Option<ImageFormat>,
    lookup: Option<DisplayLookup>,
    planar_configuration: PlanarConfiguration,
    is_lossy: bool,
    rescale: RescaleParams,
}

/// Attributes reported by the decoded slices
#[derive(Debug, Clone, Default)]
pub(crate) struct SliceAttributes {
    pub image_format: Option<ImageFormat>,
    pub lookup: Option<DisplayLookup>,
    pub planar_configuration: PlanarConfiguration,
    pub is_lossy: bool,
    pub rescale: RescaleParams,
}

impl DecodedVolume {
    pub(crate) fn new(geometry: VolumeGeometry, data: Vec<u8>, attributes: SliceAttributes) -> Self {
        Self {
            geometry,
            data,
            image_format: attributes.image_format,
            lookup: attributes.lookup,
            planar_configuration: attributes.planar_configuration,
            is_lossy: attributes.is_lossy,
            rescale: attributes.rescale,
        }
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.geometry.scalar_type
    }

    pub fn samples_per_pixel(&self) -> u16 {
        self.geometry.samples_per_pixel
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.geometry.dim()
    }

    /// Get a reference to the underlying bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the underlying bytes
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Bytes of slice `index`
    pub fn slice_bytes(&self, index: usize) -> Option<&[u8]> {
        let len = self.geometry.bytes_per_slice().ok()?;
        let start = index.checked_mul(len)?;
        self.data.get(start..start.checked_add(len)?)
    }

    /// Colour classification, `None` if the colour space was not recognised
    pub fn image_format(&self) -> Option<ImageFormat> {
        self.image_format
    }

    pub fn lookup(&self) -> Option<&DisplayLookup> {
        self.lookup.as_ref()
    }

    /// Planar configuration as stored in the source files. The buffer is
    /// always interleaved.
    pub fn planar_configuration(&self) -> PlanarConfiguration {
        self.planar_configuration
    }

    /// Whether any decoded slice was lossy compressed
    pub fn is_lossy(&self) -> bool {
        self.is_lossy
    }

    /// Rescale intercept of the last decoded slice. Slices of a series may
    /// each have their own.
    pub fn shift(&self) -> f64 {
        self.rescale.intercept
    }

    /// Rescale slope of the last decoded slice. Slices of a series may each
    /// have their own.
    pub fn scale(&self) -> f64 {
        self.rescale.slope
    }

    /// Copy the samples out as `T`, if `T` matches the scalar type
    pub fn to_vec<T: VoxelScalar>(&self) -> Option<Vec<T>> {
        if !T::SCALAR_TYPES.contains(&self.scalar_type()) {
            return None;
        }
        Some(bytemuck::pod_collect_to_vec(&self.data))
    }

    /// Samples as an array shaped (slices, rows, cols, samples)
    pub fn to_ndarray<T: VoxelScalar>(&self) -> Option<Array4<T>> {
        if self.scalar_type() == ScalarType::SingleBit {
            return None;
        }
        let (depth, height, width) = self.dim();
        let samples = usize::from(self.samples_per_pixel());
        Array4::from_shape_vec((depth, height, width, samples), self.to_vec()?).ok()
    }

    /// First sample of every pixel of slice `index` mapped to 8 bits through
    /// a window, or the slice's value range when no window is given
    pub fn slice_to_image(
        &self,
        index: usize,
        window: Option<(f64, f64)>,
    ) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let values = samples_as_f64(self.scalar_type(), self.slice_bytes(index)?)?;
        let samples = usize::from(self.samples_per_pixel()).max(1);
        let (_, height, width) = self.dim();

        let (low, high) = match window {
            Some((center, width)) => (center - width / 2.0, center + width / 2.0),
            None => values
                .par_iter()
                .step_by(samples)
                .fold(
                    || (f64::INFINITY, f64::NEG_INFINITY),
                    |(min, max), &v| (min.min(v), max.max(v)),
                )
                .reduce(
                    || (f64::INFINITY, f64::NEG_INFINITY),
                    |a, b| (a.0.min(b.0), a.1.max(b.1)),
                ),
        };

        let pixel_data: Vec<u8> = values
            .par_iter()
            .step_by(samples)
            .map(|&v| Self::normalize_to_u8(v, low, high))
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }

    #[inline]
    fn normalize_to_u8(value: f64, low: f64, high: f64) -> u8 {
        let range = high - low;
        if range <= 0.0 {
            return if value > low { u8::MAX } else { u8::MIN };
        }
        (((value - low) / range) * 255.0).clamp(0.0, 255.0) as u8
    }
}
