//! Native pixel formats and the slope/intercept rescale
//!
//! The rescale maps stored values to real-world values with
//! `intercept + slope * stored`. [`rescaled_scalar_type`] picks the smallest
//! scalar type able to hold every rescaled value of a pixel format, and
//! [`rescale_samples`] applies the transform into that type.

use crate::enums::ScalarType;
use crate::error::VolumeError;
use bytemuck::Pod;
use std::fmt;

/// Sample layout of one slice, as reported by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub samples_per_pixel: u16,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub signed: bool,
}

impl PixelFormat {
    pub fn new(samples_per_pixel: u16, bits_allocated: u16, bits_stored: u16, signed: bool) -> Self {
        Self {
            samples_per_pixel,
            bits_allocated,
            bits_stored,
            signed,
        }
    }

    /// Storage type of the samples, `None` when the allocation is not supported
    pub fn scalar_type(&self) -> Option<ScalarType> {
        let scalar_type = match (self.bits_allocated, self.signed) {
            (1, _) => ScalarType::SingleBit,
            (8, false) => ScalarType::Uint8,
            (8, true) => ScalarType::Int8,
            (12, false) => ScalarType::Uint12,
            (12, true) => ScalarType::Int12,
            (16, false) => ScalarType::Uint16,
            (16, true) => ScalarType::Int16,
            (32, false) => ScalarType::Uint32,
            (32, true) => ScalarType::Int32,
            _ => return None,
        };
        Some(scalar_type)
    }

    fn effective_bits(&self) -> u32 {
        let stored = u32::from(self.bits_stored);
        let allocated = u32::from(self.bits_allocated);
        if stored == 0 || stored > allocated {
            allocated.min(32)
        } else {
            stored
        }
    }

    /// Smallest value the stored bits can represent
    pub fn min(&self) -> i64 {
        let bits = self.effective_bits();
        if self.signed && bits > 0 {
            -(1i64 << (bits - 1))
        } else {
            0
        }
    }

    /// Largest value the stored bits can represent
    pub fn max(&self) -> i64 {
        let bits = self.effective_bits();
        match (self.signed, bits) {
            (_, 0) => 0,
            (true, bits) => (1i64 << (bits - 1)) - 1,
            (false, bits) => (1i64 << bits) - 1,
        }
    }
}

macro_rules! clean_words {
    ($data:expr, $unsigned:ty, $signed:ty, $stored:expr, $is_signed:expr) => {{
        const SIZE: usize = std::mem::size_of::<$unsigned>();
        let shift = <$unsigned>::BITS - $stored;
        for word in $data.chunks_exact_mut(SIZE) {
            let mut bytes = [0u8; SIZE];
            bytes.copy_from_slice(word);
            let value = <$unsigned>::from_ne_bytes(bytes) << shift;
            let value = if $is_signed {
                ((value as $signed) >> shift) as $unsigned
            } else {
                value >> shift
            };
            word.copy_from_slice(&value.to_ne_bytes());
        }
    }};
}

impl PixelFormat {
    /// Clear the bits above Bits Stored in host-order samples. Signed
    /// samples are sign-extended from their highest stored bit.
    pub fn clean_unused_bits(&self, data: &mut [u8]) {
        let stored = u32::from(self.bits_stored);
        let container = match self.bits_allocated {
            8 => 8,
            12 | 16 => 16,
            32 => 32,
            _ => return,
        };
        if stored == 0 || stored >= container {
            return;
        }
        match container {
            8 => clean_words!(data, u8, i8, stored, self.signed),
            16 => clean_words!(data, u16, i16, stored, self.signed),
            _ => clean_words!(data, u32, i32, stored, self.signed),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{stored}/{allocated} bits {sign}, {spp} sample(s)",
            stored = self.bits_stored,
            allocated = self.bits_allocated,
            sign = if self.signed { "signed" } else { "unsigned" },
            spp = self.samples_per_pixel
        )
    }
}

/// Rescale parameters for converting stored values to real-world values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescaleParams {
    pub slope: f64,
    pub intercept: f64,
}

impl RescaleParams {
    pub const IDENTITY: RescaleParams = RescaleParams {
        slope: 1.0,
        intercept: 0.0,
    };

    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    pub fn is_identity(&self) -> bool {
        self.slope == 1.0 && self.intercept == 0.0
    }

    #[inline(always)]
    pub fn apply(&self, value: f64) -> f64 {
        value.mul_add(self.slope, self.intercept)
    }
}

impl Default for RescaleParams {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for RescaleParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slope={slope}, intercept={intercept}",
            slope = self.slope,
            intercept = self.intercept
        )
    }
}

/// Scalar type required to hold `intercept + slope * stored` for every
/// value of `format`. An identity rescale keeps the storage type rather than
/// narrowing to Bits Stored, so identity slices are copied byte for byte.
///
/// Returns `None` when the native format itself is not supported.
pub fn rescaled_scalar_type(format: &PixelFormat, rescale: &RescaleParams) -> Option<ScalarType> {
    let native = format.scalar_type()?;
    if rescale.is_identity() {
        // values stay in their container; 12-bit samples sit in 16-bit words
        return Some(match native {
            ScalarType::Uint12 => ScalarType::Uint16,
            ScalarType::Int12 => ScalarType::Int16,
            other => other,
        });
    }
    if native == ScalarType::SingleBit {
        return Some(ScalarType::SingleBit);
    }
    if rescale.slope.fract() != 0.0 || rescale.intercept.fract() != 0.0 {
        return Some(ScalarType::Float64);
    }

    let low = rescale.apply(format.min() as f64);
    let high = rescale.apply(format.max() as f64);
    let (min, max) = if low <= high { (low, high) } else { (high, low) };

    Some(best_fit(min, max))
}

fn best_fit(min: f64, max: f64) -> ScalarType {
    if min >= 0.0 {
        if max <= u8::MAX as f64 {
            ScalarType::Uint8
        } else if max <= u16::MAX as f64 {
            ScalarType::Uint16
        } else if max <= u32::MAX as f64 {
            ScalarType::Uint32
        } else {
            ScalarType::Float64
        }
    } else if min >= i8::MIN as f64 && max <= i8::MAX as f64 {
        ScalarType::Int8
    } else if min >= i16::MIN as f64 && max <= i16::MAX as f64 {
        ScalarType::Int16
    } else if min >= i32::MIN as f64 && max <= i32::MAX as f64 {
        ScalarType::Int32
    } else {
        ScalarType::Float64
    }
}

trait Sample: Pod {
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

macro_rules! integer_sample {
    ($($t:ty),*) => {
        $(
            impl Sample for $t {
                #[inline(always)]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                // round half away from zero, then saturate at the type bounds
                #[inline(always)]
                fn from_f64(value: f64) -> Self {
                    value.round().clamp(<$t>::MIN as f64, <$t>::MAX as f64) as $t
                }
            }
        )*
    };
}

integer_sample!(u8, i8, u16, i16, u32, i32);

impl Sample for f32 {
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline(always)]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Sample for f64 {
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline(always)]
    fn from_f64(value: f64) -> Self {
        value
    }
}

fn read_samples<T: Sample>(src: &[u8]) -> Vec<f64> {
    src.chunks_exact(size_of::<T>())
        .map(|chunk| bytemuck::pod_read_unaligned::<T>(chunk).to_f64())
        .collect()
}

/// Widen every sample of `src`, stored as `scalar_type`, to `f64`.
///
/// Returns `None` for bit-packed samples.
pub(crate) fn samples_as_f64(scalar_type: ScalarType, src: &[u8]) -> Option<Vec<f64>> {
    let values = match scalar_type {
        ScalarType::Uint8 => read_samples::<u8>(src),
        ScalarType::Int8 => read_samples::<i8>(src),
        ScalarType::Uint12 | ScalarType::Uint16 => read_samples::<u16>(src),
        ScalarType::Int12 | ScalarType::Int16 => read_samples::<i16>(src),
        ScalarType::Uint32 => read_samples::<u32>(src),
        ScalarType::Int32 => read_samples::<i32>(src),
        ScalarType::Float32 => read_samples::<f32>(src),
        ScalarType::Float64 => read_samples::<f64>(src),
        ScalarType::SingleBit => return None,
    };
    Some(values)
}

fn write_samples<T: Sample>(values: &[f64], rescale: &RescaleParams, dst: &mut [u8]) -> usize {
    let size = size_of::<T>();
    for (value, out) in values.iter().zip(dst.chunks_exact_mut(size)) {
        let sample = T::from_f64(rescale.apply(*value));
        out.copy_from_slice(bytemuck::bytes_of(&sample));
    }
    values.len() * size
}

/// Apply `rescale` to every sample of `src` (stored as `native`) and write
/// the results into `dst` as `target` samples, in host byte order.
///
/// Returns the number of bytes written.
pub fn rescale_samples(
    native: ScalarType,
    target: ScalarType,
    rescale: &RescaleParams,
    src: &[u8],
    dst: &mut [u8],
) -> Result<usize, VolumeError> {
    let unsupported = || VolumeError::UnsupportedScalarType { native, target };
    let target_size = target.bytes_per_sample().ok_or_else(unsupported)?;

    let values = samples_as_f64(native, src).ok_or_else(unsupported)?;

    let needed = values.len() * target_size;
    if dst.len() < needed {
        return Err(VolumeError::GeometryInconsistency(format!(
            "rescaled slice needs {needed} bytes but only {} are available",
            dst.len()
        )));
    }

    let written = match target {
        ScalarType::Uint8 => write_samples::<u8>(&values, rescale, dst),
        ScalarType::Int8 => write_samples::<i8>(&values, rescale, dst),
        ScalarType::Uint12 | ScalarType::Uint16 => write_samples::<u16>(&values, rescale, dst),
        ScalarType::Int12 | ScalarType::Int16 => write_samples::<i16>(&values, rescale, dst),
        ScalarType::Uint32 => write_samples::<u32>(&values, rescale, dst),
        ScalarType::Int32 => write_samples::<i32>(&values, rescale, dst),
        ScalarType::Float32 => write_samples::<f32>(&values, rescale, dst),
        ScalarType::Float64 => write_samples::<f64>(&values, rescale, dst),
        ScalarType::SingleBit => return Err(unsupported()),
    };
    Ok(written)
}
