use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Scalar type of the samples in a decoded buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarType {
    /// One bit per sample, rows packed into bytes
    SingleBit,
    Uint8,
    Int8,
    /// 12 bits allocated, held in 16-bit words once unpacked
    Uint12,
    Int12,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float32,
    Float64,
}

impl ScalarType {
    /// Size in bytes of one stored sample, `None` for bit-packed samples
    pub fn bytes_per_sample(self) -> Option<usize> {
        match self {
            ScalarType::SingleBit => None,
            ScalarType::Uint8 | ScalarType::Int8 => Some(1),
            ScalarType::Uint12 | ScalarType::Int12 => Some(2),
            ScalarType::Uint16 | ScalarType::Int16 => Some(2),
            ScalarType::Uint32 | ScalarType::Int32 | ScalarType::Float32 => Some(4),
            ScalarType::Float64 => Some(8),
        }
    }

    /// Number of bytes taken by one row of `cols` pixels
    /// Bytes of one row; single-bit rows are packed. `None` on overflow.
    pub fn bytes_per_row(self, cols: usize, samples_per_pixel: usize) -> Option<usize> {
        let samples = cols.checked_mul(samples_per_pixel)?;
        match self.bytes_per_sample() {
            Some(size) => samples.checked_mul(size),
            None => Some(samples.div_ceil(8)),
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::Float32 | ScalarType::Float64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ScalarType::Int8
                | ScalarType::Int12
                | ScalarType::Int16
                | ScalarType::Int32
                | ScalarType::Float32
                | ScalarType::Float64
        )
    }

    /// Representable range of the storage type
    pub fn range(self) -> (f64, f64) {
        match self {
            ScalarType::SingleBit => (0.0, 1.0),
            ScalarType::Uint8 => (u8::MIN as f64, u8::MAX as f64),
            ScalarType::Int8 => (i8::MIN as f64, i8::MAX as f64),
            ScalarType::Uint12 | ScalarType::Uint16 => (u16::MIN as f64, u16::MAX as f64),
            ScalarType::Int12 | ScalarType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            ScalarType::Uint32 => (u32::MIN as f64, u32::MAX as f64),
            ScalarType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            ScalarType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            ScalarType::Float64 => (f64::MIN, f64::MAX),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::SingleBit => "SINGLEBIT",
            ScalarType::Uint8 => "UINT8",
            ScalarType::Int8 => "INT8",
            ScalarType::Uint12 => "UINT12",
            ScalarType::Int12 => "INT12",
            ScalarType::Uint16 => "UINT16",
            ScalarType::Int16 => "INT16",
            ScalarType::Uint32 => "UINT32",
            ScalarType::Int32 => "INT32",
            ScalarType::Float32 => "FLOAT32",
            ScalarType::Float64 => "FLOAT64",
        };
        f.write_str(name)
    }
}

/// Meaning of the stored sample values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotometricInterpretation {
    Monochrome1,
    Monochrome2,
    PaletteColor,
    Rgb,
    YbrFull,
    YbrFull422,
    YbrRct,
    YbrIct,
    Cmyk,
    Argb,
    Unknown(String),
}

impl FromStr for PhotometricInterpretation {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim_end_matches(['\0', ' ']).trim() {
            "MONOCHROME1" => Self::Monochrome1,
            "MONOCHROME2" => Self::Monochrome2,
            "PALETTE COLOR" => Self::PaletteColor,
            "RGB" => Self::Rgb,
            "YBR_FULL" => Self::YbrFull,
            "YBR_FULL_422" => Self::YbrFull422,
            "YBR_RCT" => Self::YbrRct,
            "YBR_ICT" => Self::YbrIct,
            "CMYK" => Self::Cmyk,
            "ARGB" => Self::Argb,
            other => Self::Unknown(other.to_string()),
        })
    }
}

impl fmt::Display for PhotometricInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monochrome1 => write!(f, "MONOCHROME1"),
            Self::Monochrome2 => write!(f, "MONOCHROME2"),
            Self::PaletteColor => write!(f, "PALETTE COLOR"),
            Self::Rgb => write!(f, "RGB"),
            Self::YbrFull => write!(f, "YBR_FULL"),
            Self::YbrFull422 => write!(f, "YBR_FULL_422"),
            Self::YbrRct => write!(f, "YBR_RCT"),
            Self::YbrIct => write!(f, "YBR_ICT"),
            Self::Cmyk => write!(f, "CMYK"),
            Self::Argb => write!(f, "ARGB"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// How a consumer should interpret the decoded samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Luminance,
    InverseLuminance,
    Rgb,
    Rgba,
    LookupTable,
    Ybr,
    Cmyk,
}

/// Layout of multi-sample pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanarConfiguration {
    /// Samples of one pixel are adjacent (R1 G1 B1 R2 G2 B2 ...)
    #[default]
    Interleaved,
    /// All samples of one component are contiguous (R1 R2 ... G1 G2 ... B1 B2 ...)
    Planar,
}

impl PlanarConfiguration {
    pub fn from_value(value: u16) -> Self {
        if value == 1 {
            PlanarConfiguration::Planar
        } else {
            PlanarConfiguration::Interleaved
        }
    }

    pub fn value(self) -> u16 {
        match self {
            PlanarConfiguration::Interleaved => 0,
            PlanarConfiguration::Planar => 1,
        }
    }
}
