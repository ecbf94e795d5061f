use crate::enums::ScalarType;
use crate::error::VolumeError;
use crate::options::DecodeOptions;
use crate::pixel_format::RescaleParams;
use crate::source::SliceHeader;
use tracing::debug;

const DEFAULT_ORIENTATION: [f64; 6] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

/// Physical and memory layout of a volume, resolved before decoding
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGeometry {
    /// Inclusive zero-based bounds: x min/max, y min/max, z min/max
    pub extent: [usize; 6],
    pub spacing: [f64; 3],
    /// Position of the first voxel in memory order
    pub origin: [f64; 3],
    /// Homogeneous matrix whose columns are the row direction, the column
    /// direction and the slice normal; translation is zero
    pub direction_cosines: [[f64; 4]; 4],
    /// Image Position (Patient) of the first slice as stored
    pub image_position: [f64; 3],
    /// Image Orientation (Patient) of the first slice as stored
    pub image_orientation: [f64; 6],
    /// Row 0 is the bottom of the image; no flip is applied
    pub file_lower_left: bool,
    pub scalar_type: ScalarType,
    pub samples_per_pixel: u16,
    /// Lossy compression flag of the first slice
    pub is_lossy: bool,
    /// Rescale of the first slice
    pub rescale: RescaleParams,
}

impl VolumeGeometry {
    pub fn cols(&self) -> usize {
        self.extent[1] - self.extent[0] + 1
    }

    pub fn rows(&self) -> usize {
        self.extent[3] - self.extent[2] + 1
    }

    pub fn slices(&self) -> usize {
        self.extent[5] - self.extent[4] + 1
    }

    /// Get the dimensions of the volume (slices, rows, cols)
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.slices(), self.rows(), self.cols())
    }

    pub fn bytes_per_row(&self) -> Result<usize, VolumeError> {
        self.scalar_type
            .bytes_per_row(self.cols(), usize::from(self.samples_per_pixel))
            .ok_or_else(|| too_large("row"))
    }

    pub fn bytes_per_slice(&self) -> Result<usize, VolumeError> {
        self.bytes_per_row()?
            .checked_mul(self.rows())
            .ok_or_else(|| too_large("slice"))
    }

    /// Size in bytes of the whole decoded volume
    pub fn buffer_len(&self) -> Result<usize, VolumeError> {
        self.bytes_per_slice()?
            .checked_mul(self.slices())
            .ok_or_else(|| too_large("volume"))
    }

    pub fn row_direction(&self) -> [f64; 3] {
        self.column(0)
    }

    pub fn column_direction(&self) -> [f64; 3] {
        self.column(1)
    }

    pub fn slice_normal(&self) -> [f64; 3] {
        self.column(2)
    }

    fn column(&self, index: usize) -> [f64; 3] {
        let m = &self.direction_cosines;
        [m[0][index], m[1][index], m[2][index]]
    }
}

fn too_large(what: &str) -> VolumeError {
    VolumeError::GeometryInconsistency(format!("{what} size does not fit in memory"))
}

/// Derives volume geometry from the first slice of a request
pub struct GeometryResolver;

impl GeometryResolver {
    /// Resolve the geometry of a volume made of `file_count` sources whose
    /// first slice is described by `first`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice has no pixels or the volume size
    /// overflows
    pub fn resolve(
        first: &SliceHeader,
        file_count: usize,
        scalar_type: ScalarType,
        options: &DecodeOptions,
    ) -> Result<VolumeGeometry, VolumeError> {
        let dims = first.dimensions;
        if dims.cols == 0 || dims.rows == 0 {
            return Err(VolumeError::GeometryInconsistency(format!(
                "slice has no pixels ({}x{})",
                dims.cols, dims.rows
            )));
        }
        let depth = if dims.is_3d() {
            dims.frames as usize
        } else {
            file_count.max(1)
        };
        let extent = [
            0,
            dims.cols as usize - 1,
            0,
            dims.rows as usize - 1,
            0,
            depth - 1,
        ];

        let mut spacing = first.spacing.unwrap_or([1.0, 1.0, 1.0]);
        if let Some(z_spacing) = options.z_spacing {
            spacing[2] = z_spacing;
        }

        let image_orientation = first.direction_cosines.unwrap_or(DEFAULT_ORIENTATION);
        let direction_cosines = Self::direction_matrix(&image_orientation);
        let image_position = first.origin.unwrap_or_default();

        // a position is only meaningful together with an orientation
        let origin = match (first.origin, first.direction_cosines) {
            (Some(position), Some(orientation)) if !options.file_lower_left => {
                // positions refer to pixel centres, hence rows - 1
                let norm = (dims.rows as f64 - 1.0) * spacing[1];
                [
                    position[0] + norm * orientation[3],
                    position[1] + norm * orientation[4],
                    position[2] + norm * orientation[5],
                ]
            }
            (Some(position), Some(_)) => position,
            _ => [0.0; 3],
        };

        debug!(
            "Resolved geometry: extent {:?}, spacing {:?}, origin {:?}",
            extent, spacing, origin
        );

        let geometry = VolumeGeometry {
            extent,
            spacing,
            origin,
            direction_cosines,
            image_position,
            image_orientation,
            file_lower_left: options.file_lower_left,
            scalar_type,
            samples_per_pixel: first.pixel_format.samples_per_pixel,
            is_lossy: first.is_lossy,
            rescale: first.rescale,
        };
        geometry.buffer_len()?;
        Ok(geometry)
    }

    fn direction_matrix(orientation: &[f64; 6]) -> [[f64; 4]; 4] {
        let row = [orientation[0], orientation[1], orientation[2]];
        let col = [orientation[3], orientation[4], orientation[5]];
        let normal = cross(&row, &col);

        let mut matrix = [[0.0; 4]; 4];
        for (axis, vector) in [row, col, normal].iter().enumerate() {
            for (component, value) in vector.iter().enumerate() {
                matrix[component][axis] = *value;
            }
        }
        matrix[3][3] = 1.0;
        matrix
    }
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::PixelFormat;
    use crate::source::Dimensions;
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;

    fn header(cols: u32, rows: u32, frames: u32) -> SliceHeader {
        let mut header =
            SliceHeader::new(PixelFormat::new(1, 16, 12, false), Dimensions::new(cols, rows, frames));
        header.spacing = Some([0.5, 2.0, 3.0]);
        header.origin = Some([0.0, 0.0, 0.0]);
        header.direction_cosines = Some([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        header
    }

    #[test]
    fn flipped_origin_moves_along_column_direction() {
        let geometry =
            GeometryResolver::resolve(&header(4, 10, 1), 1, ScalarType::Uint16, &DecodeOptions::new())
                .unwrap();
        assert_eq!(geometry.origin, [0.0, 18.0, 0.0]);
        assert_eq!(geometry.image_position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn lower_left_origin_is_image_position() {
        let mut first = header(4, 10, 1);
        first.origin = Some([1.0, 2.0, 3.0]);
        let options = DecodeOptions::new().with_file_lower_left(true);
        let geometry = GeometryResolver::resolve(&first, 1, ScalarType::Uint16, &options).unwrap();
        assert_eq!(geometry.origin, [1.0, 2.0, 3.0]);
        assert!(geometry.file_lower_left);
    }

    #[test]
    fn oblique_origin_follows_orientation() {
        let mut first = header(4, 5, 1);
        let s = std::f64::consts::FRAC_1_SQRT_2;
        first.direction_cosines = Some([1.0, 0.0, 0.0, 0.0, s, s]);
        first.origin = Some([10.0, 20.0, 30.0]);
        let geometry =
            GeometryResolver::resolve(&first, 1, ScalarType::Uint16, &DecodeOptions::new()).unwrap();
        assert_relative_eq!(geometry.origin[0], 10.0);
        assert_relative_eq!(geometry.origin[1], 20.0 + 8.0 * s);
        assert_relative_eq!(geometry.origin[2], 30.0 + 8.0 * s);
        let normal = geometry.slice_normal();
        assert_relative_eq!(normal[0], 0.0);
        assert_relative_eq!(normal[1], -s);
        assert_relative_eq!(normal[2], s);
    }

    #[test]
    fn series_extent_spans_files() {
        let geometry =
            GeometryResolver::resolve(&header(4, 3, 1), 7, ScalarType::Uint16, &DecodeOptions::new())
                .unwrap();
        assert_eq!(geometry.extent, [0, 3, 0, 2, 0, 6]);
        assert_eq!(geometry.dim(), (7, 3, 4));
        assert_eq!(geometry.buffer_len().unwrap(), 7 * 3 * 4 * 2);
    }

    #[test]
    fn multi_frame_extent_spans_frames() {
        let geometry =
            GeometryResolver::resolve(&header(4, 3, 5), 1, ScalarType::Uint16, &DecodeOptions::new())
                .unwrap();
        assert_eq!(geometry.extent, [0, 3, 0, 2, 0, 4]);
    }

    #[test]
    fn z_spacing_override_wins() {
        let options = DecodeOptions::new().with_z_spacing(1.25);
        let geometry =
            GeometryResolver::resolve(&header(4, 3, 1), 2, ScalarType::Uint16, &options).unwrap();
        assert_eq!(geometry.spacing, [0.5, 2.0, 1.25]);
    }

    #[test]
    fn missing_geometry_falls_back() {
        let first =
            SliceHeader::new(PixelFormat::new(1, 8, 8, false), Dimensions::new(2, 2, 1));
        let geometry =
            GeometryResolver::resolve(&first, 1, ScalarType::Uint8, &DecodeOptions::new()).unwrap();
        assert_eq!(geometry.origin, [0.0; 3]);
        assert_eq!(geometry.spacing, [1.0; 3]);
        assert_eq!(geometry.slice_normal(), [0.0, 0.0, 1.0]);
        assert_eq!(geometry.direction_cosines[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn position_without_orientation_is_ignored() {
        let mut first = header(4, 10, 1);
        first.origin = Some([5.0, 5.0, 5.0]);
        first.direction_cosines = None;
        for options in [DecodeOptions::new(), DecodeOptions::new().with_file_lower_left(true)] {
            let geometry =
                GeometryResolver::resolve(&first, 1, ScalarType::Uint16, &options).unwrap();
            assert_eq!(geometry.origin, [0.0; 3]);
            assert_eq!(geometry.image_position, [5.0, 5.0, 5.0]);
        }
    }

    #[test]
    fn oversized_volume_is_rejected() {
        let first = header(u32::MAX, u32::MAX, u32::MAX);
        let result =
            GeometryResolver::resolve(&first, 1, ScalarType::Float64, &DecodeOptions::new());
        assert_matches!(result, Err(VolumeError::GeometryInconsistency(_)));
    }

    #[test]
    fn empty_slice_is_rejected() {
        let first =
            SliceHeader::new(PixelFormat::new(1, 8, 8, false), Dimensions::new(0, 2, 1));
        let result = GeometryResolver::resolve(&first, 1, ScalarType::Uint8, &DecodeOptions::new());
        assert_matches!(result, Err(VolumeError::GeometryInconsistency(_)));
    }
}
