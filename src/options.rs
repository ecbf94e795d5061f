/// Options controlling how a volume is decoded
///
/// ```
/// # use dicom_volume_reader::DecodeOptions;
/// let options = DecodeOptions::new()
///     .with_z_spacing(2.5)
///     .with_parallel(false);
/// assert!(!options.file_lower_left);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    /// Row 0 of every slice is the bottom of the image. When `false` the
    /// volume is flipped vertically and its origin moved accordingly.
    pub file_lower_left: bool,
    /// Spacing between slices of a multi-file series. The reader never
    /// derives it from slice positions.
    pub z_spacing: Option<f64>,
    /// Decode the slices of a series on the rayon thread pool
    pub parallel: bool,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self {
            file_lower_left: false,
            z_spacing: None,
            parallel: true,
        }
    }

    pub fn with_file_lower_left(mut self, file_lower_left: bool) -> Self {
        self.file_lower_left = file_lower_left;
        self
    }

    pub fn with_z_spacing(mut self, z_spacing: f64) -> Self {
        self.z_spacing = Some(z_spacing);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}
