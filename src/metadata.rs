//! Descriptive attributes of a series, read from its first file
//!
//! None of this is needed to decode pixels. Values are kept as stored, with
//! padding removed.

use crate::dicom_source::{floats, string};
use dicom::object::InMemDicomObject;
use dicom_dictionary_std::tags;

/// A window/level pair suggested by the modality
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPreset {
    pub width: f64,
    pub center: f64,
    /// Window Center & Width Explanation
    pub comment: Option<String>,
}

impl WindowPreset {
    /// Pair up the values of Window Center and Window Width.
    ///
    /// Extra centers or widths are ignored, as are explanations past the
    /// number of presets.
    pub fn from_values(centers: &[f64], widths: &[f64], comments: &[String]) -> Vec<Self> {
        centers
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (&center, &width))| WindowPreset {
                width,
                center,
                comment: comments
                    .get(i)
                    .map(|c| c.trim_matches(['\0', ' ']).to_string())
                    .filter(|c| !c.is_empty()),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicalImageProperties {
    pub patient_name: Option<String>,
    pub patient_id: Option<String>,
    pub patient_age: Option<String>,
    pub patient_sex: Option<String>,
    pub patient_birth_date: Option<String>,
    pub study_date: Option<String>,
    pub study_time: Option<String>,
    pub acquisition_date: Option<String>,
    pub acquisition_time: Option<String>,
    pub image_date: Option<String>,
    pub image_time: Option<String>,
    pub image_number: Option<String>,
    pub series_number: Option<String>,
    pub series_description: Option<String>,
    pub study_id: Option<String>,
    pub study_description: Option<String>,
    pub modality: Option<String>,
    pub manufacturer: Option<String>,
    pub manufacturer_model_name: Option<String>,
    pub station_name: Option<String>,
    pub institution_name: Option<String>,
    pub convolution_kernel: Option<String>,
    pub slice_thickness: Option<String>,
    pub kvp: Option<String>,
    pub gantry_tilt: Option<String>,
    pub echo_time: Option<String>,
    pub echo_train_length: Option<String>,
    pub repetition_time: Option<String>,
    pub exposure_time: Option<String>,
    pub x_ray_tube_current: Option<String>,
    pub exposure: Option<String>,
    pub window_presets: Vec<WindowPreset>,
}

impl MedicalImageProperties {
    pub fn from_object(obj: &InMemDicomObject) -> Self {
        let window_presets = match (
            floats(obj, tags::WINDOW_CENTER),
            floats(obj, tags::WINDOW_WIDTH),
        ) {
            (Some(centers), Some(widths)) => {
                let comments = obj
                    .get(tags::WINDOW_CENTER_WIDTH_EXPLANATION)
                    .and_then(|e| e.to_multi_str().ok())
                    .map(|c| c.to_vec())
                    .unwrap_or_default();
                WindowPreset::from_values(&centers, &widths, &comments)
            }
            _ => Vec::new(),
        };

        Self {
            patient_name: string(obj, tags::PATIENT_NAME),
            patient_id: string(obj, tags::PATIENT_ID),
            patient_age: string(obj, tags::PATIENT_AGE),
            patient_sex: string(obj, tags::PATIENT_SEX),
            patient_birth_date: string(obj, tags::PATIENT_BIRTH_DATE),
            study_date: string(obj, tags::STUDY_DATE),
            study_time: string(obj, tags::STUDY_TIME),
            acquisition_date: string(obj, tags::ACQUISITION_DATE),
            acquisition_time: string(obj, tags::ACQUISITION_TIME),
            image_date: string(obj, tags::CONTENT_DATE),
            image_time: string(obj, tags::CONTENT_TIME),
            image_number: string(obj, tags::INSTANCE_NUMBER),
            series_number: string(obj, tags::SERIES_NUMBER),
            series_description: string(obj, tags::SERIES_DESCRIPTION),
            study_id: string(obj, tags::STUDY_ID),
            study_description: string(obj, tags::STUDY_DESCRIPTION),
            modality: string(obj, tags::MODALITY),
            manufacturer: string(obj, tags::MANUFACTURER),
            manufacturer_model_name: string(obj, tags::MANUFACTURER_MODEL_NAME),
            station_name: string(obj, tags::STATION_NAME),
            institution_name: string(obj, tags::INSTITUTION_NAME),
            convolution_kernel: string(obj, tags::CONVOLUTION_KERNEL),
            slice_thickness: string(obj, tags::SLICE_THICKNESS),
            kvp: string(obj, tags::KVP),
            gantry_tilt: string(obj, tags::GANTRY_DETECTOR_TILT),
            echo_time: string(obj, tags::ECHO_TIME),
            echo_train_length: string(obj, tags::ECHO_TRAIN_LENGTH),
            repetition_time: string(obj, tags::REPETITION_TIME),
            exposure_time: string(obj, tags::EXPOSURE_TIME),
            x_ray_tube_current: string(obj, tags::X_RAY_TUBE_CURRENT),
            exposure: string(obj, tags::EXPOSURE),
            window_presets,
        }
    }

    /// The first window/level preset, as (center, width)
    pub fn default_window(&self) -> Option<(f64, f64)> {
        self.window_presets
            .first()
            .map(|preset| (preset.center, preset.width))
    }
}
