use dicom::core::{DataElement, PrimitiveValue, VR, dicom_value};
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use dicom_dictionary_std::tags;
use dicom_volume_reader::{
    DecodeOptions, DicomFileSource, PhotometricInterpretation, ScalarType, SliceSource,
    VolumeLoader,
};
use std::path::Path;

/// Write a 2x3 MONOCHROME2 CT slice
fn write_slice(path: &Path, instance: u16, intercept: &str, values: [u16; 6]) {
    write_ct_slice(path, instance, intercept, false, values);
}

/// Write a 2x3 MONOCHROME2 CT slice with 12 of 16 bits stored
fn write_ct_slice(
    path: &Path,
    instance: u16,
    intercept: &str,
    signed: bool,
    values: [u16; 6],
) {
    let obj = InMemDicomObject::from_element_iter([
        DataElement::new(
            tags::SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(format!("2.25.{instance}")),
        ),
        DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("CT")),
        DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)),
        DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from("MONOCHROME2"),
        ),
        DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(3_u16)),
        DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(2_u16)),
        DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)),
        DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(12_u16)),
        DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(11_u16)),
        DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(u16::from(signed))),
        DataElement::new(tags::RESCALE_SLOPE, VR::DS, PrimitiveValue::from("1")),
        DataElement::new(tags::RESCALE_INTERCEPT, VR::DS, PrimitiveValue::from(intercept)),
        DataElement::new(tags::PIXEL_SPACING, VR::DS, dicom_value!(Strs, ["0.5", "0.5"])),
        DataElement::new(
            tags::IMAGE_POSITION_PATIENT,
            VR::DS,
            dicom_value!(Strs, ["0", "0", "0"]),
        ),
        DataElement::new(
            tags::IMAGE_ORIENTATION_PATIENT,
            VR::DS,
            dicom_value!(Strs, ["1", "0", "0", "0", "1", "0"]),
        ),
        DataElement::new(tags::WINDOW_CENTER, VR::DS, PrimitiveValue::from("40")),
        DataElement::new(tags::WINDOW_WIDTH, VR::DS, PrimitiveValue::from("400")),
        DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::U16(values.into_iter().collect()),
        ),
    ]);

    let file = obj
        .with_meta(
            FileMetaTableBuilder::new()
                // Explicit VR Little Endian
                .transfer_syntax("1.2.840.10008.1.2.1")
                // CT Image Storage
                .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.2")
                .media_storage_sop_instance_uid(format!("2.25.{instance}")),
        )
        .unwrap();
    file.write_to_file(path).unwrap();
}

#[test]
fn header_and_properties_are_read_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slice.dcm");
    write_slice(&path, 1, "-1024", [0, 1, 2, 3, 4, 5]);

    let source = DicomFileSource::new(&path);
    assert!(source.can_read());
    let header = source.read_header().unwrap();
    assert_eq!(header.photometric, PhotometricInterpretation::Monochrome2);
    assert_eq!(header.spacing, Some([0.5, 0.5, 1.0]));

    let properties = source.read_properties().unwrap();
    assert_eq!(properties.modality.as_deref(), Some("CT"));
    assert_eq!(properties.default_window(), Some((40.0, 400.0)));
}

#[test]
fn directory_is_loaded_by_file_name() {
    let dir = tempfile::tempdir().unwrap();
    write_slice(&dir.path().join("b.dcm"), 2, "-1024", [6, 7, 8, 9, 10, 11]);
    write_slice(&dir.path().join("a.dcm"), 1, "-1024", [0, 1, 2, 3, 4, 5]);
    std::fs::write(dir.path().join("notes.txt"), "not a slice").unwrap();

    let options = DecodeOptions::new().with_file_lower_left(true);
    let outcome = VolumeLoader::load_from_directory(dir.path(), &options).unwrap();
    assert!(outcome.is_complete());

    let volume = outcome.volume;
    assert_eq!(volume.dim(), (2, 3, 2));
    assert_eq!(volume.scalar_type(), ScalarType::Int16);
    let expected: Vec<i16> = (0..12).map(|v| v - 1024).collect();
    assert_eq!(volume.to_vec::<i16>().unwrap(), expected);
    assert_eq!(volume.shift(), -1024.0);
}

#[test]
fn unreadable_file_in_series_is_zero_filled() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<_> = (0..3).map(|i| dir.path().join(format!("{i}.dcm"))).collect();
    write_slice(&paths[0], 0, "0", [1, 1, 1, 1, 1, 1]);
    write_slice(&paths[1], 1, "0", [2, 2, 2, 2, 2, 2]);
    write_slice(&paths[2], 2, "0", [3, 3, 3, 3, 3, 3]);

    // the header still parses but the pixel data is cut off
    let bytes = std::fs::read(&paths[1]).unwrap();
    std::fs::write(&paths[1], &bytes[..bytes.len() - 4]).unwrap();

    let outcome = VolumeLoader::load_from_file_paths(&paths, &DecodeOptions::new()).unwrap();
    assert_eq!(outcome.failed_slices(), vec![1]);
    assert_eq!(
        outcome.volume.to_vec::<u16>().unwrap(),
        [[1u16; 6], [0; 6], [3; 6]].concat()
    );
}

#[test]
fn signed_samples_are_sign_extended_from_bits_stored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signed.dcm");
    // 12-bit two's complement: -1, 5, -2048, 2047, 0, 1
    write_ct_slice(&path, 1, "-1024", true, [0x0FFF, 5, 0x0800, 0x07FF, 0, 1]);

    let options = DecodeOptions::new().with_file_lower_left(true);
    let outcome = VolumeLoader::load_from_file_paths(&[&path], &options).unwrap();
    let volume = outcome.volume;
    assert_eq!(volume.scalar_type(), ScalarType::Int16);
    assert_eq!(
        volume.to_vec::<i16>().unwrap(),
        vec![-1025, -1019, -3072, 1023, -1024, -1023]
    );
}

#[test]
fn unsigned_samples_ignore_bits_above_bits_stored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlay.dcm");
    write_ct_slice(&path, 1, "0", false, [0xF001, 2, 0x1003, 4, 5, 6]);

    let options = DecodeOptions::new().with_file_lower_left(true);
    let outcome = VolumeLoader::load_from_file_paths(&[&path], &options).unwrap();
    assert_eq!(outcome.volume.to_vec::<u16>().unwrap(), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn missing_file_is_not_readable() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!VolumeLoader::can_read(dir.path().join("missing.dcm")));
}
