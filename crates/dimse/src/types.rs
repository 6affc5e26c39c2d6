//! Common types for DIMSE store operations

use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::{open_file, DefaultDicomObject, InMemDicomObject};
use std::path::{Path, PathBuf};

use crate::error::{DimseError, Result};

/// Implicit VR Little Endian
pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
/// Explicit VR Little Endian
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
/// Explicit VR Big Endian (retired, still widely accepted)
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";

/// Storage SOP classes proposed on every association, as `(uid, name)`.
///
/// The list is fixed; the remote is never asked what it supports. It stays
/// well below the 128 presentation contexts a single association can carry.
pub const STORAGE_SOP_CLASSES: &[(&str, &str)] = &[
    ("1.2.840.10008.5.1.4.1.1.1", "Computed Radiography Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.1.1", "Digital X-Ray Image Storage - For Presentation"),
    ("1.2.840.10008.5.1.4.1.1.1.1.1", "Digital X-Ray Image Storage - For Processing"),
    ("1.2.840.10008.5.1.4.1.1.1.2", "Digital Mammography X-Ray Image Storage - For Presentation"),
    ("1.2.840.10008.5.1.4.1.1.1.2.1", "Digital Mammography X-Ray Image Storage - For Processing"),
    ("1.2.840.10008.5.1.4.1.1.1.3", "Digital Intra-Oral X-Ray Image Storage - For Presentation"),
    ("1.2.840.10008.5.1.4.1.1.2", "CT Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.2.1", "Enhanced CT Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.3.1", "Ultrasound Multi-frame Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.4", "MR Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.4.1", "Enhanced MR Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.4.2", "MR Spectroscopy Storage"),
    ("1.2.840.10008.5.1.4.1.1.6.1", "Ultrasound Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.6.2", "Enhanced US Volume Storage"),
    ("1.2.840.10008.5.1.4.1.1.7", "Secondary Capture Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.7.1", "Multi-frame Single Bit Secondary Capture Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.7.2", "Multi-frame Grayscale Byte Secondary Capture Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.7.3", "Multi-frame Grayscale Word Secondary Capture Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.7.4", "Multi-frame True Color Secondary Capture Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.12.1", "X-Ray Angiographic Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.12.1.1", "Enhanced XA Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.12.2", "X-Ray Radiofluoroscopic Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.12.2.1", "Enhanced XRF Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.13.1.1", "X-Ray 3D Angiographic Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.13.1.3", "Breast Tomosynthesis Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.20", "Nuclear Medicine Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.77.1.1", "VL Endoscopic Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.77.1.2", "VL Microscopic Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.77.1.4", "VL Photographic Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.77.1.5.1", "Ophthalmic Photography 8 Bit Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.77.1.6", "VL Whole Slide Microscopy Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.88.11", "Basic Text SR Storage"),
    ("1.2.840.10008.5.1.4.1.1.88.22", "Enhanced SR Storage"),
    ("1.2.840.10008.5.1.4.1.1.88.33", "Comprehensive SR Storage"),
    ("1.2.840.10008.5.1.4.1.1.104.1", "Encapsulated PDF Storage"),
    ("1.2.840.10008.5.1.4.1.1.128", "Positron Emission Tomography Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.130", "Enhanced PET Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.481.1", "RT Image Storage"),
    ("1.2.840.10008.5.1.4.1.1.481.2", "RT Dose Storage"),
    ("1.2.840.10008.5.1.4.1.1.481.3", "RT Structure Set Storage"),
    ("1.2.840.10008.5.1.4.1.1.481.5", "RT Plan Storage"),
];

/// Look up the human-readable name of a storage SOP class
pub fn storage_class_name(uid: &str) -> Option<&'static str> {
    STORAGE_SOP_CLASSES
        .iter()
        .find(|(class_uid, _)| *class_uid == uid)
        .map(|(_, name)| *name)
}

/// Result of one C-STORE request as reported by the remote.
///
/// Only the exact success code counts as success. Warning codes
/// (`0xB000`, `0xB007`, `0xB006`) are failures too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Status `0x0000`
    Success,
    /// Any other status code
    Failure(u16),
    /// No readable status came back (transport problem, abort, unexpected PDU)
    NoResponse,
}

impl StoreStatus {
    /// The single status value treated as success
    pub const SUCCESS_CODE: u16 = 0x0000;

    /// Classify a raw status code
    pub fn from_code(code: u16) -> Self {
        if code == Self::SUCCESS_CODE {
            StoreStatus::Success
        } else {
            StoreStatus::Failure(code)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StoreStatus::Success)
    }
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreStatus::Success => write!(f, "0x{:04X}", Self::SUCCESS_CODE),
            StoreStatus::Failure(code) => write!(f, "0x{:04X}", code),
            StoreStatus::NoResponse => write!(f, "no response"),
        }
    }
}

/// Identifying and descriptive attributes of one DICOM file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetMetadata {
    /// Transfer syntax UID
    pub transfer_syntax: Option<String>,

    /// SOP Class UID
    pub sop_class_uid: Option<String>,

    /// SOP Instance UID
    pub sop_instance_uid: Option<String>,

    pub study_instance_uid: Option<String>,
    pub series_instance_uid: Option<String>,

    pub patient_name: Option<String>,
    pub patient_id: Option<String>,

    /// Study date as stored (`YYYYMMDD`)
    pub study_date: Option<String>,
    pub study_description: Option<String>,

    /// Modality (CT, MR, US, ...)
    pub modality: Option<String>,
    pub series_description: Option<String>,

    /// Image dimensions, when the dataset carries pixel data
    pub rows: Option<u16>,
    pub columns: Option<u16>,

    /// Size of the source file in bytes
    pub size_bytes: Option<u64>,
}

impl DatasetMetadata {
    /// Extract the identifying attributes of a parsed file
    pub fn from_object(obj: &DefaultDicomObject, size_bytes: Option<u64>) -> Self {
        let meta = obj.meta();
        Self {
            transfer_syntax: Some(clean_uid(meta.transfer_syntax())),
            sop_class_uid: Some(clean_uid(meta.media_storage_sop_class_uid())),
            sop_instance_uid: Some(clean_uid(meta.media_storage_sop_instance_uid())),
            study_instance_uid: string_attr(obj, tags::STUDY_INSTANCE_UID),
            series_instance_uid: string_attr(obj, tags::SERIES_INSTANCE_UID),
            patient_name: string_attr(obj, tags::PATIENT_NAME),
            patient_id: string_attr(obj, tags::PATIENT_ID),
            study_date: string_attr(obj, tags::STUDY_DATE),
            study_description: string_attr(obj, tags::STUDY_DESCRIPTION),
            modality: string_attr(obj, tags::MODALITY),
            series_description: string_attr(obj, tags::SERIES_DESCRIPTION),
            rows: u16_attr(obj, tags::ROWS),
            columns: u16_attr(obj, tags::COLUMNS),
            size_bytes,
        }
    }
}

/// A staged file decoded and ready to be sent as one C-STORE request
#[derive(Debug)]
pub struct StoreRequest {
    /// File the dataset was read from
    pub path: PathBuf,
    /// Affected SOP Class UID
    pub sop_class_uid: String,
    /// Affected SOP Instance UID
    pub sop_instance_uid: String,
    /// Transfer syntax the file is encoded in
    pub transfer_syntax: String,
    /// Identifying metadata, used for logging
    pub metadata: DatasetMetadata,
    /// The decoded dataset
    pub dataset: InMemDicomObject,
}

impl StoreRequest {
    /// Decode a DICOM file into a store request
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let size_bytes = std::fs::metadata(path).ok().map(|m| m.len());
        let obj = open_file(path)
            .map_err(|e| DimseError::object(format!("{}: {}", path.display(), e)))?;

        let metadata = DatasetMetadata::from_object(&obj, size_bytes);
        let sop_class_uid = metadata.sop_class_uid.clone().unwrap_or_default();
        let sop_instance_uid = metadata.sop_instance_uid.clone().unwrap_or_default();
        let transfer_syntax = metadata.transfer_syntax.clone().unwrap_or_default();

        if sop_class_uid.is_empty() || sop_instance_uid.is_empty() {
            return Err(DimseError::object(format!(
                "{}: missing SOP class or instance UID in file meta",
                path.display()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            sop_class_uid,
            sop_instance_uid,
            transfer_syntax,
            metadata,
            dataset: obj.into_inner(),
        })
    }
}

/// UIDs in the file meta group may carry a trailing NUL pad
pub(crate) fn clean_uid(uid: &str) -> String {
    uid.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

fn string_attr(obj: &DefaultDicomObject, tag: Tag) -> Option<String> {
    obj.element(tag)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.trim_end_matches(|c: char| c == '\0' || c == ' ').to_string())
        .filter(|s| !s.is_empty())
}

fn u16_attr(obj: &DefaultDicomObject, tag: Tag) -> Option<u16> {
    obj.element(tag).ok().and_then(|e| e.to_int::<u16>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_status_classification() {
        assert_eq!(StoreStatus::from_code(0x0000), StoreStatus::Success);
        assert!(StoreStatus::from_code(0x0000).is_success());
        // warnings are not success
        assert!(!StoreStatus::from_code(0xB000).is_success());
        assert_eq!(StoreStatus::from_code(0xA700), StoreStatus::Failure(0xA700));
        assert!(!StoreStatus::NoResponse.is_success());
    }

    #[test]
    fn test_store_status_display() {
        assert_eq!(StoreStatus::Failure(0xA700).to_string(), "0xA700");
        assert_eq!(StoreStatus::Success.to_string(), "0x0000");
        assert_eq!(StoreStatus::NoResponse.to_string(), "no response");
    }

    #[test]
    fn test_storage_class_table() {
        assert!(STORAGE_SOP_CLASSES.len() < 128);
        assert_eq!(
            storage_class_name("1.2.840.10008.5.1.4.1.1.2"),
            Some("CT Image Storage")
        );
        assert_eq!(storage_class_name("1.2.3.4"), None);

        let mut uids: Vec<_> = STORAGE_SOP_CLASSES.iter().map(|(uid, _)| *uid).collect();
        uids.sort_unstable();
        uids.dedup();
        assert_eq!(uids.len(), STORAGE_SOP_CLASSES.len());
    }

    #[test]
    fn test_clean_uid() {
        assert_eq!(clean_uid("1.2.840.10008.1.2\0"), "1.2.840.10008.1.2");
        assert_eq!(clean_uid("1.2.3"), "1.2.3");
    }

    #[test]
    fn test_from_file_rejects_non_dicom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not a dicom file").unwrap();
        assert!(matches!(
            StoreRequest::from_file(&path),
            Err(DimseError::DicomObject(_))
        ));
    }

    #[test]
    fn test_metadata_from_file() {
        use dicom_core::{DataElement, PrimitiveValue, VR};
        use dicom_object::meta::FileMetaTableBuilder;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.dcm");
        let ct = "1.2.840.10008.5.1.4.1.1.2";
        InMemDicomObject::from_element_iter([
            DataElement::new(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(ct)),
            DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from("1.2.3.4")),
            DataElement::new(tags::PATIENT_NAME, VR::PN, PrimitiveValue::from("DOE^JANE")),
            DataElement::new(tags::PATIENT_ID, VR::LO, PrimitiveValue::from("PAT001")),
            DataElement::new(tags::STUDY_DATE, VR::DA, PrimitiveValue::from("20240131")),
            DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("CT")),
            DataElement::new(tags::SERIES_DESCRIPTION, VR::LO, PrimitiveValue::from("AXIAL")),
            DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(512_u16)),
            DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(256_u16)),
        ])
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(ct)
                .media_storage_sop_instance_uid("1.2.3.4"),
        )
        .unwrap()
        .write_to_file(&path)
        .unwrap();

        let request = StoreRequest::from_file(&path).unwrap();
        let meta = &request.metadata;
        assert_eq!(request.sop_class_uid, ct);
        assert_eq!(meta.patient_name.as_deref(), Some("DOE^JANE"));
        assert_eq!(meta.patient_id.as_deref(), Some("PAT001"));
        assert_eq!(meta.study_date.as_deref(), Some("20240131"));
        assert_eq!(meta.series_description.as_deref(), Some("AXIAL"));
        assert_eq!(meta.study_description, None);
        assert_eq!((meta.rows, meta.columns), (Some(512), Some(256)));
        assert!(meta.size_bytes.unwrap_or(0) > 132);
    }
}
