#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use courier::pipeline::{CallbackObserver, TransferObserver};
use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::tags;
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::InMemDicomObject;

pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

/// Write a minimal Part 10 CT instance
pub fn write_dicom(path: &Path, instance_uid: &str) {
    let obj = InMemDicomObject::from_element_iter([
        DataElement::new(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(CT_IMAGE_STORAGE)),
        DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from(instance_uid)),
        DataElement::new(tags::PATIENT_ID, VR::LO, PrimitiveValue::from("PAT001")),
        DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("CT")),
    ]);
    let file = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(dimse::types::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(CT_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(instance_uid),
        )
        .expect("build file meta");
    file.write_to_file(path).expect("write dicom file");
}

/// Observer that records everything it is told
#[derive(Clone, Default)]
pub struct Recorder {
    pub logs: Arc<Mutex<Vec<String>>>,
    pub progress: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl Recorder {
    pub fn observer(&self) -> Arc<dyn TransferObserver> {
        let logs = Arc::clone(&self.logs);
        let progress = Arc::clone(&self.progress);
        Arc::new(
            CallbackObserver::new()
                .on_log(move |m| logs.lock().unwrap().push(m.to_string()))
                .on_progress(move |c, t| progress.lock().unwrap().push((c, t))),
        )
    }

    pub fn logs_containing(&self, needle: &str) -> usize {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.contains(needle))
            .count()
    }
}
