//! Drives `StoreScu` against an in-process store SCP built on dicom-ul.

use std::net::TcpListener;
use std::path::Path;
use std::thread::{self, JoinHandle};

use dicom_core::{dicom_value, DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::tags;
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::InMemDicomObject;
use dicom_transfer_syntax_registry::entries;
use dicom_ul::pdu::{PDataValue, PDataValueType, Pdu};
use dicom_ul::ServerAssociationOptions;
use dimse::{
    Association, Connector, DimseConfig, RemoteNode, StoreRequest, StoreScu, StoreStatus,
    STORAGE_SOP_CLASSES,
};

const CT: &str = "1.2.840.10008.5.1.4.1.1.2";

fn write_ct(path: &Path, instance: &str) {
    let obj = InMemDicomObject::from_element_iter([
        DataElement::new(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(CT)),
        DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from(instance)),
        DataElement::new(tags::PATIENT_ID, VR::LO, PrimitiveValue::from("PAT001")),
        DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("CT")),
    ]);
    let file = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(dimse::types::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(CT)
                .media_storage_sop_instance_uid(instance),
        )
        .expect("build file meta");
    file.write_to_file(path).expect("write dicom file");
}

/// Accept one association and answer each C-STORE with the next status.
/// Returns the number of datasets received and whether a release was seen.
fn spawn_store_scp(statuses: Vec<u16>) -> (u16, JoinHandle<(usize, bool)>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind scp");
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut options = ServerAssociationOptions::new()
            .accept_any()
            .ae_title("STORE_SCP");
        for (uid, _) in STORAGE_SOP_CLASSES {
            options = options.with_abstract_syntax(*uid);
        }
        let mut association = options.establish(stream).expect("establish");

        let mut statuses = statuses.into_iter();
        let mut received = 0;
        let mut released = false;
        let mut request: Option<(u8, InMemDicomObject)> = None;

        while let Ok(pdu) = association.receive() {
            match pdu {
                Pdu::PData { data } => {
                    for value in data {
                        if value.value_type == PDataValueType::Command {
                            let cmd = InMemDicomObject::read_dataset_with_ts(
                                &value.data[..],
                                &entries::IMPLICIT_VR_LITTLE_ENDIAN.erased(),
                            )
                            .expect("command");
                            request = Some((value.presentation_context_id, cmd));
                        } else if value.is_last {
                            received += 1;
                            let (pc_id, cmd) = request.take().expect("command before data");
                            let message_id =
                                cmd.element(tags::MESSAGE_ID).unwrap().to_int::<u16>().unwrap();
                            let status = statuses.next().unwrap_or(0x0000);
                            let rsp = InMemDicomObject::command_from_element_iter([
                                DataElement::new(
                                    tags::COMMAND_FIELD,
                                    VR::US,
                                    dicom_value!(U16, [0x8001]),
                                ),
                                DataElement::new(
                                    tags::MESSAGE_ID_BEING_RESPONDED_TO,
                                    VR::US,
                                    dicom_value!(U16, [message_id]),
                                ),
                                DataElement::new(
                                    tags::COMMAND_DATA_SET_TYPE,
                                    VR::US,
                                    dicom_value!(U16, [0x0101]),
                                ),
                                DataElement::new(tags::STATUS, VR::US, dicom_value!(U16, [status])),
                            ]);
                            let mut data = Vec::new();
                            rsp.write_dataset_with_ts(
                                &mut data,
                                &entries::IMPLICIT_VR_LITTLE_ENDIAN.erased(),
                            )
                            .unwrap();
                            association
                                .send(&Pdu::PData {
                                    data: vec![PDataValue {
                                        presentation_context_id: pc_id,
                                        value_type: PDataValueType::Command,
                                        is_last: true,
                                        data,
                                    }],
                                })
                                .expect("send response");
                        }
                    }
                }
                Pdu::ReleaseRQ => {
                    released = true;
                    let _ = association.send(&Pdu::ReleaseRP);
                    break;
                }
                _ => break,
            }
        }
        (received, released)
    });

    (port, handle)
}

#[test]
fn store_reports_per_item_status_and_releases() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.dcm");
    let second = dir.path().join("second.dcm");
    write_ct(&first, "1.2.826.0.1.3680043.2.1125.1");
    write_ct(&second, "1.2.826.0.1.3680043.2.1125.2");

    let (port, scp) = spawn_store_scp(vec![0x0000, 0xA700]);

    let scu = StoreScu::new(DimseConfig::with_local_aet("COURIER_TEST"));
    let node = RemoteNode::new("STORE_SCP", "127.0.0.1", port);
    let mut association = scu.associate(&node).expect("associate");
    assert!(association
        .contexts()
        .iter()
        .any(|pc| pc.abstract_syntax == CT));

    let status = association
        .store(&StoreRequest::from_file(&first).unwrap())
        .expect("first store");
    assert_eq!(status, StoreStatus::Success);

    let status = association
        .store(&StoreRequest::from_file(&second).unwrap())
        .expect("second store");
    assert_eq!(status, StoreStatus::Failure(0xA700));

    association.release().expect("release");
    // second release is a no-op
    association.release().expect("release again");

    let (received, released) = scp.join().unwrap();
    assert_eq!(received, 2);
    assert!(released);
}
