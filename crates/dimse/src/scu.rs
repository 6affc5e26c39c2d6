//! Service Class User (SCU) implementation for outbound C-STORE operations

use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

use dicom_core::{dicom_value, DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::tags;
use dicom_encoding::transfer_syntax::TransferSyntaxIndex;
use dicom_object::InMemDicomObject;
use dicom_transfer_syntax_registry::{entries, TransferSyntaxRegistry};
use dicom_ul::pdu::{PDataValue, PDataValueType, Pdu, PresentationContextResultReason};
use dicom_ul::{ClientAssociation, ClientAssociationOptions};
use tracing::{debug, info, warn};

use crate::config::{DimseConfig, RemoteNode};
use crate::types::{
    clean_uid, StoreRequest, StoreStatus, EXPLICIT_VR_BIG_ENDIAN, EXPLICIT_VR_LITTLE_ENDIAN,
    IMPLICIT_VR_LITTLE_ENDIAN, STORAGE_SOP_CLASSES,
};
use crate::{DimseError, Result};

/// C-STORE command field value
const C_STORE_RQ: u16 = 0x0001;
/// Command Data Set Type value announcing that a data set follows
const DATA_SET_PRESENT: u16 = 0x0000;
/// Medium priority
const PRIORITY_MEDIUM: u16 = 0x0000;

/// An established association able to carry store requests.
///
/// Implementations own the network session exclusively; one association is
/// never shared between two exports.
pub trait Association {
    /// Send one dataset and wait for the remote's status.
    ///
    /// `Err` means the request could not be issued at all; a response that
    /// could not be read is reported as [`StoreStatus::NoResponse`].
    fn store(&mut self, request: &StoreRequest) -> Result<StoreStatus>;

    /// Release the association. Calling it again after a release is a no-op.
    fn release(&mut self) -> Result<()>;
}

/// Opens associations with a remote node
pub trait Connector {
    type Association: Association;

    /// Negotiate an association, presenting the local identity, the remote's
    /// expected identity and the full storage capability list.
    fn associate(&self, node: &RemoteNode) -> Result<Self::Association>;
}

/// DIMSE Service Class User for the storage service
pub struct StoreScu {
    config: DimseConfig,
}

impl StoreScu {
    /// Create a new SCU with the given configuration
    pub fn new(config: DimseConfig) -> Self {
        Self { config }
    }

    /// The local configuration this SCU associates with
    pub fn config(&self) -> &DimseConfig {
        &self.config
    }

    /// Get connection timeout for a node (uses node-specific or global setting)
    fn get_connection_timeout(&self, node: &RemoteNode) -> Duration {
        node.connect_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.connect_timeout())
    }

    /// Get maximum PDU size for a node (uses node-specific or global setting)
    fn get_max_pdu(&self, node: &RemoteNode) -> u32 {
        node.max_pdu.unwrap_or(self.config.max_pdu)
    }
}

impl Connector for StoreScu {
    type Association = UlAssociation;

    fn associate(&self, node: &RemoteNode) -> Result<UlAssociation> {
        self.config.validate()?;
        node.validate()?;

        info!(
            "Requesting association {} -> {} ({} storage classes)",
            self.config.local_aet,
            node,
            STORAGE_SOP_CLASSES.len()
        );

        let transfer_syntaxes: Vec<&str> = self
            .config
            .preferred_transfer_syntaxes
            .iter()
            .map(String::as_str)
            .collect();

        let mut options = ClientAssociationOptions::new()
            .calling_ae_title(self.config.local_aet.as_str())
            .called_ae_title(node.ae_title.as_str())
            .max_pdu_length(self.get_max_pdu(node))
            .connection_timeout(self.get_connection_timeout(node))
            .read_timeout(self.config.association_timeout())
            .write_timeout(self.config.association_timeout());

        for (sop_class_uid, _) in STORAGE_SOP_CLASSES {
            options = options.with_presentation_context(*sop_class_uid, transfer_syntaxes.clone());
        }

        let association = options
            .establish_with(&node.socket_address())
            .map_err(|e| DimseError::AssociationRejected(format!("{}: {}", node, e)))?;

        // Context ids are assigned 1, 3, 5, ... in proposal order
        let contexts: Vec<NegotiatedContext> = association
            .presentation_contexts()
            .iter()
            .filter(|pc| pc.reason == PresentationContextResultReason::Acceptance)
            .filter_map(|pc| {
                let index = usize::from(pc.id.checked_sub(1)? / 2);
                let (abstract_syntax, _) = STORAGE_SOP_CLASSES.get(index)?;
                Some(NegotiatedContext {
                    id: pc.id,
                    abstract_syntax: abstract_syntax.to_string(),
                    transfer_syntax: clean_uid(&pc.transfer_syntax),
                })
            })
            .collect();

        info!(
            "Association established with {} ({} presentation contexts accepted)",
            node,
            contexts.len()
        );

        Ok(UlAssociation {
            inner: Some(association),
            contexts,
            peer: node.to_string(),
            next_message_id: 1,
        })
    }
}

/// A presentation context accepted by the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedContext {
    pub id: u8,
    pub abstract_syntax: String,
    pub transfer_syntax: String,
}

/// Association backed by the DICOM upper layer protocol over TCP
pub struct UlAssociation {
    inner: Option<ClientAssociation<TcpStream>>,
    contexts: Vec<NegotiatedContext>,
    peer: String,
    next_message_id: u16,
}

impl UlAssociation {
    /// Presentation contexts the remote accepted
    pub fn contexts(&self) -> &[NegotiatedContext] {
        &self.contexts
    }

    fn take_message_id(&mut self) -> u16 {
        let id = self.next_message_id;
        self.next_message_id = self.next_message_id.checked_add(1).unwrap_or(1);
        id
    }
}

impl Association for UlAssociation {
    fn store(&mut self, request: &StoreRequest) -> Result<StoreStatus> {
        if self.inner.is_none() {
            return Err(DimseError::Released);
        }

        let context = select_context(&self.contexts, request)?.clone();
        let ts = TransferSyntaxRegistry
            .get(&context.transfer_syntax)
            .ok_or_else(|| DimseError::UnsupportedTransferSyntax(context.transfer_syntax.clone()))?;

        let mut object_data = Vec::new();
        request
            .dataset
            .write_dataset_with_ts(&mut object_data, ts)
            .map_err(|e| DimseError::object(format!("{}: {}", request.path.display(), e)))?;

        let message_id = self.take_message_id();
        let command = store_command(request, message_id);
        let mut command_data = Vec::with_capacity(128);
        command
            .write_dataset_with_ts(&mut command_data, &entries::IMPLICIT_VR_LITTLE_ENDIAN.erased())
            .map_err(|e| DimseError::object(format!("C-STORE command encoding: {}", e)))?;

        debug!(
            "C-STORE-RQ #{} to {} on context {} ({} bytes, ts {})",
            message_id,
            self.peer,
            context.id,
            object_data.len(),
            context.transfer_syntax
        );

        let association = self.inner.as_mut().ok_or(DimseError::Released)?;
        association
            .send(&Pdu::PData {
                data: vec![PDataValue {
                    presentation_context_id: context.id,
                    value_type: PDataValueType::Command,
                    is_last: true,
                    data: command_data,
                }],
            })
            .map_err(|e| DimseError::DicomUl(e.to_string()))?;

        {
            let mut writer = association.send_pdata(context.id);
            writer.write_all(&object_data)?;
        }

        let status = match association.receive() {
            Ok(Pdu::PData { data }) => match read_status(&data) {
                Some(code) => StoreStatus::from_code(code),
                None => {
                    warn!("C-STORE-RSP from {} carried no readable status", self.peer);
                    StoreStatus::NoResponse
                }
            },
            Ok(pdu) => {
                warn!("Unexpected PDU from {} while awaiting C-STORE-RSP: {:?}", self.peer, pdu);
                StoreStatus::NoResponse
            }
            Err(e) => {
                warn!("No C-STORE-RSP from {}: {}", self.peer, e);
                StoreStatus::NoResponse
            }
        };

        Ok(status)
    }

    fn release(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(association) => {
                debug!("Releasing association with {}", self.peer);
                association
                    .release()
                    .map_err(|e| DimseError::DicomUl(e.to_string()))
            }
            None => Ok(()),
        }
    }
}

/// Pick the accepted context for the request's SOP class.
///
/// A context with the file's own transfer syntax wins. Uncompressed files may
/// be re-encoded into any accepted uncompressed syntax; compressed ones may not.
pub fn select_context<'a>(
    contexts: &'a [NegotiatedContext],
    request: &StoreRequest,
) -> Result<&'a NegotiatedContext> {
    let candidates: Vec<&NegotiatedContext> = contexts
        .iter()
        .filter(|pc| pc.abstract_syntax == request.sop_class_uid)
        .collect();

    if candidates.is_empty() {
        return Err(DimseError::NoPresentationContext(request.sop_class_uid.clone()));
    }

    if let Some(exact) = candidates
        .iter()
        .find(|pc| pc.transfer_syntax == request.transfer_syntax)
    {
        return Ok(exact);
    }

    if is_native(&request.transfer_syntax) {
        if let Some(native) = candidates.iter().find(|pc| is_native(&pc.transfer_syntax)) {
            return Ok(native);
        }
    }

    Err(DimseError::UnsupportedTransferSyntax(format!(
        "{} is not accepted for {}",
        request.transfer_syntax, request.sop_class_uid
    )))
}

fn is_native(transfer_syntax: &str) -> bool {
    matches!(
        transfer_syntax,
        IMPLICIT_VR_LITTLE_ENDIAN | EXPLICIT_VR_LITTLE_ENDIAN | EXPLICIT_VR_BIG_ENDIAN
    )
}

fn store_command(request: &StoreRequest, message_id: u16) -> InMemDicomObject {
    InMemDicomObject::command_from_element_iter([
        DataElement::new(
            tags::AFFECTED_SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from(request.sop_class_uid.as_str()),
        ),
        DataElement::new(tags::COMMAND_FIELD, VR::US, dicom_value!(U16, [C_STORE_RQ])),
        DataElement::new(tags::MESSAGE_ID, VR::US, dicom_value!(U16, [message_id])),
        DataElement::new(tags::PRIORITY, VR::US, dicom_value!(U16, [PRIORITY_MEDIUM])),
        DataElement::new(
            tags::COMMAND_DATA_SET_TYPE,
            VR::US,
            dicom_value!(U16, [DATA_SET_PRESENT]),
        ),
        DataElement::new(
            tags::AFFECTED_SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(request.sop_instance_uid.as_str()),
        ),
    ])
}

fn read_status(data: &[PDataValue]) -> Option<u16> {
    let command = data
        .iter()
        .find(|value| value.value_type == PDataValueType::Command)?;
    let obj = InMemDicomObject::read_dataset_with_ts(
        &command.data[..],
        &entries::IMPLICIT_VR_LITTLE_ENDIAN.erased(),
    )
    .ok()?;
    obj.element(tags::STATUS).ok()?.to_int::<u16>().ok()
}
