//! Configuration types for the DIMSE store client

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DimseError, Result};
use crate::types::{EXPLICIT_VR_BIG_ENDIAN, EXPLICIT_VR_LITTLE_ENDIAN, IMPLICIT_VR_LITTLE_ENDIAN};

/// Configuration for the local side of a store association
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimseConfig {
    /// Local Application Entity Title
    pub local_aet: String,

    /// Maximum PDU size in bytes
    #[serde(default = "default_max_pdu")]
    pub max_pdu: u32,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Read/write timeout applied to the established association, in milliseconds
    #[serde(default = "default_association_timeout")]
    pub association_timeout_ms: u64,

    /// Transfer syntaxes proposed for every storage class (in order of preference)
    #[serde(default = "default_transfer_syntaxes")]
    pub preferred_transfer_syntaxes: Vec<String>,
}

/// Configuration for a remote DICOM node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNode {
    /// Remote Application Entity Title
    pub ae_title: String,

    /// Remote host address
    pub host: String,

    /// Remote port
    pub port: u16,

    /// Connection timeout in milliseconds (overrides global setting)
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,

    /// Maximum PDU size for this node (overrides global setting)
    #[serde(default)]
    pub max_pdu: Option<u32>,
}

impl Default for DimseConfig {
    fn default() -> Self {
        Self {
            local_aet: "COURIER_SCU".to_string(),
            max_pdu: default_max_pdu(),
            connect_timeout_ms: default_connect_timeout(),
            association_timeout_ms: default_association_timeout(),
            preferred_transfer_syntaxes: default_transfer_syntaxes(),
        }
    }
}

impl DimseConfig {
    /// Create a configuration for the given local AE title with default settings
    pub fn with_local_aet(local_aet: impl Into<String>) -> Self {
        Self {
            local_aet: local_aet.into(),
            ..Default::default()
        }
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get association timeout as Duration
    pub fn association_timeout(&self) -> Duration {
        Duration::from_millis(self.association_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_ae_title("Local", &self.local_aet)?;

        if !(16384..=131072).contains(&self.max_pdu) {
            return Err(DimseError::config(
                "Max PDU size must be between 16384 and 131072 bytes",
            ));
        }

        if self.preferred_transfer_syntaxes.is_empty() {
            return Err(DimseError::config(
                "At least one transfer syntax must be proposed",
            ));
        }

        Ok(())
    }
}

impl RemoteNode {
    /// Create a new remote node configuration
    pub fn new(ae_title: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            ae_title: ae_title.into(),
            host: host.into(),
            port,
            connect_timeout_ms: None,
            max_pdu: None,
        }
    }

    /// Set connection timeout for this node
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(timeout_ms);
        self
    }

    /// `host:port` form used when opening the connection
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the remote node configuration
    pub fn validate(&self) -> Result<()> {
        validate_ae_title("Remote", &self.ae_title)?;

        if self.host.trim().is_empty() {
            return Err(DimseError::config("Remote host cannot be empty"));
        }

        if self.port == 0 {
            return Err(DimseError::config("Remote port must be greater than 0"));
        }

        Ok(())
    }
}

impl std::fmt::Display for RemoteNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.ae_title, self.host, self.port)
    }
}

fn validate_ae_title(side: &str, aet: &str) -> Result<()> {
    let trimmed = aet.trim();
    if trimmed.is_empty() || trimmed.len() > 16 {
        return Err(DimseError::config(format!(
            "{} AE title must be 1-16 characters",
            side
        )));
    }
    if !trimmed.is_ascii() || trimmed.contains('\\') {
        return Err(DimseError::InvalidAeTitle(aet.to_string()));
    }
    Ok(())
}

// Default value functions
fn default_max_pdu() -> u32 {
    65536
}

fn default_connect_timeout() -> u64 {
    30_000 // 30 seconds
}

fn default_association_timeout() -> u64 {
    300_000 // 5 minutes
}

fn default_transfer_syntaxes() -> Vec<String> {
    vec![
        IMPLICIT_VR_LITTLE_ENDIAN.to_string(),
        EXPLICIT_VR_LITTLE_ENDIAN.to_string(),
        EXPLICIT_VR_BIG_ENDIAN.to_string(),
    ]
}
