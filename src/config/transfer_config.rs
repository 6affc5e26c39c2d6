use serde::Deserialize;
use std::path::PathBuf;

use dimse::RemoteNode;

/// Where files are discovered
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
}

/// Local staging area settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory under which each caching session creates its own folder
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,
    /// File name prefix of staged files (`<prefix>_000000.<extension>`)
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
            prefix: default_cache_prefix(),
            extension: default_extension(),
        }
    }
}

/// Export target
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DestinationConfig {
    Folder {
        path: PathBuf,
        #[serde(default = "default_export_prefix")]
        prefix: String,
    },
    Pacs {
        local_aet: String,
        remote: RemoteNode,
    },
}

impl DestinationConfig {
    /// Short label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            DestinationConfig::Folder { .. } => "folder",
            DestinationConfig::Pacs { .. } => "pacs",
        }
    }
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("./tmp/cache")
}

fn default_cache_prefix() -> String {
    "cached".to_string()
}

fn default_export_prefix() -> String {
    "export".to_string()
}

fn default_extension() -> String {
    "dcm".to_string()
}
