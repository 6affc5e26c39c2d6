//! Read-only inspection of DICOM files: descriptive metadata plus a flat tag listing.

use std::path::Path;

use dicom_core::dictionary::{DataDictionary, DataDictionaryEntry};
use dicom_core::{Tag, VR};
use dicom_dictionary_std::{tags, StandardDataDictionary};
use dicom_object::{open_file, InMemDicomObject};

use crate::error::{DimseError, Result};
use crate::types::DatasetMetadata;

/// Longest value rendered in a tag listing, in characters
const MAX_VALUE_CHARS: usize = 64;

/// One top-level element of a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub tag: Tag,
    pub vr: VR,
    /// Dictionary keyword, `None` for private or unknown tags
    pub keyword: Option<String>,
    /// Value as text, truncated
    pub value: String,
}

/// Everything `inspect_file` learned about one file
#[derive(Debug, Clone)]
pub struct Inspection {
    pub metadata: DatasetMetadata,
    pub tags: Vec<TagEntry>,
}

/// Open a Part 10 file and describe it
pub fn inspect_file(path: impl AsRef<Path>) -> Result<Inspection> {
    let path = path.as_ref();
    let size_bytes = std::fs::metadata(path).ok().map(|m| m.len());
    let obj = open_file(path)
        .map_err(|e| DimseError::object(format!("{}: {}", path.display(), e)))?;

    Ok(Inspection {
        metadata: DatasetMetadata::from_object(&obj, size_bytes),
        tags: list_all_tags(&obj),
    })
}

/// Top-level elements of `obj` in tag order
pub fn list_all_tags(obj: &InMemDicomObject) -> Vec<TagEntry> {
    obj.iter()
        .map(|elem| {
            let header = elem.header();
            let value = if header.tag == tags::PIXEL_DATA {
                "<pixel data>".to_string()
            } else {
                match elem.to_str() {
                    Ok(text) => truncate(text.trim_end_matches(['\0', ' '])),
                    Err(_) => "<sequence>".to_string(),
                }
            };
            TagEntry {
                tag: header.tag,
                vr: header.vr,
                keyword: StandardDataDictionary
                    .by_tag(header.tag)
                    .map(|entry| entry.alias().to_string()),
                value,
            }
        })
        .collect()
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_VALUE_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
