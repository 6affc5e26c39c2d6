//! Human-readable summary of a single DICOM file.

use std::fmt::Write;
use std::path::Path;

use dimse::types::storage_class_name;
use dimse::{Inspection, TagEntry};

use crate::error::Result;

/// Describe `path`: its key attributes, and every top-level tag when `all_tags` is set
pub fn inspect(path: &Path, all_tags: bool) -> Result<String> {
    let inspection = dimse::inspect_file(path)?;
    Ok(render(path, &inspection, all_tags))
}

pub fn render(path: &Path, inspection: &Inspection, all_tags: bool) -> String {
    let meta = &inspection.metadata;
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "Unknown".to_string());
    let number = |value: Option<u16>| value.map_or_else(|| "-".to_string(), |v| v.to_string());

    let sop_class = match meta.sop_class_uid.as_deref() {
        Some(uid) => match storage_class_name(uid) {
            Some(name) => format!("{} ({})", uid, name),
            None => uid.to_string(),
        },
        None => "Unknown".to_string(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "File:              {}", path.display());
    let _ = writeln!(out, "PatientName:       {}", text(&meta.patient_name));
    let _ = writeln!(out, "PatientID:         {}", text(&meta.patient_id));
    let _ = writeln!(out, "StudyDate:         {}", text(&meta.study_date));
    let _ = writeln!(out, "StudyDescription:  {}", text(&meta.study_description));
    let _ = writeln!(out, "Modality:          {}", text(&meta.modality));
    let _ = writeln!(out, "SeriesDescription: {}", text(&meta.series_description));
    let _ = writeln!(out, "Rows:              {}", number(meta.rows));
    let _ = writeln!(out, "Columns:           {}", number(meta.columns));
    let _ = writeln!(out, "SOPClassUID:       {}", sop_class);
    let _ = writeln!(out, "TransferSyntax:    {}", text(&meta.transfer_syntax));
    if let Some(size) = meta.size_bytes {
        let _ = writeln!(out, "Size:              {} bytes", size);
    }

    if all_tags {
        let _ = writeln!(out, "\n{} tags:", inspection.tags.len());
        for entry in &inspection.tags {
            let _ = writeln!(out, "  {}", tag_line(entry));
        }
    }
    out
}

fn tag_line(entry: &TagEntry) -> String {
    format!(
        "({:04X},{:04X}) {} {:<28} {}",
        entry.tag.0,
        entry.tag.1,
        entry.vr.to_string(),
        entry.keyword.as_deref().unwrap_or("?"),
        entry.value
    )
}
