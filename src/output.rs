use crate::error::Result;
use crate::types::FacilityRecord;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

/// Persist facility records to a timestamped JSON file under `output_dir`.
pub fn persist_to_json(records: &[FacilityRecord], output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let filepath = output_dir.join(format!("facilities_{timestamp}.json"));

    let json_content = serde_json::to_string_pretty(records)?;
    fs::write(&filepath, json_content)?;

    Ok(filepath)
}
