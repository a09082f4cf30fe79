//! Dataset freshness stamps attached to every forecast response.
//!
//! All three degrade to an empty string (with a warning) when their source
//! file is missing or malformed.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::warn;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::forecast::TIME_FORMAT;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Freshness {
    /// `result.metadata_modified` of the dataset, as `YYYYMMDDHHMM`.
    pub last_updated: String,
    /// When the metadata document was last written, in the service zone.
    pub last_downloaded: String,
}

/// Compacts an ISO-8601-like timestamp to `YYYYMMDDHHMM`.
pub fn compact_timestamp(iso: &str) -> String {
    iso.chars()
        .filter(|c| !matches!(c, '-' | 'T' | ':'))
        .take(12)
        .collect()
}

/// Pulls `result.metadata_modified` out of the metadata document.
pub fn parse_metadata_modified(contents: &str) -> Option<String> {
    let doc: Value = match serde_json::from_str(contents) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Malformed dataset metadata: {}", e);
            return None;
        }
    };
    let modified = doc.pointer("/result/metadata_modified").and_then(Value::as_str);
    if modified.is_none() {
        warn!("Dataset metadata has no result.metadata_modified");
    }
    modified.map(compact_timestamp)
}

pub fn read_freshness(metadata_path: &Path, tz: Tz) -> Freshness {
    let last_updated = match fs::read_to_string(metadata_path) {
        Ok(contents) => parse_metadata_modified(&contents).unwrap_or_default(),
        Err(e) => {
            warn!("Could not read dataset metadata {}: {}", metadata_path.display(), e);
            String::new()
        }
    };

    let last_downloaded = match fs::metadata(metadata_path).and_then(|m| m.modified()) {
        Ok(modified) => DateTime::<Utc>::from(modified)
            .with_timezone(&tz)
            .format(TIME_FORMAT)
            .to_string(),
        Err(e) => {
            warn!("Could not stat dataset metadata {}: {}", metadata_path.display(), e);
            String::new()
        }
    };

    Freshness {
        last_updated,
        last_downloaded,
    }
}

/// First line of the last-complete-download marker, trimmed.
pub fn read_last_no_skip(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(contents) => contents.lines().next().unwrap_or_default().trim().to_string(),
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_timestamp() {
        assert_eq!(compact_timestamp("2024-05-01T10:42:17.123456"), "202405011042");
        assert_eq!(compact_timestamp("2024-05-01"), "20240501");
    }

    #[test]
    fn test_parse_metadata_modified() {
        let doc = r#"{"success": true, "result": {"metadata_modified": "2024-05-01T10:42:17.123456"}}"#;
        assert_eq!(parse_metadata_modified(doc).as_deref(), Some("202405011042"));
        assert_eq!(parse_metadata_modified(r#"{"result": {}}"#), None);
        assert_eq!(parse_metadata_modified("not json"), None);
    }

    #[test]
    fn test_missing_files_degrade_to_empty() {
        let missing = std::env::temp_dir().join("meteo_freshness_does_not_exist.json");
        assert_eq!(read_freshness(&missing, chrono_tz::Europe::Riga), Freshness::default());
        assert_eq!(read_last_no_skip(&missing), "");
    }

    #[test]
    fn test_reads_files_from_disk() {
        let dir = std::env::temp_dir().join(format!("meteo_freshness_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let metadata = dir.join("metadata.json");
        let marker = dir.join("last_updated");
        fs::write(&metadata, r#"{"result": {"metadata_modified": "2024-05-01T10:42:17"}}"#).unwrap();
        fs::write(&marker, "202405011000  \n202404300000\n").unwrap();

        let freshness = read_freshness(&metadata, chrono_tz::Europe::Riga);
        assert_eq!(freshness.last_updated, "202405011042");
        assert_eq!(freshness.last_downloaded.len(), 12);
        assert_eq!(read_last_no_skip(&marker), "202405011000");

        fs::remove_dir_all(&dir).ok();
    }
}
