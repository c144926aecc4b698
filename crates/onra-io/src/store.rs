//! Durable reservation store: `<db_dir>/reserved.json`.
//!
//! The store is a single JSON array of reservation records replaced
//! atomically on every write (write to a temp file in the same directory,
//! then rename). A missing file is an empty registry.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;

/// One route tuple of a stored reservation. Ports and channels are kept by
/// name (`"{port}@{channel}"` pairs are split into the two fields) so the
/// loader can check them against the current topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub src_port: String,
    pub src_ch: String,
    pub dst_port: String,
    pub dst_ch: String,
    pub x: bool,
    pub c: bool,
    pub go: bool,
}

/// One reservation record: the canonical request plus the selected route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReservation {
    pub global_id: String,
    pub src_port: String,
    pub src_ch: String,
    pub dst_port: String,
    pub dst_ch: String,
    /// ERO port names of the request, in order.
    #[serde(default)]
    pub ero: Vec<String>,
    /// Channel names the request tried.
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub bidi: bool,
    #[serde(default)]
    pub wdmsa: bool,
    pub creation_time: DateTime<Utc>,
    pub route: Vec<StoredEntry>,
}

/// Load the store. A missing file yields an empty list.
pub fn load_store(path: &Path) -> Result<Vec<StoredReservation>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file =
        File::open(path).with_context(|| format!("opening store '{}'", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("parsing store '{}'", path.display()))
}

/// Replace the store atomically.
pub fn save_store(path: &Path, records: &[StoredReservation]) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("store path '{}' has no parent", path.display()))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("creating store directory '{}'", dir.display()))?;
    let tmp = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp)
            .with_context(|| format!("creating store temp '{}'", tmp.display()))?;
        serde_json::to_writer_pretty(file, records)
            .with_context(|| format!("writing store temp '{}'", tmp.display()))?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("replacing store '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str) -> StoredReservation {
        StoredReservation {
            global_id: format!("urn:uuid:{id}"),
            src_port: "A_1".into(),
            src_ch: "WDM32_1".into(),
            dst_port: "C_2".into(),
            dst_ch: "WDM32_1".into(),
            ero: Vec::new(),
            channels: vec!["WDM32_1".into()],
            bidi: false,
            wdmsa: false,
            creation_time: Utc::now(),
            route: vec![StoredEntry {
                src_port: "A_1".into(),
                src_ch: "WDM32_1".into(),
                dst_port: "C_2".into(),
                dst_ch: "WDM32_1".into(),
                x: true,
                c: true,
                go: true,
            }],
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = load_store(&dir.path().join("db/reserved.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db/reserved.json");
        let records = vec![record("aaa"), record("bbb")];
        save_store(&path, &records).unwrap();
        let loaded = load_store(&path).unwrap();
        assert_eq!(loaded, records);
        // No temp file left behind.
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn save_replaces_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reserved.json");
        save_store(&path, &[record("aaa")]).unwrap();
        save_store(&path, &[]).unwrap();
        assert!(load_store(&path).unwrap().is_empty());
    }

    #[test]
    fn corrupt_store_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reserved.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load_store(&path).is_err());
    }
}
