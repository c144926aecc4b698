//! The variable table `vt`: the injective map from feasible
//! `(in-port, in-channel, out-port, out-channel)` tuples to dense positive
//! ILP variable ids. Zero means "no variable".
//!
//! The table built during skeleton emission is persisted next to the
//! skeleton (`<name>.vt.json`) so instance assembly restores it instead of
//! re-deriving it per request.

use anyhow::{Context, Result};
use onra_core::text::{natural_cmp, tuple_key, tuple_key_ijk};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Smallest assigned variable id.
pub const MIN_VT_IDX: u32 = 1;
/// The "no variable" id.
pub const NO_VT_IDX: u32 = 0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VarTable {
    conn2idx: HashMap<String, u32>,
    flow_inch: HashMap<String, BTreeSet<String>>,
    ijk2ls: HashMap<String, BTreeSet<String>>,
    next_idx: u32,
    /// The rendered `param vt ...` section, kept so skeleton emission can
    /// reuse the text it was built from.
    #[serde(default)]
    pub text: String,
}

impl VarTable {
    pub fn new() -> VarTable {
        VarTable {
            next_idx: MIN_VT_IDX,
            ..Default::default()
        }
    }

    /// Register a tuple and return its fresh variable id.
    pub fn add(&mut self, in_port: &str, in_ch: &str, out_port: &str, out_ch: &str) -> u32 {
        let key = tuple_key(in_port, in_ch, out_port, out_ch);
        let idx = self.next_idx;
        self.conn2idx.insert(key, idx);
        self.flow_inch
            .entry(in_port.to_string())
            .or_default()
            .insert(in_ch.to_string());
        self.flow_inch
            .entry(out_port.to_string())
            .or_default()
            .insert(out_ch.to_string());
        self.ijk2ls
            .entry(tuple_key_ijk(in_port, in_ch, out_port))
            .or_default()
            .insert(out_ch.to_string());
        self.next_idx += 1;
        idx
    }

    pub fn size(&self) -> usize {
        self.conn2idx.len()
    }

    pub fn get_idx(&self, in_port: &str, in_ch: &str, out_port: &str, out_ch: &str) -> Option<u32> {
        self.conn2idx
            .get(&tuple_key(in_port, in_ch, out_port, out_ch))
            .copied()
    }

    pub fn has_connection(&self, in_port: &str, in_ch: &str, out_port: &str, out_ch: &str) -> bool {
        self.get_idx(in_port, in_ch, out_port, out_ch).is_some()
    }

    /// Channels that may appear on a port, in natural order.
    pub fn flow_in_channels(&self, port: &str) -> Vec<String> {
        let mut chs: Vec<String> = self
            .flow_inch
            .get(port)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        chs.sort_by(|a, b| natural_cmp(a, b));
        chs
    }

    /// Out-channels feasible for `(in-port, in-channel, out-port)`.
    pub fn flow_out_channels(&self, in_port: &str, in_ch: &str, out_port: &str) -> Vec<String> {
        let mut chs: Vec<String> = self
            .ijk2ls
            .get(&tuple_key_ijk(in_port, in_ch, out_port))
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        chs.sort_by(|a, b| natural_cmp(a, b));
        chs
    }

    /// Persist next to a skeleton file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)
            .with_context(|| format!("creating vt file '{}'", path.display()))?;
        serde_json::to_writer(file, self)
            .with_context(|| format!("writing vt file '{}'", path.display()))
    }

    /// Restore a persisted table; a missing or unreadable file yields `None`
    /// with a warning so the caller rebuilds.
    pub fn load(path: &Path) -> Option<VarTable> {
        if !path.is_file() {
            return None;
        }
        match fs::File::open(path)
            .map_err(anyhow::Error::from)
            .and_then(|f| serde_json::from_reader(f).map_err(anyhow::Error::from))
        {
            Ok(vt) => Some(vt),
            Err(e) => {
                warn!("load {} is failed :{e}", path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ids_are_dense_and_injective() {
        let mut vt = VarTable::new();
        let a = vt.add("A_2", "WDM32_1", "B_1", "WDM32_1");
        let b = vt.add("B_4", "WDM32_1", "C_1", "WDM32_1");
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(vt.size(), 2);
        assert_eq!(vt.get_idx("A_2", "WDM32_1", "B_1", "WDM32_1"), Some(1));
        assert_eq!(vt.get_idx("A_2", "WDM32_2", "B_1", "WDM32_2"), None);
    }

    #[test]
    fn flow_channel_lookups() {
        let mut vt = VarTable::new();
        vt.add("A_2", "WDM32_2", "B_1", "WDM32_2");
        vt.add("A_2", "WDM32_10", "B_1", "WDM32_10");
        assert_eq!(vt.flow_in_channels("A_2"), vec!["WDM32_2", "WDM32_10"]);
        assert_eq!(
            vt.flow_out_channels("A_2", "WDM32_2", "B_1"),
            vec!["WDM32_2"]
        );
        assert!(vt.flow_out_channels("A_2", "WDM32_3", "B_1").is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pf_x.vt.json");
        let mut vt = VarTable::new();
        vt.add("A_2", "WDM32_1", "B_1", "WDM32_1");
        vt.text = "param vt default 0 :=\n".to_string();
        vt.save(&path).unwrap();
        let back = VarTable::load(&path).unwrap();
        assert_eq!(back.size(), 1);
        assert_eq!(back.get_idx("A_2", "WDM32_1", "B_1", "WDM32_1"), Some(1));
        assert_eq!(back.text, vt.text);
    }

    #[test]
    fn load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(VarTable::load(&dir.path().join("nope.vt.json")).is_none());
    }
}
