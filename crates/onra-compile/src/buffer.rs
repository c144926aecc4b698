//! Append buffers for `.data` and `.model` emission.
//!
//! [`DataBuf`] collects the text of one data (and optionally model) file;
//! the builder functions in [`crate::builders`] only ever append through it
//! so every section shares the same layout rules: long lists are wrapped
//! ten-to-a-line with a `# num=` header, names are emitted in natural order
//! unless a builder asks otherwise.

use onra_core::text::{natural_cmp, sort_natural};
use std::collections::HashMap;

/// Buffer for one generated data file, plus the model-file lines when the
/// caller is also writing the shared model.
#[derive(Debug)]
pub struct DataBuf {
    data: String,
    model: Option<String>,
}

impl DataBuf {
    pub fn new(write_model: bool) -> DataBuf {
        DataBuf {
            data: String::new(),
            model: if write_model { Some(String::new()) } else { None },
        }
    }

    /// `set NAME :=`
    pub fn set_def(&mut self, name: &str) {
        self.data.push_str(&format!("set {name} :="));
    }

    /// `set NAME[IDX] :=`
    pub fn set_def_idx(&mut self, name: &str, idx: &str) {
        self.data.push_str(&format!("set {name}[{idx}] :="));
    }

    /// `param NAME default D :=` with a line break.
    pub fn param_def(&mut self, name: &str, default: &str) {
        self.data
            .push_str(&format!("param {name} default {default} :=\n"));
    }

    /// `param NAME := `
    pub fn param(&mut self, name: &str) {
        self.data.push_str(&format!("param {name} := "));
    }

    pub fn push(&mut self, txt: &str) {
        self.data.push_str(txt);
    }

    /// `;` and a line break, closing the current statement.
    pub fn close(&mut self) {
        self.data.push_str(";\n");
    }

    /// Append a list of names, wrapped ten-to-a-line when long.
    pub fn list(&mut self, values: &[String], sort: bool) {
        if values.is_empty() {
            return;
        }
        let mut values = values.to_vec();
        if sort {
            sort_natural(&mut values);
        }
        let long = values.len() > 10;
        if long {
            self.data.push_str(&format!("\t# num={}", values.len()));
        }
        for (n, name) in values.iter().enumerate() {
            if long && n % 10 == 0 {
                self.data.push_str("\n\t");
            } else {
                self.data.push(' ');
            }
            self.data.push_str(name);
        }
    }

    /// Append a line to the model buffer, if one is being written.
    pub fn model_line(&mut self, txt: &str) {
        if let Some(model) = self.model.as_mut() {
            model.push_str(txt);
            model.push('\n');
        }
    }

    pub fn writes_model(&self) -> bool {
        self.model.is_some()
    }

    /// `[INPORT,INCH,*,OUTCH] OUTPORT IDX ...` blocks, one line per in-port.
    pub fn vt_block_ijl(&mut self, in_ch: &str, out_ch: &str, table: &PortVarIdx) {
        for (in_port, outs) in table.iter() {
            self.data.push_str(&format!("[{in_port},{in_ch},*,{out_ch}]"));
            let mut values = Vec::with_capacity(outs.len() * 2);
            for (out_port, idx) in outs {
                values.push(out_port.clone());
                values.push(idx.to_string());
            }
            self.list(&values, false);
            self.data.push('\n');
        }
    }

    /// `[INPORT,INCH,OUTPORT,OUTCH] IDX` lines.
    pub fn vt_block_ijkl(&mut self, in_ch: &str, out_ch: &str, table: &PortVarIdx) {
        for (in_port, outs) in table.iter() {
            for (out_port, idx) in outs {
                self.data
                    .push_str(&format!("[{in_port},{in_ch},{out_port},{out_ch}] {idx}\n"));
            }
        }
    }

    pub fn into_parts(self) -> (String, Option<String>) {
        (self.data, self.model)
    }

    pub fn data(&self) -> &str {
        &self.data
    }
}

/// Per-in-port lists of `(out-port, var-id)` used to emit `vt`-shaped
/// parameter blocks. Keeps insertion order of in-ports.
#[derive(Debug, Default)]
pub struct PortVarIdx {
    order: Vec<String>,
    map: HashMap<String, Vec<(String, u32)>>,
}

impl PortVarIdx {
    pub fn new() -> PortVarIdx {
        PortVarIdx::default()
    }

    /// Append an entry; duplicates are kept.
    pub fn add(&mut self, in_port: &str, out_port: &str, idx: u32) {
        debug_assert!(idx >= crate::vartable::MIN_VT_IDX, "invalid vt idx {idx}");
        if !self.map.contains_key(in_port) {
            self.order.push(in_port.to_string());
        }
        self.map
            .entry(in_port.to_string())
            .or_default()
            .push((out_port.to_string(), idx));
    }

    /// Append an entry, dropping exact duplicates.
    pub fn add_unique(&mut self, in_port: &str, out_port: &str, idx: u32) {
        let exists = self
            .map
            .get(in_port)
            .map(|v| v.iter().any(|(p, i)| p == out_port && *i == idx))
            .unwrap_or(false);
        if !exists {
            self.add(in_port, out_port, idx);
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.map.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &Vec<(String, u32)>)> {
        self.order.iter().map(move |k| (k, &self.map[k]))
    }

    /// Sort each in-port's out list naturally (used where emission order is
    /// not already the insertion order).
    pub fn sort_outs(&mut self) {
        for outs in self.map.values_mut() {
            outs.sort_by(|a, b| natural_cmp(&a.0, &b.0).then(a.1.cmp(&b.1)));
        }
    }
}
