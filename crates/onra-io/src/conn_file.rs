//! Reading and writing `ac/<model>.conn.txt` files: one
//! `(in_pin,in_channel,out_pin,out_channel)` tuple per line.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use onra_core::conn::ConnEntry;
use onra_core::text::escape;
use regex::Regex;
use std::fs;
use std::path::Path;

static CONN_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([0-9]+),([^,]+),([0-9]+),([^,)]+)\)").unwrap());

/// `<escaped model>.conn.txt`
pub fn conn_filename(model: &str) -> String {
    format!("{}.conn.txt", escape(model))
}

/// `<escaped model>.model`
pub fn model_filename(model: &str) -> String {
    format!("{}.model", escape(model))
}

/// Parse conn-file text. Lines without a tuple are ignored, which lets the
/// files carry solver chatter around the tuples.
pub fn parse_conn_text(text: &str) -> Vec<ConnEntry> {
    let mut entries = Vec::new();
    for line in text.lines() {
        if let Some(caps) = CONN_LINE.captures(line) {
            let in_pin: u32 = caps[1].parse().unwrap_or(0);
            let out_pin: u32 = caps[3].parse().unwrap_or(0);
            entries.push(ConnEntry::new(in_pin, &caps[2], out_pin, &caps[4]));
        }
    }
    entries
}

pub fn read_conn_file(path: &Path) -> Result<Vec<ConnEntry>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading conn file '{}'", path.display()))?;
    Ok(parse_conn_text(&text))
}

/// Write a conn file, one tuple per line.
pub fn write_conn_file(path: &Path, entries: &[ConnEntry]) -> Result<()> {
    let mut out = String::new();
    for e in entries {
        out.push_str(&format!(
            "({},{},{},{})\n",
            e.in_pin, e.in_ch, e.out_pin, e.out_ch
        ));
    }
    fs::write(path, out).with_context(|| format!("writing conn file '{}'", path.display()))
}
