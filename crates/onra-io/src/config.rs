//! Configuration from `config/param.json`.
//!
//! Every key is optional; missing keys take the documented defaults and a
//! missing file behaves like an empty object. Directory values are resolved
//! relative to the top directory. The historical config writer emitted
//! `nrm_Port` with a capital P, so both casings are accepted; the template
//! file names are used exactly as configured.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

fn default_logger() -> String {
    "enable".to_string()
}
fn default_log_config() -> String {
    "log_config.yaml".to_string()
}
fn default_topo_xml() -> String {
    "topo.xml".to_string()
}
fn default_glpk_dir() -> String {
    "glpk".to_string()
}
fn default_db_dir() -> String {
    "db".to_string()
}
fn default_nrm_host() -> String {
    "localhost".to_string()
}
fn default_nrm_port() -> u16 {
    9500
}
fn default_pf_tmp() -> String {
    "pf-template.model".to_string()
}
fn default_solvec_tmp() -> String {
    "solvec-template.model".to_string()
}

/// The recognized keys of `param.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    #[serde(default = "default_logger")]
    pub logger: String,
    #[serde(default = "default_log_config")]
    pub log_config: String,
    #[serde(default = "default_topo_xml")]
    pub topo_xml: String,
    #[serde(default = "default_glpk_dir")]
    pub glpk_dir: String,
    #[serde(default = "default_db_dir")]
    pub db_dir: String,
    #[serde(default = "default_nrm_host")]
    pub nrm_host: String,
    #[serde(default = "default_nrm_port", alias = "nrm_Port")]
    pub nrm_port: u16,
    #[serde(default = "default_pf_tmp")]
    pub pf_tmp_model: String,
    #[serde(default = "default_solvec_tmp")]
    pub solvec_tmp_model: String,
    #[serde(default)]
    pub num_comps: usize,

    /// Top directory all relative paths resolve against. Not read from the
    /// file; set by [`Params::load`].
    #[serde(skip)]
    pub top_dir: PathBuf,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            logger: default_logger(),
            log_config: default_log_config(),
            topo_xml: default_topo_xml(),
            glpk_dir: default_glpk_dir(),
            db_dir: default_db_dir(),
            nrm_host: default_nrm_host(),
            nrm_port: default_nrm_port(),
            pf_tmp_model: default_pf_tmp(),
            solvec_tmp_model: default_solvec_tmp(),
            num_comps: 0,
            top_dir: PathBuf::from("."),
        }
    }
}

impl Params {
    /// Load `config/param.json` under `top_dir`. A missing file yields the
    /// defaults; an unparsable file is a configuration error.
    pub fn load(top_dir: &Path) -> Result<Params> {
        let path = top_dir.join("config").join("param.json");
        let mut params = if path.exists() {
            let file = File::open(&path)
                .with_context(|| format!("opening config '{}'", path.display()))?;
            let params: Params = serde_json::from_reader(file)
                .with_context(|| format!("parsing config '{}'", path.display()))?;
            info!("load config: {}", path.display());
            params
        } else {
            info!("no config at {}, using defaults", path.display());
            Params::default()
        };
        params.top_dir = top_dir.to_path_buf();
        Ok(params)
    }

    /// Resolve a configured path against the top directory.
    pub fn resolve(&self, value: &str) -> PathBuf {
        let p = Path::new(value);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.top_dir.join(p)
        }
    }

    pub fn glpk_dir(&self) -> PathBuf {
        self.resolve(&self.glpk_dir)
    }

    pub fn db_dir(&self) -> PathBuf {
        self.resolve(&self.db_dir)
    }

    /// `topo/<topo_xml>` under the top directory.
    pub fn topo_file(&self) -> PathBuf {
        self.top_dir.join("topo").join(&self.topo_xml)
    }

    /// `<glpk_dir>/ac`: the available-connections directory.
    pub fn ac_dir(&self) -> PathBuf {
        self.glpk_dir().join("ac")
    }

    /// `<glpk_dir>/glpk`: skeleton model/data directory.
    pub fn skeleton_dir(&self) -> PathBuf {
        self.glpk_dir().join("glpk")
    }

    /// `<glpk_dir>/tmp`: per-request working directories.
    pub fn tmp_dir(&self) -> PathBuf {
        self.glpk_dir().join("tmp")
    }

    /// `<db_dir>/reserved.json`: the durable reservation store.
    pub fn store_file(&self) -> PathBuf {
        self.db_dir().join("reserved.json")
    }
}
