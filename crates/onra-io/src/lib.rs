//! # onra-io: input/output for the ONRA toolchain
//!
//! Loads the topology XML into the [`onra_core::Topology`] model, reads and
//! writes the per-device `ac/*.conn.txt` files, loads `config/param.json`,
//! and keeps the durable reservation store (`db/reserved.json`).

pub mod config;
pub mod conn_file;
pub mod store;
pub mod topo_xml;

pub use config::Params;
pub use store::{StoredEntry, StoredReservation};
