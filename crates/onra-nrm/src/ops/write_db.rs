//! The `writeDB` operation: persist the live registry to the durable
//! store. The in-memory state is untouched when the write fails.

use crate::handler::Handler;
use anyhow::Result;
use tracing::warn;

pub const USAGE: &str = "";

pub fn run(handler: &Handler, args: &[&str]) -> Result<String> {
    let mut msg: Vec<String> = Vec::new();
    if !args.is_empty() {
        let note = format!("writeDB has no options, so options are ignored: {args:?}");
        warn!("{note}");
        msg.push(note);
    }
    let topo = handler.engine.topo.clone();
    let mut registry = handler.registry.write().expect("registry lock poisoned");
    let written = registry.write_store(&topo, &handler.store_path)?;
    msg.push(format!("{written} entries written to the DB"));
    Ok(msg.join("\n"))
}
