//! The `dumpglpsol` operation: toggle raw solver output logging.

use crate::handler::Handler;
use crate::ops::options;
use anyhow::Result;
use std::sync::atomic::Ordering;

pub const USAGE: &str = "[true|false]";

pub fn run(handler: &Handler, args: &[&str]) -> Result<String> {
    if let Some(value) = options::parse_true_false(args)? {
        handler.engine.dumpglpsol.store(value, Ordering::SeqCst);
    }
    Ok(format!(
        "Dump glpsol output : {}",
        handler.engine.dumpglpsol.load(Ordering::SeqCst)
    ))
}
