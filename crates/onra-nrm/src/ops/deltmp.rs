//! The `deltmp` operation: toggle deletion of per-request solver temp
//! directories.

use crate::handler::Handler;
use crate::ops::options;
use anyhow::Result;
use std::sync::atomic::Ordering;

pub const USAGE: &str = "[true|false]";

pub fn run(handler: &Handler, args: &[&str]) -> Result<String> {
    if let Some(value) = options::parse_true_false(args)? {
        handler.engine.deltmp.store(value, Ordering::SeqCst);
    }
    Ok(format!(
        "Delete GLPK temporary files : {}",
        handler.engine.deltmp.load(Ordering::SeqCst)
    ))
}
