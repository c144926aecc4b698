//! The `terminate` and `TERMINATEALL` operations.

use crate::handler::Handler;
use crate::ops::options::{self, Arity, OptSpec};
use anyhow::{anyhow, Result};

pub const USAGE: &str = "-g <globalid | id> [-db]";
pub const USAGE_ALL: &str = "[-db]";

fn spec() -> OptSpec {
    OptSpec::new(&[("g", Arity::One), ("db", Arity::None)])
}

fn spec_all() -> OptSpec {
    OptSpec::new(&[("db", Arity::None)])
}

/// Remove a stored record, keeping the rest of the store intact.
fn delete_from_store(handler: &Handler, global_id: &str) -> Result<bool> {
    let mut records = onra_io::store::load_store(&handler.store_path)?;
    let before = records.len();
    records.retain(|r| r.global_id != global_id);
    if records.len() == before {
        return Ok(false);
    }
    onra_io::store::save_store(&handler.store_path, &records)?;
    Ok(true)
}

pub fn run(handler: &Handler, args: &[&str]) -> Result<String> {
    let opts = options::parse(&spec(), args)?;
    let id = opts.required("g")?;
    let db_opt = opts.flag("db");

    let mut registry = handler.registry.write().expect("registry lock poisoned");
    let mut deleted_mem = false;
    let mut deleted_db = false;
    if db_opt {
        if !id.starts_with("urn") {
            return Err(anyhow!(
                "when specifying the -db option, please specify globalid as -g"
            ));
        }
        deleted_mem = registry.delete(id);
        deleted_db = delete_from_store(handler, id)?;
    } else if let Some(global_id) = registry.resolve_global_id(id) {
        deleted_mem = registry.delete(&global_id);
    }

    match (deleted_mem, deleted_db) {
        (false, false) => Ok(format!("cannot find reservation: {id}")),
        (true, true) => Ok(format!("delete from memory and DB: {id}")),
        (true, false) => Ok(format!("delete from memory: {id}")),
        (false, true) => Ok(format!("delete from DB: {id}")),
    }
}

/// `TERMINATEALL`: every reservation vanishes atomically.
pub fn run_all(handler: &Handler, args: &[&str]) -> Result<String> {
    let opts = options::parse(&spec_all(), args)?;
    let mut registry = handler.registry.write().expect("registry lock poisoned");
    registry.delete_all();
    if opts.flag("db") {
        onra_io::store::save_store(&handler.store_path, &[])?;
        Ok("delete all reservation from memory and DB".to_string())
    } else {
        Ok("delete all reservation from memory".to_string())
    }
}
