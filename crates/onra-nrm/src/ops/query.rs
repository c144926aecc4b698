//! The `query` operation: list reservations, optionally including
//! store-only entries.

use crate::handler::Handler;
use crate::ops::options::{self, Arity, OptSpec};
use crate::registry::Reservation;
use anyhow::{anyhow, Result};
use onra_core::topology::Topology;

pub const USAGE: &str = "-g <globalid | id> [-q] [-db]";

fn spec() -> OptSpec {
    OptSpec::new(&[("g", Arity::One), ("q", Arity::None), ("db", Arity::None)])
}

fn dump_reservations(
    topo: &Topology,
    list: &[Reservation],
    quiet: bool,
) -> Result<String> {
    let mut buf: Vec<String> = Vec::new();
    for rsv in list {
        buf.push("----------------------------------------------------".to_string());
        rsv.dump(topo, &mut buf);
        if !quiet {
            buf.push(rsv.route.route_text(topo, rsv.src.port)?);
        }
    }
    Ok(buf.join("\n"))
}

pub fn run(handler: &Handler, args: &[&str]) -> Result<String> {
    let opts = options::parse(&spec(), args)?;
    let topo = handler.engine.topo.clone();
    let quiet = opts.flag("q");
    let db_opt = opts.flag("db");

    let registry = handler.registry.read().expect("registry lock poisoned");
    let list: Vec<Reservation> = match opts.one("g") {
        Some(id) => {
            let global_id = if db_opt {
                if !id.starts_with("urn") {
                    return Err(anyhow!(
                        "when specifying the -db option, please specify globalid as -g"
                    ));
                }
                Some(id.to_string())
            } else {
                registry.resolve_global_id(id)
            };
            let rsv = global_id.as_deref().and_then(|gid| {
                registry.get(gid).cloned().or_else(|| {
                    if db_opt {
                        stored_reservation(handler, &topo, gid)
                    } else {
                        None
                    }
                })
            });
            match rsv {
                Some(rsv) => vec![rsv],
                None => return Ok(format!("cannot find reservation: {id}")),
            }
        }
        None => {
            let mut list: Vec<Reservation> =
                registry.all().into_iter().cloned().collect();
            if db_opt {
                // Store-only entries come after the live ones.
                for stored in onra_io::store::load_store(&handler.store_path)? {
                    if registry.get(&stored.global_id).is_none() {
                        list.push(Reservation::from_stored(&topo, &stored)?);
                    }
                }
            }
            list
        }
    };

    let reply = dump_reservations(&topo, &list, quiet)?;
    if reply.is_empty() {
        return Ok("No Reservation".to_string());
    }
    Ok(reply)
}

fn stored_reservation(handler: &Handler, topo: &Topology, global_id: &str) -> Option<Reservation> {
    onra_io::store::load_store(&handler.store_path)
        .ok()?
        .into_iter()
        .find(|r| r.global_id == global_id)
        .and_then(|stored| Reservation::from_stored(topo, &stored).ok())
}
