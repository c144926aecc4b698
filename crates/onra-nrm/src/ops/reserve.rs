//! The `reserve` operation: find a route, commit it to the registry and
//! report the assigned ids.

use crate::handler::Handler;
use crate::ops::{self, options};
use crate::registry::{Registry, Reservation};
use crate::route::PortChannel;
use anyhow::Result;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

pub const USAGE: &str = ops::PATH_USAGE;

pub fn run(handler: &Handler, args: &[&str]) -> Result<String> {
    let opts = options::parse(&ops::path_opt_spec(), args)?;
    let (query, wdmsa_used) = ops::build_query_args(handler, &opts)?;
    let topo = handler.engine.topo.clone();

    // Mutating operation: the registry stays locked for the whole solve so
    // two reserves can never pick the same tuples.
    let mut registry = handler.registry.write().expect("registry lock poisoned");
    let used_route = registry.used_x_route();
    let used_conn = registry.used_conn_route();

    let work_id = Uuid::new_v4().to_string();
    let (route, warnings) = handler
        .engine
        .find_route(&query, used_route, used_conn, &work_id)?;

    let path = route.make_path_list(&topo, query.src, true)?;
    let (src_pc, dst_pc) = match (path.first(), path.last()) {
        (Some(&first), Some(&last)) => (first, last),
        // Zero-hop commit: record the requested endpoints on the first
        // trial channel.
        _ => {
            let pc = PortChannel {
                port: query.src,
                ch: query.channels[0],
            };
            (
                pc,
                PortChannel {
                    port: query.dst,
                    ch: query.channels[0],
                },
            )
        }
    };

    let rsv = Reservation {
        global_id: Registry::new_global_id(),
        src: src_pc,
        dst: dst_pc,
        ero: query
            .ero
            .iter()
            .map(|&p| topo.port(p).full_name.clone())
            .collect(),
        channels: query
            .channels
            .iter()
            .map(|&ch| topo.channel(ch).full_no.clone())
            .collect(),
        route,
        bidi: query.bidi,
        wdmsa: wdmsa_used,
        creation_time: Utc::now(),
        written_db: false,
    };
    let global_id = rsv.global_id.clone();
    let short_id = registry.add(rsv);

    let mut msg = String::new();
    if !warnings.is_empty() {
        msg.push_str(&warnings.join("\n"));
        msg.push('\n');
    }
    msg.push_str(&format!("id={short_id}, globalId={global_id}"));
    info!("{msg}");
    Ok(msg)
}
