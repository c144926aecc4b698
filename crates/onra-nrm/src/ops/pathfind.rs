//! The `pathfind` operation: compute and render a route without touching
//! the registry.

use crate::handler::Handler;
use crate::ops::{self, options};
use anyhow::Result;
use uuid::Uuid;

pub const USAGE: &str = ops::PATH_USAGE;

pub fn run(handler: &Handler, args: &[&str]) -> Result<String> {
    let opts = options::parse(&ops::path_opt_spec(), args)?;
    let (query, _) = ops::build_query_args(handler, &opts)?;
    let topo = handler.engine.topo.clone();

    // Read-only: other pathfind/query requests may run concurrently.
    let (used_route, used_conn) = {
        let registry = handler.registry.read().expect("registry lock poisoned");
        (registry.used_x_route(), registry.used_conn_route())
    };

    let work_id = Uuid::new_v4().to_string();
    let (route, warnings) = handler
        .engine
        .find_route(&query, used_route, used_conn, &work_id)?;

    let mut msg = String::new();
    if !warnings.is_empty() {
        msg.push_str(&warnings.join("\n"));
        msg.push('\n');
    }
    msg.push_str(&route.route_text(&topo, query.src)?);
    Ok(msg)
}
