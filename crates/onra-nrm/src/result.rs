//! Interpreting solver solutions as routes.

use crate::route::{PortChannel, Route, RouteEntry};
use anyhow::{anyhow, Result};
use onra_core::topology::Topology;
use onra_solver::Solution;

fn resolve(topo: &Topology, port: &str, ch: &str) -> Result<PortChannel> {
    Ok(PortChannel {
        port: topo
            .port_by_name(port)
            .ok_or_else(|| anyhow!("solver output names unknown port {port}"))?,
        ch: topo
            .channel_by_full_no(ch)
            .ok_or_else(|| anyhow!("solver output names unknown channel {ch}"))?,
    })
}

/// A pathfinding solution: rows with both `x` and `c` set become forward
/// route entries.
pub fn pf_route(topo: &Topology, sol: &Solution) -> Result<Route> {
    let mut entries = Vec::new();
    for row in &sol.rows {
        if row.x != Some(true) || !row.c {
            continue;
        }
        entries.push(RouteEntry {
            src: resolve(topo, &row.src_port, &row.src_ch)?,
            dst: resolve(topo, &row.dst_port, &row.dst_ch)?,
            x: true,
            c: true,
            go: true,
        });
    }
    Ok(Route::from_entries(entries))
}

/// A device sub-solve solution: rows with `c` set become activation
/// entries (`x` stays false).
pub fn solvec_route(topo: &Topology, sol: &Solution) -> Result<Route> {
    let mut entries = Vec::new();
    for row in &sol.rows {
        if row.x.is_some() || !row.c {
            continue;
        }
        entries.push(RouteEntry {
            src: resolve(topo, &row.src_port, &row.src_ch)?,
            dst: resolve(topo, &row.dst_port, &row.dst_ch)?,
            x: false,
            c: true,
            go: true,
        });
    }
    Ok(Route::from_entries(entries))
}
