//! The `param pair default 0 :=` section: for each port-pair direction, the
//! var id of its twin. The pathfinding model uses this to forbid taking
//! both directions of a link unless the request is bidirectional.

use crate::buffer::{DataBuf, PortVarIdx};
use crate::vartable::{VarTable, NO_VT_IDX};
use anyhow::{bail, Result};
use onra_core::port::PortPair;
use onra_core::topology::{ChannelId, PortId, Topology};
use std::collections::HashSet;
use tracing::warn;

fn twin_idx(topo: &Topology, pair: &PortPair, ch_name: &str, vt: &VarTable) -> u32 {
    let src = &topo.port(PortId(pair.src)).full_name;
    let dst = &topo.port(PortId(pair.dst)).full_name;
    match vt.get_idx(src, ch_name, dst, ch_name) {
        Some(idx) => idx,
        None => {
            warn!("has no idx {src}/{ch_name}/{dst}/{ch_name}");
            NO_VT_IDX
        }
    }
}

pub fn build_pair(
    buf: &mut DataBuf,
    topo: &Topology,
    channels: &[ChannelId],
    target_ports: &HashSet<PortId>,
    vt: &VarTable,
) -> Result<()> {
    buf.param_def("pair", "0");
    for &ch in channels {
        let ch_name = topo.channel(ch).full_no.clone();
        let mut table = PortVarIdx::new();
        for (pairkey, pairs) in topo.pairkey_groups() {
            if pairs.len() != 2 {
                bail!("port pair size should be 2 : {pairkey}");
            }
            let (pair0, pair1) = (pairs[0], pairs[1]);
            if !target_ports.contains(&PortId(pair0.src))
                || !target_ports.contains(&PortId(pair1.src))
            {
                continue;
            }
            // Each direction points at the var id of the opposite one.
            table.add(
                &topo.port(PortId(pair0.src)).full_name,
                &topo.port(PortId(pair0.dst)).full_name,
                twin_idx(topo, pair1, &ch_name, vt),
            );
            table.add(
                &topo.port(PortId(pair1.src)).full_name,
                &topo.port(PortId(pair1.dst)).full_name,
                twin_idx(topo, pair0, &ch_name, vt),
            );
        }
        buf.vt_block_ijkl(&ch_name, &ch_name, &table);
    }
    buf.close();
    Ok(())
}
