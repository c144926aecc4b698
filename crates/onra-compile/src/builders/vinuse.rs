//! The `set Vinuse :=` solvec section: ports of the target components that
//! the global pathfinding solution already uses.

use crate::buffer::DataBuf;
use crate::instance::TupleRef;
use onra_core::topology::{CompId, Topology};
use std::collections::{BTreeSet, HashSet};

pub fn build_vinuse(
    buf: &mut DataBuf,
    topo: &Topology,
    used_x: &[TupleRef],
    target_comps: &HashSet<CompId>,
) {
    let mut used_ports: BTreeSet<String> = BTreeSet::new();
    for entry in used_x {
        let (Some(src), Some(dst)) = (
            topo.port_by_name(&entry.src_port),
            topo.port_by_name(&entry.dst_port),
        ) else {
            continue;
        };
        if !target_comps.contains(&topo.comp_of_port(src))
            || !target_comps.contains(&topo.comp_of_port(dst))
        {
            continue;
        }
        used_ports.insert(entry.src_port.clone());
        used_ports.insert(entry.dst_port.clone());
    }
    buf.set_def("Vinuse");
    buf.list(&used_ports.into_iter().collect::<Vec<String>>(), true);
    buf.close();
}
