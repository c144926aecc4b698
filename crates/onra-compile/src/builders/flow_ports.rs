//! The `set FlowInPorts[PORT] :=` and `set FlowOutPorts[PORT] :=` sections.

use crate::buffer::DataBuf;
use onra_core::topology::{CompId, PortId, Topology};
use std::collections::HashSet;

pub fn build_flow_ports(
    buf: &mut DataBuf,
    topo: &Topology,
    ports: &[PortId],
    target_comps: &HashSet<CompId>,
    solvec: bool,
) {
    let port_set: HashSet<PortId> = ports.iter().copied().collect();
    for &p in ports {
        if solvec && !target_comps.contains(&topo.comp_of_port(p)) {
            continue;
        }
        let full_name = topo.port(p).full_name.clone();

        buf.set_def_idx("FlowInPorts", &full_name);
        let ins: Vec<String> = topo
            .flow_ins(p)
            .filter(|q| port_set.contains(q))
            .map(|q| topo.port(q).full_name.clone())
            .collect();
        buf.list(&ins, true);
        buf.close();

        buf.set_def_idx("FlowOutPorts", &full_name);
        let outs: Vec<String> = topo
            .flow_outs(p)
            .filter(|q| port_set.contains(q))
            .map(|q| topo.port(q).full_name.clone())
            .collect();
        buf.list(&outs, true);
        buf.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onra_core::test_utils::line_topology;

    #[test]
    fn flow_sets_follow_port_pairs() {
        let topo = line_topology();
        let ports: Vec<_> = topo.port_ids().collect();
        let mut buf = DataBuf::new(false);
        build_flow_ports(&mut buf, &topo, &ports, &HashSet::new(), false);
        let data = buf.data();
        assert!(data.contains("set FlowOutPorts[A_2] := B_1;"));
        assert!(data.contains("set FlowInPorts[B_1] := A_2;"));
        // B passes through internally.
        assert!(data.contains("set FlowOutPorts[B_1] := B_2 B_4;"));
    }

    #[test]
    fn solvec_mode_limits_to_target_comps() {
        let topo = line_topology();
        let ports: Vec<_> = topo.port_ids().collect();
        let b = topo.comp_by_name("B").unwrap();
        let targets: HashSet<CompId> = [b].into_iter().collect();
        let mut buf = DataBuf::new(false);
        build_flow_ports(&mut buf, &topo, &ports, &targets, true);
        let data = buf.data();
        assert!(data.contains("set FlowOutPorts[B_1]"));
        assert!(!data.contains("set FlowOutPorts[A_2]"));
    }
}
