//! The `set IJK2Ls[INPORT,INCH,OUTPORT] :=` section: feasible out-channels
//! per (in-port, in-channel, out-port).

use crate::buffer::DataBuf;
use crate::vartable::VarTable;
use onra_core::text::natural_cmp;
use onra_core::topology::{CompId, PortId, Topology};
use std::collections::HashSet;

pub fn build_ijk2ls(
    buf: &mut DataBuf,
    topo: &Topology,
    vt: &VarTable,
    ports: &[PortId],
    target_comps: &HashSet<CompId>,
    solvec: bool,
) {
    let port_set: HashSet<PortId> = ports.iter().copied().collect();
    for &in_port in ports {
        if solvec && !target_comps.contains(&topo.comp_of_port(in_port)) {
            continue;
        }
        let in_name = topo.port(in_port).full_name.clone();
        for in_ch in vt.flow_in_channels(&in_name) {
            let mut outs: Vec<PortId> = topo.flow_outs(in_port).collect();
            outs.sort_by(|&a, &b| natural_cmp(&topo.port(a).full_name, &topo.port(b).full_name));
            for out_port in outs {
                if !port_set.contains(&out_port) {
                    continue;
                }
                let out_name = &topo.port(out_port).full_name;
                buf.set_def_idx("IJK2Ls", &format!("{in_name},{in_ch},{out_name}"));
                buf.list(&vt.flow_out_channels(&in_name, &in_ch, out_name), false);
                buf.close();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::varidx::build_vartable;
    use onra_core::test_utils::line_topology;

    #[test]
    fn out_channels_match_continuity() {
        let topo = line_topology();
        let channels: Vec<_> = topo.all_channels().collect();
        let ports: Vec<_> = topo.port_ids().collect();
        let vt = build_vartable(&topo, &channels, &ports);
        let mut buf = DataBuf::new(false);
        build_ijk2ls(&mut buf, &topo, &vt, &ports, &HashSet::new(), false);
        let data = buf.data();
        assert!(data.contains("set IJK2Ls[A_2,WDM32_1,B_1] := WDM32_1;"));
        assert!(data.contains("set IJK2Ls[B_1,WDM32_2,B_4] := WDM32_2;"));
        assert!(!data.contains("set IJK2Ls[A_2,WDM32_1,B_1] := WDM32_2;"));
    }
}
