//! Building the variable table and its `param vt default 0 :=` section.

use crate::buffer::{DataBuf, PortVarIdx};
use crate::vartable::{VarTable, NO_VT_IDX};
use onra_core::text::natural_cmp;
use onra_core::topology::{ChannelId, PortId, Topology};
use std::collections::HashSet;

/// Derive the variable table over `channels x target ports` and render its
/// data section into `vt.text`. Var ids are assigned in channel order, then
/// by in-port natural order, so identical inputs always produce identical
/// tables.
pub fn build_vartable(topo: &Topology, channels: &[ChannelId], ports: &[PortId]) -> VarTable {
    let port_set: HashSet<PortId> = ports.iter().copied().collect();
    let mut vt = VarTable::new();
    let mut buf = DataBuf::new(false);
    buf.param_def("vt", &NO_VT_IDX.to_string());

    for &ch in channels {
        let ch_name = topo.channel(ch).full_no.clone();
        // Feasible (in, out) pairs on this channel.
        let mut conns: Vec<(PortId, PortId)> = Vec::new();
        for &in_port in ports {
            let mut outs: Vec<PortId> = topo.flow_outs(in_port).collect();
            outs.sort_by(|&a, &b| natural_cmp(&topo.port(a).full_name, &topo.port(b).full_name));
            for out_port in outs {
                if !port_set.contains(&out_port) {
                    continue;
                }
                if topo.has_connection(in_port, ch, out_port, ch) {
                    conns.push((in_port, out_port));
                }
            }
        }
        conns.sort_by(|a, b| {
            natural_cmp(&topo.port(a.0).full_name, &topo.port(b.0).full_name)
                .then_with(|| natural_cmp(&topo.port(a.1).full_name, &topo.port(b.1).full_name))
        });

        let mut table = PortVarIdx::new();
        for (in_port, out_port) in conns {
            let idx = vt.add(
                &topo.port(in_port).full_name,
                &ch_name,
                &topo.port(out_port).full_name,
                &ch_name,
            );
            table.add(&topo.port(in_port).full_name, &topo.port(out_port).full_name, idx);
        }
        buf.vt_block_ijl(&ch_name, &ch_name, &table);
    }
    buf.close();

    buf.param("NUM_VARS");
    buf.push(&format!("{};\n", vt.size()));

    let (data, _) = buf.into_parts();
    vt.text = data;
    vt
}

#[cfg(test)]
mod tests {
    use super::*;
    use onra_core::test_utils::line_topology;

    #[test]
    fn vt_is_injective_and_dense() {
        let topo = line_topology();
        let channels: Vec<_> = topo.all_channels().collect();
        let ports: Vec<_> = topo.port_ids().collect();
        let vt = build_vartable(&topo, &channels, &ports);
        assert!(vt.size() > 0);
        // A_2 -> B_1 exists on both channels with distinct ids.
        let a = vt.get_idx("A_2", "WDM32_1", "B_1", "WDM32_1").unwrap();
        let b = vt.get_idx("A_2", "WDM32_2", "B_1", "WDM32_2").unwrap();
        assert_ne!(a, b);
        assert!(vt.text.contains("param vt default 0 :=\n"));
        assert!(vt.text.contains(&format!("param NUM_VARS := {};", vt.size())));
    }

    #[test]
    fn identical_inputs_give_identical_tables() {
        let topo = line_topology();
        let channels: Vec<_> = topo.all_channels().collect();
        let ports: Vec<_> = topo.port_ids().collect();
        let vt1 = build_vartable(&topo, &channels, &ports);
        let vt2 = build_vartable(&topo, &channels, &ports);
        assert_eq!(vt1.text, vt2.text);
        assert_eq!(vt1.size(), vt2.size());
    }

    #[test]
    fn cross_channel_switching_is_absent() {
        let topo = line_topology();
        let channels: Vec<_> = topo.all_channels().collect();
        let ports: Vec<_> = topo.port_ids().collect();
        let vt = build_vartable(&topo, &channels, &ports);
        assert_eq!(vt.get_idx("A_2", "WDM32_1", "B_1", "WDM32_2"), None);
    }
}
