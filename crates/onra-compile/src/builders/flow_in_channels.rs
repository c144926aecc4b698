//! The `set FlowInChannels[PORT] :=` section.

use crate::buffer::DataBuf;
use crate::vartable::VarTable;
use onra_core::topology::{PortId, Topology};

pub fn build_flow_in_channels(
    buf: &mut DataBuf,
    topo: &Topology,
    vt: &VarTable,
    ports: &[PortId],
) {
    for &p in ports {
        let full_name = &topo.port(p).full_name;
        buf.set_def_idx("FlowInChannels", full_name);
        buf.list(&vt.flow_in_channels(full_name), false);
        buf.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::varidx::build_vartable;
    use onra_core::test_utils::line_topology;

    #[test]
    fn channels_come_from_the_vartable() {
        let topo = line_topology();
        let channels: Vec<_> = topo.all_channels().collect();
        let ports: Vec<_> = topo.port_ids().collect();
        let vt = build_vartable(&topo, &channels, &ports);
        let mut buf = DataBuf::new(false);
        build_flow_in_channels(&mut buf, &topo, &vt, &ports);
        assert!(buf
            .data()
            .contains("set FlowInChannels[B_1] := WDM32_1 WDM32_2;"));
    }
}
