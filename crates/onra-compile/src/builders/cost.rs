//! The `param cost default 0 :=` and `set OUT_OF_SERVICES :=` sections,
//! fed by port-pair costs and component cost specs.

use crate::buffer::DataBuf;
use crate::vartable::VarTable;
use onra_core::component::CostEntry;
use onra_core::selector::Selector;
use onra_core::text::{natural_cmp, tuple_key};
use onra_core::topology::{ChannelId, CompId, PortId, Topology};
use std::collections::HashSet;
use tracing::warn;

/// Ports of a component picked by an `i`/`k` selector.
fn selected_ports(topo: &Topology, comp: CompId, sel: &Selector) -> Vec<PortId> {
    let mut ports: Vec<PortId> = match sel {
        Selector::Any => topo.ports_of(comp).collect(),
        Selector::Nos(nos) => nos
            .iter()
            .filter_map(|&no| {
                let p = topo.port_by_number(comp, no);
                if p.is_none() {
                    warn!(
                        "invalid Cost value: {no} is not exist {}",
                        topo.comp(comp).name
                    );
                }
                p
            })
            .collect(),
    };
    ports.sort_by(|&a, &b| natural_cmp(&topo.port(a).full_name, &topo.port(b).full_name));
    ports
}

/// Emit one line per selected tuple. `cost_value` is `Some` for cost
/// entries (`[i,j,k,l] v`) and `None` for out-of-service tuples
/// (`(i,j,k,l)` members).
fn emit_entries(
    buf: &mut DataBuf,
    topo: &Topology,
    comp: CompId,
    entries: &[CostEntry],
    channels: &[ChannelId],
    vt: &VarTable,
    is_cost: bool,
) {
    let mut seen: HashSet<String> = HashSet::new();
    for entry in entries {
        let srcs = selected_ports(topo, comp, &entry.i);
        let dsts = selected_ports(topo, comp, &entry.k);
        for &src in &srcs {
            for &dst in &dsts {
                for &ch in channels {
                    let channel = topo.channel(ch);
                    if !entry.j.matches(channel.no) {
                        continue;
                    }
                    let src_name = &topo.port(src).full_name;
                    let dst_name = &topo.port(dst).full_name;
                    if !vt.has_connection(src_name, &channel.full_no, dst_name, &channel.full_no) {
                        continue;
                    }
                    let key = tuple_key(src_name, &channel.full_no, dst_name, &channel.full_no);
                    if !seen.insert(key) {
                        warn!(
                            "Duplicate {} description: {}/[{},{},{},{}]",
                            if is_cost { "Cost" } else { "OutOfService" },
                            topo.comp(comp).name,
                            src_name,
                            channel.full_no,
                            dst_name,
                            channel.full_no
                        );
                        continue;
                    }
                    if is_cost {
                        buf.push(&format!(
                            "[{src_name},{},{dst_name},{}] {}\n",
                            channel.full_no, channel.full_no, entry.cost
                        ));
                    } else {
                        buf.push(&format!(
                            "({src_name},{},{dst_name},{})\n",
                            channel.full_no, channel.full_no
                        ));
                    }
                }
            }
        }
    }
}

pub fn build_cost(
    buf: &mut DataBuf,
    topo: &Topology,
    channels: &[ChannelId],
    target_comps: &[CompId],
    vt: &VarTable,
) {
    buf.param_def("cost", "0");

    buf.push("# net cost\n");
    for pair in topo.portpairs() {
        let src = &topo.port(PortId(pair.src)).full_name;
        let dst = &topo.port(PortId(pair.dst)).full_name;
        for &ch in channels {
            let full_no = &topo.channel(ch).full_no;
            if vt.has_connection(src, full_no, dst, full_no) {
                buf.push(&format!("[{src},{full_no},{dst},{full_no}] {}\n", pair.cost));
            }
        }
    }

    buf.push("# comp cost\n");
    for &comp in target_comps {
        if let Some(spec) = &topo.comp(comp).cost {
            emit_entries(buf, topo, comp, &spec.cost, channels, vt, true);
        }
    }
    buf.close();
}

pub fn build_out_of_service(
    buf: &mut DataBuf,
    topo: &Topology,
    channels: &[ChannelId],
    target_comps: &[CompId],
    vt: &VarTable,
) {
    buf.set_def("OUT_OF_SERVICES");
    buf.push("\n");
    for &comp in target_comps {
        if let Some(spec) = &topo.comp(comp).cost {
            emit_entries(buf, topo, comp, &spec.out_of_service, channels, vt, false);
        }
    }
    buf.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::varidx::build_vartable;
    use onra_core::component::CostSpec;
    use onra_core::test_utils::{line_doc, line_topology};
    use onra_core::topology::Topology;
    use std::collections::HashMap;

    #[test]
    fn net_costs_follow_portpairs() {
        let topo = line_topology();
        let channels: Vec<_> = topo.all_channels().collect();
        let ports: Vec<_> = topo.port_ids().collect();
        let vt = build_vartable(&topo, &channels, &ports);
        let comps: Vec<_> = topo.comp_ids().collect();
        let mut buf = DataBuf::new(false);
        build_cost(&mut buf, &topo, &channels[..1], &comps, &vt);
        let data = buf.data();
        assert!(data.starts_with("param cost default 0 :=\n"));
        assert!(data.contains("[A_2,WDM32_1,B_1,WDM32_1] 0.1\n"));
        assert!(data.contains("[B_4,WDM32_1,C_1,WDM32_1] 0.1\n"));
    }

    #[test]
    fn comp_cost_and_out_of_service_use_selectors() {
        let mut doc = line_doc();
        doc.comps[1].cost_text = Some(
            r#"{"Cost": [{"i": 1, "j": "*", "k": 4, "l": "*", "cost": 0.2}],
                "OutOfService": [{"i": 3, "j": 1, "k": 2, "l": 1}]}"#
                .to_string(),
        );
        let topo = Topology::build(&doc, &HashMap::new(), true).unwrap();
        assert!(matches!(topo.comp(topo.comp_by_name("B").unwrap()).cost, Some(CostSpec { .. })));
        let channels: Vec<_> = topo.all_channels().collect();
        let ports: Vec<_> = topo.port_ids().collect();
        let vt = build_vartable(&topo, &channels, &ports);
        let comps: Vec<_> = topo.comp_ids().collect();

        let mut buf = DataBuf::new(false);
        build_cost(&mut buf, &topo, &channels, &comps, &vt);
        assert!(buf.data().contains("[B_1,WDM32_1,B_4,WDM32_1] 0.2\n"));
        assert!(buf.data().contains("[B_1,WDM32_2,B_4,WDM32_2] 0.2\n"));

        let mut buf = DataBuf::new(false);
        build_out_of_service(&mut buf, &topo, &channels, &comps, &vt);
        assert!(buf.data().contains("(B_3,WDM32_1,B_2,WDM32_1)\n"));
        assert!(!buf.data().contains("(B_3,WDM32_2"));
    }

    #[test]
    fn empty_out_of_service_is_an_empty_set() {
        let topo = line_topology();
        let channels: Vec<_> = topo.all_channels().collect();
        let ports: Vec<_> = topo.port_ids().collect();
        let vt = build_vartable(&topo, &channels, &ports);
        let comps: Vec<_> = topo.comp_ids().collect();
        let mut buf = DataBuf::new(false);
        build_out_of_service(&mut buf, &topo, &channels, &comps, &vt);
        assert_eq!(buf.data(), "set OUT_OF_SERVICES :=\n;\n");
    }
}
