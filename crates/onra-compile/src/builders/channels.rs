//! The channel sections: `set Channels_<table> :=`, `set AllChannels :=`,
//! `param chNo :=` and the cyclic `param nextCh :=`.

use crate::buffer::DataBuf;
use crate::builders::Mode;
use onra_core::topology::{ChannelId, Topology};

pub fn build_channels(buf: &mut DataBuf, topo: &Topology, channels: &[ChannelId], mode: Mode) {
    // Target channels grouped by table, keeping their order.
    let mut table_order: Vec<String> = Vec::new();
    let mut by_table: std::collections::HashMap<String, Vec<ChannelId>> =
        std::collections::HashMap::new();
    for &ch in channels {
        let table_id = topo.channel(ch).table_id.clone();
        if !by_table.contains_key(&table_id) {
            table_order.push(table_id.clone());
        }
        by_table.entry(table_id).or_default().push(ch);
    }

    if buf.writes_model() {
        match mode {
            Mode::Solvec => {
                for table_id in &table_order {
                    buf.model_line(&format!("set Channels_{table_id};"));
                }
            }
            Mode::Pf => {
                for table in topo.tables() {
                    buf.model_line(&format!("set Channels_{};", table.id));
                }
            }
        }
        buf.model_line("param nextCh{AllChannels} symbolic;");
    }

    let mut all_names: Vec<String> = Vec::new();
    let mut chno: Vec<String> = Vec::new();
    for table in topo.tables() {
        buf.set_def(&format!("Channels_{}", table.id));
        if let Some(chs) = by_table.get(&table.id) {
            let names: Vec<String> = chs
                .iter()
                .map(|&ch| topo.channel(ch).full_no.clone())
                .collect();
            buf.list(&names, false);
            for &ch in chs {
                let ch = topo.channel(ch);
                chno.push(ch.full_no.clone());
                chno.push(ch.no.to_string());
            }
            all_names.extend(names);
        }
        buf.close();
    }

    buf.set_def("AllChannels");
    buf.list(&all_names, false);
    buf.close();

    buf.param("chNo");
    buf.list(&chno, false);
    buf.close();

    // nextCh wraps the last channel around to the first.
    buf.param("nextCh");
    let mut pairs: Vec<String> = Vec::new();
    for (idx, name) in all_names.iter().enumerate() {
        pairs.push(name.clone());
        pairs.push(all_names[(idx + 1) % all_names.len().max(1)].clone());
    }
    buf.list(&pairs, false);
    buf.close();
}
