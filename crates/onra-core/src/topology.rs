//! The assembled immutable topology and its queries.
//!
//! All cross-references between channel tables, components, ports and port
//! pairs are arena indices into vectors owned by [`Topology`]. The model is
//! built once from a [`TopologyDoc`] and never mutated afterwards.

use crate::channel::{Channel, ChannelTable, ANY_CHANNEL};
use crate::component::{Component, CostSpec};
use crate::conn::AvailableConnections;
use crate::doc::TopologyDoc;
use crate::error::{OnraError, OnraResult};
use crate::port::{Port, PortPair};
use crate::text::natural_cmp;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Arena index of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompId(pub usize);

/// Arena index of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub usize);

/// Arena index of a channel (flattened over all tables).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub usize);

/// The immutable topology model.
#[derive(Debug, Default)]
pub struct Topology {
    tables: Vec<ChannelTable>,
    table_index: HashMap<String, usize>,

    channels: Vec<Channel>,
    channel_index: HashMap<String, usize>,

    comps: Vec<Component>,
    comp_index: HashMap<String, usize>,

    ports: Vec<Port>,
    port_index: HashMap<String, usize>,
    port_comp: Vec<usize>,
    comp_port_by_number: Vec<HashMap<u32, usize>>,

    table2comps: HashMap<String, Vec<usize>>,

    acs: Vec<AvailableConnections>,

    portpairs: Vec<PortPair>,
    srcdst2pair: HashMap<(usize, usize), usize>,
    pairkey2pairs: BTreeMap<String, Vec<usize>>,

    flow_ins: Vec<Vec<usize>>,
    flow_outs: Vec<Vec<usize>>,
    connected: Vec<Vec<usize>>,
    opposite: Vec<Option<usize>>,
}

impl Topology {
    /// Build the model from a parsed document.
    ///
    /// `ac_map` holds the available-connection sets keyed by model name;
    /// pass an empty map with `full = false` when only the channel/component
    /// skeleton is needed (the available-connections builder itself runs in
    /// that mode). With `full = true` the port pairs and flow maps are also
    /// derived, which is what the compiler and the server need.
    pub fn build(
        doc: &TopologyDoc,
        ac_map: &HashMap<String, AvailableConnections>,
        full: bool,
    ) -> OnraResult<Topology> {
        let mut topo = Topology::default();
        topo.build_tables(doc)?;
        topo.build_comps(doc)?;
        topo.build_supports();
        topo.resolve_opposites();
        if full {
            topo.attach_acs(ac_map);
            topo.build_portpairs(doc)?;
            topo.build_flows();
        }
        Ok(topo)
    }

    fn build_tables(&mut self, doc: &TopologyDoc) -> OnraResult<()> {
        for raw in &doc.channel_tables {
            if raw.table_type != "optical" {
                warn!(
                    "not optical channelTable SKIP {}/{}",
                    raw.id, raw.table_type
                );
                continue;
            }
            let table = ChannelTable::new(&raw.id, &raw.channel_nos);
            if self.table_index.contains_key(&table.id) {
                return Err(OnraError::Topology(format!(
                    "duplicate channelTable id: {}",
                    table.id
                )));
            }
            for ch in &table.channels {
                self.channel_index
                    .insert(ch.full_no.clone(), self.channels.len());
                self.channels.push(ch.clone());
            }
            self.table_index.insert(table.id.clone(), self.tables.len());
            self.tables.push(table);
        }
        Ok(())
    }

    fn build_comps(&mut self, doc: &TopologyDoc) -> OnraResult<()> {
        let mut raw_comps: Vec<&crate::doc::CompDoc> = doc.comps.iter().collect();
        raw_comps.sort_by(|a, b| natural_cmp(&a.name, &b.name));

        for raw in raw_comps {
            if self.comp_index.contains_key(&raw.name) {
                return Err(OnraError::Topology(format!(
                    "duplicate component ref: {}",
                    raw.name
                )));
            }
            let cost = match &raw.cost_text {
                Some(txt) => Some(CostSpec::parse(txt).map_err(|e| {
                    OnraError::Topology(format!("error loading Cost of {}: {e}", raw.name))
                })?),
                None => None,
            };

            let comp_idx = self.comps.len();
            let mut port_ids = Vec::new();
            let mut by_number = HashMap::new();
            let mut raw_ports: Vec<&crate::doc::PortDoc> = raw.ports.iter().collect();
            raw_ports.sort_by_key(|p| p.number);
            for rp in raw_ports {
                let port = Port::new(
                    &raw.name,
                    rp.number,
                    &rp.name,
                    rp.io.as_deref(),
                    &rp.support_channel,
                )?;
                if self.port_index.contains_key(&port.full_name) {
                    return Err(OnraError::Topology(format!(
                        "duplicate port name: {}",
                        port.full_name
                    )));
                }
                let pid = self.ports.len();
                self.port_index.insert(port.full_name.clone(), pid);
                self.ports.push(port);
                self.port_comp.push(comp_idx);
                by_number.insert(rp.number, pid);
                port_ids.push(pid);
            }

            self.comp_index.insert(raw.name.clone(), comp_idx);
            self.comps.push(Component {
                name: raw.name.clone(),
                model: raw.model.clone(),
                glpk: raw.glpk.clone(),
                controller: raw.controller.clone(),
                socket: raw.socket,
                table_id: raw.table_id.clone(),
                cost,
                supchs: Vec::new(),
                ports: port_ids,
                ac: None,
            });
            self.comp_port_by_number.push(by_number);
        }
        Ok(())
    }

    fn build_supports(&mut self) {
        let all_ids: Vec<String> = self.tables.iter().map(|t| t.id.clone()).collect();
        for idx in 0..self.comps.len() {
            let mut supchs: Vec<String> = Vec::new();
            let mut any = false;
            for &pid in &self.comps[idx].ports {
                let sc = &self.ports[pid].support_channel;
                if sc == ANY_CHANNEL {
                    any = true;
                    break;
                }
                if !supchs.contains(sc) {
                    supchs.push(sc.clone());
                }
            }
            if any {
                supchs = all_ids.clone();
            }
            for table_id in &supchs {
                self.table2comps
                    .entry(table_id.clone())
                    .or_default()
                    .push(idx);
            }
            self.comps[idx].supchs = supchs;
        }
    }

    /// Opposite port per port: a BiDi port is its own opposite; otherwise the
    /// port whose display name is the IN/OUT flip, else the unique
    /// opposite-direction port with a compatible support channel.
    fn resolve_opposites(&mut self) {
        self.opposite = vec![None; self.ports.len()];
        for comp in &self.comps {
            for &pid in &comp.ports {
                let p = &self.ports[pid];
                if p.is_bidi() {
                    self.opposite[pid] = Some(pid);
                    continue;
                }
                let mut candidates = Vec::new();
                let mut exact = None;
                for &tid in &comp.ports {
                    if tid == pid {
                        continue;
                    }
                    let tgt = &self.ports[tid];
                    if p.is_in() == tgt.is_in() || !p.supports(&tgt.support_channel) {
                        continue;
                    }
                    if p.is_opposite_name(tgt) {
                        exact = Some(tid);
                        break;
                    }
                    candidates.push(tid);
                }
                self.opposite[pid] = exact.or(if candidates.len() == 1 {
                    Some(candidates[0])
                } else {
                    None
                });
            }
        }
    }

    fn attach_acs(&mut self, ac_map: &HashMap<String, AvailableConnections>) {
        let mut by_model: HashMap<String, usize> = HashMap::new();
        for idx in 0..self.comps.len() {
            let Some(model) = self.comps[idx].model.clone() else {
                continue;
            };
            let slot = match by_model.get(&model) {
                Some(&slot) => Some(slot),
                None => match ac_map.get(&model) {
                    Some(ac) => {
                        let slot = self.acs.len();
                        self.acs.push(ac.clone());
                        by_model.insert(model.clone(), slot);
                        Some(slot)
                    }
                    None => None,
                },
            };
            self.comps[idx].ac = slot;
        }
    }

    fn build_portpairs(&mut self, doc: &TopologyDoc) -> OnraResult<()> {
        self.connected = vec![Vec::new(); self.ports.len()];
        for net in &doc.nets {
            if net.nodes.len() != 2 {
                warn!(
                    "invalid net. must have two nodes code={}",
                    net.code.as_deref().unwrap_or("?")
                );
                continue;
            }
            let lookup = |node: &crate::doc::NetNodeDoc| -> Option<usize> {
                let &comp = self.comp_index.get(&node.comp_ref)?;
                self.comp_port_by_number[comp].get(&node.pin).copied()
            };
            let (Some(p1), Some(p2)) = (lookup(&net.nodes[0]), lookup(&net.nodes[1])) else {
                warn!(
                    "invalid net. port is not exist code={}",
                    net.code.as_deref().unwrap_or("?")
                );
                continue;
            };

            // The output-side endpoint is always the pair's source.
            let (src, dst) = if self.ports[p1].is_out() {
                (p1, p2)
            } else {
                (p2, p1)
            };
            if !self.ports[src].supports(&self.ports[dst].support_channel) {
                return Err(OnraError::Topology(format!(
                    "invalid Net supportChannel are different: {} -> {}",
                    self.ports[src].full_name, self.ports[dst].full_name
                )));
            }
            if !self.connected[src].contains(&dst) {
                self.connected[src].push(dst);
            }

            let pair = PortPair::new(net.pair.as_deref(), src, dst, net.cost);
            let pair_idx = self.portpairs.len();
            if let Some(key) = pair.pairkey.clone() {
                self.srcdst2pair.insert((src, dst), pair_idx);
                self.pairkey2pairs.entry(key).or_default().push(pair_idx);
            }
            self.portpairs.push(pair);
        }
        Ok(())
    }

    /// Derive per-port flow-in/flow-out sets from device-internal available
    /// connections plus the inter-component port pairs.
    fn build_flows(&mut self) {
        let mut ins: Vec<Vec<usize>> = vec![Vec::new(); self.ports.len()];
        let mut outs: Vec<Vec<usize>> = vec![Vec::new(); self.ports.len()];
        let mut push = |v: &mut Vec<usize>, x: usize| {
            if !v.contains(&x) {
                v.push(x);
            }
        };

        for comp in &self.comps {
            let ac = comp.ac.map(|slot| &self.acs[slot]);
            for &src in &comp.ports {
                for &dst in &comp.ports {
                    let has_conn = match ac {
                        Some(ac) => {
                            ac.has_pin_connection(self.ports[src].number, self.ports[dst].number)
                        }
                        None => src != dst && self.ports[src].is_in() && self.ports[dst].is_out(),
                    };
                    if has_conn {
                        push(&mut outs[src], dst);
                        push(&mut ins[dst], src);
                    }
                }
            }
            for &dst in &comp.ports {
                for &conn in &self.connected[dst] {
                    push(&mut outs[dst], conn);
                    push(&mut ins[conn], dst);
                    if self.ports[dst].is_bidi() {
                        push(&mut outs[conn], dst);
                        push(&mut ins[dst], conn);
                    }
                }
            }
        }

        for v in ins.iter_mut().chain(outs.iter_mut()) {
            v.sort_by(|a, b| natural_cmp(&self.ports[*a].full_name, &self.ports[*b].full_name));
        }
        self.flow_ins = ins;
        self.flow_outs = outs;
    }

    // ----- channel tables -----

    pub fn tables(&self) -> &[ChannelTable] {
        &self.tables
    }

    pub fn table_by_id(&self, id: &str) -> Option<&ChannelTable> {
        self.table_index.get(id).map(|&i| &self.tables[i])
    }

    /// All channels in `(table, no)` order.
    pub fn all_channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        (0..self.channels.len()).map(ChannelId)
    }

    pub fn channel(&self, id: ChannelId) -> &Channel {
        &self.channels[id.0]
    }

    pub fn channel_by_full_no(&self, full_no: &str) -> Option<ChannelId> {
        self.channel_index.get(full_no).copied().map(ChannelId)
    }

    /// Channel ids of one table, ordered by `no`.
    pub fn table_channels(&self, table_id: &str) -> Vec<ChannelId> {
        self.table_by_id(table_id)
            .map(|t| {
                t.channels
                    .iter()
                    .filter_map(|ch| self.channel_by_full_no(&ch.full_no))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ----- components -----

    pub fn comp_ids(&self) -> impl Iterator<Item = CompId> {
        (0..self.comps.len()).map(CompId)
    }

    pub fn comp(&self, id: CompId) -> &Component {
        &self.comps[id.0]
    }

    pub fn comp_by_name(&self, name: &str) -> Option<CompId> {
        self.comp_index.get(name).copied().map(CompId)
    }

    /// Components supporting a channel table, in natural name order.
    pub fn support_comps(&self, table_id: &str) -> Vec<CompId> {
        self.table2comps
            .get(table_id)
            .map(|v| v.iter().map(|&i| CompId(i)).collect())
            .unwrap_or_default()
    }

    pub fn ac_of(&self, id: CompId) -> Option<&AvailableConnections> {
        self.comps[id.0].ac.map(|slot| &self.acs[slot])
    }

    // ----- ports -----

    pub fn port_ids(&self) -> impl Iterator<Item = PortId> {
        (0..self.ports.len()).map(PortId)
    }

    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    pub fn port_by_name(&self, full_name: &str) -> Option<PortId> {
        self.port_index.get(full_name).copied().map(PortId)
    }

    pub fn comp_of_port(&self, id: PortId) -> CompId {
        CompId(self.port_comp[id.0])
    }

    pub fn ports_of(&self, comp: CompId) -> impl Iterator<Item = PortId> + '_ {
        self.comps[comp.0].ports.iter().map(|&i| PortId(i))
    }

    pub fn port_by_number(&self, comp: CompId, number: u32) -> Option<PortId> {
        self.comp_port_by_number[comp.0]
            .get(&number)
            .copied()
            .map(PortId)
    }

    pub fn flow_ins(&self, id: PortId) -> impl Iterator<Item = PortId> + '_ {
        self.flow_ins[id.0].iter().map(|&i| PortId(i))
    }

    pub fn flow_outs(&self, id: PortId) -> impl Iterator<Item = PortId> + '_ {
        self.flow_outs[id.0].iter().map(|&i| PortId(i))
    }

    pub fn is_connected(&self, src: PortId, dst: PortId) -> bool {
        self.connected[src.0].contains(&dst.0)
    }

    pub fn opposite_port(&self, id: PortId) -> Option<PortId> {
        self.opposite[id.0].map(PortId)
    }

    // ----- port pairs -----

    pub fn portpairs(&self) -> &[PortPair] {
        &self.portpairs
    }

    /// Port pairs grouped by pairkey, in key order.
    pub fn pairkey_groups(&self) -> impl Iterator<Item = (&String, Vec<&PortPair>)> {
        self.pairkey2pairs
            .iter()
            .map(|(k, v)| (k, v.iter().map(|&i| &self.portpairs[i]).collect()))
    }

    /// The twin of the pair `(src, dst)`: the other pair with the same
    /// pairkey but different endpoints.
    pub fn find_portpair_twin(&self, src: PortId, dst: PortId) -> Option<&PortPair> {
        let &pair_idx = self.srcdst2pair.get(&(src.0, dst.0))?;
        let key = self.portpairs[pair_idx].pairkey.as_ref()?;
        self.pairkey2pairs
            .get(key)?
            .iter()
            .map(|&i| &self.portpairs[i])
            .find(|p| p.src != src.0 && p.dst != dst.0)
    }

    // ----- connection test -----

    /// Whether channel `in_ch` entering `in_port` can be switched/carried to
    /// channel `out_ch` leaving `out_port`, consulting the per-device
    /// available-connection set for device-internal hops and the port pairs
    /// for inter-device hops.
    pub fn has_connection(
        &self,
        in_port: PortId,
        in_ch: ChannelId,
        out_port: PortId,
        out_ch: ChannelId,
    ) -> bool {
        if in_port == out_port {
            return false;
        }
        let ip = &self.ports[in_port.0];
        let op = &self.ports[out_port.0];
        let ic = &self.channels[in_ch.0];
        let oc = &self.channels[out_ch.0];
        let supported = ip.supports(&ic.table_id) && op.supports(&oc.table_id);

        let in_comp = self.comp_of_port(in_port);
        if in_comp == self.comp_of_port(out_port) {
            if let Some(ac) = self.ac_of(in_comp) {
                return ac.has_connection(ip.number, &ic.full_no, op.number, &oc.full_no);
            }
            if self.comp(in_comp).is_pseudo() {
                // Application terminals have no in -> out path.
                return false;
            }
            // Unconstrained devices pass a channel straight through.
            return ip.is_in() && op.is_out() && ic.full_no == oc.full_no && supported;
        }

        if ic.full_no == oc.full_no && supported {
            if self.is_connected(in_port, out_port) {
                return true;
            }
            if ip.is_bidi() && self.is_connected(out_port, in_port) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::*;
    use crate::test_utils::{line_doc, line_topology};

    #[test]
    fn lookups_resolve() {
        let topo = line_topology();
        assert_eq!(topo.tables().len(), 1);
        assert_eq!(topo.all_channels().count(), 2);
        let b = topo.comp_by_name("B").unwrap();
        assert_eq!(topo.comp(b).ports.len(), 4);
        let p = topo.port_by_name("B_2").unwrap();
        assert_eq!(topo.port(p).number, 2);
        assert_eq!(topo.comp_of_port(p), b);
    }

    #[test]
    fn direction_inference_from_display_names() {
        let topo = line_topology();
        let b_in = topo.port_by_name("B_1").unwrap();
        let b_out = topo.port_by_name("B_2").unwrap();
        assert!(topo.port(b_in).is_in());
        assert!(topo.port(b_out).is_out());
    }

    #[test]
    fn opposite_ports_by_name_flip() {
        let topo = line_topology();
        let b_in1 = topo.port_by_name("B_1").unwrap();
        let b_out1 = topo.port_by_name("B_2").unwrap();
        assert_eq!(topo.opposite_port(b_in1), Some(b_out1));
        assert_eq!(topo.opposite_port(b_out1), Some(b_in1));
    }

    #[test]
    fn flow_maps_cross_components() {
        let topo = line_topology();
        let a_out = topo.port_by_name("A_2").unwrap();
        let b_in = topo.port_by_name("B_1").unwrap();
        let outs: Vec<PortId> = topo.flow_outs(a_out).collect();
        assert!(outs.contains(&b_in));
        let ins: Vec<PortId> = topo.flow_ins(b_in).collect();
        assert!(ins.contains(&a_out));
    }

    #[test]
    fn has_connection_internal_and_external() {
        let topo = line_topology();
        let ch1 = topo.channel_by_full_no("WDM32_1").unwrap();
        let ch2 = topo.channel_by_full_no("WDM32_2").unwrap();
        let b_in = topo.port_by_name("B_1").unwrap();
        let b_out = topo.port_by_name("B_4").unwrap();
        // Internal pass-through keeps the channel.
        assert!(topo.has_connection(b_in, ch1, b_out, ch1));
        assert!(!topo.has_connection(b_in, ch1, b_out, ch2));
        // External hop along a port pair.
        let a_out = topo.port_by_name("A_2").unwrap();
        assert!(topo.has_connection(a_out, ch1, b_in, ch1));
        assert!(!topo.has_connection(a_out, ch1, topo.port_by_name("C_1").unwrap(), ch1));
    }

    #[test]
    fn portpair_twin_lookup() {
        let topo = line_topology();
        let a_out = topo.port_by_name("A_2").unwrap();
        let b_in = topo.port_by_name("B_1").unwrap();
        let twin = topo.find_portpair_twin(a_out, b_in).unwrap();
        assert_eq!(topo.port(PortId(twin.src)).full_name, "B_2");
        assert_eq!(topo.port(PortId(twin.dst)).full_name, "A_1");
    }

    #[test]
    fn non_optical_tables_are_dropped() {
        let mut doc = line_doc();
        doc.channel_tables.push(ChannelTableDoc {
            id: "ETH".into(),
            table_type: "ether".into(),
            channel_nos: vec![1],
        });
        let topo = Topology::build(&doc, &HashMap::new(), true).unwrap();
        assert_eq!(topo.tables().len(), 1);
    }

    #[test]
    fn bad_net_is_skipped_not_fatal() {
        let mut doc = line_doc();
        doc.nets.push(NetDoc {
            code: Some("99".into()),
            pair: None,
            nodes: vec![NetNodeDoc {
                comp_ref: "A".into(),
                pin: 77,
            }],
            cost: 0.1,
        });
        let topo = Topology::build(&doc, &HashMap::new(), true).unwrap();
        assert_eq!(topo.portpairs().len(), 4);
    }
}
