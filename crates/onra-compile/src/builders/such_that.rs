//! The per-model component and port sets: `set Comps_<model> := ...;`,
//! `set Comps_<portset> := ...;` and `set <portset>[comp] := ...;`.

use crate::buffer::DataBuf;
use crate::builders::Mode;
use onra_core::glpk::{ModelGroup, StBody};
use onra_core::text::{escape, natural_cmp};
use onra_core::topology::{CompId, PortId, Topology};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Inputs shared by the two builders.
pub struct SuchThatCtx<'a> {
    pub mode: Mode,
    /// Target models: every loaded model for pf, the single chunk model for
    /// solvec.
    pub models: Vec<&'a ModelGroup>,
    /// Target components (the solvec chunk, or the pf channel's supporters).
    pub target_comps: Vec<CompId>,
    /// pf only: ports supporting the target channel.
    pub target_ports: Option<&'a HashSet<PortId>>,
}

impl<'a> SuchThatCtx<'a> {
    fn model_by_name(&self, name: &str) -> Option<&'a ModelGroup> {
        self.models.iter().copied().find(|m| m.name == name)
    }

    fn target_comps_in_model(&self, model: &ModelGroup) -> Vec<CompId> {
        match self.mode {
            Mode::Pf => model
                .comps
                .iter()
                .copied()
                .filter(|c| self.target_comps.contains(c))
                .collect(),
            Mode::Solvec => self.target_comps.clone(),
        }
    }
}

/// `set Comps_<model>` declarations and members.
pub fn build_comps_sets(buf: &mut DataBuf, topo: &Topology, ctx: &SuchThatCtx) {
    if ctx.target_comps.is_empty() && buf.writes_model() {
        // Solvec skeletons have no per-chunk components yet; only the model
        // declarations are written.
        for model in &ctx.models {
            buf.model_line(&format!("set Comps_{};", escape(&model.name)));
        }
        return;
    }
    for model in &ctx.models {
        let setname = format!("Comps_{}", escape(&model.name));
        buf.model_line(&format!("set {setname};"));
        buf.set_def(&setname);
        let names: Vec<String> = ctx
            .target_comps_in_model(model)
            .iter()
            .map(|&c| topo.comp(c).name.clone())
            .collect();
        buf.list(&names, false);
        buf.close();
    }
}

/// The port-set names each model's constraints bind with `i` and `k`
/// (`InputPort`, `OutputPortA`, ...).
fn model_port_sets(model: &ModelGroup) -> BTreeSet<String> {
    let mut sets = BTreeSet::new();
    for st in &model.glpk.stdefs {
        let mut domains = Vec::new();
        if let Ok(d) = model.glpk.effective_domain(st) {
            domains.push(d);
        }
        if let StBody::Sum(sum) = &st.body {
            domains.push(sum.domain.clone());
        }
        for d in domains {
            for (key, val) in &d.var_inset {
                if key == "i" || key == "k" {
                    sets.insert(val.clone());
                }
            }
        }
    }
    sets
}

/// `set Comps_<portset>` and `set <portset>[comp]` declarations/members.
pub fn build_port_sets(buf: &mut DataBuf, topo: &Topology, ctx: &SuchThatCtx) {
    // portset name -> components using it
    let mut set2comps: BTreeMap<String, Vec<CompId>> = BTreeMap::new();
    let mut all_sets: BTreeSet<String> = BTreeSet::new();
    for model in &ctx.models {
        for valset in model_port_sets(model) {
            for comp in ctx.target_comps_in_model(model) {
                let entry = set2comps.entry(valset.clone()).or_default();
                if !entry.contains(&comp) {
                    entry.push(comp);
                }
            }
            all_sets.insert(valset);
        }
    }

    if set2comps.is_empty() && buf.writes_model() {
        // Solvec skeleton: declarations only.
        for valset in &all_sets {
            buf.model_line(&format!("set Comps_{valset};"));
            buf.model_line(&format!("set {valset}{{Comps_{valset}}};"));
        }
        return;
    }

    for valset in &all_sets {
        let setname = format!("Comps_{valset}");
        buf.model_line(&format!("set {setname};"));
        buf.set_def(&setname);
        let names: Vec<String> = set2comps
            .get(valset)
            .map(|v| v.iter().map(|&c| topo.comp(c).name.clone()).collect())
            .unwrap_or_default();
        buf.list(&names, true);
        buf.close();
    }

    for valset in &all_sets {
        buf.model_line(&format!("set {valset}{{Comps_{valset}}};"));
        let mut comps = set2comps.get(valset).cloned().unwrap_or_default();
        comps.sort_by(|&a, &b| natural_cmp(&topo.comp(a).name, &topo.comp(b).name));
        for comp_id in comps {
            let comp = topo.comp(comp_id);
            buf.set_def_idx(valset, &comp.name);
            let model = comp
                .model
                .as_deref()
                .and_then(|name| ctx.model_by_name(name));
            let mut names = Vec::new();
            if let Some(nums) = model
                .and_then(|m| m.glpk.setdefs.get(valset))
                .and_then(|def| def.nums.as_ref())
            {
                for &num in nums {
                    // A port removed from the topology after the ac files
                    // were generated simply does not resolve.
                    let Some(pid) = topo.port_by_number(comp_id, num) else {
                        continue;
                    };
                    if let (Mode::Pf, Some(target_ports)) = (ctx.mode, ctx.target_ports) {
                        // pf excludes ports that do not support the target
                        // channel; solvec covers all channels.
                        if !target_ports.contains(&pid) {
                            continue;
                        }
                    }
                    names.push(topo.port(pid).full_name.clone());
                }
            }
            buf.list(&names, false);
            buf.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onra_core::glpk::Glpk;
    use onra_core::test_utils::line_topology;

    fn wss_model(topo: &Topology) -> ModelGroup {
        let glpk = Glpk::parse(
            "set InputPort := {1, 3};\
             set OutputPort := {2, 4};\
             s.t. one{j in Channels, k in OutputPort} : sum{i in InputPort} c[i, j, k, j] <= 1;",
        )
        .unwrap();
        let mut model = ModelGroup::new("WSS", glpk);
        let b = topo.comp_by_name("B").unwrap();
        model.add_component(b, "B", true);
        model
    }

    #[test]
    fn comps_sets_list_target_members() {
        let topo = line_topology();
        let model = wss_model(&topo);
        let ctx = SuchThatCtx {
            mode: Mode::Pf,
            models: vec![&model],
            target_comps: topo.comp_ids().collect(),
            target_ports: None,
        };
        let mut buf = DataBuf::new(true);
        build_comps_sets(&mut buf, &topo, &ctx);
        let (data, model_txt) = buf.into_parts();
        assert!(data.contains("set Comps_WSS := B;"));
        assert!(model_txt.unwrap().contains("set Comps_WSS;"));
    }

    #[test]
    fn port_sets_resolve_numbers_to_names() {
        let topo = line_topology();
        let model = wss_model(&topo);
        let all_ports: HashSet<PortId> = topo.port_ids().collect();
        let ctx = SuchThatCtx {
            mode: Mode::Pf,
            models: vec![&model],
            target_comps: topo.comp_ids().collect(),
            target_ports: Some(&all_ports),
        };
        let mut buf = DataBuf::new(true);
        build_port_sets(&mut buf, &topo, &ctx);
        let (data, model_txt) = buf.into_parts();
        assert!(data.contains("set Comps_InputPort := B;"));
        assert!(data.contains("set InputPort[B] := B_1 B_3;"));
        assert!(data.contains("set OutputPort[B] := B_2 B_4;"));
        let model_txt = model_txt.unwrap();
        assert!(model_txt.contains("set InputPort{Comps_InputPort};"));
    }

    #[test]
    fn solvec_skeleton_writes_declarations_only() {
        let topo = line_topology();
        let model = wss_model(&topo);
        let ctx = SuchThatCtx {
            mode: Mode::Solvec,
            models: vec![&model],
            target_comps: Vec::new(),
            target_ports: None,
        };
        let mut buf = DataBuf::new(true);
        build_comps_sets(&mut buf, &topo, &ctx);
        build_port_sets(&mut buf, &topo, &ctx);
        let (data, model_txt) = buf.into_parts();
        assert!(data.is_empty());
        let model_txt = model_txt.unwrap();
        assert!(model_txt.contains("set Comps_WSS;"));
        assert!(model_txt.contains("set Comps_InputPort;"));
    }
}
