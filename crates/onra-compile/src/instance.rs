//! Instance data assembly: the per-request text appended to a copy of a
//! skeleton data file right before a solver run.

use crate::builders::such_that::SuchThatCtx;
use crate::builders::{self, Mode};
use crate::buffer::DataBuf;
use crate::skeleton::solvec_target_ports;
use crate::vartable::VarTable;
use onra_core::glpk::ModelGroup;
use onra_core::text::natural_cmp;
use onra_core::topology::{ChannelId, CompId, Topology};
use std::collections::HashSet;

/// One in-use route tuple, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleRef {
    pub src_port: String,
    pub src_ch: String,
    pub dst_port: String,
    pub dst_ch: String,
}

/// The request-dependent inputs of one solver run.
#[derive(Debug, Clone, Default)]
pub struct InstanceSpec {
    pub src: String,
    pub dst: String,
    /// Ports later ERO segments will visit; this segment must avoid them.
    pub next_ero: Vec<String>,
    /// Tuples consumed by live reservations and already-routed segments.
    pub used_x: Vec<TupleRef>,
    /// Component activations consumed by live reservations.
    pub used_c: Vec<TupleRef>,
}

/// Instance data for one pathfinding run over one trial channel.
pub fn make_instance_pf(
    topo: &Topology,
    spec: &InstanceSpec,
    channels: &[ChannelId],
    vt: &VarTable,
    target_ports: &HashSet<String>,
) -> String {
    let ch_names: Vec<String> = channels
        .iter()
        .map(|&ch| topo.channel(ch).full_no.clone())
        .collect();
    let mut buf = DataBuf::new(false);
    builders::srcdst::build_srcdst(&mut buf, &spec.src, &spec.dst);
    builders::next_ero::build_next_ero(&mut buf, &spec.next_ero);
    builders::inuse::build_inuse(
        &mut buf,
        topo,
        "inuse_C",
        &spec.used_c,
        &ch_names,
        target_ports,
        vt,
    );
    builders::inuse::build_inuse(
        &mut buf,
        topo,
        "inuse_X",
        &spec.used_x,
        &ch_names,
        target_ports,
        vt,
    );
    buf.push("end;\n");
    let (data, _) = buf.into_parts();
    data
}

/// Instance data for one device sub-solve.
///
/// `used_comps` are the components the global solution touched; only those
/// inside the chunk become data members here.
pub fn make_instance_solvec(
    topo: &Topology,
    spec: &InstanceSpec,
    channels: &[ChannelId],
    vt: &VarTable,
    model: &ModelGroup,
    chunk: &[CompId],
    used_comps: &[CompId],
) -> String {
    let mut target_comps: Vec<CompId> = used_comps
        .iter()
        .copied()
        .filter(|c| chunk.contains(c))
        .collect();
    target_comps.sort_by(|&a, &b| natural_cmp(&topo.comp(a).name, &topo.comp(b).name));
    let comps_set: HashSet<CompId> = target_comps.iter().copied().collect();

    let target_ports = solvec_target_ports(topo, chunk);
    let port_names: HashSet<String> = target_ports
        .iter()
        .map(|&p| topo.port(p).full_name.clone())
        .collect();
    let ch_names: Vec<String> = channels
        .iter()
        .map(|&ch| topo.channel(ch).full_no.clone())
        .collect();

    let mut buf = DataBuf::new(false);
    builders::srcdst::build_srcdst(&mut buf, &spec.src, &spec.dst);
    builders::vinuse::build_vinuse(&mut buf, topo, &spec.used_x, &comps_set);

    let ctx = SuchThatCtx {
        mode: Mode::Solvec,
        models: vec![model],
        target_comps: target_comps.clone(),
        target_ports: None,
    };
    builders::such_that::build_comps_sets(&mut buf, topo, &ctx);
    builders::such_that::build_port_sets(&mut buf, topo, &ctx);

    builders::flow_ports::build_flow_ports(&mut buf, topo, &target_ports, &comps_set, true);
    builders::ijk2ls::build_ijk2ls(&mut buf, topo, vt, &target_ports, &comps_set, true);
    builders::inuse::build_inuse(
        &mut buf,
        topo,
        "inuse_X",
        &spec.used_x,
        &ch_names,
        &port_names,
        vt,
    );
    buf.push("end;\n");
    let (data, _) = buf.into_parts();
    data
}
