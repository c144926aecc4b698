//! Skeleton data assembly: the per-channel `pf_*.data` bodies and the
//! per-device `solvec_*.data` bodies, plus the model-file lines shared by
//! all of them. Instance data is appended later by [`crate::instance`].

use crate::builders::such_that::SuchThatCtx;
use crate::builders::{self, Mode};
use crate::buffer::DataBuf;
use crate::vartable::VarTable;
use anyhow::Result;
use onra_core::glpk::ModelGroup;
use onra_core::text::natural_cmp;
use onra_core::topology::{ChannelId, CompId, PortId, Topology};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Output of one skeleton assembly.
pub struct SkeletonOutput {
    pub data: String,
    /// Model-file lines; only produced when `write_model` was requested.
    pub model: Option<String>,
    pub vt: VarTable,
}

/// Ports eligible for a pathfinding skeleton: every port when the topology
/// has a single channel table, otherwise the target components' ports that
/// support the channel's table.
pub fn pf_target_ports(topo: &Topology, target_comps: &[CompId], table_id: &str) -> Vec<PortId> {
    if topo.tables().len() == 1 {
        return topo.port_ids().collect();
    }
    let mut ports: Vec<PortId> = target_comps
        .iter()
        .flat_map(|&c| topo.ports_of(c))
        .filter(|&p| topo.port(p).supports(table_id))
        .collect();
    ports.sort_by(|&a, &b| natural_cmp(&topo.port(a).full_name, &topo.port(b).full_name));
    ports
}

/// All ports of a solvec chunk, component order then port number.
pub fn solvec_target_ports(topo: &Topology, chunk: &[CompId]) -> Vec<PortId> {
    let mut comps = chunk.to_vec();
    comps.sort_by(|&a, &b| natural_cmp(&topo.comp(a).name, &topo.comp(b).name));
    comps.iter().flat_map(|&c| topo.ports_of(c)).collect()
}

/// Assemble one skeleton.
///
/// For `Mode::Pf`, `channels` holds the single target channel and `models`
/// every loaded model. For `Mode::Solvec`, `channels` holds all channels
/// and `solvec_target` the model and component chunk this file covers.
/// The derived variable table is persisted to `vt_file` (a stale file from
/// a previous run with different chunking is removed first).
pub fn make_skeleton(
    topo: &Topology,
    mode: Mode,
    write_model: bool,
    channels: &[ChannelId],
    models: &BTreeMap<String, ModelGroup>,
    solvec_target: Option<(&ModelGroup, &[CompId])>,
    vt_file: &Path,
) -> Result<SkeletonOutput> {
    let (target_comps, target_ports) = match mode {
        Mode::Pf => {
            let table_id = topo.channel(channels[0]).table_id.clone();
            let comps = topo.support_comps(&table_id);
            let ports = pf_target_ports(topo, &comps, &table_id);
            (comps, ports)
        }
        Mode::Solvec => {
            let (_, chunk) = solvec_target.expect("solvec skeleton needs a target");
            (Vec::new(), solvec_target_ports(topo, chunk))
        }
    };
    let port_set: HashSet<PortId> = target_ports.iter().copied().collect();

    if vt_file.exists() {
        if let Err(e) = fs::remove_file(vt_file) {
            warn!("failed to remove {} : {e}", vt_file.display());
        }
    }

    let mut buf = DataBuf::new(write_model);
    builders::v::build_v(&mut buf, topo, &target_ports);

    if mode == Mode::Pf || write_model {
        let ctx = SuchThatCtx {
            mode,
            models: match mode {
                Mode::Pf => models.values().collect(),
                Mode::Solvec => vec![solvec_target.unwrap().0],
            },
            target_comps: target_comps.clone(),
            target_ports: match mode {
                Mode::Pf => Some(&port_set),
                Mode::Solvec => None,
            },
        };
        builders::such_that::build_comps_sets(&mut buf, topo, &ctx);
        builders::such_that::build_port_sets(&mut buf, topo, &ctx);
    }

    if mode == Mode::Pf {
        let comps_set: HashSet<CompId> = target_comps.iter().copied().collect();
        builders::flow_ports::build_flow_ports(&mut buf, topo, &target_ports, &comps_set, false);
    }

    builders::channels::build_channels(&mut buf, topo, channels, mode);

    let vt = builders::varidx::build_vartable(topo, channels, &target_ports);
    vt.save(vt_file)?;
    buf.push(&vt.text);

    builders::flow_in_channels::build_flow_in_channels(&mut buf, topo, &vt, &target_ports);

    if mode == Mode::Pf {
        let comps_set: HashSet<CompId> = HashSet::new();
        builders::ijk2ls::build_ijk2ls(&mut buf, topo, &vt, &target_ports, &comps_set, false);
        builders::width::build_width(&mut buf, topo, channels[0]);
        builders::pair::build_pair(&mut buf, topo, channels, &port_set, &vt)?;
        builders::cost::build_cost(&mut buf, topo, channels, &target_comps, &vt);
        builders::cost::build_out_of_service(&mut buf, topo, channels, &target_comps, &vt);
    }

    let (data, model) = buf.into_parts();
    Ok(SkeletonOutput { data, model, vt })
}

#[cfg(test)]
mod tests {
    use super::*;
    use onra_core::test_utils::line_topology;
    use tempfile::TempDir;

    #[test]
    fn pf_skeleton_has_all_sections() {
        let topo = line_topology();
        let dir = TempDir::new().unwrap();
        let vt_file = dir.path().join("pf.vt.json");
        let ch1 = topo.channel_by_full_no("WDM32_1").unwrap();
        let out = make_skeleton(
            &topo,
            Mode::Pf,
            true,
            &[ch1],
            &BTreeMap::new(),
            None,
            &vt_file,
        )
        .unwrap();
        for section in [
            "set V :=",
            "set FlowInPorts[",
            "set FlowOutPorts[",
            "set Channels_WDM32 := WDM32_1;",
            "param vt default 0 :=",
            "param NUM_VARS :=",
            "set FlowInChannels[",
            "set IJK2Ls[",
            "param widthOK default 1 :=",
            "set ChannelRange[WDM32_1] := WDM32_1;",
            "param pair default 0 :=",
            "param cost default 0 :=",
            "set OUT_OF_SERVICES :=",
        ] {
            assert!(out.data.contains(section), "missing section {section}");
        }
        assert!(vt_file.exists());
        assert!(out.model.is_some());
    }

    #[test]
    fn skeleton_emission_is_deterministic() {
        let topo = line_topology();
        let dir = TempDir::new().unwrap();
        let ch1 = topo.channel_by_full_no("WDM32_1").unwrap();
        let a = make_skeleton(
            &topo,
            Mode::Pf,
            false,
            &[ch1],
            &BTreeMap::new(),
            None,
            &dir.path().join("a.vt.json"),
        )
        .unwrap();
        let b = make_skeleton(
            &topo,
            Mode::Pf,
            false,
            &[ch1],
            &BTreeMap::new(),
            None,
            &dir.path().join("b.vt.json"),
        )
        .unwrap();
        assert_eq!(a.data, b.data);
    }
}
