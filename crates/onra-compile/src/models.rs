//! Loading the per-model constraint files and chunking solvec targets.

use anyhow::{Context, Result};
use onra_core::glpk::{Glpk, ModelGroup};
use onra_core::topology::{CompId, Topology};
use onra_io::conn_file::model_filename;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Read every `ac/<model>.model` referenced by the topology and group the
/// components by model. Models whose fragment has no `s.t.` constraints are
/// excluded (they impose nothing on the global problem).
pub fn load_all_modelfiles(topo: &Topology, ac_dir: &Path) -> Result<BTreeMap<String, ModelGroup>> {
    let mut models: BTreeMap<String, ModelGroup> = BTreeMap::new();
    for id in topo.comp_ids() {
        let comp = topo.comp(id);
        let Some(model_name) = comp.model.as_deref() else {
            continue;
        };
        if let Some(group) = models.get_mut(model_name) {
            group.add_component(id, &comp.name, comp.has_controller());
            continue;
        }
        let path = ac_dir.join(model_filename(model_name));
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading model file '{}'", path.display()))?;
        let glpk = Glpk::parse(&text)?;
        if glpk.stdefs.is_empty() {
            info!("model {model_name} has no constraints SKIP");
            continue;
        }
        let mut group = ModelGroup::new(model_name, glpk);
        group.add_component(id, &comp.name, comp.has_controller());
        models.insert(model_name.to_string(), group);
    }
    Ok(models)
}

/// One solvec work unit: `(model name, component chunk, file index)`.
pub type SolvecTarget = (String, Vec<CompId>, usize);

/// Chunk each solvec-eligible model's components into groups of `num_comps`
/// (`0` means one chunk per model). Models without an intermediate
/// controller are excluded. File indices start at 1 per model.
pub fn solvec_targets(
    models: &BTreeMap<String, ModelGroup>,
    num_comps: usize,
) -> Vec<Vec<SolvecTarget>> {
    let mut out = Vec::new();
    for model in models.values() {
        if !model.hascon {
            continue;
        }
        let mut per_model = Vec::new();
        if num_comps == 0 || model.comps.len() <= num_comps {
            per_model.push((model.name.clone(), model.comps.clone(), 1));
        } else {
            for (i, chunk) in model.comps.chunks(num_comps).enumerate() {
                per_model.push((model.name.clone(), chunk.to_vec(), i + 1));
            }
        }
        out.push(per_model);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str, n_comps: usize, hascon: bool) -> ModelGroup {
        let glpk = Glpk::parse("s.t. x{i in InputPort, j in Channels, k in OutputPort} : c[i, j, k, j] = 1;").unwrap();
        let mut group = ModelGroup::new(name, glpk);
        for i in 0..n_comps {
            group.add_component(CompId(i), &format!("N{i}"), hascon);
        }
        group
    }

    #[test]
    fn zero_num_comps_gives_one_chunk() {
        let mut models = BTreeMap::new();
        models.insert("WSS".to_string(), model("WSS", 5, true));
        let targets = solvec_targets(&models, 0);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].len(), 1);
        assert_eq!(targets[0][0].1.len(), 5);
        assert_eq!(targets[0][0].2, 1);
    }

    #[test]
    fn chunking_splits_and_numbers_from_one() {
        let mut models = BTreeMap::new();
        models.insert("WSS".to_string(), model("WSS", 5, true));
        let targets = solvec_targets(&models, 2);
        let chunks = &targets[0];
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].1.len(), 2);
        assert_eq!(chunks[2].1.len(), 1);
        assert_eq!(chunks[0].2, 1);
        assert_eq!(chunks[2].2, 3);
    }

    #[test]
    fn models_without_controller_are_excluded() {
        let mut models = BTreeMap::new();
        models.insert("WSS".to_string(), model("WSS", 2, true));
        models.insert("EDFA".to_string(), model("EDFA", 2, false));
        let targets = solvec_targets(&models, 0);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0][0].0, "WSS");
    }
}
