//! Pathfinder compiler: the global pathfinding model plus one skeleton data
//! file per channel, and the per-device solvec models and skeletons.
//!
//! The per-model constraints from `ac/*.model` are rewritten against the
//! global variable space: domains re-bind to the per-component flow sets
//! and every `c[...]` subscript goes through the variable table
//! (`c2[vt[i,j,k,l]]`).

use crate::builders::Mode;
use crate::models::{load_all_modelfiles, solvec_targets};
use crate::skeleton::make_skeleton;
use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use onra_core::glpk::{Domain, ModelGroup, StBody};
use onra_core::text::{escape, format_glpk};
use onra_core::topology::Topology;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Marker in the base model templates where the rewritten per-model
/// constraints are spliced in.
pub const CONSTRAINT_STATEMENTS: &str = "### CONSTRAINT_STATEMENTS ###";

static ST_ONE_COND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"s\.t\. +([^\{]+) *\{([^\}:]+) *: *([^\}]+)\} *: *(.+?) *([<>=]+) *(.+);").unwrap()
});
static ST_SUM_COND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"s\.t\. +([^\{]+) *\{([^\}]+)\} *: *sum\{([^\}:]+) *: *([^\}]+)\} *(.+?) *([<>=]+) *(.+);",
    )
    .unwrap()
});
static J_PLUS_ONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"j *\+ *1").unwrap());

/// Pretty-print one rewritten constraint and route `c`-subscripts through
/// `vt`.
fn format_constraint(glpk: &str, var_cname: &str) -> String {
    let glpk = format_glpk(glpk);
    let glpk = ST_ONE_COND.replace_all(
        &glpk,
        "s.t. ${1}{\n\t${2}\n\t\t: ${3}} :\n\t${4}\n\t${5}\n\t${6};",
    );
    let glpk = ST_SUM_COND.replace_all(
        &glpk,
        "s.t. ${1}{\n\t${2}} :\n\tsum{${3}\n\t\t\t: ${4}}\n\t\t${5}\n\t${6}\n\t${7};",
    );
    let var_subscript =
        Regex::new(&format!(r"{var_cname}\[([^,]+, *[^,]+, *[^,]+, *[^,]+)\]")).unwrap();
    var_subscript
        .replace_all(&glpk, format!("{var_cname}[vt[${{1}}]]"))
        .into_owned()
}

/// Re-bind a fragment domain to the per-component flow sets.
fn fix_domain(domain: &Domain, hasvars: &mut HashSet<String>) -> String {
    let mut buf = String::new();
    for (key, val) in &domain.var_inset {
        if !buf.is_empty() {
            buf.push(',');
        }
        buf.push_str(&format!("{key} in "));
        match key.as_str() {
            "i" => buf.push_str(&format!("{val}[comp]")),
            "j" => {
                if hasvars.contains("i") {
                    buf.push_str("FlowInChannels[i]");
                } else {
                    buf.push_str(val);
                }
            }
            "k" => {
                if hasvars.contains("i") {
                    buf.push_str("FlowOutPorts[i]");
                } else {
                    buf.push_str(&format!("{val}[comp]"));
                }
            }
            "l" => {
                if ["i", "j", "k"].iter().all(|v| hasvars.contains(*v)) {
                    buf.push_str("IJK2Ls[i,j,k]");
                } else {
                    buf.push_str(val);
                }
            }
            _ => buf.push_str(val),
        }
        hasvars.insert(key.clone());
    }
    buf
}

/// Rewrite one model's constraints into global-model text. `var_cname` is
/// `c2` for the pathfinding model and `c` for the solvec models.
pub fn output_model_constraints(model: &ModelGroup, var_cname: &str) -> Result<String> {
    let model_id = escape(&model.name);
    let mut lines: Vec<String> = vec![String::new(), "#".to_string(), format!("# {}", model.name)];
    for st in &model.glpk.stdefs {
        lines.push(format!("#   {}", st.org));
    }
    lines.push("#".to_string());

    for st in &model.glpk.stdefs {
        let mut buf = String::new();
        if st.domain.domain == "AvailableConnection" {
            let StBody::Var(varcond) = &st.body else {
                bail!(
                    "unsupported sum constraint over AvailableConnection in model {}",
                    model.name
                );
            };
            buf.push_str(&format!(
                "s.t. {model_id}_{}{{comp in Comps_{model_id}, i in InputPort[comp], \
                 j in FlowInChannels[i], k in FlowOutPorts[i], l in IJK2Ls[i, j, k] \
                 : vt[i, j, k, l] > 0",
                st.name
            ));
            buf.push_str(&format!("}}:{}", varcond.org.replace("c[", &format!("{var_cname}["))));
        } else {
            let mut hasvars: HashSet<String> = HashSet::new();
            buf.push_str(&format!(
                "s.t. {model_id}_{}{{comp in Comps_{model_id}, {}",
                st.name,
                fix_domain(&st.domain, &mut hasvars)
            ));
            match &st.body {
                StBody::Sum(sum) => {
                    buf.push_str("}:sum{");
                    buf.push_str(&format!(
                        "{}:vt[{}] > 0}}",
                        fix_domain(&sum.domain, &mut hasvars),
                        sum.var_c.to_type()
                    ));
                    buf.push_str(&format!(
                        "{var_cname}[{}] {} {}",
                        sum.var_c.to_text(),
                        sum.op,
                        sum.num
                    ));
                }
                StBody::Var(varcond) => {
                    buf.push_str(&format!(" : vt[{}] > 0", varcond.c_left.to_type()));
                    let mut body = varcond.org.clone();
                    if let Some(cond) = &st.domain.cond {
                        let cond = J_PLUS_ONE.replace_all(cond, "nextCh[j]");
                        body = J_PLUS_ONE.replace_all(&body, "nextCh[j]").into_owned();
                        buf.push_str(&format!("  && {cond}"));
                    }
                    buf.push_str(&format!("}}:{}", body.replace("c[", &format!("{var_cname}["))));
                }
            }
        }
        buf.push(';');
        lines.push(format_constraint(&buf, var_cname));
    }
    Ok(lines.join("\n"))
}

/// Split a base model template at the constraint marker.
pub fn read_base_model(path: &Path) -> Result<(String, String)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading base model '{}'", path.display()))?;
    let idx = text
        .find(CONSTRAINT_STATEMENTS)
        .ok_or_else(|| anyhow!("cannot find {CONSTRAINT_STATEMENTS} in {}", path.display()))?
        + CONSTRAINT_STATEMENTS.len();
    info!("load base model: {}", path.display());
    Ok((text[..idx].to_string(), text[idx..].to_string()))
}

fn write_model_file(
    path: &Path,
    base: &(String, String),
    skeleton_model: &str,
    constraints: &str,
) -> Result<()> {
    let text = format!("{}\n{}{}{}", base.0, skeleton_model, constraints, base.1);
    fs::write(path, text).with_context(|| format!("writing model '{}'", path.display()))
}

/// Emit the global pathfinding model and one skeleton per channel.
fn make_pathfinder_pf(
    topo: &Topology,
    skeleton_dir: &Path,
    base_file: &Path,
    model_key: &str,
    data_key: &str,
    models: &std::collections::BTreeMap<String, ModelGroup>,
) -> Result<()> {
    let base = read_base_model(base_file)?;
    let constraints: Vec<String> = models
        .values()
        .map(|m| output_model_constraints(m, "c2"))
        .collect::<Result<_>>()?;
    let constraints = constraints.join("\n");

    let mut write_model = true;
    for ch in topo.all_channels() {
        let channel = topo.channel(ch);
        if topo.support_comps(&channel.table_id).is_empty() {
            info!("{} has no support ports SKIP glpsol", channel.full_no);
            continue;
        }
        // Keys may contain dots, so suffixes are appended outright.
        let name = format!("pf_{data_key}_{}", channel.full_no);
        let skeleton_file = skeleton_dir.join(format!("{name}.data"));
        let vt_file = skeleton_dir.join(format!("{name}.vt.json"));

        let out = make_skeleton(topo, Mode::Pf, write_model, &[ch], models, None, &vt_file)?;
        if write_model {
            let model_path = skeleton_dir.join(format!("pf_{model_key}.model"));
            write_model_file(
                &model_path,
                &base,
                out.model.as_deref().unwrap_or(""),
                &constraints,
            )?;
            info!("{}", model_path.display());
            write_model = false;
        }
        fs::write(&skeleton_file, &out.data)
            .with_context(|| format!("writing '{}'", skeleton_file.display()))?;
        info!("{}", skeleton_file.display());
    }
    Ok(())
}

/// Emit the per-device solvec models and chunked skeletons.
fn make_pathfinder_solvec(
    topo: &Topology,
    skeleton_dir: &Path,
    base_file: &Path,
    model_key: &str,
    data_key: &str,
    models: &std::collections::BTreeMap<String, ModelGroup>,
    num_comps: usize,
) -> Result<()> {
    let base = read_base_model(base_file)?;
    let channels: Vec<_> = topo.all_channels().collect();
    for per_model in solvec_targets(models, num_comps) {
        let mut write_model = true;
        for (model_name, chunk, file_idx) in per_model {
            let model = models
                .get(&model_name)
                .ok_or_else(|| anyhow!("unknown model {model_name}"))?;
            let model_id = escape(&model_name);
            let name = format!("solvec_{data_key}_{model_id}_{file_idx}");
            let skeleton_file = skeleton_dir.join(format!("{name}.data"));
            let vt_file = skeleton_dir.join(format!("{name}.vt.json"));

            let out = make_skeleton(
                topo,
                Mode::Solvec,
                write_model,
                &channels,
                models,
                Some((model, &chunk)),
                &vt_file,
            )?;
            fs::write(&skeleton_file, &out.data)
                .with_context(|| format!("writing '{}'", skeleton_file.display()))?;
            info!("{}", skeleton_file.display());
            if write_model {
                // Every chunk of one model shares its model file.
                let constraints = output_model_constraints(model, "c")?;
                let model_path =
                    skeleton_dir.join(format!("solvec_{model_key}_{model_id}.model"));
                write_model_file(
                    &model_path,
                    &base,
                    out.model.as_deref().unwrap_or(""),
                    &constraints,
                )?;
                info!("{}", model_path.display());
                write_model = false;
            }
        }
    }
    Ok(())
}

/// Read the topology + ac files and emit every pathfinder artifact.
#[allow(clippy::too_many_arguments)]
pub fn make_pathfinder(
    topo: &Topology,
    glpk_dir: &Path,
    pf_base_file: &Path,
    solvec_base_file: &Path,
    model_key: &str,
    data_key: &str,
    solvec: bool,
    num_comps: usize,
) -> Result<()> {
    let ac_dir = glpk_dir.join("ac");
    let skeleton_dir = glpk_dir.join("glpk");
    fs::create_dir_all(&skeleton_dir)
        .with_context(|| format!("creating '{}'", skeleton_dir.display()))?;

    let models = load_all_modelfiles(topo, &ac_dir)?;
    make_pathfinder_pf(topo, &skeleton_dir, pf_base_file, model_key, data_key, &models)?;
    if solvec {
        make_pathfinder_solvec(
            topo,
            &skeleton_dir,
            solvec_base_file,
            model_key,
            data_key,
            &models,
            num_comps,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use onra_core::glpk::Glpk;
    use onra_core::topology::CompId;

    fn model_with(glpk: &str) -> ModelGroup {
        let mut model = ModelGroup::new("WSS_100_9", Glpk::parse(glpk).unwrap());
        model.add_component(CompId(0), "N1211", true);
        model
    }

    #[test]
    fn sum_constraint_is_rebound_to_flow_sets() {
        let model = model_with(
            "s.t. input{j in Channels_WDM32, k in OutputPort} : \
             sum{i in InputPort} c[i, j, k, j] <= 1;",
        );
        let out = output_model_constraints(&model, "c2").unwrap();
        assert!(out.contains("s.t. WSS_100_9_input{"));
        assert!(out.contains("comp in Comps_WSS_100_9"));
        // j binds before i, so it keeps its set; k binds without i seen ->
        // OutputPort[comp].
        assert!(out.contains("j in Channels_WDM32"));
        assert!(out.contains("k in OutputPort[comp]"));
        assert!(out.contains("i in InputPort[comp]"));
        assert!(out.contains("vt[i, j, k, j] > 0"));
        assert!(out.contains("c2[vt[i, j, k, j]]"));
        assert!(out.contains("#   s.t. input"));
    }

    #[test]
    fn available_connection_domain_uses_ijk2ls() {
        let model = model_with(
            "set AvailableConnection := {i in InputPort, j in Channels_WDM32, \
             k in OutputPort, l in Channels_WDM32 : j = l};\
             s.t. demux{AvailableConnection} : c[i, j, k, l] = 1;",
        );
        let out = output_model_constraints(&model, "c2").unwrap();
        assert!(out.contains("l in IJK2Ls[i, j, k]"));
        assert!(out.contains("vt[i, j, k, l] > 0"));
        // The pretty-printer splits the body across lines.
        assert!(out.contains("c2[vt[i, j, k, l]]"));
    }

    #[test]
    fn wavelength_chain_gets_next_ch() {
        let model = model_with(
            "s.t. wavelength{i in InputPort, k in OutputPort, j in Channels_WDM32 : \
             j + 1 in Channels_WDM32} : c[i, j, k, j] = c[i, j + 1, k, j + 1];",
        );
        let out = output_model_constraints(&model, "c").unwrap();
        assert!(out.contains("nextCh[j] in Channels_WDM32"));
        assert!(out.contains("c[vt[i, nextCh[j], k, nextCh[j]]]"));
        assert!(!out.contains("j + 1"));
    }

    #[test]
    fn base_model_splits_at_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pf-template.model");
        fs::write(
            &path,
            "param NUM_VARS;\n### CONSTRAINT_STATEMENTS ###\nsolve;\nend;\n",
        )
        .unwrap();
        let (head, tail) = read_base_model(&path).unwrap();
        assert!(head.ends_with(CONSTRAINT_STATEMENTS));
        assert_eq!(tail, "\nsolve;\nend;\n");

        fs::write(&path, "no marker\n").unwrap();
        assert!(read_base_model(&path).is_err());
    }
}
