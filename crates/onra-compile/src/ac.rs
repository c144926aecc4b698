//! Available-connections builder.
//!
//! For every component model carrying a GLPK fragment this emits
//! `ac/<model>.model` (the rewritten per-component enumeration problem) and
//! `ac/<model>.conn.txt` (every feasible internal connection tuple), plus a
//! shared `ac/channels.data`.
//!
//! Enumeration runs the ILP in all-solutions mode: each solve activates
//! exactly one feasible tuple, a cut then forbids that activation, and the
//! loop ends when the problem turns infeasible. Re-running with the
//! accumulated cuts is infeasible on the first attempt, which is the
//! completeness check the tests rely on.

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use onra_core::component::Component;
use onra_core::conn::ConnEntry;
use onra_core::text::{escape, expand_numset, format_glpk};
use onra_core::topology::Topology;
use onra_io::conn_file;
use onra_solver::{GlpsolDriver, SolveOutcome};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{error, info};
use uuid::Uuid;

/// Shared channel data file written once per run.
pub const CHANNELS_FILENAME: &str = "channels.data";

/// `set Channels_<id>; ... set AllChannels; param chNo{AllChannels};`
fn make_channels_def(topo: &Topology) -> String {
    let mut buf = String::new();
    for table in topo.tables() {
        buf.push_str(&format!("set Channels_{};", table.id));
    }
    buf.push_str("set AllChannels;");
    buf.push_str("param chNo{AllChannels};");
    buf
}

/// The body of `ac/channels.data`.
fn make_channels_data(topo: &Topology) -> String {
    let mut buf = String::new();
    let mut all = String::new();
    let mut chno = String::new();
    for table in topo.tables() {
        buf.push_str(&format!("set Channels_{} :=", table.id));
        for ch in &table.channels {
            buf.push_str(&format!(" {}", ch.full_no));
            all.push_str(&format!(" {}", ch.full_no));
            chno.push_str(&format!(" {} {}", ch.full_no, ch.no));
        }
        buf.push(';');
    }
    buf.push_str(&format!("set AllChannels :={all};"));
    buf.push_str(&format!("param chNo :={chno};"));
    format_glpk(&expand_numset(&buf))
}

static ST_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"s\. *t\. *").unwrap());

fn format_fragment(glpk: &str) -> String {
    let glpk = expand_numset(glpk);
    let glpk = format_glpk(&glpk);
    // Constraints stay in the file as documentation; only the set
    // definitions drive the enumeration.
    ST_LINE.replace_all(&glpk, "# s.t. ").into_owned()
}

/// Map the fragment's `Channels` placeholders to concrete table sets from
/// the component's `GLPKchannelTableId` attribute.
fn channels_map(comp: &Component) -> Result<Vec<(String, String)>> {
    let table_id = comp
        .table_id
        .as_deref()
        .ok_or_else(|| anyhow!("component {} has GLPK but no GLPKchannelTableId", comp.name))?;
    let ids: Vec<&str> = table_id.split(',').map(str::trim).collect();
    if ids.len() == 1 {
        Ok(vec![(
            "Channels".to_string(),
            format!("Channels_{}", escape(ids[0])),
        )])
    } else {
        Ok(ids
            .iter()
            .enumerate()
            .map(|(n, id)| {
                (
                    format!("Channels{}", n + 1),
                    format!("Channels_{}", escape(id)),
                )
            })
            .collect())
    }
}

fn fix_channels_name(comp: &Component, glpk: &str) -> Result<String> {
    let mut out = glpk.to_string();
    for (from, to) in channels_map(comp)? {
        out = out.replace(&from, &to);
    }
    Ok(out)
}

/// Port numbers per direction: `("1,3", "2,4")`. BiDi ports appear on both
/// sides.
fn io_port_defs(topo: &Topology, comp_id: onra_core::topology::CompId) -> (String, String) {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for pid in topo.ports_of(comp_id) {
        let p = topo.port(pid);
        if p.is_in() {
            inputs.push(p.number.to_string());
        }
        if p.is_out() {
            outputs.push(p.number.to_string());
        }
    }
    (inputs.join(","), outputs.join(","))
}

static AC_SET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"set +(AvailableConnection[^ ]*) *:= *\{([^}]+)\} *;?").unwrap());
static JL_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([jl])\b").unwrap());

/// Rewrite `j`/`l` comparisons in a set condition to `chNo[j]`/`chNo[l]`.
fn fix_set_condition(setdef: &str) -> Result<String> {
    let parts: Vec<&str> = setdef.splitn(3, ':').collect();
    match parts.as_slice() {
        [_] => Ok(setdef.to_string()),
        [domain, cond] => {
            let cond = JL_VAR.replace_all(cond, "chNo[$1]");
            Ok(format!("{domain}\n\t: {cond}"))
        }
        _ => bail!("SYNTAX ERROR: {setdef}"),
    }
}

/// Rewrite a component's fragment into the enumeration model body.
fn rewrite_fragment(comp: &Component, glpk: &str) -> Result<String> {
    let mut buf = String::new();
    let mut idx = 0;
    let mut ac_names: HashSet<String> = HashSet::new();
    for caps in AC_SET.captures_iter(glpk) {
        let cond_span = caps.get(2).unwrap();
        buf.push_str(&glpk[idx..cond_span.start()]);
        buf.push_str(&fix_set_condition(cond_span.as_str())?);
        ac_names.insert(caps[1].to_string());
        idx = cond_span.end();
    }
    buf.push_str(&glpk[idx..]);

    if ac_names.len() >= 2 && !buf.contains("set AvailableConnection :=") {
        // Several AvailableConnection* sets but no union over them yet.
        let mut names: Vec<String> = ac_names.into_iter().collect();
        names.sort();
        buf.push_str(&format!(
            "set AvailableConnection := {};",
            names.join(" union ")
        ));
        info!(
            "append AvailableConnection definition for {}",
            comp.model.as_deref().unwrap_or("?")
        );
    }
    fix_channels_name(comp, &buf)
}

/// The enumeration head (declarations + fragment + variables) and tail
/// (`solve` + tuple printf). Cuts are inserted between the two.
pub fn build_enum_model(
    topo: &Topology,
    comp_id: onra_core::topology::CompId,
    ch_def: &str,
) -> Result<(String, String)> {
    let comp = topo.comp(comp_id);
    let glpk = comp
        .glpk
        .as_deref()
        .ok_or_else(|| anyhow!("component {} has no GLPK fragment", comp.name))?;
    let fragment = rewrite_fragment(comp, glpk)?;
    let (inputs, outputs) = io_port_defs(topo, comp_id);

    let head_raw = format!(
        "{ch_def}set InputPort := {{{inputs}}};set OutputPort := {{{outputs}}};{fragment}"
    );
    let mut head = format_fragment(&head_raw);
    head.push_str(
        "var a{(i,j,k,l) in AvailableConnection}, binary;\n\
         minimize ENUM_ORDER :\n\
         \tsum{(i,j,k,l) in AvailableConnection} (chNo[j] * 1000 + i * 10 + k) * a[i,j,k,l];\n\
         s.t. pick_one : sum{(i,j,k,l) in AvailableConnection} a[i,j,k,l] = 1;\n",
    );
    let tail = "solve;\n\
                printf{(i,j,k,l) in AvailableConnection : a[i,j,k,l] > 0.5} \
                \"(%d,%s,%d,%s)\\n\", i, j, k, l;\n\
                end;\n"
        .to_string();
    Ok((head, tail))
}

/// A cut forbidding one previously-found activation.
fn cut_line(n: usize, entry: &ConnEntry) -> String {
    format!(
        "s.t. cut_{n} : a[{},'{}',{},'{}'] = 0;\n",
        entry.in_pin, entry.in_ch, entry.out_pin, entry.out_ch
    )
}

/// Solve-with-cuts until infeasible, collecting every activation.
pub fn enumerate_connections(
    head: &str,
    tail: &str,
    channels_data: &Path,
    work_dir: &Path,
    driver: &GlpsolDriver,
) -> Result<Vec<ConnEntry>> {
    let mut cuts = String::new();
    let mut entries: Vec<ConnEntry> = Vec::new();
    loop {
        let model_file = work_dir.join(format!("enum_{}.model", entries.len()));
        let sol_file = work_dir.join(format!("enum_{}.sol", entries.len()));
        fs::write(&model_file, format!("{head}{cuts}{tail}"))
            .with_context(|| format!("writing enumeration model '{}'", model_file.display()))?;
        match driver.solve(&model_file, channels_data, &sol_file, false)? {
            SolveOutcome::Infeasible => break,
            SolveOutcome::Optimal(sol) => {
                let found = conn_file::parse_conn_text(&sol.stdout);
                if found.is_empty() {
                    bail!("enumeration solve produced no activation tuple");
                }
                for entry in &found {
                    cuts.push_str(&cut_line(entries.len(), entry));
                    entries.push(entry.clone());
                }
            }
        }
    }
    Ok(entries)
}

/// Build `ac/channels.data`, the per-model `.model` files, and enumerate
/// each model's `.conn.txt`.
pub fn make_available_connections(
    topo: &Topology,
    glpk_dir: &Path,
    driver: &GlpsolDriver,
) -> Result<()> {
    let ac_dir = glpk_dir.join("ac");
    fs::create_dir_all(&ac_dir)
        .with_context(|| format!("creating ac directory '{}'", ac_dir.display()))?;

    let channels_data_path = ac_dir.join(CHANNELS_FILENAME);
    fs::write(
        &channels_data_path,
        format!("{}end;\n", make_channels_data(topo)),
    )
    .with_context(|| format!("writing '{}'", channels_data_path.display()))?;

    let ch_def = make_channels_def(topo);
    let work_dir = glpk_dir.join("tmp").join(Uuid::new_v4().to_string());
    fs::create_dir_all(&work_dir)
        .with_context(|| format!("creating work directory '{}'", work_dir.display()))?;

    let mut done: HashSet<String> = HashSet::new();
    for comp_id in topo.comp_ids() {
        let comp = topo.comp(comp_id);
        let (Some(model), Some(_)) = (comp.model.clone(), comp.glpk.as_deref()) else {
            continue;
        };
        if !done.insert(model.clone()) {
            continue;
        }

        let (head, tail) = build_enum_model(topo, comp_id, &ch_def)?;
        let model_path = ac_dir.join(conn_file::model_filename(&model));
        fs::write(&model_path, format!("{head}{tail}"))
            .with_context(|| format!("writing '{}'", model_path.display()))?;

        match enumerate_connections(&head, &tail, &channels_data_path, &work_dir, driver) {
            Ok(entries) => {
                let conn_path = ac_dir.join(conn_file::conn_filename(&model));
                conn_file::write_conn_file(&conn_path, &entries)?;
                info!("OK\t{} ({} tuples)", conn_path.display(), entries.len());
            }
            Err(e) => {
                error!("**** GLPK ERROR (model={model}) ****");
                error!("{e}");
            }
        }
    }
    let _ = fs::remove_dir_all(&work_dir);
    Ok(())
}
