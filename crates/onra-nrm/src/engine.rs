//! The pathfinding/reservation engine.
//!
//! One request is canonicalized into a channel trial list, solved per
//! channel under a bounded rayon pool, ERO segments are chained through the
//! accumulated in-use routes, bidirectional requests get a welded back
//! route, and the per-device solvec decomposition re-solves each eligible
//! device chunk concurrently. Nothing is committed here; the operations
//! layer owns the registry.

use crate::result;
use crate::route::{PortChannel, Route, RouteEntry};
use crate::simple_path;
use anyhow::{anyhow, Context};
use onra_compile::skeleton::pf_target_ports;
use onra_compile::{instance, models::solvec_targets, InstanceSpec, TupleRef, VarTable};
use onra_core::channel::WDM_ID;
use onra_core::glpk::ModelGroup;
use onra_core::text::natural_cmp;
use onra_core::topology::{ChannelId, CompId, PortId, Topology};
use onra_solver::{GlpsolDriver, SolveOutcome, SolverError};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Solver time limit for one pathfinding run.
pub const MAX_SEC_PATH_FIND: u64 = 120;
/// Solver time limit for one device sub-solve.
pub const MAX_SEC_SOLVEC: u64 = 120;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No feasible route; a regular client-visible outcome.
    #[error("PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION\n{}", .0.join("\n"))]
    NoRoute(Vec<String>),

    /// The solver failed hard; the request is aborted, the server stays up.
    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Engine configuration derived from `param.json`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub glpk_dir: PathBuf,
    /// Default model/data file key (the configured topology file name).
    pub topo_xml_key: String,
    pub num_comps: usize,
    pub tmlim_pf: u64,
    pub tmlim_solvec: u64,
    /// The solver executable. Swapping in another ILP solver only means
    /// another driver behind this path.
    pub solver_binary: PathBuf,
}

/// One canonicalized pathfinding/reserve request.
#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub src: PortId,
    pub dst: PortId,
    pub bidi: bool,
    pub ero: Vec<PortId>,
    pub channels: Vec<ChannelId>,
    pub threads: usize,
    pub model_key: String,
    pub data_key: String,
}

/// One per-channel pathfinding answer.
#[derive(Debug, Clone)]
struct PfAnswer {
    ch: ChannelId,
    cost: f64,
    route: Route,
}

/// The long-lived engine state shared by every request.
pub struct Engine {
    pub topo: Arc<Topology>,
    models: BTreeMap<String, ModelGroup>,
    cfg: EngineConfig,
    /// Delete per-request temp dirs on success (`deltmp` subcommand).
    pub deltmp: AtomicBool,
    /// Log raw solver output (`dumpglpsol` subcommand).
    pub dumpglpsol: AtomicBool,
    /// Round-robin cursor for `--wdmsa`; process-local, resets on restart.
    wdmsa_cursor: AtomicUsize,
}

impl Engine {
    pub fn new(
        topo: Arc<Topology>,
        models: BTreeMap<String, ModelGroup>,
        cfg: EngineConfig,
    ) -> Engine {
        Engine {
            topo,
            models,
            cfg,
            deltmp: AtomicBool::new(true),
            dumpglpsol: AtomicBool::new(false),
            wdmsa_cursor: AtomicUsize::new(0),
        }
    }

    pub fn skeleton_dir(&self) -> PathBuf {
        self.cfg.glpk_dir.join("glpk")
    }

    pub fn default_file_key(&self) -> &str {
        &self.cfg.topo_xml_key
    }

    /// Resolve the channel trial list.
    ///
    /// `-ch` names win; `--wdmsa` picks exactly one WDM channel round-robin
    /// across calls; otherwise every optical channel is tried in
    /// `(table, no)` order.
    pub fn make_channels(
        &self,
        ch_specs: Option<&[String]>,
        wdmsa: bool,
    ) -> anyhow::Result<Vec<ChannelId>> {
        if let Some(specs) = ch_specs {
            let mut set: HashSet<ChannelId> = HashSet::new();
            for spec in specs {
                let bounds: Vec<&str> = spec.split("..").collect();
                match bounds.as_slice() {
                    [name] => {
                        set.insert(self.lookup_channel(name)?);
                    }
                    [start, end] => {
                        let start_ch = self.lookup_channel(start)?;
                        let end_ch = self.lookup_channel(end)?;
                        let (s, e) = (self.topo.channel(start_ch), self.topo.channel(end_ch));
                        if s.table_id != e.table_id {
                            return Err(anyhow!("different ChannelTable : {spec}"));
                        }
                        let members: Vec<ChannelId> = self
                            .topo
                            .table_channels(&s.table_id)
                            .into_iter()
                            .filter(|&id| {
                                let no = self.topo.channel(id).no;
                                s.no <= no && no <= e.no
                            })
                            .collect();
                        if members.is_empty() {
                            return Err(anyhow!("invalid channels : {spec}"));
                        }
                        set.extend(members);
                    }
                    _ => return Err(anyhow!("invalid channels : {spec}")),
                }
            }
            let mut list: Vec<ChannelId> = set.into_iter().collect();
            list.sort_by(|&a, &b| {
                natural_cmp(
                    &self.topo.channel(a).full_no,
                    &self.topo.channel(b).full_no,
                )
            });
            return Ok(list);
        }

        if wdmsa {
            let table = self
                .topo
                .tables()
                .iter()
                .find(|t| t.is_wdm())
                .ok_or_else(|| anyhow!("there are no {WDM_ID} channels"))?;
            let channels = self.topo.table_channels(&table.id);
            let idx = self.wdmsa_cursor.fetch_add(1, Ordering::SeqCst) % channels.len();
            return Ok(vec![channels[idx]]);
        }

        Ok(self.topo.all_channels().collect())
    }

    fn lookup_channel(&self, name: &str) -> anyhow::Result<ChannelId> {
        self.topo
            .channel_by_full_no(name)
            .ok_or_else(|| anyhow!("invalid channel name : {name}"))
    }

    /// Find a route for the request. Returns the merged route and any
    /// non-fatal warnings collected along the way.
    pub fn find_route(
        &self,
        args: &QueryArgs,
        mut used_route: Route,
        mut used_conn: Route,
        work_id: &str,
    ) -> Result<(Route, Vec<String>), EngineError> {
        if args.src == args.dst {
            // Zero-hop request: nothing to solve, nothing selected.
            return Ok((Route::new(), Vec::new()));
        }

        let work_dir = self.cfg.glpk_dir.join("tmp").join(work_id);
        fs::create_dir_all(&work_dir)
            .with_context(|| format!("creating work dir '{}'", work_dir.display()))
            .map_err(EngineError::Internal)?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(args.threads.max(1))
            .build()
            .context("building solver thread pool")
            .map_err(EngineError::Internal)?;

        let mut errors: Vec<String> = Vec::new();
        let candidates = if args.ero.is_empty() {
            let results = self.pf_query_path(
                args,
                args.src,
                args.dst,
                &[],
                &used_route,
                &used_conn,
                &work_dir,
                &pool,
            )?;
            let mut answers: Vec<PfAnswer> = results.into_iter().flatten().collect();
            answers.sort_by(|a, b| {
                a.cost
                    .partial_cmp(&b.cost)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(self.topo.channel(a.ch).no.cmp(&self.topo.channel(b.ch).no))
            });
            if answers.is_empty() {
                errors.push("cannot find usable route".to_string());
            }
            answers.into_iter().map(|a| a.route).collect::<Vec<Route>>()
        } else {
            match self.query_with_ero(args, &mut used_route, &mut used_conn, &work_dir, &pool) {
                Ok(routes) => routes,
                Err(EngineError::NoRoute(mut msgs)) => {
                    errors.append(&mut msgs);
                    Vec::new()
                }
                Err(e) => return Err(e),
            }
        };

        for candidate in candidates {
            match self.finish_candidate(args, candidate, &used_route, &used_conn, &work_dir, &pool)
            {
                Ok(route) => {
                    if self.deltmp.load(Ordering::SeqCst) {
                        // Keep per-uuid dirs of other requests; only this
                        // request's dir goes.
                        let _ = fs::remove_dir_all(&work_dir);
                    }
                    return Ok((route, errors));
                }
                Err(CandidateFailure::Fatal(e)) => return Err(e),
                Err(CandidateFailure::TryNext(msg)) => {
                    error!("{msg}");
                    errors.push(msg);
                }
            }
        }
        Err(EngineError::NoRoute(errors))
    }

    /// Weld the bidi back route onto a candidate and run the solvec
    /// decomposition. Failure of either moves on to the next candidate.
    fn finish_candidate(
        &self,
        args: &QueryArgs,
        mut route: Route,
        used_route: &Route,
        used_conn: &Route,
        work_dir: &Path,
        pool: &rayon::ThreadPool,
    ) -> Result<Route, CandidateFailure> {
        let topo = &*self.topo;
        let mut cand_used_route = used_route.clone();
        let mut cand_used_conn = used_conn.clone();
        cand_used_route.merge_pf(&route.entries, topo);
        cand_used_conn.merge_solvec(&route.entries, topo);

        let ch_label = route
            .entries
            .first()
            .map(|e| topo.channel(e.src.ch).full_no.clone())
            .unwrap_or_else(|| "?".to_string());

        if args.bidi {
            let back = self
                .back_route(&route, &cand_used_route, args.src)
                .map_err(|msg| CandidateFailure::TryNext(format!("{ch_label} is no bi answer : {msg}")))?;
            cand_used_route.merge_pf(&back, topo);
            cand_used_conn.merge_solvec(&back, topo);
            route.extend(&back);
        }

        self.solvec_query(
            args,
            &mut route,
            &cand_used_route,
            &cand_used_conn,
            work_dir,
            pool,
        )
        .map_err(|e| match e {
            EngineError::NoRoute(_) => {
                CandidateFailure::TryNext(format!("{ch_label} is no solvec answer"))
            }
            other => CandidateFailure::Fatal(other),
        })?;
        Ok(route)
    }

    /// Solve one segment on every trial channel under the pool. Channels
    /// whose table the segment endpoints do not support keep their result
    /// slot (`None`) so ERO merging stays index-aligned.
    #[allow(clippy::too_many_arguments)]
    fn pf_query_path(
        &self,
        args: &QueryArgs,
        seg_src: PortId,
        seg_dst: PortId,
        next_ero: &[PortId],
        used_route: &Route,
        used_conn: &Route,
        work_dir: &Path,
        pool: &rayon::ThreadPool,
    ) -> Result<Vec<Option<PfAnswer>>, EngineError> {
        let topo = &*self.topo;
        let used_x = used_route.x_tuples(topo);
        let used_c = used_conn.all_tuples(topo);
        let next_ero_names: Vec<String> = next_ero
            .iter()
            .map(|&p| topo.port(p).full_name.clone())
            .collect();

        pool.install(|| {
            args.channels
                .par_iter()
                .map(|&ch| {
                    self.pf_solve_channel(
                        args,
                        ch,
                        seg_src,
                        seg_dst,
                        &next_ero_names,
                        &used_x,
                        &used_c,
                        work_dir,
                    )
                })
                .collect::<Result<Vec<Option<PfAnswer>>, EngineError>>()
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn pf_solve_channel(
        &self,
        args: &QueryArgs,
        ch: ChannelId,
        seg_src: PortId,
        seg_dst: PortId,
        next_ero: &[String],
        used_x: &[TupleRef],
        used_c: &[TupleRef],
        work_dir: &Path,
    ) -> Result<Option<PfAnswer>, EngineError> {
        let topo = &*self.topo;
        let channel = topo.channel(ch);
        if !topo.port(seg_src).supports(&channel.table_id)
            || !topo.port(seg_dst).supports(&channel.table_id)
        {
            info!("{} does not support src/dst port SKIP glpsol", channel.full_no);
            return Ok(None);
        }

        // Keys may contain dots (the default is the topology file name), so
        // suffixes are appended, never swapped in as extensions.
        let skeleton_dir = self.skeleton_dir();
        let name = format!("pf_{}_{}", args.data_key, channel.full_no);
        let skeleton_file = skeleton_dir.join(format!("{name}.data"));
        let vt_file = skeleton_dir.join(format!("{name}.vt.json"));
        let vt = VarTable::load(&vt_file).ok_or_else(|| {
            EngineError::Internal(anyhow!(
                "missing variable table '{}'; run onra-make-pf first",
                vt_file.display()
            ))
        })?;

        let work_name = format!(
            "pf_{}_{}_{}-{}",
            args.data_key,
            channel.full_no,
            topo.port(seg_src).full_name,
            topo.port(seg_dst).full_name
        );
        let data_file = work_dir.join(format!("{work_name}.data"));
        let sol_file = work_dir.join(format!("{work_name}.sol"));

        let skeleton = fs::read_to_string(&skeleton_file)
            .with_context(|| format!("reading skeleton '{}'", skeleton_file.display()))
            .map_err(EngineError::Internal)?;

        let target_comps = topo.support_comps(&channel.table_id);
        let target_names: HashSet<String> = pf_target_ports(topo, &target_comps, &channel.table_id)
            .into_iter()
            .map(|p| topo.port(p).full_name.clone())
            .collect();

        let spec = InstanceSpec {
            src: topo.port(seg_src).full_name.clone(),
            dst: topo.port(seg_dst).full_name.clone(),
            next_ero: next_ero.to_vec(),
            used_x: used_x.to_vec(),
            used_c: used_c.to_vec(),
        };
        let overlay = instance::make_instance_pf(topo, &spec, &[ch], &vt, &target_names);
        fs::write(&data_file, format!("{skeleton}{overlay}"))
            .with_context(|| format!("writing instance data '{}'", data_file.display()))
            .map_err(EngineError::Internal)?;

        let model_file = self
            .skeleton_dir()
            .join(format!("pf_{}.model", args.model_key));
        let driver = GlpsolDriver::with_binary(&self.cfg.solver_binary, self.cfg.tmlim_pf);
        info!(
            "pathfind\n{}\n{}",
            model_file.display(),
            data_file.display()
        );
        match driver.solve(
            &model_file,
            &data_file,
            &sol_file,
            self.dumpglpsol.load(Ordering::SeqCst),
        )? {
            SolveOutcome::Infeasible => Ok(None),
            SolveOutcome::Optimal(sol) => {
                let Some(cost) = sol.cost else {
                    return Ok(None);
                };
                let route = result::pf_route(topo, &sol).map_err(EngineError::Internal)?;
                Ok(Some(PfAnswer { ch, cost, route }))
            }
        }
    }

    /// Build the ERO segments, solve them in order sharing the accumulated
    /// in-use routes, and merge per-channel results across segments.
    fn query_with_ero(
        &self,
        args: &QueryArgs,
        used_route: &mut Route,
        used_conn: &mut Route,
        work_dir: &Path,
        pool: &rayon::ThreadPool,
    ) -> Result<Vec<Route>, EngineError> {
        let topo = &*self.topo;
        let mut segments: Vec<(PortId, PortId, Vec<PortId>)> = Vec::new();
        let mut hops = args.ero.clone();
        hops.push(args.dst);
        let mut seg_src = args.src;
        for (i, &seg_dst) in hops.iter().enumerate() {
            // The ports later segments will visit, dst included, must not
            // carry this segment's flow.
            let next: Vec<PortId> = if i + 1 < hops.len() {
                hops[i + 1..].to_vec()
            } else {
                Vec::new()
            };
            segments.push((seg_src, seg_dst, next));
            seg_src = seg_dst;
        }
        info!(
            "# ERO split into {} segments: {}",
            segments.len(),
            segments
                .iter()
                .map(|(s, d, _)| format!(
                    "{}-{}",
                    topo.port(*s).full_name,
                    topo.port(*d).full_name
                ))
                .collect::<Vec<String>>()
                .join(", ")
        );

        let mut sub_results: Vec<Vec<Option<PfAnswer>>> = Vec::new();
        for (seg_src, seg_dst, next_ero) in &segments {
            let results = self.pf_query_path(
                args, *seg_src, *seg_dst, next_ero, used_route, used_conn, work_dir, pool,
            )?;
            if results.iter().all(|r| r.is_none()) {
                return Err(EngineError::NoRoute(vec![format!(
                    "cannot find ERO sub route : {}-{}",
                    topo.port(*seg_src).full_name,
                    topo.port(*seg_dst).full_name
                )]));
            }
            // Every found sub route becomes in-use for the next segment so
            // segments never collide.
            let mut new_route = Route::new();
            for answer in results.iter().flatten() {
                new_route.extend(&answer.route.entries);
            }
            used_route.merge_pf(&new_route.entries, topo);
            used_conn.merge_solvec(&new_route.entries, topo);
            sub_results.push(results);
        }

        let merged = merge_sub_results(&sub_results);
        if merged.is_empty() {
            return Err(EngineError::NoRoute(vec![
                "cannot find all suitable path for each ERO sub path".to_string(),
            ]));
        }
        Ok(merged)
    }

    /// Derive the back route of a computed forward route: the twins of the
    /// traversed port pairs, stitched together with BFS sub-paths, checked
    /// against already-reserved tuples.
    fn back_route(
        &self,
        route: &Route,
        used_route: &Route,
        src: PortId,
    ) -> Result<Vec<RouteEntry>, String> {
        let topo = &*self.topo;
        let path = route
            .make_path_list(topo, src, true)
            .map_err(|e| e.to_string())?;
        if path.len() < 2 {
            return Err("invalid route".to_string());
        }
        let answer_src = path[0];
        let answer_dst = *path.last().unwrap();
        let ch = answer_dst.ch;

        // Twin pairs collected from the end of the forward path backwards.
        let mut back_list: Vec<RouteEntry> = Vec::new();
        for i in (1..path.len()).rev() {
            let go_src = path[i - 1];
            let go_dst = path[i];
            let Some(twin) = topo.find_portpair_twin(go_src.port, go_dst.port) else {
                continue;
            };
            back_list.push(RouteEntry {
                src: PortChannel {
                    port: PortId(twin.src),
                    ch,
                },
                dst: PortChannel {
                    port: PortId(twin.dst),
                    ch,
                },
                x: true,
                c: true,
                go: false,
            });
        }

        let back_src = topo
            .opposite_port(answer_dst.port)
            .ok_or_else(|| "cannot find back path".to_string())?;
        let back_dst = topo
            .opposite_port(answer_src.port)
            .ok_or_else(|| "cannot find back path".to_string())?;

        let mut full_back: Vec<RouteEntry> = Vec::new();
        let mut cursor = back_src;
        for entry in back_list {
            if cursor != entry.src.port {
                self.add_sub_path(&mut full_back, cursor, entry.src.port, ch)?;
            }
            cursor = entry.dst.port;
            full_back.push(entry);
        }
        if cursor != back_dst {
            self.add_sub_path(&mut full_back, cursor, back_dst, ch)?;
        }

        // The back route may not touch tuples some other reservation holds.
        let used_keys: HashSet<String> = used_route
            .entries
            .iter()
            .map(|e| format!("{}#{}", e.src.key(topo), e.dst.key(topo)))
            .collect();
        for entry in &full_back {
            let key = format!("{}#{}", entry.src.key(topo), entry.dst.key(topo));
            if entry.x && used_keys.contains(&key) {
                return Err(format!("back path is already used : {}", entry.dump(topo)));
            }
        }
        Ok(full_back)
    }

    /// BFS a gap of the back route and append its hops.
    fn add_sub_path(
        &self,
        out: &mut Vec<RouteEntry>,
        src: PortId,
        dst: PortId,
        ch: ChannelId,
    ) -> Result<(), String> {
        let topo = &*self.topo;
        let ports = simple_path::search(topo, src, dst).ok_or_else(|| {
            format!(
                "cannot find sub path : {}-{}",
                topo.port(src).full_name,
                topo.port(dst).full_name
            )
        })?;
        for pair in ports.windows(2) {
            if !topo.has_connection(pair[0], ch, pair[1], ch) {
                return Err(format!(
                    "has not connection : {}@{} - {}@{}",
                    topo.port(pair[0]).full_name,
                    topo.channel(ch).full_no,
                    topo.port(pair[1]).full_name,
                    topo.channel(ch).full_no
                ));
            }
            out.push(RouteEntry {
                src: PortChannel { port: pair[0], ch },
                dst: PortChannel { port: pair[1], ch },
                x: true,
                c: true,
                go: false,
            });
        }
        Ok(())
    }

    /// Components the route passes through that carry an intermediate
    /// controller.
    fn used_comps(&self, used_route: &Route, used_conn: &Route) -> Vec<CompId> {
        let topo = &*self.topo;
        let mut comps: HashSet<CompId> = HashSet::new();
        for entry in used_conn.entries.iter().chain(used_route.entries.iter()) {
            for port in [entry.src.port, entry.dst.port] {
                let comp = topo.comp_of_port(port);
                if topo.comp(comp).has_controller() {
                    comps.insert(comp);
                }
            }
        }
        let mut comps: Vec<CompId> = comps.into_iter().collect();
        comps.sort_by(|&a, &b| natural_cmp(&topo.comp(a).name, &topo.comp(b).name));
        comps
    }

    /// Run the per-device decomposition for every solvec-eligible chunk,
    /// with bounded parallelism. Any infeasible chunk fails the whole
    /// candidate; partial device routes are discarded.
    fn solvec_query(
        &self,
        args: &QueryArgs,
        route: &mut Route,
        used_route: &Route,
        used_conn: &Route,
        work_dir: &Path,
        pool: &rayon::ThreadPool,
    ) -> Result<(), EngineError> {
        let topo = &*self.topo;
        let targets: Vec<onra_compile::SolvecTarget> =
            solvec_targets(&self.models, self.cfg.num_comps)
                .into_iter()
                .flatten()
                .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let used_comps = self.used_comps(used_route, used_conn);
        let all_channels: Vec<ChannelId> = topo.all_channels().collect();
        let used_x = used_route.x_tuples(topo);

        let results: Vec<Option<Route>> = pool.install(|| {
            targets
                .par_iter()
                .map(|(model_name, chunk, file_idx)| {
                    self.solvec_solve_chunk(
                        args,
                        model_name,
                        chunk,
                        *file_idx,
                        &used_comps,
                        &used_x,
                        &all_channels,
                        work_dir,
                    )
                })
                .collect::<Result<Vec<Option<Route>>, EngineError>>()
        })?;

        if results.iter().any(|r| r.is_none()) {
            return Err(EngineError::NoRoute(vec![
                "cannot find suitable c".to_string(),
            ]));
        }
        for dev_route in results.into_iter().flatten() {
            route.merge_solvec(&dev_route.entries, topo);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn solvec_solve_chunk(
        &self,
        args: &QueryArgs,
        model_name: &str,
        chunk: &[CompId],
        file_idx: usize,
        used_comps: &[CompId],
        used_x: &[TupleRef],
        all_channels: &[ChannelId],
        work_dir: &Path,
    ) -> Result<Option<Route>, EngineError> {
        let topo = &*self.topo;
        let model = self
            .models
            .get(model_name)
            .ok_or_else(|| EngineError::Internal(anyhow!("unknown model {model_name}")))?;
        let model_id = onra_core::text::escape(model_name);

        let skeleton_dir = self.skeleton_dir();
        let name = format!("solvec_{}_{model_id}_{file_idx}", args.data_key);
        let skeleton_file = skeleton_dir.join(format!("{name}.data"));
        let vt_file = skeleton_dir.join(format!("{name}.vt.json"));
        let vt = VarTable::load(&vt_file).ok_or_else(|| {
            EngineError::Internal(anyhow!(
                "missing variable table '{}'; run onra-make-pf --solvec first",
                vt_file.display()
            ))
        })?;

        let work_name = format!(
            "solvec_{}_{model_id}_{file_idx}_{}-{}",
            args.data_key,
            topo.port(args.src).full_name,
            topo.port(args.dst).full_name
        );
        let data_file = work_dir.join(format!("{work_name}.data"));
        let sol_file = work_dir.join(format!("{work_name}.sol"));

        let skeleton = fs::read_to_string(&skeleton_file)
            .with_context(|| format!("reading skeleton '{}'", skeleton_file.display()))
            .map_err(EngineError::Internal)?;
        let spec = InstanceSpec {
            src: topo.port(args.src).full_name.clone(),
            dst: topo.port(args.dst).full_name.clone(),
            next_ero: Vec::new(),
            used_x: used_x.to_vec(),
            used_c: Vec::new(),
        };
        let overlay = instance::make_instance_solvec(
            topo,
            &spec,
            all_channels,
            &vt,
            model,
            chunk,
            used_comps,
        );
        fs::write(&data_file, format!("{skeleton}{overlay}"))
            .with_context(|| format!("writing instance data '{}'", data_file.display()))
            .map_err(EngineError::Internal)?;

        let model_file = self
            .skeleton_dir()
            .join(format!("solvec_{}_{model_id}.model", args.model_key));
        let driver = GlpsolDriver::with_binary(&self.cfg.solver_binary, self.cfg.tmlim_solvec);
        info!("solveC\n{}\n{}", model_file.display(), data_file.display());
        match driver.solve(
            &model_file,
            &data_file,
            &sol_file,
            self.dumpglpsol.load(Ordering::SeqCst),
        )? {
            SolveOutcome::Infeasible => Ok(None),
            SolveOutcome::Optimal(sol) => {
                let route = result::solvec_route(topo, &sol).map_err(EngineError::Internal)?;
                Ok(Some(route))
            }
        }
    }
}

/// Why one candidate route was abandoned.
enum CandidateFailure {
    /// Try the next channel's candidate.
    TryNext(String),
    /// Abort the request.
    Fatal(EngineError),
}

/// Merge per-segment, per-channel results: a channel index survives only
/// when every segment found an answer there; survivors are ordered by the
/// summed cost and concatenated into full candidate routes.
fn merge_sub_results(sub_results: &[Vec<Option<PfAnswer>>]) -> Vec<Route> {
    let Some(first) = sub_results.first() else {
        return Vec::new();
    };
    let n_ch = first.len();
    let mut survivors: Vec<(usize, f64)> = Vec::new();
    for i in 0..n_ch {
        let mut total = 0.0;
        if sub_results.iter().all(|seg| {
            seg.get(i).and_then(|r| r.as_ref()).map(|a| {
                total += a.cost;
            }).is_some()
        }) {
            survivors.push((i, total));
        }
    }
    survivors.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    survivors
        .into_iter()
        .map(|(i, _)| {
            let mut route = Route::new();
            for seg in sub_results {
                if let Some(answer) = &seg[i] {
                    route.extend(&answer.route.entries);
                }
            }
            route
        })
        .collect()
}
