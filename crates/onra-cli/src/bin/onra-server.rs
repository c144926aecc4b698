//! NRM server entry point.

use anyhow::Context;
use clap::Parser;
use onra_cli::{
    init_tracing, load_params_or_exit, run_phase, EXIT_CONSISTENCY, EXIT_LOAD, EXIT_USAGE,
};
use onra_compile::models::load_all_modelfiles;
use onra_nrm::engine::{Engine, EngineConfig, MAX_SEC_PATH_FIND, MAX_SEC_SOLVEC};
use onra_nrm::registry::Registry;
use onra_nrm::server::run_server;
use onra_nrm::Handler;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "onra-server", about = "Network resource manager server")]
struct Cli {
    /// Topology file name (under topo/)
    #[arg(short = 't', value_name = "topo_xml")]
    topo_xml: Option<String>,

    /// GLPK working directory
    #[arg(short = 'g', value_name = "glpk_dir")]
    glpk_dir: Option<String>,

    /// Load the durable reservation store at startup
    #[arg(long)]
    db: bool,

    /// Top directory (config/, topo/ and relative paths resolve here)
    #[arg(long, default_value = ".")]
    top_dir: PathBuf,

    /// Logging level
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            exit(EXIT_USAGE);
        }
    };
    let mut params = load_params_or_exit(&cli.top_dir);
    if let Some(topo_xml) = cli.topo_xml {
        params.topo_xml = topo_xml;
    }
    if let Some(glpk_dir) = cli.glpk_dir {
        params.glpk_dir = glpk_dir;
    }
    init_tracing(cli.log_level, params.logger == "enable");

    let ac_dir = params.ac_dir();
    let topo = run_phase(
        EXIT_LOAD,
        onra_io::topo_xml::load_topology(&params.topo_file(), Some(ac_dir.as_path())),
    );
    let topo = Arc::new(topo);
    let models = run_phase(
        EXIT_LOAD,
        load_all_modelfiles(&topo, &ac_dir).context("loading ac model files"),
    );

    let store_path = params.store_file();
    let registry = if cli.db {
        let registry = run_phase(EXIT_CONSISTENCY, Registry::load_store(&topo, &store_path));
        for rsv in registry.all() {
            info!(
                "id={}, globalId={}",
                registry.short_id_of(&rsv.global_id).unwrap_or(0),
                rsv.global_id
            );
        }
        registry
    } else {
        Registry::new()
    };

    let engine = Engine::new(
        topo,
        models,
        EngineConfig {
            glpk_dir: params.glpk_dir(),
            topo_xml_key: params.topo_xml.clone(),
            num_comps: params.num_comps,
            tmlim_pf: MAX_SEC_PATH_FIND,
            tmlim_solvec: MAX_SEC_SOLVEC,
            solver_binary: PathBuf::from(onra_solver::driver::GLPK_SOLVER),
        },
    );
    let handler = Arc::new(Handler::new(engine, registry, store_path, cli.db));

    run_phase(
        EXIT_LOAD,
        run_server(handler, &params.nrm_host, params.nrm_port),
    );
}
