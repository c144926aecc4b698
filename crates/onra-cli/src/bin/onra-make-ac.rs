//! Available-connections builder entry point: reads the topology and
//! generates `ac/channels.data` plus `ac/<model>.{model,conn.txt}`.

use clap::Parser;
use onra_cli::{init_tracing, load_params_or_exit, run_phase, EXIT_LOAD, EXIT_USAGE};
use onra_compile::ac::make_available_connections;
use onra_nrm::engine::MAX_SEC_PATH_FIND;
use onra_solver::GlpsolDriver;
use std::path::PathBuf;
use std::process::exit;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "onra-make-ac", about = "Enumerate per-device available connections")]
struct Cli {
    /// Topology file name (under topo/)
    #[arg(short = 't', value_name = "topo_xml")]
    topo_xml: Option<String>,

    /// GLPK working directory
    #[arg(short = 'g', value_name = "glpk_dir")]
    glpk_dir: Option<String>,

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

    // The enumeration needs no conn files; it produces them.
    let topo = run_phase(
        EXIT_LOAD,
        onra_io::topo_xml::load_topology(&params.topo_file(), None),
    );
    let driver = GlpsolDriver::new(MAX_SEC_PATH_FIND);
    run_phase(
        EXIT_LOAD,
        make_available_connections(&topo, &params.glpk_dir(), &driver),
    );
}
