//! Pathfinder compiler entry point: reads the topology and the ac files,
//! and generates the global pathfinding model, per-channel skeleton data,
//! and (with `--solvec`) the per-device decomposition files.

use clap::Parser;
use onra_cli::{init_tracing, load_params_or_exit, run_phase, EXIT_LOAD, EXIT_USAGE};
use onra_compile::pathfinder::make_pathfinder;
use std::path::PathBuf;
use std::process::exit;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "onra-make-pf", about = "Compile the global pathfinding problem")]
struct Cli {
    /// Topology file name (under topo/)
    #[arg(short = 't', value_name = "topo_xml")]
    topo_xml: Option<String>,

    /// GLPK working directory
    #[arg(short = 'g', value_name = "glpk_dir")]
    glpk_dir: Option<String>,

    /// Also emit the per-device solvec models and skeletons
    #[arg(long)]
    solvec: bool,

    /// Key used in generated model file names (defaults to the topology
    /// file name)
    #[arg(long, value_name = "model_file_key")]
    model_key: Option<String>,

    /// Key used in generated data file names (defaults to the topology
    /// file name)
    #[arg(long, value_name = "data_file_key")]
    data_key: Option<String>,

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

    let model_key = cli.model_key.unwrap_or_else(|| params.topo_xml.clone());
    let data_key = cli.data_key.unwrap_or_else(|| params.topo_xml.clone());
    // Template file names are used exactly as configured.
    let pf_base = params.glpk_dir().join(&params.pf_tmp_model);
    let solvec_base = params.glpk_dir().join(&params.solvec_tmp_model);

    run_phase(
        EXIT_LOAD,
        make_pathfinder(
            &topo,
            &params.glpk_dir(),
            &pf_base,
            &solvec_base,
            &model_key,
            &data_key,
            cli.solvec,
            params.num_comps,
        ),
    );
}
