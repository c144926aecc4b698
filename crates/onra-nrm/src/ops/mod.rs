//! The request operations: one module per subcommand plus the shared
//! option parser.

pub mod deltmp;
pub mod dumpglpsol;
pub mod options;
pub mod pathfind;
pub mod query;
pub mod reserve;
pub mod terminate;
pub mod write_db;

use crate::engine::QueryArgs;
use crate::handler::Handler;
use anyhow::{anyhow, Result};
use onra_core::topology::PortId;
use self::options::{Arity, OptSpec, ParsedOpts};

/// The flag table shared by `pathfind` and `reserve`.
pub(crate) fn path_opt_spec() -> OptSpec {
    OptSpec::new(&[
        ("bi", Arity::None),
        ("s", Arity::One),
        ("d", Arity::One),
        ("ero", Arity::Any),
        ("ch", Arity::Any),
        ("wdmsa", Arity::None),
        ("p", Arity::One),
        ("model", Arity::One),
        ("data", Arity::One),
    ])
}

pub(crate) const PATH_USAGE: &str = "[-bi] -d <dst> [-ero <ero1 ero2 ero3..>] -s <src>
            [-ch <ch1 chX..chY chZ  ...>] [-wdmsa] [-p <num_threads>]
            [-model <model_file_key>] [-data <data_file_key>]
    -bi                            solve bidirectional route
    -d <dst>                       destination
    -ero <ero1 ero2 ero3 ...>      ERO Port names
    -s <src>                       source
    -ch <ch1 chX..chY chZ  ...>    use channel names (chX..chY means {chX,chX+1, ..., chY})
    -wdmsa                         use one WDM channel in round robin order
    -p <num_threads>               number of concurrent solver runs
    -model <model_file_key>        key of GLPK model file name
    -data <data_file_key>          key of skeleton data file name";

fn lookup_port(handler: &Handler, name: &str) -> Result<PortId> {
    handler
        .engine
        .topo
        .port_by_name(name)
        .ok_or_else(|| anyhow!("invalid port name : {name}"))
}

/// Canonicalize a `pathfind`/`reserve` request. The second value reports
/// whether the `--wdmsa` round-robin drove the channel choice.
pub(crate) fn build_query_args(
    handler: &Handler,
    opts: &ParsedOpts,
) -> Result<(QueryArgs, bool)> {
    let topo = &handler.engine.topo;
    let src = lookup_port(handler, opts.required("s")?)?;
    let dst = lookup_port(handler, opts.required("d")?)?;

    let mut ero = Vec::new();
    if let Some(names) = opts.many("ero") {
        for name in names {
            ero.push(
                topo.port_by_name(name)
                    .ok_or_else(|| anyhow!("invalid port name in ERO : {name}"))?,
            );
        }
    }

    let bidi = opts.flag("bi");
    if bidi {
        // Both endpoints need a determinable reverse port.
        for &p in &[src, dst] {
            if topo.opposite_port(p).is_none() {
                let port = topo.port(p);
                return Err(anyhow!(
                    "-bi option not supported for {}({},{})",
                    port.full_name,
                    port.support_channel,
                    port.io.as_str()
                ));
            }
        }
    }

    let wdmsa_requested = opts.flag("wdmsa");
    let channels = handler
        .engine
        .make_channels(opts.many("ch"), wdmsa_requested)?;
    let wdmsa_used = wdmsa_requested && opts.many("ch").is_none();

    let threads = opts.usize("p")?.unwrap_or_else(num_cpus::get);
    let default_key = handler.engine.default_file_key().to_string();
    Ok((
        QueryArgs {
            src,
            dst,
            bidi,
            ero,
            channels,
            threads,
            model_key: opts.one("model").map(str::to_string).unwrap_or_else(|| default_key.clone()),
            data_key: opts.one("data").map(str::to_string).unwrap_or(default_key),
        },
        wdmsa_used,
    ))
}
