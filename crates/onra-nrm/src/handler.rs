//! Request dispatch: one text line in, one text reply out.

use crate::engine::{Engine, EngineError};
use crate::ops;
use crate::ops::options::ParseError;
use crate::registry::Registry;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Instant;
use tracing::{error, info};

/// The server-side state shared by every connection.
pub struct Handler {
    pub engine: Engine,
    pub registry: RwLock<Registry>,
    pub store_path: PathBuf,
    /// Whether the server was started with `--db`.
    pub db: bool,
}

const SUBCOMMANDS: &[(&str, &str)] = &[
    ("pathfind", ops::pathfind::USAGE),
    ("reserve", ops::reserve::USAGE),
    ("writeDB", ops::write_db::USAGE),
    ("terminate", ops::terminate::USAGE),
    ("TERMINATEALL", ops::terminate::USAGE_ALL),
    ("query", ops::query::USAGE),
    ("deltmp", ops::deltmp::USAGE),
    ("dumpglpsol", ops::dumpglpsol::USAGE),
];

impl Handler {
    pub fn new(engine: Engine, registry: Registry, store_path: PathBuf, db: bool) -> Handler {
        Handler {
            engine,
            registry: RwLock::new(registry),
            store_path,
            db,
        }
    }

    fn usage_all() -> String {
        SUBCOMMANDS
            .iter()
            .map(|(name, usage)| format!("usage: {name} {usage}"))
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn usage_of(cmd: &str) -> String {
        SUBCOMMANDS
            .iter()
            .find(|(name, _)| *name == cmd)
            .map(|(name, usage)| format!("usage: {name} {usage}"))
            .unwrap_or_else(Self::usage_all)
    }

    /// Handle one request line and return the reply text.
    pub fn handle(&self, line: &str) -> String {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = tokens.split_first() else {
            return Self::usage_all();
        };
        let started = Instant::now();
        let result = match cmd {
            "pathfind" => ops::pathfind::run(self, args),
            "reserve" => ops::reserve::run(self, args),
            "query" => ops::query::run(self, args),
            "terminate" => ops::terminate::run(self, args),
            "TERMINATEALL" => ops::terminate::run_all(self, args),
            "writeDB" => ops::write_db::run(self, args),
            "deltmp" => ops::deltmp::run(self, args),
            "dumpglpsol" => ops::dumpglpsol::run(self, args),
            _ => return Self::usage_all(),
        };
        let elapsed = started.elapsed().as_millis();
        match result {
            Ok(reply) => {
                info!("{cmd} : {elapsed}[msec]");
                reply
            }
            Err(e) => {
                error!("{cmd} : {elapsed}[msec] : {e}");
                // Option-grammar failures answer with the subcommand's
                // usage; infeasibility is a regular reply; only execution
                // failures carry the ERROR prefix.
                if e.downcast_ref::<ParseError>().is_some() {
                    Self::usage_of(cmd)
                } else {
                    match e.downcast_ref::<EngineError>() {
                        Some(EngineError::NoRoute(_)) => e.to_string(),
                        _ => format!("ERROR: {e}"),
                    }
                }
            }
        }
    }
}
