//! # onra-nrm: the network resource manager
//!
//! The long-running reservation engine: accepts line-oriented requests over
//! TCP (`pathfind`, `reserve`, `query`, `terminate`, `TERMINATEALL`,
//! `writeDB`, `deltmp`, `dumpglpsol`), projects the live registry into the
//! ILP instance data, drives the solver (with per-device parallel
//! decomposition for solvec-eligible components), and keeps the registry
//! consistent with the durable store.

pub mod engine;
pub mod handler;
pub mod ops;
pub mod registry;
pub mod result;
pub mod route;
pub mod server;
pub mod simple_path;

pub use engine::{Engine, EngineConfig, EngineError, QueryArgs};
pub use handler::Handler;
pub use registry::{Registry, Reservation};
pub use route::{PortChannel, Route, RouteEntry};
