//! # onra-compile: the topology-to-ILP compiler
//!
//! Turns the parsed topology into the files glpsol consumes:
//!
//! - [`ac`] enumerates each component model's feasible internal connections
//!   and writes `ac/<model>.{model,conn.txt}` plus `ac/channels.data`.
//! - [`pathfinder`] combines the topology, port pairs and connection sets
//!   into the global pathfinding model (`glpk/pf_<key>.model`), one skeleton
//!   data file per channel, and the per-device solvec models and skeletons.
//! - [`instance`] overlays a request (src/dst, in-use projection, ERO
//!   exclusions) onto a skeleton at solve time.
//!
//! All emission is deterministic: components in declaration order, channels
//! by number, ports in declaration order, names in natural order.

pub mod ac;
pub mod buffer;
pub mod builders;
pub mod instance;
pub mod models;
pub mod pathfinder;
pub mod skeleton;
pub mod vartable;

pub use buffer::{DataBuf, PortVarIdx};
pub use builders::Mode;
pub use instance::{InstanceSpec, TupleRef};
pub use models::{load_all_modelfiles, solvec_targets, SolvecTarget};
pub use skeleton::{make_skeleton, SkeletonOutput};
pub use vartable::{VarTable, MIN_VT_IDX, NO_VT_IDX};
