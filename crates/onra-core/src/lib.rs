//! # onra-core: Optical Topology Modeling Core
//!
//! Provides the data structures shared by every ONRA tool: the immutable
//! optical topology (channel tables, components, ports, port pairs), the
//! per-device available-connection sets, and the parsed form of the GLPK
//! constraint fragments that components carry in the topology document.
//!
//! ## Design
//!
//! The topology is a web of mutually-referencing entities (component ↔ port ↔
//! port-pair). Those references are stored as arena indices ([`CompId`],
//! [`PortId`], [`ChannelId`]) into vectors owned by [`Topology`], never as
//! pointers, so the whole model is a plain owned value that can be shared
//! read-only across threads.
//!
//! ## Modules
//!
//! - [`channel`] - channel tables and channels
//! - [`component`] - components, cost specs, controller eligibility
//! - [`port`] - ports, direction inference, port pairs
//! - [`conn`] - per-device available internal connections
//! - [`topology`] - the assembled immutable model and its queries
//! - [`glpk`] - the constraint-fragment grammar (`set` / `s.t.` parsing)
//! - [`selector`] - `i`/`j`/`k`/`l` selectors used by cost specs
//! - [`text`] - natural ordering, escaping, GLPK text formatting

pub mod channel;
pub mod component;
pub mod conn;
pub mod doc;
pub mod error;
pub mod glpk;
pub mod port;
pub mod selector;
pub mod test_utils;
pub mod text;
pub mod topology;

pub use channel::{Channel, ChannelTable, ANY_CHANNEL, WDM_ID};
pub use component::{Component, CostEntry, CostSpec};
pub use conn::{AvailableConnections, ConnEntry};
pub use error::{OnraError, OnraResult};
pub use port::{Port, PortIo, PortPair};
pub use topology::{ChannelId, CompId, PortId, Topology};
