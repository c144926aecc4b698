//! Raw topology document model: what the XML loader hands to
//! [`crate::topology::Topology::build`] before any cross-referencing.

/// A `channelTable` element as read from the document.
#[derive(Debug, Clone)]
pub struct ChannelTableDoc {
    pub id: String,
    /// The `type` attribute; only `optical` tables are kept.
    pub table_type: String,
    pub channel_nos: Vec<u32>,
}

/// A `port` element as read from the document.
#[derive(Debug, Clone)]
pub struct PortDoc {
    pub number: u32,
    pub name: String,
    pub io: Option<String>,
    pub support_channel: String,
}

/// A `comp` element as read from the document.
#[derive(Debug, Clone, Default)]
pub struct CompDoc {
    pub name: String,
    pub model: Option<String>,
    pub glpk: Option<String>,
    pub controller: Option<String>,
    pub socket: Option<i64>,
    pub table_id: Option<String>,
    pub cost_text: Option<String>,
    pub ports: Vec<PortDoc>,
}

/// One endpoint of a `net` element.
#[derive(Debug, Clone)]
pub struct NetNodeDoc {
    pub comp_ref: String,
    pub pin: u32,
}

/// A `net` element as read from the document.
#[derive(Debug, Clone)]
pub struct NetDoc {
    pub code: Option<String>,
    pub pair: Option<String>,
    pub nodes: Vec<NetNodeDoc>,
    pub cost: f64,
}

/// The whole document.
#[derive(Debug, Clone, Default)]
pub struct TopologyDoc {
    pub channel_tables: Vec<ChannelTableDoc>,
    pub comps: Vec<CompDoc>,
    pub nets: Vec<NetDoc>,
}
