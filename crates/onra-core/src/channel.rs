//! Channel tables and channels.

use crate::text::escape;

/// Wildcard support-channel marker: a port declaring `ANY` supports every
/// channel table in the topology.
pub const ANY_CHANNEL: &str = "ANY";

/// Channel tables whose escaped id starts with this prefix carry WDM
/// channels, the group `--wdmsa` cycles through.
pub const WDM_ID: &str = "WDM";

/// One channel of a channel table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Numeric channel number within its table (the `no` attribute).
    pub no: u32,
    /// Escaped id of the owning table.
    pub table_id: String,
    /// Unique name `"{table_id}_{no}"`.
    pub full_no: String,
}

impl Channel {
    pub fn new(table_id: &str, no: u32) -> Self {
        Channel {
            no,
            table_id: table_id.to_string(),
            full_no: format!("{table_id}_{no}"),
        }
    }
}

/// One `channelTable` element of the topology document. Only tables of type
/// `optical` survive parsing; the loader warns about and drops the rest.
#[derive(Debug, Clone)]
pub struct ChannelTable {
    /// Escaped table id (non-word characters become `_`).
    pub id: String,
    /// Channels in document order, totally ordered by `no`.
    pub channels: Vec<Channel>,
}

impl ChannelTable {
    pub fn new(raw_id: &str, nos: &[u32]) -> Self {
        let id = escape(raw_id);
        let channels = nos.iter().map(|&no| Channel::new(&id, no)).collect();
        ChannelTable { id, channels }
    }

    /// Whether this table holds WDM channels.
    pub fn is_wdm(&self) -> bool {
        self.id.starts_with(WDM_ID)
    }
}
