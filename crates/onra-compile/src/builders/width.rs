//! The channel-eligibility sections: `param widthOK default 1 :=` and
//! `set ChannelRange[CH] :=`.
//!
//! A pathfinding data file covers a single channel, so its width is fixed
//! at 1 and the channel conflicts only with itself. Requests that name a
//! contiguous `chX..chY` range still try each member channel in its own
//! solver run, which keeps these sections static per skeleton.

use crate::buffer::DataBuf;
use onra_core::topology::{ChannelId, Topology};

pub fn build_width(buf: &mut DataBuf, topo: &Topology, ch: ChannelId) {
    buf.param_def("widthOK", "1");
    buf.close();
    let full_no = &topo.channel(ch).full_no;
    buf.set_def_idx("ChannelRange", full_no);
    buf.push(&format!(" {full_no}"));
    buf.close();
}
