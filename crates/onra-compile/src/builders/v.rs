//! The `set V :=` section: all target ports.

use crate::buffer::DataBuf;
use onra_core::topology::{PortId, Topology};

pub fn build_v(buf: &mut DataBuf, topo: &Topology, ports: &[PortId]) {
    buf.set_def("V");
    let names: Vec<String> = ports.iter().map(|&p| topo.port(p).full_name.clone()).collect();
    buf.list(&names, false);
    buf.close();
}
