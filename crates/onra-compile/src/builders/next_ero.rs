//! The `set NextEroPorts :=` instance section: ports a segment must not use
//! as transit because a later ERO segment will visit them.

use crate::buffer::DataBuf;

pub fn build_next_ero(buf: &mut DataBuf, ports: &[String]) {
    buf.set_def("NextEroPorts");
    buf.list(&ports.to_vec(), true);
    buf.close();
}
