//! The in-use projection sections: `param inuse_X default 0 :=` and
//! `param inuse_C default 0 :=`, derived from the live reservations (and,
//! during ERO solving, the segments already routed).

use crate::buffer::{DataBuf, PortVarIdx};
use crate::instance::TupleRef;
use crate::vartable::VarTable;
use onra_core::topology::Topology;
use std::collections::HashSet;
use tracing::warn;

/// Emit one in-use section. `channels` is the trial channel list of the
/// data file being assembled; tuples on other channels have no variable in
/// this file's `vt` and are skipped.
pub fn build_inuse(
    buf: &mut DataBuf,
    _topo: &Topology,
    name: &str,
    used: &[TupleRef],
    channels: &[String],
    target_ports: &HashSet<String>,
    vt: &VarTable,
) {
    buf.param_def(name, "0");
    for in_ch in channels {
        for out_ch in channels {
            let mut table = PortVarIdx::new();
            for entry in used {
                if entry.src_ch != *in_ch || entry.dst_ch != *out_ch {
                    continue;
                }
                if !target_ports.contains(&entry.src_port)
                    || !target_ports.contains(&entry.dst_port)
                {
                    continue;
                }
                if !vt.has_connection(&entry.src_port, in_ch, &entry.dst_port, out_ch) {
                    warn!(
                        "There is no connection to the reserved route. The topology \
                         may have been changed. : {}@{} - {}@{}",
                        entry.src_port, in_ch, entry.dst_port, out_ch
                    );
                    continue;
                }
                table.add_unique(&entry.src_port, &entry.dst_port, 1);
            }
            buf.vt_block_ijkl(in_ch, out_ch, &table);
        }
    }
    buf.close();
}
