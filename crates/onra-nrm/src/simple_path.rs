//! Breadth-first search over the per-port flow maps, used to stitch the
//! gaps of a bidirectional back route.

use onra_core::topology::{PortId, Topology};
use std::collections::{HashMap, VecDeque};

/// Shortest hop path from `src` to `dst` along `flow_outs`, or `None` when
/// the ports are not connected. Ports inside one component short-circuit.
pub fn search(topo: &Topology, src: PortId, dst: PortId) -> Option<Vec<PortId>> {
    if topo.comp_of_port(src) == topo.comp_of_port(dst) {
        return Some(vec![src, dst]);
    }

    let mut pred: HashMap<PortId, PortId> = HashMap::new();
    let mut queue: VecDeque<PortId> = VecDeque::new();
    queue.push_back(src);
    while let Some(u) = queue.pop_front() {
        for v in topo.flow_outs(u) {
            if v == src || pred.contains_key(&v) {
                continue;
            }
            pred.insert(v, u);
            if v == dst {
                queue.clear();
                break;
            }
            queue.push_back(v);
        }
    }

    let mut path = vec![dst];
    let mut cursor = dst;
    while let Some(&p) = pred.get(&cursor) {
        path.push(p);
        cursor = p;
    }
    path.reverse();
    if path.len() > 1 && path[0] == src {
        Some(path)
    } else {
        None
    }
}
