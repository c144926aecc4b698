//! Shared test fixtures: small topologies used by unit and integration
//! tests across the workspace.

use crate::doc::*;
use crate::topology::Topology;
use std::collections::HashMap;

/// Three-component line `A--B--C` on a two-channel WDM table. `A` and `C`
/// are terminals, `B` passes channels straight through. Each hop has a
/// forward and a reverse port pair so bidi routes can be derived.
pub fn line_doc() -> TopologyDoc {
    let port = |number, name: &str, io: Option<&str>| PortDoc {
        number,
        name: name.to_string(),
        io: io.map(str::to_string),
        support_channel: "WDM32".to_string(),
    };
    let node = |comp: &str, pin| NetNodeDoc {
        comp_ref: comp.to_string(),
        pin,
    };
    let net = |code: &str, pair: &str, a: NetNodeDoc, b: NetNodeDoc| NetDoc {
        code: Some(code.to_string()),
        pair: Some(pair.to_string()),
        nodes: vec![a, b],
        cost: 0.1,
    };
    TopologyDoc {
        channel_tables: vec![ChannelTableDoc {
            id: "WDM32".into(),
            table_type: "optical".into(),
            channel_nos: vec![1, 2],
        }],
        comps: vec![
            CompDoc {
                name: "A".into(),
                ports: vec![port(1, "/A_IN1", Some("input")), port(2, "/A_OUT1", None)],
                ..Default::default()
            },
            CompDoc {
                name: "B".into(),
                ports: vec![
                    port(1, "/B_IN1", None),
                    port(2, "/B_OUT1", None),
                    port(3, "/B_IN2", None),
                    port(4, "/B_OUT2", None),
                ],
                ..Default::default()
            },
            CompDoc {
                name: "C".into(),
                ports: vec![port(1, "/C_IN1", None), port(2, "/C_OUT1", None)],
                ..Default::default()
            },
        ],
        nets: vec![
            net("1", "/A_B_01-0", node("A", 2), node("B", 1)),
            net("2", "/A_B_01-1", node("B", 2), node("A", 1)),
            net("3", "/B_C_01-0", node("B", 4), node("C", 1)),
            net("4", "/B_C_01-1", node("C", 2), node("B", 3)),
        ],
    }
}

/// Fully-built line topology (no available-connection files).
pub fn line_topology() -> Topology {
    Topology::build(&line_doc(), &HashMap::new(), true).expect("line topology builds")
}
