//! Route representation: the `(x, c)` tuples a solve selected, with the
//! merge rules used while accumulating ERO segments, back routes and
//! solvec device activations.

use anyhow::{anyhow, Result};
use onra_compile::TupleRef;
use onra_core::topology::{ChannelId, PortId, Topology};
use std::collections::{HashMap, HashSet};

/// A port/channel pair along a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortChannel {
    pub port: PortId,
    pub ch: ChannelId,
}

impl PortChannel {
    pub fn key(&self, topo: &Topology) -> String {
        format!(
            "{}@{}",
            topo.port(self.port).full_name,
            topo.channel(self.ch).full_no
        )
    }
}

/// One selected tuple.
///
/// `x` marks tuples chosen by the global pathfinding solve, `c` marks
/// component activations (always true for pathfinding tuples, the only flag
/// set for solvec tuples), `go` separates the forward route from the bidi
/// back route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub src: PortChannel,
    pub dst: PortChannel,
    pub x: bool,
    pub c: bool,
    pub go: bool,
}

impl RouteEntry {
    pub fn dump(&self, topo: &Topology) -> String {
        format!(
            "{} - {}, x={}, c={}, go={}",
            self.src.key(topo),
            self.dst.key(topo),
            self.x,
            self.c,
            self.go
        )
    }

    fn xkey(&self, topo: &Topology) -> String {
        format!("{}@{}@{}", self.src.key(topo), self.dst.key(topo), self.x)
    }

    fn ckey(&self, topo: &Topology) -> String {
        format!("{}@{}@{}", self.src.key(topo), self.dst.key(topo), self.c)
    }

    pub fn tuple_ref(&self, topo: &Topology) -> TupleRef {
        TupleRef {
            src_port: topo.port(self.src.port).full_name.clone(),
            src_ch: topo.channel(self.src.ch).full_no.clone(),
            dst_port: topo.port(self.dst.port).full_name.clone(),
            dst_ch: topo.channel(self.dst.ch).full_no.clone(),
        }
    }
}

/// An ordered collection of route entries.
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub entries: Vec<RouteEntry>,
}

impl Route {
    pub fn new() -> Route {
        Route::default()
    }

    pub fn from_entries(entries: Vec<RouteEntry>) -> Route {
        Route { entries }
    }

    pub fn extend(&mut self, entries: &[RouteEntry]) {
        self.entries.extend_from_slice(entries);
    }

    /// Append the `x` entries of `new` that are not already present
    /// (compared by src, dst and the `x` flag).
    pub fn merge_pf(&mut self, new: &[RouteEntry], topo: &Topology) {
        let seen: HashSet<String> = self.entries.iter().map(|e| e.xkey(topo)).collect();
        for entry in new {
            if entry.x && !seen.contains(&entry.xkey(topo)) {
                self.entries.push(*entry);
            }
        }
    }

    /// Append the `c` entries of `new` that are not already present
    /// (compared by src, dst and the `c` flag).
    pub fn merge_solvec(&mut self, new: &[RouteEntry], topo: &Topology) {
        let seen: HashSet<String> = self.entries.iter().map(|e| e.ckey(topo)).collect();
        for entry in new {
            if entry.c && !seen.contains(&entry.ckey(topo)) {
                self.entries.push(*entry);
            }
        }
    }

    /// Walk the `x` entries with the requested direction from `src`,
    /// returning the ports/channels along the path.
    pub fn make_path_list(
        &self,
        topo: &Topology,
        src: PortId,
        go: bool,
    ) -> Result<Vec<PortChannel>> {
        let mut map: HashMap<String, RouteEntry> = self
            .entries
            .iter()
            .filter(|e| e.x && e.go == go)
            .map(|e| (topo.port(e.src.port).full_name.clone(), *e))
            .collect();
        if map.is_empty() {
            return Ok(Vec::new());
        }

        let mut list: Vec<PortChannel> = Vec::new();
        let mut cursor = topo.port(src).full_name.clone();
        let mut prev: Option<PortId> = None;
        while !map.is_empty() {
            let entry = map.remove(&cursor).ok_or_else(|| {
                anyhow!(
                    "missing route entry for port {cursor}; probably the solver output is incorrect"
                )
            })?;
            if prev != Some(entry.src.port) {
                list.push(entry.src);
            }
            list.push(entry.dst);
            prev = Some(entry.dst.port);
            cursor = topo.port(entry.dst.port).full_name.clone();
        }
        Ok(list)
    }

    fn show_route(topo: &Topology, list: &[PortChannel]) -> String {
        if list.is_empty() {
            return "<empty>".to_string();
        }
        let mut lines = Vec::with_capacity(list.len());
        for pc in list {
            let port = topo.port(pc.port);
            let comp = topo.comp(topo.comp_of_port(pc.port));
            lines.push(format!(
                "{:<8} ({:<14} {:<33} {:<6} {}",
                port.full_name,
                format!("{})", topo.channel(pc.ch).full_no),
                comp.model.as_deref().unwrap_or("null"),
                port.io.as_str().to_uppercase(),
                port.kind
            ));
        }
        lines.join("\n")
    }

    /// Operator-readable rendering: the forward path from `src`, and the
    /// back path when the route carries one.
    pub fn route_text(&self, topo: &Topology, src: PortId) -> Result<String> {
        let go_list = self.make_path_list(topo, src, true)?;
        let mut buf = vec!["go route".to_string(), Self::show_route(topo, &go_list)];
        let back_list = match go_list.last().and_then(|pc| topo.opposite_port(pc.port)) {
            Some(back_src) => self.make_path_list(topo, back_src, false)?,
            None => Vec::new(),
        };
        buf.push("back route".to_string());
        buf.push(Self::show_route(topo, &back_list));
        Ok(buf.join("\n"))
    }

    /// The `x` tuples as name references for instance assembly.
    pub fn x_tuples(&self, topo: &Topology) -> Vec<TupleRef> {
        self.entries
            .iter()
            .filter(|e| e.x)
            .map(|e| e.tuple_ref(topo))
            .collect()
    }

    /// Every tuple as a name reference (the `c` projection source).
    pub fn all_tuples(&self, topo: &Topology) -> Vec<TupleRef> {
        self.entries.iter().map(|e| e.tuple_ref(topo)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onra_core::test_utils::line_topology;

    fn pc(topo: &Topology, port: &str, ch: &str) -> PortChannel {
        PortChannel {
            port: topo.port_by_name(port).unwrap(),
            ch: topo.channel_by_full_no(ch).unwrap(),
        }
    }

    fn entry(topo: &Topology, src: &str, dst: &str, go: bool) -> RouteEntry {
        RouteEntry {
            src: pc(topo, src, "WDM32_1"),
            dst: pc(topo, dst, "WDM32_1"),
            x: true,
            c: true,
            go,
        }
    }

    fn line_route(topo: &Topology) -> Route {
        Route::from_entries(vec![
            entry(topo, "A_2", "B_1", true),
            entry(topo, "B_1", "B_4", true),
            entry(topo, "B_4", "C_1", true),
        ])
    }

    #[test]
    fn path_list_walks_in_order() {
        let topo = line_topology();
        let route = line_route(&topo);
        let src = topo.port_by_name("A_2").unwrap();
        let list = route.make_path_list(&topo, src, true).unwrap();
        let names: Vec<String> = list
            .iter()
            .map(|pc| topo.port(pc.port).full_name.clone())
            .collect();
        assert_eq!(names, vec!["A_2", "B_1", "B_4", "C_1"]);
    }

    #[test]
    fn path_list_detects_broken_chains() {
        let topo = line_topology();
        let route = Route::from_entries(vec![
            entry(&topo, "A_2", "B_1", true),
            entry(&topo, "B_4", "C_1", true),
        ]);
        let src = topo.port_by_name("A_2").unwrap();
        assert!(route.make_path_list(&topo, src, true).is_err());
    }

    #[test]
    fn merge_pf_deduplicates() {
        let topo = line_topology();
        let mut route = line_route(&topo);
        let before = route.entries.len();
        let dup = vec![entry(&topo, "A_2", "B_1", true)];
        route.merge_pf(&dup, &topo);
        assert_eq!(route.entries.len(), before);

        let fresh = vec![RouteEntry {
            x: true,
            ..entry(&topo, "C_2", "B_3", false)
        }];
        route.merge_pf(&fresh, &topo);
        assert_eq!(route.entries.len(), before + 1);
    }

    #[test]
    fn merge_solvec_keeps_only_c_entries() {
        let topo = line_topology();
        let mut route = Route::new();
        let mut e = entry(&topo, "B_1", "B_4", true);
        e.x = false;
        route.merge_solvec(&[e], &topo);
        assert_eq!(route.entries.len(), 1);
        let mut not_c = entry(&topo, "B_1", "B_2", true);
        not_c.c = false;
        route.merge_solvec(&[not_c], &topo);
        assert_eq!(route.entries.len(), 1);
    }

    #[test]
    fn route_text_renders_both_directions() {
        let topo = line_topology();
        let route = line_route(&topo);
        let src = topo.port_by_name("A_2").unwrap();
        let text = route.route_text(&topo, src).unwrap();
        assert!(text.contains("go route"));
        assert!(text.contains("A_2"));
        assert!(text.contains("(WDM32_1)"));
        assert!(text.contains("back route"));
        assert!(text.contains("<empty>"));
    }
}
