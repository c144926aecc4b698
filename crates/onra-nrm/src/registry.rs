//! The reservation registry: live reservations, short-id assignment, the
//! in-use projection sources, and the bridge to the durable store.

use crate::route::{PortChannel, Route, RouteEntry};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use onra_compile::TupleRef;
use onra_core::topology::Topology;
use onra_io::store::{StoredEntry, StoredReservation};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use uuid::Uuid;

/// One committed reservation. Never mutated after commit.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub global_id: String,
    pub src: PortChannel,
    pub dst: PortChannel,
    /// ERO port names of the request, in order.
    pub ero: Vec<String>,
    /// Channel names the request tried.
    pub channels: Vec<String>,
    pub route: Route,
    pub bidi: bool,
    pub wdmsa: bool,
    pub creation_time: DateTime<Utc>,
    /// Whether this reservation has reached the durable store.
    pub written_db: bool,
}

impl Reservation {
    pub fn dump(&self, topo: &Topology, buf: &mut Vec<String>) {
        buf.push(format!("{:<33}{}", "globalId", self.global_id));
        buf.push("src".to_string());
        self.dump_port_channel(topo, &self.src, buf);
        buf.push("dst".to_string());
        self.dump_port_channel(topo, &self.dst, buf);
    }

    fn dump_port_channel(&self, topo: &Topology, pc: &PortChannel, buf: &mut Vec<String>) {
        buf.push(format!("{:<33}{}", " name", topo.port(pc.port).display_name));
        buf.push(format!("{:<33}{}", " name", topo.port(pc.port).full_name));
        buf.push(format!("{:<33}{}", " chNo", topo.channel(pc.ch).full_no));
    }

    fn to_stored(&self, topo: &Topology) -> StoredReservation {
        StoredReservation {
            global_id: self.global_id.clone(),
            src_port: topo.port(self.src.port).full_name.clone(),
            src_ch: topo.channel(self.src.ch).full_no.clone(),
            dst_port: topo.port(self.dst.port).full_name.clone(),
            dst_ch: topo.channel(self.dst.ch).full_no.clone(),
            ero: self.ero.clone(),
            channels: self.channels.clone(),
            bidi: self.bidi,
            wdmsa: self.wdmsa,
            creation_time: self.creation_time,
            route: self
                .route
                .entries
                .iter()
                .map(|e| StoredEntry {
                    src_port: topo.port(e.src.port).full_name.clone(),
                    src_ch: topo.channel(e.src.ch).full_no.clone(),
                    dst_port: topo.port(e.dst.port).full_name.clone(),
                    dst_ch: topo.channel(e.dst.ch).full_no.clone(),
                    x: e.x,
                    c: e.c,
                    go: e.go,
                })
                .collect(),
        }
    }

    /// Rebuild from a stored record, resolving every port and channel
    /// against the current topology. A name that no longer resolves, or an
    /// `x` tuple the topology no longer supports, is a consistency error.
    pub(crate) fn from_stored(topo: &Topology, stored: &StoredReservation) -> Result<Reservation> {
        let resolve = |port: &str, ch: &str| -> Result<PortChannel> {
            Ok(PortChannel {
                port: topo
                    .port_by_name(port)
                    .ok_or_else(|| anyhow!("stored reservation references unknown port {port}"))?,
                ch: topo.channel_by_full_no(ch).ok_or_else(|| {
                    anyhow!("stored reservation references unknown channel {ch}")
                })?,
            })
        };
        let mut entries = Vec::with_capacity(stored.route.len());
        for e in &stored.route {
            let src = resolve(&e.src_port, &e.src_ch)?;
            let dst = resolve(&e.dst_port, &e.dst_ch)?;
            if e.x && !topo.has_connection(src.port, src.ch, dst.port, dst.ch) {
                return Err(anyhow!(
                    "stored reservation {} uses a connection the topology no longer allows: \
                     {}@{} -> {}@{}",
                    stored.global_id,
                    e.src_port,
                    e.src_ch,
                    e.dst_port,
                    e.dst_ch
                ));
            }
            entries.push(RouteEntry {
                src,
                dst,
                x: e.x,
                c: e.c,
                go: e.go,
            });
        }
        Ok(Reservation {
            global_id: stored.global_id.clone(),
            src: resolve(&stored.src_port, &stored.src_ch)?,
            dst: resolve(&stored.dst_port, &stored.dst_ch)?,
            ero: stored.ero.clone(),
            channels: stored.channels.clone(),
            route: Route::from_entries(entries),
            bidi: stored.bidi,
            wdmsa: stored.wdmsa,
            creation_time: stored.creation_time,
            written_db: true,
        })
    }
}

/// The live registry. Callers guard it with a readers-writer lock; this
/// type itself is single-owner state.
#[derive(Debug, Default)]
pub struct Registry {
    map: HashMap<String, Reservation>,
    id2global: BTreeMap<u32, String>,
    global2id: HashMap<String, u32>,
    next_id: u32,
}

impl Registry {
    pub fn new() -> Registry {
        Registry {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Issue a fresh global id.
    pub fn new_global_id() -> String {
        format!("urn:uuid:{}", Uuid::new_v4())
    }

    /// Commit a reservation and return its short id. Short ids are assigned
    /// in commit order, starting from 1.
    pub fn add(&mut self, rsv: Reservation) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.id2global.insert(id, rsv.global_id.clone());
        self.global2id.insert(rsv.global_id.clone(), id);
        self.map.insert(rsv.global_id.clone(), rsv);
        id
    }

    /// Resolve a `-g` argument: a short id or a global id.
    pub fn resolve_global_id(&self, id: &str) -> Option<String> {
        if let Ok(short) = id.parse::<u32>() {
            if let Some(global) = self.id2global.get(&short) {
                return Some(global.clone());
            }
        }
        self.map.contains_key(id).then(|| id.to_string())
    }

    pub fn short_id_of(&self, global_id: &str) -> Option<u32> {
        self.global2id.get(global_id).copied()
    }

    pub fn get(&self, global_id: &str) -> Option<&Reservation> {
        self.map.get(global_id)
    }

    /// Reservations in short-id order.
    pub fn all(&self) -> Vec<&Reservation> {
        self.id2global
            .values()
            .filter_map(|gid| self.map.get(gid))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Remove one reservation. `false` when the id is unknown.
    pub fn delete(&mut self, global_id: &str) -> bool {
        if self.map.remove(global_id).is_none() {
            return false;
        }
        if let Some(short) = self.global2id.remove(global_id) {
            self.id2global.remove(&short);
        }
        true
    }

    /// Remove everything and restart short ids from 1.
    pub fn delete_all(&mut self) {
        self.map.clear();
        self.id2global.clear();
        self.global2id.clear();
        self.next_id = 1;
    }

    /// The `x` tuples of every live reservation (the `inuse_X` source).
    pub fn used_x_route(&self) -> Route {
        Route::from_entries(
            self.all()
                .iter()
                .flat_map(|r| r.route.entries.iter().copied())
                .filter(|e| e.x)
                .collect(),
        )
    }

    /// Every tuple of every live reservation (the `inuse_C` source).
    pub fn used_conn_route(&self) -> Route {
        Route::from_entries(
            self.all()
                .iter()
                .flat_map(|r| r.route.entries.iter().copied())
                .collect(),
        )
    }

    pub fn used_x_tuples(&self, topo: &Topology) -> Vec<TupleRef> {
        self.used_x_route().x_tuples(topo)
    }

    /// Write every live reservation to the store, replacing it atomically.
    /// Returns how many entries were newly persisted.
    pub fn write_store(&mut self, topo: &Topology, path: &Path) -> Result<usize> {
        let records: Vec<StoredReservation> =
            self.all().iter().map(|r| r.to_stored(topo)).collect();
        onra_io::store::save_store(path, &records)?;
        let mut written = 0;
        for rsv in self.map.values_mut() {
            if !rsv.written_db {
                rsv.written_db = true;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Load the store into a fresh registry. Short ids are reassigned in
    /// stored order.
    pub fn load_store(topo: &Topology, path: &Path) -> Result<Registry> {
        let mut registry = Registry::new();
        for stored in onra_io::store::load_store(path)? {
            let rsv = Reservation::from_stored(topo, &stored)?;
            registry.add(rsv);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onra_core::test_utils::line_topology;
    use tempfile::TempDir;

    fn pc(topo: &Topology, port: &str, ch: &str) -> PortChannel {
        PortChannel {
            port: topo.port_by_name(port).unwrap(),
            ch: topo.channel_by_full_no(ch).unwrap(),
        }
    }

    fn sample(topo: &Topology, ch: &str) -> Reservation {
        let entries = vec![
            RouteEntry {
                src: pc(topo, "A_2", ch),
                dst: pc(topo, "B_1", ch),
                x: true,
                c: true,
                go: true,
            },
            RouteEntry {
                src: pc(topo, "B_1", ch),
                dst: pc(topo, "B_4", ch),
                x: true,
                c: true,
                go: true,
            },
        ];
        Reservation {
            global_id: Registry::new_global_id(),
            src: pc(topo, "A_2", ch),
            dst: pc(topo, "B_4", ch),
            ero: Vec::new(),
            channels: vec![ch.to_string()],
            route: Route::from_entries(entries),
            bidi: false,
            wdmsa: false,
            creation_time: Utc::now(),
            written_db: false,
        }
    }

    #[test]
    fn short_ids_are_monotonic() {
        let topo = line_topology();
        let mut reg = Registry::new();
        assert_eq!(reg.add(sample(&topo, "WDM32_1")), 1);
        assert_eq!(reg.add(sample(&topo, "WDM32_2")), 2);
        let gid = reg.all()[0].global_id.clone();
        assert!(reg.delete(&gid));
        // Ids keep increasing even after deletion.
        assert_eq!(reg.add(sample(&topo, "WDM32_1")), 3);
    }

    #[test]
    fn resolve_accepts_short_and_global_ids() {
        let topo = line_topology();
        let mut reg = Registry::new();
        let rsv = sample(&topo, "WDM32_1");
        let gid = rsv.global_id.clone();
        reg.add(rsv);
        assert_eq!(reg.resolve_global_id("1"), Some(gid.clone()));
        assert_eq!(reg.resolve_global_id(&gid), Some(gid.clone()));
        assert_eq!(reg.resolve_global_id("99"), None);
        assert_eq!(reg.resolve_global_id("urn:uuid:nope"), None);
    }

    #[test]
    fn projection_roundtrip_through_terminate() {
        let topo = line_topology();
        let mut reg = Registry::new();
        let before = reg.used_x_tuples(&topo);
        let rsv = sample(&topo, "WDM32_1");
        let gid = rsv.global_id.clone();
        reg.add(rsv);
        assert_eq!(reg.used_x_tuples(&topo).len(), 2);
        reg.delete(&gid);
        assert_eq!(reg.used_x_tuples(&topo), before);
    }

    #[test]
    fn store_roundtrip_preserves_global_ids() {
        let topo = line_topology();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reserved.json");
        let mut reg = Registry::new();
        reg.add(sample(&topo, "WDM32_1"));
        reg.add(sample(&topo, "WDM32_2"));
        let written = reg.write_store(&topo, &path).unwrap();
        assert_eq!(written, 2);
        // A second write persists nothing new.
        assert_eq!(reg.write_store(&topo, &path).unwrap(), 0);

        let loaded = Registry::load_store(&topo, &path).unwrap();
        assert_eq!(loaded.len(), 2);
        let before: Vec<String> = reg.all().iter().map(|r| r.global_id.clone()).collect();
        let after: Vec<String> = loaded.all().iter().map(|r| r.global_id.clone()).collect();
        assert_eq!(before, after);
        // Short ids were reassigned from 1.
        assert_eq!(loaded.short_id_of(&after[0]), Some(1));
        assert!(loaded.all().iter().all(|r| r.written_db));
    }

    #[test]
    fn terminate_all_clears_and_restarts_ids() {
        let topo = line_topology();
        let mut reg = Registry::new();
        reg.add(sample(&topo, "WDM32_1"));
        reg.delete_all();
        assert!(reg.is_empty());
        assert_eq!(reg.add(sample(&topo, "WDM32_1")), 1);
    }

    #[test]
    fn stale_store_entries_are_refused() {
        let topo = line_topology();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reserved.json");
        let mut reg = Registry::new();
        reg.add(sample(&topo, "WDM32_1"));
        reg.write_store(&topo, &path).unwrap();

        // Corrupt the stored port name to simulate a topology change.
        let text = std::fs::read_to_string(&path)
            .unwrap()
            .replace("A_2", "Z_9");
        std::fs::write(&path, text).unwrap();
        assert!(Registry::load_store(&topo, &path).is_err());
    }
}
