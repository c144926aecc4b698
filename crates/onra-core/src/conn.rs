//! Per-device available internal connections, loaded from `ac/*.conn.txt`.

use std::collections::{BTreeSet, HashMap, HashSet};

/// One enumerated `(in-pin, in-channel, out-pin, out-channel)` tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnEntry {
    pub in_pin: u32,
    pub in_ch: String,
    pub out_pin: u32,
    pub out_ch: String,
}

impl ConnEntry {
    pub fn new(in_pin: u32, in_ch: &str, out_pin: u32, out_ch: &str) -> ConnEntry {
        ConnEntry {
            in_pin,
            in_ch: in_ch.to_string(),
            out_pin,
            out_ch: out_ch.to_string(),
        }
    }

    pub fn key(&self) -> String {
        Self::make_key(self.in_pin, &self.in_ch, self.out_pin, &self.out_ch)
    }

    pub fn make_key(in_pin: u32, in_ch: &str, out_pin: u32, out_ch: &str) -> String {
        format!("{in_pin}@{in_ch}-{out_pin}@{out_ch}")
    }
}

/// The full enumeration output for one component model.
#[derive(Debug, Clone, Default)]
pub struct AvailableConnections {
    keys: HashSet<String>,
    in2outs: HashMap<u32, BTreeSet<u32>>,
}

impl AvailableConnections {
    pub fn from_entries(entries: &[ConnEntry]) -> AvailableConnections {
        let mut ac = AvailableConnections::default();
        for entry in entries {
            ac.insert(entry);
        }
        ac
    }

    pub fn insert(&mut self, entry: &ConnEntry) {
        self.keys.insert(entry.key());
        self.in2outs
            .entry(entry.in_pin)
            .or_default()
            .insert(entry.out_pin);
    }

    /// Whether any channel can be switched between the two pins.
    pub fn has_pin_connection(&self, in_pin: u32, out_pin: u32) -> bool {
        self.in2outs
            .get(&in_pin)
            .map(|outs| outs.contains(&out_pin))
            .unwrap_or(false)
    }

    /// Whether the exact channel tuple was enumerated as feasible.
    pub fn has_connection(&self, in_pin: u32, in_ch: &str, out_pin: u32, out_ch: &str) -> bool {
        self.keys
            .contains(&ConnEntry::make_key(in_pin, in_ch, out_pin, out_ch))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_and_channel_lookups() {
        let ac = AvailableConnections::from_entries(&[
            ConnEntry::new(1, "WDM32_1", 2, "WDM32_1"),
            ConnEntry::new(1, "WDM32_2", 2, "WDM32_2"),
            ConnEntry::new(3, "WDM32_1", 4, "WDM32_1"),
        ]);
        assert!(ac.has_pin_connection(1, 2));
        assert!(ac.has_pin_connection(3, 4));
        assert!(!ac.has_pin_connection(1, 4));

        assert!(ac.has_connection(1, "WDM32_2", 2, "WDM32_2"));
        assert!(!ac.has_connection(1, "WDM32_3", 2, "WDM32_3"));
        assert!(!ac.has_connection(1, "WDM32_1", 2, "WDM32_2"));
        assert_eq!(ac.len(), 3);
    }
}
