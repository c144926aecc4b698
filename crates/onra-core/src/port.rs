//! Ports and inter-component port pairs.

use crate::channel::ANY_CHANNEL;
use crate::error::{OnraError, OnraResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortIo {
    Input,
    Output,
    Bidi,
}

impl PortIo {
    /// Parse the `io` attribute value of a `port` element.
    pub fn from_attr(txt: &str) -> OnraResult<PortIo> {
        match txt {
            "input" => Ok(PortIo::Input),
            "output" => Ok(PortIo::Output),
            "BiDi" => Ok(PortIo::Bidi),
            other => Err(OnraError::Topology(format!("invalid port io: {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PortIo::Input => "input",
            PortIo::Output => "output",
            PortIo::Bidi => "BiDi",
        }
    }
}

/// Trailing uppercase run of the display name, e.g.
/// `/TEST_AWG32JD100_N1216_OUT17` yields `OUT`.
static NAME_KIND: Lazy<Regex> = Lazy::new(|| Regex::new(r".+[^A-Z]([A-Z]+)[^A-Z]*$").unwrap());

static IN_TO_OUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.+[^A-Z])IN([^A-Z]*)$").unwrap());
static OUT_TO_IN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.+[^A-Z])OUT([^A-Z]*)$").unwrap());

/// One `port` element of a component.
#[derive(Debug, Clone)]
pub struct Port {
    /// The `number` attribute, unique within the component.
    pub number: u32,
    /// The display `name` attribute from the topology document.
    pub display_name: String,
    /// Direction; inferred from the display name when `io` is absent.
    pub io: PortIo,
    /// Supported channel-table id (`ANY` matches every table).
    pub support_channel: String,
    /// Unique name `"{component}_{number}"`.
    pub full_name: String,
    /// Uppercase kind extracted from the display name (`IN`, `OUT`, ...).
    pub kind: String,
}

impl Port {
    pub fn new(
        comp_name: &str,
        number: u32,
        display_name: &str,
        io_attr: Option<&str>,
        support_channel: &str,
    ) -> OnraResult<Port> {
        // Without a trailing uppercase run the whole name is searched for
        // the IN marker.
        let kind = NAME_KIND
            .captures(display_name)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| display_name.to_string());
        let io = match io_attr {
            Some(attr) => PortIo::from_attr(attr)?,
            // No io attribute: a trailing IN marks an input, anything else
            // is an output.
            None => {
                if kind.contains("IN") {
                    PortIo::Input
                } else {
                    PortIo::Output
                }
            }
        };
        Ok(Port {
            number,
            display_name: display_name.to_string(),
            io,
            support_channel: support_channel.to_string(),
            full_name: format!("{comp_name}_{number}"),
            kind,
        })
    }

    /// INPUT or BiDi.
    pub fn is_in(&self) -> bool {
        self.io != PortIo::Output
    }

    /// OUTPUT or BiDi.
    pub fn is_out(&self) -> bool {
        self.io != PortIo::Input
    }

    pub fn is_bidi(&self) -> bool {
        self.io == PortIo::Bidi
    }

    /// Whether this port's supported channel table matches `other`. `ANY` on
    /// either side matches.
    pub fn supports(&self, other: &str) -> bool {
        other == ANY_CHANNEL
            || self.support_channel == ANY_CHANNEL
            || self.support_channel == other
    }

    /// Whether `tgt`'s display name is this port's name with `IN` and `OUT`
    /// swapped.
    pub fn is_opposite_name(&self, tgt: &Port) -> bool {
        let flipped = if self.kind == "IN" {
            IN_TO_OUT.replace(&self.display_name, "${1}OUT${2}")
        } else {
            OUT_TO_IN.replace(&self.display_name, "${1}IN${2}")
        };
        flipped.as_ref() == tgt.display_name.as_str()
    }
}

/// An inter-component edge built from a `net` element.
///
/// The two `net` elements that share a pairkey describe the two directions
/// of one physical link; `src` is always the output-side endpoint.
#[derive(Debug, Clone)]
pub struct PortPair {
    /// Key shared by the twin pair; the trailing `-0`/`-1` of the `pair`
    /// attribute is stripped.
    pub pairkey: Option<String>,
    /// Index of the source port in the topology arena.
    pub src: usize,
    /// Index of the destination port in the topology arena.
    pub dst: usize,
    /// Link cost fed into the pathfinding objective.
    pub cost: f64,
}

static PAIRKEY_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.+)-[01]$").unwrap());

impl PortPair {
    pub fn new(key: Option<&str>, src: usize, dst: usize, cost: f64) -> PortPair {
        let pairkey = key.map(|k| PAIRKEY_SUFFIX.replace(k, "$1").into_owned());
        PortPair {
            pairkey,
            src,
            dst,
            cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, io: Option<&str>) -> Port {
        Port::new("N1", 1, name, io, "WDM32").unwrap()
    }

    #[test]
    fn io_attribute_wins() {
        assert_eq!(port("/X_OUT1", Some("input")).io, PortIo::Input);
        assert_eq!(port("/X_IN1", Some("BiDi")).io, PortIo::Bidi);
    }

    #[test]
    fn direction_inferred_from_name() {
        assert_eq!(port("/TEST_N1216_IN17", None).io, PortIo::Input);
        assert_eq!(port("/TEST_N1216_OUT17", None).io, PortIo::Output);
        assert_eq!(port("/TEST_N1216_OUT17", None).kind, "OUT");
    }

    #[test]
    fn bidi_is_both_directions() {
        let p = port("/X_P1", Some("BiDi"));
        assert!(p.is_in());
        assert!(p.is_out());
        assert!(p.is_bidi());
    }

    #[test]
    fn opposite_name_flips_in_out() {
        let a = port("/TEST_NetgearM4300_P207_SFP21_IN", None);
        let b = port("/TEST_NetgearM4300_P207_SFP21_OUT", None);
        assert!(a.is_opposite_name(&b));
        assert!(b.is_opposite_name(&a));
        let c = port("/TEST_NetgearM4300_P208_SFP21_OUT", None);
        assert!(!a.is_opposite_name(&c));
    }

    #[test]
    fn any_support_channel_matches() {
        let p = Port::new("N1", 1, "/X_IN1", None, ANY_CHANNEL).unwrap();
        assert!(p.supports("WDM32"));
        let q = Port::new("N1", 2, "/X_IN2", None, "WDM32").unwrap();
        assert!(q.supports(ANY_CHANNEL));
        assert!(!q.supports("Gray1_3"));
    }

    #[test]
    fn pairkey_suffix_is_stripped() {
        let pair = PortPair::new(Some("/DN4_DN5_03-1"), 0, 1, 0.1);
        assert_eq!(pair.pairkey.as_deref(), Some("/DN4_DN5_03"));
        let pair = PortPair::new(Some("/Dnode1/WXC_TPA_1-0"), 0, 1, 0.1);
        assert_eq!(pair.pairkey.as_deref(), Some("/Dnode1/WXC_TPA_1"));
    }
}
