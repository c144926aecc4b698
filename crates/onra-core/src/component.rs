//! Components and their cost specs.

use crate::error::{OnraError, OnraResult};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};

/// One `{i,j,k,l,cost}` entry of a component's `Cost` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEntry {
    pub i: Selector,
    pub j: Selector,
    pub k: Selector,
    pub l: Selector,
    #[serde(default)]
    pub cost: f64,
}

/// The JSON value of a component's `Cost` field: per-tuple switching costs
/// and out-of-service markings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostSpec {
    #[serde(rename = "Cost", default)]
    pub cost: Vec<CostEntry>,
    #[serde(rename = "OutOfService", default)]
    pub out_of_service: Vec<CostEntry>,
}

impl CostSpec {
    /// Parse the `Cost` field text. The topology writer HTML-escapes quotes,
    /// so `&quot;` is undone first.
    pub fn parse(txt: &str) -> OnraResult<CostSpec> {
        let txt = txt.replace("&quot;", "\"");
        serde_json::from_str(&txt)
            .map_err(|e| OnraError::Parse(format!("invalid Cost field: {e}")))
    }
}

/// Socket value meaning "no controller socket".
pub const NO_SOCKET_PORT: i64 = -1;

/// One `comp` element of the topology document. Ports live in the topology
/// arena; the component stores their arena indices.
#[derive(Debug, Clone)]
pub struct Component {
    /// The `ref` attribute.
    pub name: String,
    /// The `Model` field; components sharing a model share constraints.
    pub model: Option<String>,
    /// The raw GLPK constraint fragment (the `GLPK` field).
    pub glpk: Option<String>,
    /// Intermediate-controller address (the `Controller` field).
    pub controller: Option<String>,
    /// Controller socket (the `Socket` field).
    pub socket: Option<i64>,
    /// The `GLPKchannelTableId` attribute: channel table(s) the constraint
    /// fragment's `Channels` tokens refer to, comma separated.
    pub table_id: Option<String>,
    /// Parsed `Cost` field.
    pub cost: Option<CostSpec>,
    /// Channel-table ids supported by this component's ports.
    pub supchs: Vec<String>,
    /// Arena indices of this component's ports, ordered by port number.
    pub ports: Vec<usize>,
    /// Index into the topology's available-connection pool, keyed by model.
    pub ac: Option<usize>,
}

impl Component {
    /// Whether the component holds the address of an intermediate controller
    /// and therefore participates in the per-device solvec decomposition.
    pub fn has_controller(&self) -> bool {
        let has_addr = self
            .controller
            .as_deref()
            .map(|c| !c.is_empty() && c != "TBD")
            .unwrap_or(false);
        has_addr && self.socket.map(|s| s > NO_SOCKET_PORT).unwrap_or(false)
    }

    /// Whether the `ref` name marks an application terminal
    /// (pseudo-component); those have no internal switching.
    pub fn is_pseudo(&self) -> bool {
        self.name.starts_with('P')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(controller: Option<&str>, socket: Option<i64>) -> Component {
        Component {
            name: "N1".into(),
            model: None,
            glpk: None,
            controller: controller.map(str::to_string),
            socket,
            table_id: None,
            cost: None,
            supchs: Vec::new(),
            ports: Vec::new(),
            ac: None,
        }
    }

    #[test]
    fn controller_requires_address_and_socket() {
        assert!(comp(Some("10.0.0.1"), Some(5)).has_controller());
        assert!(!comp(Some("TBD"), Some(5)).has_controller());
        assert!(!comp(Some(""), Some(5)).has_controller());
        assert!(!comp(Some("10.0.0.1"), Some(-1)).has_controller());
        assert!(!comp(Some("10.0.0.1"), None).has_controller());
        assert!(!comp(None, Some(5)).has_controller());
    }

    #[test]
    fn pseudo_components_start_with_p() {
        let mut c = comp(None, None);
        assert!(!c.is_pseudo());
        c.name = "P204".into();
        assert!(c.is_pseudo());
    }

    #[test]
    fn cost_spec_parses_escaped_json() {
        let spec = CostSpec::parse(
            "{&quot;Cost&quot;: [{&quot;i&quot;: 29, &quot;j&quot;: &quot;*&quot;, \
             &quot;k&quot;: 14, &quot;l&quot;: &quot;*&quot;, &quot;cost&quot;: 0.2}]}",
        )
        .unwrap();
        assert_eq!(spec.cost.len(), 1);
        assert!(spec.cost[0].i.matches(29));
        assert!(spec.cost[0].j.matches(3));
        assert_eq!(spec.cost[0].cost, 0.2);
        assert!(spec.out_of_service.is_empty());
    }

    #[test]
    fn cost_spec_with_out_of_service() {
        let spec = CostSpec::parse(
            r#"{"OutOfService": [{"i": "1-2", "j": "*", "k": 4, "l": "*"}]}"#,
        )
        .unwrap();
        assert!(spec.cost.is_empty());
        assert_eq!(spec.out_of_service.len(), 1);
        assert!(spec.out_of_service[0].i.matches(2));
    }

    #[test]
    fn bad_cost_spec_is_an_error() {
        assert!(CostSpec::parse("{not json").is_err());
    }
}
