//! Topology XML loader.
//!
//! Reads the topology document into [`onra_core::doc::TopologyDoc`] with a
//! streaming event loop, then assembles the full [`Topology`] together with
//! the per-model available-connection files from the `ac` directory.
//! Unknown elements produce warnings; missing required attributes are fatal.

use anyhow::{anyhow, Context, Result};
use onra_core::conn::AvailableConnections;
use onra_core::doc::{ChannelTableDoc, CompDoc, NetDoc, NetNodeDoc, PortDoc, TopologyDoc};
use onra_core::text::escape;
use onra_core::topology::Topology;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::conn_file;

fn attribute_value(e: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required_attribute(e: &BytesStart, element: &str, name: &str) -> Result<String> {
    attribute_value(e, name)?
        .ok_or_else(|| anyhow!("missing required attribute '{name}' on <{element}>"))
}

/// Parse a topology document from XML text.
pub fn parse_topology_doc(xml: &str) -> Result<TopologyDoc> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = TopologyDoc::default();
    let mut table: Option<ChannelTableDoc> = None;
    let mut comp: Option<CompDoc> = None;
    let mut net: Option<NetDoc> = None;
    let mut field_name: Option<String> = None;
    let mut in_net_cost = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match tag.as_str() {
                    "channelTable" => {
                        table = Some(ChannelTableDoc {
                            id: required_attribute(e, &tag, "id")?,
                            table_type: attribute_value(e, "type")?.unwrap_or_default(),
                            channel_nos: Vec::new(),
                        });
                    }
                    "channel" => {
                        let no: u32 = required_attribute(e, &tag, "no")?
                            .parse()
                            .context("channel no must be numeric")?;
                        if let Some(t) = table.as_mut() {
                            t.channel_nos.push(no);
                        }
                    }
                    "comp" => {
                        comp = Some(CompDoc {
                            name: required_attribute(e, &tag, "ref")?,
                            ..Default::default()
                        });
                    }
                    "field" => {
                        if let Some(c) = comp.as_mut() {
                            field_name = attribute_value(e, "name")?;
                            if let Some(id) = attribute_value(e, "GLPKchannelTableId")? {
                                c.table_id = Some(id);
                            }
                        }
                    }
                    "port" => {
                        if let Some(c) = comp.as_mut() {
                            let number: u32 = required_attribute(e, &tag, "number")?
                                .parse()
                                .context("port number must be numeric")?;
                            c.ports.push(PortDoc {
                                number,
                                name: required_attribute(e, &tag, "name")?,
                                io: attribute_value(e, "io")?,
                                support_channel: attribute_value(e, "supportChannel")?
                                    .unwrap_or_else(|| "ANY".to_string()),
                            });
                        }
                    }
                    "net" => {
                        net = Some(NetDoc {
                            code: attribute_value(e, "code")?,
                            pair: attribute_value(e, "pair")?,
                            nodes: Vec::new(),
                            cost: 0.0,
                        });
                    }
                    "node" => {
                        if let Some(n) = net.as_mut() {
                            n.nodes.push(NetNodeDoc {
                                comp_ref: required_attribute(e, &tag, "ref")?,
                                pin: required_attribute(e, &tag, "pin")?
                                    .parse()
                                    .context("node pin must be numeric")?,
                            });
                        }
                    }
                    "cost" => {
                        in_net_cost = net.is_some();
                    }
                    "topology" | "design" | "channelInfo" | "components" | "ports" | "nets" => {}
                    other => {
                        warn!("unknown topology element <{other}> SKIP");
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape()?.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                if let (Some(c), Some(name)) = (comp.as_mut(), field_name.as_deref()) {
                    match name {
                        "Model" => c.model = Some(text),
                        "GLPK" => c.glpk = Some(text),
                        "Controller" => c.controller = Some(text),
                        "Socket" => {
                            c.socket =
                                Some(text.parse().context("Socket field must be numeric")?)
                        }
                        "Cost" => c.cost_text = Some(text),
                        other => {
                            warn!("unknown comp field '{other}' SKIP");
                        }
                    }
                } else if in_net_cost {
                    if let Some(n) = net.as_mut() {
                        n.cost = text.parse().context("net cost must be numeric")?;
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"channelTable" => {
                    if let Some(t) = table.take() {
                        doc.channel_tables.push(t);
                    }
                }
                b"comp" => {
                    if let Some(c) = comp.take() {
                        doc.comps.push(c);
                    }
                }
                b"field" => field_name = None,
                b"net" => {
                    if let Some(n) = net.take() {
                        doc.nets.push(n);
                    }
                }
                b"cost" => in_net_cost = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(anyhow!("XML error: {e}")),
        }
    }
    Ok(doc)
}

/// Load the topology document from a file.
pub fn load_topology_doc(path: &Path) -> Result<TopologyDoc> {
    info!("load topology: {}", path.display());
    let xml = fs::read_to_string(path)
        .with_context(|| format!("reading topology file '{}'", path.display()))?;
    parse_topology_doc(&xml)
}

/// Load the per-model available-connection sets referenced by the document.
/// Components sharing a model share one set; a missing conn file produces a
/// warning and that model stays unconstrained.
pub fn load_conn_files(doc: &TopologyDoc, ac_dir: &Path) -> Result<HashMap<String, AvailableConnections>> {
    let channel_names: HashSet<String> = doc
        .channel_tables
        .iter()
        .filter(|t| t.table_type == "optical")
        .flat_map(|t| {
            let id = escape(&t.id);
            t.channel_nos
                .iter()
                .map(move |no| format!("{id}_{no}"))
                .collect::<Vec<String>>()
        })
        .collect();

    let mut map = HashMap::new();
    let mut count = 0usize;
    for comp in &doc.comps {
        let Some(model) = comp.model.as_deref() else {
            continue;
        };
        if map.contains_key(model) {
            continue;
        }
        let path = ac_dir.join(conn_file::conn_filename(model));
        if !path.exists() {
            warn!("no conn file for model {model} at {}", path.display());
            continue;
        }
        let entries = conn_file::read_conn_file(&path)?;
        for entry in &entries {
            if entry.in_ch != entry.out_ch
                || !channel_names.contains(&entry.in_ch)
                || !channel_names.contains(&entry.out_ch)
            {
                return Err(anyhow!(
                    "invalid channel in '{}': ({},{},{},{})",
                    path.display(),
                    entry.in_pin,
                    entry.in_ch,
                    entry.out_pin,
                    entry.out_ch
                ));
            }
        }
        map.insert(model.to_string(), AvailableConnections::from_entries(&entries));
        count += 1;
    }
    info!("load {count} AvailableConnection files from {}", ac_dir.display());
    Ok(map)
}

/// Load and assemble the full topology (document + conn files).
pub fn load_topology(topo_file: &Path, ac_dir: Option<&Path>) -> Result<Topology> {
    let doc = load_topology_doc(topo_file)?;
    match ac_dir {
        Some(dir) => {
            let acs = load_conn_files(&doc, dir)?;
            Ok(Topology::build(&doc, &acs, true)?)
        }
        None => Ok(Topology::build(&doc, &HashMap::new(), false)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0"?>
<topology>
  <design>
    <channelInfo>
      <channelTable id="WDM32" type="optical">
        <channel no="1"/>
        <channel no="2"/>
      </channelTable>
      <channelTable id="ETH" type="ether">
        <channel no="1"/>
      </channelTable>
    </channelInfo>
  </design>
  <components>
    <comp ref="N1">
      <field name="Model">WSS_100_9</field>
      <field name="Controller">10.0.0.2</field>
      <field name="Socket">5</field>
      <field GLPKchannelTableId="WDM32"/>
      <ports>
        <port number="1" name="/N1_IN1" io="input" supportChannel="WDM32"/>
        <port number="2" name="/N1_OUT1" supportChannel="WDM32"/>
      </ports>
    </comp>
    <comp ref="P2">
      <ports>
        <port number="1" name="/P2_IN1" supportChannel="WDM32"/>
      </ports>
    </comp>
  </components>
  <nets>
    <net code="1" name="/N1_P2_01-0" pair="/N1_P2_01-0">
      <node ref="N1" pin="2"/>
      <node ref="P2" pin="1"/>
      <cost>0.25</cost>
    </net>
  </nets>
</topology>
"#;

    #[test]
    fn parses_tables_comps_and_nets() {
        let doc = parse_topology_doc(XML).unwrap();
        assert_eq!(doc.channel_tables.len(), 2);
        assert_eq!(doc.channel_tables[0].channel_nos, vec![1, 2]);
        assert_eq!(doc.comps.len(), 2);

        let n1 = &doc.comps[0];
        assert_eq!(n1.name, "N1");
        assert_eq!(n1.model.as_deref(), Some("WSS_100_9"));
        assert_eq!(n1.controller.as_deref(), Some("10.0.0.2"));
        assert_eq!(n1.socket, Some(5));
        assert_eq!(n1.table_id.as_deref(), Some("WDM32"));
        assert_eq!(n1.ports.len(), 2);
        assert_eq!(n1.ports[0].io.as_deref(), Some("input"));
        assert_eq!(n1.ports[1].io, None);

        assert_eq!(doc.nets.len(), 1);
        assert_eq!(doc.nets[0].nodes.len(), 2);
        assert_eq!(doc.nets[0].cost, 0.25);
        assert_eq!(doc.nets[0].pair.as_deref(), Some("/N1_P2_01-0"));
    }

    #[test]
    fn non_optical_table_survives_parse_but_not_build() {
        let doc = parse_topology_doc(XML).unwrap();
        let topo = Topology::build(&doc, &HashMap::new(), true).unwrap();
        assert_eq!(topo.tables().len(), 1);
        assert_eq!(topo.tables()[0].id, "WDM32");
    }

    #[test]
    fn missing_required_attribute_is_fatal() {
        let bad = XML.replace("ref=\"N1\"", "");
        assert!(parse_topology_doc(&bad).is_err());
    }

    #[test]
    fn full_build_from_parsed_doc() {
        let doc = parse_topology_doc(XML).unwrap();
        let topo = Topology::build(&doc, &HashMap::new(), true).unwrap();
        let n1 = topo.comp_by_name("N1").unwrap();
        assert!(topo.comp(n1).has_controller());
        let p2 = topo.comp_by_name("P2").unwrap();
        assert!(topo.comp(p2).is_pseudo());
        assert_eq!(topo.portpairs().len(), 1);
    }
}
