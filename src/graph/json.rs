//! # Graph JSON Wire Format
//!
//! Serde model of the persisted/exchanged graph definition and the
//! conversions between it and a live [`Graph`].
//!
//! ```json
//! {
//!   "properties": { "name": "example" },
//!   "inports": { "in": { "process": "Read", "port": "in" } },
//!   "outports": {},
//!   "groups": [ { "name": "io", "nodes": ["Read"] } ],
//!   "processes": { "Read": { "component": "ReadFile" } },
//!   "connections": [
//!     { "src": { "process": "Read", "port": "out" }, "tgt": { "process": "Split", "port": "in" } },
//!     { "data": "README.md", "tgt": { "process": "Read", "port": "in" } }
//!   ]
//! }
//! ```
//!
//! Serialisation is normalised: empty metadata is omitted and connections
//! list edges before initializers. Deserialisation lowercases port names,
//! translates legacy `exports` and wraps the whole load in a single
//! transaction named `loadJSON`.

use crate::fbp::{self, FbpParseError};
use crate::graph::error::GraphError;
use crate::graph::graph::Graph;
use crate::graph::types::Metadata;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

fn is_empty_metadata(metadata: &Metadata) -> bool {
  metadata.is_empty()
}

/// Complete graph definition as exchanged on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphJson {
  /// Graph properties, including the optional `name`.
  #[serde(default)]
  pub properties: Metadata,
  /// Public inports.
  #[serde(default)]
  pub inports: BTreeMap<String, PublicPortJson>,
  /// Public outports.
  #[serde(default)]
  pub outports: BTreeMap<String, PublicPortJson>,
  /// Node groups.
  #[serde(default)]
  pub groups: Vec<GroupJson>,
  /// Processes keyed by node id, in document order.
  #[serde(default)]
  pub processes: ProcessMap,
  /// Edges and initializers.
  #[serde(default)]
  pub connections: Vec<ConnectionJson>,
  /// Legacy flat exports.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub exports: Vec<ExportJson>,
}

/// Public port binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicPortJson {
  /// Node id.
  pub process: String,
  /// Node port.
  pub port: String,
  /// Metadata, omitted when empty.
  #[serde(default, skip_serializing_if = "is_empty_metadata")]
  pub metadata: Metadata,
}

/// Group definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupJson {
  /// Group name.
  pub name: String,
  /// Member node ids.
  #[serde(default)]
  pub nodes: Vec<String>,
  /// Metadata, omitted when empty.
  #[serde(default, skip_serializing_if = "is_empty_metadata")]
  pub metadata: Metadata,
}

/// Process definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessJson {
  /// Component name.
  pub component: String,
  /// Metadata, omitted when empty.
  #[serde(default, skip_serializing_if = "is_empty_metadata")]
  pub metadata: Metadata,
}

/// One side of a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointJson {
  /// Node id.
  pub process: String,
  /// Port name.
  pub port: String,
  /// Index on an addressable port.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub index: Option<usize>,
}

/// An edge (`src` present) or an initializer (`data` present).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionJson {
  /// Source port of an edge.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub src: Option<EndpointJson>,
  /// Literal packet of an initializer.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
  /// Target port.
  pub tgt: EndpointJson,
  /// Metadata, omitted when empty.
  #[serde(default, skip_serializing_if = "is_empty_metadata")]
  pub metadata: Metadata,
}

/// Legacy export, either `private: "node.port"` or explicit `process`/`port`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJson {
  /// `node.port` notation.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub private: Option<String>,
  /// Node id.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub process: Option<String>,
  /// Node port.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub port: Option<String>,
  /// Public name.
  pub public: String,
  /// Metadata, omitted when empty.
  #[serde(default, skip_serializing_if = "is_empty_metadata")]
  pub metadata: Metadata,
}

/// Processes keyed by id, preserving document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessMap(Vec<(String, ProcessJson)>);

impl ProcessMap {
  /// Creates an empty map.
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts or replaces a process, keeping the original position on replace.
  pub fn insert(&mut self, id: impl Into<String>, process: ProcessJson) {
    let id = id.into();
    match self.0.iter_mut().find(|(existing, _)| *existing == id) {
      Some(entry) => entry.1 = process,
      None => self.0.push((id, process)),
    }
  }

  /// Looks up a process by id.
  pub fn get(&self, id: &str) -> Option<&ProcessJson> {
    self.0.iter().find(|(existing, _)| existing == id).map(|(_, p)| p)
  }

  /// Whether a process with this id exists.
  pub fn contains_key(&self, id: &str) -> bool {
    self.get(id).is_some()
  }

  /// Iterates in document order.
  pub fn iter(&self) -> impl Iterator<Item = (&String, &ProcessJson)> {
    self.0.iter().map(|(id, p)| (id, p))
  }

  /// Number of processes.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Whether there are no processes.
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl Serialize for ProcessMap {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for (id, process) in &self.0 {
      map.serialize_entry(id, process)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for ProcessMap {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct ProcessMapVisitor;

    impl<'de> Visitor<'de> for ProcessMapVisitor {
      type Value = ProcessMap;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of process definitions")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ProcessMap, A::Error> {
        let mut map = ProcessMap::new();
        while let Some((id, process)) = access.next_entry::<String, ProcessJson>()? {
          map.insert(id, process);
        }
        Ok(map)
      }
    }

    deserializer.deserialize_map(ProcessMapVisitor)
  }
}

impl Graph {
  /// Produces the normalised wire form of this graph.
  pub fn to_json(&self) -> GraphJson {
    let mut json = GraphJson::default();
    let name = self.name();
    if !name.is_empty() {
      json
        .properties
        .insert("name".to_string(), Value::String(name));
    }
    for (key, value) in self.properties() {
      json.properties.insert(key, value);
    }
    let public = |port: crate::graph::PublicPort| PublicPortJson {
      process: port.process,
      port: port.port,
      metadata: port.metadata,
    };
    json.inports = self
      .inports()
      .into_iter()
      .map(|(name, port)| (name, public(port)))
      .collect();
    json.outports = self
      .outports()
      .into_iter()
      .map(|(name, port)| (name, public(port)))
      .collect();
    json.exports = self
      .exports()
      .into_iter()
      .map(|export| ExportJson {
        private: None,
        process: Some(export.process),
        port: Some(export.port),
        public: export.public,
        metadata: export.metadata,
      })
      .collect();
    json.groups = self
      .groups()
      .into_iter()
      .map(|group| GroupJson {
        name: group.name,
        nodes: group.nodes,
        metadata: group.metadata,
      })
      .collect();
    for node in self.nodes() {
      json.processes.insert(
        node.id,
        ProcessJson {
          component: node.component,
          metadata: node.metadata,
        },
      );
    }
    for edge in self.edges() {
      json.connections.push(ConnectionJson {
        src: Some(EndpointJson {
          process: edge.from.node,
          port: edge.from.port,
          index: edge.from.index,
        }),
        data: None,
        tgt: EndpointJson {
          process: edge.to.node,
          port: edge.to.port,
          index: edge.to.index,
        },
        metadata: edge.metadata,
      });
    }
    for iip in self.initializers() {
      json.connections.push(ConnectionJson {
        src: None,
        data: Some(iip.data),
        tgt: EndpointJson {
          process: iip.to.node,
          port: iip.to.port,
          index: iip.to.index,
        },
        metadata: iip.metadata,
      });
    }
    json
  }

  /// Serialises the normalised wire form as pretty-printed JSON.
  pub fn to_json_string(&self) -> Result<String, GraphError> {
    Ok(serde_json::to_string_pretty(&self.to_json())?)
  }

  /// Builds a graph from its wire form.
  ///
  /// Entries that reference unknown nodes are skipped, matching the
  /// forgiving mutation contract of [`Graph`].
  pub fn load_json(definition: &GraphJson, metadata: Option<Metadata>) -> Result<Graph, GraphError> {
    let name = definition
      .properties
      .get("name")
      .and_then(Value::as_str)
      .unwrap_or_default();
    let graph = Graph::new(name);
    graph.start_transaction("loadJSON", metadata.clone())?;

    let properties: Metadata = definition
      .properties
      .iter()
      .filter(|(key, _)| key.as_str() != "name")
      .map(|(key, value)| (key.clone(), value.clone()))
      .collect();
    if !properties.is_empty() {
      graph.set_properties(&properties);
    }

    for (id, process) in definition.processes.iter() {
      skip_rejected(graph.add_node(id, &process.component, Some(process.metadata.clone())));
    }

    for conn in &definition.connections {
      let tgt = &conn.tgt;
      let meta = Some(conn.metadata.clone());
      match &conn.src {
        Some(src) => skip_rejected(graph.add_edge_index(
          &src.process,
          &src.port,
          src.index,
          &tgt.process,
          &tgt.port,
          tgt.index,
          meta,
        )),
        None => skip_rejected(graph.add_initial_index(
          conn.data.clone().unwrap_or(Value::Null),
          &tgt.process,
          &tgt.port,
          tgt.index,
          meta,
        )),
      }
    }

    for export in &definition.exports {
      load_legacy_export(&graph, definition, export);
    }

    for (name, port) in &definition.inports {
      skip_rejected(graph.add_inport(name, &port.process, &port.port, Some(port.metadata.clone())));
    }
    for (name, port) in &definition.outports {
      skip_rejected(graph.add_outport(
        name,
        &port.process,
        &port.port,
        Some(port.metadata.clone()),
      ));
    }

    for group in &definition.groups {
      skip_rejected(graph.add_group(
        &group.name,
        group.nodes.clone(),
        Some(group.metadata.clone()),
      ));
    }

    graph.end_transaction("loadJSON", metadata)?;
    Ok(graph)
  }

  /// Parses a JSON string and builds the graph.
  pub fn from_json_str(source: &str) -> Result<Graph, GraphError> {
    let definition: GraphJson = serde_json::from_str(source)?;
    Graph::load_json(&definition, None)
  }

  /// Parses FBP notation and builds the graph.
  pub fn from_fbp(source: &str) -> Result<Graph, FbpParseError> {
    let definition = fbp::parse(source)?;
    Ok(Graph::load_json(&definition, None)?)
  }
}

fn skip_rejected<T>(result: Result<T, GraphError>) {
  if let Err(err) = result {
    debug!(error = %err, "skipping rejected graph entry during load");
  }
}

/// Adds a legacy export and, when its direction can be inferred from the
/// connections, binds it as a public inport or outport as well.
fn load_legacy_export(graph: &Graph, definition: &GraphJson, export: &ExportJson) {
  let (process, port) = match (&export.private, &export.process, &export.port) {
    (Some(private), _, _) => {
      let mut parts = private.split('.');
      let (Some(process), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
        debug!(private = %private, "skipping malformed legacy export");
        return;
      };
      let process = definition
        .processes
        .iter()
        .map(|(id, _)| id)
        .find(|id| id.to_lowercase() == process.to_lowercase())
        .cloned()
        .unwrap_or_else(|| process.to_string());
      (process, port.to_lowercase())
    }
    (None, Some(process), Some(port)) => (process.clone(), port.to_lowercase()),
    _ => {
      debug!(public = %export.public, "skipping legacy export without a private port");
      return;
    }
  };

  skip_rejected(graph.add_export(&export.public, &process, &port, Some(export.metadata.clone())));

  let public = export.public.to_lowercase();
  if definition.inports.contains_key(&public) || definition.outports.contains_key(&public) {
    return;
  }
  let matches = |endpoint: &EndpointJson| {
    endpoint.process == process && endpoint.port.to_lowercase() == port
  };
  let used_as_source = definition
    .connections
    .iter()
    .any(|c| c.src.as_ref().is_some_and(matches));
  let used_as_target = definition.connections.iter().any(|c| matches(&c.tgt));
  match (used_as_source, used_as_target) {
    (true, false) => skip_rejected(graph.add_outport(&public, &process, &port, None)),
    (false, true) => skip_rejected(graph.add_inport(&public, &process, &port, None)),
    _ => debug!(public = %public, "legacy export direction is ambiguous, keeping it unbound"),
  }
}
