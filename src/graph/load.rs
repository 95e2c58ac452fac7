//! Document loading: shape detection + normalization into `Workflow`.

use crate::error::{Error, Result};
use crate::graph::node::{InputPort, InputValue, Node, OutputPort, Subgraph, Workflow};
use crate::graph::raw::{RawApiNode, RawGraph, RawGraphNode, RawId, RawSubgraph};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;

/// Read `path` and normalize its contents.
///
/// Non-fatal integrity findings (dangling references, duplicate ids) are
/// printed to stderr as `WARN:` lines; they never fail the load.
pub fn load_workflow(path: &str) -> Result<Workflow> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_string(),
        source,
    })?;

    let workflow = parse_workflow(&text, path)?;
    for warning in integrity_warnings(&workflow) {
        eprintln!("WARN: {}", warning);
    }

    Ok(workflow)
}

/// Parse a workflow document from text. `origin` labels error messages.
///
/// Shape detection:
/// - a root object with a `nodes` array is an editor graph
/// - a root object with at least one member carrying `class_type` is a
///   flat node map
/// - anything else is a schema error
pub fn parse_workflow(text: &str, origin: &str) -> Result<Workflow> {
    let root: Value = serde_json::from_str(text).map_err(|source| Error::Parse {
        path: origin.to_string(),
        source,
    })?;

    let Value::Object(map) = &root else {
        return Err(Error::Schema {
            path: origin.to_string(),
            reason: "root is not a JSON object".to_string(),
        });
    };

    if map.get("nodes").is_some_and(Value::is_array) {
        return normalize_graph(root, origin);
    }

    if map.values().any(|v| v.get("class_type").is_some()) {
        return Ok(normalize_flat(map));
    }

    Err(Error::Schema {
        path: origin.to_string(),
        reason: "neither a flat node map (no class_type entries) nor a graph document (no nodes array)"
            .to_string(),
    })
}

fn normalize_flat(map: &Map<String, Value>) -> Workflow {
    let mut nodes = Vec::new();
    for (id, value) in map {
        let raw: RawApiNode = match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(_) => {
                eprintln!("WARN: skipping entry '{}': not a node object with class_type", id);
                continue;
            }
        };

        let inputs = raw
            .inputs
            .iter()
            .map(|(name, value)| InputPort {
                name: name.clone(),
                value: flat_input_value(value),
            })
            .collect();

        nodes.push(Node {
            id: id.clone(),
            node_type: raw.class_type,
            inputs,
            outputs: Vec::new(),
            widgets_values: None,
        });
    }

    Workflow {
        nodes,
        subgraphs: Vec::new(),
    }
}

/// A two-element array `[producer_id, output_slot]` is a node reference;
/// everything else stays a literal.
fn flat_input_value(value: &Value) -> InputValue {
    if let Value::Array(items) = value {
        if items.len() == 2 {
            if let Some(slot) = items[1].as_u64() {
                let producer = match &items[0] {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                };
                if let Some(producer) = producer {
                    return InputValue::NodeRef { producer, slot };
                }
            }
        }
    }
    InputValue::Literal(value.clone())
}

fn normalize_graph(root: Value, origin: &str) -> Result<Workflow> {
    let raw: RawGraph = serde_json::from_value(root).map_err(|e| Error::Schema {
        path: origin.to_string(),
        reason: e.to_string(),
    })?;

    let nodes = raw.nodes.into_iter().map(graph_node).collect();

    let mut subgraphs = Vec::new();
    if let Some(defs) = raw.definitions {
        for (index, sg) in defs.subgraphs.into_iter().enumerate() {
            subgraphs.push(subgraph(sg, index));
        }
    }

    Ok(Workflow { nodes, subgraphs })
}

fn subgraph(raw: RawSubgraph, index: usize) -> Subgraph {
    let label = raw
        .name
        .filter(|name| !name.is_empty())
        .or_else(|| raw.id.map(RawId::into_key))
        .unwrap_or_else(|| format!("#{}", index));

    Subgraph {
        label,
        nodes: raw.nodes.into_iter().map(graph_node).collect(),
    }
}

fn graph_node(raw: RawGraphNode) -> Node {
    let inputs = raw
        .inputs
        .into_iter()
        .map(|port| InputPort {
            name: port.name,
            value: InputValue::Link(port.link.map(RawId::into_key)),
        })
        .collect();

    let outputs = raw
        .outputs
        .into_iter()
        .map(|port| OutputPort {
            name: port.name,
            links: port
                .links
                .unwrap_or_default()
                .into_iter()
                .map(RawId::into_key)
                .collect(),
        })
        .collect();

    Node {
        id: raw.id.into_key(),
        node_type: raw.node_type,
        inputs,
        outputs,
        widgets_values: raw.widgets_values,
    }
}

/// Non-fatal invariant checks: node ids must be unique within their scope,
/// and every node reference must resolve within the same scope.
pub fn integrity_warnings(workflow: &Workflow) -> Vec<String> {
    let mut warnings = Vec::new();

    for (scope, nodes) in workflow.scopes() {
        let mut seen = BTreeSet::new();
        for node in nodes {
            if !seen.insert(node.id.as_str()) {
                warnings.push(format!("duplicate node id '{}' in {}", node.id, scope));
            }
        }

        let ids: BTreeSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
        for node in nodes {
            for port in &node.inputs {
                if let InputValue::NodeRef { producer, .. } = &port.value {
                    if !ids.contains(producer.as_str()) {
                        warnings.push(format!(
                            "node {} input '{}' references missing node id '{}' in {}",
                            node.id, port.name, producer, scope
                        ));
                    }
                }
            }
        }
    }

    warnings
}
