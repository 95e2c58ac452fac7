//! Read-only queries over a normalized `Workflow`.
//!
//! Scanning operations never fail on absence: no match means an empty
//! result. Exact lookups (`consumers_of_node`, `resolve_input_chain`) fail
//! with `NotFound` when the target id exists in no scope.

use crate::error::{Error, Result};
use crate::graph::{InputValue, Node, Scope, ScopeFilter, Workflow};
use regex::Regex;
use std::collections::BTreeSet;

/// How `find_by_type` compares type names.
#[derive(Debug, Clone)]
pub enum TypeMatcher {
    Exact(String),
    Pattern(Regex),
}

impl TypeMatcher {
    pub fn matches(&self, node_type: &str) -> bool {
        match self {
            TypeMatcher::Exact(name) => node_type == name,
            TypeMatcher::Pattern(re) => re.is_match(node_type),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeMatch<'a> {
    pub scope: Scope<'a>,
    pub node: &'a Node,
}

/// Every node whose type matches.
pub fn find_by_type<'a>(
    workflow: &'a Workflow,
    filter: ScopeFilter,
    matcher: &TypeMatcher,
) -> Vec<TypeMatch<'a>> {
    workflow
        .scoped_nodes(filter)
        .filter(|(_, node)| matcher.matches(&node.node_type))
        .map(|(scope, node)| TypeMatch { scope, node })
        .collect()
}

#[derive(Debug, Clone)]
pub struct InputMatch<'a> {
    pub scope: Scope<'a>,
    pub node: &'a Node,
    pub name: &'a str,
    pub value: &'a InputValue,
}

/// Every node carrying an input port with the given name, with the value
/// that port holds.
pub fn find_by_input_name<'a>(
    workflow: &'a Workflow,
    filter: ScopeFilter,
    input_name: &str,
) -> Vec<InputMatch<'a>> {
    let mut out = Vec::new();
    for (scope, node) in workflow.scoped_nodes(filter) {
        if let Some(port) = node.input(input_name) {
            out.push(InputMatch {
                scope,
                node,
                name: &port.name,
                value: &port.value,
            });
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct ProducerMatch<'a> {
    pub scope: Scope<'a>,
    pub node: &'a Node,
    pub slot: usize,
}

/// Every output slot whose link list carries `link_id`.
///
/// Malformed data can record zero or several producers for one link; all
/// matches are reported, no uniqueness is assumed.
pub fn producers_of_link<'a>(
    workflow: &'a Workflow,
    filter: ScopeFilter,
    link_id: &str,
) -> Vec<ProducerMatch<'a>> {
    let mut out = Vec::new();
    for (scope, node) in workflow.scoped_nodes(filter) {
        for (slot, port) in node.outputs.iter().enumerate() {
            if port.links.iter().any(|link| link == link_id) {
                out.push(ProducerMatch { scope, node, slot });
            }
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct ConsumerMatch<'a> {
    pub scope: Scope<'a>,
    pub node: &'a Node,
    pub input_name: &'a str,
}

/// Every input that consumes an output of `node_id`: either a direct
/// `[node_id, slot]` reference, or (graph shape) an input whose source link
/// id appears in the named node's output links. Link matching is
/// scope-local, since ids are only unique within one scope.
pub fn consumers_of_node<'a>(
    workflow: &'a Workflow,
    node_id: &str,
) -> Result<Vec<ConsumerMatch<'a>>> {
    if workflow.find_node(node_id).is_none() {
        return Err(Error::NotFound {
            what: "node",
            id: node_id.to_string(),
        });
    }

    let mut out = Vec::new();
    for (scope, nodes) in workflow.scopes() {
        // Links produced by this scope's occurrence of the node, if any.
        let produced: BTreeSet<&str> = nodes
            .iter()
            .filter(|node| node.id == node_id)
            .flat_map(|node| node.outputs.iter())
            .flat_map(|port| port.links.iter().map(String::as_str))
            .collect();

        for node in nodes {
            for port in &node.inputs {
                let hit = match &port.value {
                    InputValue::NodeRef { producer, .. } => producer == node_id,
                    InputValue::Link(Some(link)) => produced.contains(link.as_str()),
                    _ => false,
                };
                if hit {
                    out.push(ConsumerMatch {
                        scope,
                        node,
                        input_name: &port.name,
                    });
                }
            }
        }
    }

    Ok(out)
}

/// Sorted, deduplicated type names in the selected scope.
pub fn distinct_types(workflow: &Workflow, filter: ScopeFilter) -> Vec<String> {
    let set: BTreeSet<&str> = workflow
        .scoped_nodes(filter)
        .map(|(_, node)| node.node_type.as_str())
        .collect();
    set.into_iter().map(str::to_string).collect()
}

#[derive(Debug, Clone)]
pub struct ChainHop<'a> {
    pub scope: Scope<'a>,
    pub node: &'a Node,
}

/// Follow `input_name` upstream from `node_id`, one producing node per hop,
/// up to `depth` hops.
///
/// A node reference resolves by id within the current scope; a connected
/// link resolves to the first node in the scope whose outputs carry it. The
/// chain ends early at a literal value, an unconnected port, a missing
/// input, or a dangling reference (warned on stderr).
pub fn resolve_input_chain<'a>(
    workflow: &'a Workflow,
    node_id: &str,
    input_name: &str,
    depth: usize,
) -> Result<Vec<ChainHop<'a>>> {
    let (scope, mut current) = workflow.find_node(node_id).ok_or_else(|| Error::NotFound {
        what: "node",
        id: node_id.to_string(),
    })?;

    let mut hops = Vec::new();
    for _ in 0..depth {
        let Some(port) = current.input(input_name) else {
            break;
        };

        let producer = match &port.value {
            InputValue::NodeRef { producer, .. } => {
                let found = workflow
                    .nodes_in_scope(scope)
                    .iter()
                    .find(|node| node.id == *producer);
                if found.is_none() {
                    eprintln!(
                        "WARN: node {} input '{}' references missing node id '{}' in {}",
                        current.id, input_name, producer, scope
                    );
                }
                found
            }
            InputValue::Link(Some(link)) => {
                let matches: Vec<&Node> = workflow
                    .nodes_in_scope(scope)
                    .iter()
                    .filter(|node| {
                        node.outputs
                            .iter()
                            .any(|port| port.links.iter().any(|l| l == link))
                    })
                    .collect();
                if matches.is_empty() {
                    eprintln!("WARN: no producer records link '{}' in {}", link, scope);
                } else if matches.len() > 1 {
                    eprintln!(
                        "WARN: link '{}' has {} producers in {}; following the first",
                        link,
                        matches.len(),
                        scope
                    );
                }
                matches.first().copied()
            }
            // literal or unconnected: nothing further to follow
            _ => None,
        };

        let Some(producer) = producer else {
            break;
        };
        hops.push(ChainHop {
            scope,
            node: producer,
        });
        current = producer;
    }

    Ok(hops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::parse_workflow;
    use pretty_assertions::assert_eq;

    const FLAT: &str = r#"{
        "60": {"class_type": "DualCLIPLoader", "inputs": {"clip_name1": "clip_l.safetensors"}},
        "61": {"class_type": "CLIPTextEncode", "inputs": {"clip": ["60", 1], "text": "a castle on a hill"}},
        "62": {"class_type": "CLIPTextEncode", "inputs": {"clip": ["60", 1], "text": "blurry, low quality"}},
        "63": {"class_type": "KSampler", "inputs": {"positive": ["61", 0], "negative": ["62", 0], "seed": 42}}
    }"#;

    const GRAPH: &str = r#"{
        "nodes": [
            {"id": 2, "type": "DualCLIPLoader", "outputs": [{"name": "CLIP", "links": [5, 6]}]},
            {"id": 3, "type": "CLIPTextEncode",
             "inputs": [{"name": "clip", "link": 5}],
             "outputs": [{"name": "CONDITIONING", "links": [7]}],
             "widgets_values": ["a castle on a hill"]},
            {"id": 4, "type": "KSampler",
             "inputs": [{"name": "positive", "link": 7}, {"name": "latent_image", "link": null}],
             "outputs": [{"name": "LATENT", "links": [9]}]}
        ],
        "definitions": {"subgraphs": [
            {"name": "sampler-core", "nodes": [
                {"id": "11", "type": "UNETLoader", "outputs": [{"name": "MODEL", "links": [140]}]},
                {"id": "10", "type": "CFGGuider",
                 "inputs": [{"name": "model", "link": 140}],
                 "outputs": [{"name": "GUIDER", "links": [141]}]}
            ]}
        ]}
    }"#;

    fn flat() -> Workflow {
        parse_workflow(FLAT, "flat.json").unwrap()
    }

    fn graph() -> Workflow {
        parse_workflow(GRAPH, "graph.json").unwrap()
    }

    #[test]
    fn distinct_types_are_sorted_and_deduplicated() {
        let types = distinct_types(&flat(), ScopeFilter::All);
        assert_eq!(types, vec!["CLIPTextEncode", "DualCLIPLoader", "KSampler"]);
    }

    #[test]
    fn distinct_types_respect_scope() {
        let wf = graph();
        assert_eq!(
            distinct_types(&wf, ScopeFilter::Top),
            vec!["CLIPTextEncode", "DualCLIPLoader", "KSampler"]
        );
        assert_eq!(
            distinct_types(&wf, ScopeFilter::Subgraphs),
            vec!["CFGGuider", "UNETLoader"]
        );
        assert_eq!(distinct_types(&wf, ScopeFilter::All).len(), 5);
    }

    #[test]
    fn find_by_type_returns_exactly_the_matching_nodes() {
        // three nodes of one type, two of another
        let text = r#"{
            "1": {"class_type": "CLIPTextEncode", "inputs": {"text": "a"}},
            "2": {"class_type": "CLIPTextEncode", "inputs": {"text": "b"}},
            "3": {"class_type": "CLIPTextEncode", "inputs": {"text": "c"}},
            "4": {"class_type": "KSampler", "inputs": {}},
            "5": {"class_type": "KSampler", "inputs": {}}
        }"#;
        let wf = parse_workflow(text, "t.json").unwrap();

        let matcher = TypeMatcher::Exact("CLIPTextEncode".to_string());
        let matches = find_by_type(&wf, ScopeFilter::All, &matcher);
        assert_eq!(matches.len(), 3);
        let ids: Vec<&str> = matches.iter().map(|m| m.node.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn find_by_type_carries_widget_values() {
        let wf = graph();
        let matcher = TypeMatcher::Exact("CLIPTextEncode".to_string());
        let matches = find_by_type(&wf, ScopeFilter::All, &matcher);
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].node.widgets_values,
            Some(vec![serde_json::json!("a castle on a hill")])
        );
    }

    #[test]
    fn find_by_type_with_a_pattern() {
        let wf = flat();
        let matcher = TypeMatcher::Pattern(Regex::new("^CLIP").unwrap());
        let matches = find_by_type(&wf, ScopeFilter::All, &matcher);
        let ids: Vec<&str> = matches.iter().map(|m| m.node.id.as_str()).collect();
        assert_eq!(ids, vec!["61", "62"]);
    }

    #[test]
    fn find_by_input_name_yields_the_value() {
        let wf = flat();
        let matches = find_by_input_name(&wf, ScopeFilter::All, "text");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].node.id, "61");
        assert_eq!(
            *matches[0].value,
            InputValue::Literal(serde_json::json!("a castle on a hill"))
        );
    }

    #[test]
    fn producers_of_absent_link_is_empty() {
        assert!(producers_of_link(&graph(), ScopeFilter::All, "9999").is_empty());
        assert!(producers_of_link(&flat(), ScopeFilter::All, "140").is_empty());
    }

    #[test]
    fn producers_of_link_reports_scope_and_slot() {
        let wf = graph();
        let matches = producers_of_link(&wf, ScopeFilter::All, "140");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].node.id, "11");
        assert_eq!(matches[0].slot, 0);
        assert_eq!(matches[0].scope, Scope::Subgraph("sampler-core"));

        // restricting the scan to the top level hides the subgraph producer
        assert!(producers_of_link(&wf, ScopeFilter::Top, "140").is_empty());
    }

    #[test]
    fn consumers_include_every_direct_reference() {
        let wf = flat();
        let matches = consumers_of_node(&wf, "61").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].node.id, "63");
        assert_eq!(matches[0].input_name, "positive");

        // node 60 feeds both encoders
        let matches = consumers_of_node(&wf, "60").unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.node.id.as_str()).collect();
        assert_eq!(ids, vec!["61", "62"]);
    }

    #[test]
    fn consumers_follow_output_links_in_graph_shape() {
        let wf = graph();

        let matches = consumers_of_node(&wf, "3").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].node.id, "4");
        assert_eq!(matches[0].input_name, "positive");

        // one producer feeding two links
        let matches = consumers_of_node(&wf, "2").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].node.id, "3");

        // link matching stays inside the subgraph scope
        let matches = consumers_of_node(&wf, "11").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].node.id, "10");
        assert_eq!(matches[0].scope, Scope::Subgraph("sampler-core"));
    }

    #[test]
    fn consumers_of_unknown_node_is_not_found() {
        let err = consumers_of_node(&flat(), "9999").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "got {:?}", err);
    }

    #[test]
    fn chain_resolves_the_positive_conditioning_producer() {
        let wf = flat();
        let hops = resolve_input_chain(&wf, "63", "positive", 1).unwrap();
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].node.id, "61");
        assert_eq!(hops[0].node.node_type, "CLIPTextEncode");
        assert_eq!(
            hops[0].node.input("text").unwrap().value,
            InputValue::Literal(serde_json::json!("a castle on a hill"))
        );
    }

    #[test]
    fn chain_stops_when_the_input_is_not_a_reference() {
        let wf = flat();
        // literal input: nothing to follow
        assert!(resolve_input_chain(&wf, "63", "seed", 3).unwrap().is_empty());
        // producer has no input of the same name: one hop only, even with depth to spare
        let hops = resolve_input_chain(&wf, "63", "positive", 5).unwrap();
        assert_eq!(hops.len(), 1);
    }

    #[test]
    fn chain_follows_links_in_graph_shape() {
        let wf = graph();
        let hops = resolve_input_chain(&wf, "4", "positive", 2).unwrap();
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].node.id, "3");

        // unconnected port ends the chain immediately
        assert!(
            resolve_input_chain(&wf, "4", "latent_image", 2)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn chain_of_unknown_node_is_not_found() {
        let err = resolve_input_chain(&flat(), "9999", "positive", 1).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "got {:?}", err);
    }

    #[test]
    fn graph_without_definitions_equals_graph_with_empty_subgraphs() {
        let bare = r#"{"nodes": [
            {"id": 1, "type": "A", "outputs": [{"name": "X", "links": [4]}]},
            {"id": 2, "type": "B", "inputs": [{"name": "in", "link": 4}]}
        ]}"#;
        let empty = r#"{"nodes": [
            {"id": 1, "type": "A", "outputs": [{"name": "X", "links": [4]}]},
            {"id": 2, "type": "B", "inputs": [{"name": "in", "link": 4}]}
        ], "definitions": {"subgraphs": []}}"#;

        let a = parse_workflow(bare, "a.json").unwrap();
        let b = parse_workflow(empty, "b.json").unwrap();

        assert_eq!(
            distinct_types(&a, ScopeFilter::All),
            distinct_types(&b, ScopeFilter::All)
        );
        for wf in [&a, &b] {
            let producers = producers_of_link(wf, ScopeFilter::All, "4");
            assert_eq!(producers.len(), 1);
            assert_eq!(producers[0].node.id, "1");

            let consumers = consumers_of_node(wf, "1").unwrap();
            assert_eq!(consumers.len(), 1);
            assert_eq!(consumers[0].node.id, "2");
        }
    }
}
