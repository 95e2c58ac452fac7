//! Presentation: one formatted line per match record, stable field order,
//! full values (no truncation). `trace` additionally prints each hop's
//! full record as pretty JSON.

use crate::graph::{InputValue, Node};
use crate::query::{ChainHop, ConsumerMatch, InputMatch, ProducerMatch, TypeMatch};
use serde_json::{Map, Value, json};

pub fn type_line(m: &TypeMatch<'_>) -> String {
    let mut line = format!("[{}] node {} {}", m.scope, m.node.id, m.node.node_type);
    if let Some(text) = widget_text(m.node) {
        line.push_str(" text=");
        line.push_str(&text);
    }
    line
}

pub fn input_line(m: &InputMatch<'_>) -> String {
    format!(
        "[{}] node {} {} input {} = {}",
        m.scope,
        m.node.id,
        m.node.node_type,
        m.name,
        input_value_text(m.value)
    )
}

pub fn producer_line(m: &ProducerMatch<'_>, link_id: &str) -> String {
    format!(
        "[{}] node {} {} output slot {} carries link {}",
        m.scope, m.node.id, m.node.node_type, m.slot, link_id
    )
}

pub fn consumer_line(m: &ConsumerMatch<'_>, node_id: &str) -> String {
    format!(
        "[{}] node {} {} consumes node {} via input {}",
        m.scope, m.node.id, m.node.node_type, node_id, m.input_name
    )
}

pub fn chain_hop_block(index: usize, hop: &ChainHop<'_>) -> String {
    let record = node_record(hop.node);
    let pretty = serde_json::to_string_pretty(&record).unwrap_or_else(|_| record.to_string());
    format!(
        "hop {}: [{}] node {} {}\n{}",
        index + 1,
        hop.scope,
        hop.node.id,
        hop.node.node_type,
        pretty
    )
}

/// Full JSON record of a node, mirroring the source fields. Node
/// references render back as `[producer, slot]` pairs, link inputs as
/// `{"link": id}` objects.
pub fn node_record(node: &Node) -> Value {
    let mut record = Map::new();
    record.insert("id".to_string(), json!(node.id));
    record.insert("type".to_string(), json!(node.node_type));

    let mut inputs = Map::new();
    for port in &node.inputs {
        let value = match &port.value {
            InputValue::Literal(v) => v.clone(),
            InputValue::NodeRef { producer, slot } => json!([producer, slot]),
            InputValue::Link(link) => json!({ "link": link }),
        };
        inputs.insert(port.name.clone(), value);
    }
    record.insert("inputs".to_string(), Value::Object(inputs));

    if !node.outputs.is_empty() {
        let outputs: Vec<Value> = node
            .outputs
            .iter()
            .map(|port| json!({ "name": port.name, "links": port.links }))
            .collect();
        record.insert("outputs".to_string(), json!(outputs));
    }

    if let Some(widgets) = &node.widgets_values {
        record.insert("widgets_values".to_string(), json!(widgets));
    }

    Value::Object(record)
}

fn widget_text(node: &Node) -> Option<String> {
    node.widgets_values
        .as_ref()?
        .first()
        .map(Value::to_string)
}

fn input_value_text(value: &InputValue) -> String {
    match value {
        InputValue::Literal(v) => v.to_string(),
        InputValue::NodeRef { producer, slot } => format!("ref(node {}, slot {})", producer, slot),
        InputValue::Link(Some(link)) => format!("link {}", link),
        InputValue::Link(None) => "unconnected".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::parse_workflow;
    use crate::query::{self, TypeMatcher};
    use crate::graph::ScopeFilter;
    use pretty_assertions::assert_eq;

    #[test]
    fn lines_have_stable_field_order() {
        let text = r#"{
            "61": {"class_type": "CLIPTextEncode", "inputs": {"text": "a castle"}},
            "63": {"class_type": "KSampler", "inputs": {"positive": ["61", 0]}}
        }"#;
        let wf = parse_workflow(text, "t.json").unwrap();

        let matcher = TypeMatcher::Exact("KSampler".to_string());
        let matches = query::find_by_type(&wf, ScopeFilter::All, &matcher);
        assert_eq!(type_line(&matches[0]), "[top-level] node 63 KSampler");

        let matches = query::find_by_input_name(&wf, ScopeFilter::All, "positive");
        assert_eq!(
            input_line(&matches[0]),
            "[top-level] node 63 KSampler input positive = ref(node 61, slot 0)"
        );

        let matches = query::consumers_of_node(&wf, "61").unwrap();
        assert_eq!(
            consumer_line(&matches[0], "61"),
            "[top-level] node 63 KSampler consumes node 61 via input positive"
        );
    }

    #[test]
    fn type_line_appends_widget_text() {
        let text = r#"{"nodes": [
            {"id": 6, "type": "CLIPTextEncode", "widgets_values": ["a castle"]}
        ]}"#;
        let wf = parse_workflow(text, "t.json").unwrap();
        let matcher = TypeMatcher::Exact("CLIPTextEncode".to_string());
        let matches = query::find_by_type(&wf, ScopeFilter::All, &matcher);
        assert_eq!(
            type_line(&matches[0]),
            "[top-level] node 6 CLIPTextEncode text=\"a castle\""
        );
    }

    #[test]
    fn node_record_renders_refs_back_as_pairs() {
        let text = r#"{
            "63": {"class_type": "KSampler", "inputs": {"positive": ["61", 0], "seed": 42}}
        }"#;
        let wf = parse_workflow(text, "t.json").unwrap();
        let record = node_record(wf.find_node("63").unwrap().1);
        assert_eq!(
            record,
            serde_json::json!({
                "id": "63",
                "type": "KSampler",
                "inputs": { "positive": ["61", 0], "seed": 42 }
            })
        );
    }

    #[test]
    fn producer_line_names_scope_and_slot() {
        let text = r#"{"nodes": [
            {"id": 11, "type": "UNETLoader",
             "outputs": [{"name": "MODEL", "links": [140]}]}
        ]}"#;
        let wf = parse_workflow(text, "t.json").unwrap();
        let matches = query::producers_of_link(&wf, ScopeFilter::All, "140");
        assert_eq!(
            producer_line(&matches[0], "140"),
            "[top-level] node 11 UNETLoader output slot 0 carries link 140"
        );
    }
}
