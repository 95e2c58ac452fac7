//! Raw on-disk JSON shapes.
//!
//! Two document shapes exist in the wild.
//!
//! Flat node map (API export):
//! {
//!   "63": {
//!     "class_type": "KSampler",
//!     "inputs": { "positive": ["61", 0], "seed": 5 }
//!   },
//!   ...
//! }
//!
//! Editor graph:
//! {
//!   "nodes": [
//!     {
//!       "id": 3,
//!       "type": "KSampler",
//!       "inputs": [ { "name": "model", "link": 1 } ],
//!       "outputs": [ { "name": "LATENT", "links": [7] } ],
//!       "widgets_values": [42, "euler"]
//!     }
//!   ],
//!   "definitions": { "subgraphs": [ { "name": "...", "nodes": [ ... ] } ] }
//! }
//!
//! These structs mirror the JSON exactly; normalization into the query
//! model happens in `load`.

use serde::Deserialize;
use serde_json::{Map, Number, Value};

/// Node or link id as it appears on disk: number or string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Num(Number),
    Text(String),
}

impl RawId {
    /// Canonical string form used as the id key everywhere downstream.
    pub fn into_key(self) -> String {
        match self {
            RawId::Num(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// One entry of the flat node map.
#[derive(Debug, Clone, Deserialize)]
pub struct RawApiNode {
    pub class_type: String,

    #[serde(default)]
    pub inputs: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<RawGraphNode>,

    #[serde(default)]
    pub definitions: Option<RawDefinitions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDefinitions {
    #[serde(default)]
    pub subgraphs: Vec<RawSubgraph>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSubgraph {
    #[serde(default)]
    pub id: Option<RawId>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub nodes: Vec<RawGraphNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGraphNode {
    pub id: RawId,

    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default)]
    pub inputs: Vec<RawInputPort>,

    #[serde(default)]
    pub outputs: Vec<RawOutputPort>,

    #[serde(default)]
    pub widgets_values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawInputPort {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub link: Option<RawId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOutputPort {
    #[serde(default)]
    pub name: Option<String>,

    /// Editor exports write `null` for outputs with no connections.
    #[serde(default)]
    pub links: Option<Vec<RawId>>,
}
