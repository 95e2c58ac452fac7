//! Normalized workflow model shared by every query.
//!
//! Both document shapes (flat node map and editor graph) normalize into the
//! same `Workflow`/`Node` structures, so the queries never branch on the
//! original shape. Links are not stored as first-class entities; they stay
//! embedded in `inputs`/`outputs` and the queries reconstruct
//! producer/consumer relationships on demand.

use serde_json::Value;
use std::fmt;

/// One node of the workflow graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub node_type: String,

    /// Ordered input ports. The flat shape keeps its key order, the graph
    /// shape keeps the descriptor order.
    pub inputs: Vec<InputPort>,

    /// Ordered output ports. Always empty for flat-shape nodes.
    pub outputs: Vec<OutputPort>,

    /// Literal parameter values attached to the node (prompt text etc.).
    pub widgets_values: Option<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct InputPort {
    pub name: String,
    pub value: InputValue,
}

/// What an input port carries.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// Inline literal (number, string, bool, ...).
    Literal(Value),

    /// Flat-shape reference: `[producer_id, output_slot]`.
    NodeRef { producer: String, slot: u64 },

    /// Graph-shape source link id; `None` when the port is unconnected.
    Link(Option<String>),
}

#[derive(Debug, Clone)]
pub struct OutputPort {
    pub name: Option<String>,

    /// Link ids carried by this output slot.
    pub links: Vec<String>,
}

impl Node {
    /// First input port with the given name.
    pub fn input(&self, name: &str) -> Option<&InputPort> {
        self.inputs.iter().find(|port| port.name == name)
    }
}

/// A nested, reusable grouping of nodes within the document.
#[derive(Debug, Clone)]
pub struct Subgraph {
    pub label: String,
    pub nodes: Vec<Node>,
}

/// Where a node lives within the document. Node ids are only unique within
/// one scope, so every query result carries its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Top,
    Subgraph(&'a str),
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Top => write!(f, "top-level"),
            Scope::Subgraph(label) => write!(f, "subgraph '{}'", label),
        }
    }
}

/// Which scopes a scanning query walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFilter {
    Top,
    Subgraphs,
    All,
}

/// The full, immutable graph for one document.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub nodes: Vec<Node>,
    pub subgraphs: Vec<Subgraph>,
}

impl Workflow {
    /// Iterate top-level nodes.
    pub fn top_nodes<'a>(&'a self) -> impl Iterator<Item = (Scope<'a>, &'a Node)> {
        self.nodes.iter().map(|node| (Scope::Top, node))
    }

    /// Iterate nodes across every subgraph definition.
    pub fn subgraph_nodes<'a>(&'a self) -> impl Iterator<Item = (Scope<'a>, &'a Node)> {
        self.subgraphs.iter().flat_map(|sg| {
            sg.nodes
                .iter()
                .map(move |node| (Scope::Subgraph(sg.label.as_str()), node))
        })
    }

    /// Iterate every node: top level first, then subgraphs in document order.
    pub fn all_nodes<'a>(&'a self) -> impl Iterator<Item = (Scope<'a>, &'a Node)> {
        self.top_nodes().chain(self.subgraph_nodes())
    }

    /// Iterate the scopes selected by `filter`.
    pub fn scoped_nodes<'a>(
        &'a self,
        filter: ScopeFilter,
    ) -> Box<dyn Iterator<Item = (Scope<'a>, &'a Node)> + 'a> {
        match filter {
            ScopeFilter::Top => Box::new(self.top_nodes()),
            ScopeFilter::Subgraphs => Box::new(self.subgraph_nodes()),
            ScopeFilter::All => Box::new(self.all_nodes()),
        }
    }

    /// Iterate scopes as contiguous node slices.
    pub fn scopes<'a>(&'a self) -> impl Iterator<Item = (Scope<'a>, &'a [Node])> {
        std::iter::once((Scope::Top, self.nodes.as_slice())).chain(
            self.subgraphs
                .iter()
                .map(|sg| (Scope::Subgraph(sg.label.as_str()), sg.nodes.as_slice())),
        )
    }

    /// First node with the given id, searching top level then subgraphs.
    pub fn find_node(&self, id: &str) -> Option<(Scope<'_>, &Node)> {
        self.all_nodes().find(|(_, node)| node.id == id)
    }

    /// Nodes sharing one scope, for scope-local link resolution.
    pub fn nodes_in_scope(&self, scope: Scope<'_>) -> &[Node] {
        match scope {
            Scope::Top => &self.nodes,
            Scope::Subgraph(label) => self
                .subgraphs
                .iter()
                .find(|sg| sg.label == label)
                .map(|sg| sg.nodes.as_slice())
                .unwrap_or(&[]),
        }
    }
}
