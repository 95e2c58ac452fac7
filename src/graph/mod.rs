//! Workflow loading and the normalized graph model.
//!
//! `raw` mirrors the two on-disk JSON shapes, `load` detects and
//! normalizes them, `node` holds the shape-independent model the queries
//! operate on.

pub mod load;
pub mod node;
pub mod raw;

pub use load::{integrity_warnings, load_workflow, parse_workflow};
pub use node::{InputPort, InputValue, Node, OutputPort, Scope, ScopeFilter, Subgraph, Workflow};
