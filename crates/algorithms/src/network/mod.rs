//! Core area network
//!
//! - **graph**: dense weighted graph built from link table rows
//! - **components**: breadth-first connected component labelling

pub mod components;
pub mod graph;

pub use components::{component_count, extract_subgraph, find_components, ConnectedComponents};
pub use graph::{build_graph, Graph};
