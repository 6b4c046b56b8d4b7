//! Current-flow centrality through an external circuit solver
//!
//! - **files**: graph serialization and solver result parsing
//! - **config**: Circuitscape run configuration
//! - **solver**: `CircuitSolver` trait and the Circuitscape process adapter
//! - **centrality**: the centrality stage

pub mod centrality;
pub mod config;
pub mod files;
pub mod solver;

pub use centrality::{apply_edge_currents, apply_node_currents, run_centrality, CentralityReport};
pub use config::CircuitscapeConfig;
pub use files::{parse_results, serialize_graph, write_graph, SolverResults};
pub use solver::{CircuitSolver, Circuitscape};
