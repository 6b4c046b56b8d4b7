//! # linkmap algorithms
//!
//! Stages and analysis algorithms for linkmap.
//!
//! ## Modules
//!
//! - **barriers**: multi-radius barrier detection and mosaicking
//! - **network**: core area graph and connected components
//! - **circuit**: current-flow centrality via Circuitscape
//! - **engine**: the raster engine seam and its local implementation
//! - **statistics**: focal statistics over circles and annuli
//! - **mosaic**: cellwise algebra and null-aware mosaicking

pub mod barriers;
pub mod circuit;
pub mod engine;
pub(crate) mod maybe_rayon;
pub mod mosaic;
pub mod network;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::barriers::{run_barriers, BarrierReport, MosaicAccumulator};
    pub use crate::circuit::{run_centrality, CentralityReport, CircuitSolver, Circuitscape};
    pub use crate::engine::{LocalEngine, RasterEngine};
    pub use crate::mosaic::{mosaic, MosaicOp};
    pub use crate::network::{build_graph, find_components, Graph};
    pub use crate::statistics::{focal_statistics, FocalParams, FocalStatistic};
    pub use linkmap_core::prelude::*;
}
