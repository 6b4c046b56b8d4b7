//! Multi-radius barrier detection
//!
//! Barriers are places where restoring a circle of habitat would most shorten
//! a corridor's least-cost distance. Each radius yields a mosaic across core
//! pairs; several radii are then fused into summary rasters.

pub mod accumulator;
pub mod benefit;
mod stage;

pub use accumulator::MosaicAccumulator;
pub use benefit::{benefit_value, search_annulus, search_circle};
pub use stage::{run_barriers, BarrierOutput, BarrierReport, OutputNames};
