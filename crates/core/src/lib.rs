//! # linkmap core
//!
//! Core types, tables, configuration and I/O shared by the linkmap stages.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced raster grid with null-aware cells
//! - `Neighborhood`: circle and annulus shapes in map units
//! - `LinkTable`: candidate connections between core areas
//! - `CoreTable`: core area attributes
//! - `ProjectConfig`: per-stage immutable configuration
//! - GeoTIFF I/O

pub mod config;
pub mod cores;
pub mod error;
pub mod io;
pub mod linktable;
pub mod raster;
pub mod shard;

pub use error::{Error, Result};
pub use linktable::{CorePair, LinkRow, LinkTable, ProcessedPairs};
pub use raster::{GeoTransform, Neighborhood, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::linktable::{CorePair, LinkRow, LinkTable};
    pub use crate::raster::{GeoTransform, Neighborhood, Raster, RasterElement};
    pub use crate::Algorithm;
}

/// Core trait for algorithms.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
