//! Raster engine seam
//!
//! The barrier stage talks to rasters only through [`RasterEngine`]: loading
//! and persisting grids, focal statistics, cellwise algebra and mosaicking.
//! [`LocalEngine`] implements it in-process on GeoTIFF files; other engines
//! (or test doubles) can be swapped in.

mod local;
mod retry;

pub use local::LocalEngine;
pub use retry::{with_retry, ScratchRotation};

use std::path::Path;

use linkmap_core::raster::{Neighborhood, Raster};
use linkmap_core::Result;

use crate::mosaic::MosaicOp;
use crate::statistics::FocalStatistic;

/// Raster operations the barrier stage depends on
pub trait RasterEngine {
    /// Read a raster; null cells come back as NaN
    fn load(&self, path: &Path) -> Result<Raster<f64>>;

    /// Persist a raster, creating parent directories as needed
    fn save(&self, raster: &Raster<f64>, path: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn focal_statistic(
        &self,
        raster: &Raster<f64>,
        neighborhood: Neighborhood,
        statistic: FocalStatistic,
    ) -> Result<Raster<f64>>;

    /// Cellwise expression over aligned inputs; NaN in and out means null
    fn algebra(&self, inputs: &[&Raster<f64>], expr: &dyn Fn(&[f64]) -> f64) -> Result<Raster<f64>>;

    fn mosaic(&self, rasters: &[&Raster<f64>], op: MosaicOp) -> Result<Raster<f64>>;

    fn set_null_where(
        &self,
        raster: &Raster<f64>,
        predicate: &dyn Fn(f64) -> bool,
    ) -> Result<Raster<f64>>;

    fn copy(&self, src: &Path, dest: &Path) -> Result<()>;

    /// Delete a raster; missing files are not an error
    fn remove(&self, path: &Path) -> Result<()>;
}
