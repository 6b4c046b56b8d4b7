//! In-process raster engine backed by GeoTIFF files

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use linkmap_core::io::{read_geotiff, write_geotiff};
use linkmap_core::raster::{Neighborhood, Raster};
use linkmap_core::Result;

use super::RasterEngine;
use crate::mosaic::{self, MosaicOp};
use crate::statistics::{focal_statistics, FocalParams, FocalStatistic};

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEngine;

impl LocalEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RasterEngine for LocalEngine {
    fn load(&self, path: &Path) -> Result<Raster<f64>> {
        let raster: Raster<f64> = read_geotiff(path)?;
        Ok(raster.normalized_nulls())
    }

    fn save(&self, raster: &Raster<f64>, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_geotiff(raster, path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn focal_statistic(
        &self,
        raster: &Raster<f64>,
        neighborhood: Neighborhood,
        statistic: FocalStatistic,
    ) -> Result<Raster<f64>> {
        focal_statistics(
            raster,
            &FocalParams {
                neighborhood,
                statistic,
            },
        )
    }

    fn algebra(&self, inputs: &[&Raster<f64>], expr: &dyn Fn(&[f64]) -> f64) -> Result<Raster<f64>> {
        mosaic::algebra(inputs, expr)
    }

    fn mosaic(&self, rasters: &[&Raster<f64>], op: MosaicOp) -> Result<Raster<f64>> {
        mosaic::mosaic(rasters, op)
    }

    fn set_null_where(
        &self,
        raster: &Raster<f64>,
        predicate: &dyn Fn(f64) -> bool,
    ) -> Result<Raster<f64>> {
        Ok(mosaic::set_null_where(raster, predicate))
    }

    fn copy(&self, src: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dest)?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
