//! Focal (moving window) statistics
//!
//! Computes a statistic over a map-unit neighborhood centered on each cell.
//! Null cells are skipped; a cell whose whole neighborhood is null stays null.

use ndarray::Array2;
use crate::maybe_rayon::*;
use linkmap_core::raster::{Neighborhood, Raster};
use linkmap_core::{Algorithm, Error, Result};

/// Available focal statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocalStatistic {
    Min,
    Max,
}

/// Parameters for focal statistics
#[derive(Debug, Clone)]
pub struct FocalParams {
    pub neighborhood: Neighborhood,
    pub statistic: FocalStatistic,
}

impl Default for FocalParams {
    fn default() -> Self {
        Self {
            neighborhood: Neighborhood::circle(1.0),
            statistic: FocalStatistic::Min,
        }
    }
}

/// Focal statistics algorithm
#[derive(Debug, Clone, Default)]
pub struct FocalStatistics;

impl Algorithm for FocalStatistics {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = FocalParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "FocalStatistics"
    }

    fn description(&self) -> &'static str {
        "Minimum or maximum over a circle or annulus, ignoring nulls"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        focal_statistics(&input, &params)
    }
}

/// Compute a focal statistic over `params.neighborhood`.
///
/// The neighborhood is resolved against the raster's cell size; it must
/// reach at least one cell.
pub fn focal_statistics(raster: &Raster<f64>, params: &FocalParams) -> Result<Raster<f64>> {
    let cell_size = raster.cell_size();
    if !(cell_size > 0.0) {
        return Err(Error::Algorithm("Raster cell size must be positive".into()));
    }
    let offsets = params.neighborhood.offsets(cell_size);
    if offsets.is_empty() {
        return Err(Error::InvalidParameter {
            name: "neighborhood",
            value: format!("{:?}", params.neighborhood),
            reason: format!("covers no cells at cell size {}", cell_size),
        });
    }

    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let mut acc: Option<f64> = None;

                for &(dr, dc) in &offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                        continue;
                    }
                    // bounds checked above
                    let v = unsafe { raster.get_unchecked(nr as usize, nc as usize) };
                    if linkmap_core::RasterElement::is_null(&v, nodata) {
                        continue;
                    }
                    acc = Some(match (acc, params.statistic) {
                        (None, _) => v,
                        (Some(a), FocalStatistic::Min) => a.min(v),
                        (Some(a), FocalStatistic::Max) => a.max(v),
                    });
                }

                if let Some(v) = acc {
                    *out = v;
                }
            }

            row_data
        })
        .collect();

    let mut output = Raster::null_like(raster);
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
