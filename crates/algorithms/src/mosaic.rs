//! Cellwise raster algebra and mosaicking
//!
//! All inputs must share one grid. Nulls are passed to algebra expressions as
//! NaN, and an expression returning NaN produces a null cell.

use ndarray::Array2;
use linkmap_core::raster::Raster;
use linkmap_core::{Error, Result};

/// How overlapping cells are resolved when mosaicking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MosaicOp {
    /// Highest non-null value
    Maximum,
    /// Lowest non-null value
    Minimum,
    /// Sum of non-null values
    Sum,
}

impl MosaicOp {
    fn fold(self, acc: f64, v: f64) -> f64 {
        match self {
            MosaicOp::Maximum => acc.max(v),
            MosaicOp::Minimum => acc.min(v),
            MosaicOp::Sum => acc + v,
        }
    }
}

/// Apply `expr` to the cell values of every input at each position
pub fn algebra<F>(inputs: &[&Raster<f64>], expr: F) -> Result<Raster<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let first = inputs
        .first()
        .ok_or_else(|| Error::Algorithm("raster algebra needs at least one input".into()))?;
    for other in &inputs[1..] {
        first.ensure_same_shape(*other)?;
    }

    let (rows, cols) = first.shape();
    let mut cell = vec![0.0; inputs.len()];
    let mut out = Array2::from_elem((rows, cols), f64::NAN);
    for ((row, col), slot) in out.indexed_iter_mut() {
        for (value, raster) in cell.iter_mut().zip(inputs) {
            let v = raster.data()[(row, col)];
            *value = if raster.is_null(v) { f64::NAN } else { v };
        }
        *slot = expr(&cell);
    }

    let mut result = Raster::null_like(*first);
    *result.data_mut() = out;
    Ok(result)
}

/// Combine rasters cell by cell with `op`, ignoring nulls.
///
/// A cell that is null in every input stays null.
pub fn mosaic(rasters: &[&Raster<f64>], op: MosaicOp) -> Result<Raster<f64>> {
    algebra(rasters, |values| {
        values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc: Option<f64>, &v| Some(acc.map_or(v, |a| op.fold(a, v))))
            .unwrap_or(f64::NAN)
    })
}

/// Null every cell for which `predicate` holds; existing nulls stay null
pub fn set_null_where<P>(raster: &Raster<f64>, predicate: P) -> Raster<f64>
where
    P: Fn(f64) -> bool,
{
    let mut out = raster.normalized_nulls();
    out.data_mut().mapv_inplace(|v| if !v.is_nan() && predicate(v) { f64::NAN } else { v });
    out
}
