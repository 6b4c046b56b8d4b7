//! Restoration benefit rasters
//!
//! For a corridor between two cores with least-cost distance `lcd`, the
//! benefit of restoring a circle of radius `r` centered on a cell is the drop
//! in cost distance per unit of restored diameter:
//!
//! ```text
//! benefit = (lcd - focal1 - focal2 - 2r) / 2r
//! ```
//!
//! where `focal1` and `focal2` are the minimum CWD values of each core on the
//! annulus of radius `r` around the cell.

use linkmap_core::config::MosaicPolicy;
use linkmap_core::raster::{Neighborhood, Raster};
use linkmap_core::Result;

use crate::engine::RasterEngine;
use crate::mosaic::MosaicOp;
use crate::statistics::FocalStatistic;

/// Value written for null resistance cells in the filled resistance raster
pub const RESISTANCE_FILL_VALUE: f64 = 1_000_000_000.0;

/// Benefit of restoring a circle of `radius` for one cell
#[inline]
pub fn benefit_value(lcd: f64, focal1: f64, focal2: f64, radius: f64) -> f64 {
    let diameter = 2.0 * radius;
    (lcd - focal1 - focal2 - diameter) / diameter
}

/// Null counts as zero and negative values clamp to zero
#[inline]
pub(crate) fn non_negative(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.max(0.0) }
}

/// Neighborhood on which each core's CWD minimum is sampled
pub fn search_annulus(radius: u32) -> Neighborhood {
    let outer = radius as f64;
    Neighborhood::annulus(outer - 1.0, outer)
}

/// Neighborhood used to grow a center value out to its whole search circle
pub fn search_circle(radius: u32) -> Neighborhood {
    Neighborhood::circle(radius as f64)
}

/// Minimum CWD on the search annulus around every cell
pub fn focal_minimum<E: RasterEngine + ?Sized>(
    engine: &E,
    cwd: &Raster<f64>,
    radius: u32,
) -> Result<Raster<f64>> {
    engine.focal_statistic(cwd, search_annulus(radius), FocalStatistic::Min)
}

/// Benefit raster for one core pair.
///
/// Under [`MosaicPolicy::Sum`] nulls become 0 and negative benefits are
/// clamped to 0; under [`MosaicPolicy::Maximum`] the value is signed and
/// nulls are kept.
pub fn benefit_raster<E: RasterEngine + ?Sized>(
    engine: &E,
    lcd: f64,
    focal1: &Raster<f64>,
    focal2: &Raster<f64>,
    radius: u32,
    policy: MosaicPolicy,
) -> Result<Raster<f64>> {
    let r = radius as f64;
    engine.algebra(&[focal1, focal2], &|v: &[f64]| {
        let b = benefit_value(lcd, v[0], v[1], r);
        match policy {
            MosaicPolicy::Sum => non_negative(b),
            MosaicPolicy::Maximum => b,
        }
    })
}

/// Benefit as a percentage of the corridor's least-cost distance
pub fn percent_raster<E: RasterEngine + ?Sized>(
    engine: &E,
    benefit: &Raster<f64>,
    lcd: f64,
    policy: MosaicPolicy,
) -> Result<Raster<f64>> {
    engine.algebra(&[benefit], &|v: &[f64]| {
        let pct = 100.0 * v[0] / lcd;
        match policy {
            MosaicPolicy::Sum => non_negative(pct),
            MosaicPolicy::Maximum => pct,
        }
    })
}

/// Resistance minus one, with null cells set to [`RESISTANCE_FILL_VALUE`].
///
/// Taking the minimum with this raster caps each cell's restoration gain at
/// what restoring that single cell could contribute.
pub fn resistance_fill<E: RasterEngine + ?Sized>(
    engine: &E,
    resistance: &Raster<f64>,
) -> Result<Raster<f64>> {
    engine.algebra(&[resistance], &|v: &[f64]| {
        if v[0].is_nan() {
            RESISTANCE_FILL_VALUE
        } else {
            v[0] - 1.0
        }
    })
}

/// Cellwise minimum of a grown-out raster and the filled resistance,
/// ignoring nulls
pub fn trim_raster<E: RasterEngine + ?Sized>(
    engine: &E,
    fill: &Raster<f64>,
    resist_fill: &Raster<f64>,
) -> Result<Raster<f64>> {
    engine.mosaic(&[fill, resist_fill], MosaicOp::Minimum)
}

/// Like [`trim_raster`], but null wherever `fill` is null
pub fn clipped_trim_raster<E: RasterEngine + ?Sized>(
    engine: &E,
    fill: &Raster<f64>,
    resist_fill: &Raster<f64>,
) -> Result<Raster<f64>> {
    engine.algebra(&[fill, resist_fill], &|v: &[f64]| {
        if v[0].is_nan() {
            f64::NAN
        } else if v[1].is_nan() {
            v[0]
        } else {
            v[0].min(v[1])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;

    fn raster(values: &[f64]) -> Raster<f64> {
        Raster::from_vec(values.to_vec(), 1, values.len()).unwrap()
    }

    #[test]
    fn test_benefit_value() {
        assert!((benefit_value(100.0, 20.0, 10.0, 25.0) - 0.4).abs() < 1e-12);
        assert!(benefit_value(40.0, 20.0, 10.0, 25.0) < 0.0);
    }

    #[test]
    fn test_benefit_raster_sum_policy() {
        let engine = LocalEngine::new();
        let f1 = raster(&[20.0, 60.0, f64::NAN]);
        let f2 = raster(&[10.0, 10.0, 10.0]);
        let b = benefit_raster(&engine, 100.0, &f1, &f2, 25, MosaicPolicy::Sum).unwrap();
        assert!((b.get(0, 0).unwrap() - 0.4).abs() < 1e-12);
        // negative clamps, null becomes zero
        assert_eq!(b.get(0, 1).unwrap(), 0.0);
        assert_eq!(b.get(0, 2).unwrap(), 0.0);
    }

    #[test]
    fn test_benefit_raster_max_policy() {
        let engine = LocalEngine::new();
        let f1 = raster(&[20.0, 60.0, f64::NAN]);
        let f2 = raster(&[10.0, 10.0, 10.0]);
        let b = benefit_raster(&engine, 100.0, &f1, &f2, 25, MosaicPolicy::Maximum).unwrap();
        assert!((b.get(0, 1).unwrap() - (-0.4)).abs() < 1e-12);
        assert!(b.get(0, 2).unwrap().is_nan());
    }

    #[test]
    fn test_percent_raster() {
        let engine = LocalEngine::new();
        let b = raster(&[0.4, -0.2, f64::NAN]);
        let max = percent_raster(&engine, &b, 100.0, MosaicPolicy::Maximum).unwrap();
        assert!((max.get(0, 0).unwrap() - 0.4).abs() < 1e-12);
        assert!((max.get(0, 1).unwrap() + 0.2).abs() < 1e-12);
        assert!(max.get(0, 2).unwrap().is_nan());

        let sum = percent_raster(&engine, &b, 100.0, MosaicPolicy::Sum).unwrap();
        assert_eq!(sum.get(0, 1).unwrap(), 0.0);
        assert_eq!(sum.get(0, 2).unwrap(), 0.0);
    }

    #[test]
    fn test_trim() {
        let engine = LocalEngine::new();
        let resistance = raster(&[5.0, f64::NAN, 1.0]);
        let fill = resistance_fill(&engine, &resistance).unwrap();
        assert_eq!(fill.get(0, 0).unwrap(), 4.0);
        assert_eq!(fill.get(0, 1).unwrap(), RESISTANCE_FILL_VALUE);

        let grown = raster(&[2.0, 3.0, f64::NAN]);
        let trimmed = trim_raster(&engine, &grown, &fill).unwrap();
        assert_eq!(trimmed.get(0, 0).unwrap(), 2.0);
        assert_eq!(trimmed.get(0, 1).unwrap(), 3.0);
        assert_eq!(trimmed.get(0, 2).unwrap(), 0.0);

        let clipped = clipped_trim_raster(&engine, &grown, &fill).unwrap();
        assert_eq!(clipped.get(0, 0).unwrap(), 2.0);
        assert!(clipped.get(0, 2).unwrap().is_nan());
    }
}
