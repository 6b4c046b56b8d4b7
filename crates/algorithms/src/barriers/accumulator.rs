//! Running mosaic of per-pair barrier rasters

use linkmap_core::config::MosaicPolicy;
use linkmap_core::raster::Raster;
use linkmap_core::Result;

use super::benefit::non_negative;
use crate::engine::RasterEngine;
use crate::mosaic::MosaicOp;

/// Accumulates per-pair rasters for one radius.
///
/// Computing the next mosaic and committing it are separate steps so that a
/// failed step can be retried without corrupting the running state.
#[derive(Debug, Clone)]
pub struct MosaicAccumulator {
    policy: MosaicPolicy,
    current: Option<Raster<f64>>,
    count: usize,
}

impl MosaicAccumulator {
    pub fn new(policy: MosaicPolicy) -> Self {
        Self {
            policy,
            current: None,
            count: 0,
        }
    }

    /// Number of committed rasters
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn current(&self) -> Option<&Raster<f64>> {
        self.current.as_ref()
    }

    /// Mosaic that results from adding `raster`, without committing it.
    ///
    /// The first raster seeds the mosaic. Summing treats nulls as zero and
    /// ignores negative values; the maximum ignores nulls.
    pub fn next_mosaic<E: RasterEngine + ?Sized>(
        &self,
        engine: &E,
        raster: &Raster<f64>,
    ) -> Result<Raster<f64>> {
        match (&self.current, self.policy) {
            (None, MosaicPolicy::Sum) => {
                engine.algebra(&[raster], &|v: &[f64]| non_negative(v[0]))
            }
            (None, MosaicPolicy::Maximum) => Ok(raster.normalized_nulls()),
            (Some(last), MosaicPolicy::Sum) => engine.algebra(&[last, raster], &|v: &[f64]| {
                non_negative(v[0]) + non_negative(v[1])
            }),
            (Some(last), MosaicPolicy::Maximum) => {
                engine.mosaic(&[last, raster], MosaicOp::Maximum)
            }
        }
    }

    pub fn commit(&mut self, mosaic: Raster<f64>) {
        self.current = Some(mosaic);
        self.count += 1;
    }

    /// Compute and commit in one step
    pub fn accumulate<E: RasterEngine + ?Sized>(
        &mut self,
        engine: &E,
        raster: &Raster<f64>,
    ) -> Result<()> {
        let next = self.next_mosaic(engine, raster)?;
        self.commit(next);
        Ok(())
    }

    /// Take the finished mosaic, leaving the accumulator empty
    pub fn finish(&mut self) -> Option<Raster<f64>> {
        self.count = 0;
        self.current.take()
    }
}
