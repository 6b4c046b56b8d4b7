//! Barrier detection stage
//!
//! For every search radius, each active corridor contributes one benefit
//! raster per unordered core pair. Those are mosaicked into per-radius
//! outputs and, when several radii are run, fused across radii by maximum.

use std::fs;
use std::path::{Path, PathBuf};

use linkmap_core::config::{BarrierConfig, MosaicPolicy};
use linkmap_core::linktable::{LinkRow, LinkTable, ProcessedPairs};
use linkmap_core::raster::Raster;
use linkmap_core::shard::{ShardCursor, ShardedNamer};
use linkmap_core::{Error, Result};
use tracing::{debug, info};

use super::accumulator::MosaicAccumulator;
use super::benefit::{
    benefit_raster, clipped_trim_raster, focal_minimum, percent_raster, resistance_fill,
    search_circle, trim_raster,
};
use crate::engine::{with_retry, RasterEngine, ScratchRotation};
use crate::mosaic::MosaicOp;
use crate::statistics::FocalStatistic;

const STEP: u32 = 6;

/// Kinds of raster written per radius
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutput {
    Centers,
    Circles,
    CentersPct,
    CirclesPct,
    /// Grown-out circles capped by per-cell resistance
    Trimmed,
}

impl BarrierOutput {
    fn label(self) -> &'static str {
        match self {
            BarrierOutput::Centers => "BarrierCenters",
            BarrierOutput::Circles => "BarrierCircles",
            BarrierOutput::CentersPct => "BarrierCenters_Pct",
            BarrierOutput::CirclesPct => "BarrierCircles_Pct",
            BarrierOutput::Trimmed => "BarrierCircles_RBMin",
        }
    }
}

/// Output raster paths
#[derive(Debug, Clone)]
pub struct OutputNames {
    dir: PathBuf,
    prefix: String,
    suffix: &'static str,
}

impl OutputNames {
    pub fn new(config: &BarrierConfig) -> Self {
        Self {
            dir: config.output_store.clone(),
            prefix: config.layout.prefix.clone(),
            suffix: config.suffix(),
        }
    }

    /// `<prefix>_<kind><sfx>_Rad<r>.tif`
    pub fn radius_path(&self, kind: BarrierOutput, radius: u32) -> PathBuf {
        self.dir.join(format!(
            "{}_{}{}_Rad{}.tif",
            self.prefix,
            kind.label(),
            self.suffix,
            radius
        ))
    }

    /// `<prefix>_<kind><sfx>_Rad<start>To<end>Step<step>.tif`
    pub fn summary_path(&self, kind: BarrierOutput, start: u32, end: u32, step: u32) -> PathBuf {
        self.dir.join(format!(
            "{}_{}{}_Rad{}To{}Step{}.tif",
            self.prefix,
            kind.label(),
            self.suffix,
            start,
            end,
            step
        ))
    }
}

/// What a barrier run produced
#[derive(Debug, Clone, Default)]
pub struct BarrierReport {
    /// Radius and number of core pairs mosaicked at it
    pub radii: Vec<(u32, usize)>,
    /// Rasters left in the output store
    pub outputs: Vec<PathBuf>,
    pub link_table: PathBuf,
}

struct PairRasters {
    benefit: Raster<f64>,
    pct: Option<Raster<f64>>,
    trim: Option<Raster<f64>>,
    /// Per-pair rasters written to the attempt's scratch directory
    saved: Vec<PathBuf>,
}

/// Accumulators for one radius
struct RadiusMosaics {
    main: MosaicAccumulator,
    pct: Option<MosaicAccumulator>,
    trim: Option<MosaicAccumulator>,
}

impl RadiusMosaics {
    fn new(config: &BarrierConfig) -> Self {
        let policy = config.policy;
        Self {
            main: MosaicAccumulator::new(policy),
            pct: config
                .write_pct_rasters
                .then(|| MosaicAccumulator::new(policy)),
            trim: (policy == MosaicPolicy::Sum && config.write_trim_rasters)
                .then(|| MosaicAccumulator::new(policy)),
        }
    }
}

type NextMosaics = (Raster<f64>, Option<Raster<f64>>, Option<Raster<f64>>);

/// Run barrier detection on the link table of the previous step.
///
/// Fails with [`Error::NoLinkages`] before touching any raster when the
/// table holds no active corridor.
pub fn run_barriers<E: RasterEngine + ?Sized>(
    config: &BarrierConfig,
    engine: &E,
) -> Result<BarrierReport> {
    let source = config.layout.previous_link_table(STEP)?;
    let table = LinkTable::load(&source)?;
    let corridors = table.require_corridors()?;
    info!(
        "Mapping barriers for {} corridor links from {}",
        corridors,
        source.display()
    );

    let resistance = engine.load(&config.resistance_raster)?;
    let cell_size = resistance.cell_size();
    if (config.start_radius as f64) < cell_size {
        return Err(Error::InvalidParameter {
            name: "start_radius",
            value: config.start_radius.to_string(),
            reason: format!(
                "must be at least the resistance raster cell size ({})",
                cell_size
            ),
        });
    }

    check_cwd_inputs(engine, config, &table)?;

    let scratch = config
        .layout
        .scratch_dir
        .join(format!("barriers{}", config.suffix()));
    reset_dir(&config.base_dir)?;
    reset_dir(&config.output_store)?;
    reset_dir(&scratch)?;

    let resist_fill = if config.write_trim_rasters {
        Some(resistance_fill(engine, &resistance)?)
    } else {
        None
    };
    drop(resistance);

    let names = OutputNames::new(config);
    let radii = config.radii();
    let mut report = BarrierReport::default();
    let mut kinds = Vec::new();
    let mut processed = ProcessedPairs::new();
    let mut cursor = ShardCursor::new(ShardedNamer::new(
        &config.base_dir,
        "bar",
        config.shard_capacity,
    ));

    for &radius in &radii {
        info!(
            "Mapping barriers at a radius of {} map units using the {} method",
            radius,
            match config.policy {
                MosaicPolicy::Sum => "sum",
                MosaicPolicy::Maximum => "maximum",
            }
        );
        let mut mosaics = RadiusMosaics::new(config);
        let mut rotation = ScratchRotation::new(&scratch, format!("mos{}", radius));
        let mut pair_rotation = ScratchRotation::new(&scratch, format!("bar{}", radius));
        let focal_namer = ShardedNamer::new(
            config.base_dir.join("focal"),
            format!("focal{}_", radius),
            config.shard_capacity,
        );

        for row in table.rows().iter().filter(|r| r.is_active_corridor()) {
            let pair = row.pair();
            if processed.contains(pair) {
                debug!("Link {}: cores {} already mapped", row.link_id, pair);
                continue;
            }

            let rasters = with_retry(
                config.max_attempts,
                |dir| pair_rasters(engine, config, &focal_namer, resist_fill.as_ref(), row, radius, dir),
                |attempt| pair_rotation.prepare(attempt),
            )?;
            if !rasters.saved.is_empty() {
                let dest = cursor.current_dir();
                for path in &rasters.saved {
                    if let Some(name) = path.file_name() {
                        engine.copy(path, &dest.join(name))?;
                    }
                }
                cursor.advance();
            }

            let (main, pct, trim) = with_retry(
                config.max_attempts,
                |dir| next_mosaics(engine, &mosaics, &rasters, dir),
                |attempt| rotation.prepare(attempt),
            )?;
            mosaics.main.commit(main);
            if let (Some(acc), Some(next)) = (mosaics.pct.as_mut(), pct) {
                acc.commit(next);
            }
            if let (Some(acc), Some(next)) = (mosaics.trim.as_mut(), trim) {
                acc.commit(next);
            }

            processed.insert(pair);
            debug!("Link {}: mapped cores {} at radius {}", row.link_id, pair, radius);
        }

        let pairs = processed.len();
        processed.clear();
        rotation.discard()?;
        pair_rotation.discard()?;

        let produced = finish_radius(engine, config, &names, radius, mosaics, resist_fill.as_ref())?;
        if kinds.is_empty() {
            kinds = produced;
        }
        report.radii.push((radius, pairs));
        info!("Radius {} done: {} core pairs mosaicked", radius, pairs);
    }

    if radii.len() > 1 {
        info!("Creating summary rasters across {} radii", radii.len());
        for &kind in &kinds {
            let path = names.summary_path(kind, config.start_radius, config.end_radius, config.radius_step);
            fuse_radii(engine, &names, kind, &radii, &path)?;
            report.outputs.push(path);
        }
    }

    let keep_radius_rasters = config.save_radius_rasters || radii.len() == 1;
    for &radius in &radii {
        for &kind in &kinds {
            let path = names.radius_path(kind, radius);
            if keep_radius_rasters {
                report.outputs.push(path);
            } else {
                engine.remove(&path)?;
            }
        }
    }

    if !config.save_focal_rasters {
        remove_dir(&config.base_dir.join("focal"))?;
    }
    remove_dir(&scratch)?;

    let working = config.layout.link_table_path(STEP);
    table.save(&working)?;
    table.save(config.layout.final_link_table_path(STEP))?;
    report.link_table = working;

    info!("Barrier detection wrote {} rasters", report.outputs.len());
    Ok(report)
}

/// Benefit, percent and trim rasters for one core pair
fn pair_rasters<E: RasterEngine + ?Sized>(
    engine: &E,
    config: &BarrierConfig,
    focal_namer: &ShardedNamer,
    resist_fill: Option<&Raster<f64>>,
    row: &LinkRow,
    radius: u32,
    dir: &Path,
) -> Result<PairRasters> {
    let pair = row.pair();
    let lcd = row.cost_weighted_distance;
    let focal1 = focal_raster(engine, config, focal_namer, pair.low(), radius)?;
    let focal2 = focal_raster(engine, config, focal_namer, pair.high(), radius)?;

    let benefit = benefit_raster(engine, lcd, &focal1, &focal2, radius, config.policy)?;
    let pct = if config.write_pct_rasters {
        Some(percent_raster(engine, &benefit, lcd, config.policy)?)
    } else {
        None
    };

    let mut fill = None;
    let mut trim = None;
    if config.policy == MosaicPolicy::Sum
        && let Some(resist_fill) = resist_fill
    {
        let grown = engine.focal_statistic(&benefit, search_circle(radius), FocalStatistic::Max)?;
        trim = Some(trim_raster(engine, &grown, resist_fill)?);
        fill = Some(grown);
    }

    let mut saved = Vec::new();
    if config.save_barrier_rasters {
        let stem = format!("b{}_{}_{}", radius, pair.low(), pair.high());
        let outputs = [
            (Some(&benefit), ""),
            (pct.as_ref(), "_pct"),
            (fill.as_ref(), "_fill"),
            (trim.as_ref(), "_trim"),
        ];
        for (raster, tag) in outputs {
            if let Some(raster) = raster {
                let path = dir.join(format!("{}{}.tif", stem, tag));
                engine.save(raster, &path)?;
                saved.push(path);
            }
        }
    }

    Ok(PairRasters {
        benefit,
        pct,
        trim,
        saved,
    })
}

/// Fail before any output is touched when a corridor core has no CWD raster
fn check_cwd_inputs<E: RasterEngine + ?Sized>(
    engine: &E,
    config: &BarrierConfig,
    table: &LinkTable,
) -> Result<()> {
    let mut cores: Vec<i64> = table
        .rows()
        .iter()
        .filter(|r| r.is_active_corridor())
        .flat_map(|r| [r.core1, r.core2])
        .collect();
    cores.sort_unstable();
    cores.dedup();

    for core in cores {
        if !engine.exists(&config.cwd_path(core)) {
            return Err(missing_cwd(config, core));
        }
    }
    Ok(())
}

fn missing_cwd(config: &BarrierConfig, core: i64) -> Error {
    Error::InvalidParameter {
        name: "cwd_dir",
        value: config.cwd_dir.display().to_string(),
        reason: format!("no cost-weighted distance raster for core {}", core),
    }
}

/// Minimum CWD on the search annulus, computed once per core and radius
fn focal_raster<E: RasterEngine + ?Sized>(
    engine: &E,
    config: &BarrierConfig,
    namer: &ShardedNamer,
    core: i64,
    radius: u32,
) -> Result<Raster<f64>> {
    let path = namer
        .dir_for(core.unsigned_abs())
        .join(format!("core{}.tif", core));
    if engine.exists(&path) {
        return engine.load(&path);
    }

    let cwd_path = config.cwd_path(core);
    if !engine.exists(&cwd_path) {
        return Err(missing_cwd(config, core));
    }
    let cwd = engine.load(&cwd_path)?;
    let focal = focal_minimum(engine, &cwd, radius)?;
    engine.save(&focal, &path)?;
    Ok(focal)
}

/// Next state of every running mosaic, persisted to `dir`
fn next_mosaics<E: RasterEngine + ?Sized>(
    engine: &E,
    mosaics: &RadiusMosaics,
    rasters: &PairRasters,
    dir: &Path,
) -> Result<NextMosaics> {
    let main = mosaics.main.next_mosaic(engine, &rasters.benefit)?;
    engine.save(&main, &dir.join("mos_temp.tif"))?;

    let pct = match (&mosaics.pct, &rasters.pct) {
        (Some(acc), Some(raster)) => {
            let next = acc.next_mosaic(engine, raster)?;
            engine.save(&next, &dir.join("mos_temp_pct.tif"))?;
            Some(next)
        }
        _ => None,
    };

    let trim = match (&mosaics.trim, &rasters.trim) {
        (Some(acc), Some(raster)) => {
            let next = acc.next_mosaic(engine, raster)?;
            engine.save(&next, &dir.join("mos_temp_trm.tif"))?;
            Some(next)
        }
        _ => None,
    };

    Ok((main, pct, trim))
}

/// Write the per-radius outputs and return the kinds written
fn finish_radius<E: RasterEngine + ?Sized>(
    engine: &E,
    config: &BarrierConfig,
    names: &OutputNames,
    radius: u32,
    mut mosaics: RadiusMosaics,
    resist_fill: Option<&Raster<f64>>,
) -> Result<Vec<BarrierOutput>> {
    let mosaic = mosaics
        .main
        .finish()
        .ok_or_else(|| Error::Algorithm(format!("no barrier rasters at radius {}", radius)))?;
    let circle = search_circle(radius);
    let mut kinds = Vec::new();

    let centers = engine.set_null_where(&mosaic, &|v| v < 0.0)?;
    engine.save(&centers, &names.radius_path(BarrierOutput::Centers, radius))?;
    kinds.push(BarrierOutput::Centers);

    // grow each center value out to its search circle for display
    let circles = engine.focal_statistic(&centers, circle, FocalStatistic::Max)?;
    engine.save(&circles, &names.radius_path(BarrierOutput::Circles, radius))?;
    kinds.push(BarrierOutput::Circles);

    if let Some(pct) = mosaics.pct.as_mut().and_then(|acc| acc.finish()) {
        let centers_pct = engine.set_null_where(&pct, &|v| v < 0.0)?;
        engine.save(&centers_pct, &names.radius_path(BarrierOutput::CentersPct, radius))?;
        let circles_pct = engine.focal_statistic(&centers_pct, circle, FocalStatistic::Max)?;
        engine.save(&circles_pct, &names.radius_path(BarrierOutput::CirclesPct, radius))?;
        kinds.push(BarrierOutput::CentersPct);
        kinds.push(BarrierOutput::CirclesPct);
    }

    let trimmed = match config.policy {
        MosaicPolicy::Sum => mosaics.trim.as_mut().and_then(|acc| acc.finish()),
        MosaicPolicy::Maximum => match resist_fill {
            Some(resist_fill) => Some(clipped_trim_raster(engine, &circles, resist_fill)?),
            None => None,
        },
    };
    if let Some(trimmed) = trimmed {
        engine.save(&trimmed, &names.radius_path(BarrierOutput::Trimmed, radius))?;
        kinds.push(BarrierOutput::Trimmed);
    }

    Ok(kinds)
}

/// Maximum of one output kind across every radius
fn fuse_radii<E: RasterEngine + ?Sized>(
    engine: &E,
    names: &OutputNames,
    kind: BarrierOutput,
    radii: &[u32],
    dest: &Path,
) -> Result<()> {
    let mut fused: Option<Raster<f64>> = None;
    for &radius in radii {
        let raster = engine.load(&names.radius_path(kind, radius))?;
        fused = Some(match fused {
            None => raster,
            Some(acc) => engine.mosaic(&[&acc, &raster], MosaicOp::Maximum)?,
        });
    }
    match fused {
        Some(raster) => engine.save(&raster, dest),
        None => Ok(()),
    }
}

fn reset_dir(dir: &Path) -> Result<()> {
    remove_dir(dir)?;
    fs::create_dir_all(dir)?;
    Ok(())
}

fn remove_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}
