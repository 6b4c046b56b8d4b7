//! Project configuration
//!
//! A project is described by a TOML file with a `[project]` table and one
//! table per stage. Stage configs are built once per run, after any command
//! line overrides, and are immutable from then on.
//!
//! ```toml
//! [project]
//! project_dir = "/data/coyote"
//!
//! [barriers]
//! resistance_raster = "/data/coyote/resist.tif"
//! cwd_dir = "/data/coyote/cwd"
//! start_radius = 200
//! end_radius = 1000
//! radius_step = 200
//!
//! [centrality]
//! core_table = "/data/coyote/cores.csv"
//! core_field = "core_ID"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

const DATAPASS_DIR: &str = "datapass";
const OUTPUT_DIR: &str = "output";
const SCRATCH_DIR: &str = "scratch";
const BARRIER_DIR: &str = "barriers";
const CENTRALITY_DIR: &str = "centrality";

/// Contents of a project file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub project: ProjectSettings,
    #[serde(default)]
    pub barriers: Option<BarrierSettings>,
    #[serde(default)]
    pub centrality: CentralitySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSettings {
    pub project_dir: PathBuf,
    /// Prefix for user-facing outputs; defaults to the project directory name
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BarrierSettings {
    pub resistance_raster: PathBuf,
    /// Directory holding `cwd_<core>.tif` rasters from the CWD step
    pub cwd_dir: PathBuf,
    pub start_radius: u32,
    pub end_radius: u32,
    #[serde(default)]
    pub radius_step: u32,
    #[serde(default)]
    pub sum_barriers: bool,
    #[serde(default)]
    pub write_pct_rasters: bool,
    #[serde(default)]
    pub write_trim_rasters: bool,
    #[serde(default)]
    pub save_barrier_rasters: bool,
    #[serde(default)]
    pub save_focal_rasters: bool,
    #[serde(default = "default_true")]
    pub save_radius_rasters: bool,
    #[serde(default = "default_shard_capacity")]
    pub shard_capacity: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CentralitySettings {
    /// Core attribute table; derived from the link table when absent
    #[serde(default)]
    pub core_table: Option<PathBuf>,
    #[serde(default = "default_core_field")]
    pub core_field: String,
    /// Circuitscape executable; searched on `PATH` when absent
    #[serde(default)]
    pub solver_path: Option<PathBuf>,
}

impl Default for CentralitySettings {
    fn default() -> Self {
        Self {
            core_table: None,
            core_field: default_core_field(),
            solver_path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_shard_capacity() -> usize {
    100
}

fn default_max_attempts() -> usize {
    10
}

fn default_core_field() -> String {
    "core_ID".to_string()
}

impl ProjectConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn layout(&self) -> ProjectLayout {
        let dir = self.project.project_dir.clone();
        let prefix = self.project.prefix.clone().unwrap_or_else(|| {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "linkmap".to_string())
        });
        ProjectLayout {
            datapass_dir: dir.join(DATAPASS_DIR),
            output_dir: dir.join(OUTPUT_DIR),
            scratch_dir: dir.join(SCRATCH_DIR),
            project_dir: dir,
            prefix,
        }
    }

    pub fn barrier_config(&self) -> Result<BarrierConfig> {
        let settings = self
            .barriers
            .as_ref()
            .ok_or_else(|| Error::Config("missing [barriers] table".into()))?;
        BarrierConfig::new(self.layout(), settings)
    }

    pub fn centrality_config(&self) -> Result<CentralityConfig> {
        CentralityConfig::new(self.layout(), &self.centrality)
    }
}

/// Directory layout shared by every stage
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub project_dir: PathBuf,
    pub prefix: String,
    /// Working copies passed between steps
    pub datapass_dir: PathBuf,
    /// User-facing outputs
    pub output_dir: PathBuf,
    pub scratch_dir: PathBuf,
}

impl ProjectLayout {
    /// Working link table written by `step`
    pub fn link_table_path(&self, step: u32) -> PathBuf {
        self.datapass_dir.join(format!("linkTable_s{}.csv", step))
    }

    /// User-facing copy of the link table written by `step`
    pub fn final_link_table_path(&self, step: u32) -> PathBuf {
        self.output_dir
            .join(format!("{}_linkTable_s{}.csv", self.prefix, step))
    }

    /// Most recent link table written by a step before `step`
    pub fn previous_link_table(&self, step: u32) -> Result<PathBuf> {
        (1..step)
            .rev()
            .map(|s| self.link_table_path(s))
            .find(|p| p.exists())
            .ok_or_else(|| {
                Error::Config(format!(
                    "no link table from a step before step {} in {}. Please rerun the previous steps.",
                    step,
                    self.datapass_dir.display()
                ))
            })
    }
}

/// How per-pair barrier rasters are combined into the per-radius mosaic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MosaicPolicy {
    Sum,
    Maximum,
}

/// Settings for the barrier detection stage
#[derive(Debug, Clone)]
pub struct BarrierConfig {
    pub layout: ProjectLayout,
    pub resistance_raster: PathBuf,
    pub cwd_dir: PathBuf,
    pub start_radius: u32,
    pub end_radius: u32,
    pub radius_step: u32,
    pub policy: MosaicPolicy,
    pub write_pct_rasters: bool,
    pub write_trim_rasters: bool,
    pub save_barrier_rasters: bool,
    pub save_focal_rasters: bool,
    pub save_radius_rasters: bool,
    pub shard_capacity: usize,
    pub max_attempts: usize,
    /// Intermediate rasters (focal, per-pair, grown-out)
    pub base_dir: PathBuf,
    /// Final per-radius and summary rasters
    pub output_store: PathBuf,
}

impl BarrierConfig {
    pub fn new(layout: ProjectLayout, s: &BarrierSettings) -> Result<Self> {
        if s.start_radius == 0 {
            return Err(Error::InvalidParameter {
                name: "start_radius",
                value: s.start_radius.to_string(),
                reason: "must be positive".into(),
            });
        }
        // a zero step runs the start radius alone, whatever the end radius says
        let end_radius = if s.radius_step == 0 {
            s.start_radius
        } else {
            s.end_radius
        };
        if s.start_radius > end_radius {
            return Err(Error::InvalidParameter {
                name: "start_radius",
                value: s.start_radius.to_string(),
                reason: format!("must not exceed end_radius ({})", s.end_radius),
            });
        }
        if s.max_attempts == 0 {
            return Err(Error::InvalidParameter {
                name: "max_attempts",
                value: "0".into(),
                reason: "at least one attempt is required".into(),
            });
        }

        let policy = if s.sum_barriers {
            MosaicPolicy::Sum
        } else {
            MosaicPolicy::Maximum
        };
        let suffix = Self::suffix_for(policy);
        let base_dir = layout
            .project_dir
            .join(format!("{}{}", BARRIER_DIR, suffix));
        let output_store = layout.output_dir.join(format!("{}{}", BARRIER_DIR, suffix));

        Ok(Self {
            resistance_raster: s.resistance_raster.clone(),
            cwd_dir: s.cwd_dir.clone(),
            start_radius: s.start_radius,
            end_radius,
            radius_step: s.radius_step,
            policy,
            write_pct_rasters: s.write_pct_rasters,
            write_trim_rasters: s.write_trim_rasters,
            save_barrier_rasters: s.save_barrier_rasters,
            save_focal_rasters: s.save_focal_rasters,
            save_radius_rasters: s.save_radius_rasters,
            shard_capacity: s.shard_capacity,
            max_attempts: s.max_attempts,
            base_dir,
            output_store,
            layout,
        })
    }

    fn suffix_for(policy: MosaicPolicy) -> &'static str {
        match policy {
            MosaicPolicy::Sum => "_Sum",
            MosaicPolicy::Maximum => "",
        }
    }

    /// `_Sum` when summing across pairs, empty otherwise
    pub fn suffix(&self) -> &'static str {
        Self::suffix_for(self.policy)
    }

    /// Cost-weighted distance raster for one core
    pub fn cwd_path(&self, core: i64) -> PathBuf {
        self.cwd_dir.join(format!("cwd_{}.tif", core))
    }

    /// Radii to analyse, `start..=end` by `step`; a zero step runs `start` only
    pub fn radii(&self) -> Vec<u32> {
        radius_schedule(self.start_radius, self.end_radius, self.radius_step)
    }
}

/// Inclusive radius sequence; a zero step yields just `start`
pub fn radius_schedule(start: u32, end: u32, step: u32) -> Vec<u32> {
    if step == 0 {
        return vec![start];
    }
    (start..=end).step_by(step as usize).collect()
}

/// Settings for the network centrality stage
#[derive(Debug, Clone)]
pub struct CentralityConfig {
    pub layout: ProjectLayout,
    pub core_table: Option<PathBuf>,
    pub core_field: String,
    pub solver_path: Option<PathBuf>,
    /// Solver inputs, config and outputs
    pub base_dir: PathBuf,
    /// Final core table
    pub output_store: PathBuf,
}

impl CentralityConfig {
    pub fn new(layout: ProjectLayout, s: &CentralitySettings) -> Result<Self> {
        crate::cores::validate_core_field(&s.core_field)?;
        Ok(Self {
            core_table: s.core_table.clone(),
            core_field: s.core_field.clone(),
            solver_path: s.solver_path.clone(),
            base_dir: layout.project_dir.join(CENTRALITY_DIR),
            output_store: layout.output_dir.join(CENTRALITY_DIR),
            layout,
        })
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base_dir.join("config")
    }

    pub fn solver_output_dir(&self) -> PathBuf {
        self.base_dir.join("output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"
        [project]
        project_dir = "/data/coyote"

        [barriers]
        resistance_raster = "/data/coyote/resist.tif"
        cwd_dir = "/data/coyote/cwd"
        start_radius = 200
        end_radius = 1000
        radius_step = 200
        sum_barriers = true

        [centrality]
        core_field = "patch"
    "#;

    #[test]
    fn test_parse_project() {
        let config = ProjectConfig::from_toml(PROJECT).unwrap();
        let layout = config.layout();
        assert_eq!(layout.prefix, "coyote");
        assert_eq!(
            layout.final_link_table_path(6),
            PathBuf::from("/data/coyote/output/coyote_linkTable_s6.csv")
        );

        let barriers = config.barrier_config().unwrap();
        assert_eq!(barriers.policy, MosaicPolicy::Sum);
        assert_eq!(barriers.radii(), vec![200, 400, 600, 800, 1000]);
        assert_eq!(barriers.base_dir, PathBuf::from("/data/coyote/barriers_Sum"));
        assert_eq!(barriers.shard_capacity, 100);
        assert!(barriers.save_radius_rasters);

        let centrality = config.centrality_config().unwrap();
        assert_eq!(centrality.core_field, "patch");
        assert!(centrality.core_table.is_none());
    }

    #[test]
    fn test_radius_schedule() {
        assert_eq!(radius_schedule(100, 100, 0), vec![100]);
        assert_eq!(radius_schedule(100, 500, 0), vec![100]);
        assert_eq!(radius_schedule(100, 350, 100), vec![100, 200, 300]);
    }

    #[test]
    fn test_rejects_inverted_radii() {
        let mut config = ProjectConfig::from_toml(PROJECT).unwrap();
        if let Some(b) = config.barriers.as_mut() {
            b.start_radius = 2000;
        }
        assert!(matches!(
            config.barrier_config(),
            Err(Error::InvalidParameter { name: "start_radius", .. })
        ));
    }

    #[test]
    fn test_zero_step_ignores_end_radius() {
        let mut config = ProjectConfig::from_toml(PROJECT).unwrap();
        if let Some(b) = config.barriers.as_mut() {
            b.start_radius = 2000;
            b.radius_step = 0;
        }
        let barriers = config.barrier_config().unwrap();
        assert_eq!(barriers.end_radius, 2000);
        assert_eq!(barriers.radii(), vec![2000]);
    }

    #[test]
    fn test_reserved_core_field() {
        let text = PROJECT.replace("\"patch\"", "\"FID\"");
        let config = ProjectConfig::from_toml(&text).unwrap();
        assert!(matches!(
            config.centrality_config(),
            Err(Error::ReservedFieldName(_))
        ));
    }

    #[test]
    fn test_centrality_defaults() {
        let config = ProjectConfig::from_toml("[project]\nproject_dir = \"/p\"\n").unwrap();
        let centrality = config.centrality_config().unwrap();
        assert_eq!(centrality.core_field, "core_ID");
        assert_eq!(centrality.solver_output_dir(), PathBuf::from("/p/centrality/output"));
        assert!(matches!(config.barrier_config(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let text = "[project]\nproject_dir = \"/p\"\nbogus = 1\n";
        assert!(matches!(ProjectConfig::from_toml(text), Err(Error::Config(_))));
    }

    #[test]
    fn test_previous_link_table() {
        let dir = tempfile::tempdir().unwrap();
        let text = format!("[project]\nproject_dir = {:?}\n", dir.path().to_str().unwrap());
        let layout = ProjectConfig::from_toml(&text).unwrap().layout();
        fs::create_dir_all(&layout.datapass_dir).unwrap();
        assert!(layout.previous_link_table(7).is_err());

        fs::write(layout.link_table_path(4), "").unwrap();
        fs::write(layout.link_table_path(5), "").unwrap();
        assert_eq!(layout.previous_link_table(7).unwrap(), layout.link_table_path(5));
        assert_eq!(layout.previous_link_table(5).unwrap(), layout.link_table_path(4));
    }
}
