//! Circuitscape run configuration

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use linkmap_core::Result;

/// Settings for a pairwise network-mode Circuitscape run.
///
/// The point file is the graph itself, so every pair of nodes is solved.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitscapeConfig {
    pub habitat_file: PathBuf,
    pub point_file: PathBuf,
    /// Output prefix; result files are named after its stem
    pub output_file: PathBuf,
}

impl CircuitscapeConfig {
    /// Pairwise run over the graph at `graph_file`
    pub fn network(graph_file: impl Into<PathBuf>, output_file: impl Into<PathBuf>) -> Self {
        let graph_file = graph_file.into();
        Self {
            point_file: graph_file.clone(),
            habitat_file: graph_file,
            output_file: output_file.into(),
        }
    }

    /// INI text understood by Circuitscape
    pub fn to_ini(&self) -> String {
        let sections: [(&str, Vec<(&str, String)>); 6] = [
            ("Circuitscape mode", vec![
                ("data_type", "network".into()),
                ("scenario", "pairwise".into()),
            ]),
            ("Habitat raster or graph", vec![
                ("habitat_file", self.habitat_file.display().to_string()),
                ("habitat_map_is_resistances", "True".into()),
            ]),
            ("Options for pairwise and one-to-all and all-to-one modes", vec![
                ("point_file", self.point_file.display().to_string()),
                ("use_included_pairs", "False".into()),
            ]),
            ("Calculation options", vec![
                ("solver", "cg+amg".into()),
                ("low_memory_mode", "False".into()),
            ]),
            ("Output options", vec![
                ("output_file", self.output_file.display().to_string()),
                ("write_cur_maps", "True".into()),
                ("write_cum_cur_map_only", "True".into()),
            ]),
            ("Options for advanced mode", vec![
                ("ground_file_is_resistances", "True".into()),
            ]),
        ];

        let mut out = String::new();
        for (name, entries) in sections {
            let _ = writeln!(out, "[{}]", name);
            for (key, value) in entries {
                let _ = writeln!(out, "{} = {}", key, value);
            }
            out.push('\n');
        }
        out
    }

    pub fn write_config(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_ini())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_config() {
        let config = CircuitscapeConfig::network("/c/graph.txt", "/c/output/net.out");
        assert_eq!(config.point_file, config.habitat_file);

        let ini = config.to_ini();
        assert!(ini.contains("[Circuitscape mode]\ndata_type = network\nscenario = pairwise\n"));
        assert!(ini.contains("habitat_file = /c/graph.txt"));
        assert!(ini.contains("point_file = /c/graph.txt"));
        assert!(ini.contains("output_file = /c/output/net.out"));
    }

    #[test]
    fn test_write_config_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("net.ini");
        CircuitscapeConfig::network("g.txt", "o.out")
            .write_config(&path)
            .unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("[Circuitscape mode]"));
    }
}
