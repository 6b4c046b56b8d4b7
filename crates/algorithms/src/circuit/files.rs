//! Solver input and output files
//!
//! Graphs go to the solver as one `node node weight` triple per line. The
//! solver answers with cumulative branch currents (`node node current`) and
//! node currents (`node current`), either whitespace or comma delimited.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use linkmap_core::{Error, Result};

use crate::network::Graph;

/// One edge per non-zero upper-triangular weight, keyed by core id
pub fn serialize_graph(graph: &Graph) -> Vec<(i64, i64, f64)> {
    let n = graph.node_count();
    let mut edges = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let w = graph.weights[(i, j)];
            if w != 0.0 {
                edges.push((graph.node_names[i], graph.node_names[j], w));
            }
        }
    }
    edges
}

pub fn write_graph(path: &Path, edges: &[(i64, i64, f64)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = String::with_capacity(32 * edges.len());
    for (a, b, w) in edges {
        let _ = writeln!(out, "{} {} {}", a, b, w);
    }
    fs::write(path, out)?;
    Ok(())
}

/// Currents reported by one solver run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverResults {
    /// `(core1, core2, current)` per branch
    pub edges: Vec<(i64, i64, f64)>,
    /// `(core, current)` per node
    pub nodes: Vec<(i64, f64)>,
}

/// Cumulative branch currents written for `output_prefix`
pub fn branch_currents_path(output_prefix: &Path) -> PathBuf {
    with_suffix(output_prefix, "_branch_currents_cum.txt")
}

/// Cumulative node currents written for `output_prefix`
pub fn node_currents_path(output_prefix: &Path) -> PathBuf {
    with_suffix(output_prefix, "_node_currents_cum.txt")
}

/// `<dir>/<stem>` + `suffix`, where the prefix's extension (e.g. `.out`) is dropped
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let stem = prefix
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    prefix.with_file_name(format!("{}{}", stem, suffix))
}

/// Read both current files for a solver run
pub fn parse_results(output_prefix: &Path) -> Result<SolverResults> {
    let branch_path = branch_currents_path(output_prefix);
    let node_path = node_currents_path(output_prefix);

    let edges = read_matrix(&branch_path, 3)?
        .into_iter()
        .map(|v| Ok((as_core_id(&branch_path, v[0])?, as_core_id(&branch_path, v[1])?, v[2])))
        .collect::<Result<Vec<_>>>()?;
    let nodes = read_matrix(&node_path, 2)?
        .into_iter()
        .map(|v| Ok((as_core_id(&node_path, v[0])?, v[1])))
        .collect::<Result<Vec<_>>>()?;

    Ok(SolverResults { edges, nodes })
}

fn as_core_id(path: &Path, v: f64) -> Result<i64> {
    if v.fract() == 0.0 && v.is_finite() {
        Ok(v as i64)
    } else {
        Err(Error::ResultFormat {
            path: path.to_path_buf(),
            reason: format!("{} is not a core id", v),
        })
    }
}

/// Numeric rows of `columns` values; `#` starts a comment
fn read_matrix(path: &Path, columns: usize) -> Result<Vec<Vec<f64>>> {
    if !path.is_file() {
        return Err(Error::SolverExecution(format!(
            "no solver output found at {}",
            path.display()
        )));
    }
    let text = fs::read_to_string(path)?;

    parse_rows(&text, columns, |line| line.split_whitespace().collect())
        .or_else(|_| {
            parse_rows(&text, columns, |line| line.split(',').map(str::trim).collect())
        })
        .map_err(|reason| Error::ResultFormat {
            path: path.to_path_buf(),
            reason,
        })
}

fn parse_rows<F>(text: &str, columns: usize, split: F) -> std::result::Result<Vec<Vec<f64>>, String>
where
    F: Fn(&str) -> Vec<&str>,
{
    let mut rows = Vec::new();
    for (n, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields = split(line);
        if fields.len() != columns {
            return Err(format!(
                "line {}: expected {} columns, found {}",
                n + 1,
                columns,
                fields.len()
            ));
        }
        let values = fields
            .iter()
            .map(|f| {
                f.parse::<f64>()
                    .map_err(|_| format!("line {}: '{}' is not a number", n + 1, f))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.push(values);
    }
    Ok(rows)
}
