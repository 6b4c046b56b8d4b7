//! Core area graph built from the link table

use ndarray::Array2;
use linkmap_core::linktable::LinkRow;
use linkmap_core::{Error, Result};

/// Undirected weighted graph over core areas.
///
/// Nodes are indexed `0..n` in ascending order of their core id;
/// `node_names[i]` is the core id of node `i`. A zero weight means no edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    pub weights: Array2<f64>,
    pub node_names: Vec<i64>,
}

impl Graph {
    pub fn node_count(&self) -> usize {
        self.node_names.len()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        let n = self.node_count();
        (0..n)
            .map(|i| ((i + 1)..n).filter(|&j| self.weights[(i, j)] != 0.0).count())
            .sum()
    }

    /// Dense index of a core id
    pub fn index_of(&self, core: i64) -> Option<usize> {
        self.node_names.binary_search(&core).ok()
    }

    pub fn weight(&self, a: i64, b: i64) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.weights[(i, j)])
    }

    /// Nodes adjacent to node `i`
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.weights
            .row(i)
            .into_iter()
            .enumerate()
            .filter(|&(_, w)| *w != 0.0)
            .map(|(j, _)| j)
    }
}

/// Build the graph of every row with `link_type >= 1`, weighted by
/// cost-weighted distance.
///
/// When several rows join the same cores the smallest positive cost is kept,
/// so the graph does not depend on row order.
pub fn build_graph(rows: &[LinkRow]) -> Result<Graph> {
    let edges: Vec<&LinkRow> = rows.iter().filter(|r| r.is_network_edge()).collect();
    if edges.is_empty() {
        return Err(Error::EmptyGraph);
    }

    let mut node_names: Vec<i64> = edges.iter().flat_map(|r| [r.core1, r.core2]).collect();
    node_names.sort_unstable();
    node_names.dedup();

    let n = node_names.len();
    let mut weights = Array2::<f64>::zeros((n, n));
    for row in edges {
        // ids come from node_names, so both lookups succeed
        let (Ok(i), Ok(j)) = (
            node_names.binary_search(&row.core1),
            node_names.binary_search(&row.core2),
        ) else {
            continue;
        };
        let cost = row.cost_weighted_distance;
        let current = weights[(i, j)];
        let keep = if current > 0.0 && (cost <= 0.0 || current <= cost) {
            current
        } else {
            cost
        };
        weights[(i, j)] = keep;
        weights[(j, i)] = keep;
    }

    Ok(Graph { weights, node_names })
}
