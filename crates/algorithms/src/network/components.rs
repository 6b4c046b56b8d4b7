//! Connected components of the core area graph

use std::collections::VecDeque;

use linkmap_core::{Algorithm, Error, Result};

use super::graph::Graph;

/// Connected component labelling
#[derive(Debug, Clone, Default)]
pub struct ConnectedComponents;

impl Algorithm for ConnectedComponents {
    type Input = Graph;
    type Output = Vec<usize>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "ConnectedComponents"
    }

    fn description(&self) -> &'static str {
        "Label each node with the connected component it belongs to"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        Ok(find_components(&input))
    }
}

/// Label every node with its component.
///
/// Labels are dense and start at 1, numbered in order of each component's
/// lowest node index.
pub fn find_components(graph: &Graph) -> Vec<usize> {
    let n = graph.node_count();
    let mut labels = vec![0usize; n];
    let mut queue = VecDeque::new();
    let mut label = 0;

    for start in 0..n {
        if labels[start] != 0 {
            continue;
        }
        label += 1;
        labels[start] = label;
        queue.push_back(start);

        while let Some(node) = queue.pop_front() {
            for next in graph.neighbors(node) {
                if labels[next] == 0 {
                    labels[next] = label;
                    queue.push_back(next);
                }
            }
        }
    }

    labels
}

/// Number of distinct components in `labels`
pub fn component_count(labels: &[usize]) -> usize {
    labels.iter().copied().max().unwrap_or(0)
}

/// Restrict `graph` to the nodes carrying `label`
pub fn extract_subgraph(graph: &Graph, labels: &[usize], label: usize) -> Result<Graph> {
    if labels.len() != graph.node_count() {
        return Err(Error::SizeMismatch {
            er: graph.node_count(),
            ec: 1,
            ar: labels.len(),
            ac: 1,
        });
    }
    let members: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|&(_, &l)| l == label)
        .map(|(i, _)| i)
        .collect();
    if members.is_empty() {
        return Err(Error::InvalidParameter {
            name: "label",
            value: label.to_string(),
            reason: "no node carries this component label".into(),
        });
    }

    let weights = graph.weights.select(ndarray::Axis(0), &members).select(ndarray::Axis(1), &members);
    let node_names = members.iter().map(|&i| graph.node_names[i]).collect();
    Ok(Graph { weights, node_names })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::graph::build_graph;
    use linkmap_core::LinkRow;

    fn rows(edges: &[(i64, i64, f64)]) -> Vec<LinkRow> {
        edges
            .iter()
            .enumerate()
            .map(|(i, &(a, b, w))| LinkRow::new(i as i64 + 1, a, b, 1, w))
            .collect()
    }

    #[test]
    fn test_two_components() {
        let graph = build_graph(&rows(&[(1, 2, 5.0), (2, 3, 5.0), (4, 5, 5.0)])).unwrap();
        let labels = find_components(&graph);
        assert_eq!(labels, vec![1, 1, 1, 2, 2]);
        assert_eq!(component_count(&labels), 2);

        let first = extract_subgraph(&graph, &labels, 1).unwrap();
        assert_eq!(first.node_names, vec![1, 2, 3]);
        assert_eq!(first.weight(2, 3), Some(5.0));
        assert_eq!(first.edge_count(), 2);

        let second = extract_subgraph(&graph, &labels, 2).unwrap();
        assert_eq!(second.node_names, vec![4, 5]);
        assert_eq!(second.weights.shape(), &[2, 2]);
    }

    #[test]
    fn test_labels_independent_of_row_order() {
        let edges = [(7, 9, 1.0), (1, 3, 2.0), (3, 5, 1.5), (9, 11, 4.0)];
        let forward = build_graph(&rows(&edges)).unwrap();
        let mut reversed = edges;
        reversed.reverse();
        let backward = build_graph(&rows(&reversed)).unwrap();
        assert_eq!(find_components(&forward), find_components(&backward));
        assert_eq!(find_components(&forward), vec![1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_components_partition_nodes() {
        let graph = build_graph(&rows(&[(1, 2, 1.0), (3, 4, 1.0), (5, 6, 1.0), (6, 1, 1.0)])).unwrap();
        let labels = find_components(&graph);
        let total: usize = (1..=component_count(&labels))
            .map(|l| extract_subgraph(&graph, &labels, l).unwrap().node_count())
            .sum();
        assert_eq!(total, graph.node_count());
        assert_eq!(component_count(&labels), 2);
    }

    #[test]
    fn test_algorithm_trait() {
        let graph = build_graph(&rows(&[(1, 2, 1.0)])).unwrap();
        let labels = ConnectedComponents.execute(graph, ()).unwrap();
        assert_eq!(labels, vec![1, 1]);
    }

    #[test]
    fn test_unknown_label() {
        let graph = build_graph(&rows(&[(1, 2, 1.0)])).unwrap();
        let labels = find_components(&graph);
        assert!(extract_subgraph(&graph, &labels, 5).is_err());
    }
}
