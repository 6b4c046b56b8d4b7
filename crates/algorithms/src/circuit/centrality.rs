//! Current-flow centrality stage
//!
//! Each connected component of the core graph is solved on its own, one at a
//! time, reusing the same solver files. Branch currents land on every link
//! table row joining the two cores; node currents land on the core table.

use std::fs;
use std::path::PathBuf;

use linkmap_core::config::CentralityConfig;
use linkmap_core::cores::{validate_core_field, CoreTable};
use linkmap_core::linktable::{AnalysisColumn, LinkTable, NOT_COMPUTED};
use linkmap_core::{CorePair, Result};
use tracing::{debug, info};

use super::config::CircuitscapeConfig;
use super::files::{
    branch_currents_path, node_currents_path, parse_results, serialize_graph, write_graph,
};
use super::solver::CircuitSolver;
use crate::network::{build_graph, component_count, extract_subgraph, find_components};

const STEP: u32 = 7;
const GRAPH_FILE: &str = "Circuitscape_graph.txt";
const CONFIG_FILE: &str = "Circuitscape_network.ini";
const OUTPUT_FILE: &str = "Circuitscape_network.out";

/// What a centrality run produced
#[derive(Debug, Clone, Default)]
pub struct CentralityReport {
    pub components: usize,
    pub nodes: usize,
    /// Link table rows that received a current
    pub links_updated: usize,
    pub link_table: PathBuf,
    pub core_table: PathBuf,
}

/// Set the centrality of every row joining each pair of cores.
///
/// Returns the number of rows updated. Currents for pairs with no row are
/// skipped.
pub fn apply_edge_currents(table: &mut LinkTable, edges: &[(i64, i64, f64)]) -> usize {
    let mut updated = 0;
    for &(a, b, current) in edges {
        let rows = table.rows_for_pair(CorePair::new(a, b));
        if rows.is_empty() {
            debug!("No link joins cores {} and {}; current {} skipped", a, b, current);
            continue;
        }
        for i in rows {
            table.rows_mut()[i].current_flow_centrality = current;
            updated += 1;
        }
    }
    updated
}

/// Set the centrality of every core with a reported current
pub fn apply_node_currents(cores: &mut CoreTable, nodes: &[(i64, f64)]) -> usize {
    let mut updated = 0;
    for record in cores.records_mut() {
        if let Some(&(_, current)) = nodes.iter().find(|(id, _)| *id == record.id) {
            record.centrality = Some(current);
            updated += 1;
        }
    }
    updated
}

/// Run centrality analysis on the link table of the previous step
pub fn run_centrality<S: CircuitSolver + ?Sized>(
    config: &CentralityConfig,
    solver: &S,
) -> Result<CentralityReport> {
    validate_core_field(&config.core_field)?;

    let source = config.layout.previous_link_table(STEP)?;
    let mut table = LinkTable::load(&source)?;
    table.require_corridors()?;
    if table.was_widened() {
        debug!("Widened link table {} to the full column layout", source.display());
    }
    table.reset_column(AnalysisColumn::CurrentFlowCentrality, NOT_COMPUTED);

    let mut cores = match &config.core_table {
        Some(path) => CoreTable::load(path, &config.core_field)?,
        None => CoreTable::from_ids(&config.core_field, &table.core_ids()),
    };

    let graph = build_graph(table.rows())?;
    let labels = find_components(&graph);
    let components = component_count(&labels);
    info!(
        "Core graph has {} nodes in {} connected components",
        graph.node_count(),
        components
    );

    let graph_file = config.base_dir.join(GRAPH_FILE);
    let config_file = config.config_dir().join(CONFIG_FILE);
    let output_prefix = config.solver_output_dir().join(OUTPUT_FILE);
    fs::create_dir_all(config.solver_output_dir())?;
    CircuitscapeConfig::network(&graph_file, &output_prefix).write_config(&config_file)?;

    let mut links_updated = 0;
    for label in 1..=components {
        let component = extract_subgraph(&graph, &labels, label)?;
        if components > 1 {
            info!(
                "Calculating current flow centrality for component {} of {} ({} cores)",
                label,
                components,
                component.node_count()
            );
        } else {
            info!("Calculating current flow centrality");
        }

        write_graph(&graph_file, &serialize_graph(&component))?;
        // stale results from the previous component must not be read back
        for stale in [branch_currents_path(&output_prefix), node_currents_path(&output_prefix)] {
            if stale.exists() {
                fs::remove_file(stale)?;
            }
        }

        solver.solve(&config_file)?;
        let results = parse_results(&output_prefix)?;
        links_updated += apply_edge_currents(&mut table, &results.edges);
        apply_node_currents(&mut cores, &results.nodes);
    }

    let working = config.layout.link_table_path(STEP);
    table.save(&working)?;
    table.save(config.layout.final_link_table_path(STEP))?;

    let core_path = config
        .output_store
        .join(format!("{}_Cores.csv", config.layout.prefix));
    cores.save(&core_path)?;
    info!("Done with centrality calculations");

    Ok(CentralityReport {
        components,
        nodes: graph.node_count(),
        links_updated,
        link_table: working,
        core_table: core_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkmap_core::LinkRow;

    #[test]
    fn test_apply_edge_currents_any_order() {
        let mut table = LinkTable::from_rows(vec![
            LinkRow::new(1, 1, 2, 1, 10.0),
            LinkRow::new(2, 2, 1, 1, 12.0),
            LinkRow::new(3, 2, 3, 1, 8.0),
        ]);
        let updated = apply_edge_currents(&mut table, &[(2, 1, 0.75), (3, 9, 1.0)]);
        assert_eq!(updated, 2);
        assert_eq!(table.rows()[0].current_flow_centrality, 0.75);
        assert_eq!(table.rows()[1].current_flow_centrality, 0.75);
        assert_eq!(table.rows()[2].current_flow_centrality, NOT_COMPUTED);
    }

    #[test]
    fn test_apply_node_currents() {
        let mut cores = CoreTable::from_ids("core_ID", &[1, 2, 3]);
        let updated = apply_node_currents(&mut cores, &[(3, 2.5), (1, 0.5), (8, 9.0)]);
        assert_eq!(updated, 2);
        assert_eq!(cores.records()[0].centrality, Some(0.5));
        assert_eq!(cores.records()[1].centrality, None);
        assert_eq!(cores.records()[2].centrality, Some(2.5));
    }
}
