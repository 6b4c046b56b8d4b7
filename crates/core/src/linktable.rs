//! Link tables
//!
//! A link table lists candidate connections between core areas. It is
//! persisted between pipeline steps as a comma-delimited file with a `#`
//! header line and either the base 10-column layout or the 16-column layout
//! that adds network and pinch-point analysis columns.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Columns of the original link table layout
pub const BASE_COLUMNS: usize = 10;
/// Columns once the analysis columns have been appended
pub const FULL_COLUMNS: usize = 16;

/// Sentinel for analysis values that have not been computed
pub const NOT_COMPUTED: f64 = -1.0;

/// Offset added to `link_type` while a row is temporarily disabled
pub const PROCESSED_OFFSET: i32 = 1000;

const HEADER: &str = "# link,core1,core2,cluster1,cluster2,linkType,eucDist,lcDist,\
eucAdj,cwdAdj,lcpLength,cwdToEucRatio,cwdToPathRatio,effResist,cwdToEffResist,current";

/// Unordered pair of core area ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorePair {
    low: i64,
    high: i64,
}

impl CorePair {
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn low(&self) -> i64 {
        self.low
    }

    pub fn high(&self) -> i64 {
        self.high
    }
}

impl std::fmt::Display for CorePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.low, self.high)
    }
}

/// Analysis column that can be reset or written as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisColumn {
    LcpLength,
    EuclideanCorridorWidth,
    PathCorridorWidth,
    EffectiveResistance,
    CostWeightedTortuosity,
    CurrentFlowCentrality,
}

/// One candidate connection between two core areas
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRow {
    pub link_id: i64,
    pub core1: i64,
    pub core2: i64,
    pub cluster1: i64,
    pub cluster2: i64,
    pub link_type: i32,
    pub euclidean_distance: f64,
    pub cost_weighted_distance: f64,
    pub euclidean_adjacency: f64,
    pub cost_weighted_adjacency: f64,
    pub lcp_length: f64,
    pub euclidean_corridor_width: f64,
    pub path_corridor_width: f64,
    pub effective_resistance: f64,
    pub cost_weighted_tortuosity: f64,
    pub current_flow_centrality: f64,
}

impl LinkRow {
    /// Row with the given key fields; everything else zero or not computed
    pub fn new(link_id: i64, core1: i64, core2: i64, link_type: i32, cwd: f64) -> Self {
        Self {
            link_id,
            core1,
            core2,
            cluster1: -1,
            cluster2: -1,
            link_type,
            euclidean_distance: 0.0,
            cost_weighted_distance: cwd,
            euclidean_adjacency: 0.0,
            cost_weighted_adjacency: 0.0,
            lcp_length: NOT_COMPUTED,
            euclidean_corridor_width: NOT_COMPUTED,
            path_corridor_width: NOT_COMPUTED,
            effective_resistance: NOT_COMPUTED,
            cost_weighted_tortuosity: NOT_COMPUTED,
            current_flow_centrality: NOT_COMPUTED,
        }
    }

    pub fn pair(&self) -> CorePair {
        CorePair::new(self.core1, self.core2)
    }

    /// Active corridor eligible for barrier and centrality analysis
    pub fn is_active_corridor(&self) -> bool {
        (1..PROCESSED_OFFSET).contains(&self.link_type)
    }

    /// Eligible as a network edge (anything not dropped by earlier steps)
    pub fn is_network_edge(&self) -> bool {
        self.link_type >= 1
    }

    fn analysis_mut(&mut self, column: AnalysisColumn) -> &mut f64 {
        match column {
            AnalysisColumn::LcpLength => &mut self.lcp_length,
            AnalysisColumn::EuclideanCorridorWidth => &mut self.euclidean_corridor_width,
            AnalysisColumn::PathCorridorWidth => &mut self.path_corridor_width,
            AnalysisColumn::EffectiveResistance => &mut self.effective_resistance,
            AnalysisColumn::CostWeightedTortuosity => &mut self.cost_weighted_tortuosity,
            AnalysisColumn::CurrentFlowCentrality => &mut self.current_flow_centrality,
        }
    }

    fn parse(fields: &[&str], path: &Path, line: usize) -> Result<Self> {
        let int = |i: usize| parse_int(fields[i], path, line, i);
        let float = |i: usize| parse_float(fields[i], path, line, i);

        let mut row = LinkRow {
            link_id: int(0)?,
            core1: int(1)?,
            core2: int(2)?,
            cluster1: int(3)?,
            cluster2: int(4)?,
            link_type: i32::try_from(int(5)?).map_err(|_| Error::Format {
                path: path.to_path_buf(),
                line,
                reason: format!("column 5 is out of range: '{}'", fields[5].trim()),
            })?,
            euclidean_distance: float(6)?,
            cost_weighted_distance: float(7)?,
            euclidean_adjacency: float(8)?,
            cost_weighted_adjacency: float(9)?,
            ..LinkRow::new(0, 0, 0, 0, 0.0)
        };
        if fields.len() == FULL_COLUMNS {
            row.lcp_length = float(10)?;
            row.euclidean_corridor_width = float(11)?;
            row.path_corridor_width = float(12)?;
            row.effective_resistance = float(13)?;
            row.cost_weighted_tortuosity = float(14)?;
            row.current_flow_centrality = float(15)?;
        }
        Ok(row)
    }

    fn write_csv(&self, out: &mut String) {
        // `{}` on f64 is the shortest representation that parses back exactly
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.link_id,
            self.core1,
            self.core2,
            self.cluster1,
            self.cluster2,
            self.link_type,
            self.euclidean_distance,
            self.cost_weighted_distance,
            self.euclidean_adjacency,
            self.cost_weighted_adjacency,
            self.lcp_length,
            self.euclidean_corridor_width,
            self.path_corridor_width,
            self.effective_resistance,
            self.cost_weighted_tortuosity,
            self.current_flow_centrality,
        );
    }
}

fn parse_float(field: &str, path: &Path, line: usize, column: usize) -> Result<f64> {
    field.trim().parse::<f64>().map_err(|_| Error::Format {
        path: path.to_path_buf(),
        line,
        reason: format!("column {} is not a number: '{}'", column, field.trim()),
    })
}

/// Integer columns may have been written as floats (`3.0`) by older tools
fn parse_int(field: &str, path: &Path, line: usize, column: usize) -> Result<i64> {
    let trimmed = field.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    let v = parse_float(trimmed, path, line, column)?;
    if v.fract() != 0.0 || !v.is_finite() {
        return Err(Error::Format {
            path: path.to_path_buf(),
            line,
            reason: format!("column {} is not an integer: '{}'", column, trimmed),
        });
    }
    Ok(v as i64)
}

/// In-memory link table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkTable {
    rows: Vec<LinkRow>,
    /// Column count of the file this table was read from
    source_columns: usize,
    /// Rows disabled by `mark_processed` and not yet re-enabled
    marked: Vec<usize>,
}

impl LinkTable {
    pub fn from_rows(rows: Vec<LinkRow>) -> Self {
        Self {
            rows,
            source_columns: FULL_COLUMNS,
            marked: Vec::new(),
        }
    }

    /// Load a persisted link table.
    ///
    /// Tables in the base 10-column layout are widened with every analysis
    /// column set to [`NOT_COMPUTED`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;

        let mut rows = Vec::new();
        let mut source_columns = None;
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != BASE_COLUMNS && fields.len() != FULL_COLUMNS {
                return Err(Error::Format {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: format!(
                        "expected {} or {} columns, found {}",
                        BASE_COLUMNS,
                        FULL_COLUMNS,
                        fields.len()
                    ),
                });
            }
            match source_columns {
                None => source_columns = Some(fields.len()),
                Some(n) if n != fields.len() => {
                    return Err(Error::Format {
                        path: path.to_path_buf(),
                        line: line_no,
                        reason: format!("row has {} columns, earlier rows have {}", fields.len(), n),
                    });
                }
                Some(_) => {}
            }
            rows.push(LinkRow::parse(&fields, path, line_no)?);
        }

        let source_columns = source_columns.unwrap_or(FULL_COLUMNS);
        if source_columns < FULL_COLUMNS {
            tracing::debug!(
                "Widening link table {} from {} to {} columns",
                path.display(),
                source_columns,
                FULL_COLUMNS
            );
        }
        Ok(Self {
            rows,
            source_columns,
            marked: Vec::new(),
        })
    }

    /// Write the full 16-column layout
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = String::with_capacity(64 * (self.rows.len() + 1));
        out.push_str(HEADER);
        out.push('\n');
        for row in &self.rows {
            row.write_csv(&mut out);
        }
        fs::write(path, out)?;
        Ok(())
    }

    pub fn rows(&self) -> &[LinkRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [LinkRow] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the file this table came from lacked the analysis columns
    pub fn was_widened(&self) -> bool {
        self.source_columns < FULL_COLUMNS
    }

    pub fn count_active_corridor_links(&self) -> usize {
        self.rows.iter().filter(|r| r.is_active_corridor()).count()
    }

    /// Fail with [`Error::NoLinkages`] when nothing is left to analyse
    pub fn require_corridors(&self) -> Result<usize> {
        match self.count_active_corridor_links() {
            0 => Err(Error::NoLinkages),
            n => Ok(n),
        }
    }

    /// Indices of every row joining the two cores, in either order
    pub fn rows_for_pair(&self, pair: CorePair) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.pair() == pair)
            .map(|(i, _)| i)
            .collect()
    }

    /// Sorted unique ids appearing in either core column
    pub fn core_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.rows.iter().flat_map(|r| [r.core1, r.core2]).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn reset_column(&mut self, column: AnalysisColumn, value: f64) {
        for row in &mut self.rows {
            *row.analysis_mut(column) = value;
        }
    }

    /// Temporarily disable every other active row joining the same cores.
    ///
    /// Adds [`PROCESSED_OFFSET`] to their `link_type` and returns how many
    /// rows were disabled. Every call must be balanced by
    /// [`LinkTable::unmark_processed`] before the pass ends.
    pub fn mark_processed(&mut self, processed: usize, pair: CorePair) -> usize {
        let before = self.marked.len();
        for (i, row) in self.rows.iter_mut().enumerate() {
            if i != processed && row.pair() == pair && row.is_active_corridor() {
                row.link_type += PROCESSED_OFFSET;
                self.marked.push(i);
            }
        }
        self.marked.len() - before
    }

    /// Re-enable exactly the rows disabled by [`LinkTable::mark_processed`]
    pub fn unmark_processed(&mut self) {
        for i in self.marked.drain(..) {
            self.rows[i].link_type -= PROCESSED_OFFSET;
        }
    }
}

/// Core pairs already handled in the current traversal pass
#[derive(Debug, Clone, Default)]
pub struct ProcessedPairs {
    pairs: HashSet<CorePair>,
}

impl ProcessedPairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `pair`; returns false if it was already recorded
    pub fn insert(&mut self, pair: CorePair) -> bool {
        self.pairs.insert(pair)
    }

    pub fn contains(&self, pair: CorePair) -> bool {
        self.pairs.contains(&pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LinkTable {
        LinkTable::from_rows(vec![
            LinkRow::new(1, 1, 2, 1, 100.0),
            LinkRow::new(2, 2, 1, 1, 100.0),
            LinkRow::new(3, 2, 3, 0, 50.0),
            LinkRow::new(4, 3, 4, -2, 75.0),
            LinkRow::new(5, 4, 1, 2, 12.5),
        ])
    }

    #[test]
    fn test_core_pair_is_unordered() {
        assert_eq!(CorePair::new(5, 2), CorePair::new(2, 5));
        assert_eq!(CorePair::new(5, 2).low(), 2);
        assert_eq!(CorePair::new(5, 2).to_string(), "2_5");
    }

    #[test]
    fn test_count_active_corridor_links() {
        let table = sample();
        assert_eq!(table.count_active_corridor_links(), 3);
        assert_eq!(table.require_corridors().unwrap(), 3);
    }

    #[test]
    fn test_no_linkages() {
        let table = LinkTable::from_rows(vec![
            LinkRow::new(1, 1, 2, 0, 10.0),
            LinkRow::new(2, 2, 3, -1, 10.0),
        ]);
        assert!(matches!(table.require_corridors(), Err(Error::NoLinkages)));
    }

    #[test]
    fn test_mark_unmark_restores_link_types() {
        let mut table = sample();
        let before: Vec<i32> = table.rows().iter().map(|r| r.link_type).collect();

        table.mark_processed(0, CorePair::new(1, 2));
        assert_eq!(table.rows()[0].link_type, 1);
        assert_eq!(table.rows()[1].link_type, 1 + PROCESSED_OFFSET);
        assert!(!table.rows()[1].is_active_corridor());
        table.mark_processed(4, CorePair::new(1, 4));

        table.unmark_processed();
        let after: Vec<i32> = table.rows().iter().map(|r| r.link_type).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_mark_leaves_excluded_rows_alone() {
        let mut table = LinkTable::from_rows(vec![
            LinkRow::new(1, 3, 4, 1, 1.0),
            LinkRow::new(2, 4, 3, -1, 1.0),
        ]);
        table.mark_processed(0, CorePair::new(3, 4));
        assert_eq!(table.rows()[1].link_type, -1);
        table.unmark_processed();
        assert_eq!(table.rows()[1].link_type, -1);
    }

    #[test]
    fn test_unmark_only_touches_marked_rows() {
        let mut table = LinkTable::from_rows(vec![
            LinkRow::new(1, 1, 2, 1, 1.0),
            LinkRow::new(2, 2, 1, 1, 1.0),
            LinkRow::new(3, 5, 6, 1500, 1.0),
        ]);
        assert_eq!(table.mark_processed(0, CorePair::new(1, 2)), 1);
        table.unmark_processed();
        let types: Vec<i32> = table.rows().iter().map(|r| r.link_type).collect();
        assert_eq!(types, vec![1, 1, 1500]);

        // a second unmark has nothing left to restore
        table.unmark_processed();
        assert_eq!(table.rows()[1].link_type, 1);
    }

    #[test]
    fn test_rows_for_pair() {
        let table = sample();
        assert_eq!(table.rows_for_pair(CorePair::new(2, 1)), vec![0, 1]);
        assert!(table.rows_for_pair(CorePair::new(1, 3)).is_empty());
    }

    #[test]
    fn test_core_ids() {
        assert_eq!(sample().core_ids(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_save_load_roundtrip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linkTable_s5.csv");

        let mut table = sample();
        table.rows_mut()[0].cost_weighted_distance = 0.1 + 0.2;
        table.rows_mut()[2].effective_resistance = 1.0 / 3.0;
        table.rows_mut()[4].current_flow_centrality = 6.02e23;
        table.save(&path).unwrap();

        let back = LinkTable::load(&path).unwrap();
        assert_eq!(back.len(), table.len());
        assert!(!back.was_widened());
        for (a, b) in table.rows().iter().zip(back.rows()) {
            assert_eq!(a, b);
            assert_eq!(
                a.cost_weighted_distance.to_bits(),
                b.cost_weighted_distance.to_bits()
            );
        }
    }

    #[test]
    fn test_load_widens_base_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linkTable_s4.csv");
        fs::write(
            &path,
            "# link,core1,core2,cluster1,cluster2,linkType,eucDist,lcDist,eucAdj,cwdAdj\n\
             1,1,2,-1,-1,1,500.0,1250.5,0,0\n\
             2.0,2,3,-1,-1,10,300,800,0,0\n",
        )
        .unwrap();

        let table = LinkTable::load(&path).unwrap();
        assert!(table.was_widened());
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].link_id, 2);
        assert_eq!(table.rows()[0].cost_weighted_distance, 1250.5);
        assert_eq!(table.rows()[0].lcp_length, NOT_COMPUTED);
        assert_eq!(table.rows()[1].current_flow_centrality, NOT_COMPUTED);
    }

    #[test]
    fn test_load_rejects_bad_column_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "1,2,3\n").unwrap();
        match LinkTable::load(&path) {
            Err(Error::Format { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_non_numeric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "# header\n1,1,2,-1,-1,1,5,abc,0,0\n").unwrap();
        match LinkTable::load(&path) {
            Err(Error::Format { line, reason, .. }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("column 7"));
            }
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_out_of_range_link_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "1,1,2,-1,-1,4294967297,5,10,0,0\n").unwrap();
        match LinkTable::load(&path) {
            Err(Error::Format { line, reason, .. }) => {
                assert_eq!(line, 1);
                assert!(reason.contains("column 5"));
            }
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_reset_column() {
        let mut table = sample();
        table.rows_mut()[0].current_flow_centrality = 4.0;
        table.reset_column(AnalysisColumn::CurrentFlowCentrality, NOT_COMPUTED);
        assert!(table.rows().iter().all(|r| r.current_flow_centrality == NOT_COMPUTED));
    }

    #[test]
    fn test_processed_pairs() {
        let mut seen = ProcessedPairs::new();
        assert!(seen.insert(CorePair::new(1, 2)));
        assert!(!seen.insert(CorePair::new(2, 1)));
        assert!(seen.contains(CorePair::new(2, 1)));
        seen.clear();
        assert!(seen.is_empty());
    }
}
