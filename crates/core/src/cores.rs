//! Core area attribute tables
//!
//! Core areas are identified by a user-chosen integer field. The table is
//! read as a comma-delimited file with a header row; every column is carried
//! through untouched and a centrality column is appended on save.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Attribute written by the centrality stage
pub const CENTRALITY_FIELD: &str = "CF_Central";

const RESERVED_FIELDS: [&str; 4] = ["fid", "id", "oid", "shape"];

/// Reject core id field names that collide with reserved identifier fields
pub fn validate_core_field(name: &str) -> Result<()> {
    if RESERVED_FIELDS.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(Error::ReservedFieldName(name.to_string()));
    }
    if name.trim().is_empty() {
        return Err(Error::InvalidParameter {
            name: "core_field",
            value: name.to_string(),
            reason: "must name a column".into(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreRecord {
    pub id: i64,
    /// Original column values, in header order
    values: Vec<String>,
    pub centrality: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreTable {
    header: Vec<String>,
    records: Vec<CoreRecord>,
}

impl CoreTable {
    /// Table holding only the id column, one record per id
    pub fn from_ids(field: &str, ids: &[i64]) -> Self {
        Self {
            header: vec![field.to_string()],
            records: ids
                .iter()
                .map(|&id| CoreRecord {
                    id,
                    values: vec![id.to_string()],
                    centrality: None,
                })
                .collect(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P, field: &str) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let format_err = |line: usize, reason: String| Error::Format {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
        let (_, header_line) = lines
            .next()
            .ok_or_else(|| format_err(1, "missing header row".into()))?;
        let mut header: Vec<String> = header_line.split(',').map(|s| s.trim().to_string()).collect();

        // a previous run's centrality column is recomputed, not carried
        let stale = header.iter().position(|h| h.eq_ignore_ascii_case(CENTRALITY_FIELD));
        if let Some(i) = stale {
            header.remove(i);
        }

        let id_col = header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(field))
            .ok_or_else(|| format_err(1, format!("no column named '{}'", field)))?;

        let mut records = Vec::new();
        for (idx, line) in lines {
            let mut values: Vec<String> = line.split(',').map(|s| s.trim().to_string()).collect();
            if let Some(i) = stale
                && i < values.len()
            {
                values.remove(i);
            }
            if values.len() != header.len() {
                return Err(format_err(
                    idx + 1,
                    format!("expected {} columns, found {}", header.len(), values.len()),
                ));
            }
            let raw = &values[id_col];
            let id = raw
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    raw.parse::<f64>()
                        .ok()
                        .filter(|v| v.fract() == 0.0)
                        .map(|v| v as i64)
                })
                .ok_or_else(|| format_err(idx + 1, format!("core id '{}' is not an integer", raw)))?;
            records.push(CoreRecord {
                id,
                values,
                centrality: None,
            });
        }

        Ok(Self {
            header,
            records,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = String::new();
        let _ = writeln!(out, "{},{}", self.header.join(","), CENTRALITY_FIELD);
        for record in &self.records {
            let centrality = record.centrality.map(|c| c.to_string()).unwrap_or_default();
            let _ = writeln!(out, "{},{}", record.values.join(","), centrality);
        }
        fs::write(path, out)?;
        Ok(())
    }

    pub fn records(&self) -> &[CoreRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [CoreRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_fields() {
        for name in ["FID", "id", "Oid", "SHAPE"] {
            assert!(matches!(validate_core_field(name), Err(Error::ReservedFieldName(_))));
        }
        assert!(validate_core_field("core_ID").is_ok());
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cores.csv");
        fs::write(&input, "name,core_ID,area\nnorth,1,120.5\nsouth,2.0,80\n").unwrap();

        let mut cores = CoreTable::load(&input, "CORE_id").unwrap();
        assert_eq!(cores.len(), 2);
        assert_eq!(cores.records()[1].id, 2);
        cores.records_mut()[0].centrality = Some(3.5);

        let output = dir.path().join("out").join("cores.csv");
        cores.save(&output).unwrap();
        let text = fs::read_to_string(&output).unwrap();
        assert_eq!(
            text,
            "name,core_ID,area,CF_Central\nnorth,1,120.5,3.5\nsouth,2.0,80,\n"
        );
    }

    #[test]
    fn test_reload_drops_stale_centrality() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cores.csv");
        fs::write(&input, "core,CF_Central\n7,1.25\n").unwrap();
        let cores = CoreTable::load(&input, "core").unwrap();
        assert_eq!(cores.records()[0].centrality, None);
        assert_eq!(cores.header, vec!["core".to_string()]);
    }

    #[test]
    fn test_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cores.csv");
        fs::write(&input, "a,b\n1,2\n").unwrap();
        assert!(matches!(
            CoreTable::load(&input, "core"),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn test_from_ids() {
        let cores = CoreTable::from_ids("core", &[3, 9]);
        assert_eq!(cores.records().iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 9]);
    }
}
