//! Circuit solver adapter

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use linkmap_core::{Error, Result};
use tracing::debug;

/// Executable names tried on `PATH`, in order
pub const SOLVER_NAMES: [&str; 3] = ["csrun.py", "csrun", "circuitscape"];

/// Runs a circuit solver on a written configuration file
pub trait CircuitSolver {
    /// Solve the run described by `config_path`, blocking until it exits
    fn solve(&self, config_path: &Path) -> Result<()>;
}

/// Circuitscape run as an OS process
#[derive(Debug, Clone)]
pub struct Circuitscape {
    program: PathBuf,
}

impl Circuitscape {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `explicit` when given, otherwise search `PATH`
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(Self::new(path));
            }
            return Err(Error::SolverMissing {
                searched: vec![path.display().to_string()],
            });
        }

        let dirs: Vec<PathBuf> = env::var_os("PATH")
            .map(|p| env::split_paths(&p).collect())
            .unwrap_or_default();
        Self::search(&dirs)
    }

    /// First solver executable found in `dirs`
    pub fn search(dirs: &[PathBuf]) -> Result<Self> {
        for name in SOLVER_NAMES {
            for dir in dirs {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    debug!("Found Circuitscape at {}", candidate.display());
                    return Ok(Self::new(candidate));
                }
            }
        }
        Err(Error::SolverMissing {
            searched: SOLVER_NAMES.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl CircuitSolver for Circuitscape {
    fn solve(&self, config_path: &Path) -> Result<()> {
        debug!(
            "Running {} {}",
            self.program.display(),
            config_path.display()
        );
        let output = Command::new(&self.program)
            .arg(config_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                Error::SolverExecution(format!("cannot start {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::SolverExecution(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_search_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("csrun"), "").unwrap();
        let found = Circuitscape::search(&[PathBuf::from("/nonexistent"), dir.path().to_path_buf()])
            .unwrap();
        assert_eq!(found.program(), dir.path().join("csrun"));
    }

    #[test]
    fn test_prefers_csrun_py() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("circuitscape"), "").unwrap();
        fs::write(dir.path().join("csrun.py"), "").unwrap();
        let found = Circuitscape::search(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(found.program(), dir.path().join("csrun.py"));
    }

    #[test]
    fn test_missing_solver() {
        let dir = tempfile::tempdir().unwrap();
        match Circuitscape::search(&[dir.path().to_path_buf()]) {
            Err(Error::SolverMissing { searched }) => assert_eq!(searched.len(), 3),
            other => panic!("expected SolverMissing, got {:?}", other),
        }
        let explicit = dir.path().join("nope");
        assert!(matches!(
            Circuitscape::locate(Some(&explicit)),
            Err(Error::SolverMissing { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_process() {
        let solver = Circuitscape::new("false");
        assert!(matches!(
            solver.solve(Path::new("cfg.ini")),
            Err(Error::SolverExecution(_))
        ));
    }
}
