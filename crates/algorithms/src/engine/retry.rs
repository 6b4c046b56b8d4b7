//! Retrying raster operations
//!
//! Engine operations can fail transiently when the engine still holds a lock
//! on an output from a previous call. A failed operation is rerun in a fresh
//! scratch directory so it never collides with a file that is still in use.

use std::fs;
use std::path::{Path, PathBuf};

use linkmap_core::{Error, Result};
use tracing::warn;

/// Run `operation` in the directory returned by `relocate(0)`, and on each
/// failure rerun it in `relocate(attempt)` until `max_attempts` runs failed.
///
/// Exhausting the attempts fails with [`Error::RasterEngine`] wrapping the
/// last error. Errors caused by the user's inputs (see
/// [`Error::is_user_facing`]) and errors from `relocate` itself are returned
/// immediately.
pub fn with_retry<T, O, R>(max_attempts: usize, mut operation: O, mut relocate: R) -> Result<T>
where
    O: FnMut(&Path) -> Result<T>,
    R: FnMut(usize) -> Result<PathBuf>,
{
    let max_attempts = max_attempts.max(1);
    let mut dir = relocate(0)?;
    let mut attempt = 0;
    loop {
        match operation(&dir) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_user_facing() => return Err(err),
            Err(err) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(Error::RasterEngine {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                warn!(
                    "Raster operation failed (attempt {} of {}): {}. Retrying in a new scratch directory.",
                    attempt, max_attempts, err
                );
                dir = relocate(attempt)?;
            }
        }
    }
}

/// Scratch directories `tag`, `tag_1`, `tag_2`, ... under a common base.
///
/// Preparing a new attempt deletes the previous attempt's directory.
#[derive(Debug)]
pub struct ScratchRotation {
    base: PathBuf,
    tag: String,
    current: Option<PathBuf>,
}

impl ScratchRotation {
    pub fn new(base: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            tag: tag.into(),
            current: None,
        }
    }

    /// Fresh, empty directory for `attempt`
    pub fn prepare(&mut self, attempt: usize) -> Result<PathBuf> {
        self.discard()?;
        let dir = if attempt == 0 {
            self.base.join(&self.tag)
        } else {
            self.base.join(format!("{}_{}", self.tag, attempt))
        };
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        self.current = Some(dir.clone());
        Ok(dir)
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Remove the directory of the latest attempt, if any
    pub fn discard(&mut self) -> Result<()> {
        if let Some(dir) = self.current.take()
            && dir.exists()
        {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_succeeds_after_transient_failures() {
        let scratch = tempfile::tempdir().unwrap();
        let mut rotation = ScratchRotation::new(scratch.path(), "mos3");
        let calls = Cell::new(0);
        let mut dirs = Vec::new();

        let value = with_retry(
            5,
            |dir| {
                dirs.push(dir.to_path_buf());
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(Error::Other("raster is locked".into()))
                } else {
                    Ok(42)
                }
            },
            |attempt| rotation.prepare(attempt),
        )
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.get(), 3);
        assert_eq!(
            dirs,
            vec![
                scratch.path().join("mos3"),
                scratch.path().join("mos3_1"),
                scratch.path().join("mos3_2"),
            ]
        );
        // earlier attempts were cleaned up
        assert!(!scratch.path().join("mos3").exists());
        assert!(scratch.path().join("mos3_2").is_dir());
    }

    #[test]
    fn test_exhausted_attempts() {
        let scratch = tempfile::tempdir().unwrap();
        let mut rotation = ScratchRotation::new(scratch.path(), "mos1");
        let result: Result<()> = with_retry(
            3,
            |_| Err(Error::Other("engine busy".into())),
            |attempt| rotation.prepare(attempt),
        );
        match result {
            Err(Error::RasterEngine { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(source.to_string().contains("engine busy"));
            }
            other => panic!("expected RasterEngine error, got {:?}", other),
        }
    }

    #[test]
    fn test_input_errors_are_not_retried() {
        let scratch = tempfile::tempdir().unwrap();
        let mut rotation = ScratchRotation::new(scratch.path(), "bar4");
        let calls = Cell::new(0);
        let result: Result<()> = with_retry(
            10,
            |_| {
                calls.set(calls.get() + 1);
                Err(Error::InvalidParameter {
                    name: "cwd_dir",
                    value: "cwd".into(),
                    reason: "missing".into(),
                })
            },
            |attempt| rotation.prepare(attempt),
        );
        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(Error::InvalidParameter { name: "cwd_dir", .. })));
    }

    #[test]
    fn test_discard() {
        let scratch = tempfile::tempdir().unwrap();
        let mut rotation = ScratchRotation::new(scratch.path(), "mos9");
        let dir = rotation.prepare(0).unwrap();
        assert!(dir.is_dir());
        rotation.discard().unwrap();
        assert!(!dir.exists());
        assert!(rotation.current().is_none());
    }
}
