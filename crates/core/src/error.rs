//! Error types for linkmap

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for linkmap operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Malformed link table {}: line {line}: {reason}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("There are no linkages. Please check the link table from the previous step.")]
    NoLinkages,

    #[error("No eligible links to build a network from")]
    EmptyGraph,

    #[error(
        "Cannot find a Circuitscape installation (searched: {}). \
         Install Circuitscape or set `solver_path` in the project file.",
        searched.join(", ")
    )]
    SolverMissing { searched: Vec<String> },

    #[error("Circuitscape failed: {0}. Rerun the previous steps if necessary.")]
    SolverExecution(String),

    #[error("Cannot read solver output {}: {reason}", path.display())]
    ResultFormat { path: PathBuf, reason: String },

    #[error("Raster operation failed after {attempts} attempts: {source}")]
    RasterEngine {
        attempts: usize,
        #[source]
        source: Box<Error>,
    },

    #[error(
        "Core area field name '{0}' is reserved (ID, FID, SHAPE and OID). \
         Please choose another field holding positive integers."
    )]
    ReservedFieldName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Errors caused by the user's inputs rather than by a failing tool.
    ///
    /// The CLI reports these as plain messages without a cause chain.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NoLinkages
                | Error::ReservedFieldName(_)
                | Error::InvalidParameter { .. }
                | Error::Config(_)
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Result type alias for linkmap operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_classification() {
        assert!(Error::NoLinkages.is_user_facing());
        assert!(Error::ReservedFieldName("FID".into()).is_user_facing());
        assert!(!Error::EmptyGraph.is_user_facing());
        assert!(!Error::SolverExecution("exit status 1".into()).is_user_facing());
    }

    #[test]
    fn test_raster_engine_keeps_source() {
        let err = Error::RasterEngine {
            attempts: 3,
            source: Box::new(Error::Other("lock held".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("lock held"));
    }
}
