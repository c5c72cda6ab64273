//! Error types for the batch tool.

use crate::billing::BillingError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for batch operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Errors that can occur while selecting rows or driving remote mutations.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The billing secret was not provided or is empty
    #[error("{var} wasn't provided")]
    MissingCredential { var: &'static str },

    /// A filtered pipeline was selected without a match prefix
    #[error("pipeline {pipeline} needs a match prefix (--prefix or MATCH_PREFIX)")]
    MissingPrefix { pipeline: &'static str },

    /// Failed to open the input file
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line of delimited text could not be decoded
    #[error("decode error at line {}: {source}", .line.map_or_else(|| "?".to_string(), |l| l.to_string()))]
    Decode {
        line: Option<u64>,
        #[source]
        source: csv::Error,
    },

    /// A row is shorter than the field position a pipeline reads
    #[error("row at line {line} has {len} fields, field {index} is missing")]
    MissingField { line: u64, index: usize, len: usize },

    /// The remote collaborator rejected a mutation
    #[error("remote operation failed for {id}: {source}")]
    Remote {
        id: String,
        #[source]
        source: BillingError,
    },

    /// The billing client could not be constructed
    #[error("billing client setup failed: {0}")]
    ClientSetup(#[from] BillingError),

    /// One or more selected pipelines did not complete
    #[error("{failed} pipeline(s) failed")]
    PipelinesFailed { failed: usize },
}

impl From<csv::Error> for BatchError {
    fn from(source: csv::Error) -> Self {
        let line = source.position().map(|p| p.line());
        BatchError::Decode { line, source }
    }
}
