//! Error types for the buildgate pipeline core.

use thiserror::Error;

/// Errors that can occur while driving the validation pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Stage was declared with an empty argument vector
    #[error("stage '{stage}' has an empty command")]
    EmptyCommand { stage: String },

    /// Stage executable could not be spawned
    #[error("failed to spawn stage '{stage}': {source}")]
    Spawn {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    /// Stage exceeded its time budget
    #[error("stage '{stage}' timed out after {timeout_secs} seconds")]
    Timeout { stage: String, timeout_secs: u64 },

    /// Filesystem error (marker file, watched directory walk)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
