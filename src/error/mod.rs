//! # Error Module
//!
//! Error types for building and driving the signing pipeline.
//!
//! ## Design Principles
//! - **Hashing never fails** - stage work and the hash primitives are
//!   infallible; a panic there aborts the run instead of surfacing here
//! - **Reject bad wiring early** - invalid configuration is caught when the
//!   pipeline is built, before any thread is spawned
//! - **Include context** - values, stage counts, what went wrong

use thiserror::Error;

/// Top-level library error
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline has no stages")]
    NoStages,

    #[error("Expected exactly one aggregate from the final stage, got {count}")]
    UnexpectedOutput { count: usize },

    #[error("Failed to start thread for stage {stage}: {source}")]
    Spawn {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start stage worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to read input items: {0}")]
    Input(#[from] std::io::Error),

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors in pipeline configuration values
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid channel capacity: {value} (must be at least 1)")]
    InvalidCapacity { value: usize },

    #[error("Invalid multi-hash width: {value} (must be at least 1)")]
    InvalidWidth { value: usize },

    #[error("Invalid in-flight limit: {value} (must be at least 1, omit for unbounded)")]
    InvalidInFlightLimit { value: usize },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PipelineError>;
