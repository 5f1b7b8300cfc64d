//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

/// All events emitted by a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Per-stage lifecycle events
    Stage(StageEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Lifecycle of a single stage
///
/// Every stage moves forward through these states and never goes back.
/// A stage whose input closes before any item arrives skips `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageState {
    /// Started, nothing received yet
    WaitingForInput,
    /// At least one item received, input still open
    Processing,
    /// Input closed, waiting for in-flight item tasks
    Draining,
    /// Output channel closed
    Closed,
}

/// Events from an individual stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageEvent {
    /// A stage moved to a new state
    StateChanged {
        stage: String,
        index: usize,
        state: StageState,
    },
    /// A stage wrote one result to its output
    ItemEmitted { stage: String, index: usize },
    /// A stage closed its output
    Completed(StageSummary),
}

/// Counters for one finished stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSummary {
    /// Stage name
    pub stage: String,
    /// Position in the pipeline, starting at 0
    pub index: usize,
    /// Items read from the input channel
    pub received: usize,
    /// Items written to the output channel
    pub emitted: usize,
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started { stages: usize },
    /// Pipeline completed and every stage closed
    Completed { summary: PipelineSummary },
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Number of stages that ran
    pub stages: usize,
    /// Items produced by the final stage
    pub outputs: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageState::WaitingForInput => write!(f, "waiting for input"),
            StageState::Processing => write!(f, "processing"),
            StageState::Draining => write!(f, "draining"),
            StageState::Closed => write!(f, "closed"),
        }
    }
}
