//! Stage 3: sort everything and join it into one aggregate.

use crate::core::pipeline::{Stage, StageContext};
use tracing::debug;

/// Separator between results in the aggregate
pub const COMBINE_SEPARATOR: &str = "_";

/// Terminal reducer.
///
/// Buffers every input until the channel closes, then emits exactly one
/// item: the inputs sorted by byte order and joined with `_`. No input
/// yields the empty string.
#[derive(Debug, Default, Clone, Copy)]
pub struct CombineStage;

impl CombineStage {
    pub const NAME: &'static str = "combine";

    pub fn new() -> Self {
        Self
    }

    /// Sort and join a set of results
    pub fn combine(mut results: Vec<String>) -> String {
        results.sort_unstable();
        results.join(COMBINE_SEPARATOR)
    }
}

impl Stage for CombineStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, ctx: &StageContext<'_>) {
        let results: Vec<String> = ctx.inputs().map(|item| item.canonical()).collect();
        debug!(results = results.len(), "combining");
        ctx.emit(Self::combine(results));
    }
}
