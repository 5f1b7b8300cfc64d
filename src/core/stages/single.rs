//! Stage 1: checksum of the item joined with the checksum of its digest.

use crate::core::hasher::{guarded, ExclusionGuard, HashPrimitives};
use crate::core::pipeline::{join_task, Dispatcher, FanOut, Stage, StageContext};
use crate::core::item::Item;
use crate::error::PipelineError;
use std::sync::Arc;
use std::thread;
use tracing::trace;

/// Separator between the two halves of a single-hash result
pub const SINGLE_HASH_SEPARATOR: &str = "~";

/// Emits `checksum(data) ~ checksum(digest(data))` for every item.
///
/// Each item gets its own task, and inside it the two halves run in
/// parallel. The digest is the only call made under `guard`; both
/// checksums run unguarded.
pub struct SingleHashStage {
    primitives: Arc<dyn HashPrimitives>,
    guard: Arc<dyn ExclusionGuard>,
    dispatcher: Dispatcher,
}

impl SingleHashStage {
    pub const NAME: &'static str = "single_hash";

    /// Create a stage with unbounded per-item fan-out
    pub fn new(primitives: Arc<dyn HashPrimitives>, guard: Arc<dyn ExclusionGuard>) -> Self {
        Self {
            primitives,
            guard,
            dispatcher: Dispatcher::Unbounded,
        }
    }

    /// Create a stage with an explicit fan-out policy
    pub fn with_fan_out(
        primitives: Arc<dyn HashPrimitives>,
        guard: Arc<dyn ExclusionGuard>,
        fan_out: FanOut,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            primitives,
            guard,
            dispatcher: Dispatcher::new(fan_out, Self::NAME)?,
        })
    }

    /// Compute the single-hash result for one canonical string.
    pub fn sign(&self, data: &str) -> String {
        let (plain, digested) = thread::scope(|scope| {
            let digested = scope.spawn(|| {
                let digest = guarded(self.guard.as_ref(), || self.primitives.digest(data));
                self.primitives.checksum(&digest)
            });
            let plain = scope.spawn(|| self.primitives.checksum(data));
            (join_task(plain), join_task(digested))
        });
        format!("{}{}{}", plain, SINGLE_HASH_SEPARATOR, digested)
    }
}

impl Stage for SingleHashStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, ctx: &StageContext<'_>) {
        self.dispatcher.for_each_item(ctx, |item: Item| {
            let data = item.canonical();
            let result = self.sign(&data);
            trace!(%data, %result, "single hash");
            ctx.emit(result);
        });
    }
}
