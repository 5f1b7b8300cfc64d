//! Stage 2: fixed-width parallel checksums over index-prefixed input.

use crate::core::hasher::HashPrimitives;
use crate::core::item::Item;
use crate::core::pipeline::{Dispatcher, FanOut, Stage, StageContext};
use crate::error::{ConfigError, PipelineError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::trace;

/// Default number of sub-hashes per item
pub const MULTI_HASH_WIDTH: usize = 6;

/// Emits `checksum("0"+data) ++ checksum("1"+data) ++ ...` for every item.
///
/// All `width` checksums of an item run at once. They finish in any order,
/// but the output always concatenates them by index.
pub struct MultiHashStage {
    primitives: Arc<dyn HashPrimitives>,
    width: usize,
    dispatcher: Dispatcher,
}

impl MultiHashStage {
    pub const NAME: &'static str = "multi_hash";

    /// Create a stage with the default width and unbounded fan-out
    pub fn new(primitives: Arc<dyn HashPrimitives>) -> Self {
        Self {
            primitives,
            width: MULTI_HASH_WIDTH,
            dispatcher: Dispatcher::Unbounded,
        }
    }

    /// Create a stage with an explicit width and fan-out policy
    pub fn with_options(
        primitives: Arc<dyn HashPrimitives>,
        width: usize,
        fan_out: FanOut,
    ) -> Result<Self, PipelineError> {
        if width == 0 {
            return Err(ConfigError::InvalidWidth { value: width }.into());
        }
        Ok(Self {
            primitives,
            width,
            dispatcher: Dispatcher::new(fan_out, Self::NAME)?,
        })
    }

    /// Number of sub-hashes per item
    pub fn width(&self) -> usize {
        self.width
    }

    /// Compute the multi-hash result for one canonical string.
    pub fn sign(&self, data: &str) -> String {
        // Keyed by sub-hash index; local to this item.
        let parts = Mutex::new(HashMap::with_capacity(self.width));

        thread::scope(|scope| {
            for index in 0..self.width {
                let parts = &parts;
                scope.spawn(move || {
                    let hash = self.primitives.checksum(&format!("{}{}", index, data));
                    parts
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(index, hash);
                });
            }
        });

        let parts = parts.into_inner().unwrap_or_else(PoisonError::into_inner);
        (0..self.width)
            .filter_map(|index| parts.get(&index))
            .map(String::as_str)
            .collect()
    }
}

impl Stage for MultiHashStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, ctx: &StageContext<'_>) {
        self.dispatcher.for_each_item(ctx, |item: Item| {
            let data = item.canonical();
            let result = self.sign(&data);
            trace!(%data, %result, "multi hash");
            ctx.emit(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::PipelineRunner;
    use std::time::Duration;

    struct Labelled;

    impl HashPrimitives for Labelled {
        fn digest(&self, data: &str) -> String {
            format!("D({})", data)
        }

        fn checksum(&self, data: &str) -> String {
            format!("[{}]", data)
        }
    }

    /// Lower indices finish last, so completion order is reversed
    struct ReverseSlow;

    impl HashPrimitives for ReverseSlow {
        fn digest(&self, data: &str) -> String {
            data.to_string()
        }

        fn checksum(&self, data: &str) -> String {
            let index: u64 = data[..1].parse().unwrap_or(0);
            thread::sleep(Duration::from_millis((6 - index.min(5)) * 10));
            format!("<{}>", &data[..1])
        }
    }

    #[test]
    fn item_zero_concatenates_prefixed_checksums() {
        let stage = MultiHashStage::new(Arc::new(Labelled));
        assert_eq!(stage.sign("0"), "[00][10][20][30][40][50]");
    }

    #[test]
    fn order_is_by_index_not_completion() {
        let stage = MultiHashStage::new(Arc::new(ReverseSlow));
        assert_eq!(stage.sign("x"), "<0><1><2><3><4><5>");
    }

    #[test]
    fn width_is_configurable() {
        let stage =
            MultiHashStage::with_options(Arc::new(Labelled), 3, FanOut::Unbounded).unwrap();
        assert_eq!(stage.width(), 3);
        assert_eq!(stage.sign("a"), "[0a][1a][2a]");
    }

    #[test]
    fn zero_width_is_rejected() {
        let result = MultiHashStage::with_options(Arc::new(Labelled), 0, FanOut::Unbounded);
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::InvalidWidth { value: 0 }))
        ));
    }

    #[test]
    fn stage_emits_one_result_per_item() {
        let runner = PipelineRunner::new(4).unwrap();
        let stages = vec![Box::new(MultiHashStage::new(Arc::new(Labelled))) as Box<dyn Stage>];

        let outputs = runner.run_items(vec!["p", "q"], &stages).unwrap();

        assert_eq!(outputs.len(), 2);
        assert!(outputs.contains(&Item::from("[0p][1p][2p][3p][4p][5p]")));
        assert!(outputs.contains(&Item::from("[0q][1q][2q][3q][4q][5q]")));
    }
}
