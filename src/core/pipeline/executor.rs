//! The signing pipeline: SingleHash -> MultiHash -> Combine.

use super::{FanOut, PipelineRunner, Stage, MAX_INPUT_ITEMS};
use crate::core::hasher::{DigestLock, ExclusionGuard, HashPrimitives, StandardPrimitives};
use crate::core::item::Item;
use crate::core::stages::{CombineStage, MultiHashStage, SingleHashStage, MULTI_HASH_WIDTH};
use crate::error::{ConfigError, PipelineError};
use crate::events::{null_sender, EventSender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span};
use uuid::Uuid;

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Identifier of this run, also recorded on its tracing span
    pub run_id: Uuid,
    /// The sorted, `_`-joined multi-hash results
    pub aggregate: String,
    /// Number of input items
    pub items: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of every inter-stage channel
    pub channel_capacity: usize,
    /// Sub-hashes per item in the multi-hash stage
    pub multi_hash_width: usize,
    /// Per-item concurrency of the two hashing stages
    pub fan_out: FanOut,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: MAX_INPUT_ITEMS,
            multi_hash_width: MULTI_HASH_WIDTH,
            fan_out: FanOut::Unbounded,
        }
    }
}

impl PipelineConfig {
    /// Check every value before any thread or pool is created
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                value: self.channel_capacity,
            });
        }
        if self.multi_hash_width == 0 {
            return Err(ConfigError::InvalidWidth {
                value: self.multi_hash_width,
            });
        }
        self.fan_out.validate()
    }
}

/// Builder for pipeline configuration
pub struct HashPipelineBuilder {
    config: PipelineConfig,
    primitives: Option<Arc<dyn HashPrimitives>>,
    guard: Option<Arc<dyn ExclusionGuard>>,
}

impl HashPipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            primitives: None,
            guard: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the inter-stage channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Set the number of sub-hashes per item
    pub fn multi_hash_width(mut self, width: usize) -> Self {
        self.config.multi_hash_width = width;
        self
    }

    /// Set the per-item fan-out policy
    pub fn fan_out(mut self, fan_out: FanOut) -> Self {
        self.config.fan_out = fan_out;
        self
    }

    /// Limit in-flight items per stage; `None` keeps fan-out unbounded
    pub fn max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.config.fan_out = FanOut::from_limit(limit);
        self
    }

    /// Set the hash primitives
    pub fn primitives(mut self, primitives: Arc<dyn HashPrimitives>) -> Self {
        self.primitives = Some(primitives);
        self
    }

    /// Set the guard that serializes digest calls.
    ///
    /// Defaults to [`DigestLock::global`], shared by every pipeline in the
    /// process. A custom guard only excludes the pipelines that share it.
    pub fn guard(mut self, guard: Arc<dyn ExclusionGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<HashPipeline, PipelineError> {
        self.config.validate()?;

        let primitives = self
            .primitives
            .unwrap_or_else(|| Arc::new(StandardPrimitives::new()));
        let guard: Arc<dyn ExclusionGuard> = match self.guard {
            Some(guard) => guard,
            None => DigestLock::global(),
        };

        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(SingleHashStage::with_fan_out(
                Arc::clone(&primitives),
                guard,
                self.config.fan_out,
            )?),
            Box::new(MultiHashStage::with_options(
                primitives,
                self.config.multi_hash_width,
                self.config.fan_out,
            )?),
            Box::new(CombineStage::new()),
        ];

        Ok(HashPipeline {
            runner: PipelineRunner::new(self.config.channel_capacity)?,
            config: self.config,
            stages,
        })
    }
}

impl Default for HashPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The signing pipeline
///
/// Stages are built once and reused, so a pipeline can run many times.
pub struct HashPipeline {
    config: PipelineConfig,
    runner: PipelineRunner,
    stages: Vec<Box<dyn Stage>>,
}

impl HashPipeline {
    /// Create a new pipeline builder
    pub fn builder() -> HashPipelineBuilder {
        HashPipelineBuilder::new()
    }

    /// The validated configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run the pipeline without events
    pub fn run<I, T>(&self, items: I) -> Result<PipelineResult, PipelineError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        self.run_with_events(items, &null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events<I, T>(
        &self,
        items: I,
        events: &EventSender,
    ) -> Result<PipelineResult, PipelineError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        let start_time = Instant::now();
        let items: Vec<Item> = items.into_iter().map(Into::into).collect();
        let item_count = items.len();

        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id);
        let _entered = span.enter();
        info!(items = item_count, "signing run started");

        let runner = self.runner.clone().with_events(events.clone());
        let mut outputs = runner.run_items(items, &self.stages)?;

        let aggregate = match outputs.len() {
            1 => outputs.remove(0).canonical(),
            count => return Err(PipelineError::UnexpectedOutput { count }),
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(duration_ms, "signing run completed");

        Ok(PipelineResult {
            run_id,
            aggregate,
            items: item_count,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_settings() {
        let pipeline = HashPipeline::builder()
            .channel_capacity(10)
            .multi_hash_width(4)
            .max_in_flight(Some(3))
            .build()
            .unwrap();

        assert_eq!(pipeline.config().channel_capacity, 10);
        assert_eq!(pipeline.config().multi_hash_width, 4);
        assert_eq!(pipeline.config().fan_out, FanOut::Bounded(3));
        assert_eq!(
            pipeline.stage_names(),
            vec!["single_hash", "multi_hash", "combine"]
        );
    }

    #[test]
    fn default_config_matches_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.channel_capacity, MAX_INPUT_ITEMS);
        assert_eq!(config.multi_hash_width, 6);
        assert_eq!(config.fan_out, FanOut::Unbounded);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_config_fails_build() {
        let result = HashPipeline::builder().channel_capacity(0).build();
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::InvalidCapacity { value: 0 }))
        ));

        let result = HashPipeline::builder().fan_out(FanOut::Bounded(0)).build();
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::InvalidInFlightLimit { value: 0 }))
        ));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"fan_out":{"Bounded":8}}"#).unwrap();
        assert_eq!(config.fan_out, FanOut::Bounded(8));
        assert_eq!(config.channel_capacity, MAX_INPUT_ITEMS);
    }

    #[test]
    fn empty_run_yields_empty_aggregate() {
        let pipeline = HashPipeline::builder().build().unwrap();
        let result = pipeline.run(Vec::<Item>::new()).unwrap();

        assert_eq!(result.items, 0);
        assert_eq!(result.aggregate, "");
    }

    #[test]
    fn result_is_serializable() {
        let pipeline = HashPipeline::builder().build().unwrap();
        let result = pipeline.run(vec![0i64, 1]).unwrap();

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(&result.aggregate));
        assert!(json.contains("\"items\":2"));
    }
}
