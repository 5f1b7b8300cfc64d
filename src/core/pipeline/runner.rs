//! Generic stage runner: bounded channels between stages, one thread per stage.

use super::{Stage, StageContext};
use crate::core::item::Item;
use crate::error::{ConfigError, PipelineError};
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelineSummary, StageEvent, StageState,
};
use crossbeam_channel::{bounded, Receiver};
use std::thread;
use std::time::Instant;
use tracing::{debug, trace};

/// Default capacity of every inter-stage channel
pub const MAX_INPUT_ITEMS: usize = 100;

/// Wires an ordered list of stages into a chain and runs them.
///
/// Stage *k* reads the output channel of stage *k-1* (stage 0 reads the
/// caller's source). The runner owns every output sender and drops it the
/// moment its stage returns, which is the only way a channel gets closed.
#[derive(Clone)]
pub struct PipelineRunner {
    capacity: usize,
    events: EventSender,
}

impl PipelineRunner {
    /// Create a runner whose channels hold up to `capacity` items
    pub fn new(capacity: usize) -> Result<Self, PipelineError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity { value: capacity }.into());
        }
        Ok(Self {
            capacity,
            events: null_sender(),
        })
    }

    /// Report stage and pipeline events to `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `stages` over `source` and return everything the last stage emitted.
    ///
    /// The source is closed by dropping its `Sender`. Blocks until every
    /// stage has drained its input and closed its output. A panic in any
    /// stage propagates out of this call.
    pub fn execute(
        &self,
        source: Receiver<Item>,
        stages: &[Box<dyn Stage>],
    ) -> Result<Vec<Item>, PipelineError> {
        if stages.is_empty() {
            return Err(PipelineError::NoStages);
        }

        let start = Instant::now();
        self.events.send(Event::Pipeline(PipelineEvent::Started {
            stages: stages.len(),
        }));
        debug!(stages = stages.len(), capacity = self.capacity, "pipeline started");

        let outputs = thread::scope(|scope| -> Result<Vec<Item>, PipelineError> {
            let mut input = source;

            for (index, stage) in stages.iter().enumerate() {
                let (output, next_input) = bounded::<Item>(self.capacity);
                let stage_input = std::mem::replace(&mut input, next_input);
                let events = self.events.clone();

                thread::Builder::new()
                    .name(format!("stage-{}-{}", index, stage.name()))
                    .spawn_scoped(scope, move || {
                        let name = stage.name();
                        let ctx = StageContext::new(name, index, &stage_input, &output, &events);
                        stage.run(&ctx);
                        let summary = ctx.finish();

                        // Closing order: the output goes first, then the event.
                        drop(output);
                        drop(stage_input);
                        trace!(stage = name, index, "stage output closed");
                        events.send(Event::Stage(StageEvent::StateChanged {
                            stage: name.to_string(),
                            index,
                            state: StageState::Closed,
                        }));
                        events.send(Event::Stage(StageEvent::Completed(summary)));
                    })
                    .map_err(|source| PipelineError::Spawn {
                        stage: stage.name().to_string(),
                        source,
                    })?;
            }

            // `input` is now the last stage's output.
            Ok(input.iter().collect())
        })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(outputs = outputs.len(), duration_ms, "pipeline completed");
        self.events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                stages: stages.len(),
                outputs: outputs.len(),
                duration_ms,
            },
        }));

        Ok(outputs)
    }

    /// Feed `items` into the first stage from a separate thread, then run.
    ///
    /// The feeder closes the source after its last write.
    pub fn run_items<I, T>(
        &self,
        items: I,
        stages: &[Box<dyn Stage>],
    ) -> Result<Vec<Item>, PipelineError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send,
        T: Into<Item>,
    {
        let (source, receiver) = bounded::<Item>(self.capacity);
        let items = items.into_iter();

        thread::scope(|scope| {
            scope.spawn(move || {
                for item in items {
                    if source.send(item.into()).is_err() {
                        // First stage is gone; the run is already failing.
                        break;
                    }
                }
            });
            self.execute(receiver, stages)
        })
    }
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::stage_fn;
    use crate::events::EventChannel;

    fn doubler() -> Box<dyn Stage> {
        stage_fn("double", |ctx| {
            for item in ctx.inputs() {
                if let Item::Int(n) = item {
                    ctx.emit(n * 2);
                }
            }
        })
    }

    fn collector() -> Box<dyn Stage> {
        stage_fn("sum", |ctx| {
            let total: i64 = ctx
                .inputs()
                .filter_map(|item| match item {
                    Item::Int(n) => Some(n),
                    Item::Text(_) => None,
                })
                .sum();
            ctx.emit(total);
        })
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            PipelineRunner::new(0),
            Err(PipelineError::Config(ConfigError::InvalidCapacity { value: 0 }))
        ));
    }

    #[test]
    fn empty_stage_list_is_rejected() {
        let runner = PipelineRunner::new(4).unwrap();
        let (_tx, rx) = bounded(1);
        assert!(matches!(runner.execute(rx, &[]), Err(PipelineError::NoStages)));
    }

    #[test]
    fn stages_are_chained_in_order() {
        let runner = PipelineRunner::new(4).unwrap();
        let stages = vec![doubler(), doubler(), collector()];

        let outputs = runner.run_items(1..=10i64, &stages).unwrap();

        assert_eq!(outputs, vec![Item::Int(220)]);
    }

    #[test]
    fn more_items_than_capacity_do_not_deadlock() {
        let runner = PipelineRunner::new(1).unwrap();
        let stages = vec![doubler()];

        let outputs = runner.run_items(0..500i64, &stages).unwrap();

        assert_eq!(outputs.len(), 500);
    }

    #[test]
    fn source_stage_can_ignore_empty_input() {
        let runner = PipelineRunner::new(8).unwrap();
        let stages = vec![
            stage_fn("source", |ctx| {
                for n in [3i64, 1, 2] {
                    ctx.emit(n);
                }
            }),
            collector(),
        ];

        let (tx, rx) = bounded(1);
        drop(tx);
        let outputs = runner.execute(rx, &stages).unwrap();

        assert_eq!(outputs, vec![Item::Int(6)]);
    }

    #[test]
    fn every_stage_reports_closed_once() {
        let (events, receiver) = EventChannel::new();
        let runner = PipelineRunner::new(2).unwrap().with_events(events);
        let stages = vec![doubler(), collector()];

        runner.run_items(vec![1i64, 2, 3], &stages).unwrap();
        drop(runner);

        let mut closed = vec![0usize; 2];
        let mut completed = false;
        for event in receiver.iter() {
            match event {
                Event::Stage(StageEvent::StateChanged {
                    index,
                    state: StageState::Closed,
                    ..
                }) => closed[index] += 1,
                Event::Pipeline(PipelineEvent::Completed { summary }) => {
                    assert_eq!(summary.outputs, 1);
                    completed = true;
                }
                _ => {}
            }
        }

        assert_eq!(closed, vec![1, 1]);
        assert!(completed);
    }

    #[test]
    #[should_panic]
    fn stage_panic_aborts_the_run() {
        let runner = PipelineRunner::new(2).unwrap();
        let stages = vec![stage_fn("broken", |ctx| {
            for _ in ctx.inputs() {
                panic!("primitive failed");
            }
        })];

        let _ = runner.run_items(vec![1i64], &stages);
    }
}
