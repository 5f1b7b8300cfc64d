//! The stage abstraction and the per-stage context handed to it.

use crate::core::item::Item;
use crate::events::{Event, EventSender, StageEvent, StageState, StageSummary};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, trace, warn};

/// One unit of a pipeline.
///
/// `run` must consume `ctx.inputs()` until it ends and must not return
/// while any task it started is still running. The runner closes the
/// stage's output as soon as `run` returns, so anything emitted later
/// would be lost.
pub trait Stage: Send + Sync {
    /// Short name used in events and logs
    fn name(&self) -> &str;

    /// Process the whole input stream
    fn run(&self, ctx: &StageContext<'_>);
}

/// A stage backed by a plain function or closure
pub struct FnStage<F> {
    name: String,
    body: F,
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&StageContext<'_>) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &StageContext<'_>) {
        (self.body)(ctx)
    }
}

/// Wrap a closure as a boxed [`Stage`].
///
/// ```rust,ignore
/// let upper = stage_fn("upper", |ctx| {
///     for item in ctx.inputs() {
///         ctx.emit(item.canonical().to_uppercase());
///     }
/// });
/// ```
pub fn stage_fn<F>(name: impl Into<String>, body: F) -> Box<dyn Stage>
where
    F: Fn(&StageContext<'_>) + Send + Sync + 'static,
{
    Box::new(FnStage {
        name: name.into(),
        body,
    })
}

/// Everything a running stage can touch.
///
/// Shared by reference with every task the stage spawns, so all methods
/// take `&self`.
pub struct StageContext<'a> {
    name: &'a str,
    index: usize,
    input: &'a Receiver<Item>,
    output: &'a Sender<Item>,
    events: &'a EventSender,
    received: AtomicUsize,
    emitted: AtomicUsize,
    state: Mutex<StageState>,
}

impl<'a> StageContext<'a> {
    pub(crate) fn new(
        name: &'a str,
        index: usize,
        input: &'a Receiver<Item>,
        output: &'a Sender<Item>,
        events: &'a EventSender,
    ) -> Self {
        let ctx = Self {
            name,
            index,
            input,
            output,
            events,
            received: AtomicUsize::new(0),
            emitted: AtomicUsize::new(0),
            state: Mutex::new(StageState::WaitingForInput),
        };
        ctx.announce(StageState::WaitingForInput);
        ctx
    }

    /// Stage name
    pub fn name(&self) -> &str {
        self.name
    }

    /// Position of this stage in the pipeline, starting at 0
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current lifecycle state
    pub fn state(&self) -> StageState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocking iterator over the input channel.
    ///
    /// Ends once the upstream stage has closed its output and every item
    /// has been received.
    pub fn inputs(&self) -> Inputs<'_, 'a> {
        Inputs { ctx: self }
    }

    /// Write one result downstream, blocking while the output channel is full.
    pub fn emit(&self, item: impl Into<Item>) {
        match self.output.send(item.into()) {
            Ok(()) => {
                self.emitted.fetch_add(1, Ordering::SeqCst);
                self.events.send(Event::Stage(StageEvent::ItemEmitted {
                    stage: self.name.to_string(),
                    index: self.index,
                }));
            }
            Err(_) => {
                // Only happens when the downstream stage has already died.
                warn!(stage = self.name, "downstream receiver gone, dropping result");
            }
        }
    }

    /// Move forward to `next`; earlier or equal states are ignored.
    pub(crate) fn advance(&self, next: StageState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if next <= *state {
            return;
        }
        *state = next;
        drop(state);
        self.announce(next);
    }

    fn announce(&self, state: StageState) {
        trace!(stage = self.name, index = self.index, %state, "stage state changed");
        self.events.send(Event::Stage(StageEvent::StateChanged {
            stage: self.name.to_string(),
            index: self.index,
            state,
        }));
    }

    /// Called by the runner once `run` has returned.
    pub(crate) fn finish(self) -> StageSummary {
        self.advance(StageState::Draining);
        let summary = StageSummary {
            stage: self.name.to_string(),
            index: self.index,
            received: self.received.load(Ordering::SeqCst),
            emitted: self.emitted.load(Ordering::SeqCst),
        };
        debug!(
            stage = self.name,
            received = summary.received,
            emitted = summary.emitted,
            "stage finished"
        );
        summary
    }
}

/// Iterator returned by [`StageContext::inputs`]
pub struct Inputs<'c, 'a> {
    ctx: &'c StageContext<'a>,
}

impl Iterator for Inputs<'_, '_> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        match self.ctx.input.recv() {
            Ok(item) => {
                self.ctx.received.fetch_add(1, Ordering::SeqCst);
                self.ctx.advance(StageState::Processing);
                Some(item)
            }
            Err(_) => {
                self.ctx.advance(StageState::Draining);
                None
            }
        }
    }
}
