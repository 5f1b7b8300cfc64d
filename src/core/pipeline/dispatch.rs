//! Per-item fan-out inside a stage.

use super::StageContext;
use crate::core::item::Item;
use crate::error::{ConfigError, PipelineError};
use serde::{Deserialize, Serialize};
use std::panic;
use std::thread::{self, ScopedJoinHandle};

/// How many items a stage may process at the same time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FanOut {
    /// One task per received item, with no upper limit.
    ///
    /// A burst of N items means N simultaneous threads in the stage. The
    /// bounded channels in front of the stage limit how fast items arrive,
    /// not how many are in flight.
    #[default]
    Unbounded,
    /// At most this many items in flight, run on a dedicated worker pool.
    ///
    /// Items beyond the limit are queued in memory until a worker frees up.
    Bounded(usize),
}

impl FanOut {
    /// `None` means unbounded
    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(n) => FanOut::Bounded(n),
            None => FanOut::Unbounded,
        }
    }

    /// Reject a zero-sized pool
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            FanOut::Bounded(0) => Err(ConfigError::InvalidInFlightLimit { value: 0 }),
            _ => Ok(()),
        }
    }
}

/// Runs one task per input item according to a [`FanOut`] policy.
pub enum Dispatcher {
    Unbounded,
    Pool(rayon::ThreadPool),
}

impl Dispatcher {
    /// Build a dispatcher; `label` names the worker threads of a bounded pool.
    pub fn new(fan_out: FanOut, label: &str) -> Result<Self, PipelineError> {
        fan_out.validate()?;
        match fan_out {
            FanOut::Unbounded => Ok(Dispatcher::Unbounded),
            FanOut::Bounded(workers) => {
                let label = label.to_string();
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(move |i| format!("{}-worker-{}", label, i))
                    .build()?;
                Ok(Dispatcher::Pool(pool))
            }
        }
    }

    /// Receive every input item and run `task` on it concurrently.
    ///
    /// Returns only after the input is exhausted and every task has
    /// finished. A panicking task re-raises its panic here.
    pub fn for_each_item<F>(&self, ctx: &StageContext<'_>, task: F)
    where
        F: Fn(Item) + Sync,
    {
        let task = &task;
        match self {
            Dispatcher::Unbounded => thread::scope(|scope| {
                for item in ctx.inputs() {
                    scope.spawn(move || task(item));
                }
            }),
            Dispatcher::Pool(pool) => pool.in_place_scope(|scope| {
                for item in ctx.inputs() {
                    scope.spawn(move |_| task(item));
                }
            }),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatcher::Unbounded => write!(f, "Dispatcher::Unbounded"),
            Dispatcher::Pool(pool) => write!(f, "Dispatcher::Pool({})", pool.current_num_threads()),
        }
    }
}

/// Join a scoped sub-task, re-raising its panic on the caller.
pub fn join_task<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::null_sender;
    use crossbeam_channel::bounded;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn run_dispatch(dispatcher: &Dispatcher, count: i64) -> (usize, usize) {
        let events = null_sender();
        let (in_tx, in_rx) = bounded(count as usize + 1);
        let (out_tx, out_rx) = bounded(count as usize + 1);
        for n in 0..count {
            in_tx.send(Item::Int(n)).unwrap();
        }
        drop(in_tx);

        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let ctx = StageContext::new("test", 0, &in_rx, &out_tx, &events);
        dispatcher.for_each_item(&ctx, |item| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            ctx.emit(item);
        });
        drop(ctx);

        (out_rx.try_iter().count(), peak.load(Ordering::SeqCst))
    }

    #[test]
    fn unbounded_runs_items_concurrently() {
        let (emitted, peak) = run_dispatch(&Dispatcher::Unbounded, 8);
        assert_eq!(emitted, 8);
        assert!(peak > 1, "expected overlap, peak was {}", peak);
    }

    #[test]
    fn bounded_pool_caps_in_flight_items() {
        let dispatcher = Dispatcher::new(FanOut::Bounded(2), "capped").unwrap();
        let (emitted, peak) = run_dispatch(&dispatcher, 8);
        assert_eq!(emitted, 8);
        assert!(peak <= 2, "peak {} exceeded pool size", peak);
    }

    #[test]
    fn zero_sized_pool_is_rejected() {
        let result = Dispatcher::new(FanOut::Bounded(0), "empty");
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::InvalidInFlightLimit { value: 0 }))
        ));
    }

    #[test]
    fn from_limit_maps_none_to_unbounded() {
        assert_eq!(FanOut::from_limit(None), FanOut::Unbounded);
        assert_eq!(FanOut::from_limit(Some(4)), FanOut::Bounded(4));
    }

    #[test]
    #[should_panic]
    fn task_panics_propagate() {
        let events = null_sender();
        let (in_tx, in_rx) = bounded(1);
        let (out_tx, _out_rx) = bounded::<Item>(1);
        in_tx.send(Item::Int(1)).unwrap();
        drop(in_tx);

        let ctx = StageContext::new("boom", 0, &in_rx, &out_tx, &events);
        Dispatcher::Unbounded.for_each_item(&ctx, |_| panic!("task failed"));
    }
}
