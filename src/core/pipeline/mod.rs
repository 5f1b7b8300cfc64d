//! # Pipeline Module
//!
//! Runs stages concurrently over a chain of bounded channels.
//!
//! ## Shutdown
//! A stage reads its input until the upstream channel closes, waits for
//! every task it spawned, and returns. The runner then drops the stage's
//! output sender, which is what closes the next channel. Nothing else ever
//! closes a channel, so each one closes exactly once and only after its
//! producer is done.
//!
//! ## Parallelism
//! One thread per stage. Inside a stage, each item gets its own scoped
//! thread by default, or a slot on a rayon pool when fan-out is bounded.

mod dispatch;
mod executor;
mod runner;
mod stage;

pub use dispatch::{join_task, Dispatcher, FanOut};
pub use executor::{HashPipeline, HashPipelineBuilder, PipelineConfig, PipelineResult};
pub use runner::{PipelineRunner, MAX_INPUT_ITEMS};
pub use stage::{stage_fn, FnStage, Inputs, Stage, StageContext};
