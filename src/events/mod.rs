//! # Events Module
//!
//! Progress reporting for pipeline runs.
//!
//! ## Design
//! The runner and every stage emit events through a shared channel, so a
//! caller can watch stages move through their lifecycle without touching
//! the data channels.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Stage(StageEvent::StateChanged { stage, state, .. }) = event {
//!             println!("{stage}: {state}");
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(items, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
