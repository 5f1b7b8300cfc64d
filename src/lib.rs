//! # Signer Pipeline
//!
//! A concurrent staged hashing pipeline that turns a stream of items into
//! one deterministic signature.
//!
//! ## How It Works
//! - Every item is signed as `checksum(x) ~ checksum(digest(x))`
//! - Each of those is expanded into six index-prefixed checksums
//! - All results are sorted and joined with `_`
//!
//! The digest may only have one caller at a time anywhere in the process;
//! everything else runs as parallel as the input allows.
//!
//! ## Architecture
//! - `core` - Items, hash primitives, stages and the runner
//! - `events` - Stage lifecycle and progress events
//! - `error` - Error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{PipelineError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `default_filter`
/// applies when `RUST_LOG` is not set.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // A subscriber may already be installed (e.g. by an embedding app).
    let _ = tracing::subscriber::set_global_default(subscriber);
}
