//! # Core Module
//!
//! The signing engine, independent of any front end.
//!
//! ## Modules
//! - `item` - Values carried between stages
//! - `hasher` - Digest and checksum primitives, and the digest guard
//! - `pipeline` - Generic stage runner and the assembled signing pipeline
//! - `stages` - SingleHash, MultiHash and Combine

pub mod hasher;
pub mod item;
pub mod pipeline;
pub mod stages;

// Re-export commonly used types
pub use hasher::{DigestLock, ExclusionGuard, HashPrimitives, StandardPrimitives};
pub use item::Item;
pub use pipeline::{HashPipeline, PipelineConfig, PipelineResult, PipelineRunner, Stage};
