//! # Stages Module
//!
//! The three stages of the signing pipeline.
//!
//! ## Flow
//! 1. **SingleHash** - `checksum(x) ~ checksum(digest(x))` per item
//! 2. **MultiHash** - six index-prefixed checksums per item, in index order
//! 3. **Combine** - sort all results, join with `_`
//!
//! Stages 1 and 2 fan each item out to its own task, so their output order
//! is arbitrary. Only stage 3's sort makes the final result deterministic.

mod combine;
mod multi;
mod single;

pub use combine::{CombineStage, COMBINE_SEPARATOR};
pub use multi::{MultiHashStage, MULTI_HASH_WIDTH};
pub use single::{SingleHashStage, SINGLE_HASH_SEPARATOR};
