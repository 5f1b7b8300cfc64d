//! # Hasher Module
//!
//! The hash primitives the stages are built from, and the guard that keeps
//! digest calls exclusive.
//!
//! ## Primitives
//! - **digest** - collision-resistant, safe for one caller process-wide
//! - **checksum** - fast, callable from any number of threads
//!
//! Both are injected into the stages as trait objects, so tests can swap in
//! instrumented versions.
//!
//! ## Example
//! ```rust,ignore
//! use signer_pipeline::core::hasher::{guarded, DigestLock, HashPrimitives, StandardPrimitives};
//!
//! let primitives = StandardPrimitives::new();
//! let lock = DigestLock::global();
//!
//! let digest = guarded(lock.as_ref(), || primitives.digest("0"));
//! let signature = primitives.checksum(&digest);
//! ```

mod guard;
mod standard;
mod traits;

pub use guard::DigestLock;
pub use standard::{PrimitiveLatency, StandardPrimitives};
pub use traits::{guarded, ExclusionGuard, HashPrimitives};
