//! Default hash primitives: SHA-256 digest and XXH3 checksum.

use super::HashPrimitives;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::thread;
use std::time::Duration;
use xxhash_rust::xxh3::xxh3_64;

/// Artificial delay added to each primitive call.
///
/// The pipeline exists to hide the latency of a slow external signer;
/// setting these lets demos and tests reproduce that cost locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveLatency {
    /// Delay per digest call (paid while holding the digest guard)
    pub digest: Duration,
    /// Delay per checksum call
    pub checksum: Duration,
}

impl PrimitiveLatency {
    /// No added delay
    pub fn none() -> Self {
        Self::default()
    }

    /// Latency from millisecond values
    pub fn from_millis(digest_ms: u64, checksum_ms: u64) -> Self {
        Self {
            digest: Duration::from_millis(digest_ms),
            checksum: Duration::from_millis(checksum_ms),
        }
    }
}

/// SHA-256 (lowercase hex) digest and XXH3-64 (decimal) checksum
#[derive(Debug, Clone, Default)]
pub struct StandardPrimitives {
    latency: PrimitiveLatency,
}

impl StandardPrimitives {
    /// Create primitives with no added latency
    pub fn new() -> Self {
        Self::default()
    }

    /// Create primitives that sleep before answering
    pub fn with_latency(latency: PrimitiveLatency) -> Self {
        Self { latency }
    }

    /// The configured latency
    pub fn latency(&self) -> PrimitiveLatency {
        self.latency
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

impl HashPrimitives for StandardPrimitives {
    fn digest(&self, data: &str) -> String {
        pause(self.latency.digest);
        Sha256::digest(data.as_bytes())
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    fn checksum(&self, data: &str) -> String {
        pause(self.latency.checksum);
        xxh3_64(data.as_bytes()).to_string()
    }
}
