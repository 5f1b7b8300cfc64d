//! # signer CLI
//!
//! Command-line front end for the signing pipeline.
//!
//! ## Usage
//! ```bash
//! signer run 0 1 1 2 3 5 8
//! seq 0 99 | signer run --output json
//! signer run --input items.txt --checksum-latency-ms 1000 --digest-latency-ms 10
//! ```

mod cli;

use signer_pipeline::Result;

fn main() -> Result<()> {
    cli::run()
}
