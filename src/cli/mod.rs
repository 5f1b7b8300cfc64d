//! # CLI Module
//!
//! Command-line interface for the signing pipeline.
//!
//! ## Usage
//! ```bash
//! # Sign items given on the command line
//! signer run 0 1 1 2 3 5 8
//!
//! # Read items from a file, one per line
//! signer run --input items.txt
//!
//! # Cap per-stage concurrency and emit JSON
//! seq 0 999 | signer run --max-in-flight 64 --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use signer_pipeline::core::hasher::{PrimitiveLatency, StandardPrimitives};
use signer_pipeline::core::item::{read_items, Item};
use signer_pipeline::core::pipeline::{HashPipeline, PipelineResult};
use signer_pipeline::core::stages::MultiHashStage;
use signer_pipeline::error::Result;
use signer_pipeline::events::{Event, EventChannel, PipelineEvent, StageEvent};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Signer - reduce a stream of items into one deterministic signature
#[derive(Parser, Debug)]
#[command(name = "signer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run items through the signing pipeline
    Run {
        /// Items to sign (read from --input or stdin when omitted)
        items: Vec<String>,

        /// File with one item per line
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Capacity of each inter-stage channel
        #[arg(long, default_value = "100")]
        capacity: usize,

        /// Sub-hashes per item in the multi-hash stage
        #[arg(long, default_value = "6")]
        width: usize,

        /// Limit concurrently processed items per stage (unbounded if omitted)
        #[arg(long)]
        max_in_flight: Option<usize>,

        /// Simulated latency per digest call, in milliseconds
        #[arg(long, default_value = "0")]
        digest_latency_ms: u64,

        /// Simulated latency per checksum call, in milliseconds
        #[arg(long, default_value = "0")]
        checksum_latency_ms: u64,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// The aggregate only
    Minimal,
}

/// Settings for one `run` invocation
struct RunOptions {
    capacity: usize,
    width: usize,
    max_in_flight: Option<usize>,
    latency: PrimitiveLatency,
    output: OutputFormat,
    verbose: bool,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            items,
            input,
            capacity,
            width,
            max_in_flight,
            digest_latency_ms,
            checksum_latency_ms,
            output,
            verbose,
        } => {
            signer_pipeline::init_tracing(if verbose { "debug" } else { "warn" });
            let items = collect_items(items, input)?;
            run_pipeline(
                items,
                RunOptions {
                    capacity,
                    width,
                    max_in_flight,
                    latency: PrimitiveLatency::from_millis(digest_latency_ms, checksum_latency_ms),
                    output,
                    verbose,
                },
            )
        }
    }
}

fn collect_items(args: Vec<String>, input: Option<PathBuf>) -> Result<Vec<Item>> {
    if !args.is_empty() {
        return Ok(args.iter().map(|arg| Item::parse(arg)).collect());
    }
    let items = match input {
        Some(path) => read_items(BufReader::new(File::open(path)?))?,
        None => read_items(io::stdin().lock())?,
    };
    Ok(items)
}

fn run_pipeline(items: Vec<Item>, options: RunOptions) -> Result<()> {
    let term = Term::stderr();
    let total = items.len();

    if matches!(options.output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Signer").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let pipeline = HashPipeline::builder()
        .channel_capacity(options.capacity)
        .multi_hash_width(options.width)
        .max_in_flight(options.max_in_flight)
        .primitives(Arc::new(StandardPrimitives::with_latency(options.latency)))
        .build()?;

    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if matches!(options.output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = options.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Stage(StageEvent::StateChanged { stage, state, .. }) => {
                    if let Some(ref pb) = progress_clone {
                        if verbose {
                            pb.println(format!("  {} {}", style(&stage).dim(), state));
                        }
                        pb.set_message(format!("{}: {}", stage, state));
                    }
                }
                Event::Stage(StageEvent::ItemEmitted { stage, .. })
                    if stage == MultiHashStage::NAME =>
                {
                    if let Some(ref pb) = progress_clone {
                        pb.inc(1);
                    }
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.finish_and_clear();
                    }
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(items, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = result?;
    match options.output {
        OutputFormat::Pretty => print_pretty_results(&term, &result, verbose),
        OutputFormat::Json => print_json_results(&result)?,
        OutputFormat::Minimal => println!("{}", result.aggregate),
    }

    Ok(())
}

fn print_pretty_results(term: &Term, result: &PipelineResult, verbose: bool) {
    term.write_line(&format!("{} Signing Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} items signed in {:.1}s",
        style(result.items).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();

    if verbose {
        term.write_line(&format!("  {} {}", style("run").dim(), result.run_id))
            .ok();
    }

    term.write_line("").ok();

    if result.aggregate.is_empty() {
        term.write_line(&format!("  {}", style("(empty aggregate: no items)").dim()))
            .ok();
    } else {
        println!("{}", result.aggregate);
    }
}

fn print_json_results(result: &PipelineResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
