//! Footprint CLI - encode, hash and decode canonical footprints, and inspect cache stores.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod input;
mod json;
mod output;

use commands::{decode, encode, hash, inspect};

#[derive(Parser)]
#[command(name = "footprint")]
#[command(about = "Canonical binary footprints for JSON documents and cache stores")]
struct Cli {
    /// Log debug events to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the hex footprint of input JSON
    Encode {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
    },
    /// Print the SHA-256 of the footprint of input JSON
    Hash {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Print base64url instead of hex
        #[arg(long)]
        b64: bool,
    },
    /// Render a hex footprint as a value
    Decode {
        /// Input hex file (or stdin if not provided)
        input: Option<String>,
    },
    /// List the entries of a cache store file
    Inspect {
        /// Path to a `.fpc` store file
        store: String,
        /// Fail on a truncated tail instead of ignoring it
        #[arg(long)]
        strict: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Encode { input } => encode::run(input),
        Commands::Hash { input, b64 } => hash::run(input, b64),
        Commands::Decode { input } => decode::run(input),
        Commands::Inspect { store, strict } => inspect::run(store, strict),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
