use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use executor::{ExecutorConfig, Node};
use state::State;
use storage::Storage;
use tracing_subscriber::EnvFilter;
use types::{Block, Header, UInt160, UInt256};
use vm::ScriptContainer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Trigger {
    Application,
    Verification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Runs a single script against an empty ledger and prints its receipt
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Script bytes as hex, e.g. 53549366
    script: Option<String>,

    /// Read the raw script bytes from a file instead
    #[arg(short, long, conflicts_with = "script")]
    file: Option<PathBuf>,

    /// Executor config (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the gas limit, in 0.001 GAS units
    #[arg(long)]
    gas_limit: Option<u64>,

    /// Fault after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    #[arg(short, long, value_enum, default_value = "application")]
    trigger: Trigger,

    #[arg(long, value_enum, default_value = "text")]
    format: Format,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the script halted (or, for verification, passed).
fn run() -> Result<bool> {
    let args = Args::parse();

    let script = match (&args.script, &args.file) {
        (_, Some(path)) => {
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?
        }
        (Some(text), None) => {
            let text = text.trim().trim_start_matches("0x");
            hex::decode(text).context("script is not valid hex")?
        }
        (None, None) => anyhow::bail!("pass a hex script or --file"),
    };

    let mut config = match &args.config {
        Some(path) => ExecutorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ExecutorConfig::default(),
    };
    if let Some(gas_limit) = args.gas_limit {
        config = config.with_gas_limit(gas_limit);
    }
    if args.max_steps.is_some() {
        config = config.with_max_steps(args.max_steps);
    }

    let mut ledger = State::new();
    ledger.add_block(genesis());
    let mut node = Node::open(config, Arc::new(ledger), Arc::new(Storage::new()));

    let container = ScriptContainer::new(script);
    let succeeded = match args.trigger {
        Trigger::Verification => {
            let passed = node.executor()?.verify(container)?;
            match args.format {
                Format::Text => println!("Verification: {}", if passed { "passed" } else { "failed" }),
                Format::Json => println!("{}", serde_json::json!({ "passed": passed })),
            }
            passed
        }
        Trigger::Application => {
            let receipt = node.run_script(container)?;
            match args.format {
                Format::Text => print!("{}", receipt),
                Format::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
            }
            receipt.is_halt()
        }
    };

    node.stop()?;
    Ok(succeeded)
}

fn genesis() -> Block {
    Block {
        header: Header {
            hash: UInt256::zero(),
            version: 0,
            prev_hash: UInt256::zero(),
            merkle_root: UInt256::zero(),
            timestamp: 1_468_595_301,
            index: 0,
            consensus_data: 2_083_236_893,
            next_consensus: UInt160::zero(),
        },
        transactions: vec![],
    }
}
