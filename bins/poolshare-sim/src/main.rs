//! poolshare-sim: replay vault scenarios and produce relayed-claim signatures.
//!
//! `run` replays a JSON scenario against an in-memory token and prints the
//! final report as JSON. `sign` produces a claim request a relayer can
//! submit. `inspect` decodes and validates a binary snapshot.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use poolshare_core::eip712::ClaimMessage;
use poolshare_core::types::{Address, ClaimRequest};
use poolshare_ledger::{VaultConfig, VaultSnapshot};

use crate::scenario::{parse_secret, replay, Scenario};

/// PoolShare vault simulator.
#[derive(Parser, Debug)]
#[command(name = "poolshare-sim", version, about = "Replay pooled-payout vault scenarios")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scenario file and print the final report.
    Run(RunArgs),
    /// Sign a relayed claim request.
    Sign(SignArgs),
    /// Decode and validate a binary snapshot.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the scenario JSON.
    #[arg(short, long)]
    scenario: PathBuf,

    /// Abort on the first failing step.
    #[arg(long)]
    strict: bool,

    /// Also write the final snapshot in binary form.
    #[arg(long)]
    snapshot_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SignArgs {
    /// Vault config JSON carrying the signing domain (defaults if omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hex-encoded 32-byte secret key of the beneficiary.
    #[arg(long)]
    secret: String,

    /// Who receives the payout.
    #[arg(short, long)]
    recipient: Address,

    /// The beneficiary's live nonce.
    #[arg(short, long, default_value_t = 0)]
    nonce: u64,

    /// Unix seconds after which the request is rejected.
    #[arg(short, long)]
    deadline: u64,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Path to a snapshot written by `run --snapshot-out`.
    snapshot: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::Sign(args) => cmd_sign(args),
        Commands::Inspect(args) => cmd_inspect(args),
    }
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let report = replay(scenario, args.strict)?;
    info!(
        steps = report.steps.len(),
        failed = report.failed_steps,
        vault_balance = report.vault_balance,
        "scenario finished"
    );

    if let Some(path) = args.snapshot_out {
        let bytes = report.snapshot.to_bytes()?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        info!(path = %path.display(), "snapshot written");
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_sign(args: SignArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            VaultConfig::from_json(&json).context("invalid config JSON")?
        }
        None => VaultConfig::default(),
    };
    let request = sign_request(&config, &args.secret, args.recipient, args.nonce, args.deadline)?;
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

fn sign_request(
    config: &VaultConfig,
    secret: &str,
    recipient: Address,
    nonce: u64,
    deadline: u64,
) -> Result<ClaimRequest> {
    let kp = parse_secret(secret)?;
    let message = ClaimMessage {
        beneficiary: kp.address(),
        recipient,
        nonce,
        deadline,
    };
    let digest = message.digest(&config.domain.separator());
    let signature = kp.sign_prehash(&digest).context("signing failed")?;
    info!(beneficiary = %kp.address(), %recipient, nonce, deadline, "claim signed");
    Ok(ClaimRequest {
        beneficiary: kp.address(),
        recipient,
        deadline,
        signature,
    })
}

fn cmd_inspect(args: InspectArgs) -> Result<()> {
    let bytes = std::fs::read(&args.snapshot)
        .with_context(|| format!("failed to read snapshot {}", args.snapshot.display()))?;
    let snapshot = VaultSnapshot::from_bytes(&bytes)?;
    snapshot.validate().context("snapshot violates ledger invariants")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Initialize tracing with the given level and format.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    // Logs go to stderr; stdout carries the JSON output.
    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
