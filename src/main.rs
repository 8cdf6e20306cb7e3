use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use settlement_engine::application::config::{DEFAULT_WORKERS, EngineConfig, FailurePolicy};
use settlement_engine::application::engine::SettlementEngine;
use settlement_engine::domain::transfer::SettlementSummary;
use settlement_engine::infrastructure::in_memory::InMemoryLedger;
use settlement_engine::interfaces::csv::account_reader::AccountReader;
use settlement_engine::interfaces::csv::report_writer::{BalanceWriter, OutcomeWriter};
use settlement_engine::interfaces::csv::transfer_reader::TransferReader;
use settlement_engine::telemetry;
use std::fs::File;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReportFormat {
    Csv,
    Json,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Accounts CSV file (`id,name,balance`)
    #[arg(long)]
    accounts: PathBuf,

    /// Transfers CSV file (`from,to,amount`)
    #[arg(long)]
    transfers: PathBuf,

    /// Number of concurrent settlement workers
    #[arg(long, env = "SETTLE_WORKERS", default_value_t = DEFAULT_WORKERS)]
    workers: NonZeroUsize,

    /// Stop applying transfers after the first failure
    #[arg(long)]
    fail_fast: bool,

    /// Write per-transfer outcomes to this CSV file
    #[arg(long)]
    outcomes: Option<PathBuf>,

    /// Format of the final balance report written to stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Csv)]
    format: ReportFormat,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_json);

    let policy = if cli.fail_fast {
        FailurePolicy::FailFast
    } else {
        FailurePolicy::ContinueOnError
    };
    let config = EngineConfig::default()
        .with_workers(cli.workers)
        .with_failure_policy(policy);
    let engine = SettlementEngine::new(Box::new(InMemoryLedger::new()), config);
    info!(
        "Using {} workers ({:?})",
        engine.config().workers,
        engine.config().failure_policy
    );

    // Register accounts
    let file = File::open(&cli.accounts).into_diagnostic()?;
    for record in AccountReader::new(file).accounts() {
        match record {
            Ok(account) => {
                if let Err(e) = engine
                    .register_account(account.id, account.name, account.balance)
                    .await
                {
                    warn!("Error registering account: {}", e);
                }
            }
            Err(e) => warn!("Error reading account: {}", e),
        }
    }

    // Queue transfers
    let file = File::open(&cli.transfers).into_diagnostic()?;
    for record in TransferReader::new(file).transfers() {
        match record {
            Ok(transfer) => {
                if let Err(e) = engine
                    .submit_transfer(transfer.from, transfer.to, transfer.amount)
                    .await
                {
                    warn!("Error submitting transfer: {}", e);
                }
            }
            Err(e) => warn!("Error reading transfer: {}", e),
        }
    }

    let outcomes = engine.settle().await;
    let summary = SettlementSummary::from_outcomes(&outcomes);
    info!(
        "Settled {} transfers: {} applied, {} failed",
        summary.total(),
        summary.applied,
        summary.failed
    );

    if let Some(path) = cli.outcomes {
        let file = File::create(path).into_diagnostic()?;
        OutcomeWriter::new(file).write_outcomes(&outcomes)?;
    }

    let accounts = engine.accounts().await?;
    let stdout = io::stdout();
    match cli.format {
        ReportFormat::Csv => BalanceWriter::new(stdout.lock()).write_accounts(&accounts)?,
        ReportFormat::Json => {
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &accounts).into_diagnostic()?;
            writeln!(out).into_diagnostic()?;
        }
    }

    Ok(())
}
