use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use record_ledger::clock::SystemClock;
use record_ledger::config::RecordLedgerConfig;
use record_ledger::index::IndexedRecordStore;
use record_ledger::ledger::SledLedger;
use record_ledger::service::RecordService;
use record_ledger::telemetry::init_telemetry;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "record-ledger")]
#[command(about = "Fraud entries and SLA contracts over a local ledger")]
struct Cli {
    /// Ledger database directory, overrides the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Configuration file, defaults to ./record-ledger.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one operation and print its payload to stdout
    Invoke {
        operation: String,
        args: Vec<String>,
    },
    /// List stored keys and values
    Dump {
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// List the operation names `invoke` accepts
    Ops,
    /// Reset the contract id counters and their year markers
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RecordLedgerConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    init_telemetry(&config.log_level, config.log_json)?;

    let db = sled::open(&config.db_path)
        .with_context(|| format!("Failed to open ledger at {}", config.db_path.display()))?;
    let ledger = Arc::new(SledLedger::new(Arc::new(db)));
    let service = RecordService::new(ledger.clone(), Arc::new(SystemClock));

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Commands::Invoke { operation, args } => {
            let payload = service.invoke(&operation, &args)?;
            stdout.write_all(&payload)?;
            if !payload.is_empty() {
                writeln!(stdout)?;
            }
        }
        Commands::Dump { prefix } => {
            for record in IndexedRecordStore::new(ledger.as_ref()).scan_prefix(&prefix)? {
                writeln!(stdout, "{} = {}", record.key, String::from_utf8_lossy(&record.value))?;
            }
        }
        Commands::Ops => {
            for name in service.operation_names() {
                writeln!(stdout, "{name}")?;
            }
        }
        Commands::Init => {
            service.contracts().init()?;
            tracing::info!(db = %config.db_path.display(), "contract id counters initialized");
        }
    }

    Ok(())
}
