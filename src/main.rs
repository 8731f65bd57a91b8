// Statement Ingest CLI
// Normalize a statement export into canonical transactions, optionally deduplicating
// against and committing into a SQLite store

mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use statement_ingest::{
    catalog, CategoryOracle, IngestConfig, LayeredOracle, NoCategoryOracle, Pipeline, PipelineOutput, RuleEngine,
    SqliteTransactionStore, TracingProgress,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{init_logging, LogConfig};

#[derive(Parser)]
#[command(name = "statement-ingest", version, about = "Normalize bank and credit card statement exports")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one statement file and print the result as JSON
    Ingest(IngestArgs),

    /// Create the transaction store schema
    InitDb {
        /// SQLite database path
        #[arg(long, value_name = "PATH")]
        db: PathBuf,
    },

    /// List known statement formats
    Formats,
}

#[derive(Parser)]
struct IngestArgs {
    /// Statement export (.xlsx, .xls or .csv)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Format hint (cal, max, isracard, amex, leumi, hapoalim, yahav, budgetlens)
    #[arg(long)]
    format: Option<String>,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSON category rules file
    #[arg(long, value_name = "PATH")]
    rules: Option<PathBuf>,

    /// SQLite store used for duplicate checks and category history
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    payment_method: Option<String>,

    /// Card digits to attach to every transaction
    #[arg(long)]
    payment_identifier: Option<String>,

    #[arg(long)]
    chunk_size: Option<usize>,

    /// Skip duplicate detection
    #[arg(long)]
    no_dedup: bool,

    /// Insert non-duplicate transactions into the store
    #[arg(long, requires = "db")]
    commit: bool,

    /// Write JSON here instead of stdout
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose));

    match cli.command {
        Command::Ingest(args) => run_ingest(args),
        Command::InitDb { db } => run_init_db(&db),
        Command::Formats => {
            run_formats();
            Ok(())
        }
    }
}

fn build_config(args: &IngestArgs) -> Result<IngestConfig> {
    let mut config = match &args.config {
        Some(path) => IngestConfig::from_file(path)?,
        None => IngestConfig::default(),
    };

    if let Some(format) = &args.format {
        config = config.with_format_hint(format);
    }
    if let Some(user) = &args.user {
        config = config.with_user(user);
    }
    if let Some(method) = &args.payment_method {
        config.payment_method = Some(method.clone());
    }
    if let Some(identifier) = &args.payment_identifier {
        config = config.with_payment_identifier(identifier);
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if args.no_dedup {
        config.check_duplicates = false;
    }

    config.validate()?;
    Ok(config)
}

fn run_ingest(args: IngestArgs) -> Result<()> {
    let config = build_config(&args)?;

    let rules = match &args.rules {
        Some(path) => RuleEngine::from_file(path)?,
        None => RuleEngine::new(),
    };

    let store = match &args.db {
        Some(path) => Some(
            SqliteTransactionStore::open(path, config.user_id.as_deref())
                .with_context(|| format!("Failed to open store: {:?}", path))?,
        ),
        None => None,
    };

    let history: &dyn CategoryOracle = match &store {
        Some(store) => store,
        None => &NoCategoryOracle,
    };
    let oracle = LayeredOracle::new(history, &rules);

    let mut pipeline = Pipeline::new(config)
        .with_oracle(&oracle)
        .with_progress(&TracingProgress);
    if let Some(store) = &store {
        pipeline = pipeline.with_store(store);
    }

    eprintln!("📂 Ingesting {}", args.file.display());
    let output = pipeline
        .run_file(&args.file)
        .with_context(|| format!("Failed to ingest {:?}", args.file))?;
    print_summary(&output);
    if !pipeline.config().check_duplicates {
        eprintln!("⏭️  Duplicate check skipped (--no-dedup)");
    }

    if args.commit {
        let Some(store) = &store else {
            bail!("--commit needs --db");
        };
        let duplicate_rows: HashSet<usize> = output
            .duplicates
            .iter()
            .map(|d| d.new_transaction.row_index)
            .collect();
        let fresh: Vec<_> = output
            .transactions
            .iter()
            .filter(|tx| !duplicate_rows.contains(&tx.row_index))
            .cloned()
            .collect();

        let summary = store.commit(&fresh).context("Failed to commit transactions")?;
        eprintln!("💾 Committed {} transactions ({} conflicts)", summary.inserted, summary.conflicts);
    }

    let json = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write output: {:?}", path))?;
            eprintln!("✓ Output written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn print_summary(output: &PipelineOutput) {
    eprintln!("🏷️  Format: {} ({:.2})", output.detected_format, output.format_confidence);
    let expenses = output.transactions.iter().filter(|tx| tx.is_expense()).count();
    eprintln!(
        "✓ {} transactions from {} rows ({} dropped): {} expenses, {} income",
        output.transactions.len(),
        output.rows_read,
        output.rows_dropped,
        expenses,
        output.transactions.len() - expenses
    );
    for group in &output.currency_groups {
        eprintln!(
            "   {} × {}  total {:.2}  {} → {}",
            group.count, group.currency, group.total_amount, group.earliest_date, group.latest_date
        );
    }
    if !output.duplicates.is_empty() {
        eprintln!("🔍 {} possible duplicates", output.duplicates.len());
    }
    for warning in &output.warnings {
        eprintln!("⚠️  {}", warning);
    }
}

fn run_init_db(db: &Path) -> Result<()> {
    let store =
        SqliteTransactionStore::open(db, None).with_context(|| format!("Failed to initialize store: {:?}", db))?;
    let count = store.count()?;
    eprintln!("✓ Store ready at {} ({} transactions)", db.display(), count);
    Ok(())
}

fn run_formats() {
    for profile in catalog() {
        println!(
            "{:<16} {:<18} {:<12} strict={} header-required={}",
            profile.code(),
            profile.name(),
            profile.source_type.code(),
            profile.strict,
            profile.requires_header
        );
    }
}
