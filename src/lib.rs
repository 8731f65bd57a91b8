// Statement Ingest - Core Library
// Exposes the ingestion engine for the CLI and integration tests

pub mod table;          // Raw cell grid + CSV loading
pub mod dates;          // Date Normalizer
pub mod amounts;        // Amount + currency normalizer
pub mod formats;        // Format catalog (declarative profiles)
pub mod header;         // Header Locator
pub mod classifier;     // Format Classifier
pub mod mapper;         // Column Semantic Mapper
pub mod transaction;    // Canonical record
pub mod builder;        // Transaction Builder
pub mod fingerprint;    // Fingerprint Engine
pub mod grouping;       // Currency Grouping
pub mod oracle;         // Category Oracle seam + per-run cache
pub mod rules;          // Keyword category rules
pub mod store;          // Transaction Store seam + SQLite store
pub mod duplicates;     // Duplicate Detector
pub mod progress;       // Stages, progress sink, cancellation
pub mod config;         // Run configuration
pub mod error;          // Error taxonomy
pub mod pipeline;       // Pipeline Orchestrator

// Re-export commonly used types
pub use table::{Cell, RawTable};
pub use dates::{parse_date, DateNormalizer};
pub use amounts::{parse_amount, AmountOptions, ParsedAmount};
pub use formats::{catalog, FormatId, FormatProfile};
pub use header::{locate_header, HeaderLocation};
pub use classifier::{classify, Classification};
pub use mapper::{map_columns, CanonicalField, ColumnMapping};
pub use transaction::{CanonicalTransaction, SourceType};
pub use builder::{BuildOptions, RunContext, TransactionBuilder};
pub use fingerprint::transaction_hash;
pub use grouping::{group_by_currency, CurrencyGroup};
pub use oracle::{CategoryCache, CategoryOracle, LayeredOracle, NoCategoryOracle};
pub use rules::{CategoryRule, RuleEngine};
pub use store::{InsertOutcome, SqliteTransactionStore, StoreError, StoredTransaction, TransactionStore};
pub use duplicates::{DuplicateCandidate, DuplicateDetector, DuplicateReport, ExistingRecord};
pub use progress::{CancellationToken, ProgressEvent, ProgressSink, Stage, TracingProgress};
pub use config::IngestConfig;
pub use error::{IngestError, PipelineWarning, SkipReason, SkippedRow};
pub use pipeline::{ingest, Pipeline, PipelineOutput};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
