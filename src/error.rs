// 🚨 Error Taxonomy - File-level failures, row skips and run warnings
// File-level failures abort a run; row skips and warnings ride along in the output

use crate::progress::Stage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// FILE-LEVEL ERRORS
// ============================================================================

/// Errors that end an ingestion run without producing transactions.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No profile matched and generic column matching could not find the core columns.
    #[error(
        "format unrecognized: no business name, amount and payment date columns among [{}]",
        .found.join(", ")
    )]
    FormatUnrecognized { found: Vec<String> },

    /// The selected format requires a structural header and none was found.
    #[error("header row for format '{format}' not found in the first {scanned} rows")]
    HeaderNotFound { format: String, scanned: usize },

    /// A cancellation signal was observed between chunks.
    #[error("run cancelled during {stage} after {rows_processed} of {rows_total} rows")]
    Cancelled {
        stage: Stage,
        rows_processed: usize,
        rows_total: usize,
    },

    /// The table has no rows at all.
    #[error("table is empty")]
    EmptyTable,

    /// Failed to read the source file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the source file as CSV.
    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Failed to open or read a spreadsheet workbook.
    #[error("failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// The file extension is not a supported statement export.
    #[error("unsupported statement file {path} (.{extension}); expected .xlsx, .xls or .csv")]
    UnsupportedFile { path: PathBuf, extension: String },

    /// A per-run text pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

// ============================================================================
// ROW-LEVEL SKIPS
// ============================================================================

/// Why a single row was dropped. Never escalates to a file-level failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    EmptyRow,
    MissingBusinessName,
    MissingDate,
    InvalidDate { raw: String },
    MissingAmount,
    InvalidAmount { raw: String },
    ZeroAmount,
    SummaryRow { business_name: String },
    RepeatedHeader,
}

impl SkipReason {
    pub fn describe(&self) -> String {
        match self {
            SkipReason::EmptyRow => "empty row".to_string(),
            SkipReason::MissingBusinessName => "missing business name".to_string(),
            SkipReason::MissingDate => "missing payment date".to_string(),
            SkipReason::InvalidDate { raw } => format!("unparseable payment date '{}'", raw),
            SkipReason::MissingAmount => "missing amount".to_string(),
            SkipReason::InvalidAmount { raw } => format!("invalid amount '{}'", raw),
            SkipReason::ZeroAmount => "zero amount".to_string(),
            SkipReason::SummaryRow { business_name } => {
                format!("summary row '{}'", business_name)
            }
            SkipReason::RepeatedHeader => "repeated header row".to_string(),
        }
    }
}

/// A dropped row with its table index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row_index: usize,
    #[serde(flatten)]
    pub reason: SkipReason,
}

// ============================================================================
// RUN WARNINGS
// ============================================================================

/// Non-fatal conditions reported alongside a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Header not located; row 0 was used and column heuristics took over.
    HeaderNotFound { scanned: usize },

    /// The store existence check failed; no deduplication was performed.
    StoreUnavailable { message: String },

    /// Existing hashes were found but their records could not be fetched;
    /// no deduplication was performed.
    DuplicateFetchFailed { message: String },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::HeaderNotFound { scanned } => write!(
                f,
                "no header row found in the first {} rows, using row 0",
                scanned
            ),
            PipelineWarning::StoreUnavailable { message } => {
                write!(f, "store unavailable, duplicates not checked: {}", message)
            }
            PipelineWarning::DuplicateFetchFailed { message } => {
                write!(f, "existing duplicate records not fetched, duplicates not checked: {}", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_unrecognized_lists_found_columns() {
        let err = IngestError::FormatUnrecognized {
            found: vec!["Foo".to_string(), "Bar".to_string()],
        };
        assert!(err.to_string().contains("[Foo, Bar]"));
    }

    #[test]
    fn test_skipped_row_serializes_flat() {
        let skipped = SkippedRow {
            row_index: 7,
            reason: SkipReason::InvalidDate {
                raw: "yesterday".to_string(),
            },
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["row_index"], 7);
        assert_eq!(json["reason"], "invalid_date");
        assert_eq!(json["raw"], "yesterday");
    }
}
