// 🚦 Pipeline Orchestrator - One ingestion run over a raw table
// reading → header-locating → format-classifying → building (chunked)
//   → currency-grouping → duplicate-checking → done | error

use crate::builder::{BuildOptions, RunContext, TransactionBuilder};
use crate::classifier::classify;
use crate::config::IngestConfig;
use crate::duplicates::{DuplicateCandidate, DuplicateDetector};
use crate::error::{IngestError, PipelineWarning, Result, SkippedRow};
use crate::formats::{FormatId, GENERIC};
use crate::grouping::{group_by_currency, CurrencyGroup};
use crate::header::{locate_header, HeaderLocation};
use crate::mapper::map_columns;
use crate::oracle::{CategoryOracle, NoCategoryOracle};
use crate::progress::{CancellationToken, NoProgress, ProgressCounters, ProgressEvent, ProgressSink, Stage};
use crate::store::TransactionStore;
use crate::table::RawTable;
use crate::transaction::CanonicalTransaction;
use serde::Serialize;
use std::path::Path;

// ============================================================================
// OUTPUT
// ============================================================================

/// Everything a successful run produces. Transactions keep source row order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub transactions: Vec<CanonicalTransaction>,
    pub currency_groups: Vec<CurrencyGroup>,
    pub duplicates: Vec<DuplicateCandidate>,
    pub detected_format: String,
    pub format_confidence: f64,
    /// Data rows below the header
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub skipped: Vec<SkippedRow>,
    pub warnings: Vec<PipelineWarning>,
    /// `None` when no header qualified and row 0 was used
    pub header: Option<HeaderLocation>,
    /// False when deduplication was disabled or the store failed
    pub duplicates_checked: bool,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline<'a> {
    config: IngestConfig,
    oracle: &'a dyn CategoryOracle,
    store: Option<&'a dyn TransactionStore>,
    progress: &'a dyn ProgressSink,
    cancellation: CancellationToken,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: IngestConfig) -> Self {
        Pipeline {
            config,
            oracle: &NoCategoryOracle,
            store: None,
            progress: &NoProgress,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_oracle(mut self, oracle: &'a dyn CategoryOracle) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_store(mut self, store: &'a dyn TransactionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Load a statement export (workbook or CSV) and run it.
    pub fn run_file(&self, path: &Path) -> Result<PipelineOutput> {
        let table = RawTable::from_path(path)?;
        self.run(table)
    }

    /// Run every stage. File-level failures emit an `error` progress event
    /// and return no transactions.
    pub fn run(&self, table: RawTable) -> Result<PipelineOutput> {
        let mut counters = ProgressCounters::default();
        let result = self.execute(table, &mut counters);

        if let Err(err) = &result {
            tracing::warn!(error = %err, "ingestion run failed");
            self.emit(Stage::Error, 100.0, err.to_string(), counters);
        }
        result
    }

    fn execute(&self, table: RawTable, counters: &mut ProgressCounters) -> Result<PipelineOutput> {
        let config = &self.config;
        let mut warnings = Vec::new();

        // reading
        self.emit(Stage::Reading, 0.0, format!("{} rows loaded", table.len()), *counters);
        if table.rows().iter().all(|row| row.iter().all(|c| c.is_empty())) {
            return Err(IngestError::EmptyTable);
        }

        // header-locating
        let hint = config.format();
        let hint_profile = hint.map(|id| id.profile());
        let scanned = config.header_scan_rows.min(table.len());
        let header = locate_header(&table, hint_profile, config.header_scan_rows);
        if header.is_none() {
            if let Some(profile) = hint_profile.filter(|p| p.requires_header) {
                return Err(IngestError::HeaderNotFound {
                    format: profile.code().to_string(),
                    scanned,
                });
            }
            tracing::warn!(scanned, "header row not found, falling back to row 0");
            warnings.push(PipelineWarning::HeaderNotFound { scanned });
        }
        let location = header.unwrap_or(HeaderLocation {
            row_index: 0,
            start_column: 0,
            match_count: 0,
        });
        let headers = location.header_cells(&table);
        self.emit(
            Stage::HeaderLocating,
            5.0,
            format!("header at row {}", location.row_index),
            *counters,
        );

        // format-classifying
        let context: Vec<String> = table.rows()[..location.row_index]
            .iter()
            .flat_map(|row| row.iter().filter(|c| !c.is_empty()).map(|c| c.as_text().into_owned()))
            .collect();
        let classification = classify(&headers, &context, hint);
        let profile = classification.profile;
        if header.is_none() && profile.requires_header {
            return Err(IngestError::HeaderNotFound {
                format: profile.code().to_string(),
                scanned,
            });
        }

        let mut mapping = map_columns(&headers, location.start_column, profile);
        if !mapping.has_core_fields() && !profile.is_generic() {
            tracing::warn!(
                format = profile.code(),
                "profile columns incomplete, falling back to generic column matching"
            );
            mapping = map_columns(&headers, location.start_column, &GENERIC);
        }
        for (field, column) in mapping.fields() {
            tracing::debug!(?field, column, "column mapped");
        }
        if !mapping.has_core_fields() {
            return Err(IngestError::FormatUnrecognized {
                found: headers.iter().filter(|h| !h.is_empty()).cloned().collect(),
            });
        }
        self.emit(
            Stage::FormatClassifying,
            10.0,
            format!("{} ({:.2})", profile.name(), classification.confidence),
            *counters,
        );

        // building
        let data_start = location.row_index + 1;
        let data_rows = table.rows().get(data_start..).unwrap_or_default();
        let total = data_rows.len();
        counters.rows_read = total;

        let options = BuildOptions::from(config);
        let mut builder = TransactionBuilder::new(profile, &mapping, self.oracle, &options);
        if let Some(header_row) = table.row(location.row_index) {
            builder = builder.with_header_row(header_row);
        }
        let mut ctx = RunContext::new()?;

        let mut transactions = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        let mut processed = 0;
        let chunk_size = config.chunk_size.max(1);

        for chunk in data_rows.chunks(chunk_size) {
            if self.cancellation.is_cancelled() {
                return Err(self.cancelled(Stage::Building, processed, total));
            }

            for (offset, row) in chunk.iter().enumerate() {
                let row_index = data_start + processed + offset;
                match builder.build_row(row_index, row, &mut ctx) {
                    Ok(mut tx) => {
                        tx.assign_hash();
                        transactions.push(tx);
                        counters.rows_built += 1;
                    }
                    Err(reason) => {
                        tracing::debug!(row_index, reason = %reason.describe(), "row skipped");
                        skipped.push(SkippedRow { row_index, reason });
                        counters.rows_dropped += 1;
                    }
                }
            }

            processed += chunk.len();
            let percent = 15.0 + 70.0 * processed as f32 / total as f32;
            self.emit(
                Stage::Building,
                percent,
                format!("built {} of {} rows", processed, total),
                *counters,
            );
        }

        tracing::debug!(
            dates_cached = ctx.dates.cached_values(),
            date_cache_hits = ctx.dates.cache_hits(),
            category_lookups = ctx.categories.oracle_calls(),
            "build caches"
        );

        // currency-grouping
        let currency_groups = group_by_currency(&transactions);
        self.emit(
            Stage::CurrencyGrouping,
            90.0,
            format!("{} currency groups", currency_groups.len()),
            *counters,
        );

        // duplicate-checking
        if self.cancellation.is_cancelled() {
            return Err(self.cancelled(Stage::DuplicateChecking, processed, total));
        }
        let mut duplicates = Vec::new();
        let mut duplicates_checked = false;
        if config.check_duplicates {
            let detector = match self.store {
                Some(store) => DuplicateDetector::new(store),
                None => DuplicateDetector::without_store(),
            };
            let report = detector.detect(&transactions);
            for warning in &report.warnings {
                tracing::warn!(%warning, "duplicate check degraded");
            }
            duplicates_checked = report.store_checked || self.store.is_none();
            warnings.extend(report.warnings);
            duplicates = report.candidates;
            counters.duplicates = duplicates.len();
        }
        self.emit(
            Stage::DuplicateChecking,
            95.0,
            format!("{} duplicate candidates", duplicates.len()),
            *counters,
        );

        tracing::info!(
            format = profile.code(),
            rows_read = total,
            built = transactions.len(),
            dropped = skipped.len(),
            duplicates = duplicates.len(),
            "ingestion run finished"
        );
        self.emit(Stage::Done, 100.0, "done".to_string(), *counters);

        Ok(PipelineOutput {
            transactions,
            currency_groups,
            duplicates,
            detected_format: profile.code().to_string(),
            format_confidence: classification.confidence,
            rows_read: total,
            rows_dropped: skipped.len(),
            skipped,
            warnings,
            header,
            duplicates_checked,
        })
    }

    fn cancelled(&self, stage: Stage, rows_processed: usize, rows_total: usize) -> IngestError {
        tracing::info!(%stage, rows_processed, rows_total, "run cancelled");
        IngestError::Cancelled {
            stage,
            rows_processed,
            rows_total,
        }
    }

    fn emit(&self, stage: Stage, percent: f32, message: String, counters: ProgressCounters) {
        self.progress.on_progress(&ProgressEvent {
            stage,
            percent: percent.clamp(0.0, 100.0),
            message,
            counters,
        });
    }
}

/// Run with a format hint resolved from a caller string, no store and no oracle.
pub fn ingest(table: RawTable, format_hint: Option<&str>) -> Result<PipelineOutput> {
    let mut config = IngestConfig::default();
    config.format_hint = format_hint.and_then(FormatId::parse).map(|id| id.code().to_string());
    Pipeline::new(config).run(table)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkipReason;
    use crate::store::{InsertOutcome, StoreError, StoredTransaction};
    use std::cell::RefCell;

    fn cal_table(data_rows: &[[&str; 4]]) -> RawTable {
        let mut rows: Vec<Vec<&str>> = vec![
            vec!["פירוט חיובים לכרטיס ויזה כאל"],
            vec![""],
            vec!["תאריך עסקה", "שם בית עסק", "סכום עסקה", "סכום חיוב"],
        ];
        rows.extend(data_rows.iter().map(|r| r.to_vec()));
        RawTable::from_text_rows(rows)
    }

    struct FailingStore;

    impl TransactionStore for FailingStore {
        fn existing_hashes(&self, _: &[String]) -> std::result::Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn transactions_by_hashes(&self, _: &[String]) -> std::result::Result<Vec<StoredTransaction>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn insert(&self, _: &CanonicalTransaction) -> std::result::Result<InsertOutcome, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_end_to_end_cal_statement() {
        let table = cal_table(&[
            ["05/03/2025", "Cafe", "12.50", "12.50"],
            ["06/03/2025", "Amazon", "$20", "$20"],
            ["07/03/2025", "", "5", "5"],
            ["08/03/2025", "Cafe", "12.50", "12.50"],
        ]);

        let output = Pipeline::new(IngestConfig::default()).run(table).unwrap();

        assert_eq!(output.detected_format, "cal");
        assert!(output.format_confidence >= 0.7);
        assert_eq!(output.header.map(|h| h.row_index), Some(2));
        assert_eq!(output.rows_read, 4);
        assert_eq!(output.rows_dropped, 1);
        assert_eq!(output.skipped[0].row_index, 5);
        assert_eq!(output.skipped[0].reason, SkipReason::MissingBusinessName);
        assert_eq!(output.transactions.len(), 3);
        assert!(output.transactions.iter().all(|t| !t.transaction_hash.is_empty()));

        let currencies: Vec<_> = output.currency_groups.iter().map(|g| g.currency.as_str()).collect();
        assert_eq!(currencies, vec!["ILS", "USD"]);
        assert!(output.duplicates.is_empty());
    }

    #[test]
    fn test_intra_batch_duplicate_without_store() {
        let table = cal_table(&[
            ["05/03/2025", "Cafe", "12.50", "12.50"],
            ["05/03/2025", "Cafe", "12.50", "12.50"],
        ]);

        let output = Pipeline::new(IngestConfig::default()).run(table).unwrap();

        assert_eq!(output.duplicates.len(), 1);
        assert!(output.duplicates[0].is_intra_batch);
        assert_eq!(output.duplicates[0].new_transaction.row_index, 4);
        assert!(output.duplicates_checked);
    }

    #[test]
    fn test_progress_stages_in_order() {
        let stages = RefCell::new(Vec::new());
        let sink = |event: &ProgressEvent| {
            let mut stages = stages.borrow_mut();
            if stages.last() != Some(&event.stage) {
                stages.push(event.stage);
            }
        };
        let table = cal_table(&[["05/03/2025", "Cafe", "1", "1"]]);

        Pipeline::new(IngestConfig::default())
            .with_progress(&sink)
            .run(table)
            .unwrap();

        assert_eq!(
            *stages.borrow(),
            vec![
                Stage::Reading,
                Stage::HeaderLocating,
                Stage::FormatClassifying,
                Stage::Building,
                Stage::CurrencyGrouping,
                Stage::DuplicateChecking,
                Stage::Done,
            ]
        );
    }

    #[test]
    fn test_cancellation_between_chunks() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let events = RefCell::new(Vec::new());
        let sink = |event: &ProgressEvent| {
            if event.stage == Stage::Building {
                trigger.cancel();
            }
            events.borrow_mut().push(event.stage);
        };
        let rows: Vec<[&str; 4]> = (0..6).map(|_| ["05/03/2025", "Cafe", "1", "1"]).collect();

        let result = Pipeline::new(IngestConfig::default().with_chunk_size(2))
            .with_progress(&sink)
            .with_cancellation(token)
            .run(cal_table(&rows));

        match result {
            Err(IngestError::Cancelled {
                stage,
                rows_processed,
                rows_total,
            }) => {
                assert_eq!(stage, Stage::Building);
                assert_eq!(rows_processed, 2);
                assert_eq!(rows_total, 6);
            }
            other => panic!("expected cancellation, got {:?}", other.map(|o| o.transactions.len())),
        }
        assert_eq!(events.borrow().last(), Some(&Stage::Error));
    }

    #[test]
    fn test_chunking_preserves_row_order() {
        let rows: Vec<[&str; 4]> = vec![["05/03/2025", "Shop", "1", "1"]; 7];
        let output = Pipeline::new(IngestConfig::default().with_chunk_size(3))
            .run(cal_table(&rows))
            .unwrap();

        let indices: Vec<_> = output.transactions.iter().map(|t| t.row_index).collect();
        assert_eq!(indices, (3..10).collect::<Vec<_>>());
        // Every later copy points at the first occurrence
        assert_eq!(output.duplicates.len(), 6);
        assert!(output
            .duplicates
            .iter()
            .all(|d| d.existing == crate::duplicates::ExistingRecord::Batch { row_index: 3 }));
    }

    #[test]
    fn test_format_unrecognized_lists_columns() {
        let table = RawTable::from_text_rows(vec![vec!["Foo", "Bar", "Baz"], vec!["1", "2", "3"]]);

        match Pipeline::new(IngestConfig::default()).run(table) {
            Err(IngestError::FormatUnrecognized { found }) => {
                assert_eq!(found, vec!["Foo", "Bar", "Baz"]);
            }
            other => panic!("expected FormatUnrecognized, got {:?}", other.map(|o| o.detected_format)),
        }
    }

    #[test]
    fn test_required_header_missing_is_fatal() {
        let table = RawTable::from_text_rows(vec![vec!["x", "y"], vec!["1", "2"]]);
        let config = IngestConfig::default().with_format_hint("amex");

        let result = Pipeline::new(config).run(table);

        assert!(matches!(
            result,
            Err(IngestError::HeaderNotFound { ref format, .. }) if format == "americanexpress"
        ));
    }

    #[test]
    fn test_missing_header_downgraded_to_warning() {
        let table = RawTable::from_text_rows(vec![
            // Only two header keywords: below the locator's threshold
            vec!["Date", "Payee", "Withdrawal"],
            vec!["2025-01-02", "Shop", "10"],
        ]);

        let output = Pipeline::new(IngestConfig::default()).run(table).unwrap();

        assert_eq!(output.header, None);
        assert_eq!(output.warnings, vec![PipelineWarning::HeaderNotFound { scanned: 2 }]);
        assert_eq!(output.detected_format, "generic");
        assert_eq!(output.transactions.len(), 1);
        assert_eq!(output.transactions[0].amount, -10.0);
    }

    #[test]
    fn test_store_unavailable_degrades_to_warning() {
        let table = cal_table(&[
            ["05/03/2025", "Cafe", "1", "1"],
            ["05/03/2025", "Cafe", "1", "1"],
        ]);
        let store = FailingStore;

        let output = Pipeline::new(IngestConfig::default())
            .with_store(&store)
            .run(table)
            .unwrap();

        assert_eq!(output.transactions.len(), 2);
        assert!(output.duplicates.is_empty());
        assert!(!output.duplicates_checked);
        assert!(matches!(output.warnings[0], PipelineWarning::StoreUnavailable { .. }));
    }

    #[test]
    fn test_iso_coded_amounts_group_under_their_currency() {
        let table = RawTable::from_text_rows(vec![
            vec!["Date", "Description", "Amount"],
            vec!["2025-05-01", "Hotel", "150.00 USD"],
            vec!["2025-05-02", "Taxi", "USD 20"],
            vec!["2025-05-03", "Grocer", "35"],
        ]);

        let output = Pipeline::new(IngestConfig::default()).run(table).unwrap();

        let currencies: Vec<&str> = output.transactions.iter().map(|t| t.currency.as_str()).collect();
        assert_eq!(currencies, vec!["USD", "USD", "ILS"]);
        let usd = output.currency_groups.iter().find(|g| g.currency == "USD").unwrap();
        assert_eq!(usd.count, 2);
    }

    #[test]
    fn test_caller_user_and_card_digits() {
        let table = cal_table(&[["05/03/2025", "Cafe", "12.50", "12.50"]]);
        let config = IngestConfig::default()
            .with_user("user-7")
            .with_payment_identifier("9876");

        let pipeline = Pipeline::new(config);
        assert_eq!(pipeline.config().user_id.as_deref(), Some("user-7"));

        let output = pipeline.run(table).unwrap();
        let tx = &output.transactions[0];
        assert_eq!(tx.payment_identifier.as_deref(), Some("9876"));
        assert!(tx.is_expense());
    }

    #[test]
    fn test_empty_table() {
        let table = RawTable::from_text_rows(vec![vec!["", ""], vec![""]]);
        assert!(matches!(
            Pipeline::new(IngestConfig::default()).run(table),
            Err(IngestError::EmptyTable)
        ));
    }

    #[test]
    fn test_ingest_with_hint() {
        let table = cal_table(&[["05/03/2025", "Cafe", "1", "1"]]);
        let output = ingest(table, Some("Visa Cal")).unwrap();
        assert_eq!(output.detected_format, "cal");
    }
}
