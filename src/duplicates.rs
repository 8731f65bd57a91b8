// 🔍 Duplicate Detector - Store and intra-batch duplicates by fingerprint
// Two batched store calls per run, then one ordered pass over the batch

use crate::error::PipelineWarning;
use crate::store::{StoredTransaction, TransactionStore};
use crate::transaction::CanonicalTransaction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// DUPLICATE CANDIDATE
// ============================================================================

/// What a new transaction collides with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ExistingRecord {
    /// Full record fetched from the store.
    Stored(StoredTransaction),
    /// Reported as existing, but the fetch returned no record for it.
    HashOnly { transaction_hash: String },
    /// First occurrence in the current batch.
    Batch { row_index: usize },
}

/// Created once during detection and never mutated. Resolution (skip,
/// replace, import anyway) is decided by the caller, keyed by hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub transaction_hash: String,
    pub new_transaction: CanonicalTransaction,
    pub existing: ExistingRecord,
    pub is_intra_batch: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateReport {
    pub candidates: Vec<DuplicateCandidate>,
    pub warnings: Vec<PipelineWarning>,
    /// False when a store call failed and no deduplication was performed.
    pub store_checked: bool,
}

impl DuplicateReport {
    pub fn store_duplicates(&self) -> usize {
        self.candidates.iter().filter(|c| !c.is_intra_batch).count()
    }

    pub fn intra_batch_duplicates(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_intra_batch).count()
    }
}

// ============================================================================
// DUPLICATE DETECTOR
// ============================================================================

pub struct DuplicateDetector<'s> {
    store: Option<&'s dyn TransactionStore>,
}

impl<'s> DuplicateDetector<'s> {
    pub fn new(store: &'s dyn TransactionStore) -> Self {
        DuplicateDetector { store: Some(store) }
    }

    /// Intra-batch detection only.
    pub fn without_store() -> Self {
        DuplicateDetector { store: None }
    }

    /// Find duplicates in `transactions` (hashes already assigned, source order).
    ///
    /// A failed store call degrades the whole check: the report carries the
    /// warning, no candidates, and `store_checked = false`.
    pub fn detect(&self, transactions: &[CanonicalTransaction]) -> DuplicateReport {
        let mut report = DuplicateReport::default();

        let (existing, records) = match self.store {
            Some(store) => match self.lookup_store(store, transactions) {
                Ok(lookup) => lookup,
                Err(warning) => {
                    tracing::warn!(%warning, "duplicate check skipped");
                    report.warnings.push(warning);
                    return report;
                }
            },
            None => Default::default(),
        };
        report.store_checked = true;

        // First occurrence wins; store duplicates never seed the batch index
        let mut first_seen: HashMap<&str, usize> = HashMap::new();

        for tx in transactions {
            let hash = tx.transaction_hash.as_str();

            if existing.contains(hash) {
                let existing_record = match records.get(hash) {
                    Some(record) => ExistingRecord::Stored(record.clone()),
                    None => ExistingRecord::HashOnly {
                        transaction_hash: hash.to_string(),
                    },
                };
                report.candidates.push(DuplicateCandidate {
                    transaction_hash: hash.to_string(),
                    new_transaction: tx.clone(),
                    existing: existing_record,
                    is_intra_batch: false,
                });
                continue;
            }

            match first_seen.get(hash) {
                Some(&row_index) => report.candidates.push(DuplicateCandidate {
                    transaction_hash: hash.to_string(),
                    new_transaction: tx.clone(),
                    existing: ExistingRecord::Batch { row_index },
                    is_intra_batch: true,
                }),
                None => {
                    first_seen.insert(hash, tx.row_index);
                }
            }
        }

        tracing::info!(
            store_duplicates = report.store_duplicates(),
            intra_batch = report.intra_batch_duplicates(),
            "duplicate check finished"
        );
        report
    }

    /// One existence query, then one fetch for the hits.
    fn lookup_store(
        &self,
        store: &dyn TransactionStore,
        transactions: &[CanonicalTransaction],
    ) -> Result<(HashSet<String>, HashMap<String, StoredTransaction>), PipelineWarning> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = transactions
            .iter()
            .map(|tx| tx.transaction_hash.clone())
            .filter(|h| seen.insert(h.clone()))
            .collect();

        if unique.is_empty() {
            return Ok(Default::default());
        }

        let existing: HashSet<String> = store
            .existing_hashes(&unique)
            .map_err(|e| PipelineWarning::StoreUnavailable { message: e.to_string() })?
            .into_iter()
            .collect();

        if existing.is_empty() {
            return Ok((existing, HashMap::new()));
        }

        let hits: Vec<String> = unique.into_iter().filter(|h| existing.contains(h)).collect();
        let records = store
            .transactions_by_hashes(&hits)
            .map_err(|e| PipelineWarning::DuplicateFetchFailed { message: e.to_string() })?
            .into_iter()
            .map(|r| (r.transaction_hash.clone(), r))
            .collect();

        Ok((existing, records))
    }
}
