// 🗄️ Transaction Store - Persistence boundary for duplicate lookups and commits
// SQLite implementation: one statement per batched call, UNIQUE hash per user

use crate::oracle::CategoryOracle;
use crate::transaction::CanonicalTransaction;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ============================================================================
// STORE INTERFACE
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Minimal view of a previously committed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: String,
    pub transaction_hash: String,
    pub business_name: String,
    pub payment_date: String,
    pub amount: f64,
    pub currency: String,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { id: String },
    Conflict,
}

/// External transaction store. Every call covers a whole batch.
pub trait TransactionStore {
    /// Which of these hashes already exist.
    fn existing_hashes(&self, hashes: &[String]) -> Result<Vec<String>, StoreError>;

    /// Full records for hashes known to exist.
    fn transactions_by_hashes(&self, hashes: &[String]) -> Result<Vec<StoredTransaction>, StoreError>;

    /// Commit one transaction. Belongs to the caller's commit step, never the pipeline.
    fn insert(&self, transaction: &CanonicalTransaction) -> Result<InsertOutcome, StoreError>;
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteTransactionStore {
    conn: Connection,
    user_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub inserted: usize,
    pub conflicts: usize,
}

impl SqliteTransactionStore {
    /// Wrap an open connection; the schema is created if missing.
    pub fn new(conn: Connection, user_id: Option<&str>) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteTransactionStore {
            conn,
            user_id: user_id.unwrap_or_default().to_string(),
        })
    }

    pub fn open(path: &Path, user_id: Option<&str>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::new(conn, user_id)
    }

    pub fn open_in_memory(user_id: Option<&str>) -> Result<Self, StoreError> {
        Self::new(Connection::open_in_memory()?, user_id)
    }

    /// Insert a batch, counting unique-hash conflicts instead of failing on them.
    pub fn commit(&self, transactions: &[CanonicalTransaction]) -> Result<CommitSummary, StoreError> {
        let mut summary = CommitSummary::default();
        for tx in transactions {
            match self.insert(tx)? {
                InsertOutcome::Inserted { .. } => summary.inserted += 1,
                InsertOutcome::Conflict => summary.conflicts += 1,
            }
        }
        tracing::info!(inserted = summary.inserted, conflicts = summary.conflicts, "transactions committed");
        Ok(summary)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?1",
            [&self.user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_uuid TEXT UNIQUE NOT NULL,
            user_id TEXT NOT NULL DEFAULT '',
            transaction_hash TEXT NOT NULL,
            business_name TEXT NOT NULL,
            payment_date TEXT NOT NULL,
            charge_date TEXT NOT NULL,
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            original_amount REAL,
            original_currency TEXT,
            payment_method TEXT,
            payment_identifier TEXT,
            category_name TEXT NOT NULL,
            source_category TEXT,
            notes TEXT,
            recipient_name TEXT,
            flow_month TEXT NOT NULL,
            payment_month INTEGER NOT NULL,
            payment_year INTEGER NOT NULL,
            payment_number INTEGER NOT NULL,
            total_payments INTEGER NOT NULL,
            source_type TEXT NOT NULL,
            transaction_type TEXT,
            quantity REAL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (user_id, transaction_hash)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_business_name ON transactions(user_id, business_name)",
        [],
    )?;

    Ok(())
}

impl TransactionStore for SqliteTransactionStore {
    fn existing_hashes(&self, hashes: &[String]) -> Result<Vec<String>, StoreError> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let hashes_json = serde_json::to_string(hashes)?;

        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT transaction_hash FROM transactions
             WHERE user_id = ?1 AND transaction_hash IN (SELECT value FROM json_each(?2))",
        )?;
        let existing = stmt
            .query_map(params![self.user_id, hashes_json], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(existing)
    }

    fn transactions_by_hashes(&self, hashes: &[String]) -> Result<Vec<StoredTransaction>, StoreError> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let hashes_json = serde_json::to_string(hashes)?;

        let mut stmt = self.conn.prepare(
            "SELECT tx_uuid, transaction_hash, business_name, payment_date, amount, currency, category_name
             FROM transactions
             WHERE user_id = ?1 AND transaction_hash IN (SELECT value FROM json_each(?2))
             ORDER BY id",
        )?;
        let records = stmt
            .query_map(params![self.user_id, hashes_json], |row| {
                Ok(StoredTransaction {
                    id: row.get(0)?,
                    transaction_hash: row.get(1)?,
                    business_name: row.get(2)?,
                    payment_date: row.get(3)?,
                    amount: row.get(4)?,
                    currency: row.get(5)?,
                    category_name: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn insert(&self, tx: &CanonicalTransaction) -> Result<InsertOutcome, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let hash = if tx.transaction_hash.is_empty() {
            tx.compute_hash()
        } else {
            tx.transaction_hash.clone()
        };

        let result = self.conn.execute(
            "INSERT INTO transactions (
                tx_uuid, user_id, transaction_hash, business_name, payment_date, charge_date,
                amount, currency, original_amount, original_currency, payment_method,
                payment_identifier, category_name, source_category, notes, recipient_name,
                flow_month, payment_month, payment_year, payment_number, total_payments,
                source_type, transaction_type, quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            params![
                id,
                self.user_id,
                hash,
                tx.business_name,
                tx.payment_date.to_string(),
                tx.charge_date.to_string(),
                tx.amount,
                tx.currency,
                tx.original_amount,
                tx.original_currency,
                tx.payment_method,
                tx.payment_identifier,
                tx.category_name,
                tx.source_category,
                tx.notes,
                tx.recipient_name,
                tx.flow_month,
                tx.payment_month,
                tx.payment_year,
                tx.payment_number,
                tx.total_payments,
                tx.source_type.code(),
                tx.transaction_type,
                tx.quantity,
            ],
        );

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted { id }),
            // Only the (user_id, transaction_hash) key means "already stored"
            Err(rusqlite::Error::SqliteFailure(err, Some(message)))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && message.contains("transaction_hash") =>
            {
                Ok(InsertOutcome::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl CategoryOracle for SqliteTransactionStore {
    /// Most used category for this business among the store's transactions.
    fn most_frequent_category(&self, business_name: &str, user_id: Option<&str>) -> Option<String> {
        let user = user_id.unwrap_or(self.user_id.as_str());
        let result = self
            .conn
            .query_row(
                "SELECT category_name FROM transactions
                 WHERE user_id = ?1 AND business_name = ?2
                 GROUP BY category_name
                 ORDER BY COUNT(*) DESC, MAX(id) DESC
                 LIMIT 1",
                params![user, business_name.trim()],
                |row| row.get::<_, String>(0),
            )
            .optional();

        match result {
            Ok(category) => category,
            Err(e) => {
                tracing::warn!(error = %e, business_name, "category history lookup failed");
                None
            }
        }
    }

    fn auto_category(&self, _: &str, _: f64, _: &str, _: Option<&str>) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::SourceType;
    use chrono::NaiveDate;

    /// Helper function to create test transactions with all required fields
    fn create_test_transaction(business_name: &str, amount: f64, date: &str, category: &str) -> CanonicalTransaction {
        let payment_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        let mut tx = CanonicalTransaction {
            business_name: business_name.to_string(),
            payment_date,
            charge_date: payment_date,
            amount,
            currency: "ILS".to_string(),
            original_amount: None,
            original_currency: None,
            payment_method: Some("cal".to_string()),
            payment_identifier: None,
            category_name: category.to_string(),
            source_category: None,
            notes: None,
            recipient_name: None,
            flow_month: crate::dates::month_key(payment_date),
            payment_month: 3,
            payment_year: 2025,
            payment_number: 1,
            total_payments: 1,
            source_type: SourceType::CreditCard,
            transaction_type: None,
            quantity: None,
            transaction_hash: String::new(),
            row_index: 0,
        };
        tx.assign_hash();
        tx
    }

    #[test]
    fn test_idempotency_commit_twice() {
        let store = SqliteTransactionStore::open_in_memory(None).unwrap();
        let transactions = vec![
            create_test_transaction("Coffee Shop", -45.99, "2025-03-01", "Dining"),
            create_test_transaction("Supermarket", -120.50, "2025-03-02", "Groceries"),
            create_test_transaction("Employer", 2000.0, "2025-03-03", "Salary"),
        ];

        let first = store.commit(&transactions).unwrap();
        let second = store.commit(&transactions).unwrap();

        assert_eq!(first, CommitSummary { inserted: 3, conflicts: 0 });
        assert_eq!(second, CommitSummary { inserted: 0, conflicts: 3 });
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_existing_hashes_single_query() {
        let store = SqliteTransactionStore::open_in_memory(None).unwrap();
        let stored = create_test_transaction("Coffee Shop", -45.99, "2025-03-01", "Dining");
        store.insert(&stored).unwrap();

        let fresh = create_test_transaction("Bakery", -12.0, "2025-03-01", "Dining");
        let existing = store
            .existing_hashes(&[stored.transaction_hash.clone(), fresh.transaction_hash.clone()])
            .unwrap();

        assert_eq!(existing, vec![stored.transaction_hash.clone()]);
        assert!(store.existing_hashes(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_transactions_by_hashes() {
        let store = SqliteTransactionStore::open_in_memory(None).unwrap();
        let stored = create_test_transaction("Coffee Shop", -45.99, "2025-03-01", "Dining");
        let outcome = store.insert(&stored).unwrap();

        let records = store.transactions_by_hashes(&[stored.transaction_hash.clone()]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].business_name, "Coffee Shop");
        assert_eq!(records[0].payment_date, "2025-03-01");
        assert_eq!(records[0].category_name.as_deref(), Some("Dining"));
        assert_eq!(InsertOutcome::Inserted { id: records[0].id.clone() }, outcome);
    }

    #[test]
    fn test_hashes_are_scoped_per_user() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let alice = SqliteTransactionStore::new(conn, Some("alice")).unwrap();
        let tx = create_test_transaction("Coffee Shop", -45.99, "2025-03-01", "Dining");
        alice.insert(&tx).unwrap();

        let bob_view = SqliteTransactionStore {
            conn: alice.conn,
            user_id: "bob".to_string(),
        };
        assert!(bob_view.existing_hashes(&[tx.transaction_hash.clone()]).unwrap().is_empty());
        assert!(matches!(bob_view.insert(&tx).unwrap(), InsertOutcome::Inserted { .. }));
    }

    #[test]
    fn test_most_frequent_category() {
        let store = SqliteTransactionStore::open_in_memory(None).unwrap();
        store
            .commit(&[
                create_test_transaction("Supermarket", -10.0, "2025-01-01", "Groceries"),
                create_test_transaction("Supermarket", -20.0, "2025-01-02", "Groceries"),
                create_test_transaction("Supermarket", -30.0, "2025-01-03", "Household"),
            ])
            .unwrap();

        assert_eq!(
            store.most_frequent_category("Supermarket", None),
            Some("Groceries".to_string())
        );
        assert_eq!(store.most_frequent_category("Unknown", None), None);
    }

    #[test]
    fn test_other_constraint_failures_surface_as_errors() {
        let store = SqliteTransactionStore::open_in_memory(Some("user-1")).unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_positive BEFORE INSERT ON transactions
                 WHEN NEW.amount > 0
                 BEGIN SELECT RAISE(ABORT, 'positive amounts not accepted'); END;",
            )
            .unwrap();

        let refund = create_test_transaction("Refund", 50.0, "2025-03-05", "החזרים");
        assert!(store.insert(&refund).is_err());

        let expense = create_test_transaction("Cafe", -50.0, "2025-03-05", "מסעדות");
        assert!(matches!(store.insert(&expense).unwrap(), InsertOutcome::Inserted { .. }));
        assert_eq!(store.insert(&expense).unwrap(), InsertOutcome::Conflict);
    }
}
