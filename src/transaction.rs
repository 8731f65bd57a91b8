// 🧾 Canonical Transaction - The unified record every statement layout becomes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of account a statement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    CreditCard,
    BankAccount,
}

impl SourceType {
    pub fn code(&self) -> &'static str {
        match self {
            SourceType::CreditCard => "creditCard",
            SourceType::BankAccount => "bankAccount",
        }
    }
}

/// Canonical transaction record.
///
/// `business_name`, `payment_date` and `amount` are never missing: rows that
/// cannot supply them are dropped before a record is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub business_name: String,
    pub payment_date: NaiveDate,
    pub charge_date: NaiveDate,

    /// Signed: negative for expenses
    pub amount: f64,
    /// ISO 4217 code
    pub currency: String,
    pub original_amount: Option<f64>,
    pub original_currency: Option<String>,

    pub payment_method: Option<String>,
    /// Last four card digits
    pub payment_identifier: Option<String>,

    pub category_name: String,
    pub source_category: Option<String>,
    pub notes: Option<String>,
    pub recipient_name: Option<String>,

    /// `YYYY-MM` month the transaction is budgeted to
    pub flow_month: String,
    pub payment_month: u32,
    pub payment_year: i32,

    pub payment_number: u32,
    pub total_payments: u32,

    pub source_type: SourceType,
    pub transaction_type: Option<String>,
    pub quantity: Option<f64>,

    /// Content fingerprint; empty until assigned
    pub transaction_hash: String,

    /// Index of the source row in the raw table
    pub row_index: usize,
}

impl CanonicalTransaction {
    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }
}
