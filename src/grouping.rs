// 💱 Currency Grouping - Partition a batch by currency with running aggregates

use crate::transaction::CanonicalTransaction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Samples kept per group for preview screens.
pub const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyGroup {
    pub currency: String,
    pub transactions: Vec<CanonicalTransaction>,
    pub count: usize,
    /// Sum of absolute amounts
    pub total_amount: f64,
    pub earliest_date: NaiveDate,
    pub latest_date: NaiveDate,
    pub samples: Vec<CanonicalTransaction>,
}

impl CurrencyGroup {
    fn start(tx: &CanonicalTransaction) -> Self {
        CurrencyGroup {
            currency: tx.currency.clone(),
            transactions: Vec::new(),
            count: 0,
            total_amount: 0.0,
            earliest_date: tx.payment_date,
            latest_date: tx.payment_date,
            samples: Vec::new(),
        }
    }

    fn push(&mut self, tx: &CanonicalTransaction) {
        self.count += 1;
        self.total_amount += tx.amount.abs();
        self.earliest_date = self.earliest_date.min(tx.payment_date);
        self.latest_date = self.latest_date.max(tx.payment_date);
        if self.samples.len() < SAMPLE_SIZE {
            self.samples.push(tx.clone());
        }
        self.transactions.push(tx.clone());
    }
}

/// Groups in order of each currency's first appearance; row order is kept
/// inside every group. The input is not modified.
pub fn group_by_currency(transactions: &[CanonicalTransaction]) -> Vec<CurrencyGroup> {
    let mut groups: Vec<CurrencyGroup> = Vec::new();

    for tx in transactions {
        let position = match groups.iter().position(|g| g.currency == tx.currency) {
            Some(position) => position,
            None => {
                groups.push(CurrencyGroup::start(tx));
                groups.len() - 1
            }
        };
        groups[position].push(tx);
    }

    groups
}
