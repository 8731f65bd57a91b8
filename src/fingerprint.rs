// 🔑 Fingerprint Engine - Deterministic content hash per transaction
// Same logical transaction → same hash, across runs, row order and machines

use crate::transaction::CanonicalTransaction;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Field separator inside the hashed payload (ASCII unit separator).
const SEPARATOR: char = '\u{1f}';

/// Amount rendered with two decimals; negative zero prints as `0.00`.
pub fn canonical_amount(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0.00".to_string();
    }
    format!("{:.2}", rounded)
}

fn canonical_business_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// SHA-256 over business name, amount, payment date and currency.
/// Case and whitespace in the name and currency do not change the hash.
pub fn transaction_hash(business_name: &str, amount: f64, payment_date: NaiveDate, currency: &str) -> String {
    let payload = format!(
        "{}{sep}{}{sep}{}{sep}{}",
        canonical_business_name(business_name),
        canonical_amount(amount),
        payment_date.format("%Y-%m-%d"),
        currency.trim().to_uppercase(),
        sep = SEPARATOR,
    );

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl CanonicalTransaction {
    /// Hash of this transaction's content. Identifiers and row index are not part of it.
    pub fn compute_hash(&self) -> String {
        transaction_hash(&self.business_name, self.amount, self.payment_date, &self.currency)
    }

    /// Compute and store the hash.
    pub fn assign_hash(&mut self) {
        self.transaction_hash = self.compute_hash();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_hash_is_deterministic() {
        let h1 = transaction_hash("Coffee Shop", -45.5, date("2025-03-05"), "ILS");
        let h2 = transaction_hash("Coffee Shop", -45.5, date("2025-03-05"), "ILS");

        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64, "SHA256 hash should be 64 hex characters");
    }

    #[test]
    fn test_hash_ignores_case_and_whitespace() {
        let h1 = transaction_hash("Coffee  Shop ", -45.5, date("2025-03-05"), "ils");
        let h2 = transaction_hash("coffee shop", -45.50, date("2025-03-05"), "ILS");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_changes_with_content() {
        let base = transaction_hash("Coffee Shop", -45.5, date("2025-03-05"), "ILS");

        assert_ne!(base, transaction_hash("Coffee Shop", -45.51, date("2025-03-05"), "ILS"));
        assert_ne!(base, transaction_hash("Coffee Shop", -45.5, date("2025-03-06"), "ILS"));
        assert_ne!(base, transaction_hash("Coffee Shop", -45.5, date("2025-03-05"), "USD"));
        assert_ne!(base, transaction_hash("Tea Shop", -45.5, date("2025-03-05"), "ILS"));
    }

    #[test]
    fn test_fields_cannot_bleed_into_each_other() {
        let h1 = transaction_hash("shop1", -5.0, date("2025-03-05"), "ILS");
        let h2 = transaction_hash("shop", -15.0, date("2025-03-05"), "ILS");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_canonical_amount() {
        assert_eq!(canonical_amount(-150.0), "-150.00");
        assert_eq!(canonical_amount(12.346), "12.35");
        assert_eq!(canonical_amount(-0.0), "0.00");
        assert_eq!(canonical_amount(0.001), "0.00");
    }
}
