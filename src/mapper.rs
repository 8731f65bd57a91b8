// 🧭 Column Semantic Mapper - Raw column names to canonical fields
// A profile's candidates compile into an ordered rule table evaluated once per column

use crate::formats::FormatProfile;
use crate::table::Cell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CANONICAL FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    BusinessName,
    PaymentDate,
    ChargeDate,
    Amount,
    Debit,
    Credit,
    Currency,
    OriginalAmount,
    OriginalCurrency,
    PaymentMethod,
    PaymentIdentifier,
    /// Budget category assigned by the exporting tool
    Category,
    /// Issuer's own merchant category
    SourceCategory,
    Notes,
    FlowMonth,
    PaymentNumber,
    TotalPayments,
    TransactionType,
    Quantity,
}

// ============================================================================
// RULE TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPredicate {
    /// Normalized header equals the pattern.
    Exact(&'static str),
    /// Normalized header contains the pattern and none of the exclusions.
    Contains {
        pattern: &'static str,
        excluding: &'static [&'static str],
    },
}

impl ColumnPredicate {
    pub fn matches(&self, header: &str) -> bool {
        match self {
            ColumnPredicate::Exact(pattern) => header == pattern.to_lowercase(),
            ColumnPredicate::Contains { pattern, excluding } => {
                header.contains(&pattern.to_lowercase())
                    && !excluding.iter().any(|ex| header.contains(&ex.to_lowercase()))
            }
        }
    }
}

/// One row of the mapping table. Lower priority values are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRule {
    pub field: CanonicalField,
    pub predicate: ColumnPredicate,
    pub priority: usize,
}

/// Compile a profile's field candidates into rules. Per field, every exact
/// pattern outranks every substring pattern; within each pass the profile's
/// candidate order holds.
pub fn rule_table(profile: &FormatProfile) -> Vec<ColumnRule> {
    let mut rules = Vec::new();
    for spec in profile.fields {
        let count = spec.candidates.len();
        for (i, pattern) in spec.candidates.iter().enumerate() {
            rules.push(ColumnRule {
                field: spec.field,
                predicate: ColumnPredicate::Exact(pattern),
                priority: i,
            });
            rules.push(ColumnRule {
                field: spec.field,
                predicate: ColumnPredicate::Contains {
                    pattern,
                    excluding: spec.excluding,
                },
                priority: count + i,
            });
        }
    }
    rules
}

/// Collapse internal whitespace, trim, lowercase.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// MAPPING
// ============================================================================

/// Resolved field → column index (absolute within the row).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    columns: BTreeMap<CanonicalField, usize>,
    /// Header text of columns no rule claimed.
    pub unmapped: Vec<String>,
}

impl ColumnMapping {
    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn has(&self, field: CanonicalField) -> bool {
        self.columns.contains_key(&field)
    }

    /// Cell of `field` in a data row.
    pub fn cell<'r>(&self, row: &'r [Cell], field: CanonicalField) -> Option<&'r Cell> {
        self.column(field).and_then(|idx| row.get(idx))
    }

    /// Business name, some amount column, and a payment date are all mapped.
    pub fn has_core_fields(&self) -> bool {
        let has_amount = self.has(CanonicalField::Amount)
            || self.has(CanonicalField::OriginalAmount)
            || self.has(CanonicalField::Debit)
            || self.has(CanonicalField::Credit);
        self.has(CanonicalField::BusinessName) && self.has(CanonicalField::PaymentDate) && has_amount
    }

    pub fn fields(&self) -> impl Iterator<Item = (CanonicalField, usize)> + '_ {
        self.columns.iter().map(|(f, c)| (*f, *c))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Map a header row to canonical fields. `start_column` is the offset of
/// `headers[0]` within the table row. Each column is claimed at most once;
/// fields are resolved in the profile's declared order.
pub fn map_columns(headers: &[String], start_column: usize, profile: &FormatProfile) -> ColumnMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let rules = rule_table(profile);

    let mut claimed = vec![false; normalized.len()];
    let mut columns = BTreeMap::new();

    for spec in profile.fields {
        if columns.contains_key(&spec.field) {
            continue;
        }

        let mut field_rules: Vec<&ColumnRule> = rules.iter().filter(|r| r.field == spec.field).collect();
        field_rules.sort_by_key(|r| r.priority);

        let found = field_rules.iter().find_map(|rule| {
            normalized
                .iter()
                .enumerate()
                .find(|(idx, header)| !claimed[*idx] && !header.is_empty() && rule.predicate.matches(header))
                .map(|(idx, _)| idx)
        });

        if let Some(idx) = found {
            claimed[idx] = true;
            columns.insert(spec.field, start_column + idx);
        }
    }

    let unmapped = headers
        .iter()
        .zip(claimed.iter())
        .filter(|(h, claimed)| !**claimed && !h.trim().is_empty())
        .map(|(h, _)| h.trim().to_string())
        .collect();

    tracing::debug!(
        format = profile.code(),
        mapped = columns.len(),
        "column mapping resolved"
    );

    ColumnMapping { columns, unmapped }
}
