// 🏗️ Transaction Builder - Mapped row + profile rules → CanonicalTransaction
// Normalizes one data row at a time; rows that cannot be completed are skipped with a reason

use crate::amounts::{normalize_currency, parse_amount, parse_plain_number, AmountOptions, ParsedAmount, DEFAULT_CURRENCY};
use crate::config::IngestConfig;
use crate::dates::{month_key, parse_month_key, DateNormalizer};
use crate::error::SkipReason;
use crate::formats::{CategoryPrecedence, DateShiftRule, FormatProfile, PaymentIdentifierSource, SignConvention};
use crate::mapper::{normalize_header, CanonicalField as F, ColumnMapping};
use crate::oracle::{CategoryCache, CategoryOracle};
use crate::table::Cell;
use crate::transaction::CanonicalTransaction;
use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// Business names starting with these mark statement totals, not purchases.
const SUMMARY_PREFIXES: &[&str] = &["סה\"כ", "סה''כ", "סך הכל", "total"];

/// Transaction types marking an installment payment.
const INSTALLMENT_MARKERS: &[&str] = &["תשלומים", "installment"];

// ============================================================================
// OPTIONS & PER-RUN CONTEXT
// ============================================================================

/// Caller-supplied values that apply to every row of a run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub user_id: Option<String>,
    pub payment_method: Option<String>,
    pub payment_identifier: Option<String>,
    pub default_currency: String,
    pub reject_zero_amounts: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            user_id: None,
            payment_method: None,
            payment_identifier: None,
            default_currency: DEFAULT_CURRENCY.to_string(),
            reject_zero_amounts: true,
        }
    }
}

impl From<&IngestConfig> for BuildOptions {
    fn from(config: &IngestConfig) -> Self {
        BuildOptions {
            user_id: config.user_id.clone(),
            payment_method: config.payment_method.clone(),
            payment_identifier: config.payment_identifier.clone(),
            default_currency: config.default_currency.clone(),
            reject_zero_amounts: config.reject_zero_amounts,
        }
    }
}

/// Caches and compiled patterns owned by a single run.
#[derive(Debug)]
pub struct RunContext {
    pub dates: DateNormalizer,
    pub categories: CategoryCache,
    recipients: RecipientExtractor,
}

impl RunContext {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(RunContext {
            dates: DateNormalizer::new(),
            categories: CategoryCache::new(),
            recipients: RecipientExtractor::new()?,
        })
    }
}

// ============================================================================
// RECIPIENT EXTRACTION
// ============================================================================

/// Pulls the recipient of a payment or gift voucher out of free-text notes.
#[derive(Debug)]
pub struct RecipientExtractor {
    patterns: Vec<Regex>,
}

impl RecipientExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = [
            // "למי: נוי כהן"
            r"למי:\s*(.+?)(?:\n|$)",
            // "שובר ל-X", "שוברים לקניה ב-X"
            r"שוברי?ם?\s*ל(?:קניה\s+ב)?-(\S+)",
            // "שובר מ-X"
            r"שוברי?ם?\s*מ-(\S+)",
        ]
        .iter()
        .map(|p| Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(RecipientExtractor { patterns })
    }

    /// Returns the recipient and what is left of the notes once the
    /// matched pattern is removed.
    pub fn extract(&self, notes: &str) -> Option<(String, Option<String>)> {
        let notes = notes.trim();

        for pattern in &self.patterns {
            let Some(captures) = pattern.captures(notes) else {
                continue;
            };
            let recipient = captures.get(1)?.as_str().trim().to_string();
            if recipient.is_empty() {
                continue;
            }

            let rest = pattern.replace_all(notes, "");
            let rest = rest.split_whitespace().collect::<Vec<_>>().join(" ");
            let rest = if rest.is_empty() { None } else { Some(rest) };
            return Some((recipient, rest));
        }
        None
    }
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct TransactionBuilder<'a> {
    profile: &'static FormatProfile,
    mapping: &'a ColumnMapping,
    oracle: &'a dyn CategoryOracle,
    options: &'a BuildOptions,
    header_row: Option<&'a [Cell]>,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(
        profile: &'static FormatProfile,
        mapping: &'a ColumnMapping,
        oracle: &'a dyn CategoryOracle,
        options: &'a BuildOptions,
    ) -> Self {
        TransactionBuilder {
            profile,
            mapping,
            oracle,
            options,
            header_row: None,
        }
    }

    /// Header row of the table; data rows repeating it are skipped.
    pub fn with_header_row(mut self, header_row: &'a [Cell]) -> Self {
        self.header_row = Some(header_row);
        self
    }

    pub fn profile(&self) -> &'static FormatProfile {
        self.profile
    }

    /// Build one canonical transaction. The hash is left empty.
    pub fn build_row(
        &self,
        row_index: usize,
        row: &[Cell],
        ctx: &mut RunContext,
    ) -> Result<CanonicalTransaction, SkipReason> {
        if row.iter().all(Cell::is_empty) {
            return Err(SkipReason::EmptyRow);
        }

        let business_name = self.business_name(row)?;

        // Dates
        let offset = self.profile.serial_day_offset;
        let date_cell = self
            .mapping
            .cell(row, F::PaymentDate)
            .filter(|c| !c.is_empty())
            .ok_or(SkipReason::MissingDate)?;
        let mut payment_date = ctx
            .dates
            .normalize(date_cell, offset)
            .ok_or_else(|| SkipReason::InvalidDate {
                raw: date_cell.as_text().trim().to_string(),
            })?;
        let file_charge_date = self
            .mapping
            .cell(row, F::ChargeDate)
            .and_then(|c| ctx.dates.normalize(c, offset));
        let charge_date = file_charge_date.unwrap_or(payment_date);

        // Amount and sign
        let parsed = self.resolve_amount(row)?;
        let amount = self.apply_sign_convention(parsed);

        let original_amount = if self.mapping.has(F::Amount) {
            self.mapping
                .cell(row, F::OriginalAmount)
                .and_then(|c| parse_amount(c, self.amount_options(false)))
                .map(|p| self.apply_sign_convention(p))
        } else {
            None
        };

        let currency = self
            .text(row, F::Currency)
            .and_then(|c| normalize_currency(&c))
            .or_else(|| parsed.currency.map(str::to_string))
            .unwrap_or_else(|| self.options.default_currency.clone());
        let original_currency = self
            .text(row, F::OriginalCurrency)
            .map(|c| normalize_currency(&c).unwrap_or(c));

        // Installment shift
        let transaction_type = self.text(row, F::TransactionType);
        let mut shifted_flow_month = None;
        if self.profile.date_shift == DateShiftRule::InstallmentToChargeMonthMinusOne
            && transaction_type.as_deref().map_or(false, is_installment)
        {
            if let Some(flow_start) = file_charge_date.and_then(previous_month_start) {
                shifted_flow_month = Some(month_key(flow_start));
                if !same_month(payment_date, flow_start) {
                    if let Some(moved) = date_in_month(flow_start, payment_date.day()) {
                        tracing::debug!(
                            row_index,
                            from = %payment_date,
                            to = %moved,
                            "installment payment date moved to flow month"
                        );
                        payment_date = moved;
                    }
                }
            }
        }

        // Category
        let source_category = self.text(row, F::SourceCategory);
        let preserved = match self.profile.category_precedence {
            CategoryPrecedence::PreserveSource => self.text(row, F::Category).or_else(|| source_category.clone()),
            CategoryPrecedence::AlwaysAuto => None,
        };
        let category_name = match preserved {
            Some(category) => category,
            None => ctx
                .categories
                .resolve(
                    self.oracle,
                    &business_name,
                    amount,
                    self.profile.code(),
                    self.options.user_id.as_deref(),
                )
                .unwrap_or_else(|| self.profile.default_category.to_string()),
        };

        // Flow month: explicit value, then installment shift, then payment date
        let flow_month = self
            .mapping
            .cell(row, F::FlowMonth)
            .and_then(parse_month_key)
            .or(shifted_flow_month)
            .unwrap_or_else(|| month_key(payment_date));

        // Payment source
        let file_identifier = self
            .mapping
            .cell(row, F::PaymentIdentifier)
            .and_then(|c| last_four_digits(&c.as_text()));
        let caller_identifier = self
            .options
            .payment_identifier
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let payment_identifier = match self.profile.payment_identifier_source {
            PaymentIdentifierSource::FileDerived => file_identifier.or(caller_identifier),
            PaymentIdentifierSource::CallerOverride => caller_identifier.or(file_identifier),
        };
        let payment_method = self
            .options
            .payment_method
            .clone()
            .or_else(|| self.text(row, F::PaymentMethod))
            .or_else(|| self.profile.payment_method.map(str::to_string));

        // Notes and recipient
        let mut notes = self.text(row, F::Notes);
        let mut recipient_name = None;
        if let Some((recipient, rest)) = notes.as_deref().and_then(|n| ctx.recipients.extract(n)) {
            recipient_name = Some(recipient);
            notes = rest;
        }

        Ok(CanonicalTransaction {
            business_name,
            payment_date,
            charge_date,
            amount,
            currency,
            original_amount,
            original_currency,
            payment_method,
            payment_identifier,
            category_name,
            source_category,
            notes,
            recipient_name,
            flow_month,
            payment_month: payment_date.month(),
            payment_year: payment_date.year(),
            payment_number: self.count(row, F::PaymentNumber),
            total_payments: self.count(row, F::TotalPayments),
            source_type: self.profile.source_type,
            transaction_type,
            quantity: self.mapping.cell(row, F::Quantity).and_then(parse_plain_number),
            transaction_hash: String::new(),
            row_index,
        })
    }

    fn business_name(&self, row: &[Cell]) -> Result<String, SkipReason> {
        let raw = self.text(row, F::BusinessName).ok_or(SkipReason::MissingBusinessName)?;

        let name = if self.profile.slash_separated_names {
            raw.replace('/', " ")
        } else {
            raw
        };
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return Err(SkipReason::MissingBusinessName);
        }

        let lower = name.to_lowercase();
        if SUMMARY_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return Err(SkipReason::SummaryRow { business_name: name });
        }

        if let (Some(header), Some(col)) = (self.header_row, self.mapping.column(F::BusinessName)) {
            let header_text = header.get(col).map(|c| normalize_header(&c.as_text())).unwrap_or_default();
            if !header_text.is_empty() && header_text == normalize_header(&name) {
                return Err(SkipReason::RepeatedHeader);
            }
        }

        Ok(name)
    }

    fn amount_options(&self, reject_zero: bool) -> AmountOptions {
        AmountOptions {
            reject_zero,
            symbol_implies_expense: self.profile.symbol_implies_expense,
        }
    }

    fn classify_amount(&self, row: &[Cell], field: F) -> AmountCell {
        let Some(cell) = self.mapping.cell(row, field).filter(|c| !c.is_empty()) else {
            return AmountCell::Missing;
        };
        match parse_amount(cell, self.amount_options(false)) {
            Some(parsed) if parsed.value == 0.0 => AmountCell::Zero(parsed),
            Some(parsed) => AmountCell::Value(parsed),
            None => AmountCell::Invalid(cell.as_text().trim().to_string()),
        }
    }

    /// Charge amount, else original amount, else the debit/credit pair.
    fn resolve_amount(&self, row: &[Cell]) -> Result<ParsedAmount, SkipReason> {
        for field in [F::Amount, F::OriginalAmount] {
            match self.classify_amount(row, field) {
                AmountCell::Missing => continue,
                other => return self.settle(other),
            }
        }

        let debit = self.classify_amount(row, F::Debit);
        let credit = self.classify_amount(row, F::Credit);
        match (debit, credit) {
            (AmountCell::Value(d), _) => Ok(ParsedAmount {
                value: -d.value.abs(),
                currency: d.currency,
                sign_resolved: true,
            }),
            (_, AmountCell::Value(c)) => Ok(ParsedAmount {
                value: c.value.abs(),
                currency: c.currency,
                sign_resolved: true,
            }),
            (invalid @ AmountCell::Invalid(_), _) | (_, invalid @ AmountCell::Invalid(_)) => self.settle(invalid),
            (zero @ AmountCell::Zero(_), _) | (_, zero @ AmountCell::Zero(_)) => self.settle(zero),
            (AmountCell::Missing, AmountCell::Missing) => Err(SkipReason::MissingAmount),
        }
    }

    fn settle(&self, cell: AmountCell) -> Result<ParsedAmount, SkipReason> {
        match cell {
            AmountCell::Value(parsed) => Ok(parsed),
            AmountCell::Zero(_) if self.options.reject_zero_amounts => Err(SkipReason::ZeroAmount),
            AmountCell::Zero(parsed) => Ok(parsed),
            AmountCell::Invalid(raw) => Err(SkipReason::InvalidAmount { raw }),
            AmountCell::Missing => Err(SkipReason::MissingAmount),
        }
    }

    /// Force-negative profiles flip positive amounts whose sign the
    /// normalizer left open. Settled signs are never touched.
    fn apply_sign_convention(&self, parsed: ParsedAmount) -> f64 {
        match self.profile.sign_convention {
            SignConvention::ForceNegative if !parsed.sign_resolved && parsed.value > 0.0 => -parsed.value,
            _ => parsed.value,
        }
    }

    fn text(&self, row: &[Cell], field: F) -> Option<String> {
        self.mapping.cell(row, field).and_then(Cell::trimmed)
    }

    /// Installment counters default to 1.
    fn count(&self, row: &[Cell], field: F) -> u32 {
        self.mapping
            .cell(row, field)
            .and_then(parse_plain_number)
            .filter(|n| *n >= 1.0 && *n <= u32::MAX as f64)
            .map(|n| n as u32)
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AmountCell {
    Missing,
    Invalid(String),
    Zero(ParsedAmount),
    Value(ParsedAmount),
}

// ============================================================================
// HELPERS
// ============================================================================

fn is_installment(transaction_type: &str) -> bool {
    let lower = transaction_type.to_lowercase();
    INSTALLMENT_MARKERS.iter().any(|m| lower.contains(m))
}

/// First day of the month before `date`.
fn previous_month_start(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?.pred_opt()?.with_day(1)
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// `day` in the month of `month_start`, clamped to the month's last day.
fn date_in_month(month_start: NaiveDate, day: u32) -> Option<NaiveDate> {
    (1..=day)
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(month_start.year(), month_start.month(), d))
}

/// Last four digits of a card field, zero-padded ("4580-1234" → "1234", "12" → "0012").
pub fn last_four_digits(text: &str) -> Option<String> {
    let digits: Vec<char> = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    Some(format!("{:0>4}", tail))
}

// ============================================================================
// TESTS
// ============================================================================
