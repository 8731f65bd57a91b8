// 🗂️ Format Catalog - Declarative profiles for known statement layouts
// One immutable descriptor per issuer export; selected once by the classifier

use crate::mapper::CanonicalField;
use crate::transaction::SourceType;
use serde::{Deserialize, Serialize};

// ============================================================================
// FORMAT IDENTITY
// ============================================================================

/// Known statement layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatId {
    #[serde(rename = "isracard")]
    Isracard,
    #[serde(rename = "cal")]
    Cal,
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "americanexpress")]
    AmericanExpress,
    #[serde(rename = "leumi")]
    Leumi,
    #[serde(rename = "hapoalim")]
    Hapoalim,
    #[serde(rename = "bank_yahav")]
    BankYahav,
    #[serde(rename = "budgetlens")]
    BudgetLens,
    #[serde(rename = "generic")]
    Generic,
}

impl FormatId {
    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            FormatId::Isracard => "Isracard",
            FormatId::Cal => "Cal",
            FormatId::Max => "Max",
            FormatId::AmericanExpress => "American Express",
            FormatId::Leumi => "Bank Leumi",
            FormatId::Hapoalim => "Bank Hapoalim",
            FormatId::BankYahav => "Bank Yahav",
            FormatId::BudgetLens => "BudgetLens",
            FormatId::Generic => "Generic",
        }
    }

    /// Short code reported as the detected format
    pub fn code(&self) -> &'static str {
        match self {
            FormatId::Isracard => "isracard",
            FormatId::Cal => "cal",
            FormatId::Max => "max",
            FormatId::AmericanExpress => "americanexpress",
            FormatId::Leumi => "leumi",
            FormatId::Hapoalim => "hapoalim",
            FormatId::BankYahav => "bank_yahav",
            FormatId::BudgetLens => "budgetlens",
            FormatId::Generic => "generic",
        }
    }

    pub fn profile(&self) -> &'static FormatProfile {
        match self {
            FormatId::Isracard => &ISRACARD,
            FormatId::Cal => &CAL,
            FormatId::Max => &MAX,
            FormatId::AmericanExpress => &AMERICAN_EXPRESS,
            FormatId::Leumi => &LEUMI,
            FormatId::Hapoalim => &HAPOALIM,
            FormatId::BankYahav => &BANK_YAHAV,
            FormatId::BudgetLens => &BUDGETLENS,
            FormatId::Generic => &GENERIC,
        }
    }

    /// Resolve a caller hint ("cal", "Isracard", "amex", ...).
    pub fn parse(hint: &str) -> Option<FormatId> {
        let normalized: String = hint
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();

        match normalized.as_str() {
            "isracard" => Some(FormatId::Isracard),
            "cal" | "visacal" => Some(FormatId::Cal),
            "max" => Some(FormatId::Max),
            "americanexpress" | "amex" => Some(FormatId::AmericanExpress),
            "leumi" | "bankleumi" => Some(FormatId::Leumi),
            "hapoalim" | "bankhapoalim" | "poalim" => Some(FormatId::Hapoalim),
            "yahav" | "bankyahav" => Some(FormatId::BankYahav),
            "budgetlens" => Some(FormatId::BudgetLens),
            "generic" => Some(FormatId::Generic),
            _ => None,
        }
    }
}

// ============================================================================
// PROFILE RULES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    /// Keep the sign found in the file.
    Preserve,
    /// Positive amounts are charges and become negative.
    ForceNegative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateShiftRule {
    None,
    /// Installment rows belong to the month before their charge date.
    InstallmentToChargeMonthMinusOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryPrecedence {
    /// Keep the category written in the file.
    PreserveSource,
    /// Always ask the category oracle.
    AlwaysAuto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIdentifierSource {
    /// The file carries the card digits; the caller's value is only a fallback.
    FileDerived,
    /// The caller's value wins over anything in the file.
    CallerOverride,
}

/// Ordered column-name candidates for one canonical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldCandidates {
    pub field: CanonicalField,
    pub candidates: &'static [&'static str],
    /// Substring matches containing any of these are rejected.
    pub excluding: &'static [&'static str],
}

const fn field(field: CanonicalField, candidates: &'static [&'static str]) -> FieldCandidates {
    FieldCandidates {
        field,
        candidates,
        excluding: &[],
    }
}

const fn field_excluding(
    field: CanonicalField,
    candidates: &'static [&'static str],
    excluding: &'static [&'static str],
) -> FieldCandidates {
    FieldCandidates {
        field,
        candidates,
        excluding,
    }
}

// ============================================================================
// FORMAT PROFILE
// ============================================================================

/// Immutable descriptor of one source layout.
///
/// Column specs are alias lists: a spec is matched when any alias matches.
#[derive(Debug)]
pub struct FormatProfile {
    pub id: FormatId,
    pub required_columns: &'static [&'static [&'static str]],
    pub alternative_columns: &'static [&'static [&'static str]],
    pub keywords: &'static [&'static str],
    /// Field resolution order matters: earlier fields claim columns first.
    pub fields: &'static [FieldCandidates],
    pub sign_convention: SignConvention,
    pub default_category: &'static str,
    pub date_shift: DateShiftRule,
    pub category_precedence: CategoryPrecedence,
    pub payment_identifier_source: PaymentIdentifierSource,
    /// Needs 0.7 confidence instead of 0.5 (card issuers with look-alike exports).
    pub strict: bool,
    /// Missing header row is fatal for this layout.
    pub requires_header: bool,
    /// Only chosen when the caller names it; its columns overlap another issuer's.
    pub hint_only: bool,
    /// Days added to spreadsheet serial dates.
    pub serial_day_offset: i64,
    pub source_type: SourceType,
    /// Currency symbol with no minus marks an expense.
    pub symbol_implies_expense: bool,
    /// Business names use `/` as a word separator.
    pub slash_separated_names: bool,
    pub payment_method: Option<&'static str>,
}

pub const STRICT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

pub const VARIABLE_EXPENSES: &str = "הוצאות משתנות";
pub const VARIABLE_INCOME: &str = "הכנסות משתנות";

impl FormatProfile {
    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn code(&self) -> &'static str {
        self.id.code()
    }

    pub fn is_generic(&self) -> bool {
        self.id == FormatId::Generic
    }

    pub fn confidence_threshold(&self) -> f64 {
        if self.strict {
            STRICT_CONFIDENCE_THRESHOLD
        } else {
            DEFAULT_CONFIDENCE_THRESHOLD
        }
    }

    /// Required followed by alternative column specs.
    pub fn expected_headers(&self) -> impl Iterator<Item = &'static [&'static str]> {
        self.required_columns
            .iter()
            .chain(self.alternative_columns.iter())
            .copied()
    }

    pub fn candidates_for(&self, field: CanonicalField) -> Option<&FieldCandidates> {
        self.fields.iter().find(|f| f.field == field)
    }
}

/// Every profile, in tie-break order. Generic is last and never scored.
pub fn catalog() -> [&'static FormatProfile; 9] {
    [
        &ISRACARD,
        &CAL,
        &MAX,
        &AMERICAN_EXPRESS,
        &LEUMI,
        &HAPOALIM,
        &BANK_YAHAV,
        &BUDGETLENS,
        &GENERIC,
    ]
}

use crate::mapper::CanonicalField as F;

// ============================================================================
// CREDIT CARD ISSUERS
// ============================================================================

pub static ISRACARD: FormatProfile = FormatProfile {
    id: FormatId::Isracard,
    required_columns: &[
        &["תאריך רכישה", "purchase date"],
        &["תאריך חיוב בבנק", "תאריך חיוב", "charge date"],
        &["שם בית העסק", "merchant name"],
        &["סכום עסקה", "transaction amount"],
        &["מטבע מקור", "original currency"],
        &["סכום חיוב", "charge amount"],
        &["מטבע", "currency"],
        &["מס' שובר", "מספר שובר", "voucher number"],
    ],
    alternative_columns: &[&["פירוט נוסף", "additional details"], &["סוג כרטיס", "card type"]],
    keywords: &["ישראכרט", "isracard", "גולד", "מסטרקארד", "mastercard"],
    fields: &[
        field(F::PaymentDate, &["תאריך רכישה", "purchase date"]),
        field(F::ChargeDate, &["תאריך חיוב בבנק", "תאריך חיוב", "charge date"]),
        field(F::BusinessName, &["שם בית העסק", "שם בית עסק", "merchant name", "business name"]),
        field(F::OriginalAmount, &["סכום עסקה", "transaction amount"]),
        field(F::OriginalCurrency, &["מטבע מקור", "original currency"]),
        field(F::Amount, &["סכום חיוב", "charge amount"]),
        field(F::Currency, &["מטבע חיוב", "מטבע", "charge currency", "currency"]),
        field(F::TransactionType, &["סוג עסקה", "transaction type"]),
        field(F::Notes, &["פירוט נוסף", "additional details", "notes"]),
    ],
    sign_convention: SignConvention::ForceNegative,
    default_category: VARIABLE_EXPENSES,
    date_shift: DateShiftRule::None,
    category_precedence: CategoryPrecedence::AlwaysAuto,
    payment_identifier_source: PaymentIdentifierSource::CallerOverride,
    strict: true,
    requires_header: false,
    hint_only: false,
    serial_day_offset: 0,
    source_type: SourceType::CreditCard,
    symbol_implies_expense: true,
    slash_separated_names: false,
    payment_method: Some("isracard"),
};

pub static CAL: FormatProfile = FormatProfile {
    id: FormatId::Cal,
    required_columns: &[
        &["תאריך עסקה", "transaction date"],
        &["שם בית עסק", "שם בית העסק", "business name"],
        &["סכום עסקה", "transaction amount"],
        &["סכום חיוב", "charge amount"],
    ],
    alternative_columns: &[
        &["סוג עסקה", "transaction type"],
        &["ענף", "sector"],
        &["הערות", "notes"],
    ],
    keywords: &["visa cal", "כאל", "קאל", "דיינרס", "diners", "פירוט חיובים"],
    fields: &[
        field(F::PaymentDate, &["תאריך עסקה", "transaction date"]),
        field(F::ChargeDate, &["תאריך חיוב", "charge date"]),
        field(F::BusinessName, &["שם בית עסק", "שם בית העסק", "business name"]),
        field(F::OriginalAmount, &["סכום עסקה", "transaction amount"]),
        field(F::Amount, &["סכום חיוב", "charge amount"]),
        field(F::OriginalCurrency, &["מטבע עסקה", "original currency"]),
        field(F::Currency, &["מטבע חיוב", "מטבע", "currency"]),
        field(F::TransactionType, &["סוג עסקה", "transaction type"]),
        field(F::SourceCategory, &["ענף", "sector", "category"]),
        field(F::Notes, &["הערות", "notes"]),
    ],
    sign_convention: SignConvention::ForceNegative,
    default_category: VARIABLE_EXPENSES,
    date_shift: DateShiftRule::None,
    category_precedence: CategoryPrecedence::AlwaysAuto,
    payment_identifier_source: PaymentIdentifierSource::CallerOverride,
    strict: true,
    requires_header: false,
    hint_only: false,
    serial_day_offset: -1,
    source_type: SourceType::CreditCard,
    symbol_implies_expense: true,
    slash_separated_names: false,
    payment_method: Some("cal"),
};

pub static MAX: FormatProfile = FormatProfile {
    id: FormatId::Max,
    required_columns: &[
        &["תאריך עסקה", "transaction date"],
        &["שם בית העסק", "business name"],
        &["קטגוריה", "category"],
        &["4 ספרות אחרונות של כרטיס האשראי", "last 4 digits"],
        &["סוג עסקה", "transaction type"],
        &["סכום חיוב", "charge amount"],
    ],
    alternative_columns: &[
        &["תאריך חיוב", "charge date"],
        &["סכום עסקה מקורי", "original amount"],
        &["מטבע עסקה מקורי", "original currency"],
        &["הערות", "notes"],
    ],
    keywords: &["max", "מקס", "לאומי קארד", "leumi card"],
    fields: &[
        field(F::PaymentDate, &["תאריך עסקה", "transaction date"]),
        field(F::ChargeDate, &["תאריך חיוב", "charge date"]),
        field(F::BusinessName, &["שם בית העסק", "business name"]),
        field(F::SourceCategory, &["קטגוריה", "category"]),
        field(
            F::PaymentIdentifier,
            &["4 ספרות אחרונות של כרטיס האשראי", "4 ספרות אחרונות", "last 4 digits"],
        ),
        field(F::TransactionType, &["סוג עסקה", "transaction type"]),
        field(F::OriginalAmount, &["סכום עסקה מקורי", "original amount"]),
        field(F::OriginalCurrency, &["מטבע עסקה מקורי", "original currency"]),
        field(F::Amount, &["סכום חיוב", "charge amount"]),
        field(F::Currency, &["מטבע חיוב", "charge currency"]),
        field(F::Notes, &["הערות", "notes"]),
    ],
    sign_convention: SignConvention::ForceNegative,
    default_category: VARIABLE_EXPENSES,
    date_shift: DateShiftRule::InstallmentToChargeMonthMinusOne,
    category_precedence: CategoryPrecedence::AlwaysAuto,
    payment_identifier_source: PaymentIdentifierSource::FileDerived,
    strict: false,
    requires_header: false,
    hint_only: false,
    serial_day_offset: 0,
    source_type: SourceType::CreditCard,
    symbol_implies_expense: true,
    slash_separated_names: false,
    payment_method: Some("max"),
};

pub static AMERICAN_EXPRESS: FormatProfile = FormatProfile {
    id: FormatId::AmericanExpress,
    required_columns: &[
        &["תאריך רכישה", "purchase date"],
        &["שם בית עסק", "שם בית העסק", "business name"],
    ],
    alternative_columns: &[&["סכום חיוב", "charge amount"], &["פירוט נוסף", "additional details"]],
    keywords: &["american express", "אמריקן אקספרס", "amex"],
    fields: &[
        field(F::PaymentDate, &["תאריך רכישה", "purchase date"]),
        field(F::ChargeDate, &["תאריך חיוב", "charge date"]),
        field(F::BusinessName, &["שם בית עסק", "שם בית העסק", "business name"]),
        field(F::OriginalAmount, &["סכום עסקה", "transaction amount"]),
        field(F::OriginalCurrency, &["מטבע עסקה", "מטבע מקור", "original currency"]),
        field(F::Amount, &["סכום חיוב", "charge amount"]),
        field(F::Currency, &["מטבע חיוב", "מטבע", "currency"]),
        field(F::Notes, &["פירוט נוסף", "additional details"]),
    ],
    sign_convention: SignConvention::ForceNegative,
    default_category: VARIABLE_EXPENSES,
    date_shift: DateShiftRule::None,
    category_precedence: CategoryPrecedence::AlwaysAuto,
    payment_identifier_source: PaymentIdentifierSource::CallerOverride,
    strict: false,
    requires_header: true,
    hint_only: true,
    serial_day_offset: 0,
    source_type: SourceType::CreditCard,
    symbol_implies_expense: true,
    slash_separated_names: false,
    payment_method: Some("americanexpress"),
};

// ============================================================================
// BANK ACCOUNTS
// ============================================================================

pub static LEUMI: FormatProfile = FormatProfile {
    id: FormatId::Leumi,
    required_columns: &[&["תאריך", "date"], &["תיאור", "description"], &["זכות/חובה", "credit/debit"]],
    alternative_columns: &[
        &["בזכות", "credit"],
        &["בחובה", "debit"],
        &["תאריך ערך", "value date"],
    ],
    keywords: &["לאומי", "leumi"],
    fields: &[
        field(F::ChargeDate, &["תאריך ערך", "value date"]),
        field(F::PaymentDate, &["תאריך", "date"]),
        field(F::BusinessName, &["תיאור", "description"]),
        field(F::Amount, &["זכות/חובה", "credit/debit"]),
        field(F::Credit, &["בזכות", "זכות", "credit"]),
        field(F::Debit, &["בחובה", "חובה", "debit"]),
        field(F::Notes, &["הערות", "notes"]),
    ],
    sign_convention: SignConvention::Preserve,
    default_category: VARIABLE_EXPENSES,
    date_shift: DateShiftRule::None,
    category_precedence: CategoryPrecedence::AlwaysAuto,
    payment_identifier_source: PaymentIdentifierSource::CallerOverride,
    strict: false,
    requires_header: false,
    hint_only: false,
    serial_day_offset: 0,
    source_type: SourceType::BankAccount,
    symbol_implies_expense: true,
    slash_separated_names: false,
    payment_method: None,
};

pub static HAPOALIM: FormatProfile = FormatProfile {
    id: FormatId::Hapoalim,
    required_columns: &[&["תאריך ביצוע"], &["פירוט נוסף", "תיאור הפעולה"], &["סכום"]],
    alternative_columns: &[&["תאריך ערך"], &["יתרה", "יתרה בש\"ח"]],
    keywords: &["הפועלים", "hapoalim", "poalim"],
    fields: &[
        field(F::ChargeDate, &["תאריך ערך"]),
        field(F::PaymentDate, &["תאריך ביצוע", "תאריך"]),
        field(F::BusinessName, &["פירוט נוסף", "תיאור הפעולה", "תיאור"]),
        field_excluding(F::Amount, &["סכום"], &["יתרה"]),
        field(F::Credit, &["זכות"]),
        field(F::Debit, &["חובה"]),
        field(F::Notes, &["הערות"]),
    ],
    sign_convention: SignConvention::Preserve,
    default_category: VARIABLE_EXPENSES,
    date_shift: DateShiftRule::None,
    category_precedence: CategoryPrecedence::AlwaysAuto,
    payment_identifier_source: PaymentIdentifierSource::CallerOverride,
    strict: false,
    requires_header: false,
    hint_only: false,
    serial_day_offset: 0,
    source_type: SourceType::BankAccount,
    symbol_implies_expense: true,
    slash_separated_names: false,
    payment_method: None,
};

pub static BANK_YAHAV: FormatProfile = FormatProfile {
    id: FormatId::BankYahav,
    required_columns: &[
        &["תאריך"],
        &["אסמכתא"],
        &["תיאור פעולה"],
        &["חובה(₪)", "חובה (₪)"],
        &["זכות(₪)", "זכות (₪)"],
    ],
    alternative_columns: &[&["תאריך ערך"], &["יתרה(₪)", "יתרה (₪)"]],
    keywords: &["יהב", "yahav"],
    fields: &[
        field(F::ChargeDate, &["תאריך ערך"]),
        field(F::PaymentDate, &["תאריך"]),
        field(F::BusinessName, &["תיאור פעולה"]),
        field(F::Debit, &["חובה(₪)", "חובה (₪)", "חובה"]),
        field(F::Credit, &["זכות(₪)", "זכות (₪)", "זכות"]),
        field(F::Notes, &["הערות", "פרטים"]),
    ],
    sign_convention: SignConvention::Preserve,
    default_category: VARIABLE_EXPENSES,
    date_shift: DateShiftRule::None,
    category_precedence: CategoryPrecedence::AlwaysAuto,
    payment_identifier_source: PaymentIdentifierSource::CallerOverride,
    strict: false,
    requires_header: false,
    hint_only: false,
    serial_day_offset: 0,
    source_type: SourceType::BankAccount,
    symbol_implies_expense: true,
    slash_separated_names: true,
    payment_method: None,
};

// ============================================================================
// EXPORTS
// ============================================================================

pub static BUDGETLENS: FormatProfile = FormatProfile {
    id: FormatId::BudgetLens,
    required_columns: &[&["שם העסק"], &["תאריך התשלום"], &["סכום"]],
    alternative_columns: &[
        &["תאריך החיוב בחשבון"],
        &["אמצעי זיהוי התשלום"],
        &["סכום מקורי"],
        &["שייך לתזרים חודש"],
        &["קטגוריה בתזרים"],
    ],
    keywords: &["budgetlens", "budget lens"],
    fields: &[
        field(F::BusinessName, &["שם העסק"]),
        field(F::PaymentDate, &["תאריך התשלום"]),
        field(F::ChargeDate, &["תאריך החיוב בחשבון"]),
        field(F::PaymentIdentifier, &["אמצעי זיהוי התשלום"]),
        field(F::PaymentMethod, &["אמצעי התשלום"]),
        field(F::OriginalAmount, &["סכום מקורי"]),
        field(F::OriginalCurrency, &["מטבע מקור"]),
        field(F::Amount, &["סכום"]),
        field(F::Currency, &["מטבע"]),
        field(F::FlowMonth, &["שייך לתזרים חודש"]),
        field(F::Category, &["קטגוריה בתזרים"]),
        field(F::TotalPayments, &["מספר תשלומים"]),
        field(F::PaymentNumber, &["מספר תשלום"]),
        field(F::Notes, &["הערות"]),
    ],
    sign_convention: SignConvention::Preserve,
    default_category: VARIABLE_EXPENSES,
    date_shift: DateShiftRule::None,
    category_precedence: CategoryPrecedence::PreserveSource,
    payment_identifier_source: PaymentIdentifierSource::FileDerived,
    strict: false,
    requires_header: false,
    hint_only: false,
    serial_day_offset: 0,
    source_type: SourceType::CreditCard,
    symbol_implies_expense: false,
    slash_separated_names: false,
    payment_method: None,
};

/// Fallback: column-name substring heuristics only.
pub static GENERIC: FormatProfile = FormatProfile {
    id: FormatId::Generic,
    required_columns: &[],
    alternative_columns: &[],
    keywords: &[],
    fields: &[
        field(
            F::ChargeDate,
            &["תאריך חיוב", "תאריך ערך", "charge date", "value date", "posting date", "posted date"],
        ),
        field(
            F::PaymentDate,
            &[
                "תאריך עסקה",
                "תאריך רכישה",
                "תאריך התשלום",
                "תאריך ביצוע",
                "transaction date",
                "purchase date",
                "payment date",
                "תאריך",
                "date",
            ],
        ),
        field(
            F::BusinessName,
            &[
                "שם בית העסק",
                "שם בית עסק",
                "שם העסק",
                "business name",
                "merchant",
                "payee",
                "business",
                "description",
                "תיאור",
            ],
        ),
        field(F::OriginalAmount, &["סכום עסקה", "סכום מקורי", "original amount", "transaction amount"]),
        field(F::OriginalCurrency, &["מטבע מקור", "מטבע עסקה", "original currency"]),
        field_excluding(F::Amount, &["סכום חיוב", "charge amount", "סכום", "amount"], &["יתרה", "balance"]),
        field(F::Debit, &["חובה", "debit", "withdrawal"]),
        field_excluding(F::Credit, &["זכות", "credit", "deposit"], &["card", "כרטיס"]),
        field(F::Currency, &["מטבע", "currency"]),
        field(F::PaymentIdentifier, &["4 ספרות", "אמצעי זיהוי", "card number", "last 4"]),
        field(F::PaymentMethod, &["אמצעי תשלום", "payment method"]),
        field(F::Category, &["קטגוריה בתזרים", "flow category"]),
        field(F::SourceCategory, &["קטגוריה", "ענף", "category", "sector"]),
        field(F::FlowMonth, &["שייך לתזרים חודש", "flow month"]),
        field(F::TotalPayments, &["מספר תשלומים", "total payments", "installments"]),
        field(F::PaymentNumber, &["מספר תשלום", "payment number", "installment number"]),
        field(F::TransactionType, &["סוג עסקה", "transaction type", "type"]),
        field(F::Quantity, &["כמות", "quantity", "qty"]),
        field(F::Notes, &["הערות", "פירוט נוסף", "notes", "memo", "details"]),
    ],
    sign_convention: SignConvention::Preserve,
    default_category: VARIABLE_EXPENSES,
    date_shift: DateShiftRule::None,
    category_precedence: CategoryPrecedence::AlwaysAuto,
    payment_identifier_source: PaymentIdentifierSource::CallerOverride,
    strict: false,
    requires_header: false,
    hint_only: false,
    serial_day_offset: 0,
    source_type: SourceType::CreditCard,
    symbol_implies_expense: true,
    slash_separated_names: false,
    payment_method: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_codes_round_trip_through_parse() {
        for profile in catalog() {
            assert_eq!(FormatId::parse(profile.code()), Some(profile.id));
            assert_eq!(profile.id.profile().id, profile.id);
        }
    }

    #[test]
    fn test_parse_hint_aliases() {
        assert_eq!(FormatId::parse("Amex"), Some(FormatId::AmericanExpress));
        assert_eq!(FormatId::parse("bank-yahav"), Some(FormatId::BankYahav));
        assert_eq!(FormatId::parse(" CAL "), Some(FormatId::Cal));
        assert_eq!(FormatId::parse("unknown bank"), None);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(CAL.confidence_threshold(), 0.7);
        assert_eq!(ISRACARD.confidence_threshold(), 0.7);
        assert_eq!(MAX.confidence_threshold(), 0.5);
    }

    #[test]
    fn test_profile_rules() {
        assert_eq!(CAL.serial_day_offset, -1);
        assert_eq!(MAX.date_shift, DateShiftRule::InstallmentToChargeMonthMinusOne);
        assert_eq!(BUDGETLENS.category_precedence, CategoryPrecedence::PreserveSource);
        assert_eq!(BUDGETLENS.sign_convention, SignConvention::Preserve);
        assert!(AMERICAN_EXPRESS.requires_header);
        assert_eq!(BANK_YAHAV.source_type, SourceType::BankAccount);
    }

    #[test]
    fn test_every_profile_can_locate_core_fields() {
        for profile in catalog() {
            assert!(profile.candidates_for(CanonicalField::BusinessName).is_some(), "{}", profile.name());
            assert!(profile.candidates_for(CanonicalField::PaymentDate).is_some(), "{}", profile.name());
            let has_amount = profile.candidates_for(CanonicalField::Amount).is_some()
                || profile.candidates_for(CanonicalField::Debit).is_some();
            assert!(has_amount, "{}", profile.name());
        }
    }

    #[test]
    fn test_expected_headers_cover_required_then_alternative() {
        let expected: Vec<_> = CAL.expected_headers().collect();
        assert_eq!(expected.len(), 7);
        assert_eq!(expected[0][0], "תאריך עסקה");
    }
}
