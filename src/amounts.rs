// 💰 Amount Normalizer - Signed values and currency tags from raw amount cells

use crate::table::Cell;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Currency used when neither a column nor a symbol says otherwise.
pub const DEFAULT_CURRENCY: &str = "ILS";

/// Symbol → ISO 4217 code.
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("€", "EUR"),
    ("$", "USD"),
    ("£", "GBP"),
    ("₪", "ILS"),
    ("¥", "JPY"),
    ("₹", "INR"),
    ("₩", "KRW"),
];

/// Currency names as they appear in Hebrew exports.
const CURRENCY_WORDS: &[(&str, &str)] = &[
    ("ש\"ח", "ILS"),
    ("ש''ח", "ILS"),
    ("שח", "ILS"),
    ("שקלים", "ILS"),
    ("שקל", "ILS"),
    ("NIS", "ILS"),
    ("דולרים", "USD"),
    ("דולר", "USD"),
    ("יורו", "EUR"),
    ("ליש\"ט", "GBP"),
    ("פאונד", "GBP"),
];

/// ISO 4217 codes accepted inside amount cells ("150.00 USD", "USD 20").
const ISO_CODES: &[&str] = &[
    "ILS", "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD", "SEK", "NOK", "DKK", "PLN", "CZK",
    "HUF", "RON", "BGN", "TRY", "RUB", "UAH", "INR", "CNY", "HKD", "SGD", "KRW", "THB", "ZAR", "MXN",
    "BRL", "AED", "EGP", "JOD",
];

// ============================================================================
// CURRENCY
// ============================================================================

/// How an amount cell named its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurrencyMark {
    Symbol,
    Name,
}

/// Currency marker embedded in an amount cell: the matched text, its code,
/// and whether it was a symbol or a written name/code.
fn embedded_currency(text: &str) -> Option<(&'static str, &'static str, CurrencyMark)> {
    if let Some(&(symbol, code)) = CURRENCY_SYMBOLS.iter().find(|(symbol, _)| text.contains(symbol)) {
        return Some((symbol, code, CurrencyMark::Symbol));
    }
    if let Some(&(word, code)) = CURRENCY_WORDS.iter().find(|(word, _)| text.contains(word)) {
        return Some((word, code, CurrencyMark::Name));
    }
    text.split(|c: char| !c.is_ascii_alphabetic())
        .find_map(|run| ISO_CODES.iter().find(|code| **code == run))
        .map(|code| (*code, *code, CurrencyMark::Name))
}

/// First currency symbol found in the text.
pub fn currency_from_symbol(text: &str) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(symbol, _)| text.contains(symbol))
        .map(|(_, code)| *code)
}

/// Normalize a currency column value: ISO codes pass through uppercased,
/// symbols and known names map to their code.
pub fn normalize_currency(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(code) = currency_from_symbol(trimmed) {
        return Some(code.to_string());
    }

    let upper = trimmed.to_uppercase();
    if let Some((_, code)) = CURRENCY_WORDS.iter().find(|(word, _)| upper == *word || trimmed.contains(word)) {
        return Some(code.to_string());
    }

    if upper.len() == 3 && upper.chars().all(|c| c.is_ascii_uppercase()) {
        return Some(upper);
    }

    None
}

// ============================================================================
// AMOUNT
// ============================================================================

/// Caller-controlled parsing rules.
#[derive(Debug, Clone, Copy)]
pub struct AmountOptions {
    /// Treat an exact zero as invalid.
    pub reject_zero: bool,
    /// A currency symbol with no explicit minus marks an expense.
    pub symbol_implies_expense: bool,
}

impl Default for AmountOptions {
    fn default() -> Self {
        AmountOptions {
            reject_zero: true,
            symbol_implies_expense: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedAmount {
    pub value: f64,
    /// Currency named inside the cell: symbol, ISO code or written name.
    pub currency: Option<&'static str>,
    /// Sign already settled here (explicit minus or symbol heuristic);
    /// profile sign conventions must not touch it again.
    pub sign_resolved: bool,
}

/// Parse an amount cell. `None` for empty, non-numeric, or rejected zero.
pub fn parse_amount(cell: &Cell, options: AmountOptions) -> Option<ParsedAmount> {
    let parsed = match cell {
        Cell::Empty => return None,
        Cell::Number(n) => ParsedAmount {
            value: *n,
            currency: None,
            sign_resolved: *n < 0.0,
        },
        Cell::Text(text) => parse_amount_text(text, options)?,
    };

    if !parsed.value.is_finite() {
        return None;
    }
    if options.reject_zero && parsed.value == 0.0 {
        return None;
    }
    Some(parsed)
}

fn parse_amount_text(text: &str, options: AmountOptions) -> Option<ParsedAmount> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }

    let marker = embedded_currency(trimmed);
    let parenthesized = trimmed.starts_with('(') && trimmed.ends_with(')');
    let explicit_minus = parenthesized || trimmed.contains('-') || trimmed.contains('−');

    let numeric: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !numeric.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    // Anything besides one currency marker, separators, signs and spaces means this is not an amount.
    let rest = match marker {
        Some((matched, _, _)) => Cow::Owned(trimmed.replacen(matched, "", 1)),
        None => Cow::Borrowed(trimmed),
    };
    if rest.chars().any(char::is_alphabetic) {
        return None;
    }

    let magnitude = normalize_separators(&numeric).parse::<f64>().ok()?;

    let (value, sign_resolved) = if explicit_minus {
        (-magnitude.abs(), true)
    } else if matches!(marker, Some((_, _, CurrencyMark::Symbol)))
        && options.symbol_implies_expense
        && magnitude > 0.0
    {
        (-magnitude, true)
    } else {
        (magnitude, false)
    };

    Some(ParsedAmount {
        value,
        currency: marker.map(|(_, code, _)| code),
        sign_resolved,
    })
}

/// Resolve thousands vs decimal separators into a plain `1234.56` string.
fn normalize_separators(numeric: &str) -> String {
    let has_comma = numeric.contains(',');
    let has_dot = numeric.contains('.');

    match (has_comma, has_dot) {
        // The later separator is the decimal point: "1.234,56" and "1,234.56"
        (true, true) => {
            let last_comma = numeric.rfind(',').unwrap_or(0);
            let last_dot = numeric.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                numeric.replace('.', "").replace(',', ".")
            } else {
                numeric.replace(',', "")
            }
        }
        (true, false) => {
            let groups: Vec<&str> = numeric.split(',').collect();
            let thousands = groups.len() > 2
                || (groups.len() == 2 && groups[1].len() == 3 && !groups[0].is_empty());
            if thousands {
                numeric.replace(',', "")
            } else {
                numeric.replace(',', ".")
            }
        }
        (false, true) if numeric.matches('.').count() > 1 => numeric.replace('.', ""),
        _ => numeric.to_string(),
    }
}

/// Lenient numeric parse for auxiliary columns (quantity, payment numbers).
pub fn parse_plain_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(text) => {
            let numeric: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
                .collect();
            if numeric.is_empty() {
                return None;
            }
            let negative = numeric.starts_with('-');
            let magnitude = normalize_separators(&numeric.replace('-', "")).parse::<f64>().ok()?;
            Some(if negative { -magnitude } else { magnitude })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<ParsedAmount> {
        parse_amount(&Cell::text(text), AmountOptions::default())
    }

    #[test]
    fn test_symbol_only_implies_expense() {
        let amount = parse("150€").unwrap();
        assert_eq!(amount.value, -150.0);
        assert_eq!(amount.currency, Some("EUR"));
        assert!(amount.sign_resolved);
    }

    #[test]
    fn test_explicit_minus_never_double_negated() {
        assert_eq!(parse("-150€").unwrap().value, -150.0);
        assert_eq!(parse("€-150").unwrap().value, -150.0);
        assert_eq!(parse("-150").unwrap().value, -150.0);
        assert_eq!(parse("150-").unwrap().value, -150.0);
        assert_eq!(parse("(150)").unwrap().value, -150.0);
    }

    #[test]
    fn test_plain_positive_is_unresolved() {
        let amount = parse("150").unwrap();
        assert_eq!(amount.value, 150.0);
        assert_eq!(amount.currency, None);
        assert!(!amount.sign_resolved);
    }

    #[test]
    fn test_symbol_heuristic_can_be_disabled() {
        let options = AmountOptions {
            symbol_implies_expense: false,
            ..AmountOptions::default()
        };
        let amount = parse_amount(&Cell::text("₪150"), options).unwrap();
        assert_eq!(amount.value, 150.0);
        assert_eq!(amount.currency, Some("ILS"));
    }

    #[test]
    fn test_iso_code_is_currency_tag_without_sign_change() {
        let suffixed = parse("150.00 USD").unwrap();
        assert_eq!(suffixed.value, 150.0);
        assert_eq!(suffixed.currency, Some("USD"));
        assert!(!suffixed.sign_resolved);

        let prefixed = parse("USD 20").unwrap();
        assert_eq!(prefixed.value, 20.0);
        assert_eq!(prefixed.currency, Some("USD"));

        assert_eq!(parse("-1,200.50 EUR").unwrap().value, -1200.5);
        assert_eq!(parse("-1,200.50 EUR").unwrap().currency, Some("EUR"));
    }

    #[test]
    fn test_written_currency_names() {
        let shekels = parse("150 שקלים").unwrap();
        assert_eq!(shekels.value, 150.0);
        assert_eq!(shekels.currency, Some("ILS"));
        assert_eq!(parse("75 NIS").unwrap().currency, Some("ILS"));
    }

    #[test]
    fn test_text_beyond_currency_marker_is_rejected() {
        assert_eq!(parse("Cafe 150 USD"), None);
        assert_eq!(parse("150 ABC"), None);
    }

    #[test]
    fn test_separator_heuristics() {
        assert_eq!(parse("1.234,56").unwrap().value, 1234.56);
        assert_eq!(parse("1,234.56").unwrap().value, 1234.56);
        assert_eq!(parse("1,234").unwrap().value, 1234.0);
        assert_eq!(parse("12,5").unwrap().value, 12.5);
        assert_eq!(parse("150,00").unwrap().value, 150.0);
        assert_eq!(parse("1.234.567").unwrap().value, 1234567.0);
        assert_eq!(parse("1,234,567.89").unwrap().value, 1234567.89);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("-"), None);
        assert_eq!(parse("NaN"), None);
        assert_eq!(parse("abc"), None);
        assert_eq!(parse("total"), None);
    }

    #[test]
    fn test_zero_policy() {
        assert_eq!(parse("0"), None);
        assert_eq!(parse("0.00"), None);

        let allow_zero = AmountOptions {
            reject_zero: false,
            ..AmountOptions::default()
        };
        assert_eq!(parse_amount(&Cell::text("0"), allow_zero).unwrap().value, 0.0);
    }

    #[test]
    fn test_numeric_cells() {
        let amount = parse_amount(&Cell::Number(-42.5), AmountOptions::default()).unwrap();
        assert_eq!(amount.value, -42.5);
        assert!(amount.sign_resolved);

        let amount = parse_amount(&Cell::Number(42.5), AmountOptions::default()).unwrap();
        assert!(!amount.sign_resolved);
    }

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency("usd"), Some("USD".to_string()));
        assert_eq!(normalize_currency("₪"), Some("ILS".to_string()));
        assert_eq!(normalize_currency("ש\"ח"), Some("ILS".to_string()));
        assert_eq!(normalize_currency("דולר"), Some("USD".to_string()));
        assert_eq!(normalize_currency("dollars"), None);
        assert_eq!(normalize_currency(" "), None);
    }

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(parse_plain_number(&Cell::text("3")), Some(3.0));
        assert_eq!(parse_plain_number(&Cell::text("1,500")), Some(1500.0));
        assert_eq!(parse_plain_number(&Cell::Number(2.0)), Some(2.0));
        assert_eq!(parse_plain_number(&Cell::text("n/a")), None);
    }
}
