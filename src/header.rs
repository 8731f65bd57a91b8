// 🔎 Header Locator - Find the header row inside a raw cell grid
// Exports often carry title rows, account details and blank lines above the header

use crate::formats::FormatProfile;
use crate::mapper::normalize_header;
use crate::table::{Cell, RawTable};
use serde::{Deserialize, Serialize};

/// Rows scanned from the top of the table.
pub const HEADER_SCAN_ROWS: usize = 20;

/// Matching cells needed for a row to qualify.
pub const MIN_HEADER_MATCHES: usize = 3;

/// Share of expected headers needed for layouts that require a structural header.
pub const STRICT_HEADER_RATIO: f64 = 0.7;

/// Header vocabulary used when no format is hinted.
const GENERIC_HEADER_KEYWORDS: &[&str] = &[
    "תאריך",
    "date",
    "סכום",
    "amount",
    "שם בית",
    "שם העסק",
    "business",
    "merchant",
    "payee",
    "description",
    "תיאור",
    "פירוט",
    "קטגוריה",
    "category",
    "ענף",
    "מטבע",
    "currency",
    "חובה",
    "זכות",
    "debit",
    "credit",
    "הערות",
    "notes",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderLocation {
    pub row_index: usize,
    /// First non-empty cell of the header row.
    pub start_column: usize,
    pub match_count: usize,
}

impl HeaderLocation {
    /// Header texts from `start_column` on.
    pub fn header_cells(&self, table: &RawTable) -> Vec<String> {
        table
            .row(self.row_index)
            .map(|row| {
                row.iter()
                    .skip(self.start_column)
                    .map(|c| c.as_text().trim().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Scan the first `scan_rows` rows for a header. With a hint, the hinted
/// profile's expected headers are used; otherwise a generic vocabulary.
/// The first qualifying row wins.
pub fn locate_header(table: &RawTable, hint: Option<&FormatProfile>, scan_rows: usize) -> Option<HeaderLocation> {
    if let Some(profile) = hint.filter(|p| !p.is_generic()) {
        let found = scan(table, scan_rows, |cells| score_against_profile(cells, profile));
        if found.is_some() || profile.requires_header {
            return found;
        }
        tracing::debug!(format = profile.code(), "hinted headers not found, trying generic vocabulary");
    }

    scan(table, scan_rows, |cells| {
        let count = cells.iter().filter(|c| matches_any(c, GENERIC_HEADER_KEYWORDS)).count();
        (count, count >= MIN_HEADER_MATCHES)
    })
}

fn scan<F>(table: &RawTable, scan_rows: usize, score: F) -> Option<HeaderLocation>
where
    F: Fn(&[String]) -> (usize, bool),
{
    for (row_index, row) in table.rows().iter().take(scan_rows).enumerate() {
        let filled = row.iter().filter(|c| !c.is_empty()).count();
        if filled < 2 {
            continue;
        }

        let cells: Vec<String> = row.iter().map(normalized_cell).collect();
        let (match_count, qualifies) = score(&cells);
        if qualifies {
            let start_column = row.iter().position(|c| !c.is_empty()).unwrap_or(0);
            tracing::debug!(row_index, start_column, match_count, "header row located");
            return Some(HeaderLocation {
                row_index,
                start_column,
                match_count,
            });
        }
    }
    None
}

fn score_against_profile(cells: &[String], profile: &FormatProfile) -> (usize, bool) {
    let match_count = cells
        .iter()
        .filter(|c| profile.expected_headers().any(|aliases| matches_any(c, aliases)))
        .count();

    // Structural headers are the required columns
    let expected = profile.required_columns;
    let matched_specs = expected
        .iter()
        .filter(|aliases| cells.iter().any(|c| matches_any(c, aliases)))
        .count();
    let ratio = if expected.is_empty() {
        0.0
    } else {
        matched_specs as f64 / expected.len() as f64
    };

    let qualifies = match_count >= MIN_HEADER_MATCHES || (profile.requires_header && ratio >= STRICT_HEADER_RATIO);
    (match_count, qualifies)
}

fn normalized_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => normalize_header(s),
        _ => String::new(),
    }
}

/// Cell equals, or contains, one of the terms.
fn matches_any(cell: &str, terms: &[&str]) -> bool {
    !cell.is_empty()
        && terms.iter().any(|term| {
            let term = term.to_lowercase();
            cell == term || cell.contains(&term)
        })
}
