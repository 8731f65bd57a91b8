// 🏷️ Format Classifier - Score a header against every known layout
// Required-column coverage dominates; keywords only nudge

use crate::formats::{catalog, FormatId, FormatProfile, GENERIC};
use crate::mapper::normalize_header;
use serde::Serialize;

/// Alternative-column coverage counts for less than required coverage.
pub const ALTERNATIVE_WEIGHT: f64 = 0.8;

/// Keyword hits alone can never clear the strict threshold.
pub const KEYWORD_WEIGHT: f64 = 0.6;

/// Confidence granted to a hinted profile once enough of its required columns match.
pub const HINT_CONFIDENCE: f64 = 0.9;

/// Required-column coverage a hinted profile needs before the hint counts.
pub const HINT_MIN_REQUIRED_COVERAGE: f64 = 0.5;

// ============================================================================
// SCORES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FormatScore {
    pub format: FormatId,
    pub required_coverage: f64,
    pub alternative_coverage: f64,
    pub keyword_coverage: f64,
    pub confidence: f64,
}

impl FormatScore {
    /// A hint only confirms a layout whose core columns are mostly there.
    fn supports_hint(&self) -> bool {
        self.required_coverage >= HINT_MIN_REQUIRED_COVERAGE
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    #[serde(skip)]
    pub profile: &'static FormatProfile,
    pub format: FormatId,
    /// Zero for the generic fallback.
    pub confidence: f64,
    pub scores: Vec<FormatScore>,
}

impl Classification {
    pub fn is_generic(&self) -> bool {
        self.profile.is_generic()
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Classify a header row. `context` is any other text around it (title rows,
/// file name) searched for issuer keywords.
pub fn classify(headers: &[String], context: &[String], hint: Option<FormatId>) -> Classification {
    let headers: Vec<String> = headers
        .iter()
        .map(|h| normalize_header(h))
        .filter(|h| !h.is_empty())
        .collect();
    let context: Vec<String> = context
        .iter()
        .map(|c| normalize_header(c))
        .filter(|c| !c.is_empty())
        .collect();

    let mut scores = Vec::new();
    let mut best: Option<(&'static FormatProfile, f64)> = None;

    for profile in catalog() {
        if profile.is_generic() || (profile.hint_only && hint != Some(profile.id)) {
            continue;
        }

        let mut score = score_profile(profile, &headers, &context);
        if hint == Some(profile.id) && score.supports_hint() {
            score.confidence = score.confidence.max(HINT_CONFIDENCE);
        }
        scores.push(score);

        if score.confidence < profile.confidence_threshold() {
            continue;
        }
        // Ties keep the earlier catalog entry
        if best.map_or(true, |(_, conf)| score.confidence > conf) {
            best = Some((profile, score.confidence));
        }
    }

    match best {
        Some((profile, confidence)) => {
            tracing::info!(format = profile.code(), confidence, "format detected");
            Classification {
                profile,
                format: profile.id,
                confidence,
                scores,
            }
        }
        None => {
            tracing::info!("no known format matched, using generic column heuristics");
            Classification {
                profile: &GENERIC,
                format: FormatId::Generic,
                confidence: 0.0,
                scores,
            }
        }
    }
}

/// Coverage ratios and weighted confidence for one profile.
pub fn score_profile(profile: &FormatProfile, headers: &[String], context: &[String]) -> FormatScore {
    let required_coverage = coverage(profile.required_columns, headers);
    let alternative_coverage = coverage(profile.alternative_columns, headers);

    let keyword_coverage = if profile.keywords.is_empty() {
        0.0
    } else {
        let hits = profile
            .keywords
            .iter()
            .filter(|kw| {
                let kw = kw.to_lowercase();
                headers.iter().chain(context.iter()).any(|text| text.contains(&kw))
            })
            .count();
        hits as f64 / profile.keywords.len() as f64
    };

    let confidence = required_coverage
        .max(alternative_coverage * ALTERNATIVE_WEIGHT)
        .max(keyword_coverage * KEYWORD_WEIGHT);

    FormatScore {
        format: profile.id,
        required_coverage,
        alternative_coverage,
        keyword_coverage,
        confidence,
    }
}

fn coverage(specs: &[&[&str]], headers: &[String]) -> f64 {
    if specs.is_empty() {
        return 0.0;
    }
    let matched = specs
        .iter()
        .filter(|aliases| {
            aliases.iter().any(|alias| {
                let alias = alias.to_lowercase();
                headers.iter().any(|h| *h == alias || h.contains(&alias))
            })
        })
        .count();
    matched as f64 / specs.len() as f64
}
