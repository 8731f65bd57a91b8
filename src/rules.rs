// 🏷️ Category Rules - Keyword rules as data
// Pattern matching on business names, with sign-based defaults as the last resort

use crate::formats::{CategoryPrecedence, FormatId, VARIABLE_EXPENSES, VARIABLE_INCOME};
use crate::oracle::CategoryOracle;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Rule ID for tracking
    pub id: String,

    /// Pattern to match (supports wildcards with *)
    pub pattern: String,

    /// Category to assign
    pub category: String,

    /// Only applies to expenses (negative) or income (positive) when set
    #[serde(default)]
    pub direction: Option<Direction>,

    /// Confidence score (0.0 - 1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    pub description: Option<String>,

    /// Priority (higher = applied first)
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Expense,
    Income,
}

impl Direction {
    fn of(amount: f64) -> Direction {
        if amount > 0.0 {
            Direction::Income
        } else {
            Direction::Expense
        }
    }
}

fn default_confidence() -> f64 {
    1.0
}

impl CategoryRule {
    pub fn new(id: &str, pattern: &str, category: &str) -> Self {
        CategoryRule {
            id: id.to_string(),
            pattern: pattern.to_string(),
            category: category.to_string(),
            direction: None,
            confidence: default_confidence(),
            description: None,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Check if pattern matches the given text
    pub fn matches(&self, text: &str) -> bool {
        let pattern_lower = self.pattern.to_lowercase();
        let text_lower = text.to_lowercase();

        if !pattern_lower.contains('*') {
            return text_lower.contains(&pattern_lower);
        }

        let parts: Vec<&str> = pattern_lower.split('*').collect();
        let first = parts[0];
        let last = parts[parts.len() - 1];

        if !text_lower.starts_with(first) {
            return false;
        }
        if !text_lower[first.len()..].ends_with(last) {
            return false;
        }

        // Middle parts appear in order between the anchors
        let mut pos = first.len();
        let end = text_lower.len() - last.len();
        for part in &parts[1..parts.len() - 1] {
            if part.is_empty() {
                continue;
            }
            match text_lower[pos..end.max(pos)].find(part) {
                Some(found) => pos += found + part.len(),
                None => return false,
            }
        }
        true
    }

    fn applies_to(&self, amount: f64) -> bool {
        self.direction.map_or(true, |d| d == Direction::of(amount))
    }
}

// ============================================================================
// RULE ENGINE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub category: String,
    pub confidence: f64,
    pub rule_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<CategoryRule>,
}

impl RuleEngine {
    /// Create a new empty rule engine
    pub fn new() -> Self {
        RuleEngine { rules: Vec::new() }
    }

    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<CategoryRule> =
            serde_json::from_str(&content).context("Failed to parse category rules JSON")?;

        Ok(RuleEngine::from_rules(rules))
    }

    /// Create engine from a list of rules
    pub fn from_rules(mut rules: Vec<CategoryRule>) -> Self {
        // Stable: equal priorities keep file order
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        RuleEngine { rules }
    }

    pub fn add_rule(&mut self, rule: CategoryRule) {
        self.rules.push(rule);
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// First matching rule by priority.
    pub fn classify(&self, business_name: &str, amount: f64) -> Option<RuleMatch> {
        self.rules
            .iter()
            .find(|rule| rule.applies_to(amount) && rule.matches(business_name))
            .map(|rule| RuleMatch {
                category: rule.category.clone(),
                confidence: rule.confidence,
                rule_id: rule.id.clone(),
            })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// Income/expense default by sign.
pub fn sign_default_category(amount: f64) -> &'static str {
    match Direction::of(amount) {
        Direction::Income => VARIABLE_INCOME,
        Direction::Expense => VARIABLE_EXPENSES,
    }
}

impl CategoryOracle for RuleEngine {
    fn most_frequent_category(&self, _business_name: &str, _user_id: Option<&str>) -> Option<String> {
        None
    }

    /// Matching rule, else a sign-based default. Formats that keep their own
    /// categories get no automatic suggestion.
    fn auto_category(
        &self,
        business_name: &str,
        amount: f64,
        format_name: &str,
        _user_id: Option<&str>,
    ) -> Option<String> {
        if let Some(found) = self.classify(business_name, amount) {
            return Some(found.category);
        }

        let preserves_source = FormatId::parse(format_name)
            .map(|id| id.profile().category_precedence == CategoryPrecedence::PreserveSource)
            .unwrap_or(false);
        if preserves_source {
            return None;
        }

        Some(sign_default_category(amount).to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
