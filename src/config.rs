// ⚙️ Ingest Configuration - Per-run options, loadable from JSON

use crate::amounts::DEFAULT_CURRENCY;
use crate::formats::FormatId;
use crate::header::HEADER_SCAN_ROWS;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Rows built between progress events and cancellation checks.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Caller's guess at the layout ("cal", "max", ...)
    pub format_hint: Option<String>,
    pub user_id: Option<String>,
    /// Payment method chosen by the caller, overriding profile defaults
    pub payment_method: Option<String>,
    /// Card digits supplied by the caller
    pub payment_identifier: Option<String>,
    pub default_currency: String,
    pub chunk_size: usize,
    pub header_scan_rows: usize,
    pub reject_zero_amounts: bool,
    pub check_duplicates: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            format_hint: None,
            user_id: None,
            payment_method: None,
            payment_identifier: None,
            default_currency: DEFAULT_CURRENCY.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            header_scan_rows: HEADER_SCAN_ROWS,
            reject_zero_amounts: true,
            check_duplicates: true,
        }
    }
}

impl IngestConfig {
    /// Load configuration from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: IngestConfig = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be at least 1");
        }
        if self.header_scan_rows == 0 {
            bail!("header_scan_rows must be at least 1");
        }
        if let Some(hint) = &self.format_hint {
            if FormatId::parse(hint).is_none() {
                bail!("unknown format hint '{}'", hint);
            }
        }
        Ok(())
    }

    /// Resolved format hint; unknown hints are ignored.
    pub fn format(&self) -> Option<FormatId> {
        self.format_hint.as_deref().and_then(FormatId::parse)
    }

    pub fn with_format_hint(mut self, hint: &str) -> Self {
        self.format_hint = Some(hint.to_string());
        self
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_payment_identifier(mut self, identifier: &str) -> Self {
        self.payment_identifier = Some(identifier.to_string());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.default_currency, "ILS");
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.header_scan_rows, 20);
        assert!(config.reject_zero_amounts);
        assert!(config.check_duplicates);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingest.json");
        fs::write(&path, r#"{"format_hint": "max", "chunk_size": 100}"#).unwrap();

        let config = IngestConfig::from_file(&path).unwrap();

        assert_eq!(config.format(), Some(FormatId::Max));
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.default_currency, "ILS");
    }

    #[test]
    fn test_validation() {
        assert!(IngestConfig::default().with_chunk_size(0).validate().is_err());
        assert!(IngestConfig::default().with_format_hint("nope").validate().is_err());
        assert!(IngestConfig::default().with_format_hint("amex").validate().is_ok());
    }
}
