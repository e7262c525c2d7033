//! Dataset Loader: raw source rows → validated `SalesTable`.

use super::normalizer::{
    classify_sentiment, parse_count, parse_currency, parse_percent, parse_rating,
    top_level_category,
};
use super::source::{self, RawRecord, RawTable, SourceFingerprint};
use super::{canonical_fields, canonical_name, source_fields, CleanRecord, SalesTable};
use crate::diagnostics::Diagnostic;
use crate::error::{PipelineError, PipelineResult};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Successful load: the table plus non-fatal diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub table: SalesTable,
    pub diagnostics: Vec<Diagnostic>,
    /// Present when the table was read from a file
    pub fingerprint: Option<SourceFingerprint>,
}

/// Per-column parse failure counters, reported once per load
#[derive(Debug, Default)]
struct RowIssues {
    unparsable_price: usize,
    blank_category: usize,
    blank_product_name: usize,
    nulled: HashMap<&'static str, usize>,
}

impl RowIssues {
    fn null(&mut self, field: &'static str) {
        *self.nulled.entry(field).or_insert(0) += 1;
    }

    fn into_diagnostics(self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if self.unparsable_price > 0 {
            diagnostics.push(Diagnostic::warning(format!(
                "{} row(s) dropped: price could not be parsed",
                self.unparsable_price
            )));
        }
        if self.blank_category > 0 {
            diagnostics.push(Diagnostic::warning(format!(
                "{} row(s) dropped: category is blank",
                self.blank_category
            )));
        }
        if self.blank_product_name > 0 {
            diagnostics.push(Diagnostic::warning(format!(
                "{} row(s) dropped: product name is blank",
                self.blank_product_name
            )));
        }
        // 出力順を固定するためフィールド定義順に並べる
        for field in [
            canonical_fields::ORIGINAL_PRICE,
            canonical_fields::RATING,
            canonical_fields::RATING_COUNT,
            canonical_fields::DISCOUNT_PERCENT,
        ] {
            if let Some(count) = self.nulled.get(field) {
                diagnostics.push(Diagnostic::info(format!(
                    "{} value(s) of '{}' could not be parsed and were left empty",
                    count, field
                )));
            }
        }
        diagnostics
    }
}

/// Cleans a raw source into the canonical table
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    delimiter: u8,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read a file and load it
    pub fn load_path(&self, path: &Path) -> PipelineResult<LoadOutcome> {
        let bytes = source::read_bytes(path)?;
        self.load_bytes(&bytes, path)
    }

    /// Load file contents that were read elsewhere
    pub fn load_bytes(&self, bytes: &[u8], path: &Path) -> PipelineResult<LoadOutcome> {
        let (raw, fingerprint) = source::parse_bytes(bytes, path, self.delimiter)?;
        let mut outcome = self.load(&raw)?;
        outcome.fingerprint = Some(fingerprint);
        info!(
            path = %path.display(),
            rows = outcome.table.len(),
            "Dataset loaded"
        );
        Ok(outcome)
    }

    /// Validate and clean an already-parsed source
    pub fn load(&self, raw: &RawTable) -> PipelineResult<LoadOutcome> {
        if raw.is_empty() {
            return Err(PipelineError::structural("The source contains no rows"));
        }

        let missing: Vec<&str> = source_fields::REQUIRED
            .iter()
            .copied()
            .filter(|field| !raw.has_field(field))
            .collect();
        if !missing.is_empty() {
            warn!(missing = ?missing, found = ?raw.headers, "Required source fields missing");
            return Err(PipelineError::Structural {
                diagnostics: vec![
                    Diagnostic::error(format!(
                        "Required fields not found in the source: {}",
                        missing.join(", ")
                    )),
                    Diagnostic::info(format!(
                        "Fields found in the source: {}",
                        raw.headers.join(", ")
                    )),
                ],
            });
        }

        let mut diagnostics: Vec<Diagnostic> = source_fields::OPTIONAL
            .iter()
            .filter(|field| !raw.has_field(field))
            .map(|field| Diagnostic::info(format!("Optional field '{}' not found", field)))
            .collect();

        let renamed: Vec<&str> = raw.headers.iter().filter_map(|h| canonical_name(h)).collect();
        for required in [canonical_fields::CATEGORY, canonical_fields::PRODUCT_NAME] {
            if !renamed.contains(&required) {
                return Err(PipelineError::structural(format!(
                    "Field '{}' not found after renaming",
                    required
                )));
            }
        }

        let mut issues = RowIssues::default();
        let records: Vec<CleanRecord> = raw
            .records
            .iter()
            .filter_map(|row| clean_row(row, &mut issues))
            .collect();

        let dropped = raw.records.len() - records.len();
        debug!(kept = records.len(), dropped, "Rows cleaned");
        diagnostics.extend(issues.into_diagnostics());

        Ok(LoadOutcome {
            table: SalesTable::new(records),
            diagnostics,
            fingerprint: None,
        })
    }
}

/// Clean one row; `None` means the row is dropped.
fn clean_row(row: &RawRecord, issues: &mut RowIssues) -> Option<CleanRecord> {
    let Some(price) = row.get(source_fields::DISCOUNTED_PRICE).and_then(parse_currency) else {
        issues.unparsable_price += 1;
        return None;
    };
    let Some(category) = row
        .get(source_fields::CATEGORY)
        .map(top_level_category)
        .filter(|c| !c.is_empty())
    else {
        issues.blank_category += 1;
        return None;
    };
    let Some(product_name) = row.get(source_fields::PRODUCT_NAME) else {
        issues.blank_product_name += 1;
        return None;
    };

    let mut optional = |source: &str, canonical: &'static str, parse: fn(&str) -> Option<f64>| {
        let value = row.get(source)?;
        let parsed = parse(value);
        if parsed.is_none() {
            issues.null(canonical);
        }
        parsed
    };

    let original_price = optional(
        source_fields::ACTUAL_PRICE,
        canonical_fields::ORIGINAL_PRICE,
        parse_currency,
    );
    let rating = optional(source_fields::RATING, canonical_fields::RATING, parse_rating);
    let discount_percent = optional(
        source_fields::DISCOUNT_PERCENTAGE,
        canonical_fields::DISCOUNT_PERCENT,
        parse_percent,
    );

    let rating_count = row.get(source_fields::RATING_COUNT).and_then(|value| {
        let parsed = parse_count(value);
        if parsed.is_none() {
            issues.null(canonical_fields::RATING_COUNT);
        }
        parsed
    });

    Some(CleanRecord {
        category,
        product_name: product_name.to_string(),
        price,
        original_price,
        rating,
        rating_count,
        discount_percent,
        sentiment: classify_sentiment(rating),
    })
}
