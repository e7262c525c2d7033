//! Raw delimited source reading.

use crate::diagnostics::Diagnostic;
use crate::error::{PipelineError, PipelineResult};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// One source row, keyed by the original field name.
///
/// Empty cells are stored as absent, so `get` only ever returns real values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field; blank values are treated as absent
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.fields.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Header row plus data rows of a source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, records: Vec<RawRecord>) -> Self {
        Self { headers, records }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// SHA-1 of the source bytes, used to key cached tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFingerprint(pub String);

impl SourceFingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for SourceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read and parse a delimited file. Returns the table and the fingerprint of its bytes.
pub fn read_path(path: &Path, delimiter: u8) -> PipelineResult<(RawTable, SourceFingerprint)> {
    let bytes = read_bytes(path)?;
    parse_bytes(&bytes, path, delimiter)
}

/// Raw file contents, with a not-found hint attached
pub fn read_bytes(path: &Path) -> PipelineResult<Vec<u8>> {
    fs::read(path).map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Source file could not be read");
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::Structural {
                diagnostics: vec![
                    Diagnostic::error(format!("Source file not found: '{}'", path.display())),
                    Diagnostic::info(
                        "Check that the file exists and that the configured path is correct",
                    ),
                ],
            }
        } else {
            PipelineError::structural(format!(
                "Failed to read source file '{}': {}",
                path.display(),
                e
            ))
        }
    })
}

/// Parse bytes already read from `origin`
pub fn parse_bytes(
    bytes: &[u8],
    origin: &Path,
    delimiter: u8,
) -> PipelineResult<(RawTable, SourceFingerprint)> {
    let fingerprint = SourceFingerprint::of_bytes(bytes);
    let content = std::str::from_utf8(bytes).map_err(|e| PipelineError::Structural {
        diagnostics: vec![
            Diagnostic::error(format!(
                "Source '{}' is not valid UTF-8 at byte {}",
                origin.display(),
                e.valid_up_to()
            )),
            Diagnostic::info("Re-export the file with UTF-8 encoding"),
        ],
    })?;
    let table = parse_content(content, delimiter).map_err(|err| match err {
        PipelineError::Structural { mut diagnostics } => {
            diagnostics.push(Diagnostic::info(format!(
                "While parsing '{}'",
                origin.display()
            )));
            PipelineError::Structural { diagnostics }
        }
        other => other,
    })?;

    tracing::debug!(
        path = %origin.display(),
        rows = table.records.len(),
        fingerprint = %fingerprint,
        "Source file parsed"
    );
    Ok((table, fingerprint))
}

/// Parse delimited content with a mandatory header row
pub fn parse_content(content: &str, delimiter: u8) -> PipelineResult<RawTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::structural(format!("Failed to read header row: {}", e)))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            PipelineError::structural(format!("Failed to parse row {}: {}", index + 1, e))
        })?;
        records.push(to_raw_record(&headers, &record));
    }

    Ok(RawTable::new(headers, records))
}

fn to_raw_record(headers: &[String], record: &StringRecord) -> RawRecord {
    let mut raw = RawRecord::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(value) = record.get(idx) {
            raw.insert(header.clone(), value);
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_content_with_quoted_fields() {
        let content = "product_name,discounted_price,category\n\"Cable, USB-C\",\"₹1,099\",Electronics|Cables\n";
        let table = parse_content(content, b',').unwrap();

        assert_eq!(table.headers, vec!["product_name", "discounted_price", "category"]);
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].get("product_name"), Some("Cable, USB-C"));
        assert_eq!(table.records[0].get("discounted_price"), Some("₹1,099"));
    }

    #[test]
    fn test_blank_and_missing_cells_are_absent() {
        let content = "a,b,c\n1,,3\n4\n";
        let table = parse_content(content, b',').unwrap();

        assert_eq!(table.records[0].get("b"), None);
        assert_eq!(table.records[0].get("c"), Some("3"));
        assert_eq!(table.records[1].get("a"), Some("4"));
        assert_eq!(table.records[1].get("c"), None);
    }

    #[test]
    fn test_header_only_source_has_no_rows() {
        let table = parse_content("category,product_name\n", b',').unwrap();
        assert!(table.is_empty());
        assert!(table.has_field("category"));
    }

    #[test]
    fn test_custom_delimiter() {
        let table = parse_content("a;b\n1;2\n", b';').unwrap();
        assert_eq!(table.records[0].get("b"), Some("2"));
    }

    #[test]
    fn test_read_missing_file_is_structural() {
        let err = read_path(Path::new("/definitely/not/here.csv"), b',').unwrap_err();
        assert!(err.is_structural());
        assert!(err.diagnostics()[0].message.contains("not found"));
    }

    #[test]
    fn test_invalid_utf8_is_structural() {
        let bytes = b"category,product_name\nCaf\xe9,Espresso\n";
        let err = parse_bytes(bytes, Path::new("latin1.csv"), b',').unwrap_err();

        assert!(err.is_structural());
        let diagnostics = err.diagnostics();
        assert!(diagnostics[0].message.contains("not valid UTF-8 at byte 25"));
        assert!(diagnostics[0].message.contains("latin1.csv"));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2").unwrap();

        let (_, first) = read_path(file.path(), b',').unwrap();
        let (_, again) = read_path(file.path(), b',').unwrap();
        assert_eq!(first, again);

        writeln!(file, "3,4").unwrap();
        let (_, changed) = read_path(file.path(), b',').unwrap();
        assert_ne!(first, changed);
        assert_eq!(first.0.len(), 40);
    }
}
