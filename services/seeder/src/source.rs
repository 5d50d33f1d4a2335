//! CSV reading and cell-level normalization.
//!
//! Source files are spreadsheet exports: UTF-8, comma-delimited, a Korean
//! header row that often starts with a byte-order mark, and numeric cells
//! that may be written in scientific notation (`1.8938339E7`).

use std::path::{Path, PathBuf};

use csv::StringRecord;
use tokio::fs;

use crate::error::{IngestError, Result};

const BOM: char = '\u{feff}';

/// A fully read source file: header names plus raw records.
#[derive(Debug)]
pub struct SourceTable {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

impl SourceTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Remove one leading byte-order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}

/// Strict UTF-8 decode. The BOM is kept so header handling stays in one place.
pub fn decode_utf8(bytes: &[u8]) -> Option<String> {
    encoding_rs::UTF_8
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|s| s.into_owned())
}

/// Parse a decimal or scientific-notation number. Blank, garbage and
/// non-finite input yield `None`.
pub fn coerce_real(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer cell. Exports occasionally write `1.0` for `1`, so a
/// float is accepted and truncated toward zero.
pub fn coerce_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    coerce_real(trimmed).map(|v| v.trunc() as i64)
}

/// Parse already-decoded CSV content. A leading BOM is dropped before the
/// reader sees it so a quoted first header still parses as quoted.
pub fn parse_table(path: &Path, content: &str) -> Result<SourceTable> {
    let content = strip_bom(content);
    let csv_err = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(false) // every row must match the header width
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(csv_err)?;

    Ok(SourceTable {
        path: path.to_path_buf(),
        headers,
        records,
    })
}

/// Read, decode and parse one source file.
pub async fn read_table(path: &Path) -> Result<SourceTable> {
    let bytes = fs::read(path).await.map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content = decode_utf8(&bytes).ok_or_else(|| IngestError::Encoding {
        path: path.to_path_buf(),
    })?;
    parse_table(path, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Result<SourceTable> {
        parse_table(Path::new("test.csv"), csv)
    }

    #[test]
    fn test_strip_bom_removes_one_marker() {
        assert_eq!(strip_bom("\u{feff}국가"), "국가");
        assert_eq!(strip_bom("\u{feff}\u{feff}국가"), "\u{feff}국가");
    }

    #[test]
    fn test_strip_bom_is_identity_without_marker() {
        assert_eq!(strip_bom("국가"), "국가");
        assert_eq!(strip_bom(strip_bom("\u{feff}국가")), "국가");
        assert_eq!(strip_bom(""), "");
    }

    #[test]
    fn test_coerce_real_scientific_notation() {
        assert_eq!(coerce_real("1.8938339E7"), Some(18938339.0));
        assert_eq!(coerce_real("1.6371455e7"), Some(16371455.0));
    }

    #[test]
    fn test_coerce_real_plain_decimal() {
        assert_eq!(coerce_real("1712.5"), Some(1712.5));
        assert_eq!(coerce_real("  6.6 "), Some(6.6));
        assert_eq!(coerce_real("-3.2"), Some(-3.2));
    }

    #[test]
    fn test_coerce_real_rejects_garbage() {
        assert_eq!(coerce_real(""), None);
        assert_eq!(coerce_real("   "), None);
        assert_eq!(coerce_real("-"), None);
        assert_eq!(coerce_real("N/A"), None);
        assert_eq!(coerce_real("NaN"), None);
        assert_eq!(coerce_real("inf"), None);
    }

    #[test]
    fn test_coerce_integer() {
        assert_eq!(coerce_integer("2015"), Some(2015));
        assert_eq!(coerce_integer("1.0"), Some(1));
        assert_eq!(coerce_integer("3.9"), Some(3));
        assert_eq!(coerce_integer(""), None);
        assert_eq!(coerce_integer("abc"), None);
    }

    #[test]
    fn test_decode_utf8_keeps_bom_for_header_handling() {
        let bytes = "\u{feff}국가\n중국\n".as_bytes();
        let decoded = decode_utf8(bytes).unwrap();
        assert!(decoded.starts_with('\u{feff}'));
    }

    #[test]
    fn test_decode_utf8_rejects_malformed_bytes() {
        // EUC-KR encoding of "국가"
        let bytes = [0xB1, 0xB9, 0xB0, 0xA1];
        assert!(decode_utf8(&bytes).is_none());
    }

    #[test]
    fn test_parse_table_strips_bom_from_first_header() {
        let t = table("\u{feff}국가,순위\n중국,1\n").unwrap();
        assert_eq!(t.headers, vec!["국가", "순위"]);
        assert_eq!(t.column_index("국가"), Some(0));
        assert_eq!(t.records.len(), 1);
        assert_eq!(&t.records[0][0], "중국");
    }

    #[test]
    fn test_parse_table_strips_bom_before_quoted_header() {
        let t = table("\u{feff}\"국가\",\"순위\"\n\"중국\",1\n").unwrap();
        assert_eq!(t.headers, vec!["국가", "순위"]);
        assert_eq!(t.column_index("국가"), Some(0));
        assert_eq!(&t.records[0][0], "중국");
    }

    #[test]
    fn test_parse_table_header_only() {
        let t = table("국가,순위\n").unwrap();
        assert!(t.records.is_empty());
    }

    #[test]
    fn test_parse_table_wrong_column_count_fails() {
        let result = table("국가,순위\n중국,1,extra\n");
        assert!(matches!(result, Err(IngestError::Csv { .. })));
    }

    #[tokio::test]
    async fn test_read_table_missing_file_fails() {
        let result = read_table(Path::new("/nonexistent/dir/none.csv")).await;
        assert!(matches!(result, Err(IngestError::Io { .. })));
    }

    #[tokio::test]
    async fn test_read_table_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "\u{feff}기준연월,값(%)\n202501,24.0\n").unwrap();

        let t = read_table(&path).await.unwrap();
        assert_eq!(t.headers[0], "기준연월");
        assert_eq!(t.records.len(), 1);
    }

    #[tokio::test]
    async fn test_read_table_invalid_encoding_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("euc_kr.csv");
        std::fs::write(&path, [0xB1, 0xB9, 0xB0, 0xA1, b'\n']).unwrap();

        let result = read_table(&path).await;
        assert!(matches!(result, Err(IngestError::Encoding { .. })));
    }
}
