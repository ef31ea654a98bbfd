//! Hand-rolled CSV tokenizer with encoding auto-detection.
//!
//! Turns raw CSV text into a header row plus JSON object rows. The scanner is
//! quote-aware: commas inside quoted fields are literal, doubled quotes
//! unescape to one quote, and each field is trimmed and unquoted on emission.
//!
//! Each row is keyed both by the verbatim header text and by a normalized
//! form (lower-cased, spaces replaced with underscores) so downstream alias
//! lookups are case/format insensitive.

use serde_json::{json, Map, Value};

use crate::error::{FormatError, FormatResult};
use crate::transform::aliases::{self, NAME_ALIASES};

/// Result of tokenizing a CSV blob.
#[derive(Debug, Clone)]
pub struct TokenizedCsv {
    /// Header cells, verbatim (BOM stripped from the first).
    pub headers: Vec<String>,
    /// One JSON object per data line, in line order.
    pub rows: Vec<Value>,
}

/// Tokenize CSV text into headers and rows.
///
/// Fails with [`FormatError::EmptyInput`] when the input has zero non-blank
/// lines, [`FormatError::NoNameHeader`] when no header cell is a recognized
/// client-name column, and [`FormatError::FieldCountMismatch`] when a data
/// line's field count disagrees with the header's.
pub fn tokenize(text: &str) -> FormatResult<TokenizedCsv> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines.next().ok_or(FormatError::EmptyInput)?;

    let mut headers = split_line(header_line);
    if let Some(first) = headers.first_mut() {
        if let Some(stripped) = first.strip_prefix('\u{feff}') {
            *first = stripped.to_string();
        }
    }

    if !headers.iter().any(|h| is_name_header(h)) {
        return Err(FormatError::NoNameHeader(headers.join(", ")));
    }

    let mut rows = Vec::new();
    for (idx, line) in lines {
        let fields = split_line(line);
        if fields.len() != headers.len() {
            return Err(FormatError::FieldCountMismatch {
                line: idx + 1,
                expected: headers.len(),
                found: fields.len(),
            });
        }

        let mut obj = Map::new();
        for (header, field) in headers.iter().zip(&fields) {
            obj.insert(header.clone(), json!(field));
            let normalized = aliases::normalize_key(header);
            if normalized != *header {
                obj.insert(normalized, json!(field));
            }
        }
        rows.push(Value::Object(obj));
    }

    Ok(TokenizedCsv { headers, rows })
}

/// Single-pass scanner for one CSV line.
///
/// Toggles an in-quotes flag on an unescaped quote, treats commas inside
/// quotes as literal, and trims each field on emission.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                // Doubled quote inside a quoted field is a literal quote.
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Whether a header cell is a recognized name-equivalent column.
fn is_name_header(header: &str) -> bool {
    let normalized = aliases::normalize_key(header);
    NAME_ALIASES
        .iter()
        .any(|alias| alias.eq_ignore_ascii_case(header.trim()) || alias.eq_ignore_ascii_case(&normalized))
}

// =============================================================================
// Encoding detection
// =============================================================================

/// Detect the encoding of raw bytes using chardet, normalized to a canonical
/// charset name.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode raw bytes into text, auto-detecting the encoding.
///
/// Returns the decoded content and the encoding that was used. Unknown
/// charsets fall back to lossy UTF-8.
pub fn decode_bytes(bytes: &[u8]) -> (String, String) {
    let encoding = detect_encoding(bytes);
    let content = match encoding.as_str() {
        "iso-8859-1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    (content, encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let csv = "name,city\nAcme,Berlin\nGlobex,Paris";
        let result = tokenize(csv).unwrap();

        assert_eq!(result.headers, vec!["name", "city"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0]["name"], "Acme");
        assert_eq!(result.rows[1]["city"], "Paris");
    }

    #[test]
    fn test_quoted_field_with_comma_and_quote() {
        // A field containing a comma and an embedded (doubled) quote
        // tokenizes back to its literal content.
        let csv = "name,notes\n\"Acme, Inc.\",\"said \"\"hello\"\" twice\"";
        let result = tokenize(csv).unwrap();

        assert_eq!(result.rows[0]["name"], "Acme, Inc.");
        assert_eq!(result.rows[0]["notes"], "said \"hello\" twice");
    }

    #[test]
    fn test_rows_keyed_verbatim_and_normalized() {
        let csv = "Company Name,Company ID\nAcme Corp,C-1";
        let result = tokenize(csv).unwrap();

        let row = &result.rows[0];
        assert_eq!(row["Company Name"], "Acme Corp");
        assert_eq!(row["company_name"], "Acme Corp");
        assert_eq!(row["company_id"], "C-1");
    }

    #[test]
    fn test_bom_stripped_from_first_header() {
        let csv = "\u{feff}name\nAcme";
        let result = tokenize(csv).unwrap();
        assert_eq!(result.headers[0], "name");
    }

    #[test]
    fn test_blank_lines_discarded() {
        let csv = "name\n\nAcme\n   \nGlobex\n";
        let result = tokenize(csv).unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = tokenize("  \n \n").unwrap_err();
        assert!(matches!(err, FormatError::EmptyInput));
    }

    #[test]
    fn test_field_count_mismatch_rejected() {
        let csv = "name,city\nAcme,Berlin,extra";
        let err = tokenize(csv).unwrap_err();
        match err {
            FormatError::FieldCountMismatch {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 2);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_header_without_name_column_rejected() {
        let csv = "city,country\nBerlin,DE";
        let err = tokenize(csv).unwrap_err();
        assert!(matches!(err, FormatError::NoNameHeader(_)));
    }

    #[test]
    fn test_company_header_accepted_as_name_equivalent() {
        let csv = "Company ID,Company Name\nCLI001,Client 1";
        assert!(tokenize(csv).is_ok());
    }

    #[test]
    fn test_fields_trimmed() {
        let csv = "name,city\n  Acme  ,  Berlin ";
        let result = tokenize(csv).unwrap();
        assert_eq!(result.rows[0]["name"], "Acme");
        assert_eq!(result.rows[0]["city"], "Berlin");
    }

    #[test]
    fn test_detect_encoding_utf8() {
        assert_eq!(detect_encoding("name\nAcme".as_bytes()), "utf-8");
    }

    #[test]
    fn test_decode_and_tokenize_from_file() {
        use std::io::Write as _;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"name,city\nAcme,Berlin\n").unwrap();

        let bytes = std::fs::read(file.path()).unwrap();
        let (content, encoding) = decode_bytes(&bytes);
        assert_eq!(encoding, "utf-8");

        let result = tokenize(&content).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["city"], "Berlin");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let (decoded, _) = decode_bytes(bytes);
        assert!(decoded.starts_with("Soci"));
    }
}
