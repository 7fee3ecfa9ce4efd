//! CSV extraction.
//!
//! Hand-rolled RFC 4180 parser: quoted fields, doubled-quote escapes,
//! CRLF and LF row terminators. The parsed rows become one table; the
//! plain text joins each row's fields for downstream analysis.

use crate::error::ExtractError;
use crate::job::record::DocumentType;

use super::{Extraction, Extractor, StructuredElements, Table};

pub struct CsvExtractor;

impl CsvExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for CsvExtractor {
    fn supports(&self, declared_type: &DocumentType) -> bool {
        matches!(declared_type, DocumentType::Csv)
    }

    fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| ExtractError::Csv(format!("Not valid UTF-8: {}", e)))?;

        let rows = parse_csv(content)?;

        let mut text = String::new();
        for row in &rows {
            text.push_str(&row.join(" "));
            text.push('\n');
        }

        Ok(Extraction {
            text,
            structured: Some(StructuredElements {
                tables: vec![Table {
                    name: "csv".to_string(),
                    rows,
                }],
            }),
        })
    }
}

fn parse_csv(content: &str) -> Result<Vec<Vec<String>>, ExtractError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                if field.is_empty() {
                    in_quotes = true;
                } else {
                    // Stray quote inside an unquoted field; keep it literal.
                    field.push('"');
                }
            }
            ',' => {
                row.push(std::mem::take(&mut field));
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ExtractError::Csv("Unterminated quoted field".to_string()));
    }

    // Final row without a trailing newline.
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}
