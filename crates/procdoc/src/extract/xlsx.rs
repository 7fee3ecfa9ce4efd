//! XLSX extraction.
//!
//! An XLSX file is a ZIP archive. Cell values live in per-sheet XML under
//! `xl/worksheets/`, with string cells indirected through
//! `xl/sharedStrings.xml`. Each sheet becomes one table; the plain text is
//! the cells joined row by row.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ExtractError;
use crate::job::record::DocumentType;

use super::{Extraction, Extractor, StructuredElements, Table};

pub struct XlsxExtractor;

impl XlsxExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XlsxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for XlsxExtractor {
    fn supports(&self, declared_type: &DocumentType) -> bool {
        matches!(declared_type, DocumentType::Xlsx)
    }

    fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractError::Xlsx(format!("Failed to open XLSX archive: {}", e)))?;

        let shared_strings = match read_entry(&mut archive, "xl/sharedStrings.xml") {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let mut sheet_names: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with("xl/worksheets/") && n.ends_with(".xml"))
            .map(|n| n.to_string())
            .collect();
        sheet_names.sort();

        if sheet_names.is_empty() {
            return Err(ExtractError::Xlsx("No worksheets found".to_string()));
        }

        let mut tables = Vec::new();
        let mut text = String::new();

        for name in &sheet_names {
            let xml = read_entry(&mut archive, name)
                .ok_or_else(|| ExtractError::Xlsx(format!("Failed to read {}", name)))?;
            let rows = parse_worksheet(&xml, &shared_strings)?;

            for row in &rows {
                text.push_str(&row.join("\t"));
                text.push('\n');
            }

            let table_name = name
                .trim_start_matches("xl/worksheets/")
                .trim_end_matches(".xml")
                .to_string();
            tables.push(Table {
                name: table_name,
                rows,
            });
        }

        Ok(Extraction {
            text,
            structured: Some(StructuredElements { tables }),
        })
    }
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Option<String> {
    let mut entry = archive.by_name(name).ok()?;
    let mut content = String::new();
    entry.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Parses `xl/sharedStrings.xml` into the shared-string table. Rich-text
/// runs inside one `<si>` are concatenated.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    if in_item {
                        strings.push(current.clone());
                        in_item = false;
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_item && in_text {
                    current.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::Xlsx(format!(
                    "sharedStrings parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(strings)
}

/// Cell value interpretation, from the `t` attribute on `<c>`.
#[derive(Clone, Copy, PartialEq)]
enum CellKind {
    /// Index into the shared-string table.
    Shared,
    /// Literal value (numbers, formula strings, booleans).
    Literal,
    /// Inline string: text carried in a nested `<is><t>` element.
    Inline,
}

struct CellState {
    kind: CellKind,
    column: usize,
}

fn cell_state(e: &BytesStart<'_>, fallback_column: usize) -> CellState {
    let mut kind = CellKind::Literal;
    let mut column = fallback_column;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"t" => {
                kind = match attr.value.as_ref() {
                    b"s" => CellKind::Shared,
                    b"inlineStr" => CellKind::Inline,
                    _ => CellKind::Literal,
                };
            }
            b"r" => {
                if let Ok(cell_ref) = std::str::from_utf8(attr.value.as_ref()) {
                    column = column_index(cell_ref);
                }
            }
            _ => {}
        }
    }

    CellState { kind, column }
}

/// Converts the letter prefix of a cell reference (`"C12"`) to a
/// zero-based column index.
fn column_index(cell_ref: &str) -> usize {
    let mut index: usize = 0;
    for c in cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()) {
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    index.saturating_sub(1)
}

fn place_cell(row: &mut Vec<String>, column: usize, value: String) {
    while row.len() < column {
        row.push(String::new());
    }
    if row.len() == column {
        row.push(value);
    } else {
        row[column] = value;
    }
}

fn parse_worksheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut current_row: Vec<String> = Vec::new();
    let mut in_row = false;
    let mut cell: Option<CellState> = None;
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = true;
                    current_row.clear();
                }
                b"c" if in_row => {
                    cell = Some(cell_state(e, current_row.len()));
                }
                b"v" => in_value = true,
                b"t" => in_inline_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                // Self-closing cells carry no value; they only advance the
                // column cursor via their reference.
                if in_row && e.local_name().as_ref() == b"c" {
                    let state = cell_state(e, current_row.len());
                    place_cell(&mut current_row, state.column, String::new());
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    if in_row {
                        rows.push(current_row.clone());
                        in_row = false;
                    }
                }
                b"c" => cell = None,
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let Some(state) = &cell else { continue };
                let raw = e.unescape().unwrap_or_default();

                let value = if in_value && state.kind == CellKind::Shared {
                    match raw.trim().parse::<usize>().ok().and_then(|i| shared.get(i)) {
                        Some(s) => s.clone(),
                        None => {
                            return Err(ExtractError::Xlsx(format!(
                                "Shared string index '{}' out of range",
                                raw.trim()
                            )));
                        }
                    }
                } else if in_value && state.kind != CellKind::Inline {
                    raw.to_string()
                } else if in_inline_text && state.kind == CellKind::Inline {
                    raw.to_string()
                } else {
                    continue;
                };

                place_cell(&mut current_row, state.column, value);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::Xlsx(format!(
                    "Worksheet parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rows)
}

#[cfg(test)]
pub(crate) fn build_test_xlsx(shared: &[&str], sheet_xml: &str) -> Vec<u8> {
    use std::io::Write;

    let mut items = String::new();
    for s in shared {
        items.push_str(&format!("<si><t>{}</t></si>", s));
    }
    let shared_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sst>{}</sst>"#,
        items
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    writer
        .start_file("xl/sharedStrings.xml", options)
        .expect("start shared strings");
    writer
        .write_all(shared_xml.as_bytes())
        .expect("write shared strings");
    writer
        .start_file("xl/worksheets/sheet1.xml", options)
        .expect("start sheet");
    writer.write_all(sheet_xml.as_bytes()).expect("write sheet");
    writer.finish().expect("finish xlsx").into_inner()
}
