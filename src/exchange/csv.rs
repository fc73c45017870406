//! Minimal RFC 4180 reader and writer.
//!
//! Fields containing a comma, quote, CR or LF are quoted; quotes inside a
//! quoted field are doubled. Rows end with CRLF on output and with either
//! LF or CRLF on input.

use crate::error::{CatalogError, CatalogResult};

/// Encode one row, CRLF-terminated.
pub fn write_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|f| quote(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Parse a whole document into rows. Blank lines are skipped; a leading
/// UTF-8 byte-order mark is ignored.
pub fn parse(text: &str) -> CatalogResult<Vec<Vec<String>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            '"' => {
                return Err(CatalogError::InvalidArgument(format!(
                    "CSV line {}: quote inside an unquoted field",
                    line
                )))
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                row.push(std::mem::take(&mut field));
                finish_row(&mut rows, std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(CatalogError::InvalidArgument(format!(
            "CSV line {}: unterminated quoted field",
            line
        )));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        finish_row(&mut rows, row);
    }
    Ok(rows)
}

fn finish_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    let blank = row.len() == 1 && row[0].is_empty();
    if !blank {
        rows.push(row);
    }
}
