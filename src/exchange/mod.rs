//! Bulk exchange of the key matrix with translators and external tools.
//!
//! # Architecture
//!
//! - `export`: key matrix to JSON, CSV or XLIFF 1.2
//! - `import`: JSON or CSV back into candidate values, classified against
//!   the current catalogs and optionally committed
//! - `csv` / `xliff`: the wire formats
//!
//! CSV columns are headed by upper-cased locale codes (`Namespace,Key,EN,ES`).

pub mod csv;
mod export;
mod import;
pub mod xliff;

pub use export::{ExportFilter, ExportFormat, Exported};
pub use import::{ImportFormat, ImportOutcome, ImportRow, ImportSummary, RowStatus};

pub(crate) const NAMESPACE_HEADER: &str = "Namespace";
pub(crate) const KEY_HEADER: &str = "Key";

pub(crate) fn column_header(locale: &str) -> String {
    locale.to_uppercase()
}

/// Resolve a column header to a known locale code, ignoring case.
pub(crate) fn resolve_locale<'a>(header: &str, known: &'a [String]) -> Option<&'a str> {
    known
        .iter()
        .find(|code| code.eq_ignore_ascii_case(header.trim()))
        .map(String::as_str)
}
